fn main() {
    let code = omnibus::run_cli();
    if code != 0 {
        std::process::exit(code);
    }
}
