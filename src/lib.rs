pub mod build;
pub mod cli;
pub mod console;
pub mod executor;
pub mod logging;
pub mod migrate;
pub mod project;

/// Run the command line interface and return an exit code.
pub fn run_cli() -> i32 {
    logging::init();
    cli::run()
}
