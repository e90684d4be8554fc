use colored::Colorize;

/// Severity of a status line, mapped to a colour on the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Error,
}

/// Sink for user-facing status lines.
pub trait Console {
    fn say(&self, message: &str, tone: Tone);
}

/// Writes status lines to stdout, coloured by tone. Errors go to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConsole;

impl Console for TerminalConsole {
    fn say(&self, message: &str, tone: Tone) {
        match tone {
            Tone::Success => println!("{}", message.green()),
            Tone::Warning => println!("{}", message.yellow()),
            Tone::Error => eprintln!("{}", message.red().bold()),
        }
    }
}

/// Keeps every line in memory instead of printing it.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingConsole {
    lines: std::cell::RefCell<Vec<(Tone, String)>>,
}

#[cfg(test)]
impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Tone, String)> {
        self.lines.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }
}

#[cfg(test)]
impl Console for RecordingConsole {
    fn say(&self, message: &str, tone: Tone) {
        self.lines.borrow_mut().push((tone, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::{Console, RecordingConsole, Tone};

    #[test]
    fn recording_console_keeps_order_and_tone() {
        let console = RecordingConsole::new();
        console.say("first", Tone::Success);
        console.say("second", Tone::Warning);

        assert_eq!(
            console.lines(),
            vec![
                (Tone::Success, "first".to_string()),
                (Tone::Warning, "second".to_string())
            ]
        );
    }
}
