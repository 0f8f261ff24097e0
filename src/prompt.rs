use std::io::{self, BufRead, Write};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Error,
    Warning,
    Info,
}

impl AlertKind {
    fn label(&self) -> &'static str {
        match self {
            AlertKind::Success => "OK",
            AlertKind::Error => "ERROR",
            AlertKind::Warning => "WARNING",
            AlertKind::Info => "INFO",
        }
    }
}

/// The one confirmation/alert surface every workflow talks to.
pub trait Prompt {
    /// Asks a yes/no question. `false` means cancel.
    fn confirm(&self, title: &str, message: &str) -> bool;
    fn alert(&self, kind: AlertKind, message: &str);
}

/// Prompt on the controlling terminal. With `assume_yes` every confirmation passes.
pub struct TerminalPrompt {
    assume_yes: bool,
}

impl TerminalPrompt {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&self, title: &str, message: &str) -> bool {
        if self.assume_yes {
            debug!(title, "auto-confirmed");
            return true;
        }

        let mut stderr = io::stderr();
        let _ = writeln!(stderr, "\n{}\n{}", title, message);
        let _ = write!(stderr, "Proceed? [y/N] ");
        let _ = stderr.flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }

    fn alert(&self, kind: AlertKind, message: &str) {
        match kind {
            AlertKind::Error | AlertKind::Warning => eprintln!("[{}] {}", kind.label(), message),
            AlertKind::Success | AlertKind::Info => println!("{}", message),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Answers confirmations from a script and records everything it was shown.
    #[derive(Default)]
    pub(crate) struct ScriptedPrompt {
        answers: RefCell<VecDeque<bool>>,
        pub confirms: RefCell<Vec<(String, String)>>,
        pub alerts: RefCell<Vec<(AlertKind, String)>>,
    }

    impl ScriptedPrompt {
        pub(crate) fn answering(answers: &[bool]) -> Self {
            Self {
                answers: RefCell::new(answers.iter().copied().collect()),
                ..Default::default()
            }
        }

        pub(crate) fn alert_kinds(&self) -> Vec<AlertKind> {
            self.alerts.borrow().iter().map(|(k, _)| *k).collect()
        }
    }

    impl Prompt for ScriptedPrompt {
        fn confirm(&self, title: &str, message: &str) -> bool {
            self.confirms
                .borrow_mut()
                .push((title.to_string(), message.to_string()));
            self.answers.borrow_mut().pop_front().unwrap_or(false)
        }

        fn alert(&self, kind: AlertKind, message: &str) {
            self.alerts.borrow_mut().push((kind, message.to_string()));
        }
    }
}
