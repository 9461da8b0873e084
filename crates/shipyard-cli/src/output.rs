//! Terminal rendering of orchestration output.

use console::{Term, style};

use shipyard_core::output::{Output, Tone};

/// Writes styled output to the terminal.
///
/// With `--json` everything human-readable goes to stderr so stdout only
/// carries the summary.
pub struct ConsoleOutput {
    term: Term,
    json: bool,
    /// Label of the running action
    action: Option<String>,
    /// The action label is on the current, unterminated line
    inline: bool,
}

impl ConsoleOutput {
    pub fn new(json: bool) -> Self {
        Self {
            term: if json { Term::stderr() } else { Term::stdout() },
            json,
            action: None,
            inline: false,
        }
    }

    fn end_inline(&mut self) {
        if self.inline {
            let _ = self.term.write_line("");
            self.inline = false;
        }
    }
}

impl Output for ConsoleOutput {
    fn line(&mut self, tone: Tone, text: &str) {
        self.end_inline();
        let styled = match tone {
            Tone::Plain => text.to_string(),
            Tone::Bold => style(text).bold().to_string(),
            Tone::Success => style(text).green().to_string(),
            Tone::Warning => style(text).yellow().to_string(),
            Tone::Error => style(text).red().to_string(),
            Tone::Muted => style(text).dim().to_string(),
        };
        let _ = self.term.write_line(&styled);
    }

    fn action_start(&mut self, label: &str) {
        self.end_inline();
        let _ = self.term.write_str(&format!("{}... ", label));
        let _ = self.term.flush();
        self.action = Some(label.to_string());
        self.inline = true;
    }

    fn action_status(&mut self, status: &str) {
        let Some(label) = &self.action else {
            return;
        };
        if !self.inline || !self.term.is_term() {
            return;
        }
        let _ = self.term.clear_line();
        let _ = self
            .term
            .write_str(&format!("{}... {}", label, style(status).cyan()));
        let _ = self.term.flush();
    }

    fn action_stop(&mut self, suffix: &str) {
        let suffix = if suffix == "✖" {
            style(suffix).red().to_string()
        } else {
            style(suffix).dim().to_string()
        };
        match (&self.action, self.inline) {
            (Some(label), true) if self.term.is_term() => {
                let _ = self.term.clear_line();
                let _ = self.term.write_line(&format!("{}... {}", label, suffix));
            }
            (_, true) => {
                let _ = self.term.write_line(&suffix);
            }
            (Some(label), false) => {
                let _ = self.term.write_line(&format!("{}... {}", label, suffix));
            }
            (None, false) => {}
        }
        self.action = None;
        self.inline = false;
    }

    fn is_json(&self) -> bool {
        self.json
    }
}
