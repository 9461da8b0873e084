//! Output sink used by the orchestration.
//!
//! The core never writes to the terminal directly. Frontends implement
//! [`Output`] (the CLI styles lines with `console`), tests use
//! [`MemoryOutput`].

/// Severity/kind of a printed line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Bold,
    Success,
    Warning,
    Error,
    Muted,
}

/// Sink for user-facing output.
pub trait Output: Send {
    /// Print a line with the given tone.
    fn line(&mut self, tone: Tone, text: &str);

    /// Start a long-running action (e.g. "Deploying service ...").
    fn action_start(&mut self, label: &str);

    /// Update the status suffix of the running action (e.g. "(2/3)").
    fn action_status(&mut self, status: &str);

    /// Finish the running action with a suffix (elapsed time or a marker).
    fn action_stop(&mut self, suffix: &str);

    /// Whether machine-readable output was requested.
    fn is_json(&self) -> bool {
        false
    }

    fn log(&mut self, text: &str) {
        self.line(Tone::Plain, text);
    }

    fn warn(&mut self, text: &str) {
        self.line(Tone::Warning, text);
    }
}

/// Recorded output event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Line(Tone, String),
    ActionStart(String),
    ActionStatus(String),
    ActionStop(String),
}

/// In-memory output, used by tests and by `--json` runs to swallow
/// human-readable progress.
#[derive(Debug, Default)]
pub struct MemoryOutput {
    events: Vec<OutputEvent>,
    json: bool,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json() -> Self {
        Self {
            events: Vec::new(),
            json: true,
        }
    }

    pub fn events(&self) -> &[OutputEvent] {
        &self.events
    }

    /// All printed lines, in order, without tone.
    pub fn lines(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                OutputEvent::Line(_, text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// All action statuses, in order.
    pub fn statuses(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                OutputEvent::ActionStatus(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether any printed line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.events.iter().any(|event| match event {
            OutputEvent::Line(_, text)
            | OutputEvent::ActionStart(text)
            | OutputEvent::ActionStop(text) => text.contains(needle),
            OutputEvent::ActionStatus(_) => false,
        })
    }
}

impl Output for MemoryOutput {
    fn line(&mut self, tone: Tone, text: &str) {
        self.events.push(OutputEvent::Line(tone, text.to_string()));
    }

    fn action_start(&mut self, label: &str) {
        self.events.push(OutputEvent::ActionStart(label.to_string()));
    }

    fn action_status(&mut self, status: &str) {
        self.events
            .push(OutputEvent::ActionStatus(status.to_string()));
    }

    fn action_stop(&mut self, suffix: &str) {
        self.events.push(OutputEvent::ActionStop(suffix.to_string()));
    }

    fn is_json(&self) -> bool {
        self.json
    }
}
