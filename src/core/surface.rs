//! Display surfaces that quiz widgets and checkers write to

use console::{style, Term};

/// Something the widgets asked the surface to display or change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Rich heading text (the question)
    Heading(String),
    /// A horizontal container of buttons
    Buttons(Vec<String>),
    /// The button container was taken off the surface
    ButtonsRemoved,
    /// Prior output was cleared
    Cleared,
    /// A line of plain text
    Text(String),
}

/// An output area in the style of a notebook cell
pub trait Surface {
    fn emit(&mut self, event: SurfaceEvent);

    fn print(&mut self, text: &str) {
        self.emit(SurfaceEvent::Text(text.to_string()));
    }
}

/// Keeps every event, for tests and for replaying onto another surface
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub events: Vec<SurfaceEvent>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the text lines that were printed
    pub fn texts(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn emit(&mut self, event: SurfaceEvent) {
        self.events.push(event);
    }
}

/// Writes to the terminal.
///
/// Buttons are drawn by the interactive prompt rather than by the surface,
/// so `Buttons` only records that a prompt is pending.
pub struct TerminalSurface {
    term: Term,
    lines_written: usize,
    quiet: bool,
}

impl TerminalSurface {
    pub fn stdout() -> Self {
        Self {
            term: Term::stdout(),
            lines_written: 0,
            quiet: false,
        }
    }

    /// Skip headings; feedback text is still printed
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    fn write_line(&mut self, line: &str) {
        if self.term.write_line(line).is_err() {
            println!("{}", line);
        }
        self.lines_written += 1;
    }
}

impl Surface for TerminalSurface {
    fn emit(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Heading(text) => {
                if !self.quiet {
                    self.write_line(&format!("{}", style(text).bold()));
                }
            }
            SurfaceEvent::Buttons(_) | SurfaceEvent::ButtonsRemoved => {}
            SurfaceEvent::Cleared => {
                // Only a real terminal can take lines back
                if self.term.is_term() {
                    let _ = self.term.clear_last_lines(self.lines_written);
                }
                self.lines_written = 0;
            }
            SurfaceEvent::Text(text) => self.write_line(&text),
        }
    }
}
