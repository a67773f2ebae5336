//! Terminal prompt surface.
//!
//! Draws the prompt on stderr and reads the answer from stdin. Closing stdin
//! or entering an empty line dismisses the prompt.

use std::io::Write;

use tempshot_core::{DurationOption, InputSink, Prompt, Surface, SurfaceError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

#[derive(Debug, PartialEq, Eq)]
enum Choice {
    Option(&'static str),
    Dismiss,
    Invalid,
}

/// Accepts a 1-based index or an exact label.
fn parse_choice(options: &'static [DurationOption], text: &str) -> Choice {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("q") {
        return Choice::Dismiss;
    }
    if let Ok(n) = text.parse::<usize>() {
        return match n.checked_sub(1).and_then(|i| options.get(i)) {
            Some(option) => Choice::Option(option.label),
            None => Choice::Invalid,
        };
    }
    options
        .iter()
        .find(|o| o.label == text)
        .map(|o| Choice::Option(o.label))
        .unwrap_or(Choice::Invalid)
}

async fn read_choices(options: &'static [DurationOption], input: InputSink) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_choice(options, &line) {
                Choice::Option(label) => {
                    input.select(label);
                    return;
                }
                Choice::Dismiss => {
                    input.dismiss();
                    return;
                }
                Choice::Invalid => {
                    let mut err = std::io::stderr();
                    let _ = write!(err, "unknown option '{}', try again: ", line.trim());
                    let _ = err.flush();
                }
            },
            Ok(None) | Err(_) => {
                input.dismiss();
                return;
            }
        }
    }
}

#[derive(Default)]
pub struct TerminalSurface {
    reader: Option<JoinHandle<()>>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Surface for TerminalSurface {
    fn attach(&mut self, prompt: &Prompt, input: InputSink) -> Result<(), SurfaceError> {
        let mut err = std::io::stderr().lock();
        writeln!(err, "{}", prompt.title)?;
        for (i, option) in prompt.options.iter().enumerate() {
            write!(err, "  [{}] {}", i + 1, option.label)?;
        }
        writeln!(err)?;
        write!(err, "choice (number or label, empty to dismiss): ")?;
        err.flush()?;

        if let Some(previous) = self.reader.take() {
            previous.abort();
        }
        self.reader = Some(tokio::spawn(read_choices(prompt.options, input)));
        Ok(())
    }

    fn detach(&mut self) -> Result<(), SurfaceError> {
        let reader = self.reader.take().ok_or(SurfaceError::Detached)?;
        reader.abort();
        let _ = writeln!(std::io::stderr());
        Ok(())
    }

    /// Stays attached after the reader returns, until the presenter detaches.
    fn is_attached(&self) -> bool {
        self.reader.is_some()
    }
}
