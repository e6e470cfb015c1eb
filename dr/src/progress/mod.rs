//! Progress reporting
//!
//! Page and chunk progress is a side effect of the research loop, never part
//! of its results. The terminal sink redraws one line in place.

use std::io::{self, Write};
use std::sync::Mutex;

use tracing::debug;

/// Width of the bar in columns
pub const BAR_WIDTH: usize = 30;

/// Receives progress from the research loop
pub trait ProgressSink: Send + Sync {
    /// `current` of `total` steps of `label` are done
    fn update(&self, current: usize, total: usize, label: &str);

    /// A one-off message shown to the user
    fn note(&self, message: &str);
}

/// Render one progress line, without the leading carriage return
pub fn render_bar(current: usize, total: usize, label: &str) -> String {
    let (filled, percent) = if total == 0 {
        (BAR_WIDTH, 100)
    } else {
        let current = current.min(total);
        (current * BAR_WIDTH / total, current * 100 / total)
    };
    format!(
        "{}: [{}{}] {}% ({}/{})",
        label,
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent,
        current,
        total
    )
}

/// In-place bar on a terminal stream
pub struct TerminalProgress<W: Write + Send> {
    out: Mutex<W>,
}

impl TerminalProgress<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalProgress<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    fn write(&self, text: &str) {
        // A poisoned lock or a closed stream only loses progress output
        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> ProgressSink for TerminalProgress<W> {
    fn update(&self, current: usize, total: usize, label: &str) {
        let mut line = format!("\r{}", render_bar(current, total, label));
        if current >= total {
            line.push('\n');
        }
        self.write(&line);
    }

    fn note(&self, message: &str) {
        debug!(%message, "TerminalProgress::note: called");
        self.write(&format!("{}\n", message));
    }
}

/// Discards all progress
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn update(&self, _current: usize, _total: usize, _label: &str) {}

    fn note(&self, _message: &str) {}
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_bar_partial() {
        assert_eq!(
            render_bar(1, 3, "Fetching pages"),
            "Fetching pages: [##########--------------------] 33% (1/3)"
        );
    }

    #[test]
    fn test_render_bar_complete() {
        let line = render_bar(4, 4, "Summarizing chunks");
        assert!(line.contains(&"#".repeat(BAR_WIDTH)));
        assert!(line.ends_with("100% (4/4)"));
    }

    #[test]
    fn test_render_bar_zero_total() {
        assert!(render_bar(0, 0, "x").contains("100%"));
    }

    #[test]
    fn test_terminal_progress_redraws_in_place() {
        let sink = TerminalProgress::new(Vec::new());
        sink.update(1, 2, "Pages");
        sink.update(2, 2, "Pages");
        sink.note("done");

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.starts_with("\rPages: ["));
        assert_eq!(out.matches('\r').count(), 2);
        assert!(out.contains("(2/2)\ndone\n"));
    }
}
