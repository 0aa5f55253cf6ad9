//! Call-stack snapshots attached to call records

use serde::Serialize;
use std::backtrace::Backtrace;
use std::fmt;

/// One stack frame: the function and, when debug info allows, where it is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub symbol: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file.as_deref().unwrap_or("<unknown>");
        match self.line {
            Some(line) => write!(f, "File \"{}\", line {}, in {}", file, line, self.symbol),
            None => write!(f, "File \"{}\", line ?, in {}", file, self.symbol),
        }
    }
}

/// Stack snapshot, oldest frame first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Traceback {
    frames: Vec<Frame>,
}

impl Traceback {
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    /// Capture the current call stack
    ///
    /// Frames of the capture itself are never included; `skip` drops that many more of
    /// the innermost frames, so a helper can leave itself out of its own snapshots.
    #[inline(never)]
    pub fn capture(skip: usize) -> Self {
        let rendered = Backtrace::force_capture().to_string();
        let mut frames = parse(&rendered);

        let own = frames
            .iter()
            .rposition(|frame| frame.symbol.contains("Traceback::capture"))
            .map(|index| index + 1)
            .unwrap_or_else(|| {
                frames
                    .iter()
                    .take_while(|frame| frame.symbol.starts_with("std::backtrace"))
                    .count()
            });
        frames.drain(..(own + skip).min(frames.len()));
        frames.reverse();

        Self { frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// One line per frame, oldest first
    pub fn format(&self) -> Vec<String> {
        self.frames.iter().map(Frame::to_string).collect()
    }
}

impl fmt::Display for Traceback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, frame) in self.frames.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", frame)?;
        }
        Ok(())
    }
}

/// Parse the rendering of a [`Backtrace`], innermost frame first:
///
/// ```text
///    0: symbol
///              at path/to/file.rs:12:5
/// ```
fn parse(rendered: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();

    for line in rendered.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let (file, line) = split_location(location);
                frame.file = Some(file.to_string());
                frame.line = line;
            }
            continue;
        }

        if let Some((index, symbol)) = line.split_once(": ") {
            if !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) {
                frames.push(Frame {
                    symbol: symbol.to_string(),
                    file: None,
                    line: None,
                });
            }
        }
    }

    frames
}

/// `file:line:column` → `(file, line)`
fn split_location(location: &str) -> (&str, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let column = parts.next();
    let line = parts.next();
    match (parts.next(), line, column) {
        (Some(file), Some(line), Some(_)) => (file, line.parse().ok()),
        _ => match location.rsplit_once(':') {
            Some((file, line)) => (file, line.parse().ok()),
            None => (location, None),
        },
    }
}
