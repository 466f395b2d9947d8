use regex::Regex;
use std::io::{Result as IoResult, Write};
use std::sync::LazyLock;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n|\r|\n").expect("line break pattern is valid"));

/// Visual category of an output event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    /// Regular command output.
    Plain,
    /// The prompt followed by the submitted command line.
    CommandEcho,
    /// A handler fault reported by the engine.
    Error,
    /// A bare prompt, emitted for an empty submission.
    PromptOnly,
}

/// One unit of output handed from the engine to whatever renders the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Lines { style: LineStyle, lines: Vec<String> },
    /// Drop everything rendered so far except the session banner.
    ClearTranscript,
}

impl OutputEvent {
    pub fn plain(lines: Vec<String>) -> Self {
        Self::Lines {
            style: LineStyle::Plain,
            lines,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Lines {
            style: LineStyle::Error,
            lines: vec![message.into()],
        }
    }

    pub fn command_echo(prompt: &str, line: &str) -> Self {
        Self::Lines {
            style: LineStyle::CommandEcho,
            lines: vec![format!("{prompt}{line}")],
        }
    }

    pub fn prompt_only(prompt: &str) -> Self {
        Self::Lines {
            style: LineStyle::PromptOnly,
            lines: vec![prompt.to_string()],
        }
    }

    pub fn style(&self) -> Option<LineStyle> {
        match self {
            Self::Lines { style, .. } => Some(*style),
            Self::ClearTranscript => None,
        }
    }

    /// The visual lines this event occupies, with embedded line breaks split out.
    pub fn rendered_lines(&self) -> Vec<String> {
        match self {
            Self::Lines { lines, .. } => lines
                .iter()
                .flat_map(|line| LINE_BREAK.split(line))
                .map(str::to_string)
                .collect(),
            Self::ClearTranscript => Vec::new(),
        }
    }
}

/// Write the visual lines of `event` to `out`, one per line.
///
/// `ClearTranscript` writes nothing; the caller decides how to wipe its surface.
pub fn render_event(out: &mut dyn Write, event: &OutputEvent) -> IoResult<()> {
    for line in event.rendered_lines() {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

/// In-memory rendering of a session: the banner followed by every rendered line.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    banner_len: usize,
    lines: Vec<(LineStyle, String)>,
}

impl Transcript {
    pub fn new(banner: &[String]) -> Self {
        Self {
            banner_len: banner.len(),
            lines: banner
                .iter()
                .map(|line| (LineStyle::Plain, line.clone()))
                .collect(),
        }
    }

    pub fn apply(&mut self, event: &OutputEvent) {
        match event {
            OutputEvent::ClearTranscript => self.lines.truncate(self.banner_len),
            OutputEvent::Lines { style, .. } => {
                for line in event.rendered_lines() {
                    self.lines.push((*style, line));
                }
            }
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|(_, line)| line.as_str())
    }

    pub fn styled_lines(&self) -> &[(LineStyle, String)] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
