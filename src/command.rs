use crate::config::SessionConfig;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};

/// What a command hands back to the engine once it has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Text lines to append to the transcript.
    Lines(Vec<String>),
    /// Wipe the transcript back to the session banner.
    ClearTranscript,
}

impl CommandOutput {
    /// Convenience for a single line of output.
    pub fn line(text: impl Into<String>) -> Self {
        Self::Lines(vec![text.into()])
    }
}

impl<S: Into<String>> FromIterator<S> for CommandOutput {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::Lines(iter.into_iter().map(Into::into).collect())
    }
}

/// Source of the current local time for `time` and `date`.
///
/// Exists so a session can be driven with a fixed instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// [`Clock`] backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Name and one-line summary of a registered command, as listed by `help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: &'static str,
    pub summary: &'static str,
}

/// Read-only view of the session handed to a command while it runs.
pub struct CommandContext<'a> {
    pub config: &'a SessionConfig,
    /// Every described command, in registration order.
    pub catalog: &'a [CommandInfo],
    pub clock: &'a dyn Clock,
}

/// Object-safe trait for any command the engine can run.
///
/// Built-ins get it through a blanket impl; commands that need to wait on something
/// implement it directly.
#[async_trait]
pub trait ExecutableCommand: Send {
    /// Runs the command to completion.
    ///
    /// An `Err` is an unexpected fault: the engine reports it as an error line and keeps
    /// the session going.
    async fn execute(self: Box<Self>, ctx: &CommandContext<'_>) -> Result<CommandOutput>;
}

/// Factory that tries to create a command from a dispatch key and its arguments.
///
/// Returns `None` when the factory doesn't recognize `name`. The key is already
/// lower-cased.
pub trait CommandFactory: Send + Sync {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;

    /// Entry for the `help` listing; `None` keeps the command out of it.
    fn describe(&self) -> Option<CommandInfo> {
        None
    }
}
