//! An MS-DOS style command session, minus the DOS.
//!
//! This crate provides the engine behind a single-user shell emulator: it accepts typed
//! command lines, echoes them after a prompt, dispatches them to a small fixed set of
//! built-in commands and reports everything as a stream of output events. There is no
//! real file system or process execution; `DIR` and `COLOR` are canned responses.
//!
//! The main entry point is [`ReplEngine`], which owns the command [`HistoryStore`], the
//! [`CommandRegistry`] and the rule that only one command runs at a time. Rendering is
//! left to the caller: consume [`OutputEvent`]s, or feed them into a [`Transcript`].
//! The public module [`command`] exposes the traits for adding your own commands.

mod builtin;
pub mod command;
pub mod config;
mod engine;
pub mod env;
mod history;
mod output;
mod registry;

pub use config::SessionConfig;
pub use engine::{Direction, OutputStream, ReplEngine, SessionState};
pub use history::HistoryStore;
pub use output::{LineStyle, OutputEvent, Transcript, render_event};
pub use registry::{CommandRegistry, Invocation};
