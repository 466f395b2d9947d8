use crate::command::{Clock, CommandContext, CommandOutput, SystemClock};
use crate::config::SessionConfig;
use crate::history::HistoryStore;
use crate::output::OutputEvent;
use crate::registry::{CommandRegistry, Invocation};
use anyhow::{Result, anyhow};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};

/// Receiving end of the engine's output events, in emission order.
pub type OutputStream = mpsc::UnboundedReceiver<OutputEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Processing,
}

/// History recall direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// The interactive session: history, dispatch and the one-command-at-a-time rule.
///
/// Output never goes to a terminal directly. Every line is sent as an [`OutputEvent`] on
/// the stream returned by [`ReplEngine::new`], and readiness for the next line is
/// published on a `watch` channel (see [`ReplEngine::ready`]).
///
/// Example
/// ```
/// use dosshell::{CommandRegistry, OutputEvent, ReplEngine, SessionConfig};
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// rt.block_on(async {
///     let (engine, mut events) =
///         ReplEngine::new(SessionConfig::default(), CommandRegistry::default());
///     engine.submit("echo hello world").await;
///     assert_eq!(
///         events.recv().await,
///         Some(OutputEvent::command_echo("C:\\> ", "echo hello world"))
///     );
///     assert_eq!(
///         events.recv().await,
///         Some(OutputEvent::plain(vec!["hello world".to_string()]))
///     );
/// });
/// ```
pub struct ReplEngine {
    config: SessionConfig,
    registry: CommandRegistry,
    clock: Box<dyn Clock>,
    history: Mutex<HistoryStore>,
    processing: AtomicBool,
    events: mpsc::UnboundedSender<OutputEvent>,
    ready: watch::Sender<bool>,
}

impl ReplEngine {
    /// Create an idle engine and the stream its output arrives on.
    pub fn new(config: SessionConfig, registry: CommandRegistry) -> (Self, OutputStream) {
        let (events, stream) = mpsc::unbounded_channel();
        let (ready, _) = watch::channel(true);
        let engine = Self {
            config,
            registry,
            clock: Box::new(SystemClock),
            history: Mutex::new(HistoryStore::new()),
            processing: AtomicBool::new(false),
            events,
            ready,
        };
        (engine, stream)
    }

    /// Replace the clock used by `time` and `date`.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Handle one line of input.
    ///
    /// Ignored entirely while another submission is still being processed. A blank line
    /// only produces a bare prompt. Anything else is recorded in history, echoed after the
    /// prompt and dispatched; the command's output, or a description of its failure,
    /// follows the echo. The session is idle again when this returns, whatever the
    /// command did.
    pub async fn submit(&self, raw_line: &str) {
        let Some(_guard) = ProcessingGuard::acquire(self) else {
            tracing::debug!(line = raw_line, "submission ignored, a command is still running");
            return;
        };

        let line = raw_line.trim();
        let Some(invocation) = Invocation::parse(line) else {
            self.emit(OutputEvent::prompt_only(&self.config.prompt));
            return;
        };

        self.ready.send_replace(false);
        self.history_lock().record(line);
        self.emit(OutputEvent::command_echo(&self.config.prompt, line));

        match self.run(&invocation).await {
            Ok(CommandOutput::Lines(lines)) => self.emit(OutputEvent::plain(lines)),
            Ok(CommandOutput::ClearTranscript) => self.emit(OutputEvent::ClearTranscript),
            Err(e) => {
                tracing::warn!(command = %invocation.key, error = %e, "command failed");
                self.emit(OutputEvent::error(format!("{e:#}")));
            }
        }
    }

    async fn run(&self, invocation: &Invocation<'_>) -> Result<CommandOutput> {
        tracing::debug!(command = %invocation.key, args = ?invocation.args, "dispatching");
        let ctx = CommandContext {
            config: &self.config,
            catalog: self.registry.catalog(),
            clock: self.clock.as_ref(),
        };
        // factories build commands from their arguments, so resolving can fault too
        let execution = AssertUnwindSafe(async {
            self.registry.resolve(invocation).execute(&ctx).await
        })
        .catch_unwind();

        let settled = match self.config.handler_timeout {
            Some(limit) => tokio::time::timeout(limit, execution)
                .await
                .map_err(|_| anyhow!("timeout: command did not complete within {limit:?}"))?,
            None => execution.await,
        };
        settled.unwrap_or_else(|payload| {
            Err(anyhow!("command panicked: {}", panic_message(&*payload)))
        })
    }

    /// Move through history.
    ///
    /// `Some` carries the text that should replace the edit buffer, caret at the end;
    /// `None` means leave the buffer alone.
    pub fn navigate(&self, direction: Direction) -> Option<String> {
        let mut history = self.history_lock();
        match direction {
            Direction::Up => history.recall_previous(),
            Direction::Down => history.recall_next(),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.processing.load(Ordering::Acquire) {
            SessionState::Processing
        } else {
            SessionState::Idle
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state() == SessionState::Idle
    }

    /// Watch channel that reads `true` whenever the engine will accept the next line.
    pub fn ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    pub fn prompt(&self) -> &str {
        &self.config.prompt
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Copy of the current history, cursor included.
    pub fn history(&self) -> HistoryStore {
        self.history_lock().clone()
    }

    fn history_lock(&self) -> MutexGuard<'_, HistoryStore> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: OutputEvent) {
        if self.events.send(event).is_err() {
            tracing::warn!("output stream closed, event dropped");
        }
    }
}

/// Holds the engine in `Processing`; dropping it returns the engine to `Idle` and
/// publishes readiness, on every exit path.
struct ProcessingGuard<'a> {
    engine: &'a ReplEngine,
}

impl<'a> ProcessingGuard<'a> {
    fn acquire(engine: &'a ReplEngine) -> Option<Self> {
        engine
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self { engine })
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.engine.processing.store(false, Ordering::Release);
        self.engine.ready.send_replace(true);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandFactory, ExecutableCommand};
    use crate::output::LineStyle;
    use async_trait::async_trait;
    use chrono::{DateTime, Local, TimeZone};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    const PROMPT: &str = "C:\\> ";

    fn engine() -> (ReplEngine, OutputStream) {
        ReplEngine::new(SessionConfig::default(), CommandRegistry::default())
    }

    fn drain(events: &mut OutputStream) -> Vec<OutputEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    fn plain(lines: &[&str]) -> OutputEvent {
        OutputEvent::plain(lines.iter().map(|s| s.to_string()).collect())
    }

    /// Test command that behaves according to its name: `wait` blocks on a notify,
    /// `fail` returns an error, `explode` panics and `hang` never finishes. `first`
    /// indexes its first argument while being built, so it panics without one.
    struct Scripted {
        release: Arc<Notify>,
    }

    enum Behavior {
        Wait(Arc<Notify>),
        Fail,
        Explode,
        Hang,
        Say(String),
    }

    impl CommandFactory for Scripted {
        fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
            let behavior = match name {
                "wait" => Behavior::Wait(self.release.clone()),
                "fail" => Behavior::Fail,
                "explode" => Behavior::Explode,
                "hang" => Behavior::Hang,
                "first" => Behavior::Say(args[0].to_string()),
                _ => return None,
            };
            Some(Box::new(behavior))
        }
    }

    #[async_trait]
    impl ExecutableCommand for Behavior {
        async fn execute(self: Box<Self>, _ctx: &CommandContext<'_>) -> Result<CommandOutput> {
            match *self {
                Behavior::Wait(release) => {
                    release.notified().await;
                    Ok(CommandOutput::line("done"))
                }
                Behavior::Fail => Err(anyhow!("disk on fire")),
                Behavior::Explode => panic!("handler blew up"),
                Behavior::Hang => std::future::pending::<Result<CommandOutput>>().await,
                Behavior::Say(text) => Ok(CommandOutput::line(text)),
            }
        }
    }

    fn scripted_engine(config: SessionConfig) -> (ReplEngine, OutputStream, Arc<Notify>) {
        let release = Arc::new(Notify::new());
        let mut registry = CommandRegistry::default();
        registry.register(Box::new(Scripted {
            release: release.clone(),
        }));
        let (engine, events) = ReplEngine::new(config, registry);
        (engine, events, release)
    }

    #[tokio::test]
    async fn test_blank_line_emits_bare_prompt_only() {
        let (engine, mut events) = engine();
        engine.submit("   ").await;

        assert_eq!(drain(&mut events), vec![OutputEvent::prompt_only(PROMPT)]);
        assert!(engine.history().is_empty());
        assert!(engine.is_idle());
        assert!(*engine.ready().borrow());
    }

    #[tokio::test]
    async fn test_echo_is_echoed_then_printed() {
        let (engine, mut events) = engine();
        engine.submit("  echo hello world  ").await;

        assert_eq!(
            drain(&mut events),
            vec![
                OutputEvent::command_echo(PROMPT, "echo hello world"),
                plain(&["hello world"]),
            ]
        );
        assert_eq!(engine.history().entries().collect::<Vec<_>>(), vec!["echo hello world"]);
    }

    #[tokio::test]
    async fn test_history_suppresses_only_adjacent_duplicates() {
        let (engine, _events) = engine();
        engine.submit("help").await;
        engine.submit("help").await;
        assert_eq!(engine.history().len(), 1);

        engine.submit("dir").await;
        engine.submit("help").await;
        assert_eq!(engine.history().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_command_is_plain_output() {
        let (engine, mut events) = engine();
        engine.submit("bogus").await;

        let events = drain(&mut events);
        assert_eq!(events.len(), 2);
        let OutputEvent::Lines { style, lines } = &events[1] else {
            panic!("expected lines");
        };
        assert_eq!(*style, LineStyle::Plain);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("bogus"));
        assert_eq!(lines[2], "Type HELP for a list of available commands.");
    }

    #[tokio::test]
    async fn test_color_with_and_without_code() {
        let (engine, mut events) = engine();

        engine.submit("color").await;
        let block = drain(&mut events).pop().unwrap().rendered_lines();
        assert_eq!(block.iter().map(|l| l.matches(" = ").count()).sum::<usize>(), 16);

        engine.submit("COLOR 0A").await;
        let ack = drain(&mut events).pop().unwrap().rendered_lines();
        assert_eq!(ack.len(), 1);
        assert!(ack[0].contains("0A"));
    }

    #[tokio::test]
    async fn test_clear_emits_directive() {
        let (engine, mut events) = engine();
        engine.submit("clear").await;

        assert_eq!(
            drain(&mut events),
            vec![
                OutputEvent::command_echo(PROMPT, "clear"),
                OutputEvent::ClearTranscript,
            ]
        );
    }

    #[tokio::test]
    async fn test_time_uses_injected_clock() {
        struct Fixed;
        impl Clock for Fixed {
            fn now(&self) -> DateTime<Local> {
                Local.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap()
            }
        }

        let (engine, mut events) = engine();
        let engine = engine.with_clock(Fixed);
        engine.submit("time").await;
        engine.submit("date").await;

        let events = drain(&mut events);
        assert_eq!(events[1], plain(&["9:30:00 AM"]));
        assert_eq!(events[3], plain(&["10/18/2026"]));
    }

    #[tokio::test]
    async fn test_navigate_replaces_buffer_with_recalled_lines() {
        let (engine, _events) = engine();
        engine.submit("ver").await;
        engine.submit("dir").await;

        assert_eq!(engine.navigate(Direction::Up).as_deref(), Some("dir"));
        assert_eq!(engine.navigate(Direction::Up).as_deref(), Some("ver"));
        assert_eq!(engine.navigate(Direction::Up), None);
        assert_eq!(engine.navigate(Direction::Down).as_deref(), Some("dir"));
        assert_eq!(engine.navigate(Direction::Down).as_deref(), Some(""));
        assert_eq!(engine.navigate(Direction::Down), None);

        engine.submit("echo x").await;
        assert_eq!(engine.navigate(Direction::Up).as_deref(), Some("echo x"));
    }

    #[tokio::test]
    async fn test_handler_error_becomes_error_event() {
        let (engine, mut events, _) = scripted_engine(SessionConfig::default());
        engine.submit("fail").await;

        assert_eq!(
            drain(&mut events),
            vec![
                OutputEvent::command_echo(PROMPT, "fail"),
                OutputEvent::error("disk on fire"),
            ]
        );
        assert!(engine.is_idle());
        assert_eq!(engine.history().len(), 1);
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_error_event() {
        let (engine, mut events, _) = scripted_engine(SessionConfig::default());
        engine.submit("explode").await;

        let events = drain(&mut events);
        assert_eq!(
            events.last(),
            Some(&OutputEvent::error("command panicked: handler blew up"))
        );
        assert!(engine.is_idle());

        engine.submit("ver").await;
        assert_eq!(engine.history().len(), 2);
    }

    #[tokio::test]
    async fn test_panic_while_building_command_becomes_error_event() {
        let (engine, mut events, _) = scripted_engine(SessionConfig::default());
        let engine = Arc::new(engine);

        let submitted = tokio::spawn({
            let engine = engine.clone();
            async move { engine.submit("first").await }
        });
        assert!(submitted.await.is_ok());

        let drained = drain(&mut events);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0], OutputEvent::command_echo(PROMPT, "first"));
        assert_eq!(drained[1].style(), Some(LineStyle::Error));
        let message = &drained[1].rendered_lines()[0];
        assert!(message.starts_with("command panicked: index out of bounds"));
        assert!(engine.is_idle());

        engine.submit("first word").await;
        assert_eq!(drain(&mut events).pop(), Some(plain(&["word"])));
    }

    #[tokio::test]
    async fn test_timeout_returns_session_to_idle() {
        let config =
            SessionConfig::default().with_handler_timeout(Some(Duration::from_millis(20)));
        let (engine, mut events, _) = scripted_engine(config);
        engine.submit("hang").await;

        let events = drain(&mut events);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].style(), Some(LineStyle::Error));
        assert!(events[1].rendered_lines()[0].starts_with("timeout: "));
        assert!(engine.is_idle());
    }

    #[tokio::test]
    async fn test_submission_while_processing_is_ignored() {
        let (engine, mut events, release) = scripted_engine(SessionConfig::default());
        let engine = Arc::new(engine);
        let mut ready = engine.ready();

        let pending = tokio::spawn({
            let engine = engine.clone();
            async move { engine.submit("wait").await }
        });
        ready.wait_for(|ready| !*ready).await.unwrap();

        assert_eq!(engine.state(), SessionState::Processing);
        engine.submit("echo second").await;
        engine.submit("").await;
        assert_eq!(
            drain(&mut events),
            vec![OutputEvent::command_echo(PROMPT, "wait")]
        );
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.state(), SessionState::Processing);

        release.notify_one();
        pending.await.unwrap();
        assert!(engine.is_idle());
        assert!(*ready.borrow());
        assert_eq!(drain(&mut events), vec![plain(&["done"])]);

        engine.submit("echo second").await;
        assert_eq!(
            drain(&mut events),
            vec![
                OutputEvent::command_echo(PROMPT, "echo second"),
                plain(&["second"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_stream_does_not_stop_the_session() {
        let (engine, events) = engine();
        drop(events);
        engine.submit("dir").await;
        assert!(engine.is_idle());
        assert_eq!(engine.history().len(), 1);
    }
}
