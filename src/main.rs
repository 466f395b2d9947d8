use anyhow::Result;
use argh::FromArgs;
use dosshell::env::Environment;
use dosshell::{
    CommandRegistry, Direction, LineStyle, OutputEvent, OutputStream, ReplEngine, SessionConfig,
    render_event,
};
use rustyline::error::ReadlineError;
use rustyline::{
    Cmd, ConditionalEventHandler, DefaultEditor, Event, EventContext, EventHandler, KeyCode,
    KeyEvent, Modifiers, Movement, RepeatCount,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// An MS-DOS style command session.
struct Args {
    /// prompt shown before each command line (defaults to $DOSSHELL_PROMPT, then "C:\> ")
    #[argh(option)]
    prompt: Option<String>,

    /// run this command line instead of reading from the terminal; may be repeated
    #[argh(option, short = 'c')]
    command: Vec<String>,

    /// do not print the session banner
    #[argh(switch)]
    no_banner: bool,

    /// abandon a command that runs longer than this many milliseconds
    #[argh(option)]
    timeout_ms: Option<u64>,

    /// log at info level; RUST_LOG is used otherwise
    #[argh(switch, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();
    init_tracing(args.verbose);

    let mut config = SessionConfig::from_env(&Environment::new())?;
    if let Some(prompt) = args.prompt {
        config = config.with_prompt(prompt);
    }
    if args.no_banner {
        config = config.with_banner(Vec::new());
    }
    if let Some(ms) = args.timeout_ms {
        config = config.with_handler_timeout(Some(Duration::from_millis(ms)));
    }

    let (engine, events) = ReplEngine::new(config, CommandRegistry::default());
    let engine = Arc::new(engine);

    if args.command.is_empty() {
        repl(engine, events).await
    } else {
        run_batch(&engine, events, &args.command).await
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_banner(out: &mut dyn Write, engine: &ReplEngine) -> Result<()> {
    for line in &engine.config().banner {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// Run the given lines one after another, printing the full transcript to stdout.
async fn run_batch(engine: &ReplEngine, mut events: OutputStream, lines: &[String]) -> Result<()> {
    let mut stdout = std::io::stdout();
    print_banner(&mut stdout, engine)?;
    for line in lines {
        engine.submit(line).await;
        while let Ok(event) = events.try_recv() {
            // a stream cannot be unprinted
            if event != OutputEvent::ClearTranscript {
                render_event(&mut stdout, &event)?;
            }
        }
    }
    Ok(())
}

/// Report panics through `tracing` instead of stderr.
///
/// The engine already turns a command panic into an error line; the default hook would
/// print over the line editor as well.
fn install_quiet_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        tracing::debug!(panic = %info, "command panicked");
    }));
}

/// Up/Down key binding that pulls the edit buffer from the engine's history.
struct HistoryRecall {
    engine: Arc<ReplEngine>,
    direction: Direction,
}

impl ConditionalEventHandler for HistoryRecall {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        _ctx: &EventContext,
    ) -> Option<Cmd> {
        Some(match self.engine.navigate(self.direction) {
            Some(text) => Cmd::Replace(Movement::WholeLine, Some(text)),
            None => Cmd::Noop,
        })
    }
}

/// Interactive loop on top of rustyline.
///
/// The editor already shows the prompt and the typed line, so echo and bare-prompt events
/// are not printed again.
async fn repl(engine: Arc<ReplEngine>, mut events: OutputStream) -> Result<()> {
    install_quiet_panic_hook();
    let mut rl = DefaultEditor::new()?;
    for (code, direction) in [(KeyCode::Up, Direction::Up), (KeyCode::Down, Direction::Down)] {
        rl.bind_sequence(
            KeyEvent(code, Modifiers::NONE),
            EventHandler::Conditional(Box::new(HistoryRecall {
                engine: engine.clone(),
                direction,
            })),
        );
    }

    let mut stdout = std::io::stdout();
    print_banner(&mut stdout, &engine)?;
    let mut ready = engine.ready();

    loop {
        ready.wait_for(|ready| *ready).await?;
        let prompt = engine.prompt().to_string();
        match tokio::task::block_in_place(|| rl.readline(&prompt)) {
            Ok(line) => {
                engine.submit(&line).await;
                while let Ok(event) = events.try_recv() {
                    match &event {
                        OutputEvent::ClearTranscript => {
                            rl.clear_screen()?;
                            print_banner(&mut stdout, &engine)?;
                        }
                        OutputEvent::Lines {
                            style: LineStyle::CommandEcho | LineStyle::PromptOnly,
                            ..
                        } => {}
                        OutputEvent::Lines { .. } => render_event(&mut stdout, &event)?,
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
                break;
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
