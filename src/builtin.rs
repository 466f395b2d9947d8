use crate::command::{CommandContext, CommandFactory, CommandInfo, CommandOutput, ExecutableCommand};
use crate::registry::Factory;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::fmt::Write as _;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are synchronous and total over their arguments; they run in-process on the
/// engine's task.
pub(crate) trait BuiltinCommand: Sized + Send + 'static {
    /// Canonical lower-case name of the command, e.g. "echo" or "dir".
    fn name() -> &'static str;

    /// One-line description shown by `help`.
    fn summary() -> &'static str;

    /// Builds the command from the whitespace-split arguments after its name.
    fn from_args(args: &[&str]) -> Self;

    /// Executes the command and returns its output.
    fn execute(self, ctx: &CommandContext<'_>) -> Result<CommandOutput>;
}

#[async_trait]
impl<T: BuiltinCommand> ExecutableCommand for T {
    async fn execute(self: Box<Self>, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        <T as BuiltinCommand>::execute(*self, ctx)
    }
}

impl<T: BuiltinCommand> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(Box::new(T::from_args(args)))
        } else {
            None
        }
    }

    fn describe(&self) -> Option<CommandInfo> {
        Some(CommandInfo {
            name: T::name(),
            summary: T::summary(),
        })
    }
}

/// List every described command, `NAME` padded to eight columns.
pub struct Help;

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn summary() -> &'static str {
        "Display this help message"
    }

    fn from_args(_args: &[&str]) -> Self {
        Help
    }

    fn execute(self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        Ok(ctx
            .catalog
            .iter()
            .map(|info| format!("{:<8}- {}", info.name.to_uppercase(), info.summary))
            .collect())
    }
}

/// Clear the transcript down to the session banner.
pub struct Clear;

impl BuiltinCommand for Clear {
    fn name() -> &'static str {
        "clear"
    }

    fn summary() -> &'static str {
        "Clear the terminal screen"
    }

    fn from_args(_args: &[&str]) -> Self {
        Clear
    }

    fn execute(self, _ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::ClearTranscript)
    }
}

/// Write the arguments back, separated by single spaces.
pub struct Echo {
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn summary() -> &'static str {
        "Display a message"
    }

    fn from_args(args: &[&str]) -> Self {
        Echo {
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn execute(self, _ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::line(self.args.join(" ")))
    }
}

fn format_now(ctx: &CommandContext<'_>, command: &str, fmt: &str) -> Result<CommandOutput> {
    let mut out = String::new();
    let now = ctx.clock.now();
    write!(out, "{}", now.format_localized(fmt, ctx.config.locale))
        .map_err(|_| anyhow!("{command}: invalid format string {fmt:?}"))?;
    Ok(CommandOutput::line(out))
}

/// Current local time.
pub struct Time;

impl BuiltinCommand for Time {
    fn name() -> &'static str {
        "time"
    }

    fn summary() -> &'static str {
        "Display current time"
    }

    fn from_args(_args: &[&str]) -> Self {
        Time
    }

    fn execute(self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        format_now(ctx, Self::name(), &ctx.config.time_format)
    }
}

/// Current local date.
pub struct Date;

impl BuiltinCommand for Date {
    fn name() -> &'static str {
        "date"
    }

    fn summary() -> &'static str {
        "Display current date"
    }

    fn from_args(_args: &[&str]) -> Self {
        Date
    }

    fn execute(self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        format_now(ctx, Self::name(), &ctx.config.date_format)
    }
}

pub struct Ver;

impl BuiltinCommand for Ver {
    fn name() -> &'static str {
        "ver"
    }

    fn summary() -> &'static str {
        "Display version information"
    }

    fn from_args(_args: &[&str]) -> Self {
        Ver
    }

    fn execute(self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::line(ctx.config.version.clone()))
    }
}

const DIR_FILES: [&str; 6] = [
    "AUTOEXEC.BAT",
    "COMMAND.COM",
    "CONFIG.SYS",
    "IO.SYS",
    "MSDOS.SYS",
    "README.TXT",
];

/// Canned listing of the root directory; there is no file system behind it.
pub struct Dir;

impl BuiltinCommand for Dir {
    fn name() -> &'static str {
        "dir"
    }

    fn summary() -> &'static str {
        "List directory contents"
    }

    fn from_args(_args: &[&str]) -> Self {
        Dir
    }

    fn execute(self, _ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        let mut lines = vec![
            " Volume in drive C is SYSTEM".to_string(),
            " Volume Serial Number is 1A2B-3C4D".to_string(),
            " Directory of C:\\".to_string(),
            String::new(),
        ];
        lines.extend(DIR_FILES.iter().map(|file| format!("         {file}")));
        lines.push(format!("               {} File(s)", DIR_FILES.len()));
        lines.push("                     0 Dir(s)".to_string());
        Ok(CommandOutput::Lines(lines))
    }
}

const COLOR_HELP: [&str; 15] = [
    "Specifies color attributes of console output.",
    "",
    "COLOR [attr]",
    "",
    "  attr        Specifies color attribute of console output",
    "             0 = Black       8 = Gray",
    "             1 = Blue        9 = Light Blue",
    "             2 = Green       A = Light Green",
    "             3 = Aqua        B = Light Aqua",
    "             4 = Red         C = Light Red",
    "             5 = Purple      D = Light Purple",
    "             6 = Yellow      E = Light Yellow",
    "             7 = White       F = Bright White",
    "",
    "Example: \"COLOR 0A\" produces green on black.",
];

/// Acknowledge a colour attribute, or explain the codes when none is given.
///
/// Nothing is actually restyled.
pub struct Color {
    pub code: Option<String>,
}

impl BuiltinCommand for Color {
    fn name() -> &'static str {
        "color"
    }

    fn summary() -> &'static str {
        "Change text color (e.g., COLOR 0A for green on black)"
    }

    fn from_args(args: &[&str]) -> Self {
        Color {
            code: args.first().map(|s| s.to_string()),
        }
    }

    fn execute(self, _ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        Ok(match self.code {
            None => COLOR_HELP.into_iter().collect(),
            Some(code) => CommandOutput::line(format!(
                "Color changed to {code} (visual change not implemented in this demo)"
            )),
        })
    }
}

/// Response for any dispatch key no factory claims.
pub(crate) struct NotRecognized {
    pub name: String,
}

#[async_trait]
impl ExecutableCommand for NotRecognized {
    async fn execute(self: Box<Self>, _ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Lines(vec![
            format!(
                "'{}' is not recognized as an internal or external command,",
                self.name
            ),
            "operable program or batch file.".to_string(),
            "Type HELP for a list of available commands.".to_string(),
        ]))
    }
}
