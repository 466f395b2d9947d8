use crate::env::Environment;
use anyhow::{Context, Result};
use chrono::Locale;
use std::time::Duration;

pub const DEFAULT_PROMPT: &str = "C:\\> ";
pub const DEFAULT_VERSION: &str = "MS-DOS Version 6.22";
pub const DEFAULT_TIME_FORMAT: &str = "%-I:%M:%S %p";
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";
/// Short formats taken from the locale's own tables.
pub const LOCALE_TIME_FORMAT: &str = "%X";
pub const LOCALE_DATE_FORMAT: &str = "%x";

const PROMPT_VAR: &str = "DOSSHELL_PROMPT";
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_TIME", "LANG"];
const TIME_FORMAT_VAR: &str = "DOSSHELL_TIME_FORMAT";
const DATE_FORMAT_VAR: &str = "DOSSHELL_DATE_FORMAT";
const TIMEOUT_VAR: &str = "DOSSHELL_COMMAND_TIMEOUT_MS";

/// Settings shared by the engine and the built-in commands for one session.
///
/// Defaults reproduce the classic look; [`SessionConfig::from_env`] lets environment
/// variables override them and the `with_*` methods apply command-line overrides on top.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Printed in front of every echoed command line.
    pub prompt: String,
    /// Lines shown when the session starts and kept when the transcript is cleared.
    pub banner: Vec<String>,
    /// The `ver` output.
    pub version: String,
    /// Locale used to render `time` and `date`.
    pub locale: Locale,
    /// `chrono` format string used by `time`.
    pub time_format: String,
    /// `chrono` format string used by `date`.
    pub date_format: String,
    /// Upper bound on a single command's run time; `None` waits forever.
    pub handler_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            banner: vec![
                "Microsoft(R) MS-DOS(R) Version 6.22".to_string(),
                "(C)Copyright Microsoft Corp 1981-1994.".to_string(),
            ],
            version: DEFAULT_VERSION.to_string(),
            locale: Locale::POSIX,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            handler_timeout: None,
        }
    }
}

impl SessionConfig {
    /// Build a configuration from defaults overridden by environment variables.
    ///
    /// The host locale (`LC_ALL`, `LC_TIME`, then `LANG`) picks the `time` and `date`
    /// shapes: POSIX and US English keep the classic ones, any other known locale uses
    /// its own short formats. Explicit format variables win over both.
    pub fn from_env(env: &Environment) -> Result<Self> {
        let mut config = Self {
            locale: host_locale(env),
            ..Self::default()
        };
        if !matches!(config.locale, Locale::POSIX | Locale::en_US) {
            config.time_format = LOCALE_TIME_FORMAT.to_string();
            config.date_format = LOCALE_DATE_FORMAT.to_string();
        }
        if let Some(prompt) = env.get_var(PROMPT_VAR) {
            config.prompt = prompt.to_string();
        }
        if let Some(fmt) = env.get_var(TIME_FORMAT_VAR) {
            config.time_format = fmt.to_string();
        }
        if let Some(fmt) = env.get_var(DATE_FORMAT_VAR) {
            config.date_format = fmt.to_string();
        }
        if let Some(raw) = env.get_var(TIMEOUT_VAR) {
            let millis: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{TIMEOUT_VAR}: expected milliseconds, got {raw:?}"))?;
            config.handler_timeout = Some(Duration::from_millis(millis));
        }
        Ok(config)
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_banner(mut self, banner: Vec<String>) -> Self {
        self.banner = banner;
        self
    }

    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }
}

/// First locale variable that is set, reduced to a `chrono` locale name.
///
/// `de_DE.UTF-8@euro` becomes `de_DE`; `C`, `POSIX` and unknown names fall back to POSIX.
fn host_locale(env: &Environment) -> Locale {
    let Some(raw) = LOCALE_VARS.iter().find_map(|var| env.get_var(var)) else {
        return Locale::POSIX;
    };
    let name = raw.split(['.', '@']).next().unwrap_or(raw);
    match name {
        "C" | "POSIX" => Locale::POSIX,
        _ => Locale::try_from(name).unwrap_or_else(|_| {
            tracing::debug!(locale = raw, "unknown locale, using POSIX formats");
            Locale::POSIX
        }),
    }
}
