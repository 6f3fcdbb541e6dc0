use std::io::IsTerminal;

use serde::Deserialize;

use crate::{error::LoggerError, format::LoggerFormat};

/// Environment variable overriding [`LoggerConfig::level`].
pub const ENV_LOG_LEVEL: &str = "QD_LOG_LEVEL";
/// Environment variable overriding [`LoggerConfig::format`].
pub const ENV_LOG_FORMAT: &str = "QD_LOG_FORMAT";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive, e.g. `info` or `warn,qd.exec.lsf=debug`.
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stdout().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color,
        }
    }
}

impl LoggerConfig {
    /// Apply `QD_LOG_LEVEL` / `QD_LOG_FORMAT` on top of `self`.
    pub fn with_env(self) -> Result<Self, LoggerError> {
        self.with_overrides(
            std::env::var(ENV_LOG_LEVEL).ok(),
            std::env::var(ENV_LOG_FORMAT).ok(),
        )
    }

    fn with_overrides(
        mut self,
        level: Option<String>,
        format: Option<String>,
    ) -> Result<Self, LoggerError> {
        if let Some(level) = level.filter(|l| !l.trim().is_empty()) {
            self.level = level;
        }
        if let Some(format) = format.filter(|f| !f.trim().is_empty()) {
            self.format = format.parse()?;
        }
        Ok(self)
    }
}
