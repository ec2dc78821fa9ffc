//! Commands sent by dashboard subscribers.

use serde::Deserialize;
use thiserror::Error;

use crate::proxy::Target;

/// Why a command was refused. The target is left untouched.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("hostname must not be empty")]
    EmptyHost,

    #[error("invalid port '{0}': expected an integer between 1 and 65535")]
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientCommand {
    UpdateConfig(UpdateConfig),
}

/// Requested new target. Dashboards send the port either as a number or as
/// the raw text of an input field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateConfig {
    pub hostname: String,
    pub port: PortValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl UpdateConfig {
    /// Validate into a target.
    pub fn into_target(self) -> Result<Target, CommandError> {
        let host = self.hostname.trim();
        if host.is_empty() {
            return Err(CommandError::EmptyHost);
        }

        let port = match &self.port {
            PortValue::Number(n) => u16::try_from(*n).ok(),
            PortValue::Text(s) => s.trim().parse::<u16>().ok(),
        }
        .filter(|&p| p != 0)
        .ok_or_else(|| {
            CommandError::InvalidPort(match self.port {
                PortValue::Number(n) => n.to_string(),
                PortValue::Text(s) => s,
            })
        })?;

        Ok(Target::new(host, port))
    }
}

/// Parse a text frame into a command.
pub fn parse_command(text: &str) -> Result<ClientCommand, CommandError> {
    Ok(serde_json::from_str(text)?)
}
