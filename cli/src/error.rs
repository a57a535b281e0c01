//! Error types for party-cli

use party_link::PartyLinkError;
use std::fmt;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug)]
pub enum CliError {
    /// Error from party-link library
    LinkError(PartyLinkError),

    /// Bad flag combination or config value
    ConfigurationError(String),

    /// The connection ended in the terminal error state
    ConnectionFailed(String),

    /// Installing or waiting on the Ctrl-C handler failed
    SignalError(std::io::Error),
}

impl CliError {
    fn format_link_error(err: &PartyLinkError) -> String {
        match err {
            PartyLinkError::NetworkError(msg) => Self::clean_nested_message(msg),
            PartyLinkError::TransportError(msg) => Self::clean_nested_message(msg),
            other => other.to_string(),
        }
    }

    fn clean_nested_message(message: &str) -> String {
        let mut cleaned = message.trim();
        let prefixes = ["Connection failed:", "connection failed:", "Network error:", "network error:"];

        while let Some(rest) = prefixes.iter().find_map(|p| cleaned.strip_prefix(p)) {
            cleaned = rest.trim_start();
        }

        cleaned.to_string()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LinkError(e) => write!(f, "{}", Self::format_link_error(e)),
            CliError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            CliError::SignalError(e) => write!(f, "Signal handling failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<PartyLinkError> for CliError {
    fn from(err: PartyLinkError) -> Self {
        CliError::LinkError(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::SignalError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CliError::ConfigurationError("base_url is required".into());
        assert_eq!(err.to_string(), "Configuration error: base_url is required");

        let err = CliError::ConnectionFailed("Max reconnection attempts (5) reached".into());
        assert_eq!(err.to_string(), "Connection failed: Max reconnection attempts (5) reached");
    }

    #[test]
    fn test_io_error_is_a_signal_error() {
        let io = std::io::Error::other("no handler");
        let err: CliError = io.into();
        assert!(matches!(err, CliError::SignalError(_)));
        assert_eq!(err.to_string(), "Signal handling failed: no handler");
    }

    #[test]
    fn test_nested_prefixes_are_stripped() {
        let err: CliError =
            PartyLinkError::TransportError("Connection failed: network error: refused".into()).into();
        assert_eq!(err.to_string(), "refused");
    }
}
