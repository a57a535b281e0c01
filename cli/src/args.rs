use clap::Parser;
use party_link::TransportKind;
use std::path::PathBuf;

/// Party CLI - watch the party service's realtime event stream
#[derive(Parser, Debug)]
#[command(name = "party-cli")]
#[command(version)]
#[command(about = "Stream realtime party events to the terminal", long_about = None)]
pub struct Cli {
    /// Service API root (e.g., http://localhost:8080/api)
    #[arg(short = 'u', long = "url", env = "PARTY_LINK_BASE_URL")]
    pub url: Option<String>,

    /// Transport: sse or stomp
    #[arg(short = 't', long = "transport")]
    pub transport: Option<TransportKind>,

    /// Configuration file path
    #[arg(long = "config", default_value = "party-link.toml")]
    pub config: PathBuf,

    /// Fixed user id instead of a generated one
    #[arg(long = "user-id")]
    pub user_id: Option<String>,

    /// Display name sent with join and chat messages
    #[arg(long = "username")]
    pub username: Option<String>,

    /// Only print events of these types (repeatable; default: all)
    #[arg(short = 'f', long = "filter", value_name = "EVENT_TYPE")]
    pub filter: Vec<String>,

    /// Send one chat message once connected (STOMP only)
    #[arg(long = "chat", value_name = "MESSAGE")]
    pub chat: Option<String>,

    /// Reconnection attempts before giving up (0 disables reconnection)
    #[arg(long = "max-reconnect-attempts")]
    pub max_reconnect_attempts: Option<u32>,

    /// Print connection diagnostics every N seconds (0 = never)
    #[arg(long = "status-interval", value_name = "SECONDS", default_value_t = 0)]
    pub status_interval: u64,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["party-cli"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("party-link.toml"));
        assert!(cli.transport.is_none());
        assert!(cli.filter.is_empty());
        assert_eq!(cli.status_interval, 0);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_full_invocation() {
        let cli = Cli::try_parse_from([
            "party-cli",
            "--url",
            "http://localhost:8080/api",
            "--transport",
            "stomp",
            "--filter",
            "PARTY_UPDATED",
            "-f",
            "USER_JOINED",
            "--chat",
            "hello",
            "--username",
            "Bard",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.url.as_deref(), Some("http://localhost:8080/api"));
        assert_eq!(cli.transport, Some(TransportKind::Stomp));
        assert_eq!(cli.filter, vec!["PARTY_UPDATED", "USER_JOINED"]);
        assert_eq!(cli.chat.as_deref(), Some("hello"));
        assert_eq!(cli.username.as_deref(), Some("Bard"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_unknown_transport_rejected() {
        assert!(Cli::try_parse_from(["party-cli", "--transport", "carrier-pigeon"]).is_err());
    }
}
