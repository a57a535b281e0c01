//! Party CLI - terminal host for the party-link realtime client
//!
//! # Usage
//!
//! ```bash
//! # Watch every event over SSE
//! party-cli -u http://localhost:8080/api
//!
//! # STOMP, only party updates, say hello once connected
//! party-cli -u http://localhost:8080/api -t stomp -f PARTY_UPDATED --chat "hi all"
//! ```

use std::time::Duration;

use clap::Parser;
use party_link::{ConnectionStatus, EventHandlers, LinkConfig, RealtimeClient, WILDCARD};
use tokio::sync::mpsc;

mod args;
mod error;

use args::Cli;
use error::{CliError, Result};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// File, then environment, then flags.
fn resolve_config(cli: &Cli) -> Result<LinkConfig> {
    let mut config = LinkConfig::load(&cli.config)?.with_env_overrides()?;

    if let Some(url) = &cli.url {
        config.server.base_url = Some(url.clone());
    }
    if let Some(transport) = cli.transport {
        config.connection.transport = transport;
    }
    if let Some(max) = cli.max_reconnect_attempts {
        config.connection.max_reconnect_attempts = max;
    }
    if let Some(user_id) = &cli.user_id {
        config.server.user_id = Some(user_id.clone());
    }
    if let Some(username) = &cli.username {
        config.server.username = Some(username.clone());
    }
    Ok(config)
}

/// Logging handlers. The final error of an exhausted retry budget is also
/// forwarded on `fatal_tx`.
fn lifecycle_handlers(fatal_tx: mpsc::UnboundedSender<String>) -> EventHandlers {
    EventHandlers::new()
        .on_connect(|| log::info!("Connected"))
        .on_disconnect(|reason| log::info!("Disconnected: {}", reason))
        .on_error(move |err| {
            if err.will_retry {
                log::warn!("Connection error (attempt {}): {}", err.attempt + 1, err);
            } else {
                log::error!("Connection error, giving up: {}", err);
                let _ = fatal_tx.send(err.message);
            }
        })
        .on_status_change(|status| log::debug!("Status -> {}", status))
}

async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    if cli.chat.is_some() && !config.connection.transport.supports_outbound() {
        return Err(CliError::ConfigurationError(format!(
            "--chat needs the stomp transport (current: {})",
            config.connection.transport
        )));
    }

    let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
    let client = config
        .client_builder()?
        .event_handlers(lifecycle_handlers(fatal_tx))
        .build()?;
    log::info!(
        "Connecting to {} via {} as {}",
        config.base_url()?,
        client.transport_kind(),
        client.client_id()
    );

    let filters = if cli.filter.is_empty() {
        vec![WILDCARD.to_string()]
    } else {
        cli.filter.clone()
    };
    for event_type in &filters {
        client.on(event_type, |event| match event.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => log::warn!("Could not render event {}: {}", event.id, e),
        });
    }

    client.connect().await;

    if let Some(message) = &cli.chat {
        let chat_client = client.clone();
        let message = message.clone();
        tokio::spawn(async move {
            chat_client.wait_for_status(ConnectionStatus::Connected).await;
            if !chat_client.send_chat_message(message).await {
                log::warn!("Chat message was not sent");
            }
        });
    }

    let outcome = watch(&client, fatal_rx, cli.status_interval).await;
    client.disconnect().await;
    client.log_connection_status();
    outcome
}

/// Run until Ctrl-C or until the client gives up reconnecting.
async fn watch(
    client: &RealtimeClient,
    mut fatal_rx: mpsc::UnboundedReceiver<String>,
    status_interval: u64,
) -> Result<()> {
    let mut ticker = (status_interval > 0)
        .then(|| tokio::time::interval(Duration::from_secs(status_interval)));

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                log::info!("Interrupted; disconnecting");
                return Ok(());
            }

            fatal = fatal_rx.recv() => {
                let reason = fatal.unwrap_or_else(|| "connection task ended".to_string());
                return Err(CliError::ConnectionFailed(reason));
            }

            _ = async {
                match ticker.as_mut() {
                    Some(ticker) => { ticker.tick().await; },
                    None => std::future::pending::<()>().await,
                }
            } => {
                client.log_connection_status();
            }
        }
    }
}
