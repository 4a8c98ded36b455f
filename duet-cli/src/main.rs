use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use duet_client::media::DEFAULT_STUN_ADDR;
use duet_client::{Call, CallConfig, CallEvent, MediaConfig};
use duet_core::{IceServerConfig, SessionId};
use duet_server::RelayConfig;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duet")]
#[command(about = "Two-party WebRTC signaling relay and headless peer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,

        /// Peers admitted per session.
        #[arg(long, default_value_t = 2)]
        capacity: usize,
    },

    /// Join a session as a headless peer. The data channel drives negotiation.
    Dial {
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        relay: String,

        /// Session to join; a random one is generated when omitted.
        #[arg(long)]
        session: Option<String>,

        #[arg(long, default_value = DEFAULT_STUN_ADDR)]
        stun: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve { bind, capacity } => {
            println!("{}", "🚀 Starting duet relay...".green().bold());
            let config = RelayConfig {
                bind_addr: bind,
                session_capacity: capacity,
                ..RelayConfig::default()
            };
            duet_server::serve(config).await?;
            println!("{}", "👋 Relay stopped".green());
        }

        Commands::Dial {
            relay,
            session,
            stun,
        } => {
            let session = match session {
                Some(id) => SessionId::parse(&id).context("Invalid session id")?,
                None => SessionId::random(),
            };
            println!("{} {}", "📞 Joining session".cyan(), session.to_string().bold());

            let config = CallConfig {
                relay_url: relay,
                session,
                media: MediaConfig {
                    ice_servers: vec![IceServerConfig {
                        urls: stun,
                        username: None,
                        credential: None,
                    }],
                    ..MediaConfig::default()
                },
            };
            dial(config).await?;
        }
    }

    Ok(())
}

async fn dial(config: CallConfig) -> Result<()> {
    info!("Dialing relay {} for session {}", config.relay_url, config.session);
    let mut call = Call::dial(config).await.context("Failed to start call")?;

    loop {
        let event = tokio::select! {
            event = call.next_event() => event,
            _ = tokio::signal::ctrl_c() => None,
        };

        let Some(event) = event else {
            println!("{}", "Hanging up".yellow());
            call.hang_up().await;
            return Ok(());
        };
        match event {
            CallEvent::RoleAssigned { role, client_id } => {
                println!("   🎭 {} is {}", client_id, role.to_string().bold());
            }
            CallEvent::ConnectionStateChanged(state) => {
                println!("   🔌 connection {:?}", state);
            }
            CallEvent::NegotiationFailed(reason) => {
                println!("   {} {}", "⚠ negotiation failed:".yellow(), reason);
            }
            CallEvent::RelayRejected(reason) => {
                println!("   {} {}", "✖ relay rejected us:".red().bold(), reason);
            }
            CallEvent::Ended => {
                println!("{}", "Call ended".green());
                break;
            }
        }
    }

    Ok(())
}
