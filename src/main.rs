//! Twilio Driver - SMS/MMS channel adapter for chatbots
//!
//! Serves the Twilio messaging webhook and sends outbound messages from
//! the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twilio_driver::{
    channels::{
        AdditionalParameters, Attachment, DriverContext, IncomingMessage, MessagingDriver,
        OutboundMessage, TwilioMessageDriver,
    },
    config::{resolve_credential, DriverConfig},
    gateway::GatewayBuilder,
};

#[derive(Parser)]
#[command(name = "twilio-driver")]
#[command(version)]
#[command(about = "Twilio SMS/MMS channel adapter for chatbots")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TWILIO_DRIVER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the messaging webhook
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Send a message through the REST API
    Send {
        /// Recipient phone number
        #[arg(short = 't', long)]
        to: String,

        /// Message content
        #[arg(short, long)]
        message: String,

        /// Media URL to attach (MMS)
        #[arg(long)]
        media: Option<String>,
    },

    /// Check configuration and credentials
    Doctor,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("twilio_driver={},tower_http=debug", log_level).into());
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => DriverConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => DriverConfig::default(),
    };

    match cli.command {
        Commands::Serve { host, port } => {
            run_server(config, host, port).await?;
        }
        Commands::Send { to, message, media } => {
            send_message(&config, &to, &message, media).await?;
        }
        Commands::Doctor => {
            run_doctor(&config);
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_server(config: DriverConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    tracing::info!("Starting Twilio driver gateway");

    let mut builder = GatewayBuilder::new().config(config);
    if let Some(host) = host {
        builder = builder.host(host);
    }
    if let Some(port) = port {
        builder = builder.port(port);
    }

    builder.build()?.serve().await?;
    Ok(())
}

async fn send_message(
    config: &DriverConfig,
    to: &str,
    message: &str,
    media: Option<String>,
) -> Result<()> {
    let context = Arc::new(DriverContext::from_config(config)?);
    let driver = TwilioMessageDriver::detached(context);
    let matching = IncomingMessage::new("", to, config.twilio.from_number.clone());

    let mut outgoing = OutboundMessage::new(message);
    if let Some(url) = media {
        outgoing = outgoing.with_attachment(Attachment::Image { url });
    }

    driver
        .reply(outgoing.into(), &matching, AdditionalParameters::new())
        .await?;

    println!("Message queued for {}", to);
    Ok(())
}

fn run_doctor(config: &DriverConfig) {
    println!("Twilio driver doctor");
    println!();

    let twilio = &config.twilio;
    report("Account SID set", !twilio.account_sid.is_empty());
    report("Sender number set", !twilio.from_number.is_empty());
    report(
        &format!("Auth token found in ${}", twilio.auth_token_ref),
        resolve_credential(&twilio.auth_token_ref).is_ok(),
    );
    report(
        &format!("Webhook path {}", config.gateway.webhook_path),
        config.gateway.webhook_path.starts_with('/'),
    );
    match &config.gateway.public_url {
        Some(url) => println!("  ℹ Signatures verified against {}", url),
        None => println!("  ℹ No public_url set, signatures use the request Host header"),
    }
}

fn report(check: &str, ok: bool) {
    if ok {
        println!("  ✓ {}", check);
    } else {
        println!("  ✗ {}", check);
    }
}

fn show_config(config: Option<&DriverConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    println!("{}", config.to_toml_string()?);
    Ok(())
}
