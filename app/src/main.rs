//! xrate command-line interface
//!
//! Fetch exchange rates, manage subscriptions and send rate notifications.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use xrate_app::{telemetry, App, AppConfig};
use xrate_common::{CurrencyPair, EmailAddress};
use xrate_notify::{NotifyError, Subscriber, Subscription};

/// Exchange-rate notifier
#[derive(Parser, Debug)]
#[command(name = "xrate")]
#[command(about = "Exchange-rate lookup with fallback providers and e-mail notifications")]
struct Args {
    /// Subscription store directory (overrides XRATE_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Currency pair, e.g. BTC/UAH (overrides XRATE_TOPIC)
    #[arg(short, long, global = true)]
    topic: Option<CurrencyPair>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current exchange rate
    Rate {
        /// Also print per-provider counters as JSON
        #[arg(long)]
        stats: bool,
    },
    /// Subscribe an address to rate notifications
    Subscribe {
        /// E-mail address
        email: EmailAddress,
    },
    /// List stored subscriptions
    Subscribers,
    /// Send the current rate to every subscriber of the topic
    Send,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::from_env();
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    telemetry::init(&config);

    let app = match App::build(&config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(anyhow::anyhow!("Configuration error: {}", e));
        }
    };
    let topic = app.topic(args.topic);

    match args.command {
        Command::Rate { stats } => {
            let rate = app
                .subscriptions()
                .request_exchange_rate(&topic)
                .await
                .with_context(|| format!("fetching {topic}"))?;
            println!("{topic} {rate}");

            if stats {
                let snapshot = app.rates().stats().snapshot();
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
        }
        Command::Subscribe { email } => {
            let subscription = Subscription::new(Subscriber::new(email), topic);
            match app.subscriptions().subscribe(subscription.clone()).await {
                Ok(()) => println!("subscribed {subscription}"),
                Err(e @ NotifyError::SubscriptionExists { .. }) => {
                    return Err(anyhow::anyhow!(e).context("already subscribed"));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Subscribers => {
            for subscription in app.subscriptions().subscriptions().await? {
                println!("{subscription}");
            }
        }
        Command::Send => {
            let sent = app
                .subscriptions()
                .send_emails(&topic)
                .await
                .with_context(|| format!("notifying {topic} subscribers"))?;
            info!(sent, topic = %topic, "Notification run complete");
            println!("sent {sent}");
        }
    }

    Ok(())
}
