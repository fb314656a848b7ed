use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sanrio_cli::commands::{
    ensure_index::handle_ensure_index, ping::handle_ping, port_check::handle_port_check,
};
use sanrio_lib::{RetryPolicy, DEFAULT_CHARACTER_INDEX, DEFAULT_ELASTICSEARCH_HOST};

#[derive(Parser, Debug)]
#[command(author, version, about = "Sanrio characters API operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a TCP port is accepting connections.
    PortCheck {
        /// Host name or address to probe.
        #[arg(long)]
        host: String,
        /// Port to probe.
        #[arg(long)]
        port: u16,
        /// Connect timeout in seconds.
        #[arg(long, default_value_t = 3)]
        timeout_secs: u64,
    },
    /// Perform one liveness check against Elasticsearch.
    Ping {
        /// Elasticsearch base URL.
        #[arg(long, env = "ELASTICSEARCH_HOST", default_value = DEFAULT_ELASTICSEARCH_HOST)]
        host: String,
    },
    /// Connect (with retry) and create the character index if it is missing.
    EnsureIndex {
        /// Elasticsearch base URL.
        #[arg(long, env = "ELASTICSEARCH_HOST", default_value = DEFAULT_ELASTICSEARCH_HOST)]
        host: String,
        /// Index name.
        #[arg(long, env = "CHARACTER_INDEX", default_value = DEFAULT_CHARACTER_INDEX)]
        index: String,
        /// Connection attempts before giving up.
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        retries: u32,
        /// Seconds to wait between attempts.
        #[arg(long, default_value_t = 5)]
        delay_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::PortCheck {
            host,
            port,
            timeout_secs,
        } => {
            handle_port_check(&host, port, Duration::from_secs(timeout_secs)).await;
            Ok(())
        }
        Command::Ping { host } => handle_ping(&host).await.map(|_| ()),
        Command::EnsureIndex {
            host,
            index,
            retries,
            delay_secs,
        } => {
            let policy = RetryPolicy::new(retries, Duration::from_secs(delay_secs));
            handle_ensure_index(&host, &index, policy).await.map(|_| ())
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
