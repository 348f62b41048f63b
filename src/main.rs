use adblock_detector::prelude::*;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Detect an active ad blocker on this machine
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Allow DNS lookups of known ad servers
    #[arg(short, long)]
    network: bool,

    /// Also look for a local filtering proxy (implies --network)
    #[arg(short = 'p', long)]
    local_proxy: bool,

    /// Check Internet connectivity first
    #[arg(long)]
    check_connectivity: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DetectorConfig::load(path)?,
        None => DetectorConfig::default(),
    };
    if args.network || args.local_proxy {
        config.allow_networking = true;
    }
    if args.local_proxy {
        config.detect_local_proxy = true;
    }

    if args.check_connectivity {
        let connected = ConnectivityChecker::new(&config).is_connected().await;
        if !args.json {
            println!("🌐 Internet {}", if connected { "reachable" } else { "unreachable" });
        }
    }

    let detector = AdBlockersDetector::new(config);
    let result = detector.detect().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.found {
        println!("🚫 Ad blocker detected ({})", result.method);
        println!("   {}", result.primary_detail);
        if !result.secondary_detail.is_empty() {
            println!("   {}", result.secondary_detail);
        }
    } else {
        println!("✅ No ad blocker detected");
    }

    Ok(())
}
