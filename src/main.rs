use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use window_limiter::config::LimiterConfig;
use window_limiter::ratelimit::{spawn_reaper, Decision, SlidingWindowLimiter, Status};

/// Simulate traffic against a sliding-window rate limiter.
#[derive(Debug, Parser)]
#[command(name = "window-limiter", version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the maximum requests per window
    #[arg(long)]
    max_requests: Option<u64>,

    /// Override the window length in seconds
    #[arg(long)]
    window_seconds: Option<f64>,

    /// Requests to simulate per key
    #[arg(short = 'n', long, default_value_t = 7)]
    requests: u32,

    /// Keys to simulate (repeatable)
    #[arg(short, long = "key", default_values_t = vec!["user123".to_string()])]
    keys: Vec<String>,

    /// Print decisions as JSON lines
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = LimiterConfig::load(args.config.as_deref())?;
    if let Some(max_requests) = args.max_requests {
        config.max_requests = max_requests;
    }
    if let Some(window_seconds) = args.window_seconds {
        config.window_seconds = window_seconds;
    }

    let limiter = Arc::new(SlidingWindowLimiter::from_config(&config)?);
    info!(
        max_requests = limiter.max_requests(),
        window_seconds = limiter.window_seconds(),
        "Limiter initialized"
    );

    let reaper = config
        .reaper_interval_secs
        .map(|secs| spawn_reaper(&limiter, Duration::from_secs(secs)));

    for key in &args.keys {
        if !args.json {
            println!("Key: {}", key);
        }

        for i in 1..=args.requests {
            let decision = limiter.check(key);
            if args.json {
                println!("{}", serde_json::to_string(&decision)?);
            } else {
                print_decision(i, &decision);
            }
        }
    }

    if !args.json {
        println!("Status:");
    }
    for key in &args.keys {
        let status = limiter.status(key);
        if args.json {
            println!("{}", serde_json::to_string(&status)?);
        } else {
            print_status(&status);
        }
    }

    if let Some(reaper) = reaper {
        reaper.abort();
    }

    Ok(())
}

fn print_decision(index: u32, decision: &Decision) {
    let label = if decision.allowed { "[ALLOWED]" } else { "[BLOCKED]" };
    println!(
        "  Request {}: {} ({}/{})",
        index, label, decision.current_requests, decision.max_requests
    );

    match (decision.remaining_requests, decision.time_until_reset) {
        (Some(remaining), _) => println!("    Remaining: {}", remaining),
        (None, Some(reset)) => println!("    Time until reset: {:.1}s", reset),
        (None, None) => {}
    }
}

fn print_status(status: &Status) {
    println!(
        "  {}: {}/{} (remaining: {}, allowed: {})",
        status.key,
        status.current_requests,
        status.max_requests,
        status.remaining_requests,
        status.is_allowed
    );
}
