//! crmdata - query and watch dashboard collections from the command line
//!
//! Reads collections through the failover router, applies the filter,
//! search, sort and pagination pipeline, and prints JSON to stdout.
//! Logs go to stderr; set `CRMDATA_LOG` (e.g. `CRMDATA_LOG=debug`) for more.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crmdata::auth::TokenStore;
use crmdata::cli::{Cli, Command, FetchArgs, TokenAction};
use crmdata::config::AppConfig;
use crmdata::data::{DataClient, QueryParams};
use crmdata::router::{FailoverRouter, ReqwestTransport, RouterEvent};

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn init_logging() {
    let filter = EnvFilter::try_from_env("CRMDATA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult {
    let config = AppConfig::load(cli.config.as_deref())?;
    let tokens = TokenStore::new();

    match cli.command {
        Command::Token { action } => token_command(&tokens, action),
        Command::Health => {
            let router = build_router(&config, tokens)?;
            print_json(&router.check_health().await)
        }
        Command::Fetch(args) => {
            let query = args.to_query()?;
            let router = build_router(&config, tokens)?;
            fetch_command(&config, router, &args, &query).await
        }
        Command::Watch {
            endpoint,
            interval_secs,
            ticks,
        } => {
            let mut config = config;
            config.refresh.enabled = true;
            if let Some(secs) = interval_secs {
                config.refresh.interval_ms = Duration::from_secs(secs.max(1)).as_millis() as u64;
            }
            let router = build_router(&config, tokens)?;
            watch_command(&config, router, &endpoint, ticks).await
        }
    }
}

fn build_router(
    config: &AppConfig,
    tokens: TokenStore,
) -> Result<FailoverRouter, Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("crmdata/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(FailoverRouter::new(
        config.backends.clone(),
        config.router_config(),
        Arc::new(ReqwestTransport::with_client(client)),
        tokens,
    ))
}

fn token_command(tokens: &TokenStore, action: TokenAction) -> CliResult {
    match action {
        TokenAction::Set { token } => {
            tokens.write(&token)?;
            match tokens.path() {
                Some(path) => eprintln!("Token saved to {}", path.display()),
                None => eprintln!("No data directory available; token not saved"),
            }
        }
        TokenAction::Clear => {
            tokens.clear()?;
            eprintln!("Token cleared");
        }
    }
    Ok(())
}

async fn fetch_command(
    config: &AppConfig,
    router: FailoverRouter,
    args: &FetchArgs,
    query: &QueryParams,
) -> CliResult {
    let client = DataClient::new(Arc::new(router), config.data_client_config());
    let response = client.fetch(&args.endpoint, query).await?;
    print_json(&response)
}

async fn watch_command(
    config: &AppConfig,
    router: FailoverRouter,
    endpoint: &str,
    ticks: Option<usize>,
) -> CliResult {
    let mut events = router.events();
    router.spawn_health_checks();

    let client = DataClient::new(Arc::new(router.clone()), config.data_client_config());
    let (subscription, mut updates) = client.watch(endpoint);
    eprintln!(
        "Watching {} (refresh every {}s, health checks every {}s)",
        subscription.endpoint(),
        client.config().refresh.interval.as_secs(),
        router.config().health.interval.as_secs()
    );

    // Prime the subscription; later updates come from the refresh timer
    if let Err(e) = client.fetch(endpoint, &QueryParams::default()).await {
        warn!(endpoint, error = %e, "initial fetch failed");
    }

    let mut seen = 0usize;
    loop {
        if ticks.is_some_and(|limit| seen >= limit) {
            break;
        }

        tokio::select! {
            update = updates.recv() => match update {
                Some(response) => {
                    seen += 1;
                    print_json(&response)?;
                }
                None => break,
            },
            event = events.recv() => match event {
                Ok(RouterEvent::Switchover { from, to }) => {
                    info!(from = from.as_deref().unwrap_or("none"), to = %to, "backend switchover");
                    eprintln!("Switched backend to {}", to);
                }
                Ok(RouterEvent::AllBackendsDown) => eprintln!("All backends are down"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "missed router events"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    subscription.unsubscribe();
    client.destroy();
    router.shutdown();
    Ok(())
}
