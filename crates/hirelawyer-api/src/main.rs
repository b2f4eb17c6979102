//! # hirelawyer-api: Binary Entry Point
//!
//! `serve` starts the HTTP server (default port 8080). Without
//! `DATABASE_URL` it runs on in-memory storage. `migrate` applies the
//! embedded schema and `seed` writes the demo data set to the database.

use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;

use hirelawyer_api::db::{self, PgRepository};
use hirelawyer_api::notify::MemoryNotifier;
use hirelawyer_api::repository::MemoryStore;
use hirelawyer_api::seed::{self, DemoData};
use hirelawyer_api::state::{AppConfig, AppState};

/// Booking and fee-negotiation backend for a lawyer-hiring marketplace.
#[derive(Parser, Debug)]
#[command(name = "hirelawyer-api", version, about)]
struct Cli {
    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default).
    Serve(ServeArgs),
    /// Apply database migrations.
    Migrate(DatabaseArgs),
    /// Write the demo data set to the database.
    Seed(DatabaseArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// PostgreSQL connection string. Absent means in-memory storage.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Shared bearer secret. Absent disables authentication.
    #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    #[arg(
        long,
        env = "HIRELAWYER_METRICS_ENABLED",
        default_value_t = true,
        action = ArgAction::Set
    )]
    metrics_enabled: bool,

    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = 1000)]
    rate_limit_max_requests: u64,

    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 60)]
    rate_limit_window_secs: u64,

    /// Load the demo data set into in-memory storage.
    #[arg(long)]
    seed_demo: bool,
}

#[derive(Args, Debug)]
struct DatabaseArgs {
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Some(Commands::Serve(args)) => serve(args).await,
        None => serve(ServeArgs::parse_env()).await,
        Some(Commands::Migrate(args)) => {
            let pool = db::init_pool(&args.database_url)
                .await
                .context("connecting to database")?;
            db::run_migrations(&pool).await.context("running migrations")?;
            Ok(())
        }
        Some(Commands::Seed(args)) => {
            let pool = db::init_pool(&args.database_url)
                .await
                .context("connecting to database")?;
            db::run_migrations(&pool).await.context("running migrations")?;
            let demo = DemoData::new()?;
            let repo = PgRepository::new(pool.clone());
            for listing in &demo.listings {
                repo.upsert_lawyer(listing).await?;
            }
            let state = AppState::with_postgres(AppConfig::default(), pool);
            seed::apply(&state.booking, &demo).await?;
            Ok(())
        }
    }
}

impl ServeArgs {
    /// `serve` arguments from the environment alone, for a bare invocation.
    fn parse_env() -> Self {
        #[derive(Parser)]
        struct Bare {
            #[command(flatten)]
            args: ServeArgs,
        }
        Bare::parse_from(["hirelawyer-api"]).args
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = AppConfig {
        port: args.port,
        auth_token: args.auth_token,
        metrics_enabled: args.metrics_enabled,
        rate_limit_max_requests: args.rate_limit_max_requests,
        rate_limit_window: Duration::from_secs(args.rate_limit_window_secs),
    };
    if config.auth_token.is_none() {
        tracing::warn!(
            "AUTH_TOKEN not set: authentication disabled, anonymous requests act as admin"
        );
    }

    let mut state = match &args.database_url {
        Some(url) => {
            let pool = db::init_pool(url).await.context("connecting to database")?;
            db::run_migrations(&pool).await.context("running migrations")?;
            if args.seed_demo {
                tracing::warn!("--seed-demo ignored with a database; use the seed command");
            }
            AppState::with_postgres(config.clone(), pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set: using in-memory storage, data is lost on exit");
            let store = MemoryStore::new();
            let state = AppState::in_memory(config.clone(), store.clone(), MemoryNotifier::new());
            if args.seed_demo {
                let demo = DemoData::new()?;
                for listing in &demo.listings {
                    store.upsert_lawyer(listing.clone());
                }
                seed::apply(&state.booking, &demo).await?;
            }
            state
        }
    };

    if config.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing Prometheus recorder")?;
        state = state.with_metrics(handle);
    }

    let app = hirelawyer_api::app(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "hirelawyer-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
