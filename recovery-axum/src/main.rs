use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, http::HeaderValue};
use clap::{Parser, Subcommand};
use recovery::{RecoveryBuilder, ResetConfig};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Command line interface for the recovery server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://recovery.db?mode=rwc")]
    db_url: String,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Serve the reset API
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,

        /// Browser origin allowed to call the API
        #[arg(long, env = "CORS_ALLOWED_ORIGIN", default_value = "http://localhost:3000")]
        cors_origin: String,
    },
    /// Run database migrations
    Migrate,
    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Seed an account with an initial password
    Create {
        #[arg(long)]
        email: String,

        #[arg(long, env = "ACCOUNT_PASSWORD")]
        password: String,

        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            cors_origin,
        } => serve(&cli.db_url, &host, port, &cors_origin).await,
        Commands::Migrate => {
            tracing::info!("Running migrations...");
            RecoveryBuilder::new()
                .with_sqlite(&cli.db_url)
                .await?
                .apply_migrations(true)
                .build()
                .await?;
            tracing::info!("Migrations applied");
            Ok(())
        }
        Commands::Accounts {
            command:
                AccountCommands::Create {
                    email,
                    password,
                    name,
                },
        } => {
            let recovery = RecoveryBuilder::new()
                .with_sqlite(&cli.db_url)
                .await?
                .with_config(ResetConfig::from_env())
                .apply_migrations(true)
                .build()
                .await?;
            let account = recovery.create_account(&email, &password, name).await?;
            println!("Created account {} <{}>", account.id, account.email);
            Ok(())
        }
        Commands::Version => {
            println!("recovery-server v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn serve(db_url: &str, host: &str, port: u16, cors_origin: &str) -> Result<(), BoxError> {
    let origin = HeaderValue::from_str(cors_origin)?;

    let recovery = RecoveryBuilder::new()
        .with_sqlite(db_url)
        .await?
        .with_config(ResetConfig::from_env())
        .with_mailer_from_env()?
        .apply_migrations(true)
        .build()
        .await?;
    let recovery = Arc::new(recovery);

    let reaper = recovery.spawn_token_reaper();

    let app = Router::new()
        .nest(
            "/api/auth",
            recovery_axum::routes(recovery).with_cors_origin(origin).build(),
        )
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind((host, port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutting down");
    })
    .await?;

    reaper.abort();
    Ok(())
}
