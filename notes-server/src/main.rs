use clap::Parser;
use notes_core::config::API_KEY_ENV;
use notes_core::{GenerationError, NotesConfig, NotesError};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use notes_server::{http, startup};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "notes.toml")]
    config: String,

    /// Check the SQLite store and exit.
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience: production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match NotesConfig::load(&args.config).map_err(NotesError::from) {
        Ok(c) => c,
        Err(e) => fail(&format!("loading {}", args.config), e),
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    if args.health {
        let store = match startup::open_store(&config).await {
            Ok(s) => s,
            Err(e) => fail(&format!("opening {}", config.database.path), e),
        };
        match notes_core::db::health_check(store.pool()).await {
            Ok(v) => println!("✅ SQLite available: {}", v),
            Err(e) => {
                println!("❌ SQLite check failed: {}", e);
                std::process::exit(1);
            }
        }
        println!("✅ Notes DB health check passed");
        return Ok(());
    }

    // Credential is checked before the store file is created
    let state = match startup::prepare_server(config).await {
        Ok(s) => s,
        Err(e) => fail("starting server", e),
    };

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}

fn fail(context: &str, err: NotesError) -> ! {
    match err {
        NotesError::Generation(GenerationError::MissingApiKey) => {
            eprintln!("{} is not set. Add it to the environment or a .env file.", API_KEY_ENV);
        }
        other => eprintln!("Failed {}: {}", context, other),
    }
    std::process::exit(1);
}
