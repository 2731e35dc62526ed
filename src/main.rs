use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use placedb::interface::StoreInterface;
use placedb::persist::build_store;
use placedb::server::{router, AppState};
use placedb::settings::{Overrides, Settings};

#[derive(Parser, Debug)]
#[command(name = "placedb", version, about = "Build and serve the map placement store")]
struct Cli {
    /// Base name of the optional settings file
    #[arg(long, default_value = "placedb")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest the raw map dumps and swap in a new store
    Build {
        #[arg(long, value_name = "DIR")]
        content: Option<PathBuf>,
        #[arg(long, value_name = "PATH")]
        store: Option<PathBuf>,
    },
    /// Serve the store read-only over HTTP
    Serve {
        #[arg(long, value_name = "PATH")]
        store: Option<PathBuf>,
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
        #[arg(long, value_name = "DIR")]
        icons: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let overrides = match &cli.command {
        Command::Build { content, store } => Overrides {
            content_dir: content.clone(),
            store_path: store.clone(),
            ..Overrides::default()
        },
        Command::Serve { store, bind, icons } => Overrides {
            store_path: store.clone(),
            bind: bind.clone(),
            icon_dir: icons.clone(),
            ..Overrides::default()
        },
    };
    let settings = match Settings::load(&cli.config, overrides) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "could not load settings");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Command::Build { .. } => build_store(&settings.content_dir, &settings.store_path).map(|_| ()),
        Command::Serve { .. } => serve(settings),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "placedb failed");
            ExitCode::FAILURE
        }
    }
}

fn serve(settings: Settings) -> placedb::Result<()> {
    let store = Arc::new(StoreInterface::open(&settings.store_path)?);
    let bind = settings.bind;
    let state = Arc::new(AppState { store, icon_dir: settings.icon_dir });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind).await?;
        info!(%bind, "listening");
        axum::serve(listener, router(state)).await?;
        Ok::<(), placedb::PlacedbError>(())
    })
}
