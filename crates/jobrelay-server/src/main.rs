use std::path::PathBuf;

use clap::Parser;
use jobrelay_core::auth::ProviderRegistry;
use jobrelay_core::store::SqliteStore;
use jobrelay_server::state::AppState;

/// HTTP gateway in front of the job store and the mirrored log/compute
/// backend pools.
#[derive(Parser, Debug)]
#[command(name = "jobrelay", version)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Path to the SQLite database file
    #[arg(long, env = "DB_PATH")]
    db_path: PathBuf,

    /// Ordered base URLs of the log hosts, tried first to last
    #[arg(long, env = "LOG_URLS", value_delimiter = ',', default_value = "")]
    log_urls: Vec<String>,

    /// Ordered base URLs of the compute hosts, tried first to last
    #[arg(long, env = "COMPUTE_URLS", value_delimiter = ',', default_value = "")]
    compute_urls: Vec<String>,
}

fn host_list(raw: Vec<String>) -> Vec<String> {
    raw.into_iter().filter(|u| !u.is_empty()).collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let store = SqliteStore::open(&cli.db_path).map_err(|e| {
        anyhow::anyhow!(
            "cannot open store at {}: {e} ({})",
            cli.db_path.display(),
            e.detail().unwrap_or_default()
        )
    })?;

    // Providers are wired up per deployment; the registry itself rejects
    // duplicate names at construction time.
    let registry = ProviderRegistry::new();

    let state = AppState::new(
        store,
        host_list(cli.log_urls),
        host_list(cli.compute_urls),
        registry,
    );

    jobrelay_server::serve(state, cli.port).await
}
