//! match-dash - terminal dashboard for Match Masters user and purchase statistics.

use chrono::Local;
use match_dash::analytics::Dashboard;
use match_dash::cli::Cli;
use match_dash::config::{Config, ConnectionConfig};
use match_dash::db::MockDatabaseClient;
use match_dash::error::{DashError, Result};
use match_dash::logging;
use match_dash::tui::{self, headless, App};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init(&logging::LogTarget::for_mode(cli.headless));

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{}: {}", e.category(), e);
            eprintln!("{}: {}", e.category(), e.message());
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    cli.validate_headless()?;
    cli.validate_user_id()?;

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let settings = config.dashboard.clone();
    let top_cities = settings.top_cities;
    let today = Local::now().date_naive();
    let range = cli.date_range(today, settings.lookback_days)?;

    let (dashboard, connection_info) = if cli.mock_db {
        info!("Using the in-memory sample warehouse");
        let client = MockDatabaseClient::sample(today);
        (Dashboard::new(Box::new(client), settings)?, None)
    } else {
        let connection = resolve_connection(&cli, &config)?.ok_or_else(|| {
            DashError::config(
                "No warehouse connection configured. Pass a connection string, \
                 use --connection, or set DATABASE_URL",
            )
        })?;
        info!("Connection: {}", connection.display_string());
        let info = connection.display_string();
        (Dashboard::connect(&connection, settings).await?, Some(info))
    };

    let app = App::new(range, top_cities, connection_info);

    if cli.headless {
        headless::run_headless(&cli, dashboard, app).await
    } else {
        tui::run(dashboard, app, cli.user_id.as_deref()).await?;
        Ok(0)
    }
}

/// Resolves the warehouse connection.
///
/// Command-line settings are layered over a `--connection` entry, or stand
/// alone, or fall back to the default entry. `DATABASE_URL` comes next.
/// `PG*` environment variables fill whatever is still unset.
fn resolve_connection(cli: &Cli, config: &Config) -> Result<Option<ConnectionConfig>> {
    let overrides = cli.to_connection_config()?;
    let mut connection = config.resolve_connection(cli.connection_name(), overrides.as_ref())?;

    if connection.is_none() {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            connection = Some(ConnectionConfig::from_connection_string(&url)?);
        }
    }

    if connection.is_none() && std::env::var_os("PGHOST").is_some() {
        connection = Some(ConnectionConfig::default());
    }

    if let Some(ref mut conn) = connection {
        conn.apply_env_defaults();
    }

    Ok(connection)
}
