use std::fmt;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use common::utils::logging::{init_logging_default, init_logging_json};
use configs::{AppConfig, RatingsConfig};
use dotenvy::dotenv;
use service::ratings::backend::SnapBackend;
use service::{Ratings, RatingsSettings};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "ratingsctl", version, about = "Manage the ratings snap lifecycle")]
struct Cli {
    /// Emit structured JSON logs
    #[arg(long, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Install,
    Start,
    Stop,
    Remove,
    /// Print the lifecycle state
    Status,
    /// Print the current snap configuration as JSON
    ShowConfig,
    /// Write settings and restart the service
    Configure(ConfigureArgs),
}

impl Command {
    /// Log-safe description: subcommand plus the names of supplied flags.
    fn describe(&self) -> String {
        match self {
            Command::Install => "install".to_string(),
            Command::Start => "start".to_string(),
            Command::Stop => "stop".to_string(),
            Command::Remove => "remove".to_string(),
            Command::Status => "status".to_string(),
            Command::ShowConfig => "show-config".to_string(),
            Command::Configure(args) => format!("configure {:?}", args.supplied()),
        }
    }
}

#[derive(Args, Default)]
struct ConfigureArgs {
    #[arg(long)]
    jwt_secret: Option<String>,
    #[arg(long)]
    log_level: Option<String>,
    #[arg(long)]
    postgres_uri: Option<String>,
    #[arg(long)]
    migration_postgres_uri: Option<String>,
}

// values are secrets or carry credentials; only flag names are shown
impl fmt::Debug for ConfigureArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigureArgs")
            .field("supplied", &self.supplied())
            .finish()
    }
}

impl ConfigureArgs {
    fn supplied(&self) -> Vec<&'static str> {
        [
            ("jwt_secret", &self.jwt_secret),
            ("log_level", &self.log_level),
            ("postgres_uri", &self.postgres_uri),
            ("migration_postgres_uri", &self.migration_postgres_uri),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|_| name))
        .collect()
    }

    /// Flags win; with no flags the configured `[ratings]` values are used.
    fn into_settings(self, fallback: &RatingsConfig) -> RatingsSettings {
        let flags = RatingsSettings {
            jwt_secret: self.jwt_secret,
            log_level: self.log_level,
            postgres_uri: self.postgres_uri,
            migration_postgres_uri: self.migration_postgres_uri,
        };
        if !flags.is_empty() {
            return flags;
        }
        settings_from_config(fallback)
    }
}

fn settings_from_config(cfg: &RatingsConfig) -> RatingsSettings {
    RatingsSettings {
        jwt_secret: cfg.jwt_secret.clone(),
        log_level: cfg.log_level.clone(),
        postgres_uri: cfg.postgres_uri.clone(),
        migration_postgres_uri: cfg.migration_postgres_uri.clone(),
    }
}

fn init_logging(json: bool) {
    // 加载 .env（允许使用 RUST_LOG 与 APP_* 变量）
    dotenv().ok();
    if json {
        init_logging_json();
    } else {
        init_logging_default();
    }
    info!(service = "ratingsctl", event = "logger_init", "tracing subscriber initialized");
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = AppConfig::load_and_validate()?;
    let snap_bin = common::env::ensure_env(&cfg.snap.snap_bin).await?;

    let backend = SnapBackend::new(cfg.snap.name.clone())
        .with_channel(cfg.snap.channel.clone())
        .classic(cfg.snap.classic)
        .purge_on_remove(cfg.snap.purge_on_remove)
        .with_snap_bin(snap_bin);
    let ratings = Ratings::new(Arc::new(backend));

    match cli.command {
        Command::Install => ratings.install().await?,
        Command::Start => ratings.start().await?,
        Command::Stop => ratings.stop().await?,
        Command::Remove => ratings.remove().await?,
        Command::Status => println!("{}", ratings.state().await?),
        Command::ShowConfig => {
            let snapshot = ratings.configuration().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Configure(args) => {
            let settings = args.into_settings(&cfg.ratings);
            ratings.configure(&settings).await?;
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let run_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");
    info!(
        service = "ratingsctl",
        event = "start",
        %run_id,
        pid,
        version,
        command = %cli.command.describe(),
        "ratingsctl starting"
    );

    let result = run(cli).await;
    if let Err(e) = &result {
        let code = e.downcast_ref::<service::LifecycleError>().map(|le| le.code());
        error!(
            service = "ratingsctl",
            event = "failed",
            %run_id,
            code = ?code,
            error = %e,
            "command failed"
        );
    }
    result
}
