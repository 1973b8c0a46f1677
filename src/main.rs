use clap::Parser;
use pglens::{config, server};

/// pglens - A typed REST window onto a live Postgres catalog
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// HTTP server host address
    #[arg(long, default_value = "0.0.0.0")]
    http_host: String,

    /// HTTP server port
    #[arg(long, default_value_t = 8080)]
    http_port: u16,

    /// Postgres connection URL (falls back to PGLENS_DATABASE_URL, then DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Schema to expose; repeat for more than one (defaults to public)
    #[arg(long = "schema", value_name = "NAME")]
    schemas: Vec<String>,

    /// Number of pooled database connections
    #[arg(long, default_value_t = 8)]
    pool_size: usize,

    /// Seconds a request may wait for a pooled connection
    #[arg(long, default_value_t = 5)]
    acquire_timeout: u64,

    /// Whole-request deadline in seconds
    #[arg(long, default_value_t = 30)]
    request_timeout: u64,

    /// Cap applied to every query's limit
    #[arg(long)]
    max_limit: Option<u64>,

    /// Read configuration from a YAML file instead of CLI flags
    #[arg(long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,
}

impl From<Cli> for config::CliConfig {
    fn from(cli: Cli) -> Self {
        config::CliConfig {
            http_host: cli.http_host,
            http_port: cli.http_port,
            database_url: cli.database_url,
            schemas: cli.schemas,
            pool_size: cli.pool_size,
            acquire_timeout_secs: cli.acquire_timeout,
            request_timeout_secs: cli.request_timeout,
            max_limit: cli.max_limit,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    println!("\npglens v{}\n", env!("CARGO_PKG_VERSION"));

    let config_file = cli.config.clone();
    let cli_config: config::CliConfig = cli.into();
    let config = match config_file {
        Some(path) => config::ServerConfig::from_yaml_file(path),
        None => config::ServerConfig::from_cli(cli_config),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    server::run_with_config(config).await;
}
