mod config;
mod plan_cmds;
mod serve_cmd;

use clap::{Parser, Subcommand};

use admission_db::pool;

use config::AdmissionConfig;

#[derive(Parser)]
#[command(name = "admission", about = "University admission plan composition backend")]
struct Cli {
    /// Database URL (overrides ADMISSION_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an admission config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/admission")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the admission database (requires config file or env vars)
    DbInit,
    /// Serve the plan commands over HTTP
    Serve {
        /// Address to bind (defaults to the config file, then 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (defaults to the config file, then 3000)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Plan inspection
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Show plan details (or list all plans)
    Show {
        /// Plan ID to show (omit to list all)
        plan_id: Option<i64>,
        /// Print the JSON view instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Execute the `admission init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        server: config::ServerSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  server.bind  = {}", cfg.server.bind);
    println!("  server.port  = {}", cfg.server.port);
    println!();
    println!("Next: run `admission db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `admission db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = AdmissionConfig::resolve(cli_db_url)?;

    println!("Initializing admission database...");

    let db_pool = pool::prepare_store(&resolved.db_config).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("admission db-init complete.");
    Ok(())
}

/// Execute the `admission serve` command. Flags win over the config file.
async fn cmd_serve(
    cli_db_url: Option<&str>,
    bind: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let resolved = AdmissionConfig::resolve(cli_db_url)?;
    let bind = bind.unwrap_or(resolved.server.bind);
    let port = port.unwrap_or(resolved.server.port);

    let db_pool = pool::open_store(&resolved.db_config).await?;
    let result = serve_cmd::run_serve(db_pool.clone(), &bind, port).await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            cmd_serve(cli.database_url.as_deref(), bind, port).await?;
        }
        Commands::Plan { command } => {
            let resolved = AdmissionConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::open_store(&resolved.db_config).await?;
            let result = plan_cmds::run_plan_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that mutate process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_plan_show_with_id() {
        let cli = Cli::try_parse_from(["admission", "plan", "show", "42", "--json"]).unwrap();
        match cli.command {
            Commands::Plan {
                command: PlanCommands::Show { plan_id, json },
            } => {
                assert_eq!(plan_id, Some(42));
                assert!(json);
            }
            _ => panic!("expected plan show"),
        }
    }

    #[test]
    fn parses_serve_overrides_and_global_url() {
        let cli = Cli::try_parse_from([
            "admission",
            "serve",
            "--port",
            "8080",
            "--database-url",
            "postgresql://h:5432/db",
        ])
        .unwrap();
        assert_eq!(cli.database_url.as_deref(), Some("postgresql://h:5432/db"));
        match cli.command {
            Commands::Serve { bind, port } => {
                assert_eq!(bind, None);
                assert_eq!(port, Some(8080));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn rejects_non_numeric_plan_id() {
        assert!(Cli::try_parse_from(["admission", "plan", "show", "abc"]).is_err());
    }
}
