mod config;
mod http;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DbPool, connect};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::{EmployeeInput, HrError, repository};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "employee-server", version, about = "Employee directory service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Insert a handful of demo employees.
    Seed,
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Start without applying pending migrations")]
    skip_migrations: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env())?;
    let cli = Cli::parse();
    let app_config = Arc::new(AppConfig::load()?);
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, app_config).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up(&app_config).await,
            MigrateCommand::Down => migrate_down(&app_config).await,
        },
        Command::Seed => run_seed(&app_config).await,
    }
}

async fn setup_pool(config: &AppConfig) -> Result<DbPool> {
    connect(&config.database)
        .await
        .context("failed to connect to the database")
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let pool = setup_pool(&config).await?;
    if cmd.skip_migrations {
        let pending = Migrator::get_pending_migrations(&pool).await?;
        if !pending.is_empty() {
            warn!(pending = pending.len(), "starting with pending migrations");
        }
    } else {
        Migrator::up(&pool, None).await?;
    }
    let state = AppState { pool, config };
    http::serve(ServeConfig::from(&cmd), state).await
}

async fn migrate_up(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

async fn run_seed(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    Migrator::up(&pool, None).await?;

    let mut inserted = 0usize;
    for input in demo_employees()? {
        match repository::create(&pool, input).await {
            Ok(_) => inserted += 1,
            Err(HrError::DuplicateEmail) => {}
            Err(err) => return Err(err).context("failed to seed employees"),
        }
    }
    info!(inserted, "demo employees seeded");
    Ok(())
}

fn demo_employees() -> Result<Vec<EmployeeInput>> {
    Ok(vec![
        EmployeeInput::new("Asha", "Verma", "asha.verma@example.com")
            .phone("9876543210")
            .department("Engineering")
            .position("Software Engineer")
            .salary(85000.0)
            .hire_date(date(2022, 3, 14)?),
        EmployeeInput::new("Rahul", "Mehta", "rahul.mehta@example.com")
            .phone("9123456780")
            .department("Engineering")
            .position("Team Lead")
            .salary(120000.0)
            .hire_date(date(2019, 7, 1)?),
        EmployeeInput::new("Priya", "Nair", "priya.nair@example.com")
            .phone("9988776655")
            .department("Human Resources")
            .position("HR Manager")
            .salary(90000.0)
            .hire_date(date(2020, 11, 23)?),
        EmployeeInput::new("Vikram", "Singh", "vikram.singh@example.com")
            .phone("9012345678")
            .department("Sales")
            .position("Account Executive")
            .salary(60000.0)
            .hire_date(date(2023, 1, 9)?),
        EmployeeInput::new("Meera", "Iyer", "meera.iyer@example.com")
            .phone("9871234560")
            .department("Finance")
            .position("Accountant")
            .salary(70000.0)
            .hire_date(date(2021, 5, 17)?),
    ])
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("invalid date {year}-{month}-{day}"))
}
