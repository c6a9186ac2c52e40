use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use seeder::config::{SeedConfig, SeedMode, install_dir, redact_db_url};
use seeder::credentials::{AdminOutcome, AdminSeed};
use seeder::seed::{SeedReport, run_seed};
use seeder::{SeedError, store};

#[derive(Parser)]
#[command(
    name = "seeder",
    about = "Copro Connect: database initialisation (admin account + residents, first run only)"
)]
struct Cli {
    /// Skip the residents import
    #[arg(long, action = clap::ArgAction::SetTrue)]
    admin_only: bool,

    /// Skip the admin account bootstrap
    #[arg(long, action = clap::ArgAction::SetTrue)]
    residents_only: bool,

    /// Database connection target (mongodb://, sqlite://, postgres://)
    #[arg(long, env = "MONGODB_URI")]
    database_url: Option<String>,

    /// Residents seed file; relative paths resolve against the executable's directory
    #[arg(long, env = "RESIDENTS_JSON")]
    residents_json: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Init structured logging (respects RUST_LOG; defaults to info)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = SeedConfig::resolve(
        cli.database_url,
        cli.residents_json,
        SeedMode {
            admin_only: cli.admin_only,
            residents_only: cli.residents_only,
        },
        &install_dir(),
    );

    match run(&config).await {
        Ok(report) => {
            print_report(&report, &config.admin);
            println!("\nInitialisation complete.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &SeedConfig) -> Result<SeedReport, SeedError> {
    tracing::info!(
        database = %redact_db_url(&config.database_url),
        residents_json = %config.residents_json.display(),
        "connecting to database"
    );

    let store = store::connect(&config.database_url).await?;
    println!("Database connection OK.\n");

    run_seed(store.as_ref(), config).await
}

fn print_report(report: &SeedReport, admin_seed: &AdminSeed) {
    if let Some(admin) = report.admin {
        println!("{admin}.");
        if admin == AdminOutcome::Created {
            println!("   Username: {}", admin_seed.username);
            println!("   Password: {}", admin_seed.password);
            println!("   Email: {}", admin_seed.email);
        }
    }
    if let Some(residents) = &report.residents {
        println!("{residents}.");
    }
}
