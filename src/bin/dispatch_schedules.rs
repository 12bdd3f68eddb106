//! Background worker that runs due report schedules and notifies their authors.

use std::thread;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use dotenvy::dotenv;

use erp_hub::db::establish_connection_pool;
use erp_hub::load_server_config;
use erp_hub::repository::DieselRepository;
use erp_hub::services::reporting::dispatch_due_schedules;

#[derive(Parser, Debug)]
#[command(about = "Dispatch scheduled reports")]
struct Args {
    /// Run a single pass and exit.
    #[arg(long)]
    once: bool,

    /// Seconds between passes.
    #[arg(long, env = "DISPATCH_INTERVAL", default_value_t = 60)]
    interval: u64,
}

fn tick(repo: &DieselRepository) {
    match dispatch_due_schedules(repo, Utc::now().naive_utc()) {
        Ok(summary) if summary.dispatched + summary.failed == 0 => {
            log::debug!("No schedules due")
        }
        Ok(_) => {}
        Err(err) => log::error!("Failed to load due schedules: {err}"),
    }
}

fn main() {
    dotenv().ok(); // Load .env file
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args = Args::parse();

    let server_config = match load_server_config() {
        Ok(server_config) => server_config,
        Err(err) => {
            log::error!("Error loading server config: {err}");
            std::process::exit(1);
        }
    };

    let pool = match establish_connection_pool(&server_config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let repo = DieselRepository::new(pool);

    if args.once {
        tick(&repo);
        return;
    }

    log::info!("Starting schedule dispatcher, interval {}s", args.interval);
    let interval = Duration::from_secs(args.interval.max(1));
    loop {
        tick(&repo);
        thread::sleep(interval);
    }
}
