use app_state::load_app_settings;
use clap::Parser;
use color_eyre::Result;
use common_services::database::get_db_pool;
use tracing_subscriber::EnvFilter;
use worker::worker::create_worker;

#[derive(Parser, Debug)]
#[command(version, about = "Runs queued upload and email jobs", long_about = None)]
struct Args {
    /// Exit once the queue is empty instead of polling forever.
    #[clap(long, default_value_t = false, action)]
    once: bool,

    /// Skip running database migrations on startup.
    #[clap(long, default_value_t = false, action)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let settings = load_app_settings()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pool = get_db_pool(&settings, !args.no_migrate).await?;
    create_worker(pool, settings, args.once).await?;

    Ok(())
}
