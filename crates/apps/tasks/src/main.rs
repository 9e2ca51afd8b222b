use app_state::load_app_settings;
use color_eyre::Result;
use common_services::database::get_db_pool;
use tasks::task_runner::run_tasks;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let settings = load_app_settings()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pool = get_db_pool(&settings, false).await?;
    run_tasks(pool, settings).await?;

    Ok(())
}
