use app_state::{AppSettings, load_app_settings};
use clap::{Parser, Subcommand};
use color_eyre::Result;
use common_services::api::notifications::NotificationService;
use common_services::api::upload::{SubmitUploadRequest, UploadService};
use common_services::database::{PgRepository, UserStore, get_db_pool};
use common_services::job_queue::PgJobQueue;
use common_services::notifications::NotificationEmitter;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "uploader", version, about = "Submit and follow FASTQ folder uploads")]
struct Cli {
    /// Acting user.
    #[arg(long, global = true, default_value_t = 1)]
    user: i32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Queue a folder for upload.
    Submit {
        folder: String,
        /// Remote project to upload into. Generated from the folder name when left out.
        #[arg(long)]
        project: Option<String>,
        /// Upload again even if the folder was uploaded completely before.
        #[arg(long, default_value_t = false)]
        force: bool,
        /// Only validate the folder.
        #[arg(long, default_value_t = false)]
        check_only: bool,
    },
    /// Status of an upload, including the tail of its transfer log.
    Status { upload_id: i64 },
    /// Folders that can be submitted.
    Folders,
    /// Every upload of the user, newest first.
    Uploads,
    /// Unread notifications.
    Notifications,
    MarkRead { notification_id: i64 },
    /// Uploads waiting or running.
    Queue,
    /// Register a user. Their staging directory is named after the email.
    AddUser {
        email: String,
        #[arg(long)]
        name: Option<String>,
    },
}

struct Services {
    uploads: UploadService,
    notifications: NotificationService,
}

fn services(pool: &PgPool, settings: &AppSettings) -> Services {
    let repository = Arc::new(PgRepository::new(
        pool.clone(),
        settings.worker.heartbeat_timeout_seconds,
    ));
    let jobs = Arc::new(PgJobQueue::new(
        pool.clone(),
        settings.worker.email_max_attempts,
    ));
    let emitter = NotificationEmitter::new(
        repository.clone(),
        repository.clone(),
        jobs.clone(),
        settings.worker.concurrency,
    );
    Services {
        uploads: UploadService::new(
            repository.clone(),
            jobs,
            emitter,
            settings.uploads.clone(),
        ),
        notifications: NotificationService::new(
            repository,
            settings.notifications.unread_limit,
        ),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let settings = load_app_settings()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let pool = get_db_pool(&settings, false).await?;
    let services = services(&pool, &settings);
    match cli.command {
        Command::Submit {
            folder,
            project,
            force,
            check_only,
        } => {
            let response = services
                .uploads
                .submit_upload(SubmitUploadRequest {
                    user_id: cli.user,
                    folder_name: folder,
                    project_name: project,
                    force,
                    check_only,
                })
                .await?;
            print_json(&response)?;
        }
        Command::Status { upload_id } => {
            print_json(&services.uploads.get_upload_status(cli.user, upload_id).await?)?;
        }
        Command::Folders => print_json(&services.uploads.list_folders(cli.user).await?)?,
        Command::Uploads => print_json(&services.uploads.list_uploads(cli.user).await?)?,
        Command::Notifications => {
            print_json(&services.notifications.unread(cli.user).await?)?;
        }
        Command::MarkRead { notification_id } => {
            services
                .notifications
                .mark_read(cli.user, notification_id)
                .await?;
        }
        Command::Queue => print_json(&services.uploads.queue_info().await?)?,
        Command::AddUser { email, name } => {
            let name = name.unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_owned());
            print_json(&UserStore::create(&pool, &email, &name).await?)?;
        }
    }

    Ok(())
}
