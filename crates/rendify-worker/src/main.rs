//! Transcode worker binary.

use aws_config::BehaviorVersion;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rendify_jobstore::{JobStore, JobStoreConfig};
use rendify_queue::{JobQueue, QueueConfig};
use rendify_storage::{StorageClient, StorageConfig};
use rendify_worker::{Processor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("rendify=info".parse().unwrap())
        .add_directive("aws_config=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting rendify-worker");

    // Required infrastructure settings; missing ones are fatal here and
    // nowhere else.
    let storage_config = match StorageConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    let store_config = match JobStoreConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    let queue_config = match QueueConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    let worker_config = WorkerConfig::from_env();
    info!("Worker config: {:?}", worker_config);

    // One shared SDK config; clients are constructed once and passed in.
    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let storage = StorageClient::new(&sdk_config, storage_config);
    let jobs = JobStore::new(&sdk_config, store_config);
    let queue = JobQueue::new(&sdk_config, queue_config);

    let processor = Processor::new(queue, storage, jobs, worker_config);

    // Setup signal handler
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    // Run the consumer loop
    if let Err(e) = processor.run(shutdown_rx).await {
        error!("Consumer error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
