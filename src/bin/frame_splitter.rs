//! Frame Splitter Binary
//!
//! Long-running service that:
//! 1. Polls an SQS queue for `{"streamARN", "bucket", "s3Directory"}` requests.
//! 2. Reads each requested Kinesis Video stream from its earliest fragment.
//! 3. Writes every decoded frame to S3 as `<s3Directory>/<n>.png`.
//!
//! Configuration comes from flags or environment variables (see
//! `--help`); a `.env` file is loaded first.

use clap::Parser;
use frame_splitter::adapters::aws::{KinesisVideoAdapter, S3Adapter, SqsAdapter};
use frame_splitter::adapters::ffmpeg::{FfmpegContainerReader, FfmpegDecoders};
use frame_splitter::application::TaskDispatcher;
use frame_splitter::config::{SplitterArgs, SplitterConfig};
use std::error::Error;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv::dotenv().ok();

    let args = SplitterArgs::parse();
    init_tracing(&args.log_level);

    let config = match args.validate() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    info!(
        region = %config.region,
        profile = config.profile.as_deref().unwrap_or("<default>"),
        queue = %config.queue_name,
        wait_seconds = config.wait_seconds,
        frame_splitter_threads = config.frame_splitter_threads,
        image_publisher_threads = config.image_publisher_threads,
        "Starting frame splitter"
    );

    let mut dispatcher = build_dispatcher(&config).await?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    dispatcher.run(shutdown).await;
    info!("Frame splitter stopped");
    Ok(())
}

async fn build_dispatcher(
    config: &SplitterConfig,
) -> Result<TaskDispatcher<SqsAdapter, KinesisVideoAdapter>, Box<dyn Error + Send + Sync>> {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));
    if let Some(profile) = &config.profile {
        loader = loader.profile_name(profile);
    }
    let sdk_config = loader.load().await;

    let queue =
        SqsAdapter::from_queue_name(aws_sdk_sqs::Client::new(&sdk_config), &config.queue_name)
            .await?;
    info!(queue_url = %queue.queue_url(), "Resolved queue");

    let storage = Arc::new(S3Adapter::new(aws_sdk_s3::Client::new(&sdk_config)));
    let directory = KinesisVideoAdapter::new(&sdk_config);
    let reader = Arc::new(FfmpegContainerReader::new()?);
    let decoders = Arc::new(FfmpegDecoders::new()?);

    Ok(TaskDispatcher::new(
        queue,
        directory,
        storage,
        reader,
        decoders,
        config.dispatch_settings(),
    ))
}

fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, stopping");
        }
        _ = terminate => {
            info!("Received SIGTERM signal, stopping");
        }
    }
}
