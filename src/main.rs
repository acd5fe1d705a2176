//! Churn Inference Service - Main Entry Point
//!
//! Loads the trained churn model artifacts, then answers prediction requests
//! received over NATS. Requests are processed concurrently up to the
//! configured worker count.

use anyhow::{Context, Result};
use churn_inference::{
    config::{AppConfig, LoggingConfig},
    consumer::{PredictionRequest, RequestConsumer},
    handler::handle_request,
    metrics::{MetricsReporter, PipelineMetrics},
    models::inference::ChurnPredictor,
    producer::{PredictionResponse, ResponsePublisher},
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("churn_inference={}", logging.level).parse()?);

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Churn Inference Service");
    info!(
        "Risk levels: medium>={:.2}, high>={:.2}",
        config.classification.risk_levels.medium, config.classification.risk_levels.high
    );

    // Artifacts load eagerly; any failure stops the process before it subscribes
    let predictor = Arc::new(
        ChurnPredictor::new(&config).context("Failed to load churn model artifacts")?,
    );
    info!(
        model = %predictor.model_name(),
        features = predictor.schema().len(),
        "Churn predictor ready"
    );

    let metrics = Arc::new(PipelineMetrics::new());

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(client.clone(), &config.nats.request_subject);
    let publisher = Arc::new(ResponsePublisher::new(
        client.clone(),
        &config.nats.result_subject,
    ));

    let num_workers = config.pipeline.workers.max(1);
    info!(
        workers = num_workers,
        requests = %consumer.subject(),
        results = %publisher.subject(),
        "Starting request processing loop"
    );

    let semaphore = Arc::new(Semaphore::new(num_workers));

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let predictor = predictor.clone();
        let publisher = publisher.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let response = match PredictionRequest::from_payload(&message.payload) {
                Ok(request) => {
                    let records = request.len();
                    let response = handle_request(&predictor, &metrics, request);
                    debug!(
                        request_id = %response.request_id,
                        records = records,
                        processing_time_us = start_time.elapsed().as_micros(),
                        "Request processed"
                    );
                    Some(response)
                }
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize prediction request");
                    // Only a requester waiting on a reply can use the rejection
                    message
                        .reply
                        .as_ref()
                        .map(|_| PredictionResponse::rejected(format!("invalid JSON: {}", e)))
                }
            };

            if let Some(response) = response {
                if let Err(e) = publisher.publish(message.reply.clone(), &response).await {
                    error!(
                        request_id = %response.request_id,
                        error = %e,
                        "Failed to publish prediction response"
                    );
                }
            }

            metrics.record_request(start_time.elapsed());
            drop(permit);
        });
    }

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
