use super::service::OcrService;
use super::types::{OcrFailure, OcrRequest, OcrResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Process several requests concurrently.
///
/// At most `max_concurrent` engine processes run at once (defaults to the number of
/// CPUs). Results are returned in the same order as `requests`, and a failing request
/// never affects the others.
pub async fn process_batch(
    service: &OcrService,
    requests: Vec<OcrRequest>,
    max_concurrent: Option<usize>,
) -> Vec<OcrResult> {
    if requests.is_empty() {
        return vec![];
    }

    let max_concurrent = max_concurrent.unwrap_or_else(num_cpus::get).max(1);
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    tracing::debug!(
        "Processing batch of {} OCR requests (max concurrent: {})",
        requests.len(),
        max_concurrent
    );

    let mut tasks = JoinSet::new();
    let total = requests.len();

    for (index, request) in requests.into_iter().enumerate() {
        let service = service.clone();
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            (index, service.process(request).await)
        });
    }

    let mut results: Vec<Option<OcrResult>> = vec![None; total];

    while let Some(task_result) = tasks.join_next().await {
        match task_result {
            Ok((index, result)) => results[index] = Some(result),
            Err(join_err) => tracing::error!("OCR batch task panicked: {}", join_err),
        }
    }

    results
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                OcrResult::failure(
                    OcrFailure::ProcessFailed {
                        exit_code: None,
                        stderr: "OCR task panicked".to_string(),
                    },
                    Duration::ZERO,
                )
            })
        })
        .collect()
}
