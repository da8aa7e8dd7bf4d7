use crate::error::Result;
use crate::poc::{PocArtifact, PocNamer, write_poc};
use crate::verify::{Verdict, Verifier};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;

pub const DEFAULT_WORKERS: usize = 4;

/// One row of `results.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanVerdict {
    pub url: String,
    pub vulnerable: bool,
    pub poc_file: String,
    pub verdict: Verdict,
}

impl ScanVerdict {
    pub fn new(url: String, poc_file: String, verdict: Verdict) -> Self {
        Self {
            url,
            vulnerable: verdict.is_vulnerable(),
            poc_file,
            verdict,
        }
    }
}

/// Every verdict for one target, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub verdicts: Vec<ScanVerdict>,
}

impl ScanResult {
    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        self.verdicts.iter().filter(|v| v.verdict == verdict).count()
    }

    pub fn vulnerable(&self) -> impl Iterator<Item = &ScanVerdict> {
        self.verdicts.iter().filter(|v| v.vulnerable)
    }
}

#[derive(Debug, Clone)]
pub enum ScanEvent {
    Started { total: usize },
    Checking { index: usize, total: usize, url: String },
    Finished { index: usize, total: usize, url: String, verdict: Verdict },
}

pub type ScanProgressCallback = Arc<dyn Fn(ScanEvent) + Send + Sync>;

/// Render, persist and verify every URL.
///
/// PoCs are written up front in discovery order; verification then runs on
/// at most `workers` sandboxes at once. A worker slot is released only when
/// its probe returns, so a check abandoned at its deadline still counts
/// until its browser is gone. Verdicts are keyed by discovery index so the
/// result order never depends on which check finished first.
pub async fn scan_all(
    urls: &[String],
    poc_dir: &Path,
    verifier: &Verifier,
    workers: usize,
    progress_callback: Option<ScanProgressCallback>,
) -> Result<ScanResult> {
    let total = urls.len();
    let workers = workers.max(1);
    info!("Scanning {} pages with {} workers", total, workers);

    if let Some(ref callback) = progress_callback {
        callback(ScanEvent::Started { total });
    }

    let mut namer = PocNamer::new();
    let artifacts = urls
        .iter()
        .map(|url| write_poc(url, &namer.name_for(url), poc_dir))
        .collect::<Result<Vec<PocArtifact>>>()?;

    let permits = Arc::new(Semaphore::new(workers));
    let mut indexed: Vec<(usize, ScanVerdict)> = stream::iter(artifacts.into_iter().enumerate())
        .map(|(index, artifact)| {
            let progress_callback = progress_callback.clone();
            let permits = permits.clone();
            async move {
                if let Some(ref callback) = progress_callback {
                    callback(ScanEvent::Checking {
                        index: index + 1,
                        total,
                        url: artifact.url.clone(),
                    });
                }

                let verdict = match permits.acquire_owned().await {
                    Ok(permit) => {
                        verifier
                            .verify_holding(Some(permit), &artifact.url, &artifact.html)
                            .await
                    }
                    Err(_) => Verdict::Indeterminate,
                };

                if let Some(ref callback) = progress_callback {
                    callback(ScanEvent::Finished {
                        index: index + 1,
                        total,
                        url: artifact.url.clone(),
                        verdict,
                    });
                }

                (
                    index,
                    ScanVerdict::new(artifact.url, artifact.relative_path, verdict),
                )
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    indexed.sort_by_key(|(index, _)| *index);

    let result = ScanResult {
        verdicts: indexed.into_iter().map(|(_, verdict)| verdict).collect(),
    };

    info!(
        "Scan complete: {} vulnerable, {} safe, {} indeterminate",
        result.count(Verdict::Vulnerable),
        result.count(Verdict::Safe),
        result.count(Verdict::Indeterminate)
    );
    Ok(result)
}
