pub mod headers;
pub mod tesseract;

use std::future::Future;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use headers::{classify_headers, HeaderPolicy};

/// Text recognition backend with an explicit per-batch lifecycle.
///
/// `initialize` is expensive; a batch calls it once, shares the handle across
/// every `recognize`, and hands it back to `release` exactly once.
#[allow(async_fn_in_trait)]
pub trait OcrEngine {
    type Handle;

    async fn initialize(&self, language: &str) -> Result<Self::Handle>;
    async fn recognize(&self, handle: &Self::Handle, location: &str) -> Result<String>;
    async fn release(&self, handle: Self::Handle);
}

/// Header lines recovered from one image. Serialized as `{index, src, judul}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OcrResult {
    #[serde(rename = "index")]
    pub sequence_index: usize,
    #[serde(rename = "src")]
    pub source_location: String,
    #[serde(rename = "judul")]
    pub header_lines: Vec<String>,
}

/// Recognize every image in input order and classify its header lines.
///
/// Per-image failures produce an entry with no header lines. If `cancel`
/// resolves first, the batch is abandoned and `Cancelled` is returned. The
/// engine is released once on every path after a successful `initialize`.
pub async fn run_ocr_batch<E, C>(
    engine: &E,
    language: &str,
    locations: &[String],
    policy: &HeaderPolicy,
    cancel: C,
) -> Result<Vec<OcrResult>>
where
    E: OcrEngine,
    C: Future<Output = ()>,
{
    let handle = engine.initialize(language).await?;

    let outcome = tokio::select! {
        biased;
        _ = cancel => {
            warn!("OCR batch cancelled, releasing engine");
            Err(PipelineError::Cancelled)
        }
        results = recognize_all(engine, &handle, locations, policy) => Ok(results),
    };

    engine.release(handle).await;
    outcome
}

async fn recognize_all<E: OcrEngine>(
    engine: &E,
    handle: &E::Handle,
    locations: &[String],
    policy: &HeaderPolicy,
) -> Vec<OcrResult> {
    let pb = ProgressBar::new(locations.len() as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut results = Vec::with_capacity(locations.len());
    let mut failed = 0usize;

    for (i, location) in locations.iter().enumerate() {
        let header_lines = match engine.recognize(handle, location).await {
            Ok(text) => classify_headers(&text, policy),
            Err(e) => {
                failed += 1;
                warn!("Image #{} not recognized: {}", i + 1, e);
                Vec::new()
            }
        };
        results.push(OcrResult {
            sequence_index: i + 1,
            source_location: location.clone(),
            header_lines,
        });
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Recognized {} images ({} failed)",
        locations.len(),
        failed
    );
    results
}

// ── Tests ──
