use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::feed::{parse_feed, FeedRecord};

const CONCURRENCY: usize = 4;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 1000;

pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Load the feed from an `http(s)` URL or a local JSON file.
///
/// Transport, status, or a body that is not a JSON array is a `FetchFailure`.
/// Individual entries that are not objects are skipped.
pub async fn fetch_feed(source: &str) -> Result<Vec<FeedRecord>> {
    let failure = |reason: String| PipelineError::FetchFailure {
        source_name: source.to_string(),
        reason,
    };

    info!("Fetching feed: {}", source);
    let body = if is_remote(source) {
        let response = reqwest::get(source)
            .await
            .map_err(|e| failure(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failure(format!("HTTP status {}", status)));
        }
        response.text().await.map_err(|e| failure(e.to_string()))?
    } else {
        tokio::fs::read_to_string(source)
            .await
            .map_err(|e| failure(e.to_string()))?
    };

    let records =
        parse_feed(&body).map_err(|e| failure(format!("invalid feed JSON: {}", e)))?;
    info!("Feed has {} records", records.len());
    Ok(records)
}

/// GET a URL, retrying rate limits and server errors with exponential backoff.
pub async fn fetch_bytes(client: &reqwest::Client, url: &str) -> anyhow::Result<Vec<u8>> {
    for attempt in 0..=MAX_RETRIES {
        let response = client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        let status = response.status();

        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .with_context(|| format!("failed to read body of {}", url))?;
            return Ok(bytes.to_vec());
        }

        let retryable = status.as_u16() == 429 || status.is_server_error();
        if !retryable || attempt == MAX_RETRIES {
            bail!("{} returned HTTP status {}", url, status);
        }

        let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
        warn!(
            "HTTP {} on {} (attempt {}/{}), backing off {:.1}s",
            status,
            url,
            attempt + 1,
            MAX_RETRIES,
            backoff.as_secs_f64()
        );
        tokio::time::sleep(backoff).await;
    }

    bail!("{} failed after {} retries", url, MAX_RETRIES)
}

/// File name for the `n`-th (1-based) image in display order.
pub fn image_file_name(n: usize) -> String {
    format!("Jadwal_Ujian_{}.jpg", n)
}

/// Download stats returned after completion.
pub struct DownloadStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// Download images concurrently into `dir` as `Jadwal_Ujian_<n>.jpg`.
pub async fn save_images(locations: Vec<String>, dir: &Path) -> anyhow::Result<DownloadStats> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("cannot create {}", dir.display()))?;

    let client = reqwest::Client::new();
    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let total = locations.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Workers report (url, outcome); the loop below tallies them
    let (tx, mut rx) = tokio::sync::mpsc::channel::<(String, anyhow::Result<PathBuf>)>(CONCURRENCY * 2);

    for (i, url) in locations.into_iter().enumerate() {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();
        let path = dir.join(image_file_name(i + 1));

        tokio::spawn(async move {
            let outcome = match sem.acquire().await {
                Ok(_permit) => download_one(&client, &url, path).await,
                Err(e) => Err(e.into()),
            };
            let _ = tx.send((url, outcome)).await;
        });
    }

    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;
    while let Some((url, outcome)) = rx.recv().await {
        match outcome {
            Ok(path) => {
                ok += 1;
                debug!("Saved {} -> {}", url, path.display());
            }
            Err(e) => {
                errors += 1;
                warn!("Download failed for {}: {:#}", url, e);
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Downloaded {} images ({} ok, {} errors)", total, ok, errors);

    Ok(DownloadStats { total, ok, errors })
}

async fn download_one(client: &reqwest::Client, url: &str, path: PathBuf) -> anyhow::Result<PathBuf> {
    let bytes = fetch_bytes(client, url).await?;
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_detection() {
        assert!(is_remote("https://x.id/feed"));
        assert!(is_remote("http://x.id/feed"));
        assert!(!is_remote("tests/fixtures/feed.json"));
        assert!(!is_remote("httpdocs/feed.json"));
    }

    #[test]
    fn download_names_are_one_based() {
        assert_eq!(image_file_name(1), "Jadwal_Ujian_1.jpg");
        assert_eq!(image_file_name(12), "Jadwal_Ujian_12.jpg");
    }

    #[tokio::test]
    async fn reads_local_feed() {
        let records = fetch_feed("tests/fixtures/feed.json").await.unwrap();
        assert_eq!(records.len(), 6);
    }

    #[tokio::test]
    async fn missing_feed_is_fetch_failure() {
        let outcome = fetch_feed("tests/fixtures/does-not-exist.json").await;
        assert!(matches!(outcome, Err(PipelineError::FetchFailure { .. })));
    }

    #[tokio::test]
    async fn invalid_json_is_fetch_failure() {
        let outcome = fetch_feed("Cargo.toml").await;
        assert!(matches!(outcome, Err(PipelineError::FetchFailure { .. })));
    }
}
