use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::OcrEngine;
use crate::error::{PipelineError, Result};
use crate::fetch;

/// OCR backed by the `tesseract` command-line binary.
pub struct TesseractEngine {
    binary: String,
}

/// Live state for one batch: language, scratch directory for downloaded images, HTTP client.
pub struct TesseractSession {
    language: String,
    workdir: PathBuf,
    client: reqwest::Client,
    next_id: AtomicUsize,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                PipelineError::EngineUnavailable(format!("failed to execute {}: {}", self.binary, e))
            })?;
        if !output.status.success() {
            return Err(PipelineError::EngineUnavailable(format!(
                "{} {} exited with {}",
                self.binary,
                args.join(" "),
                output.status
            )));
        }
        // --version and --list-langs print to stdout or stderr depending on the build
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }

    async fn recognize_file(&self, session: &TesseractSession, path: &Path) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&session.language)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PipelineError::RecognitionFailure {
                location: path.display().to_string(),
                reason: format!("failed to execute {}: {}", self.binary, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::RecognitionFailure {
                location: path.display().to_string(),
                reason: format!("tesseract exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .replace('\u{0000}', "")
            .trim()
            .to_string())
    }
}

impl OcrEngine for TesseractEngine {
    type Handle = TesseractSession;

    async fn initialize(&self, language: &str) -> Result<TesseractSession> {
        let version = self.run(&["--version"]).await?;
        debug!("{}", version.lines().next().unwrap_or_default());

        let installed = self.run(&["--list-langs"]).await?;
        for lang in language.split('+') {
            if !installed.lines().any(|l| l.trim() == lang) {
                return Err(PipelineError::EngineUnavailable(format!(
                    "tesseract language '{}' is not installed",
                    lang
                )));
            }
        }

        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let workdir = std::env::temp_dir().join(format!(
            "jadwal_ocr_{}_{}",
            std::process::id(),
            stamp
        ));
        tokio::fs::create_dir_all(&workdir).await.map_err(|e| {
            PipelineError::EngineUnavailable(format!(
                "cannot create scratch dir {}: {}",
                workdir.display(),
                e
            ))
        })?;

        info!("Tesseract ready (lang={}, scratch={})", language, workdir.display());
        Ok(TesseractSession {
            language: language.to_string(),
            workdir,
            client: reqwest::Client::new(),
            next_id: AtomicUsize::new(0),
        })
    }

    async fn recognize(&self, session: &TesseractSession, location: &str) -> Result<String> {
        if !fetch::is_remote(location) {
            return self.recognize_file(session, Path::new(location)).await;
        }

        let bytes = fetch::fetch_bytes(&session.client, location)
            .await
            .map_err(|e| PipelineError::RecognitionFailure {
                location: location.to_string(),
                reason: e.to_string(),
            })?;

        let id = session.next_id.fetch_add(1, Ordering::Relaxed);
        let path = session.workdir.join(format!("image_{}", id));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PipelineError::RecognitionFailure {
                location: location.to_string(),
                reason: format!("cannot write {}: {}", path.display(), e),
            })?;

        let text = self.recognize_file(session, &path).await;
        discard_scratch(&path).await;
        text.map_err(|e| match e {
            PipelineError::RecognitionFailure { reason, .. } => PipelineError::RecognitionFailure {
                location: location.to_string(),
                reason,
            },
            other => other,
        })
    }

    async fn release(&self, session: TesseractSession) {
        if let Err(e) = tokio::fs::remove_dir_all(&session.workdir).await {
            warn!("Failed to remove {}: {}", session.workdir.display(), e);
        }
        debug!("Tesseract session released");
    }
}

/// Remove a downloaded image; a failure only leaves a file in the scratch dir.
async fn discard_scratch(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!("Failed to remove {}: {}", path.display(), e);
    }
}
