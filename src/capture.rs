// src/capture.rs

//! Scan sessions: turning raw capture text into form updates.
//!
//! A capture source (hardware scanner, camera decoder, OCR engine) only emits
//! text. Sessions are stamped with a generation token; when a new session
//! starts, every result still in flight from an older one is discarded.

use crate::catalog::CatalogIndex;
use crate::ocr_rank::{RankOptions, ScoredCandidate, rank};
use crate::resolver::{MatchKind, resolve_position};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Camera access denied")]
    PermissionDenied,

    #[error("Scanner unavailable: {0}")]
    DecoderUnavailable(String),

    #[error("Capture device error: {0}")]
    Device(#[source] std::io::Error),
}

impl From<std::io::Error> for CaptureError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Device(e),
        }
    }
}

/// Anything that produces raw scan text. Origin is irrelevant downstream.
#[async_trait]
pub trait CaptureSource: Send {
    async fn start(&mut self) -> Result<(), CaptureError>;

    /// Next captured text, or `None` once the source is exhausted.
    async fn next_text(&mut self) -> Result<Option<String>, CaptureError>;

    /// Release the device. Must be safe to call more than once.
    async fn stop(&mut self);
}

/// Monotonic session counter shared by a controller and its tokens.
#[derive(Debug, Clone, Default)]
pub struct ScanGeneration(Arc<AtomicU64>);

impl ScanGeneration {
    /// Open a new generation, invalidating all earlier tokens.
    pub fn begin(&self) -> GenerationToken {
        let id = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationToken {
            id,
            counter: Arc::clone(&self.0),
        }
    }

    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Captured at session start; checked before a result is applied.
#[derive(Debug, Clone)]
pub struct GenerationToken {
    id: u64,
    counter: Arc<AtomicU64>,
}

impl GenerationToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.id
    }
}

/// What the capture feeds: a product code field, or OCR disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    #[default]
    Code,
    Ocr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Write `code_value` into the active field.
    Resolved {
        raw: String,
        code_value: String,
        name: String,
        kind: MatchKind,
    },
    /// OCR shortlist for the user to pick from.
    Candidates {
        raw: String,
        candidates: Vec<ScoredCandidate>,
    },
    /// Leave the raw text in place for manual correction.
    Unmatched { raw: String },
    /// Result of an abandoned session; nothing is applied.
    Stale,
}

/// Status line shown next to the scan button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    Idle,
    Scanning,
    Detected(String),
    Failed(String),
}

impl ScanStatus {
    pub fn message(&self) -> String {
        match self {
            Self::Idle => String::new(),
            Self::Scanning => "Scanning...".to_string(),
            Self::Detected(code) => format!("Code detected: {code}"),
            Self::Failed(reason) => format!("{reason}. Type the code manually."),
        }
    }
}

/// Maps raw capture text to an outcome against one catalog snapshot.
pub struct ScanPipeline<'a> {
    index: &'a CatalogIndex,
    mode: ScanMode,
    rank_options: RankOptions,
}

impl<'a> ScanPipeline<'a> {
    pub fn new(index: &'a CatalogIndex, mode: ScanMode, rank_options: RankOptions) -> Self {
        Self {
            index,
            mode,
            rank_options,
        }
    }

    pub fn apply(&self, token: &GenerationToken, raw: &str) -> ScanOutcome {
        if !token.is_current() {
            debug!(session = token.id(), "Discarding result from stale session");
            return ScanOutcome::Stale;
        }
        let raw = raw.to_string();

        match self.mode {
            ScanMode::Code => match resolve_position(self.index, &raw) {
                Some(hit) => match self.index.get(hit.position) {
                    Some(entry) => ScanOutcome::Resolved {
                        code_value: entry.code_value.clone(),
                        name: entry.name.clone(),
                        kind: hit.kind,
                        raw,
                    },
                    None => ScanOutcome::Unmatched { raw },
                },
                None => ScanOutcome::Unmatched { raw },
            },
            ScanMode::Ocr => {
                let candidates = rank(self.index, &raw, self.rank_options);
                if candidates.is_empty() {
                    ScanOutcome::Unmatched { raw }
                } else {
                    ScanOutcome::Candidates { raw, candidates }
                }
            }
        }
    }
}

/// Owns at most one running capture source.
pub struct ScanController {
    generation: ScanGeneration,
    active: Option<Box<dyn CaptureSource>>,
    status: ScanStatus,
}

impl Default for ScanController {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanController {
    pub fn new() -> Self {
        Self {
            generation: ScanGeneration::default(),
            active: None,
            status: ScanStatus::Idle,
        }
    }

    pub fn status(&self) -> &ScanStatus {
        &self.status
    }

    /// Tear down any running session, then start `source` under a fresh token.
    pub async fn start_session(
        &mut self,
        mut source: Box<dyn CaptureSource>,
    ) -> Result<GenerationToken, CaptureError> {
        self.stop().await;
        let token = self.generation.begin();

        if let Err(e) = source.start().await {
            warn!(session = token.id(), error = %e, "Capture failed to start");
            source.stop().await;
            self.status = ScanStatus::Failed(e.to_string());
            self.generation.invalidate();
            return Err(e);
        }

        info!(session = token.id(), "Capture started");
        self.active = Some(source);
        self.status = ScanStatus::Scanning;
        Ok(token)
    }

    /// Next text from the running source. A capture error ends the session.
    pub async fn next_text(&mut self) -> Result<Option<String>, CaptureError> {
        let Some(source) = self.active.as_mut() else {
            return Ok(None);
        };

        match source.next_text().await {
            Ok(Some(text)) => {
                self.status = ScanStatus::Detected(text.clone());
                Ok(Some(text))
            }
            Ok(None) => {
                self.stop().await;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Capture failed");
                self.stop().await;
                self.status = ScanStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Stop the running source and invalidate its token.
    pub async fn stop(&mut self) {
        if let Some(mut source) = self.active.take() {
            source.stop().await;
            self.generation.invalidate();
            debug!("Capture stopped");
        }
        self.status = ScanStatus::Idle;
    }
}

/// Line-oriented capture: keyboard-wedge scanners type the code and press Enter.
pub struct LineCapture<R> {
    reader: Option<R>,
}

impl<R> LineCapture<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }
}

#[async_trait]
impl<R> CaptureSource for LineCapture<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn start(&mut self) -> Result<(), CaptureError> {
        if self.reader.is_none() {
            return Err(CaptureError::DecoderUnavailable("input closed".to_string()));
        }
        Ok(())
    }

    async fn next_text(&mut self) -> Result<Option<String>, CaptureError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(None);
            }
            // scanners configured for another code page send stray bytes
            let line = String::from_utf8_lossy(&buf);
            let text = line.trim();
            if !text.is_empty() {
                return Ok(Some(text.to_string()));
            }
        }
    }

    async fn stop(&mut self) {
        self.reader = None;
    }
}
