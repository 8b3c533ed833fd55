//! Application state shared across all handlers.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rag_core::RagError;
use rag_pipeline::RagService;
use serde::Serialize;

/// Service lifecycle. `Ready` is terminal for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Uninitialized,
            1 => Self::Loading,
            _ => Self::Ready,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

struct Lifecycle {
    phase: AtomicU8,
    service: OnceLock<Arc<RagService>>,
}

/// Shared application state. Cloning shares the same lifecycle.
#[derive(Clone)]
pub struct AppState {
    lifecycle: Arc<Lifecycle>,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_lifecycle(Lifecycle {
            phase: AtomicU8::new(Phase::Uninitialized as u8),
            service: OnceLock::new(),
        })
    }

    /// State that is already `Ready` with the given service.
    pub fn ready(service: RagService) -> Self {
        Self::with_lifecycle(Lifecycle {
            phase: AtomicU8::new(Phase::Ready as u8),
            service: OnceLock::from(Arc::new(service)),
        })
    }

    fn with_lifecycle(lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle: Arc::new(lifecycle),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.lifecycle.phase.load(Ordering::SeqCst))
    }

    /// `Uninitialized → Loading`.
    pub fn begin_loading(&self) -> anyhow::Result<()> {
        self.lifecycle
            .phase
            .compare_exchange(
                Phase::Uninitialized as u8,
                Phase::Loading as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map(|_| ())
            .map_err(|cur| anyhow::anyhow!("cannot start loading from phase {}", Phase::from_u8(cur)))
    }

    /// `Loading → Ready`, publishing the service context.
    pub fn mark_ready(&self, service: RagService) -> anyhow::Result<()> {
        if self.phase() != Phase::Loading {
            anyhow::bail!("cannot become ready from phase {}", self.phase());
        }
        self.lifecycle
            .service
            .set(Arc::new(service))
            .map_err(|_| anyhow::anyhow!("service context already published"))?;
        self.lifecycle.phase.store(Phase::Ready as u8, Ordering::SeqCst);
        Ok(())
    }

    /// The service context, or `NotReady` while startup is still running.
    pub fn service(&self) -> Result<Arc<RagService>, RagError> {
        self.lifecycle
            .service
            .get()
            .cloned()
            .ok_or_else(|| RagError::NotReady(format!("service is {}", self.phase())))
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
