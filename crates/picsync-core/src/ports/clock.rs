//! Clock port
//!
//! The cycle start instant becomes the next watermark, so the engine reads
//! time through this trait. Tests substitute a fixed clock.

use chrono::{DateTime, Utc};

/// Source of the current instant
pub trait IClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`Utc::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl IClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
