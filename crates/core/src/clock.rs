//! Time source abstraction.
//!
//! Stores stamp `created_at`/`updated_at` through a [`Clock`] so tests can
//! control the timeline instead of racing the wall clock.

use chrono::{DateTime, Utc};

/// Source of "now" for mutating operations.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
