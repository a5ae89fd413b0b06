mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
mod store;
#[cfg(test)]
mod tests;

pub use availability::{LEAD_TIME_MINUTES, bookable_day, day_slots, month_days, month_occupancy};
pub use error::EngineError;
pub use store::CalendarState;

use std::io;
use std::path::Path;

use tokio::sync::{Mutex, RwLock};

use crate::model::Event;
use crate::wal::Wal;

/// The booking engine: WAL-backed in-memory calendar state.
///
/// All mutations take the state write lock, and the conflict check, the WAL
/// append, and the in-memory apply all happen inside that critical section.
/// Two concurrent requests for the same slot therefore serialize: the loser
/// re-checks against state that already contains the winner's booking and
/// gets a `Conflict`. Availability reads take the read lock and are
/// snapshots that may be stale the moment they are returned; only the
/// booking path enforces at-most-one-reservation-per-slot.
pub struct Engine {
    state: RwLock<CalendarState>,
    wal: Mutex<Wal>,
    compact_threshold: u64,
}

impl Engine {
    /// Replay the WAL at `wal_path` and open it for appends.
    pub fn new(wal_path: &Path, compact_threshold: u64) -> io::Result<Self> {
        let events = Wal::replay(wal_path)?;
        let wal = Wal::open(wal_path)?;
        let mut state = CalendarState::new();
        for event in &events {
            state.apply_event(event);
        }
        tracing::info!(
            "replayed {} events: {} bookings, {} blackout rules",
            events.len(),
            state.booking_count(),
            state.blackout_count()
        );
        Ok(Self {
            state: RwLock::new(state),
            wal: Mutex::new(wal),
            compact_threshold,
        })
    }

    /// WAL-append then apply, in that order: nothing mutates in memory unless
    /// it is durable first. The caller holds the state write guard.
    ///
    /// Once appends since the last compaction pass the threshold, the WAL is
    /// rewritten from live state. Compaction failure is logged and ignored;
    /// the log just keeps growing until the next attempt.
    pub(super) async fn persist_and_apply(
        &self,
        state: &mut CalendarState,
        event: Event,
    ) -> Result<(), EngineError> {
        let mut wal = self.wal.lock().await;
        let append_start = std::time::Instant::now();
        wal.append(&event)
            .map_err(|e| EngineError::WalError(e.to_string()))?;
        metrics::histogram!(crate::observability::WAL_APPEND_DURATION_SECONDS)
            .record(append_start.elapsed().as_secs_f64());
        state.apply_event(&event);

        if wal.appends_since_compact() >= self.compact_threshold {
            if let Err(e) = wal.compact(&state.snapshot_events()) {
                tracing::warn!("WAL compaction failed: {e}");
            }
        }
        Ok(())
    }
}
