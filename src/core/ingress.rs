use crate::domain::model::ScanEvent;
use crate::utils::error::{PairingError, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

impl ScanEvent {
    /// Normalize a raw reader report into a scan event.
    ///
    /// Readers pad their output inconsistently, so surrounding whitespace is
    /// dropped. A report that is empty after trimming never reaches the
    /// coordinator and does not consume a sequence number.
    pub fn accept(raw_tag: &str, counter: &AtomicU64) -> Result<Self> {
        let tag_id = raw_tag.trim();
        if tag_id.is_empty() {
            return Err(PairingError::InvalidTag {
                value: raw_tag.to_string(),
            });
        }

        Ok(Self {
            tag_id: tag_id.to_string(),
            sequence: counter.fetch_add(1, Ordering::Relaxed) + 1,
            received_at: Utc::now(),
        })
    }
}
