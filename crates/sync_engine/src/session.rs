//! Mutable context of one synchronization session.

use contracts::{BlinkCounters, BlinkMatch, Escalation, TimestampUs};

use crate::quality::QualityGate;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: u64,
    pub visual_blink_timestamp_us: Option<TimestampUs>,
    pub bio_blink_timestamp_us: Option<TimestampUs>,
    pub recorded_sample_index: Option<u64>,
    pub counters: BlinkCounters,
    /// Last camera report had a face in it
    pub face_present: bool,
    pub quality: QualityGate,
    /// Set while parked on a host decision
    pub pending: Option<Escalation>,
}

impl Session {
    pub fn new(id: u64, quality_grace_us: i64) -> Self {
        Self {
            id,
            visual_blink_timestamp_us: None,
            bio_blink_timestamp_us: None,
            recorded_sample_index: None,
            counters: BlinkCounters::default(),
            face_present: false,
            quality: QualityGate::new(quality_grace_us),
            pending: None,
        }
    }

    /// Fresh attempt inside the same session; face presence survives
    pub fn reset(&mut self) {
        self.clear_blink();
        self.counters = BlinkCounters::default();
        self.quality.reset();
        self.pending = None;
    }

    pub fn clear_blink(&mut self) {
        self.visual_blink_timestamp_us = None;
        self.clear_bio();
    }

    pub fn clear_bio(&mut self) {
        self.bio_blink_timestamp_us = None;
        self.recorded_sample_index = None;
    }

    pub fn is_parked(&self) -> bool {
        self.pending.is_some()
    }

    /// Confirmed match, if the acceptance fields are all present
    pub fn blink_match(&self) -> Option<BlinkMatch> {
        let visual = self.visual_blink_timestamp_us?;
        let bio = self.bio_blink_timestamp_us?;
        let sample_index = self.recorded_sample_index?;
        Some(BlinkMatch {
            visual_timestamp_us: visual,
            bio_timestamp_us: bio,
            sample_index,
            latency_us: bio - visual,
        })
    }
}
