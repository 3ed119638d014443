//! Grouping of decoded records into batches bounded by size and age.
use crate::decode::Record;
use std::time::{Duration, Instant};

/// An ordered, non-empty group of records published together.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    /// Returns `None` for an empty `Vec`; a `Batch` always holds at least one record.
    pub fn new(records: Vec<Record>) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self { records })
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Total payload size in bytes.
    pub fn payload_len(&self) -> usize {
        self.records.iter().map(Record::len).sum()
    }
}

/// Accumulates records and emits them as a [`Batch`] once `max_size` records are pending or
/// the oldest pending record is `max_age` old.
///
/// The batcher never reads the clock: callers pass `now` so that tests control time.
#[derive(Debug)]
pub struct RecordBatcher {
    pending: Vec<Record>,
    started: Option<Instant>,
    max_size: usize,
    max_age: Duration,
}

impl RecordBatcher {
    pub fn new(max_size: usize, max_age: Duration) -> Self {
        let max_size = max_size.max(1);
        Self {
            pending: Vec::with_capacity(max_size),
            started: None,
            max_size,
            max_age,
        }
    }

    pub fn add(&mut self, record: Record, now: Instant) -> Option<Batch> {
        if self.pending.is_empty() {
            self.started = Some(now);
        }
        self.pending.push(record);

        if self.pending.len() >= self.max_size {
            self.flush()
        } else {
            None
        }
    }

    pub fn poll_age(&mut self, now: Instant) -> Option<Batch> {
        match self.started {
            Some(started) if now.saturating_duration_since(started) >= self.max_age => self.flush(),
            _ => None,
        }
    }

    pub fn flush(&mut self) -> Option<Batch> {
        self.started = None;
        let records = std::mem::replace(&mut self.pending, Vec::with_capacity(self.max_size));
        Batch::new(records)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// How long until the pending records reach `max_age`, if any are pending.
    pub fn time_left(&self, now: Instant) -> Option<Duration> {
        self.started
            .map(|started| self.max_age.saturating_sub(now.saturating_duration_since(started)))
    }
}
