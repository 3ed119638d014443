//! Pushing batches onto a Redis list.
//!
//! [`QueuePublisher`] is the seam the consumer publishes through.  The production
//! implementation, [`RetryingPublisher`], serializes a batch into list entries, sends all of
//! them in a single `RPUSH` (so Redis accepts or rejects the batch as a whole), and retries
//! transient failures on a fresh connection.
mod err;
mod redis;

pub use err::PublishErr;
pub use redis::{RedisConn, RedisConnErr};

use crate::batch::Batch;
use crate::config::RedisConfig;
use crate::decode::Record;

use serde_json::value::RawValue;
use std::time::Duration;
use std::{error::Error, thread};
use strum_macros::{EnumString, EnumVariantNames};

/// The outcome of a successful publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// The number of list entries written.
    pub entries: usize,
    /// The length of the list after the push.
    pub list_len: i64,
}

pub trait QueuePublisher {
    /// Publish `batch` in full, or return an error without having published any part of it.
    ///
    /// A batch that failed with [`PublishErr::Exhausted`] may be passed again later; it is
    /// never dropped here.
    fn publish(&mut self, batch: &Batch) -> Result<Ack, PublishErr>;
}

/// Errors that may clear up if the same request is sent again.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// A connection to a list-based queue.
pub trait QueueClient {
    type Error: Error + Retryable;

    /// Append `entries` to the list at `key` in one atomic command, returning the new length
    /// of the list.
    fn push(&mut self, key: &str, entries: &[Vec<u8>]) -> Result<i64, Self::Error>;
    fn reconnect(&mut self) -> Result<(), Self::Error>;
}

/// How a batch is laid out in the list.
#[derive(EnumString, EnumVariantNames, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum PayloadFormat {
    /// One list entry per record.
    PerRecord,
    /// One list entry holding a JSON array of the batch's records.
    JsonArray,
    /// One list entry holding the records joined by `\n`.
    Newline,
}

impl PayloadFormat {
    pub fn encode(self, batch: &Batch) -> Vec<Vec<u8>> {
        use PayloadFormat::*;
        match self {
            PerRecord => batch.iter().map(|r| r.as_bytes().to_vec()).collect(),
            Newline => {
                let records: Vec<&[u8]> = batch.iter().map(Record::as_bytes).collect();
                vec![records.join(&b'\n')]
            }
            JsonArray => {
                let mut array = Vec::with_capacity(batch.payload_len() + batch.len() + 2);
                array.push(b'[');
                for (i, record) in batch.iter().enumerate() {
                    if i > 0 {
                        array.push(b',');
                    }
                    array.extend_from_slice(&json_value(record));
                }
                array.push(b']');
                vec![array]
            }
        }
    }
}

/// The record verbatim if it is valid JSON, otherwise the record as a JSON string.
fn json_value(record: &Record) -> Vec<u8> {
    match serde_json::from_slice::<&RawValue>(record.as_bytes()) {
        Ok(raw) => raw.get().as_bytes().to_vec(),
        Err(_) => {
            log::warn!("Record is not valid JSON; publishing it as a string: {:?}", record);
            let lossy = String::from_utf8_lossy(record.as_bytes());
            serde_json::Value::String(lossy.into_owned())
                .to_string()
                .into_bytes()
        }
    }
}

pub type RedisPublisher = RetryingPublisher<RedisConn>;

#[derive(Debug)]
pub struct RetryingPublisher<C> {
    client: C,
    key: String,
    notify_key: Option<String>,
    format: PayloadFormat,
    max_retries: u32,
    retry_delay: Duration,
    max_retry_delay: Duration,
}

impl<C: QueueClient> RetryingPublisher<C> {
    pub fn new(client: C, key: impl Into<String>) -> Self {
        Self {
            client,
            key: key.into(),
            notify_key: None,
            format: PayloadFormat::PerRecord,
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(5),
        }
    }

    /// Keys are namespaced; the retry delay never grows past `PUBLISH_TIMEOUT`.
    pub fn from_config(client: C, cfg: &RedisConfig) -> Self {
        let mut publisher = Self::new(client, cfg.namespaced(&cfg.key))
            .with_format(*cfg.payload)
            .with_retries(*cfg.max_retries, *cfg.retry_delay, *cfg.timeout);
        if let Some(notify_key) = &*cfg.notify_key {
            publisher = publisher.with_notify_key(cfg.namespaced(notify_key));
        }
        publisher
    }

    pub fn with_format(mut self, format: PayloadFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_notify_key(mut self, notify_key: impl Into<String>) -> Self {
        self.notify_key = Some(notify_key.into());
        self
    }

    pub fn with_retries(mut self, max_retries: u32, delay: Duration, max_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = delay;
        self.max_retry_delay = max_delay.max(delay);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        self.retry_delay
            .checked_mul(factor)
            .map_or(self.max_retry_delay, |delay| delay.min(self.max_retry_delay))
    }

    fn notify(&mut self) {
        if let Some(notify_key) = &self.notify_key {
            if let Err(e) = self.client.push(notify_key, &[b"1".to_vec()]) {
                log::warn!("Could not notify `{}` of a new batch: {}", notify_key, e);
            }
        }
    }
}

impl<C: QueueClient> QueuePublisher for RetryingPublisher<C> {
    fn publish(&mut self, batch: &Batch) -> Result<Ack, PublishErr> {
        let entries = self.format.encode(batch);
        let mut attempt = 0;
        loop {
            let err = match self.client.push(&self.key, &entries) {
                Ok(list_len) => {
                    log::debug!(
                        "Pushed {} records ({} bytes) onto `{}`; it now holds {} entries",
                        batch.len(),
                        batch.payload_len(),
                        self.key,
                        list_len
                    );
                    self.notify();
                    break Ok(Ack {
                        entries: entries.len(),
                        list_len,
                    });
                }
                Err(e) if !e.is_transient() => break Err(PublishErr::Rejected(e.to_string())),
                Err(e) => e,
            };

            if attempt >= self.max_retries {
                break Err(PublishErr::Exhausted {
                    attempts: attempt + 1,
                    last: err.to_string(),
                });
            }
            let delay = self.backoff(attempt);
            attempt += 1;
            log::warn!(
                "Push to `{}` failed ({}); retry {}/{} in {:?}",
                self.key,
                err,
                attempt,
                self.max_retries,
                delay
            );
            thread::sleep(delay);

            match self.client.reconnect() {
                Ok(()) => (),
                Err(e) if !e.is_transient() => break Err(PublishErr::Rejected(e.to_string())),
                // the next push fails fast and counts as an attempt
                Err(e) => log::warn!("Reconnecting to the queue failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod test;
