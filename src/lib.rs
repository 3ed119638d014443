//! Streaming API consumer
//!
//!
//! Sluice holds open a long-lived HTTP request to a streaming API (by default, Twitter's
//! `statuses/filter` endpoint), decodes the records arriving in its chunked response body,
//! groups them into batches, and pushes each batch onto a Redis list for downstream workers.
//! When the stream drops, it flushes what it has and reconnects with backoff.
//!
//! # Notes on data flow
//! * **Network → `ChunkDecoder`**:
//! A [`source::Source`] opens the request and hands back the raw body.  The
//! [`decode::ChunkDecoder`] strips the chunked transfer encoding and splits the payload into
//! records, holding back partial input until the rest of it arrives.
//!
//! * **`ChunkDecoder` → `RecordBatcher`**:
//! The [`batch::RecordBatcher`] groups records into a batch once enough of them have arrived
//! or the oldest of them has waited long enough.
//!
//! * **`RecordBatcher` → `QueuePublisher`**:
//! Each batch goes to a [`publish::QueuePublisher`], which pushes it onto a Redis list in one
//! command and retries transient failures.
//!
//! The [`consumer::StreamConsumer`] drives all of the above on a single thread and decides what
//! happens when something fails: reconnect, hold batches for later, or give up.  On SIGINT or
//! SIGTERM, [`shutdown::run_until_shutdown`] asks it to publish what it holds and finish.

pub mod batch;
pub mod config;
pub mod consumer;
pub mod decode;
pub mod err;
pub mod publish;
pub mod shutdown;
pub mod source;
