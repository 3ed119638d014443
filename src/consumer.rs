//! The connection lifecycle: connect, stream records into batches, publish them, and start
//! over when the stream drops.
//!
//! A [`StreamConsumer`] runs on its own thread and owns everything it touches (source,
//! decoder, batcher, and publisher), so nothing is shared except the [`StopHandle`].
mod backoff;

use self::backoff::Backoff;
use crate::batch::{Batch, RecordBatcher};
use crate::config::{BatchConfig, StreamConfig};
use crate::decode::{ChunkDecoder, Decoded};
use crate::publish::{PublishErr, QueuePublisher};
use crate::source::Source;

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use strum_macros::Display;

const READ_BUFFER_SIZE: usize = 16 * 1024;

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Streaming,
    Draining,
    Failed,
    Closed,
}

/// Asks a running consumer to finish.  Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<(Mutex<bool>, Condvar)>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        let (stopped, wakeup) = &*self.0;
        *stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wakeup.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        let (stopped, _) = &*self.0;
        *stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `timeout`, waking early if `stop` is called.  Returns whether a stop was
    /// requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (stopped, wakeup) = &*self.0;
        let guard = stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _timed_out) = wakeup
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

pub struct StreamConsumer<S: Source, P: QueuePublisher> {
    source: S,
    publisher: P,
    stream: Option<S::Stream>,
    decoder: ChunkDecoder,
    batcher: RecordBatcher,
    /// Batches the publisher gave up on, oldest first.
    held: VecDeque<Batch>,
    max_held: usize,
    backoff: Backoff,
    /// When the current connection was opened, until it proves healthy.
    on_probation: Option<Instant>,
    failed_connects: u32,
    max_connect_retries: u32,
    stall_timeout: Duration,
    stop: StopHandle,
    read_buf: Vec<u8>,
    decoded: Vec<Decoded>,
}

impl<S: Source, P: QueuePublisher> StreamConsumer<S, P> {
    pub fn new(
        source: S,
        publisher: P,
        stream_cfg: &StreamConfig,
        batch_cfg: &BatchConfig,
        stop: StopHandle,
    ) -> Self {
        Self {
            source,
            publisher,
            stream: None,
            decoder: ChunkDecoder::new(*stream_cfg.framing),
            batcher: RecordBatcher::new(*batch_cfg.size, *batch_cfg.age),
            held: VecDeque::new(),
            max_held: *batch_cfg.max_held,
            backoff: Backoff::new(stream_cfg),
            on_probation: None,
            failed_connects: 0,
            max_connect_retries: *stream_cfg.max_connect_retries,
            stall_timeout: *stream_cfg.timeout,
            stop,
            read_buf: vec![0; READ_BUFFER_SIZE],
            decoded: Vec::new(),
        }
    }

    /// Consume until stopped or until recovery is impossible, returning the terminal state
    /// (`Closed` or `Failed`).
    pub fn run(mut self) -> ConnectionState {
        use ConnectionState::*;
        let mut state = Connecting;
        loop {
            log::info!("Stream consumer is {}", state);
            state = match state {
                Connecting => self.connect(),
                Streaming => self.consume(),
                Draining => self.drain(),
                Failed => {
                    self.report_unpublished();
                    break Failed;
                }
                Closed => break Closed,
            };
        }
    }

    fn connect(&mut self) -> ConnectionState {
        use ConnectionState::*;
        loop {
            if self.stop.is_stopped() {
                return Draining;
            }
            match self.source.connect() {
                Ok(stream) => {
                    self.on_probation = Some(Instant::now());
                    self.stream = Some(stream);
                    return Streaming;
                }
                Err(e) if !e.is_retryable() => {
                    log::error!("Cannot connect to the stream: {}", e);
                    return Failed;
                }
                Err(e) => {
                    self.failed_connects += 1;
                    if self.failed_connects > self.max_connect_retries {
                        log::error!(
                            "Giving up after {} failed connection attempts; last error: {}",
                            self.failed_connects,
                            e
                        );
                        return Failed;
                    }
                    let delay = self.backoff.next(&e);
                    log::warn!(
                        "Connection attempt {} failed ({}); retrying in {:?}",
                        self.failed_connects,
                        e,
                        delay
                    );
                    if self.stop.wait(delay) {
                        return Draining;
                    }
                }
            }
        }
    }

    fn consume(&mut self) -> ConnectionState {
        use ConnectionState::*;
        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => return Connecting,
        };

        let mut last_data = Instant::now();
        loop {
            if self.stop.is_stopped() {
                return Draining;
            }
            match stream.read(&mut self.read_buf) {
                Ok(0) => {
                    log::warn!("The server closed the stream");
                    return Draining;
                }
                Ok(n) => {
                    last_data = Instant::now();
                    let mut decoded = std::mem::take(&mut self.decoded);
                    let fed = self.decoder.feed(&self.read_buf[..n], &mut decoded);
                    let mut ended = false;
                    for item in decoded.drain(..) {
                        match item {
                            Decoded::Record(record) => {
                                self.end_probation();
                                if let Some(batch) = self.batcher.add(record, Instant::now()) {
                                    if self.deliver(batch).is_err() {
                                        return Failed;
                                    }
                                }
                            }
                            Decoded::End => ended = true,
                        }
                    }
                    self.decoded = decoded;
                    if let Err(e) = fed {
                        log::warn!("Dropping the connection after a framing error: {}", e);
                        return Draining;
                    }
                    if ended {
                        log::warn!("The server ended the stream");
                        return Draining;
                    }
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    if last_data.elapsed() >= self.stall_timeout {
                        log::warn!(
                            "No data for {:?}; treating the stream as dropped",
                            self.stall_timeout
                        );
                        return Draining;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("Error reading from the stream: {}", e);
                    return Draining;
                }
            }

            if let Some(batch) = self.batcher.poll_age(Instant::now()) {
                if self.deliver(batch).is_err() {
                    return Failed;
                }
            }
        }
    }

    fn drain(&mut self) -> ConnectionState {
        use ConnectionState::*;
        self.stream = None;
        let partial = self.decoder.buffered();
        if partial > 0 {
            log::warn!("Discarding {} bytes of an incomplete record", partial);
        }
        self.decoder.reset();

        let delivered = match self.batcher.flush() {
            Some(batch) => self.deliver(batch),
            None => self.publish_held(),
        };
        if delivered.is_err() {
            return Failed;
        }

        match (self.stop.is_stopped(), self.held.len()) {
            (false, _) => self.reconnect(),
            (true, 0) => Closed,
            (true, _) => Failed,
        }
    }

    /// The connection is healthy once it delivers a record.
    fn end_probation(&mut self) {
        if self.on_probation.take().is_some() {
            self.backoff.reset();
            self.failed_connects = 0;
        }
    }

    /// A connection that ends without delivering a record counts as a failed attempt,
    /// unless it stayed open for the whole stall timeout.
    fn reconnect(&mut self) -> ConnectionState {
        use ConnectionState::*;
        let opened = match self.on_probation.take() {
            Some(opened) => opened,
            None => return Connecting,
        };
        if opened.elapsed() >= self.stall_timeout {
            self.backoff.reset();
            self.failed_connects = 0;
            return Connecting;
        }

        self.failed_connects += 1;
        if self.failed_connects > self.max_connect_retries {
            log::error!(
                "Giving up after {} connections in a row ended without any records",
                self.failed_connects
            );
            return Failed;
        }
        let delay = self.backoff.next_tcp();
        log::warn!(
            "The stream ended without any records (attempt {}); reconnecting in {:?}",
            self.failed_connects,
            delay
        );
        if self.stop.wait(delay) {
            return Draining;
        }
        Connecting
    }

    /// Queue `batch` behind any held batches and publish as many as the queue accepts.
    fn deliver(&mut self, batch: Batch) -> Result<(), PublishErr> {
        self.held.push_back(batch);
        self.publish_held()
    }

    fn publish_held(&mut self) -> Result<(), PublishErr> {
        while let Some(batch) = self.held.front() {
            match self.publisher.publish(batch) {
                Ok(ack) => {
                    log::debug!("Published a batch of {} records: {:?}", batch.len(), ack);
                    self.held.pop_front();
                }
                Err(e) if e.is_exhausted() && self.held.len() <= self.max_held => {
                    log::warn!("Holding {} unpublished batches: {}", self.held.len(), e);
                    return Ok(());
                }
                Err(e) if e.is_exhausted() => {
                    log::error!("More than {} batches are waiting to be published", self.max_held);
                    return Err(e);
                }
                Err(e) => {
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn report_unpublished(&self) {
        let held: usize = self.held.iter().map(Batch::len).sum();
        let records = held + self.batcher.pending();
        if records > 0 {
            log::error!(
                "{} records ({} in {} held batches) were never published",
                records,
                held,
                self.held.len()
            );
        }
    }
}
