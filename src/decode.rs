//! Incremental decoding of an HTTP response body sent with `Transfer-Encoding: chunked`.
//!
//! The body arrives as a sequence of length-prefixed chunks, each announced by a line
//! holding its size in hex.  A chunk of size zero ends the body.  For example (line breaks
//! added after each CRLF):
//!
//! ```text
//! 1a\r\n
//! {"id":1,"text":"hello"}\r\n
//! \r\n
//! 0\r\n
//! \r\n
//! ```
//!
//! Chunk boundaries carry no meaning for the application; the payload bytes of consecutive
//! chunks are reassembled and then split into records according to a [`RecordFraming`].
//! Input may be split at any byte: whatever cannot be decoded yet is kept for the next call
//! to [`ChunkDecoder::feed`].
mod err;
mod record;

pub use err::FramingErr;
pub use record::RecordFraming;

use record::RecordSplitter;
use std::fmt;

/// Size lines longer than this cannot belong to a well-formed stream.
const MAX_SIZE_LINE: usize = 1024;

/// One decoded unit of streaming data (e.g., a single JSON status object).
#[derive(Clone, PartialEq, Eq)]
pub struct Record(Box<[u8]>);

impl Record {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for Record {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<&str> for Record {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().into())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Record({:?})", String::from_utf8_lossy(&self.0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Record(Record),
    /// The zero-length chunk that terminates the body.
    End,
}

#[derive(Debug)]
pub struct ChunkDecoder {
    input: Vec<u8>,
    cursor: usize,
    /// Payload bytes of the current chunk not yet consumed; `None` between chunks.
    chunk_left: Option<usize>,
    splitter: RecordSplitter,
    finished: bool,
}

impl ChunkDecoder {
    pub fn new(framing: RecordFraming) -> Self {
        Self {
            input: Vec::new(),
            cursor: 0,
            chunk_left: None,
            splitter: RecordSplitter::new(framing),
            finished: false,
        }
    }

    /// Decode as much of the buffered input as possible.
    ///
    /// Appends the records completed by `bytes` to `decoded`, in stream order, followed by
    /// [`Decoded::End`] if the terminating chunk was reached.  Anything after the terminating
    /// chunk (trailers) is ignored.
    ///
    /// Records completed before a framing error are still appended, so the caller can keep
    /// them.  The error leaves the decoder in an unspecified state; call
    /// [`ChunkDecoder::reset`] before reusing it.
    pub fn feed(&mut self, bytes: &[u8], decoded: &mut Vec<Decoded>) -> Result<(), FramingErr> {
        if self.finished {
            return Ok(());
        }
        self.input.extend_from_slice(bytes);

        loop {
            let unread = &self.input[self.cursor..];
            match self.chunk_left {
                None => {
                    let newline = match unread.iter().position(|&b| b == b'\n') {
                        Some(idx) => idx,
                        None if unread.len() > MAX_SIZE_LINE => Err(FramingErr::SizeLineTooLong)?,
                        None => break,
                    };
                    let size = parse_chunk_size(&unread[..newline])?;
                    self.cursor += newline + 1;

                    if size == 0 {
                        self.finished = true;
                        decoded.extend(self.splitter.finish()?.map(Decoded::Record));
                        decoded.push(Decoded::End);
                        break;
                    }
                    self.chunk_left = Some(size);
                }
                Some(0) => {
                    match unread {
                        [b'\r', b'\n', ..] => (),
                        [] | [b'\r'] => break,
                        _ => Err(FramingErr::MissingChunkTerminator)?,
                    };
                    self.cursor += 2;
                    self.chunk_left = None;
                }
                Some(_) if unread.is_empty() => break,
                Some(remaining) => {
                    let len = remaining.min(unread.len());
                    self.splitter.push(&unread[..len], decoded)?;
                    self.cursor += len;
                    self.chunk_left = Some(remaining - len);
                }
            }
        }

        if self.finished {
            self.input.clear();
        } else {
            self.input.drain(..self.cursor);
        }
        self.cursor = 0;
        Ok(())
    }

    /// Discard all buffered state, ready for a fresh connection.
    pub fn reset(&mut self) {
        self.input.clear();
        self.cursor = 0;
        self.chunk_left = None;
        self.splitter.reset();
        self.finished = false;
    }

    /// The number of received bytes not yet emitted as a record.
    pub fn buffered(&self) -> usize {
        self.input.len() + self.splitter.buffered()
    }
}

/// Parse a chunk size line (without its `\n`).  Chunk extensions after `;` are ignored.
fn parse_chunk_size(line: &[u8]) -> Result<usize, FramingErr> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let size = match line.iter().position(|&b| b == b';') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let invalid = || FramingErr::InvalidChunkSize(String::from_utf8_lossy(line).into_owned());

    let size = std::str::from_utf8(size).map_err(|_| invalid())?.trim();
    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    usize::from_str_radix(size, 16).map_err(|_| invalid())
}
