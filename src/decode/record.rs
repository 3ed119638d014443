use super::{Decoded, FramingErr, Record};
use strum_macros::{EnumString, EnumVariantNames};

/// Longer than any decimal length line (plus keep-alive whitespace) can be.
const MAX_LENGTH_LINE: usize = 64;

/// How records are delimited inside the reassembled chunk payload.
#[derive(EnumString, EnumVariantNames, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum RecordFraming {
    /// One record per line.
    Newline,
    /// Each record is preceded by a line holding its length in bytes (the Streaming API's
    /// `delimited=length`).
    Length,
}

/// Splits reassembled payload bytes into records, holding back any partial record.
#[derive(Debug)]
pub(super) struct RecordSplitter {
    framing: RecordFraming,
    partial: Vec<u8>,
    /// How far `partial` has been searched for a newline.
    scanned: usize,
    /// The announced length of the record being received (`Length` framing only).
    expected: Option<usize>,
}

impl RecordSplitter {
    pub(super) fn new(framing: RecordFraming) -> Self {
        Self {
            framing,
            partial: Vec::new(),
            scanned: 0,
            expected: None,
        }
    }

    /// Append every record completed by `bytes` to `out`.  On a framing error, `out` keeps
    /// the records completed before it.
    pub(super) fn push(&mut self, bytes: &[u8], out: &mut Vec<Decoded>) -> Result<(), FramingErr> {
        self.partial.extend_from_slice(bytes);
        match self.framing {
            RecordFraming::Newline => {
                self.split_lines(out);
                Ok(())
            }
            RecordFraming::Length => self.split_lengths(out),
        }
    }

    /// Called at the end of the body: emit or reject whatever is still held.
    pub(super) fn finish(&mut self) -> Result<Option<Record>, FramingErr> {
        let leftover = std::mem::take(&mut self.partial);
        let expected = self.expected.take();
        self.scanned = 0;

        match (self.framing, expected) {
            (_, Some(expected)) => Err(FramingErr::TruncatedRecord {
                expected,
                received: leftover.len(),
            }),
            (RecordFraming::Length, None) if is_blank(&leftover) => Ok(None),
            (RecordFraming::Length, None) => Err(FramingErr::InvalidRecordLength(
                String::from_utf8_lossy(&leftover).into_owned(),
            )),
            // a final line without a newline is still a complete record
            (RecordFraming::Newline, None) => Ok(trimmed_record(&leftover)),
        }
    }

    pub(super) fn reset(&mut self) {
        self.partial.clear();
        self.scanned = 0;
        self.expected = None;
    }

    pub(super) fn buffered(&self) -> usize {
        self.partial.len()
    }

    fn split_lines(&mut self, out: &mut Vec<Decoded>) {
        let (mut start, mut search_from) = (0, self.scanned);
        while let Some(idx) = self.partial[search_from..].iter().position(|&b| b == b'\n') {
            let end = search_from + idx;
            out.extend(trimmed_record(&self.partial[start..end]).map(Decoded::Record));
            start = end + 1;
            search_from = start;
        }
        self.partial.drain(..start);
        self.scanned = self.partial.len();
    }

    fn split_lengths(&mut self, out: &mut Vec<Decoded>) -> Result<(), FramingErr> {
        let mut start = 0;
        loop {
            let unread = &self.partial[start..];
            match self.expected {
                None => {
                    let newline = match unread.iter().position(|&b| b == b'\n') {
                        Some(idx) => idx,
                        None if unread.len() > MAX_LENGTH_LINE => {
                            Err(FramingErr::InvalidRecordLength(
                                String::from_utf8_lossy(&unread[..MAX_LENGTH_LINE]).into_owned(),
                            ))?
                        }
                        None => break,
                    };
                    let line = &unread[..newline];
                    start += newline + 1;
                    if is_blank(line) {
                        // keep-alive
                        continue;
                    }
                    let len_txt = String::from_utf8_lossy(line);
                    let len = len_txt
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| FramingErr::InvalidRecordLength(len_txt.to_string()))?;
                    self.expected = Some(len);
                }
                Some(len) if unread.len() >= len => {
                    out.extend(trimmed_record(&unread[..len]).map(Decoded::Record));
                    start += len;
                    self.expected = None;
                }
                Some(_) => break,
            }
        }
        self.partial.drain(..start);
        self.scanned = 0;
        Ok(())
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

/// Strip the line terminator; blank input yields no record.
fn trimmed_record(bytes: &[u8]) -> Option<Record> {
    let end = bytes
        .iter()
        .rposition(|b| !matches!(b, b'\r' | b'\n'))
        .map_or(0, |idx| idx + 1);
    let bytes = &bytes[..end];
    if is_blank(bytes) {
        None
    } else {
        Some(Record::from(bytes))
    }
}
