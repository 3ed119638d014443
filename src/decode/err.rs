use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum FramingErr {
    InvalidChunkSize(String),
    SizeLineTooLong,
    MissingChunkTerminator,
    InvalidRecordLength(String),
    TruncatedRecord { expected: usize, received: usize },
}

impl fmt::Display for FramingErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use FramingErr::*;
        let msg = match self {
            InvalidChunkSize(line) => format!(
                "Expected a chunk size in hex, but received `{}`.  The stream is out of sync.",
                line
            ),
            SizeLineTooLong => "A chunk size line did not end where one should have; the \
                                stream is not chunk encoded or is out of sync."
                .to_string(),
            MissingChunkTerminator => {
                "A chunk was not followed by CRLF where its declared size ended.".to_string()
            }
            InvalidRecordLength(line) => format!(
                "Expected the length of the next record, but received `{}`.  Check that the \
                 stream is requested with `delimited=length` or set STREAM_FRAMING=newline.",
                line
            ),
            TruncatedRecord { expected, received } => format!(
                "The stream ended partway through a record: {} of {} bytes received.",
                received, expected
            ),
        };
        write!(f, "{}", msg)
    }
}

impl Error for FramingErr {}
