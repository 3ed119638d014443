use std::{fmt, io};

#[derive(Debug)]
pub enum ConnectErr {
    InvalidUrl(String),
    Io(io::Error),
    Tls(String),
    HttpStatus(u16),
    MalformedResponse(String),
    NotChunked,
}

impl ConnectErr {
    /// Whether connecting again (after a backoff) could succeed.
    ///
    /// Among HTTP errors only server errors and rate limiting (`420` and `429`) are worth
    /// retrying; any other status means the request itself needs fixing.
    pub fn is_retryable(&self) -> bool {
        use ConnectErr::*;
        match self {
            Io(_) | Tls(_) | MalformedResponse(_) => true,
            HttpStatus(status) => *status >= 500 || *status == 420 || *status == 429,
            InvalidUrl(_) | NotChunked => false,
        }
    }

    /// HTTP-level failures back off more slowly than network-level ones.
    pub fn is_http(&self) -> bool {
        matches!(self, ConnectErr::HttpStatus(_))
    }
}

impl fmt::Display for ConnectErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConnectErr::*;
        match self {
            InvalidUrl(url) => write!(f, "`{}` is not a URL sluice can stream from", url),
            Io(e) => write!(f, "network error: {}", e),
            Tls(e) => write!(f, "TLS error: {}", e),
            HttpStatus(420) | HttpStatus(429) => {
                write!(f, "the server is rate limiting this client")
            }
            HttpStatus(status) => write!(f, "the server responded with HTTP status {}", status),
            MalformedResponse(line) => write!(f, "malformed HTTP response: `{}`", line),
            NotChunked => write!(
                f,
                "the response is not sent with `Transfer-Encoding: chunked`, so it is not a stream"
            ),
        }
    }
}

impl std::error::Error for ConnectErr {}

impl From<io::Error> for ConnectErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
