//! Opening the long-lived HTTP request whose chunked response body is the stream.
//!
//! [`HttpSource`] writes the request itself over a `TcpStream` (wrapped in TLS for `https`
//! URLs), reads the response head, and hands back a reader positioned at the first byte of
//! the chunked body.  Once the head has been read, the socket's read timeout drops to the
//! configured tick so that an idle stream still returns control to the consumer regularly.
mod err;
pub use err::ConnectErr;

use crate::config::{Secret, StreamConfig};

use native_tls::TlsConnector;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use strum_macros::{EnumString, EnumVariantNames};
use url::Url;

/// Status lines and headers longer than this are not from a streaming API.
const MAX_HEAD_LINE: usize = 8 * 1024;
const MAX_HEADERS: usize = 100;
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Somewhere a stream of chunked bytes comes from.
pub trait Source {
    type Stream: Read;

    /// Open a new connection, returning a reader positioned at the start of the chunked body.
    fn connect(&mut self) -> Result<Self::Stream, ConnectErr>;
}

#[derive(EnumString, EnumVariantNames, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// The parts of the response head the consumer cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn is_chunked(&self) -> bool {
        self.header("Transfer-Encoding")
            .map_or(false, |te| te.to_ascii_lowercase().contains("chunked"))
    }
}

pub trait ReadWrite: Read + Write + Send {}
impl<T: Read + Write + Send> ReadWrite for T {}

pub type HttpStream = BufReader<Box<dyn ReadWrite>>;

pub struct HttpSource {
    host: String,
    port: u16,
    tls: Option<TlsConnector>,
    request: Vec<u8>,
    timeout: Duration,
    tick: Duration,
}

impl HttpSource {
    pub fn new(cfg: &StreamConfig) -> Result<Self, ConnectErr> {
        let url: &Url = &cfg.url;
        let host = url
            .host_str()
            .ok_or_else(|| ConnectErr::InvalidUrl(url.to_string()))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ConnectErr::InvalidUrl(url.to_string()))?;
        let tls = match url.scheme() {
            "https" => Some(TlsConnector::new().map_err(|e| ConnectErr::Tls(e.to_string()))?),
            "http" => None,
            _ => Err(ConnectErr::InvalidUrl(url.to_string()))?,
        };

        let credentials = match (&*cfg.user, &*cfg.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass)),
            _ => None,
        };
        let request = build_request(
            url,
            *cfg.method,
            &cfg.params,
            &cfg.headers,
            credentials,
        );

        Ok(Self {
            host,
            port,
            tls,
            request,
            timeout: *cfg.timeout,
            tick: *cfg.tick,
        })
    }

    fn open_socket(&self) -> Result<TcpStream, ConnectErr> {
        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "host has no addresses");
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(socket) => return Ok(socket),
                Err(e) => last_err = e,
            }
        }
        Err(last_err.into())
    }
}

impl Source for HttpSource {
    type Stream = HttpStream;

    fn connect(&mut self) -> Result<HttpStream, ConnectErr> {
        log::info!("Connecting to {}:{}", self.host, self.port);
        let socket = self.open_socket()?;
        socket.set_nodelay(true)?;
        socket.set_read_timeout(Some(self.timeout))?;
        socket.set_write_timeout(Some(self.timeout))?;
        let handle = socket.try_clone()?;

        let mut conn: Box<dyn ReadWrite> = match &self.tls {
            Some(connector) => Box::new(
                connector
                    .connect(&self.host, socket)
                    .map_err(|e| ConnectErr::Tls(e.to_string()))?,
            ),
            None => Box::new(socket),
        };
        conn.write_all(&self.request)?;
        conn.flush()?;

        let mut reader = BufReader::new(conn);
        let head = read_head(&mut reader)?;
        log::debug!("Response head: {:?}", head);
        match head.status {
            200 if head.is_chunked() => (),
            200 => Err(ConnectErr::NotChunked)?,
            status => Err(ConnectErr::HttpStatus(status))?,
        }

        handle.set_read_timeout(Some(self.tick))?;
        Ok(reader)
    }
}

fn build_request(
    url: &Url,
    method: Method,
    params: &[(String, String)],
    headers: &[(String, String)],
    credentials: Option<(&str, &Secret)>,
) -> Vec<u8> {
    let mut url = url.clone();
    let body = match method {
        Method::Post => url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish(),
        Method::Get => {
            if !params.is_empty() {
                url.query_pairs_mut().extend_pairs(params);
            }
            String::new()
        }
    };
    let target = match url.query() {
        Some(query) => [url.path(), "?", query].concat(),
        None => url.path().to_string(),
    };
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    let mut request = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}\r\nAccept: */*\r\n",
        method.as_str(),
        target,
        host,
        USER_AGENT
    );
    if let Some((user, pass)) = credentials {
        let token = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            [user, ":", &**pass].concat(),
        );
        request.push_str(&format!("Authorization: Basic {}\r\n", token));
    }
    for (name, value) in headers {
        request.push_str(&format!("{}: {}\r\n", name, value));
    }
    if method == Method::Post {
        request.push_str("Content-Type: application/x-www-form-urlencoded\r\n");
        request.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    request.push_str("\r\n");
    request.push_str(&body);
    request.into_bytes()
}

/// Read the status line and headers, leaving `reader` at the start of the body.
pub fn read_head<R: BufRead>(reader: &mut R) -> Result<ResponseHead, ConnectErr> {
    let status_line = read_line(reader)?;
    let mut parts = status_line.splitn(3, ' ');
    let status = match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/1.") => code.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| ConnectErr::MalformedResponse(status_line.clone()))?;

    let mut headers = Vec::new();
    loop {
        let line = read_line(reader)?;
        if line.is_empty() {
            break;
        }
        if headers.len() == MAX_HEADERS {
            Err(ConnectErr::MalformedResponse("too many headers".to_string()))?
        }
        let idx = line
            .find(':')
            .ok_or_else(|| ConnectErr::MalformedResponse(line.clone()))?;
        headers.push((line[..idx].trim().to_string(), line[idx + 1..].trim().to_string()));
    }
    Ok(ResponseHead { status, headers })
}

/// One CRLF- (or LF-) terminated line of the response head, without its terminator.
fn read_line<R: BufRead>(reader: &mut R) -> Result<String, ConnectErr> {
    let mut line = Vec::new();
    let n = reader
        .take(MAX_HEAD_LINE as u64 + 1)
        .read_until(b'\n', &mut line)?;
    match line.last() {
        _ if n == 0 => Err(ConnectErr::MalformedResponse(
            "connection closed before the response head ended".to_string(),
        )),
        Some(b'\n') => {
            let line = String::from_utf8_lossy(&line);
            Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
        }
        _ => Err(ConnectErr::MalformedResponse(
            "response head line is too long".to_string(),
        )),
    }
}
