use sluice::config::*;
use sluice::consumer::{ConnectionState, StopHandle, StreamConsumer};
use sluice::decode::RecordFraming;
use sluice::publish::{PayloadFormat, QueueClient, Retryable, RetryingPublisher};
use sluice::source::{HttpSource, Method};

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use std::{fmt, thread};
use url::Url;

type TestResult = Result<(), Box<dyn std::error::Error>>;
type Pushes = Arc<Mutex<Vec<(String, Vec<Vec<u8>>)>>>;

#[derive(Debug)]
struct Unreachable;
impl fmt::Display for Unreachable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unreachable")
    }
}
impl std::error::Error for Unreachable {}
impl Retryable for Unreachable {
    fn is_transient(&self) -> bool {
        true
    }
}

/// A queue that keeps every push in memory.
struct MemoryQueue(Pushes);
impl QueueClient for MemoryQueue {
    type Error = Unreachable;

    fn push(&mut self, key: &str, entries: &[Vec<u8>]) -> Result<i64, Unreachable> {
        let mut pushes = self.0.lock().expect("lock");
        pushes.push((key.to_string(), entries.to_vec()));
        Ok(pushes.len() as i64)
    }

    fn reconnect(&mut self) -> Result<(), Unreachable> {
        Ok(())
    }
}

/// Serve one HTTP response to the first connection, returning the request it answered.
fn serve_once(response: Vec<u8>) -> Result<(u16, thread::JoinHandle<String>), std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let server = thread::spawn(move || {
        let (socket, _) = listener.accept().expect("a client connects");
        let mut reader = BufReader::new(socket);
        let mut request = String::new();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("request line");
            if let Some(len) = line.strip_prefix("Content-Length: ") {
                content_length = len.trim().parse().expect("numeric length");
            }
            request.push_str(&line);
            if line == "\r\n" {
                break;
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).expect("request body");
        request.push_str(&String::from_utf8_lossy(&body));

        let mut socket = reader.into_inner();
        socket.write_all(&response).expect("response sent");
        request
    });
    Ok((port, server))
}

fn chunked(records: &[&str]) -> Vec<u8> {
    let mut response = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                         Transfer-Encoding: chunked\r\n\r\n"
        .to_vec();
    for record in records {
        let framed = format!("{}\r\n{}\r\n\r\n", record.len() + 2, record);
        response.extend_from_slice(format!("{:x}\r\n{}\r\n", framed.len(), framed).as_bytes());
    }
    response.extend_from_slice(b"0\r\n\r\n");
    response
}

fn stream_cfg(port: u16) -> Result<StreamConfig, url::ParseError> {
    let mut cfg = StreamConfig::default();
    cfg.url = StreamUrl(Url::parse(&format!(
        "http://127.0.0.1:{}/1/statuses/filter.json?delimited=length",
        port
    ))?);
    cfg.method = StreamMethod(Method::Post);
    cfg.params = StreamParams(vec![("track".to_string(), "rust".to_string())]);
    cfg.framing = StreamFraming(RecordFraming::Length);
    cfg.timeout = StreamTimeout(Duration::from_secs(5));
    cfg.tick = StreamTick(Duration::from_millis(10));
    cfg.min_tcp_delay = MinTcpDelay(Duration::from_millis(10));
    cfg.max_tcp_delay = MaxTcpDelay(Duration::from_millis(20));
    // the test server answers once; later attempts are refused until the test stops us
    cfg.max_connect_retries = MaxConnectRetries(1000);
    Ok(cfg)
}

#[test]
fn records_flow_from_the_stream_into_the_queue() -> TestResult {
    let records = [r#"{"id":1,"text":"one"}"#, r#"{"id":2,"text":"two"}"#, r#"{"id":3}"#];
    let (port, server) = serve_once(chunked(&records))?;

    let pushes = Pushes::default();
    let publisher = RetryingPublisher::new(MemoryQueue(pushes.clone()), "sluice:data")
        .with_format(PayloadFormat::PerRecord);
    let mut batch_cfg = BatchConfig::default();
    batch_cfg.size = BatchSize(2);

    let stop = StopHandle::new();
    let consumer_stop = stop.clone();
    let source = HttpSource::new(&stream_cfg(port)?)?;
    let cfg = stream_cfg(port)?;
    let consumer = thread::spawn(move || {
        StreamConsumer::new(source, publisher, &cfg, &batch_cfg, consumer_stop).run()
    });

    let started = Instant::now();
    while pushes.lock().expect("lock").len() < 2 && started.elapsed() < Duration::from_secs(10) {
        thread::sleep(Duration::from_millis(10));
    }
    stop.stop();

    assert_eq!(consumer.join().expect("consumer thread"), ConnectionState::Closed);
    let request = server.join().expect("server thread");
    assert!(request.starts_with("POST /1/statuses/filter.json?delimited=length HTTP/1.1\r\n"));
    assert!(request.ends_with("\r\n\r\ntrack=rust"));

    let pushes = pushes.lock().expect("lock");
    let entries: Vec<_> = pushes
        .iter()
        .map(|(key, entries)| {
            assert_eq!(key, "sluice:data");
            entries
                .iter()
                .map(|e| String::from_utf8_lossy(e).into_owned())
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(
        entries,
        vec![
            vec![records[0].to_string(), records[1].to_string()],
            vec![records[2].to_string()]
        ]
    );
    Ok(())
}

#[test]
fn unauthorized_stream_fails_without_retrying() -> TestResult {
    let unauthorized = b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\n\r\n";
    let (port, server) = serve_once(unauthorized.to_vec())?;

    let pushes = Pushes::default();
    let publisher = RetryingPublisher::new(MemoryQueue(pushes.clone()), "data");
    let cfg = stream_cfg(port)?;
    let source = HttpSource::new(&cfg)?;

    let batch_cfg = BatchConfig::default();
    let state = StreamConsumer::new(source, publisher, &cfg, &batch_cfg, StopHandle::new()).run();

    assert_eq!(state, ConnectionState::Failed);
    server.join().expect("server thread");
    assert!(pushes.lock().expect("lock").is_empty());
    Ok(())
}
