mod err;
pub use err::RedisConnErr;

use super::reply::{parse_reply, RedisParseErr, Reply};
use super::RedisCmd;
use crate::config::{RedisConfig, Secret};
use crate::publish::QueueClient;

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

type Result<T> = std::result::Result<T, RedisConnErr>;

/// A blocking connection to Redis that speaks just enough RESP to push onto lists.
///
/// Every command waits for its reply (no pipelining), and both directions are bounded by the
/// configured publish timeout.
#[derive(Debug)]
pub struct RedisConn {
    conn: Option<TcpStream>,
    addr: String,
    password: Option<Secret>,
    db: Option<u32>,
    timeout: Duration,
    redis_input: Vec<u8>,
}

impl RedisConn {
    pub fn new(redis_cfg: &RedisConfig) -> Result<Self> {
        let mut redis_conn = Self {
            conn: None,
            addr: format!("{}:{}", *redis_cfg.host, *redis_cfg.port),
            password: redis_cfg.password.clone().0,
            db: *redis_cfg.db,
            timeout: *redis_cfg.timeout,
            redis_input: Vec::with_capacity(64),
        };
        redis_conn.connect()?;
        Ok(redis_conn)
    }

    fn connect(&mut self) -> Result<()> {
        self.conn = None;
        let mut conn = self.new_connection()?;
        if let Some(password) = &self.password {
            Self::auth_connection(&mut conn, &mut self.redis_input, password)?;
        }
        Self::validate_connection(&mut conn, &mut self.redis_input, &self.addr)?;
        if let Some(db) = self.db {
            match Self::round_trip(&mut conn, &mut self.redis_input, RedisCmd::Select(db))? {
                Reply::Status(ok) if ok == "OK" => (),
                Reply::Error(e) => Err(RedisConnErr::ErrorReply(e))?,
                other => Err(RedisConnErr::InvalidRedisReply(format!("{:?}", other)))?,
            }
        }
        log::info!("Connected to Redis at {}", self.addr);
        self.conn = Some(conn);
        Ok(())
    }

    fn new_connection(&self) -> Result<TcpStream> {
        let with_addr = |e| RedisConnErr::with_addr(&self.addr, e);
        let socket_addr = self
            .addr
            .to_socket_addrs()
            .map_err(with_addr)?
            .next()
            .ok_or_else(|| with_addr(io::Error::new(io::ErrorKind::NotFound, "no address")))?;

        let conn = TcpStream::connect_timeout(&socket_addr, self.timeout).map_err(with_addr)?;
        conn.set_read_timeout(Some(self.timeout)).map_err(with_addr)?;
        conn.set_write_timeout(Some(self.timeout)).map_err(with_addr)?;
        conn.set_nodelay(true).map_err(with_addr)?;
        Ok(conn)
    }

    fn auth_connection(conn: &mut TcpStream, input: &mut Vec<u8>, pass: &str) -> Result<()> {
        match Self::round_trip(conn, input, RedisCmd::Auth(pass))? {
            Reply::Status(ok) if ok == "OK" => Ok(()),
            Reply::Error(e) if e.starts_with("ERR Client sent AUTH, but no password") => {
                log::warn!("REDIS_PASSWORD is set, but Redis does not require a password");
                Ok(())
            }
            Reply::Error(_) => Err(RedisConnErr::IncorrectPassword),
            other => Err(RedisConnErr::InvalidRedisReply(format!("{:?}", other))),
        }
    }

    fn validate_connection(conn: &mut TcpStream, input: &mut Vec<u8>, addr: &str) -> Result<()> {
        match Self::round_trip(conn, input, RedisCmd::Ping) {
            Ok(Reply::Status(pong)) if pong == "PONG" => Ok(()),
            Ok(Reply::Error(e)) if e.starts_with("NOAUTH") => Err(RedisConnErr::MissingPassword),
            Ok(other) => Err(RedisConnErr::InvalidRedisReply(format!("{:?}", other))),
            Err(RedisConnErr::InvalidRedisReply(reply)) if reply.contains("HTTP/1.") => {
                Err(RedisConnErr::NotRedis(addr.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Send `cmd` and block until its complete reply has arrived.
    fn round_trip(conn: &mut TcpStream, input: &mut Vec<u8>, cmd: RedisCmd) -> Result<Reply> {
        conn.write_all(&cmd.into_sendable())?;
        input.clear();

        let mut buf = [0_u8; 512];
        loop {
            match parse_reply(input) {
                Ok((reply, _leftover)) => break Ok(reply),
                Err(RedisParseErr::Incomplete) => (),
                Err(other) => break Err(other.into()),
            }
            match conn.read(&mut buf)? {
                0 => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "Redis closed the connection",
                ))?,
                n => input.extend_from_slice(&buf[..n]),
            }
        }
    }
}

impl QueueClient for RedisConn {
    type Error = RedisConnErr;

    fn push(&mut self, key: &str, entries: &[Vec<u8>]) -> Result<i64> {
        let conn = self.conn.as_mut().ok_or(RedisConnErr::NotConnected)?;
        let reply = Self::round_trip(conn, &mut self.redis_input, RedisCmd::Rpush { key, entries });
        match reply {
            Ok(Reply::Integer(list_len)) => Ok(list_len),
            Ok(Reply::Error(e)) => Err(RedisConnErr::ErrorReply(e)),
            Ok(other) => Err(RedisConnErr::InvalidRedisReply(format!("{:?}", other))),
            Err(e) => {
                // the connection may hold a stale reply or a half-written command
                self.conn = None;
                Err(e)
            }
        }
    }

    fn reconnect(&mut self) -> Result<()> {
        log::info!("Reconnecting to Redis at {}", self.addr);
        self.connect()
    }
}
