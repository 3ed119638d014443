use super::super::reply::RedisParseErr;
use crate::publish::Retryable;
use std::fmt;

#[derive(Debug)]
pub enum RedisConnErr {
    ConnectionErr { addr: String, inner: std::io::Error },
    InvalidRedisReply(String),
    UnknownRedisErr(std::io::Error),
    ErrorReply(String),
    IncorrectPassword,
    MissingPassword,
    NotRedis(String),
    NotConnected,
}

impl RedisConnErr {
    pub(super) fn with_addr<T: AsRef<str>>(address: T, inner: std::io::Error) -> Self {
        Self::ConnectionErr {
            addr: address.as_ref().to_string(),
            inner,
        }
    }
}

impl Retryable for RedisConnErr {
    fn is_transient(&self) -> bool {
        use RedisConnErr::*;
        match self {
            ConnectionErr { .. } | UnknownRedisErr(_) | NotConnected => true,
            // Redis is up but temporarily unable to accept writes
            ErrorReply(msg) => ["LOADING", "BUSY", "TRYAGAIN", "MASTERDOWN"]
                .iter()
                .any(|prefix| msg.starts_with(prefix)),
            InvalidRedisReply(_) | IncorrectPassword | MissingPassword | NotRedis(_) => false,
        }
    }
}

impl fmt::Display for RedisConnErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use RedisConnErr::*;
        let msg = match self {
            ConnectionErr { addr, inner } => format!(
                "Error connecting to Redis at {}.\n\
                 Connection Error: {}",
                addr, inner
            ),
            InvalidRedisReply(unexpected_reply) => format!(
                "Received an unexpected reply from Redis: `{}`",
                unexpected_reply
            ),
            UnknownRedisErr(io_err) => {
                format!("Unexpected failure communicating with Redis: {}", io_err)
            }
            ErrorReply(msg) => format!("Redis replied with an error: {}", msg),
            IncorrectPassword => "Incorrect Redis password.  Please supply the correct password \
                                  with the REDIS_PASSWORD environmental variable."
                .to_string(),
            MissingPassword => "Invalid authentication for Redis.  Redis is configured to require \
                                a password, but you did not provide one. \n\
                                Set a password using the REDIS_PASSWORD environmental variable."
                .to_string(),
            NotRedis(addr) => format!(
                "The server at {} is not a Redis server.  Please update the REDIS_HOST and/or \
                 REDIS_PORT environmental variables and try again.",
                addr
            ),
            NotConnected => "There is no open connection to Redis".to_string(),
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for RedisConnErr {}

impl From<std::io::Error> for RedisConnErr {
    fn from(e: std::io::Error) -> RedisConnErr {
        RedisConnErr::UnknownRedisErr(e)
    }
}

impl From<RedisParseErr> for RedisConnErr {
    fn from(e: RedisParseErr) -> RedisConnErr {
        RedisConnErr::InvalidRedisReply(e.to_string())
    }
}
