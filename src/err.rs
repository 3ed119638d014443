use crate::consumer::ConnectionState;
use crate::publish::RedisConnErr;
use crate::source::ConnectErr;
use std::fmt;

pub enum FatalErr {
    Logger(log::SetLoggerError),
    Dotenv(dotenv::Error),
    StdIo(std::io::Error),
    // config errs
    UrlParse(url::ParseError),
    ConfigErr(String),
    // startup errs
    Redis(RedisConnErr),
    Source(ConnectErr),
    // runtime errs
    Consumer(ConnectionState),
}

impl FatalErr {
    pub fn config(
        var: impl fmt::Display,
        value: impl fmt::Display,
        allowed: impl fmt::Display,
    ) -> Self {
        Self::ConfigErr(format!(
            "{0} is set to `{1}`, which is invalid.\n{3:7}{0} must be {2}.",
            var, value, allowed, ""
        ))
    }
}

impl std::error::Error for FatalErr {}
impl fmt::Debug for FatalErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self)
    }
}

impl fmt::Display for FatalErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use FatalErr::*;
        write!(
            f,
            "{}",
            match self {
                Logger(e) => format!("{}", e),
                Dotenv(e) => format!("could not load the `.env` file.\n{:7}{}", "", e),
                StdIo(e) => format!("{}", e),
                UrlParse(e) => format!("could not parse URL.\n{:7}{}", "", e),
                ConfigErr(e) => e.to_string(),
                Redis(e) => format!("could not connect to Redis.\n{:7}{}", "", e),
                Source(e) => format!("could not set up the stream source.\n{:7}{}", "", e),
                Consumer(state) => format!(
                    "the stream consumer stopped in the `{}` state; automatic recovery is \
                     exhausted and the consumer needs manual attention.",
                    state
                ),
            }
        )
    }
}

impl From<RedisConnErr> for FatalErr {
    fn from(e: RedisConnErr) -> Self {
        Self::Redis(e)
    }
}
impl From<ConnectErr> for FatalErr {
    fn from(e: ConnectErr) -> Self {
        Self::Source(e)
    }
}
impl From<url::ParseError> for FatalErr {
    fn from(e: url::ParseError) -> Self {
        Self::UrlParse(e)
    }
}
impl From<std::io::Error> for FatalErr {
    fn from(e: std::io::Error) -> Self {
        Self::StdIo(e)
    }
}
impl From<dotenv::Error> for FatalErr {
    fn from(e: dotenv::Error) -> Self {
        Self::Dotenv(e)
    }
}
impl From<log::SetLoggerError> for FatalErr {
    fn from(e: log::SetLoggerError) -> Self {
        Self::Logger(e)
    }
}
