use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RedisParseErr {
    Incomplete,
    InvalidNumber(String),
    InvalidLineStart(String),
    InvalidLineEnd,
    InvalidUtf8,
}

impl fmt::Display for RedisParseErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use RedisParseErr::*;
        let msg = match self {
            Incomplete => "The input from Redis does not form a complete reply, likely because \
                           the input buffer filled partway through a reply.  Save this input \
                           and try again with additional input from Redis."
                .to_string(),
            InvalidNumber(line) => format!("Redis sent `{}` where a number was expected", line),
            InvalidLineStart(line_start) => format!(
                "A Redis reply started with `{}`, which is not a reply type sluice accepts",
                line_start
            ),
            InvalidLineEnd => "A bulk string from Redis was not terminated by `\\r\\n`".to_string(),
            InvalidUtf8 => "Redis sent a status line that is not valid UTF-8".to_string(),
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for RedisParseErr {}
