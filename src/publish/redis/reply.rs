//! Parsing of the replies Redis sends to the commands in [`super::RedisCmd`].
//!
//! Each reply is a single line starting with a type byte, except bulk strings, which announce
//! their length and are followed by that many bytes.  See the
//! [Redis protocol documentation](https://redis.io/topics/protocol) for details.  For
//! example:
//!
//! ```text
//! +OK\r\n            (simple string)
//! -WRONGTYPE ...\r\n (error)
//! :42\r\n            (integer; RPUSH replies with the new list length)
//! $4\r\nPONG\r\n     (bulk string)
//! ```
mod err;
pub use err::RedisParseErr;

use RedisParseErr::*;
use std::str;

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Status(String),
    Error(String),
    Integer(i64),
    /// `None` is the null bulk string (`$-1`).
    Bulk(Option<Vec<u8>>),
}

type RedisParser<Item> = Result<Item, RedisParseErr>;

/// Parse one reply from the start of `input`, returning it with the unparsed remainder.
///
/// Returns [`RedisParseErr::Incomplete`] when `input` holds only part of a reply; read more
/// bytes and try again.
pub fn parse_reply(input: &[u8]) -> RedisParser<(Reply, &[u8])> {
    let (first_byte, rest) = input.split_first().ok_or(Incomplete)?;
    match first_byte {
        b'+' => line_at(rest).map(|(line, rest)| (Reply::Status(line.to_string()), rest)),
        b'-' => line_at(rest).map(|(line, rest)| (Reply::Error(line.to_string()), rest)),
        b':' => parse_number_at(rest).map(|(n, rest)| (Reply::Integer(n), rest)),
        b'$' => parse_bulk_string(rest),
        // sluice never sends a command that replies with an array
        _ => Err(InvalidLineStart(
            String::from_utf8_lossy(&input[..input.len().min(16)]).into_owned(),
        )),
    }
}

fn line_at(s: &[u8]) -> RedisParser<(&str, &[u8])> {
    let end = s.windows(2).position(|w| w == b"\r\n").ok_or(Incomplete)?;
    let line = str::from_utf8(&s[..end]).map_err(|_| InvalidUtf8)?;
    Ok((line, &s[end + 2..]))
}

fn parse_number_at(s: &[u8]) -> RedisParser<(i64, &[u8])> {
    let (line, rest) = line_at(s)?;
    let n = line.parse().map_err(|_| InvalidNumber(line.to_string()))?;
    Ok((n, rest))
}

/// All bulk strings have the format `$[LENGTH_OF_ITEM_BODY]\r\n[ITEM_BODY]\r\n`
fn parse_bulk_string(s: &[u8]) -> RedisParser<(Reply, &[u8])> {
    let (len, rest) = parse_number_at(s)?;
    if len < 0 {
        return Ok((Reply::Bulk(None), rest));
    }
    let len = len as usize;
    if rest.len() < len + 2 {
        return Err(Incomplete);
    }
    let (content, rest) = rest.split_at(len);
    match rest {
        [b'\r', b'\n', rest @ ..] => Ok((Reply::Bulk(Some(content.to_vec())), rest)),
        _ => Err(InvalidLineEnd),
    }
}
