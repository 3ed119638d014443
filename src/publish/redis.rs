mod connection;
mod reply;

pub use connection::{RedisConn, RedisConnErr};

/// The handful of commands sluice sends.  Every command goes out as a RESP array of bulk
/// strings, so arbitrary bytes (including `\r\n`) are safe inside keys and entries.
pub(super) enum RedisCmd<'a> {
    Auth(&'a str),
    Select(u32),
    Ping,
    Rpush { key: &'a str, entries: &'a [Vec<u8>] },
}

impl<'a> RedisCmd<'a> {
    pub(super) fn into_sendable(self) -> Vec<u8> {
        match self {
            RedisCmd::Auth(pass) => resp_array(&[b"AUTH", pass.as_bytes()]),
            RedisCmd::Select(db) => resp_array(&[b"SELECT", db.to_string().as_bytes()]),
            RedisCmd::Ping => resp_array(&[b"PING"]),
            RedisCmd::Rpush { key, entries } => {
                let mut args: Vec<&[u8]> = Vec::with_capacity(entries.len() + 2);
                args.push(b"RPUSH");
                args.push(key.as_bytes());
                args.extend(entries.iter().map(Vec::as_slice));
                resp_array(&args)
            }
        }
    }
}

fn resp_array(args: &[&[u8]]) -> Vec<u8> {
    let body_len: usize = args.iter().map(|arg| arg.len() + 16).sum();
    let mut cmd = Vec::with_capacity(body_len + 16);
    cmd.extend_from_slice(&[b"*", args.len().to_string().as_bytes(), b"\r\n"].concat());
    for arg in args {
        cmd.extend_from_slice(&[b"$", arg.len().to_string().as_bytes(), b"\r\n"].concat());
        cmd.extend_from_slice(arg);
        cmd.extend_from_slice(b"\r\n");
    }
    cmd
}
