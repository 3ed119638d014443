use super::Secret;
use crate::decode::RecordFraming;
use crate::from_env_var;
use crate::source::Method;
use std::{str::FromStr, time::Duration};
use strum::VariantNames;
use url::Url;

const TWITTER_FILTER_URL: &str = "http://stream.twitter.com/1/statuses/filter.json?delimited=length";

from_env_var!(
    /// The streaming API endpoint to consume
    let name = StreamUrl;
    let default: Url = Url::parse(TWITTER_FILTER_URL).expect("hardcoded");
    let (env_var, allowed_values) = ("STREAM_URL", "an http:// or https:// URL".to_string());
    let from_str = |s| Url::parse(s).ok().filter(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
    });
);
from_env_var!(
    /// The HTTP method used to open the stream
    let name = StreamMethod;
    let default: Method = Method::Post;
    let (env_var, allowed_values) = ("STREAM_METHOD", format!("one of: {:?}", Method::VARIANTS));
    let from_str = |s| Method::from_str(s).ok();
);
from_env_var!(
    /// Extra request headers, as `Name: value` pairs separated by `;`
    let name = StreamHeaders;
    let default: Vec<(String, String)> = Vec::new();
    let (env_var, allowed_values) = ("STREAM_HEADERS", "`Name: value` pairs separated by `;`".to_string());
    let from_str = |s| parse_headers(s);
);
from_env_var!(
    /// Parameters sent with the request (e.g., the `follow` and `track` predicates)
    let name = StreamParams;
    let default: Vec<(String, String)> = Vec::new();
    let (env_var, allowed_values) = ("STREAM_PARAMS", "a form-encoded string (e.g., `track=rust&follow=12`)".to_string());
    let from_str = |s| Some(url::form_urlencoded::parse(s.as_bytes()).into_owned().collect());
);
from_env_var!(
    /// The username for HTTP basic auth, if any
    let name = StreamUser;
    let default: Option<String> = None;
    let (env_var, allowed_values) = ("STREAM_USER", "any string".to_string());
    let from_str = |s| Some(Some(s.to_string()));
);
from_env_var!(
    /// The password for HTTP basic auth, if any
    let name = StreamPass;
    let default: Option<Secret> = None;
    let (env_var, allowed_values) = ("STREAM_PASSWORD", "any string".to_string());
    let from_str = |s| Some(Some(Secret(s.to_string())));
);
from_env_var!(
    /// How records are delimited inside the chunked body
    let name = StreamFraming;
    let default: RecordFraming = RecordFraming::Length;
    let (env_var, allowed_values) = ("STREAM_FRAMING", format!("one of: {:?}", RecordFraming::VARIANTS));
    let from_str = |s| RecordFraming::from_str(s).ok();
);
from_env_var!(
    /// How long the stream may stay silent before it is treated as dropped
    let name = StreamTimeout;
    let default: Duration = Duration::from_secs(61);
    let (env_var, allowed_values) = ("STREAM_TIMEOUT", "a positive number of seconds".to_string());
    let from_str = |s| positive_duration(s, Duration::from_secs);
);
from_env_var!(
    /// How often an idle stream wakes up to check batch age and stop requests
    let name = StreamTick;
    let default: Duration = Duration::from_millis(100);
    let (env_var, allowed_values) = ("STREAM_TICK", "a positive number of milliseconds".to_string());
    let from_str = |s| positive_duration(s, Duration::from_millis);
);
from_env_var!(
    /// How many consecutive failed connection attempts are tolerated
    let name = MaxConnectRetries;
    let default: u32 = 10;
    let (env_var, allowed_values) = ("MAX_CONNECT_RETRIES", "a number".to_string());
    let from_str = |s| s.parse().ok();
);
from_env_var!(
    /// The step of the linear backoff after a network error
    let name = MinTcpDelay;
    let default: Duration = Duration::from_millis(250);
    let (env_var, allowed_values) = ("MIN_TCP_DELAY", "a positive number of milliseconds".to_string());
    let from_str = |s| positive_duration(s, Duration::from_millis);
);
from_env_var!(
    /// The ceiling of the linear backoff after a network error
    let name = MaxTcpDelay;
    let default: Duration = Duration::from_secs(16);
    let (env_var, allowed_values) = ("MAX_TCP_DELAY", "a positive number of milliseconds".to_string());
    let from_str = |s| positive_duration(s, Duration::from_millis);
);
from_env_var!(
    /// The first delay after an HTTP error status
    let name = MinHttpDelay;
    let default: Duration = Duration::from_secs(10);
    let (env_var, allowed_values) = ("MIN_HTTP_DELAY", "a positive number of milliseconds".to_string());
    let from_str = |s| positive_duration(s, Duration::from_millis);
);
from_env_var!(
    /// The ceiling of the backoff after HTTP error statuses
    let name = MaxHttpDelay;
    let default: Duration = Duration::from_secs(240);
    let (env_var, allowed_values) = ("MAX_HTTP_DELAY", "a positive number of milliseconds".to_string());
    let from_str = |s| positive_duration(s, Duration::from_millis);
);

pub(super) fn positive_duration(s: &str, unit: fn(u64) -> Duration) -> Option<Duration> {
    s.parse().ok().filter(|n| *n > 0).map(unit)
}

fn parse_headers(s: &str) -> Option<Vec<(String, String)>> {
    s.split(';')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| {
            let idx = pair.find(':')?;
            let (name, value) = (pair[..idx].trim(), pair[idx + 1..].trim());
            let valid_name = !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic());
            let valid_value = !value.contains(&['\r', '\n'][..]);
            if valid_name && valid_value {
                Some((name.to_string(), value.to_string()))
            } else {
                None
            }
        })
        .collect()
}
