use super::stream_cfg_types::positive_duration;
use super::Secret;
use crate::from_env_var;
use crate::publish::PayloadFormat;
use std::{str::FromStr, time::Duration};
use strum::VariantNames;

from_env_var!(
    /// The host where Redis is running
    let name = RedisHost;
    let default: String = "127.0.0.1".to_string();
    let (env_var, allowed_values) = ("REDIS_HOST", "a hostname or address (e.g., 127.0.0.1)".to_string());
    let from_str = |s| Some(s.to_string());
);
from_env_var!(
    /// The port Redis is running on
    let name = RedisPort;
    let default: u16 = 6379;
    let (env_var, allowed_values) = ("REDIS_PORT", "a number between 0 and 65535".to_string());
    let from_str = |s| s.parse().ok();
);
from_env_var!(
    /// The password to use for Redis
    let name = RedisPass;
    let default: Option<Secret> = None;
    let (env_var, allowed_values) = ("REDIS_PASSWORD", "any string".to_string());
    let from_str = |s| Some(Some(Secret(s.to_string())));
);
from_env_var!(
    /// The Redis database to push into
    let name = RedisDb;
    let default: Option<u32> = None;
    let (env_var, allowed_values) = ("REDIS_DB", "a database number".to_string());
    let from_str = |s| s.parse().ok().map(Some);
);
from_env_var!(
    /// A prefix for every key this consumer writes
    let name = RedisNamespace;
    let default: Option<String> = None;
    let (env_var, allowed_values) = ("REDIS_NAMESPACE", "any string".to_string());
    let from_str = |s| Some(Some(s.to_string()));
);
from_env_var!(
    /// The list that batches are pushed onto
    let name = RedisKey;
    let default: String = "data".to_string();
    let (env_var, allowed_values) = ("REDIS_KEY", "a Redis key".to_string());
    let from_str = |s| Some(s.to_string());
);
from_env_var!(
    /// A list that receives one entry per published batch, for workers blocking on it
    let name = RedisNotifyKey;
    let default: Option<String> = None;
    let (env_var, allowed_values) = ("REDIS_NOTIFY_KEY", "a Redis key".to_string());
    let from_str = |s| Some(Some(s.to_string()));
);
from_env_var!(
    /// How a batch is laid out in the Redis list
    let name = RedisPayload;
    let default: PayloadFormat = PayloadFormat::PerRecord;
    let (env_var, allowed_values) = ("REDIS_PAYLOAD", format!("one of: {:?}", PayloadFormat::VARIANTS));
    let from_str = |s| PayloadFormat::from_str(s).ok();
);
from_env_var!(
    /// How long a single Redis command may take
    let name = PublishTimeout;
    let default: Duration = Duration::from_millis(5000);
    let (env_var, allowed_values) = ("PUBLISH_TIMEOUT", "a positive number of milliseconds".to_string());
    let from_str = |s| positive_duration(s, Duration::from_millis);
);
from_env_var!(
    /// How many times a failed push is retried
    let name = PublishRetries;
    let default: u32 = 3;
    let (env_var, allowed_values) = ("PUBLISH_RETRIES", "a number".to_string());
    let from_str = |s| s.parse().ok();
);
from_env_var!(
    /// The first delay between push retries; it doubles on every attempt
    let name = PublishRetryDelay;
    let default: Duration = Duration::from_millis(100);
    let (env_var, allowed_values) = ("PUBLISH_RETRY_DELAY", "a number of milliseconds".to_string());
    let from_str = |s| s.parse().ok().map(Duration::from_millis);
);
