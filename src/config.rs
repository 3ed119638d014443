//! Configuration defaults.  Every setting can be overridden by an environmental variable
//! (either by setting the variable at runtime or in the `.env` file); see the individual
//! `*_cfg_types` modules for the variable names, defaults, and allowed values.
pub use self::environmental_variables::Secret;
pub use self::{batch_cfg::BatchConfig, redis_cfg::RedisConfig, stream_cfg::StreamConfig};
pub use self::{batch_cfg_types::*, redis_cfg_types::*, stream_cfg_types::*};

use self::environmental_variables::EnvVar;
use super::err;
use hashbrown::HashMap;
use std::env;

mod batch_cfg;
mod batch_cfg_types;
mod environmental_variables;
mod redis_cfg;
mod redis_cfg_types;
mod stream_cfg;
mod stream_cfg_types;

pub fn merge_dotenv() -> Result<(), err::FatalErr> {
    let env_file = match env::var("RUST_ENV").ok().as_deref() {
        Some("production") => ".env.production",
        Some("development") | None => ".env",
        Some(unsupported) => Err(err::FatalErr::config(
            "RUST_ENV",
            unsupported,
            "`production` or `development`",
        ))?,
    };

    match dotenv::from_filename(env_file) {
        Ok(_) => Ok(()),
        // running without a `.env` file is fine; every setting has a default
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

const DEFAULT_LOG_FILTER: &str = "warn";

/// The logging filter: `RUST_LOG` if it is set, otherwise warnings and errors only.
pub fn log_filter(rust_log: Option<String>) -> String {
    match rust_log {
        Some(filter) if !filter.trim().is_empty() => filter,
        _ => DEFAULT_LOG_FILTER.to_string(),
    }
}

pub fn from_env(
    env_vars: HashMap<String, String>,
) -> Result<(StreamConfig, BatchConfig, RedisConfig), err::FatalErr> {
    let env_vars = EnvVar::new(env_vars);
    log::info!("Environmental variables sluice received: {}", &env_vars);

    let stream = StreamConfig::from_env(&env_vars)?;
    let batch = BatchConfig::from_env(&env_vars)?;
    let redis = RedisConfig::from_env(env_vars)?;
    redis.warn_if_slower_than(*stream.timeout);
    Ok((stream, batch, redis))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decode::RecordFraming;
    use crate::publish::PayloadFormat;
    use std::time::Duration;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_without_any_variables() -> TestResult {
        let (stream, batch, redis) = from_env(HashMap::new())?;

        assert_eq!(stream.url.host_str(), Some("stream.twitter.com"));
        assert_eq!(*stream.framing, RecordFraming::Length);
        assert_eq!(*stream.timeout, Duration::from_secs(61));
        assert_eq!(*batch.size, 10);
        assert_eq!(*batch.age, Duration::from_millis(1000));
        assert_eq!(*redis.port, 6379);
        assert_eq!(*redis.payload, PayloadFormat::PerRecord);
        assert_eq!(redis.namespaced(&redis.key), "data");
        Ok(())
    }

    #[test]
    fn variables_override_defaults() -> TestResult {
        let (stream, batch, redis) = from_env(vars(&[
            ("STREAM_URL", "https://example.com/1/stream.json"),
            ("STREAM_METHOD", "get"),
            ("STREAM_FRAMING", "newline"),
            ("STREAM_PARAMS", "track=rust&follow=12,13"),
            ("BATCH_SIZE", "250"),
            ("BATCH_AGE", "20"),
            ("REDIS_NAMESPACE", "close.consumer"),
            ("REDIS_PAYLOAD", "json_array"),
            ("PUBLISH_RETRIES", "0"),
        ]))?;

        assert_eq!(stream.url.scheme(), "https");
        assert_eq!(*stream.framing, RecordFraming::Newline);
        assert_eq!(
            *stream.params,
            vec![
                ("track".to_string(), "rust".to_string()),
                ("follow".to_string(), "12,13".to_string())
            ]
        );
        assert_eq!(*batch.size, 250);
        assert_eq!(*batch.age, Duration::from_millis(20));
        assert_eq!(redis.namespaced(&redis.key), "close.consumer:data");
        assert_eq!(*redis.payload, PayloadFormat::JsonArray);
        assert_eq!(*redis.max_retries, 0);
        Ok(())
    }

    #[test]
    fn empty_variables_fall_back_to_defaults() -> TestResult {
        let (_, batch, _) = from_env(vars(&[("BATCH_SIZE", "")]))?;
        assert_eq!(*batch.size, 10);
        Ok(())
    }

    #[test]
    fn invalid_values_are_fatal() {
        for (var, value) in &[
            ("BATCH_SIZE", "0"),
            ("BATCH_AGE", "soon"),
            ("STREAM_FRAMING", "xml"),
            ("REDIS_PORT", "70000"),
            ("REDIS_PAYLOAD", "csv"),
            ("MIN_TCP_DELAY", "20000"),
        ] {
            assert!(
                from_env(vars(&[(*var, *value)])).is_err(),
                "{}={} should be rejected",
                var,
                value
            );
        }
    }

    #[test]
    fn log_filter_defaults_to_warn() {
        assert_eq!(log_filter(None), "warn");
        assert_eq!(log_filter(Some(" ".to_string())), "warn");
        assert_eq!(log_filter(Some("sluice=debug".to_string())), "sluice=debug");
    }

    #[test]
    fn redis_url_overrides_host_and_port() -> TestResult {
        let (_, _, redis) = from_env(vars(&[
            ("REDIS_HOST", "ignored"),
            ("REDIS_URL", "redis://queue.internal:6380/3"),
        ]))?;
        assert_eq!(&*redis.host, "queue.internal");
        assert_eq!(*redis.port, 6380);
        assert_eq!(*redis.db, Some(3));
        Ok(())
    }
}
