use crate::err::FatalErr;
use hashbrown::HashMap;
use std::fmt;
use url::Url;

#[derive(Debug)]
pub(crate) struct EnvVar(pub HashMap<String, String>);
impl std::ops::Deref for EnvVar {
    type Target = HashMap<String, String>;
    fn deref(&self) -> &HashMap<String, String> {
        &self.0
    }
}

impl Clone for EnvVar {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
impl EnvVar {
    pub(crate) fn new(vars: HashMap<String, String>) -> Self {
        Self(vars)
    }

    pub(crate) fn maybe_add_env_var(&mut self, key: &str, maybe_value: Option<impl ToString>) {
        if let Some(value) = maybe_value {
            self.0.insert(key.to_string(), value.to_string());
        }
    }

    /// Expand `REDIS_URL` into the individual `REDIS_*` variables it stands for.  Values in
    /// the URL take precedence over variables that were set separately.
    pub(crate) fn update_with_redis_url(mut self, url_str: &str) -> Result<Self, FatalErr> {
        let url = Url::parse(url_str)?;
        if url.scheme() != "redis" {
            return Err(FatalErr::config("REDIS_URL", url_str, "a `redis://` URL"));
        }

        let db = url.path().trim_start_matches('/');
        let db = if db.is_empty() { None } else { Some(db) };
        let password = url
            .password()
            .map(|pass| percent_decode(pass).unwrap_or_else(|| pass.to_string()));

        self.maybe_add_env_var("REDIS_HOST", url.host_str());
        self.maybe_add_env_var("REDIS_PORT", url.port());
        self.maybe_add_env_var("REDIS_PASSWORD", password);
        self.maybe_add_env_var("REDIS_DB", db);
        Ok(self)
    }
}

fn percent_decode(s: &str) -> Option<String> {
    url::form_urlencoded::parse(format!("v={}", s.replace('+', "%2B")).as_bytes())
        .next()
        .map(|(_key, value)| value.into_owned())
}

impl fmt::Display for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut result = String::new();
        for env_var in &[
            "RUST_ENV",
            "RUST_LOG",
            "STREAM_URL",
            "STREAM_METHOD",
            "STREAM_HEADERS",
            "STREAM_PARAMS",
            "STREAM_USER",
            "STREAM_FRAMING",
            "STREAM_TIMEOUT",
            "STREAM_TICK",
            "MAX_CONNECT_RETRIES",
            "MIN_TCP_DELAY",
            "MAX_TCP_DELAY",
            "MIN_HTTP_DELAY",
            "MAX_HTTP_DELAY",
            "BATCH_SIZE",
            "BATCH_AGE",
            "MAX_HELD_BATCHES",
            "REDIS_HOST",
            "REDIS_PORT",
            "REDIS_DB",
            "REDIS_NAMESPACE",
            "REDIS_KEY",
            "REDIS_NOTIFY_KEY",
            "REDIS_PAYLOAD",
            "PUBLISH_TIMEOUT",
            "PUBLISH_RETRIES",
            "PUBLISH_RETRY_DELAY",
        ] {
            if let Some(value) = self.get(&(*env_var).to_string()) {
                result = format!("{}\n    {}: {}", result, env_var, value)
            }
        }
        write!(f, "{}", result)
    }
}

/// A value that is never written to the logs.
#[derive(Clone, PartialEq)]
pub struct Secret(pub String);
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"********\"")
    }
}
impl std::ops::Deref for Secret {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

#[macro_export]
macro_rules! from_env_var {
    ($(#[$outer:meta])*
     let name = $name:ident;
     let default: $type:ty = $inner:expr;
     let (env_var, allowed_values) = ($env_var:tt, $allowed_values:expr);
     let from_str = |$arg:ident| $body:expr;
    ) => {
        $(#[$outer])*
        #[derive(Clone)]
        pub struct $name(pub $type);
        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{:?}", self.0)
            }
        }
        impl std::ops::Deref for $name {
            type Target = $type;
            fn deref(&self) -> &$type {
                &self.0
            }
        }
        impl std::default::Default for $name {
            fn default() -> Self {
                $name($inner)
            }
        }
        impl $name {
            fn inner_from_str($arg: &str) -> Option<$type> {
                $body
            }
            pub(crate) fn maybe_update(
                self,
                var: Option<&String>,
            ) -> Result<Self, crate::err::FatalErr> {
                Ok(match var {
                    Some(empty_string) if empty_string.is_empty() => Self::default(),
                    Some(value) => Self(Self::inner_from_str(value).ok_or_else(|| {
                        crate::err::FatalErr::config($env_var, value, $allowed_values)
                    })?),
                    None => self,
                })
            }
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn env(pairs: &[(&str, &str)]) -> EnvVar {
        EnvVar::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn redis_url_expands_into_separate_vars() -> TestResult {
        let vars = env(&[("REDIS_PORT", "1")])
            .update_with_redis_url("redis://:p%40ss@cache.internal:6380/2")?;

        assert_eq!(vars.get("REDIS_HOST").map(String::as_str), Some("cache.internal"));
        assert_eq!(vars.get("REDIS_PORT").map(String::as_str), Some("6380"));
        assert_eq!(vars.get("REDIS_PASSWORD").map(String::as_str), Some("p@ss"));
        assert_eq!(vars.get("REDIS_DB").map(String::as_str), Some("2"));
        Ok(())
    }

    #[test]
    fn redis_url_without_db_leaves_db_unset() -> TestResult {
        let vars = env(&[]).update_with_redis_url("redis://localhost")?;
        assert!(vars.get("REDIS_DB").is_none());
        assert!(vars.get("REDIS_PASSWORD").is_none());
        Ok(())
    }

    #[test]
    fn non_redis_url_is_rejected() {
        assert!(env(&[])
            .update_with_redis_url("http://localhost:6379")
            .is_err());
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let secret = Secret("hunter2".to_string());
        assert_eq!(format!("{:?}", Some(secret)), "Some(\"********\")");
    }
}
