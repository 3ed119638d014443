use super::redis_cfg_types::*;
use super::EnvVar;
use crate::err::FatalErr;

#[derive(Debug, Default, Clone)]
pub struct RedisConfig {
    pub host: RedisHost,
    pub port: RedisPort,
    pub password: RedisPass,
    pub db: RedisDb,
    pub namespace: RedisNamespace,
    pub key: RedisKey,
    pub notify_key: RedisNotifyKey,
    pub payload: RedisPayload,
    // **NOTE**: the stream is not read while a push is in flight, so the worst case
    // (`PUBLISH_TIMEOUT` times the number of attempts) must stay well below the time the
    // streaming API will buffer for a slow consumer before disconnecting it.
    pub timeout: PublishTimeout,
    pub max_retries: PublishRetries,
    pub retry_delay: PublishRetryDelay,
}

impl RedisConfig {
    const SLOW_PUBLISH_WARNING: &'static str = "PUBLISH_TIMEOUT multiplied by the number of push \
                                                attempts exceeds STREAM_TIMEOUT; a slow Redis may \
                                                get this consumer disconnected.";

    pub(crate) fn from_env(env: EnvVar) -> Result<Self, FatalErr> {
        let env = match env.get("REDIS_URL").cloned() {
            Some(url_str) => env.update_with_redis_url(&url_str)?,
            None => env,
        };

        let cfg = RedisConfig {
            host: RedisHost::default().maybe_update(env.get("REDIS_HOST"))?,
            port: RedisPort::default().maybe_update(env.get("REDIS_PORT"))?,
            password: RedisPass::default().maybe_update(env.get("REDIS_PASSWORD"))?,
            db: RedisDb::default().maybe_update(env.get("REDIS_DB"))?,
            namespace: RedisNamespace::default().maybe_update(env.get("REDIS_NAMESPACE"))?,
            key: RedisKey::default().maybe_update(env.get("REDIS_KEY"))?,
            notify_key: RedisNotifyKey::default().maybe_update(env.get("REDIS_NOTIFY_KEY"))?,
            payload: RedisPayload::default().maybe_update(env.get("REDIS_PAYLOAD"))?,
            timeout: PublishTimeout::default().maybe_update(env.get("PUBLISH_TIMEOUT"))?,
            max_retries: PublishRetries::default().maybe_update(env.get("PUBLISH_RETRIES"))?,
            retry_delay: PublishRetryDelay::default().maybe_update(env.get("PUBLISH_RETRY_DELAY"))?,
        };

        log::info!("Redis configuration:\n{:#?}", &cfg);
        Ok(cfg)
    }

    /// The list key with the namespace, if any, prepended.
    pub fn namespaced(&self, key: &str) -> String {
        match &*self.namespace {
            Some(namespace) => [namespace.as_str(), ":", key].concat(),
            None => key.to_string(),
        }
    }

    pub(crate) fn warn_if_slower_than(&self, stream_timeout: std::time::Duration) {
        let attempts = self.max_retries.saturating_add(1);
        if self.timeout.saturating_mul(attempts) > stream_timeout {
            log::warn!("{}", Self::SLOW_PUBLISH_WARNING);
        }
    }
}
