use super::stream_cfg_types::*;
use super::EnvVar;
use crate::err::FatalErr;

#[derive(Debug, Default, Clone)]
pub struct StreamConfig {
    pub url: StreamUrl,
    pub method: StreamMethod,
    pub headers: StreamHeaders,
    pub params: StreamParams,
    pub user: StreamUser,
    pub password: StreamPass,
    pub framing: StreamFraming,
    pub timeout: StreamTimeout,
    // **NOTE**: every tick is a read that returns without data when the stream is idle.  A
    // shorter tick publishes aged batches closer to `BATCH_AGE` at the cost of more wakeups.
    pub tick: StreamTick,
    pub max_connect_retries: MaxConnectRetries,
    pub min_tcp_delay: MinTcpDelay,
    pub max_tcp_delay: MaxTcpDelay,
    pub min_http_delay: MinHttpDelay,
    pub max_http_delay: MaxHttpDelay,
}

impl StreamConfig {
    const HALF_CREDENTIALS_WARNING: &'static str =
        "Only one of STREAM_USER and STREAM_PASSWORD is set; no Authorization header will be sent.";
    const TICK_WARNING: &'static str =
        "STREAM_TICK is not shorter than STREAM_TIMEOUT; stalled streams will be detected late.";

    pub(crate) fn from_env(env: &EnvVar) -> Result<Self, FatalErr> {
        let cfg = StreamConfig {
            url: StreamUrl::default().maybe_update(env.get("STREAM_URL"))?,
            method: StreamMethod::default().maybe_update(env.get("STREAM_METHOD"))?,
            headers: StreamHeaders::default().maybe_update(env.get("STREAM_HEADERS"))?,
            params: StreamParams::default().maybe_update(env.get("STREAM_PARAMS"))?,
            user: StreamUser::default().maybe_update(env.get("STREAM_USER"))?,
            password: StreamPass::default().maybe_update(env.get("STREAM_PASSWORD"))?,
            framing: StreamFraming::default().maybe_update(env.get("STREAM_FRAMING"))?,
            timeout: StreamTimeout::default().maybe_update(env.get("STREAM_TIMEOUT"))?,
            tick: StreamTick::default().maybe_update(env.get("STREAM_TICK"))?,
            max_connect_retries: MaxConnectRetries::default()
                .maybe_update(env.get("MAX_CONNECT_RETRIES"))?,
            min_tcp_delay: MinTcpDelay::default().maybe_update(env.get("MIN_TCP_DELAY"))?,
            max_tcp_delay: MaxTcpDelay::default().maybe_update(env.get("MAX_TCP_DELAY"))?,
            min_http_delay: MinHttpDelay::default().maybe_update(env.get("MIN_HTTP_DELAY"))?,
            max_http_delay: MaxHttpDelay::default().maybe_update(env.get("MAX_HTTP_DELAY"))?,
        };

        if cfg.user.is_some() != cfg.password.is_some() {
            log::warn!("{}", Self::HALF_CREDENTIALS_WARNING);
        }
        if *cfg.tick >= *cfg.timeout {
            log::warn!("{}", Self::TICK_WARNING);
        }
        if *cfg.min_tcp_delay > *cfg.max_tcp_delay {
            Err(FatalErr::config(
                "MIN_TCP_DELAY",
                cfg.min_tcp_delay.as_millis(),
                "at most MAX_TCP_DELAY",
            ))?
        }
        if *cfg.min_http_delay > *cfg.max_http_delay {
            Err(FatalErr::config(
                "MIN_HTTP_DELAY",
                cfg.min_http_delay.as_millis(),
                "at most MAX_HTTP_DELAY",
            ))?
        }
        log::info!("Stream configuration:\n{:#?}", &cfg);
        Ok(cfg)
    }
}
