use sluice::config;
use sluice::consumer::{ConnectionState, StopHandle, StreamConsumer};
use sluice::err::FatalErr;
use sluice::publish::{RedisConn, RedisPublisher};
use sluice::shutdown::{run_until_shutdown, shutdown_signal};
use sluice::source::HttpSource;

use std::env;

fn main() -> Result<(), FatalErr> {
    config::merge_dotenv()?;
    pretty_env_logger::formatted_builder()
        .parse_filters(&config::log_filter(env::var("RUST_LOG").ok()))
        .try_init()?;
    let (stream_cfg, batch_cfg, redis_cfg) = config::from_env(dotenv::vars().collect())?;

    let publisher = RedisPublisher::from_config(RedisConn::new(&redis_cfg)?, &redis_cfg);
    let source = HttpSource::new(&stream_cfg)?;
    let stop = StopHandle::new();

    log::info!(
        "Streaming from {} into `{}`",
        *stream_cfg.url,
        redis_cfg.namespaced(&redis_cfg.key)
    );
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .thread_name("stream-consumer")
        .build()?;
    let consumer_stop = stop.clone();
    let consumer = move || {
        StreamConsumer::new(source, publisher, &stream_cfg, &batch_cfg, consumer_stop).run()
    };

    match runtime.block_on(run_until_shutdown(consumer, stop, shutdown_signal())) {
        ConnectionState::Closed => Ok(()),
        state => Err(FatalErr::Consumer(state)),
    }
}
