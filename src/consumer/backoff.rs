use crate::config::StreamConfig;
use crate::source::ConnectErr;
use std::time::Duration;

/// Delays between connection attempts.
///
/// Network-level errors back off linearly: `min_tcp`, `2 * min_tcp`, ... up to `max_tcp`.
/// HTTP errors back off much faster: each delay is `min_http` plus the previous delay scaled
/// by a fifth of `min_http` in seconds (with the defaults, 10s, 30s, 70s, 150s, then 240s).
#[derive(Debug, Clone)]
pub(super) struct Backoff {
    min_tcp: Duration,
    max_tcp: Duration,
    min_http: Duration,
    max_http: Duration,
    last_tcp: Option<Duration>,
    last_http: Option<Duration>,
}

impl Backoff {
    pub(super) fn new(cfg: &StreamConfig) -> Self {
        Self {
            min_tcp: *cfg.min_tcp_delay,
            max_tcp: *cfg.max_tcp_delay,
            min_http: *cfg.min_http_delay,
            max_http: *cfg.max_http_delay,
            last_tcp: None,
            last_http: None,
        }
    }

    pub(super) fn next(&mut self, err: &ConnectErr) -> Duration {
        if err.is_http() {
            self.next_http()
        } else {
            self.next_tcp()
        }
    }

    pub(super) fn next_tcp(&mut self) -> Duration {
        let delay = match self.last_tcp {
            None => self.min_tcp,
            Some(prev) => prev.checked_add(self.min_tcp).unwrap_or(self.max_tcp),
        };
        let delay = delay.min(self.max_tcp);
        self.last_tcp = Some(delay);
        delay
    }

    fn next_http(&mut self) -> Duration {
        let min = self.min_http.as_secs_f64();
        let secs = match self.last_http {
            None => min,
            Some(prev) => min + prev.as_secs_f64() * (min / 5.0),
        };
        // capped in seconds first: the uncapped value may not fit in a `Duration`
        let delay = Duration::from_secs_f64(secs.min(self.max_http.as_secs_f64()));
        self.last_http = Some(delay);
        delay
    }

    pub(super) fn reset(&mut self) {
        self.last_tcp = None;
        self.last_http = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{MaxHttpDelay, MinHttpDelay};
    use std::io;

    fn secs(delays: &[u64]) -> Vec<Duration> {
        delays.iter().map(|s| Duration::from_secs(*s)).collect()
    }

    #[test]
    fn http_errors_back_off_steeply() {
        let mut backoff = Backoff::new(&StreamConfig::default());
        let err = ConnectErr::HttpStatus(503);

        let delays: Vec<_> = (0..6).map(|_| backoff.next(&err)).collect();
        assert_eq!(delays, secs(&[10, 30, 70, 150, 240, 240]));
    }

    #[test]
    fn network_errors_back_off_linearly() {
        let mut backoff = Backoff::new(&StreamConfig::default());
        let err = ConnectErr::Io(io::Error::from(io::ErrorKind::ConnectionRefused));

        let delays: Vec<_> = (0..4).map(|_| backoff.next(&err)).collect();
        assert_eq!(
            delays,
            [250, 500, 750, 1000]
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect::<Vec<_>>()
        );
        for _ in 0..100 {
            backoff.next(&err);
        }
        assert_eq!(backoff.next(&err), Duration::from_secs(16));
    }

    #[test]
    fn huge_http_delays_are_capped_without_overflowing() {
        let mut cfg = StreamConfig::default();
        cfg.min_http_delay = MinHttpDelay(Duration::from_secs(1_000_000_000_000));
        cfg.max_http_delay = MaxHttpDelay(Duration::from_secs(10_000_000_000_000));
        let mut backoff = Backoff::new(&cfg);
        let err = ConnectErr::HttpStatus(503);

        assert_eq!(backoff.next(&err), Duration::from_secs(1_000_000_000_000));
        assert_eq!(backoff.next(&err), Duration::from_secs(10_000_000_000_000));
        assert_eq!(backoff.next(&err), Duration::from_secs(10_000_000_000_000));
    }

    #[test]
    fn reset_starts_over() {
        let mut backoff = Backoff::new(&StreamConfig::default());
        let err = ConnectErr::HttpStatus(420);
        backoff.next(&err);
        backoff.next(&err);

        backoff.reset();
        assert_eq!(backoff.next(&err), Duration::from_secs(10));
    }
}
