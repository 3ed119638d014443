//! Stopping the consumer when the process is asked to exit.
use crate::consumer::{ConnectionState, StopHandle};
use std::future::Future;
use std::io;

/// Completes with the signal's name once the process receives SIGINT or SIGTERM.
#[cfg(unix)]
pub async fn shutdown_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = interrupt.recv() => Ok("SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl-C")
}

/// Run `consumer` on a blocking thread until it reaches a terminal state.
///
/// If `shutdown` completes first, the consumer is asked to stop through `stop`; it then
/// publishes what it holds, and its final state is still awaited.  Must be called from
/// within a Tokio runtime.
pub async fn run_until_shutdown<F, S>(consumer: F, stop: StopHandle, shutdown: S) -> ConnectionState
where
    F: FnOnce() -> ConnectionState + Send + 'static,
    S: Future<Output = io::Result<&'static str>>,
{
    let mut consumer = tokio::task::spawn_blocking(consumer);
    let finished = tokio::select! {
        finished = &mut consumer => finished,
        signal = shutdown => {
            match signal {
                Ok(name) => {
                    log::warn!("Received {}; publishing buffered records before exiting", name);
                    stop.stop();
                }
                Err(e) => log::error!("Cannot listen for shutdown signals: {}", e),
            }
            consumer.await
        }
    };
    finished.unwrap_or_else(|e| {
        log::error!("The stream consumer panicked: {}", e);
        ConnectionState::Failed
    })
}
