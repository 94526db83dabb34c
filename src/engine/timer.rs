use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Owner of a running countdown task. Dropping the handle stops the task.
#[derive(Debug)]
pub struct CountdownHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Calls `on_tick` once per `period`, first after one full period, until it
/// breaks or the handle is cancelled.
pub fn spawn_countdown<F, Fut>(period: Duration, mut on_tick: F) -> CountdownHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ControlFlow<()>> + Send,
{
    let token = CancellationToken::new();
    let child = token.clone();
    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
        ticker.tick().await;
        loop {
            tokio::select! {
                biased;
                _ = child.cancelled() => break,
                _ = ticker.tick() => {
                    if child.is_cancelled() {
                        break;
                    }
                    if on_tick().await.is_break() {
                        break;
                    }
                }
            }
        }
        tracing::trace!("countdown task stopped");
    });
    CountdownHandle { token, task }
}
