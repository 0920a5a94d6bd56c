//! The single polling timer of an applet.
//!
//! A fresh [`Poller`] has no action and never fires. Adding an action turns it into a
//! working poller in place, so every holder of a clone sees the change.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use futures::{future::BoxFuture, Future, FutureExt};
use tokio::sync::Notify;

use crate::events::{handler, Handler};

#[derive(Default)]
struct PollerState {
    action: Option<Handler<()>>,
    pre_check: Option<Handler<()>>,
    post_check: Option<Handler<()>>,
    /// Seconds between two runs. 0 never fires.
    interval: u64,
    enabled: bool,
    counter: u64,
}

#[derive(Default)]
struct PollerInner {
    state: Mutex<PollerState>,
    restarted: Notify,
}

#[derive(Clone, Default)]
pub struct Poller(Arc<PollerInner>);

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Poller")
            .field("exists", &state.action.is_some())
            .field("enabled", &state.enabled)
            .field("interval", &state.interval)
            .field("counter", &state.counter)
            .finish()
    }
}

impl Poller {
    fn state(&self) -> MutexGuard<'_, PollerState> {
        self.0.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the polling action. The poller is enabled from now on.
    pub fn add<F, Fut>(&self, action: F) -> &Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.state();
        state.action = Some(handler(move |()| action()));
        state.enabled = true;
        self
    }

    pub fn exists(&self) -> bool {
        self.state().action.is_some()
    }

    /// Run before each action, e.g. to show an activity emblem.
    pub fn set_pre_check<F, Fut>(&self, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.state().pre_check = Some(handler(move |()| f()));
    }

    pub fn set_post_check<F, Fut>(&self, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.state().post_check = Some(handler(move |()| f()));
    }

    pub fn set_interval(&self, interval: Duration) {
        self.state().interval = interval.as_secs();
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.state().interval)
    }

    pub fn counter(&self) -> u64 {
        self.state().counter
    }

    pub fn start(&self) {
        self.state().enabled = true;
    }

    /// Prevent later runs. A run in progress completes.
    pub fn stop(&self) {
        self.state().enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    /// Run the action now and make the event loop rearm its timer.
    pub fn restart(&self) {
        self.fire();
        self.0.restarted.notify_one();
    }

    /// Reset the counter and run the action in the background.
    pub(crate) fn fire(&self) {
        let (pre, action, post) = {
            let mut state = self.state();
            state.counter = 0;
            (state.pre_check.clone(), state.action.clone(), state.post_check.clone())
        };
        let Some(action) = action else { return };
        tokio::spawn(async move {
            if let Some(pre) = pre {
                pre(()).await;
            }
            action(()).await;
            if let Some(post) = post {
                post(()).await;
            }
        });
    }

    /// Count one second, and run the action once `interval` seconds were counted.
    /// Returns whether the action ran.
    pub fn plop(&self) -> bool {
        {
            let mut state = self.state();
            if state.action.is_none() || !state.enabled || state.interval == 0 {
                return false;
            }
            state.counter += 1;
            if state.counter < state.interval {
                return false;
            }
        }
        self.fire();
        true
    }

    /// A timer firing after one interval, or never when the poller can't run.
    pub fn wait(&self) -> BoxFuture<'static, ()> {
        let state = self.state();
        if state.action.is_none() || !state.enabled || state.interval == 0 {
            return futures::future::pending().boxed();
        }
        tokio::time::sleep(Duration::from_secs(state.interval)).boxed()
    }

    /// Resolves when [`Poller::restart`] was called since the last time it resolved.
    pub async fn restarted(&self) {
        self.0.restarted.notified().await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn counting_poller(interval: u64) -> (Poller, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let poller = Poller::default();
        poller.add(move || {
            let tx = tx.clone();
            async move { tx.send(()).unwrap() }
        });
        poller.set_interval(Duration::from_secs(interval));
        (poller, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_fires_now_and_after_interval() {
        let (poller, mut rx) = counting_poller(10);
        poller.start();
        let begin = tokio::time::Instant::now();
        poller.restart();
        rx.recv().await.unwrap();
        assert_eq!(poller.counter(), 0);

        poller.wait().await;
        poller.fire();
        rx.recv().await.unwrap();
        assert!(begin.elapsed() >= Duration::from_secs(10) && begin.elapsed() < Duration::from_secs(11));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_plop_counts_seconds() {
        let (poller, mut rx) = counting_poller(3);
        assert!(!poller.plop());
        assert!(!poller.plop());
        assert_eq!(poller.counter(), 2);
        assert!(poller.plop());
        assert_eq!(poller.counter(), 0);
        rx.recv().await.unwrap();

        poller.stop();
        assert!(!poller.plop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nil_poller_never_fires() {
        let poller = Poller::default();
        assert!(!poller.exists());
        assert!(!poller.plop());
        poller.restart();
        let timed_out = tokio::time::timeout(Duration::from_secs(3600), poller.wait()).await;
        assert!(timed_out.is_err());

        let (zero, _rx) = counting_poller(0);
        assert!(tokio::time::timeout(Duration::from_secs(3600), zero.wait()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_with_zero_interval_runs_once() {
        let (poller, mut rx) = counting_poller(0);
        poller.restart();
        rx.recv().await.unwrap();
        assert!(tokio::time::timeout(Duration::from_secs(3600), poller.wait()).await.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_hooks_wrap_the_action() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = Poller::default();
        let (pre, action, post) = (tx.clone(), tx.clone(), tx);
        poller.set_pre_check(move || {
            let tx = pre.clone();
            async move { tx.send("pre").unwrap() }
        });
        poller.add(move || {
            let tx = action.clone();
            async move { tx.send("action").unwrap() }
        });
        poller.set_post_check(move || {
            let tx = post.clone();
            async move { tx.send("post").unwrap() }
        });
        poller.restart();
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(rx.recv().await.unwrap());
        }
        assert_eq!(seen, vec!["pre", "action", "post"]);
    }
}
