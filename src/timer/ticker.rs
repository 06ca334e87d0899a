use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::{Clock, Phase, TimerSnapshot, TimerStore};

/// Publishes the stored timer once per interval for live displays.
///
/// Every tick re-reads the store, so a ticker never holds timer state of its
/// own and stays correct across pauses, stops and other processes.
pub struct TimerTicker {
    clock: Arc<dyn Clock>,
    store: Arc<dyn TimerStore>,
    interval: Duration,
}

impl TimerTicker {
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn TimerStore>, interval: Duration) -> Self {
        Self {
            clock,
            store,
            interval,
        }
    }

    pub fn spawn(self) -> (watch::Receiver<TimerSnapshot>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(self.read());
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }

    /// Ticks until the timer is back to ready or nobody is listening.
    pub async fn run(self, tx: watch::Sender<TimerSnapshot>) {
        debug!("timer ticker started (interval: {:?})", self.interval);
        let mut ticks = tokio::time::interval(self.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticks.tick().await;

            let snapshot = self.read();
            if tx.send(snapshot).is_err() {
                debug!("timer ticker has no receivers, stopping");
                break;
            }
            if snapshot.phase == Phase::Ready {
                debug!("timer is ready, ticker stopping");
                break;
            }
        }
    }

    fn read(&self) -> TimerSnapshot {
        match self.store.load() {
            Ok(Some(state)) => state.snapshot(self.clock.now_millis()),
            Ok(None) => TimerSnapshot::default(),
            Err(e) => {
                warn!("ticker could not read timer state: {}", e);
                TimerSnapshot::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{ManualClock, MemoryTimerStore, Timer};

    #[tokio::test]
    async fn publishes_until_the_timer_stops() {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(MemoryTimerStore::new());
        let mut timer = Timer::restore(clock.clone(), store.clone()).unwrap();
        timer.select_subject("3").unwrap();
        timer.start().unwrap();
        clock.advance(Duration::from_secs(7));

        let ticker = TimerTicker::new(clock.clone(), store.clone(), Duration::from_millis(10));
        let (mut rx, handle) = ticker.spawn();

        rx.changed().await.unwrap();
        let snapshot = *rx.borrow_and_update();
        assert_eq!(snapshot.phase, Phase::Running);
        assert_eq!(snapshot.elapsed_seconds, 7);
        assert_eq!(snapshot.subject_id, Some(3));

        timer.reset().unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("ticker should stop")
            .unwrap();
        assert_eq!(rx.borrow().phase, Phase::Ready);
    }

    #[tokio::test]
    async fn stops_when_receivers_are_gone() {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(MemoryTimerStore::new());
        let mut timer = Timer::restore(clock.clone(), store.clone()).unwrap();
        timer.select_subject("3").unwrap();
        timer.start().unwrap();

        let ticker = TimerTicker::new(clock, store, Duration::from_millis(10));
        let (rx, handle) = ticker.spawn();
        drop(rx);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("ticker should stop")
            .unwrap();
    }
}
