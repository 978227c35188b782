//! Fabric connection lifecycle tracking.
//!
//! The fabric stack reports commissioning and network milestones through
//! [`LifecycleTracker::on_event`]. The tracker records them and forwards each
//! one, unmodified and in arrival order, to every registered observer. There
//! are no transition checks: duplicates and out-of-order events are accepted.

use log::{debug, info};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Milestone notification from the fabric stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum LifecycleEvent {
    CommissioningSessionStarted,
    CommissioningSessionStopped,
    CommissioningComplete,
    /// Also raised when the commissioning fail-safe timer expires.
    CommissioningFailed,
    CommissioningWindowOpened,
    CommissioningWindowClosed,
    IpAddressChanged,
    /// Any stack event this node does not interpret.
    Other(u16),
}

/// Last milestone recorded by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum LifecycleState {
    #[default]
    Idle,
    CommissioningSessionStarted,
    CommissioningSessionStopped,
    CommissioningComplete,
    CommissioningFailed,
    CommissioningWindowOpened,
    CommissioningWindowClosed,
    IpAddressChanged,
}

impl LifecycleEvent {
    /// Human readable line for logs, `None` for events this node ignores.
    pub fn describe(self) -> Option<&'static str> {
        match self {
            Self::IpAddressChanged => Some("Interface IP address changed"),
            Self::CommissioningComplete => Some("Commissioning complete"),
            Self::CommissioningFailed => Some("Commissioning failed, fail safe timer expired"),
            Self::CommissioningSessionStarted => Some("Commissioning session started"),
            Self::CommissioningSessionStopped => Some("Commissioning session stopped"),
            Self::CommissioningWindowOpened => Some("Commissioning window opened"),
            Self::CommissioningWindowClosed => Some("Commissioning window closed"),
            Self::Other(_) => None,
        }
    }

    fn state(self) -> Option<LifecycleState> {
        match self {
            Self::CommissioningSessionStarted => Some(LifecycleState::CommissioningSessionStarted),
            Self::CommissioningSessionStopped => Some(LifecycleState::CommissioningSessionStopped),
            Self::CommissioningComplete => Some(LifecycleState::CommissioningComplete),
            Self::CommissioningFailed => Some(LifecycleState::CommissioningFailed),
            Self::CommissioningWindowOpened => Some(LifecycleState::CommissioningWindowOpened),
            Self::CommissioningWindowClosed => Some(LifecycleState::CommissioningWindowClosed),
            Self::IpAddressChanged => Some(LifecycleState::IpAddressChanged),
            Self::Other(_) => None,
        }
    }
}

/// Progress of the current (or last) commissioning attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommissioningStatus {
    #[default]
    Idle,
    InProgress,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifecycleSnapshot {
    pub state: LifecycleState,
    pub commissioning: CommissioningStatus,
    pub window_open: bool,
    pub events_seen: u64,
}

impl LifecycleSnapshot {
    fn apply(&mut self, event: LifecycleEvent) {
        self.events_seen += 1;
        let Some(state) = event.state() else {
            return;
        };
        self.state = state;
        match event {
            LifecycleEvent::CommissioningSessionStarted => {
                self.commissioning = CommissioningStatus::InProgress;
            }
            LifecycleEvent::CommissioningComplete => {
                self.commissioning = CommissioningStatus::Complete;
            }
            LifecycleEvent::CommissioningFailed => {
                self.commissioning = CommissioningStatus::Failed;
            }
            LifecycleEvent::CommissioningWindowOpened => self.window_open = true,
            LifecycleEvent::CommissioningWindowClosed => self.window_open = false,
            _ => {}
        }
    }
}

/// Receives every lifecycle event in arrival order.
///
/// Called synchronously from `on_event`; implementations must not block.
pub trait LifecycleObserver: Send + Sync + 'static {
    fn on_event(&self, event: LifecycleEvent);
}

impl<F> LifecycleObserver for F
where
    F: Fn(LifecycleEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: LifecycleEvent) {
        self(event)
    }
}

pub struct LifecycleTracker {
    /// Held for the whole of one delivery so concurrent producers are
    /// delivered one after another, never interleaved.
    delivery: ReentrantMutex<()>,
    snapshot: Mutex<LifecycleSnapshot>,
    observers: RwLock<Vec<Arc<dyn LifecycleObserver>>>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self {
            delivery: ReentrantMutex::new(()),
            snapshot: Mutex::new(LifecycleSnapshot::default()),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.write().push(observer);
    }

    pub fn on_event(&self, event: LifecycleEvent) {
        let _delivery = self.delivery.lock();
        self.snapshot.lock().apply(event);
        debug!("[Lifecycle] {}", event);

        let observers = self.observers.read().clone();
        for observer in &observers {
            observer.on_event(event);
        }
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        *self.snapshot.lock()
    }

    pub fn state(&self) -> LifecycleState {
        self.snapshot.lock().state
    }
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Forwards events into an unbounded channel so slow consumers never stall
/// the producer.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<LifecycleEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LifecycleObserver for ChannelObserver {
    fn on_event(&self, event: LifecycleEvent) {
        if self.tx.send(event).is_err() {
            debug!("[Lifecycle] Channel receiver dropped, event {} not forwarded", event);
        }
    }
}

/// Disables radio power save once the node is commissioned.
pub struct PowerSaveObserver {
    power_save_disabled: AtomicBool,
}

impl PowerSaveObserver {
    /// `already_provisioned` disables power save immediately.
    pub fn new(already_provisioned: bool) -> Self {
        if already_provisioned {
            info!("[Lifecycle] Network already provisioned, disabling power save");
        }
        Self {
            power_save_disabled: AtomicBool::new(already_provisioned),
        }
    }

    pub fn power_save_disabled(&self) -> bool {
        self.power_save_disabled.load(Ordering::SeqCst)
    }
}

impl LifecycleObserver for PowerSaveObserver {
    fn on_event(&self, event: LifecycleEvent) {
        if event == LifecycleEvent::CommissioningComplete
            && !self.power_save_disabled.swap(true, Ordering::SeqCst)
        {
            info!("[Lifecycle] Commissioned, disabling power save");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn recording(tracker: &LifecycleTracker) -> Arc<Mutex<Vec<LifecycleEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        tracker.add_observer(Arc::new(move |event: LifecycleEvent| sink.lock().push(event)));
        seen
    }

    #[test]
    fn test_initial_state_is_idle() {
        let tracker = LifecycleTracker::new();
        assert_eq!(tracker.state(), LifecycleState::Idle);
        assert_eq!(tracker.snapshot().commissioning, CommissioningStatus::Idle);
    }

    #[test]
    fn test_duplicates_are_forwarded_in_order() {
        let tracker = LifecycleTracker::new();
        let seen = recording(&tracker);
        let events = [
            LifecycleEvent::CommissioningWindowOpened,
            LifecycleEvent::CommissioningSessionStarted,
            LifecycleEvent::CommissioningSessionStopped,
            LifecycleEvent::CommissioningSessionStopped,
            LifecycleEvent::CommissioningComplete,
        ];
        for event in events {
            tracker.on_event(event);
        }
        assert_eq!(*seen.lock(), events);
        assert_eq!(tracker.snapshot().events_seen, 5);
    }

    #[test]
    fn test_commissioning_status() {
        let tracker = LifecycleTracker::new();
        tracker.on_event(LifecycleEvent::CommissioningSessionStarted);
        assert_eq!(tracker.snapshot().commissioning, CommissioningStatus::InProgress);
        tracker.on_event(LifecycleEvent::CommissioningFailed);
        assert_eq!(tracker.snapshot().commissioning, CommissioningStatus::Failed);
        tracker.on_event(LifecycleEvent::CommissioningSessionStarted);
        tracker.on_event(LifecycleEvent::CommissioningComplete);
        assert_eq!(tracker.snapshot().commissioning, CommissioningStatus::Complete);
        // Session stop after completion does not reopen the attempt.
        tracker.on_event(LifecycleEvent::CommissioningSessionStopped);
        assert_eq!(tracker.snapshot().commissioning, CommissioningStatus::Complete);
        assert_eq!(tracker.state(), LifecycleState::CommissioningSessionStopped);
    }

    #[test]
    fn test_window_flag() {
        let tracker = LifecycleTracker::new();
        tracker.on_event(LifecycleEvent::CommissioningWindowOpened);
        assert!(tracker.snapshot().window_open);
        tracker.on_event(LifecycleEvent::CommissioningWindowClosed);
        assert!(!tracker.snapshot().window_open);
    }

    #[test]
    fn test_unknown_event_forwarded_without_state_change() {
        let tracker = LifecycleTracker::new();
        let seen = recording(&tracker);
        tracker.on_event(LifecycleEvent::IpAddressChanged);
        tracker.on_event(LifecycleEvent::Other(0x8001));
        assert_eq!(tracker.state(), LifecycleState::IpAddressChanged);
        assert_eq!(seen.lock().last(), Some(&LifecycleEvent::Other(0x8001)));
        assert_eq!(LifecycleEvent::Other(0x8001).describe(), None);
        assert_eq!(
            LifecycleEvent::CommissioningFailed.describe(),
            Some("Commissioning failed, fail safe timer expired")
        );
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let tracker = Arc::new(LifecycleTracker::new());
        let seen = recording(&tracker);

        let producers: Vec<_> = (0..4u16)
            .map(|p| {
                let tracker = tracker.clone();
                thread::spawn(move || {
                    for i in 0..100u16 {
                        tracker.on_event(LifecycleEvent::Other(p * 1000 + i));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        let seen = seen.lock();
        assert_eq!(seen.len(), 400);
        // FIFO per producer.
        for p in 0..4u16 {
            let mine: Vec<u16> = seen
                .iter()
                .filter_map(|e| match e {
                    LifecycleEvent::Other(code) if code / 1000 == p => Some(code % 1000),
                    _ => None,
                })
                .collect();
            assert_eq!(mine, (0..100u16).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_power_save_disabled_on_completion() {
        let tracker = LifecycleTracker::new();
        let observer = Arc::new(PowerSaveObserver::new(false));
        tracker.add_observer(observer.clone());
        tracker.on_event(LifecycleEvent::CommissioningSessionStarted);
        assert!(!observer.power_save_disabled());
        tracker.on_event(LifecycleEvent::CommissioningComplete);
        assert!(observer.power_save_disabled());
    }

    #[tokio::test]
    async fn test_channel_observer_preserves_order() {
        let tracker = LifecycleTracker::new();
        let (observer, mut rx) = ChannelObserver::new();
        tracker.add_observer(Arc::new(observer));

        tracker.on_event(LifecycleEvent::CommissioningSessionStopped);
        tracker.on_event(LifecycleEvent::CommissioningSessionStopped);
        tracker.on_event(LifecycleEvent::CommissioningWindowClosed);

        assert_eq!(rx.recv().await, Some(LifecycleEvent::CommissioningSessionStopped));
        assert_eq!(rx.recv().await, Some(LifecycleEvent::CommissioningSessionStopped));
        assert_eq!(rx.recv().await, Some(LifecycleEvent::CommissioningWindowClosed));
    }

    #[test]
    fn test_channel_closes_with_tracker() {
        let tracker = LifecycleTracker::new();
        let (observer, mut rx) = ChannelObserver::new();
        tracker.add_observer(Arc::new(observer));
        tracker.on_event(LifecycleEvent::IpAddressChanged);
        drop(tracker);

        tokio_test::block_on(async {
            assert_eq!(rx.recv().await, Some(LifecycleEvent::IpAddressChanged));
            assert_eq!(rx.recv().await, None);
        });
    }
}
