//! Host bridge: topic-filtered, best-effort message channels.
//!
//! Two channels connect the application to the overlay service:
//!
//! ```text
//! application --(command topic)--> overlay service
//! overlay service --(outcome topic)--> application
//! ```
//!
//! Delivery is at-most-once and lossy. A message published while nobody is
//! subscribed to its exact topic is dropped, and a subscriber that attaches
//! later never sees it. There is no queueing, replay or retry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::{OverlayCommand, Outcome};
use crate::storage::config::{BridgeConfig, MAX_CAPACITY};

/// Exact-match channel scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(Arc<str>);

impl Topic {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What happened to a published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to this many live subscribers of the topic.
    Delivered(usize),
    /// No live subscriber; the message is gone.
    Dropped,
}

impl Delivery {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Delivery::Dropped)
    }
}

/// A lossy broadcast bus partitioned by topic.
pub struct Channel<T> {
    capacity: usize,
    topics: Mutex<HashMap<Topic, broadcast::Sender<T>>>,
}

impl<T: Clone + Send + 'static> Channel<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.clamp(1, MAX_CAPACITY),
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Publish `payload` to every current subscriber of exactly `topic`.
    pub fn publish(&self, topic: &Topic, payload: T) -> Delivery {
        let topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = topics.get(topic) else {
            debug!(%topic, "no subscriber ever registered; dropping message");
            return Delivery::Dropped;
        };
        match tx.send(payload) {
            Ok(n) => Delivery::Delivered(n),
            Err(_) => {
                debug!(%topic, "no live subscriber; dropping message");
                Delivery::Dropped
            }
        }
    }

    /// Register for messages on exactly `topic`, starting from now.
    pub fn subscribe(&self, topic: Topic) -> Subscription<T> {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        let rx = topics
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        Subscription { topic, rx }
    }

}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Receiving end of one topic. Dropping it unregisters the listener.
#[derive(Debug)]
pub struct Subscription<T> {
    topic: Topic,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next message. Returns `None` once the channel is gone.
    ///
    /// A subscriber that falls more than the channel capacity behind skips
    /// the overwritten messages.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "subscriber lagged; messages lost");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll. `None` when nothing is pending.
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "subscriber lagged; messages lost");
                }
                Err(_) => return None,
            }
        }
    }
}

/// The command and outcome channels with their fixed topics.
///
/// Cheap to clone; clones share the same channels.
#[derive(Debug, Clone)]
pub struct HostBridge {
    commands: Arc<Channel<OverlayCommand>>,
    outcomes: Arc<Channel<Outcome>>,
    command_topic: Topic,
    outcome_topic: Topic,
}

impl HostBridge {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            commands: Arc::new(Channel::new(config.capacity)),
            outcomes: Arc::new(Channel::new(config.capacity)),
            command_topic: Topic::new(&config.command_topic),
            outcome_topic: Topic::new(&config.outcome_topic),
        }
    }

    pub fn command_topic(&self) -> &Topic {
        &self.command_topic
    }

    pub fn outcome_topic(&self) -> &Topic {
        &self.outcome_topic
    }

    /// Fire-and-forget a command at the overlay service.
    pub fn send_command(&self, command: OverlayCommand) -> Delivery {
        let delivery = self.commands.publish(&self.command_topic, command);
        if delivery.is_dropped() {
            debug!("overlay service not running; command dropped");
        }
        delivery
    }

    pub fn subscribe_commands(&self) -> Subscription<OverlayCommand> {
        self.commands.subscribe(self.command_topic.clone())
    }

    pub fn publish_outcome(&self, outcome: Outcome) -> Delivery {
        let artifact_id = outcome.artifact_id.clone();
        let delivery = self.outcomes.publish(&self.outcome_topic, outcome);
        if delivery.is_dropped() {
            warn!(%artifact_id, "no expiry listener registered; selection lost");
        }
        delivery
    }

    pub fn subscribe_outcomes(&self) -> Subscription<Outcome> {
        self.outcomes.subscribe(self.outcome_topic.clone())
    }
}

impl Default for HostBridge {
    fn default() -> Self {
        Self::new(&BridgeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, minutes: i64) -> Outcome {
        Outcome {
            artifact_id: id.into(),
            minutes,
        }
    }

    #[test]
    fn publish_without_subscriber_is_dropped() {
        let bridge = HostBridge::default();
        assert_eq!(bridge.publish_outcome(outcome("a", 5)), Delivery::Dropped);
    }

    #[test]
    fn late_subscriber_never_sees_earlier_message() {
        let bridge = HostBridge::default();
        bridge.publish_outcome(outcome("early", 5));
        let mut sub = bridge.subscribe_outcomes();
        assert!(sub.try_recv().is_none());
        bridge.publish_outcome(outcome("late", 30));
        assert_eq!(sub.try_recv(), Some(outcome("late", 30)));
    }

    #[test]
    fn dropped_subscription_unregisters_listener() {
        let bridge = HostBridge::default();
        let sub = bridge.subscribe_outcomes();
        assert_eq!(bridge.publish_outcome(outcome("a", 5)), Delivery::Delivered(1));
        drop(sub);
        assert_eq!(bridge.publish_outcome(outcome("a", 5)), Delivery::Dropped);
    }

    #[test]
    fn topics_filter_by_exact_match() {
        let channel: Channel<u32> = Channel::new(4);
        let mut exact = channel.subscribe(Topic::new("tempshot.expiry"));
        let mut longer = channel.subscribe(Topic::new("tempshot.expiry.set"));

        assert_eq!(
            channel.publish(&Topic::new("tempshot.expiry.set"), 7),
            Delivery::Delivered(1)
        );
        assert!(exact.try_recv().is_none());
        assert_eq!(longer.try_recv(), Some(7));

        assert_eq!(channel.publish(&Topic::new("tempshot"), 8), Delivery::Dropped);
    }

    #[test]
    fn every_subscriber_of_a_topic_receives_once() {
        let bridge = HostBridge::default();
        let mut a = bridge.subscribe_outcomes();
        let mut b = bridge.subscribe_outcomes();
        assert_eq!(
            bridge.publish_outcome(outcome("x", 60)),
            Delivery::Delivered(2)
        );
        assert_eq!(a.try_recv(), Some(outcome("x", 60)));
        assert_eq!(b.try_recv(), Some(outcome("x", 60)));
        assert!(a.try_recv().is_none());
    }

    #[test]
    fn lagging_subscriber_skips_to_retained_messages() {
        let channel: Channel<u32> = Channel::new(2);
        let topic = Topic::new("t");
        let mut sub = channel.subscribe(topic.clone());
        for n in 0..5 {
            channel.publish(&topic, n);
        }
        assert_eq!(sub.try_recv(), Some(3));
        assert_eq!(sub.try_recv(), Some(4));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn command_reaches_async_subscriber() {
        let bridge = HostBridge::default();
        let mut sub = bridge.subscribe_commands();
        let sent = bridge.send_command(OverlayCommand::Show {
            artifact_id: "shot-1".into(),
        });
        assert_eq!(sent, Delivery::Delivered(1));
        assert_eq!(
            sub.recv().await,
            Some(OverlayCommand::Show {
                artifact_id: "shot-1".into()
            })
        );
    }
}
