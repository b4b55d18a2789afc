// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topic registry and subscriptions.

use std::sync::Arc;

use dashmap::DashMap;
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::dedup::EventDeduper;
use crate::events::BusEvent;
use crate::topic::Topic;

/// What a subscriber gets from [`Subscription::recv`].
#[derive(Debug, Clone)]
pub enum Delivery {
    /// The next event, in publish order for its topic.
    Event(Arc<BusEvent>),
    /// The subscriber fell behind on `topic` and `missed` events were dropped.
    /// Current state must be re-read from the request store.
    Resync { topic: Topic, missed: u64 },
}

/// In-process event bus keyed by topic.
///
/// Channels are created on first subscription and dropped by the first publish
/// that finds no live receivers, so idle topics cost nothing.
pub struct EventBus {
    topics: DashMap<String, broadcast::Sender<Arc<BusEvent>>>,
    capacity: usize,
}

impl EventBus {
    /// `capacity` is the number of events buffered per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Publish to one topic. Returns how many subscribers were reached.
    pub fn publish(&self, topic: &Topic, event: BusEvent) -> usize {
        self.send(&topic.to_string(), Arc::new(event))
    }

    /// Publish the same event (same id) to several topics, in order.
    pub fn publish_all(&self, topics: &[Topic], event: BusEvent) -> usize {
        let event = Arc::new(event);
        topics
            .iter()
            .map(|topic| self.send(&topic.to_string(), Arc::clone(&event)))
            .sum()
    }

    fn send(&self, key: &str, event: Arc<BusEvent>) -> usize {
        let sender = match self.topics.get(key) {
            Some(sender) => sender.clone(),
            None => return 0,
        };
        match sender.send(event) {
            Ok(reached) => reached,
            Err(_) => {
                // Re-checked under the shard lock so a concurrent subscribe wins.
                self.topics.remove_if(key, |_, s| s.receiver_count() == 0);
                debug!(topic = key, "pruned topic without subscribers");
                0
            }
        }
    }

    /// Subscribe to a single topic.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        self.subscribe_many(vec![topic])
    }

    /// Subscribe to several topics through one handle. Events fanned out to
    /// more than one of them are delivered once.
    pub fn subscribe_many(&self, topics: Vec<Topic>) -> Subscription {
        let receivers = topics
            .into_iter()
            .map(|topic| {
                let rx = self
                    .topics
                    .entry(topic.to_string())
                    .or_insert_with(|| broadcast::channel(self.capacity).0)
                    .subscribe();
                (topic, rx)
            })
            .collect();
        Subscription {
            receivers,
            dedup: EventDeduper::new(self.capacity * 4),
        }
    }

    /// Live subscriber count of a topic.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics
            .get(&topic.to_string())
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Number of topics with a channel allocated.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

/// A cancellable event stream. Dropping it unsubscribes.
pub struct Subscription {
    receivers: Vec<(Topic, broadcast::Receiver<Arc<BusEvent>>)>,
    dedup: EventDeduper,
}

impl Subscription {
    /// Wait for the next delivery. `None` once every topic has closed.
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            if self.receivers.is_empty() {
                return None;
            }
            let (result, index) = {
                let pending = self
                    .receivers
                    .iter_mut()
                    .map(|(_, rx)| Box::pin(rx.recv()));
                let (result, index, _rest) = futures::future::select_all(pending).await;
                (result, index)
            };
            match result {
                Ok(event) => {
                    if self.dedup.observe(event.event_id) {
                        return Some(Delivery::Event(event));
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    let topic = self.receivers[index].0.clone();
                    warn!(topic = %topic, missed, "subscriber lagged; resync required");
                    return Some(Delivery::Resync { topic, missed });
                }
                Err(RecvError::Closed) => {
                    self.receivers.swap_remove(index);
                }
            }
        }
    }

    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.receivers.iter().map(|(topic, _)| topic)
    }

    pub fn into_stream(self) -> impl Stream<Item = Delivery> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|delivery| (delivery, sub))
        })
    }
}
