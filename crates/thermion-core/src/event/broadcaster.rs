// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::error::HandlerError;
use crate::input::InputBudget;
use crate::quality::{QualitySettings, QualityTier};
use crate::thermal::{InputThermalState, ThermalState};
use std::panic::{self, AssertUnwindSafe};

/// A change from one value to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<T> {
    /// The value before the change.
    pub from: T,
    /// The value after the change.
    pub to: T,
}

impl<T: PartialEq> Transition<T> {
    /// Returns a transition if `from` and `to` differ.
    pub fn between(from: T, to: T) -> Option<Self> {
        (from != to).then_some(Self { from, to })
    }
}

/// A state change announced by the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// The four-level thermal state changed.
    ThermalStateChanged(Transition<ThermalState>),
    /// A different quality tier was applied.
    QualityTierChanged {
        /// The tier change.
        transition: Transition<QualityTier>,
        /// Settings of the newly applied tier.
        settings: QualitySettings,
    },
    /// The five-level input throttle state changed.
    InputThermalStateChanged {
        /// The state change.
        transition: Transition<InputThermalState>,
        /// The budget now in force.
        budget: InputBudget,
    },
}

impl ControlEvent {
    /// Returns the kind used to route this event to subscribers.
    pub fn kind(&self) -> ControlEventKind {
        match self {
            ControlEvent::ThermalStateChanged(_) => ControlEventKind::ThermalStateChanged,
            ControlEvent::QualityTierChanged { .. } => ControlEventKind::QualityTierChanged,
            ControlEvent::InputThermalStateChanged { .. } => {
                ControlEventKind::InputThermalStateChanged
            }
        }
    }
}

/// Routing key for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlEventKind {
    /// See [`ControlEvent::ThermalStateChanged`].
    ThermalStateChanged,
    /// See [`ControlEvent::QualityTierChanged`].
    QualityTierChanged,
    /// See [`ControlEvent::InputThermalStateChanged`].
    InputThermalStateChanged,
}

/// Opaque handle returned by [`EventBroadcaster::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A subscriber callback.
pub type Handler = Box<dyn FnMut(&ControlEvent) -> Result<(), HandlerError> + Send>;

struct Subscription {
    id: SubscriptionId,
    kind: ControlEventKind,
    handler: Handler,
}

/// Synchronous, ordered fan-out of [`ControlEvent`]s.
///
/// Handlers run in subscription order on the publishing thread. A handler
/// that returns an error or panics is logged and skipped; delivery to the
/// remaining handlers always continues.
pub struct EventBroadcaster {
    subscriptions: Vec<Subscription>,
    next_id: u64,
    failures: u64,
}

impl EventBroadcaster {
    /// Creates a broadcaster with no subscribers.
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            next_id: 0,
            failures: 0,
        }
    }

    /// Registers `handler` for events of `kind`.
    pub fn subscribe<F>(&mut self, kind: ControlEventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&ControlEvent) -> Result<(), HandlerError> + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            kind,
            handler: Box::new(handler),
        });
        log::debug!("EventBroadcaster: {:?} subscribed to {:?}", id, kind);
        id
    }

    /// Registers a channel-backed subscriber and returns its receiving end.
    ///
    /// Useful for consumers living on another thread. The subscription is
    /// dropped automatically once the receiver is dropped.
    pub fn channel(
        &mut self,
        kind: ControlEventKind,
    ) -> (SubscriptionId, flume::Receiver<ControlEvent>) {
        let (sender, receiver) = flume::unbounded();
        let id = self.subscribe(kind, move |event| {
            sender
                .send(event.clone())
                .map_err(|_| HandlerError::Disconnected)
        });
        (id, receiver)
    }

    /// Removes a subscription. Returns `false` if the handle was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        let removed = self.subscriptions.len() != before;
        if removed {
            log::debug!("EventBroadcaster: {:?} unsubscribed", id);
        }
        removed
    }

    /// Delivers `event` to every subscriber of its kind.
    ///
    /// Returns the number of handlers that completed successfully.
    pub fn publish(&mut self, event: ControlEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        let mut disconnected = Vec::new();

        for subscription in self.subscriptions.iter_mut().filter(|s| s.kind == kind) {
            let handler = &mut subscription.handler;
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(HandlerError::Disconnected)) => disconnected.push(subscription.id),
                Ok(Err(e)) => {
                    self.failures += 1;
                    log::warn!(
                        "EventBroadcaster: {:?} failed on {:?}: {}",
                        subscription.id,
                        kind,
                        e
                    );
                }
                Err(_) => {
                    self.failures += 1;
                    log::error!(
                        "EventBroadcaster: {:?} panicked on {:?}; continuing delivery.",
                        subscription.id,
                        kind
                    );
                }
            }
        }

        for id in disconnected {
            self.unsubscribe(id);
        }

        log::trace!("EventBroadcaster: {:?} delivered to {} handlers", kind, delivered);
        delivered
    }

    /// Number of live subscriptions for `kind`.
    pub fn subscriber_count(&self, kind: ControlEventKind) -> usize {
        self.subscriptions.iter().filter(|s| s.kind == kind).count()
    }

    /// Total number of handler failures (errors and panics) observed so far.
    pub fn failure_count(&self) -> u64 {
        self.failures
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("subscriptions", &self.subscriptions.len())
            .field("failures", &self.failures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn thermal_event(from: ThermalState, to: ThermalState) -> ControlEvent {
        ControlEvent::ThermalStateChanged(Transition { from, to })
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Handler {
        let log = Arc::clone(log);
        Box::new(move |_| {
            log.lock().unwrap().push(name);
            Ok(())
        })
    }

    #[test]
    fn test_transition_between() {
        assert_eq!(Transition::between(1, 1), None);
        assert_eq!(Transition::between(1, 2), Some(Transition { from: 1, to: 2 }));
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let mut bus = EventBroadcaster::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(ControlEventKind::ThermalStateChanged, recorder(&log, "a"));
        bus.subscribe(ControlEventKind::ThermalStateChanged, recorder(&log, "b"));
        bus.subscribe(ControlEventKind::ThermalStateChanged, recorder(&log, "c"));

        let delivered = bus.publish(thermal_event(ThermalState::Optimal, ThermalState::Hot));
        assert_eq!(delivered, 3);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_routing_by_kind() {
        let mut bus = EventBroadcaster::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(ControlEventKind::QualityTierChanged, recorder(&log, "tier"));
        bus.subscribe(ControlEventKind::ThermalStateChanged, recorder(&log, "thermal"));

        bus.publish(thermal_event(ThermalState::Optimal, ThermalState::Warm));
        assert_eq!(*log.lock().unwrap(), vec!["thermal"]);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBroadcaster::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = bus.subscribe(ControlEventKind::ThermalStateChanged, recorder(&log, "a"));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        assert_eq!(
            bus.publish(thermal_event(ThermalState::Optimal, ThermalState::Warm)),
            0
        );
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failing_handler_does_not_block_others() {
        let mut bus = EventBroadcaster::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(ControlEventKind::ThermalStateChanged, |_| {
            Err(HandlerError::Failed("boom".into()))
        });
        bus.subscribe(ControlEventKind::ThermalStateChanged, |_| -> Result<(), HandlerError> {
            panic!("handler panic")
        });
        bus.subscribe(ControlEventKind::ThermalStateChanged, recorder(&log, "survivor"));

        let delivered = bus.publish(thermal_event(ThermalState::Warm, ThermalState::Hot));
        assert_eq!(delivered, 1);
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
        assert_eq!(bus.failure_count(), 2);
        // Failing handlers stay subscribed.
        assert_eq!(bus.subscriber_count(ControlEventKind::ThermalStateChanged), 3);
    }

    #[test]
    fn test_channel_subscriber() {
        let mut bus = EventBroadcaster::new();
        let (_, rx) = bus.channel(ControlEventKind::ThermalStateChanged);
        let event = thermal_event(ThermalState::Hot, ThermalState::Critical);
        bus.publish(event.clone());
        assert_eq!(rx.try_recv(), Ok(event));
    }

    #[test]
    fn test_dropped_channel_is_pruned() {
        let mut bus = EventBroadcaster::new();
        let (_, rx) = bus.channel(ControlEventKind::ThermalStateChanged);
        drop(rx);
        bus.publish(thermal_event(ThermalState::Hot, ThermalState::Critical));
        assert_eq!(bus.subscriber_count(ControlEventKind::ThermalStateChanged), 0);
        assert_eq!(bus.failure_count(), 0);
    }
}
