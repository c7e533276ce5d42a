//! Synchronous in-process event bus.
//!
//! Subscribers are plain closures keyed by [`Topic`]. Delivery is
//! synchronous and in subscription order; a one-shot subscriber is removed
//! before its handler runs, so it can never see a second event.

use core::fmt;
use core::str::FromStr;

use racing_wheel_hid_g29_protocol::{ChangeSet, Field, FieldValue, WheelInputState};

use crate::error::SessionError;

/// What a subscriber listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// One leaf, named `"<group>-<field>"` (e.g. `"wheel-turn"`).
    Field(Field),
    /// The frame's change set; only published when non-empty.
    Changes,
    /// The complete state tree, every frame.
    All,
    /// The raw frame bytes, every frame.
    Data,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Field(field) => write!(f, "{field}"),
            Topic::Changes => f.write_str("changes"),
            Topic::All => f.write_str("all"),
            Topic::Data => f.write_str("data"),
        }
    }
}

impl FromStr for Topic {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "changes" => Ok(Topic::Changes),
            "all" => Ok(Topic::All),
            "data" => Ok(Topic::Data),
            _ => s
                .split_once('-')
                .and_then(|(group, name)| Field::lookup(group, name))
                .map(Topic::Field)
                .ok_or_else(|| SessionError::UnknownTopic(s.to_string())),
        }
    }
}

impl From<Field> for Topic {
    fn from(field: Field) -> Self {
        Topic::Field(field)
    }
}

/// Payload handed to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event<'a> {
    Field { field: Field, value: FieldValue },
    Changes(&'a ChangeSet),
    All(&'a WheelInputState),
    Data(&'a [u8]),
}

impl Event<'_> {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Field { field, .. } => Topic::Field(*field),
            Event::Changes(_) => Topic::Changes,
            Event::All(_) => Topic::All,
            Event::Data(_) => Topic::Data,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub type Handler = Box<dyn FnMut(&Event<'_>) + Send>;

struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    once: bool,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event<'_>) + Send + 'static,
    {
        self.insert(topic, false, Box::new(handler))
    }

    /// Subscribe for the next event on `topic` only.
    pub fn subscribe_once<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event<'_>) + Send + 'static,
    {
        self.insert(topic, true, Box::new(handler))
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscriptions.iter().filter(|s| s.topic == topic).count()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Deliver `event` to every subscriber of its topic.
    pub fn publish(&mut self, event: &Event<'_>) {
        let topic = event.topic();
        let mut fired = Vec::new();
        let mut i = 0;
        while i < self.subscriptions.len() {
            if self.subscriptions[i].once && self.subscriptions[i].topic == topic {
                fired.push(self.subscriptions.remove(i));
            } else {
                i += 1;
            }
        }

        if fired.is_empty() {
            for sub in self.subscriptions.iter_mut().filter(|s| s.topic == topic) {
                (sub.handler)(event);
            }
            return;
        }

        // Interleave persistent and one-shot handlers in subscription order.
        let mut once = fired.into_iter().peekable();
        for sub in self.subscriptions.iter_mut().filter(|s| s.topic == topic) {
            while let Some(mut early) = once.next_if(|o| o.id < sub.id) {
                (early.handler)(event);
            }
            (sub.handler)(event);
        }
        for mut rest in once {
            (rest.handler)(event);
        }
    }

    /// Publish everything for one processed frame: per-field events in tree
    /// order, then `changes` (if any), `all`, and `data`.
    pub fn publish_frame(&mut self, changes: &ChangeSet, state: &WheelInputState, frame: &[u8]) {
        if self.is_empty() {
            return;
        }
        for (field, value) in changes.iter() {
            self.publish(&Event::Field { field, value });
        }
        if !changes.is_empty() {
            self.publish(&Event::Changes(changes));
        }
        self.publish(&Event::All(state));
        self.publish(&Event::Data(frame));
    }

    fn insert(&mut self, topic: Topic, once: bool, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            topic,
            once,
            handler,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use racing_wheel_hid_g29_protocol::diff;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, tag: &'static str) -> impl FnMut(&Event<'_>) + Send + 'static {
        let log = Arc::clone(log);
        move |event| log.lock().push(format!("{tag}:{}", event.topic()))
    }

    #[test]
    fn test_topic_names() -> Result<(), SessionError> {
        assert_eq!("wheel-turn".parse::<Topic>()?, Topic::Field(Field::WheelTurn));
        assert_eq!(
            "wheel-button_playstation".parse::<Topic>()?,
            Topic::Field(Field::WheelButtonPlaystation)
        );
        assert_eq!("changes".parse::<Topic>()?, Topic::Changes);
        assert_eq!(Topic::Field(Field::PedalsGas).to_string(), "pedals-gas");
        assert_eq!(Topic::Data.to_string(), "data");
        assert!(matches!(
            "wheel-rpm".parse::<Topic>(),
            Err(SessionError::UnknownTopic(name)) if name == "wheel-rpm"
        ));
        assert!("wheel".parse::<Topic>().is_err());
        Ok(())
    }

    #[test]
    fn test_once_fires_once() {
        let log: Log = Arc::default();
        let mut bus = EventBus::new();
        bus.subscribe_once(Topic::Data, recorder(&log, "once"));
        assert_eq!(bus.subscriber_count(Topic::Data), 1);

        bus.publish(&Event::Data(&[1]));
        bus.publish(&Event::Data(&[2]));
        assert_eq!(*log.lock(), vec!["once:data"]);
        assert_eq!(bus.subscriber_count(Topic::Data), 0);
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let log: Log = Arc::default();
        let mut bus = EventBus::new();
        bus.subscribe(Topic::All, recorder(&log, "a"));
        bus.subscribe_once(Topic::All, recorder(&log, "b"));
        bus.subscribe(Topic::All, recorder(&log, "c"));
        bus.subscribe_once(Topic::All, recorder(&log, "d"));

        let state = WheelInputState::default();
        bus.publish(&Event::All(&state));
        bus.publish(&Event::All(&state));
        assert_eq!(
            *log.lock(),
            vec!["a:all", "b:all", "c:all", "d:all", "a:all", "c:all"]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let log: Log = Arc::default();
        let mut bus = EventBus::new();
        let id = bus.subscribe(Topic::Data, recorder(&log, "x"));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&Event::Data(&[]));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_publish_frame_order() {
        let log: Log = Arc::default();
        let mut bus = EventBus::new();
        for topic in [
            Topic::Data,
            Topic::All,
            Topic::Changes,
            Topic::Field(Field::PedalsBrake),
            Topic::Field(Field::WheelTurn),
            Topic::Field(Field::ShifterGear),
        ] {
            bus.subscribe(topic, recorder(&log, "s"));
        }

        let previous = WheelInputState::default();
        let mut next = previous;
        next.pedals.brake = 0.5;
        next.wheel.turn = -0.25;
        bus.publish_frame(&diff(&previous, &next), &next, &[0; 12]);

        assert_eq!(
            *log.lock(),
            vec![
                "s:wheel-turn",
                "s:pedals-brake",
                "s:changes",
                "s:all",
                "s:data"
            ]
        );
    }

    #[test]
    fn test_empty_change_set_skips_changes_topic() {
        let log: Log = Arc::default();
        let mut bus = EventBus::new();
        bus.subscribe(Topic::Changes, recorder(&log, "s"));
        bus.subscribe(Topic::Data, recorder(&log, "s"));

        let state = WheelInputState::default();
        bus.publish_frame(&diff(&state, &state), &state, &[0; 12]);
        assert_eq!(*log.lock(), vec!["s:data"]);
    }

    #[test]
    fn test_field_event_payload() {
        let seen = Arc::new(Mutex::new(None));
        let mut bus = EventBus::new();
        let sink = Arc::clone(&seen);
        bus.subscribe(Topic::Field(Field::ShifterGear), move |event| {
            if let Event::Field { value, .. } = event {
                *sink.lock() = Some(*value);
            }
        });

        let previous = WheelInputState::default();
        let mut next = previous;
        next.shifter.gear = 4;
        bus.publish_frame(&diff(&previous, &next), &next, &[]);
        assert_eq!(*seen.lock(), Some(FieldValue::Gear(4)));
    }
}
