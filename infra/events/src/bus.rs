use crate::catalog::{RELAY_MARKER, WellKnownEvent};
use crate::error::EventBusError;
use crate::native::{NativeChannel, NativeListener};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use strum::IntoEnumIterator;
use tokio::sync::broadcast;
use tracing::{debug, error, trace};

/// A safe default for the tap buffer.
/// 128 covers a burst of lifecycle events during boot.
const DEFAULT_CAPACITY: usize = 128;
const MIN_CAPACITY: usize = 1;
const DEFAULT_NAMESPACE: &str = "veneer";

/// Synchronous event handler. Receives the payload exactly as emitted.
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identifies one registration made through [`EventBus::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// An emitted event, as seen through [`EventBus::tap`].
#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent {
    pub name: String,
    pub payload: Value,
}

#[derive(Clone)]
struct Registration {
    id: HandlerId,
    handler: Handler,
}

/// The internal shared state of an [`EventBus`].
pub struct BusInner {
    namespace: String,
    relay_enabled: bool,
    handlers: RwLock<FxHashMap<String, Vec<Registration>>>,
    next_id: AtomicU64,
    tap: broadcast::Sender<Arc<BusEvent>>,
    native: RwLock<Option<Arc<dyn NativeChannel>>>,
    /// Set once native listeners exist; they cannot be removed again.
    bridged: AtomicBool,
}

impl fmt::Debug for BusInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusInner")
            .field("namespace", &self.namespace)
            .field("relay_enabled", &self.relay_enabled)
            .field("events", &self.handlers.read().len())
            .field("native", &self.native.read().is_some())
            .finish_non_exhaustive()
    }
}

impl BusInner {
    /// Runs every handler registered for `event`, each in isolation.
    fn dispatch(&self, event: &str, payload: &Value) -> usize {
        let registrations = self.handlers.read().get(event).cloned().unwrap_or_default();

        for registration in &registrations {
            let handler = &registration.handler;
            if catch_unwind(AssertUnwindSafe(|| handler(payload))).is_err() {
                error!(event, handler = registration.id.0, "Bus handler panicked");
            }
        }

        trace!(event, handlers = registrations.len(), "Event dispatched");
        registrations.len()
    }

    fn feed_tap(&self, event: &str, payload: &Value) {
        if self.tap.receiver_count() == 0 {
            return;
        }
        let _ = self.tap.send(Arc::new(BusEvent { name: event.to_owned(), payload: payload.clone() }));
    }

    fn relay(&self, event: &str, payload: &Value) {
        if !self.relay_enabled {
            return;
        }
        let Some(native) = self.native.read().clone() else {
            return;
        };

        let name = format!("{}:{event}", self.namespace);
        if let Err(err) = native.broadcast(&name, &mark_relayed(payload)) {
            debug!(event = %name, error = %err, "Native relay failed; ignoring");
        }
    }
}

/// Named publish/subscribe bus with synchronous, failure-isolated handlers.
///
/// `emit` runs the handlers for a name in registration order, copies the event to the
/// async [`tap`](EventBus::tap), then relays it to the attached native channel (see
/// [`bridge`](EventBus::bridge)). Handler panics are caught and logged; they never stop
/// the remaining handlers or the relay.
///
/// Handlers may call back into the bus (subscribe, unsubscribe, emit) from inside a
/// dispatch; the handler list is snapshotted before any handler runs.
///
/// # Examples
/// ```rust
/// use serde_json::json;
/// use std::sync::{Arc, Mutex};
/// use veneer_event_bus::EventBus;
///
/// let bus = EventBus::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = seen.clone();
/// let sub = bus.on("module:started", move |payload| {
///     sink.lock().unwrap().push(payload["name"].clone());
/// });
///
/// bus.emit("module:started", json!({ "name": "Widget" }));
/// assert!(sub.unsubscribe());
/// bus.emit("module:started", json!({ "name": "Other" }));
///
/// assert_eq!(*seen.lock().unwrap(), vec![json!("Widget")]);
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        EventBusBuilder::default().assemble(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus in the default namespace with the default tap capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "The bus is not created until you call .build()"]
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// Prefix used for native relay names.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Registers `handler` for `event`. Several handlers per name are allowed.
    pub fn on<F>(&self, event: impl AsRef<str>, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let event = event.as_ref();
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        self.inner
            .handlers
            .write()
            .entry(event.to_owned())
            .or_default()
            .push(Registration { id, handler: Arc::new(handler) });

        trace!(event, handler = id.0, "Handler registered");
        Subscription { event: event.to_owned(), id, bus: Arc::downgrade(&self.inner) }
    }

    /// Removes one handler. Returns `false` if it was not registered.
    pub fn off(&self, event: impl AsRef<str>, id: HandlerId) -> bool {
        remove_handler(&self.inner, event.as_ref(), id)
    }

    /// Emits `event` to internal handlers, the tap and the native relay.
    ///
    /// Returns the number of internal handlers invoked.
    pub fn emit(&self, event: impl AsRef<str>, payload: Value) -> usize {
        let event = event.as_ref();
        let invoked = self.inner.dispatch(event, &payload);
        self.inner.feed_tap(event, &payload);
        self.inner.relay(event, &payload);
        invoked
    }

    #[must_use]
    pub fn handler_count(&self, event: impl AsRef<str>) -> usize {
        self.inner.handlers.read().get(event.as_ref()).map_or(0, Vec::len)
    }

    /// Async view of every event emitted or bridged from now on.
    ///
    /// Use [`EventReceiverExt`](crate::EventReceiverExt) on the receiver to skip over lag.
    #[must_use]
    pub fn tap(&self) -> broadcast::Receiver<Arc<BusEvent>> {
        self.inner.tap.subscribe()
    }

    /// Connects a native channel in both directions.
    ///
    /// Outbound, every later `emit` is relayed as `<namespace>:<event>` with the relay
    /// marker set. Inbound, a listener is installed for each [`WellKnownEvent`]; native
    /// events that do not carry the marker are delivered to internal handlers (and the
    /// tap) without being relayed again.
    ///
    /// Returns the number of native listeners installed.
    ///
    /// # Errors
    /// Returns [`EventBusError::AlreadyBridged`] if a channel was bridged before, even one
    /// detached by [`shutdown`](Self::shutdown). Returns the channel's error if it refuses a
    /// listener; the relay target is then left unchanged.
    pub fn bridge(&self, channel: Arc<dyn NativeChannel>) -> Result<usize, EventBusError> {
        if self.inner.bridged.swap(true, Ordering::AcqRel) {
            return Err(EventBusError::AlreadyBridged {
                message: self.inner.namespace.clone().into(),
                context: Some("Native listeners are already installed".into()),
            });
        }

        let mut installed = 0;

        for event in WellKnownEvent::iter() {
            let name = format!("{}:{event}", self.inner.namespace);
            let bus = Arc::downgrade(&self.inner);
            let listener: NativeListener = Arc::new(move |payload: &Value| {
                if is_relayed(payload) {
                    return;
                }
                let Some(bus) = bus.upgrade() else {
                    return;
                };
                debug!(event = event.as_str(), "Native event bridged onto the bus");
                bus.dispatch(event.as_str(), payload);
                bus.feed_tap(event.as_str(), payload);
            });

            if let Err(err) = channel.listen(&name, listener) {
                self.inner.bridged.store(false, Ordering::Release);
                return Err(err);
            }
            installed += 1;
        }

        *self.inner.native.write() = Some(channel);
        debug!(namespace = %self.inner.namespace, listeners = installed, "Native channel bridged");
        Ok(installed)
    }

    /// Drops every handler and detaches the native channel.
    ///
    /// Returns the number of handlers removed.
    pub fn shutdown(&self) -> usize {
        let removed = {
            let mut handlers = self.inner.handlers.write();
            let count = handlers.values().map(Vec::len).sum();
            handlers.clear();
            count
        };
        self.inner.native.write().take();
        debug!(removed, "Event bus shut down");
        removed
    }
}

/// Builder for an [`EventBus`] with a custom namespace, relay or tap capacity.
#[derive(Debug, Clone)]
pub struct EventBusBuilder {
    namespace: String,
    relay: bool,
    tap_capacity: usize,
}

impl Default for EventBusBuilder {
    fn default() -> Self {
        Self { namespace: DEFAULT_NAMESPACE.to_owned(), relay: true, tap_capacity: DEFAULT_CAPACITY }
    }
}

impl EventBusBuilder {
    #[must_use = "Sets the prefix for native relay names"]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use = "Sets whether emitted events are relayed to the native channel"]
    pub const fn relay(mut self, enable: bool) -> Self {
        self.relay = enable;
        self
    }

    #[must_use = "Sets the buffer size of the async tap"]
    pub const fn tap_capacity(mut self, capacity: usize) -> Self {
        self.tap_capacity = capacity;
        self
    }

    /// # Errors
    /// Returns [`EventBusError::InvalidCapacity`] if the tap capacity is zero.
    pub fn build(self) -> Result<EventBus, EventBusError> {
        let capacity = validate_capacity(self.tap_capacity)?;
        Ok(self.assemble(capacity))
    }

    fn assemble(self, capacity: usize) -> EventBus {
        let (tap, _) = broadcast::channel(capacity);
        EventBus {
            inner: Arc::new(BusInner {
                namespace: self.namespace,
                relay_enabled: self.relay,
                handlers: RwLock::new(FxHashMap::default()),
                next_id: AtomicU64::new(1),
                tap,
                native: RwLock::new(None),
                bridged: AtomicBool::new(false),
            }),
        }
    }
}

/// Handle returned by [`EventBus::on`].
///
/// Dropping it keeps the handler registered; call [`unsubscribe`](Self::unsubscribe).
#[derive(Debug, Clone)]
pub struct Subscription {
    event: String,
    id: HandlerId,
    bus: Weak<BusInner>,
}

impl Subscription {
    #[must_use]
    pub const fn id(&self) -> HandlerId {
        self.id
    }

    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Removes the handler. Returns `false` if it was already gone or the bus was dropped.
    pub fn unsubscribe(&self) -> bool {
        self.bus.upgrade().is_some_and(|bus| remove_handler(&bus, &self.event, self.id))
    }
}

fn remove_handler(inner: &BusInner, event: &str, id: HandlerId) -> bool {
    let mut handlers = inner.handlers.write();
    let Some(registrations) = handlers.get_mut(event) else {
        return false;
    };
    let before = registrations.len();
    registrations.retain(|r| r.id != id);
    let removed = registrations.len() != before;
    if registrations.is_empty() {
        handlers.remove(event);
    }
    drop(handlers);

    if removed {
        trace!(event, handler = id.0, "Handler removed");
    }
    removed
}

/// Tags a payload for the native relay. Non-object payloads are wrapped under `value`.
fn mark_relayed(payload: &Value) -> Value {
    let mut marked = match payload {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_owned(), other.clone());
            map
        },
    };
    marked.insert(RELAY_MARKER.to_owned(), Value::Bool(true));
    Value::Object(marked)
}

fn is_relayed(payload: &Value) -> bool {
    match payload.get(RELAY_MARKER) {
        None | Some(Value::Null | Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn validate_capacity(capacity: usize) -> Result<usize, EventBusError> {
    if capacity < MIN_CAPACITY {
        return Err(EventBusError::InvalidCapacity {
            message: format!("capacity must be >= {MIN_CAPACITY}").into(),
            context: None,
        });
    }
    Ok(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_gain_the_marker() {
        let marked = mark_relayed(&json!({ "key": "a" }));
        assert_eq!(marked, json!({ "key": "a", "__fromBus": true }));
        assert!(is_relayed(&marked));
    }

    #[test]
    fn primitives_and_arrays_are_wrapped() {
        assert_eq!(mark_relayed(&json!(3)), json!({ "value": 3, "__fromBus": true }));
        assert_eq!(mark_relayed(&Value::Null), json!({ "value": null, "__fromBus": true }));
        assert_eq!(mark_relayed(&json!([1])), json!({ "value": [1], "__fromBus": true }));
    }

    #[test]
    fn falsy_markers_are_not_relayed() {
        assert!(!is_relayed(&json!({ "__fromBus": false })));
        assert!(!is_relayed(&json!({ "__fromBus": 0 })));
        assert!(!is_relayed(&json!("__fromBus")));
        assert!(is_relayed(&json!({ "__fromBus": "yes" })));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            EventBus::builder().tap_capacity(0).build(),
            Err(EventBusError::InvalidCapacity { .. })
        ));
    }
}
