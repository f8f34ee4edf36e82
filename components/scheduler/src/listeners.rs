//! Registry of event listeners (keyboard, mouse, animation frames).

/// Handle of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u32);

#[derive(Debug)]
struct Listener<T> {
    id: ListenerId,
    event: String,
    payload: T,
}

/// Listeners keyed by event name.
///
/// # Examples
///
/// ```
/// use scheduler::ListenerRegistry;
///
/// let mut listeners = ListenerRegistry::new();
/// let id = listeners.register("keyDown", "onKey");
/// assert_eq!(listeners.matching("keyDown"), vec!["onKey"]);
/// assert!(listeners.matching("mouseUp").is_empty());
/// assert!(listeners.remove(id));
/// assert!(listeners.is_empty());
/// ```
#[derive(Debug)]
pub struct ListenerRegistry<T> {
    listeners: Vec<Listener<T>>,
    next_id: u32,
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListenerRegistry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Registers `payload` for `event`.
    pub fn register(&mut self, event: impl Into<String>, payload: T) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        let event = event.into();
        tracing::debug!(listener = id.0, event = %event, "listener registered");
        self.listeners.push(Listener { id, event, payload });
        id
    }

    /// Removes a listener; returns whether it existed.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        before != self.listeners.len()
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Detaches every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl<T: Clone> ListenerRegistry<T> {
    /// Payloads of the listeners for `event`, in registration order.
    pub fn matching(&self, event: &str) -> Vec<T> {
        self.listeners
            .iter()
            .filter(|l| l.event == event)
            .map(|l| l.payload.clone())
            .collect()
    }
}
