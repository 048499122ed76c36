// ── Notification listener registry ──
//
// Token-keyed handler storage shared by the zbus handle and by test
// doubles. Dispatch clones the handler list out of the map before
// invoking anything, so a handler may deregister itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Which notification category a listener was registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    PropertiesChanged,
    Signal,
}

/// Deregistration token returned by listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken {
    kind: ListenerKind,
    id: u64,
}

impl ListenerToken {
    pub fn kind(&self) -> ListenerKind {
        self.kind
    }
}

type Handler<E> = dyn Fn(&E) + Send + Sync;

/// The set of live listeners for one notification category.
pub struct ListenerSet<E> {
    kind: ListenerKind,
    next_id: AtomicU64,
    handlers: DashMap<u64, Arc<Handler<E>>>,
}

impl<E> ListenerSet<E> {
    pub fn new(kind: ListenerKind) -> Self {
        Self {
            kind,
            next_id: AtomicU64::new(1),
            handlers: DashMap::new(),
        }
    }

    /// Add a handler. The returned token removes it again.
    pub fn register(&self, handler: Box<Handler<E>>) -> ListenerToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.insert(id, Arc::from(handler));
        ListenerToken {
            kind: self.kind,
            id,
        }
    }

    /// Remove the handler behind `token`. Returns `false` if the token
    /// belongs to another set or was already removed.
    pub fn remove(&self, token: ListenerToken) -> bool {
        token.kind == self.kind && self.handlers.remove(&token.id).is_some()
    }

    /// Invoke every registered handler with `event`, returning how many ran.
    pub fn dispatch(&self, event: &E) -> usize {
        let mut handlers: Vec<(u64, Arc<Handler<E>>)> = self
            .handlers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        // registration order
        handlers.sort_unstable_by_key(|(id, _)| *id);

        for (_, handler) in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn dispatch_reaches_handlers_in_registration_order() {
        let set: ListenerSet<u32> = ListenerSet::new(ListenerKind::Signal);
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            set.register(Box::new(move |n: &u32| {
                seen.lock().unwrap().push(format!("{tag}:{n}"));
            }));
        }

        assert_eq!(set.dispatch(&7), 2);
        assert_eq!(*seen.lock().unwrap(), vec!["first:7", "second:7"]);
    }

    #[test]
    fn removed_handler_is_not_invoked() {
        let set: ListenerSet<u32> = ListenerSet::new(ListenerKind::PropertiesChanged);
        let token = set.register(Box::new(|_: &u32| panic!("should be deregistered")));

        assert!(set.remove(token));
        assert!(!set.remove(token));
        assert!(set.is_empty());
        assert_eq!(set.dispatch(&1), 0);
    }

    #[test]
    fn token_from_other_set_is_rejected() {
        let props: ListenerSet<u32> = ListenerSet::new(ListenerKind::PropertiesChanged);
        let signals: ListenerSet<u32> = ListenerSet::new(ListenerKind::Signal);
        let token = signals.register(Box::new(|_: &u32| {}));

        assert!(!props.remove(token));
        assert_eq!(signals.len(), 1);
        assert_eq!(token.kind(), ListenerKind::Signal);
    }
}
