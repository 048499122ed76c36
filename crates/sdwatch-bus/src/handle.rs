// ── Manager handle contract ──
//
// The seam between the reconciliation engine and the bus. The zbus
// implementation lives in `systemd`; tests provide in-memory doubles.

use std::future::Future;

use crate::error::Error;
use crate::listeners::ListenerToken;
use crate::types::{ManagerCall, MethodReply, PropertiesChanged, PropertyValue, SignalEvent};

/// Callback for property-change notifications.
pub type PropertiesHandler = Box<dyn Fn(&PropertiesChanged) + Send + Sync>;

/// Callback for signal notifications.
pub type SignalHandler = Box<dyn Fn(&SignalEvent) + Send + Sync>;

/// A handle to one remote manager object.
///
/// Listener invocations happen on the handle's own dispatch context, after
/// the registering call has returned, and never overlap each other.
pub trait ManagerBus: Send + Sync + 'static {
    /// Last known value of `name`, without a round trip. `None` if the
    /// property was never populated.
    fn cached_property(&self, name: &str) -> Option<PropertyValue>;

    /// Overwrite the local cache entry for `name`.
    fn set_cached_property(&self, name: &str, value: PropertyValue);

    /// Fetch the current server-side value of `name`, ignoring the cache.
    fn remote_property(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<PropertyValue, Error>> + Send;

    /// Invoke a manager method.
    fn call_method(
        &self,
        call: ManagerCall,
    ) -> impl Future<Output = Result<MethodReply, Error>> + Send;

    /// Register a property-change listener.
    fn on_properties_changed(&self, handler: PropertiesHandler) -> ListenerToken;

    /// Register a signal listener.
    fn on_signal(&self, handler: SignalHandler) -> ListenerToken;

    /// Deregister a listener. Returns `false` for unknown tokens.
    fn remove_listener(&self, token: ListenerToken) -> bool;

    /// Resolves once the handle can no longer deliver notifications, e.g.
    /// because the bus connection went away. Never resolves otherwise.
    fn disconnected(&self) -> impl Future<Output = ()> + Send;
}

/// Acquires [`ManagerBus`] handles.
///
/// The engine asks for a fresh handle on every start, and drops it on stop.
pub trait ManagerConnector: Send + Sync + 'static {
    type Bus: ManagerBus;

    fn connect(&self) -> impl Future<Output = Result<Self::Bus, Error>> + Send;
}
