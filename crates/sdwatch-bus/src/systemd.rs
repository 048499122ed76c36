//! `zbus`-backed manager handle.
//!
//! [`SystemdManager`] binds one proxy to the manager object and one
//! `org.freedesktop.DBus.Properties` proxy for uncached reads. A background
//! dispatch task reads `PropertiesChanged` and every manager signal from
//! the bus and fans them out to registered listeners, strictly one at a
//! time. Dropping the handle stops the task.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use sdwatch_bus::{open_connection, BusKind, BusTarget, ManagerConnector, SystemdConnector};
//!
//! let connection = open_connection(BusKind::System, None).await?;
//! let connector = SystemdConnector::new(connection, BusTarget::default(), Duration::from_secs(25));
//! let manager = connector.connect().await?;
//! ```

use std::future::{Future, ready};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::{Stream, StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use zbus::fdo::{PropertiesChanged as FdoPropertiesChanged, PropertiesProxy};
use zbus::names::InterfaceName;
use zbus::zvariant::Structure;
use zbus::{Connection, Message, Proxy};

use crate::error::Error;
use crate::handle::{ManagerBus, ManagerConnector, PropertiesHandler, SignalHandler};
use crate::listeners::{ListenerKind, ListenerSet, ListenerToken};
use crate::names::MANAGER_INTERFACE;
use crate::target::{BusKind, BusTarget};
use crate::types::{
    ManagerCall, MethodReply, PropertiesChanged, PropertyValue, RawUnit, SignalEvent, UnitRecord,
};

// ── Connection ───────────────────────────────────────────────────────

/// Open a bus connection: an explicit `address` wins over `kind`.
pub async fn open_connection(kind: BusKind, address: Option<&str>) -> Result<Connection, Error> {
    let result = match address {
        Some(address) => connect_address(address).await,
        None => match kind {
            BusKind::System => Connection::system().await,
            BusKind::Session => Connection::session().await,
        },
    };

    result.map_err(|e| Error::Connect {
        bus: address.map_or_else(|| kind.to_string(), str::to_owned),
        reason: e.to_string(),
    })
}

async fn connect_address(address: &str) -> zbus::Result<Connection> {
    zbus::connection::Builder::address(address)?.build().await
}

// ── SystemdManager ───────────────────────────────────────────────────

/// Live handle to the systemd manager object.
pub struct SystemdManager {
    proxy: Proxy<'static>,
    properties: PropertiesProxy<'static>,
    call_timeout: Duration,
    cache: DashMap<String, PropertyValue>,
    property_listeners: Arc<ListenerSet<PropertiesChanged>>,
    signal_listeners: Arc<ListenerSet<SignalEvent>>,
    cancel: CancellationToken,
    /// Cancelled by the dispatch task when a notification stream ends.
    lost: CancellationToken,
}

impl SystemdManager {
    /// Bind to `target` on `connection` and start the dispatch task.
    ///
    /// Signal match rules are installed before this returns, so nothing the
    /// manager emits afterwards is missed.
    pub async fn connect(
        connection: &Connection,
        target: &BusTarget,
        call_timeout: Duration,
    ) -> Result<Self, Error> {
        with_deadline(call_timeout, "connect", async {
            let proxy = Proxy::new(
                connection,
                target.destination.clone(),
                target.path.clone(),
                MANAGER_INTERFACE,
            )
            .await?;

            let properties = PropertiesProxy::builder(connection)
                .destination(target.destination.clone())?
                .path(target.path.clone())?
                .build()
                .await?;

            let changes = properties.receive_properties_changed().await?;
            let signals = proxy.receive_all_signals().await?;

            let property_listeners =
                Arc::new(ListenerSet::new(ListenerKind::PropertiesChanged));
            let signal_listeners = Arc::new(ListenerSet::new(ListenerKind::Signal));
            let cancel = CancellationToken::new();
            let lost = CancellationToken::new();

            tokio::spawn(dispatch_loop(
                merge_inbound(
                    changes.filter_map(|change| ready(decode_properties_changed(&change))),
                    signals.filter_map(|message| ready(decode_signal(&message))),
                ),
                Arc::clone(&property_listeners),
                Arc::clone(&signal_listeners),
                cancel.clone(),
                lost.clone(),
            ));

            debug!(
                destination = %target.destination,
                path = %target.path,
                "bound to manager object"
            );

            Ok::<_, Error>(Self {
                proxy,
                properties,
                call_timeout,
                cache: DashMap::new(),
                property_listeners,
                signal_listeners,
                cancel,
                lost,
            })
        })
        .await
    }
}

impl Drop for SystemdManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl ManagerBus for SystemdManager {
    fn cached_property(&self, name: &str) -> Option<PropertyValue> {
        self.cache.get(name).map(|entry| entry.value().clone())
    }

    fn set_cached_property(&self, name: &str, value: PropertyValue) {
        self.cache.insert(name.to_owned(), value);
    }

    async fn remote_property(&self, name: &str) -> Result<PropertyValue, Error> {
        let interface = InterfaceName::from_static_str_unchecked(MANAGER_INTERFACE);
        let value = with_deadline(self.call_timeout, name, async {
            Ok::<_, Error>(self.properties.get(interface, name).await?)
        })
        .await?;

        Ok(PropertyValue::from(&*value))
    }

    async fn call_method(&self, call: ManagerCall) -> Result<MethodReply, Error> {
        let method = call.method_name();
        with_deadline(self.call_timeout, method, async {
            match call {
                ManagerCall::Subscribe | ManagerCall::Unsubscribe => {
                    self.proxy.call_method(method, &()).await?;
                    Ok::<_, Error>(MethodReply::Empty)
                }
                ManagerCall::ListUnitsFiltered { states } => {
                    let units: Vec<RawUnit> = self.proxy.call(method, &(states,)).await?;
                    Ok(MethodReply::Units(
                        units.into_iter().map(UnitRecord::from).collect(),
                    ))
                }
            }
        })
        .await
    }

    fn on_properties_changed(&self, handler: PropertiesHandler) -> ListenerToken {
        self.property_listeners.register(handler)
    }

    fn on_signal(&self, handler: SignalHandler) -> ListenerToken {
        self.signal_listeners.register(handler)
    }

    fn remove_listener(&self, token: ListenerToken) -> bool {
        match token.kind() {
            ListenerKind::PropertiesChanged => self.property_listeners.remove(token),
            ListenerKind::Signal => self.signal_listeners.remove(token),
        }
    }

    async fn disconnected(&self) {
        self.lost.cancelled().await;
    }
}

// ── SystemdConnector ─────────────────────────────────────────────────

/// Builds [`SystemdManager`] handles on an injected connection.
#[derive(Debug, Clone)]
pub struct SystemdConnector {
    connection: Connection,
    target: BusTarget,
    call_timeout: Duration,
}

impl SystemdConnector {
    pub fn new(connection: Connection, target: BusTarget, call_timeout: Duration) -> Self {
        Self {
            connection,
            target,
            call_timeout,
        }
    }

    pub fn target(&self) -> &BusTarget {
        &self.target
    }
}

impl ManagerConnector for SystemdConnector {
    type Bus = SystemdManager;

    async fn connect(&self) -> Result<SystemdManager, Error> {
        SystemdManager::connect(&self.connection, &self.target, self.call_timeout).await
    }
}

// ── Dispatch task ────────────────────────────────────────────────────

/// One decoded item from either notification stream.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Inbound {
    Properties(PropertiesChanged),
    Signal(SignalEvent),
    /// The named stream ended.
    Closed(&'static str),
}

/// Interleave both notification streams so neither can starve the other.
///
/// Each stream is followed by a [`Inbound::Closed`] marker so the consumer
/// learns when one of them ends.
fn merge_inbound<P, S>(properties: P, signals: S) -> impl Stream<Item = Inbound>
where
    P: Stream<Item = PropertiesChanged>,
    S: Stream<Item = SignalEvent>,
{
    stream::select(
        properties
            .map(Inbound::Properties)
            .chain(stream::once(ready(Inbound::Closed("PropertiesChanged")))),
        signals
            .map(Inbound::Signal)
            .chain(stream::once(ready(Inbound::Closed("manager signal")))),
    )
}

/// Pump notifications into the listener sets, one at a time, until
/// cancelled or a stream ends. A stream ending cancels `lost`.
async fn dispatch_loop<I>(
    inbound: I,
    property_listeners: Arc<ListenerSet<PropertiesChanged>>,
    signal_listeners: Arc<ListenerSet<SignalEvent>>,
    cancel: CancellationToken,
    lost: CancellationToken,
) where
    I: Stream<Item = Inbound> + Send + 'static,
{
    let mut inbound = pin!(inbound);

    loop {
        let item = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = inbound.next() => item,
        };

        match item {
            Some(Inbound::Properties(change)) => {
                trace!(properties = ?change.names(), "properties changed");
                property_listeners.dispatch(&change);
            }
            Some(Inbound::Signal(event)) => {
                trace!(signal = %event.name, "manager signal");
                signal_listeners.dispatch(&event);
            }
            Some(Inbound::Closed(stream)) => {
                warn!(stream, "notification stream ended, manager connection lost");
                lost.cancel();
                break;
            }
            None => {
                lost.cancel();
                break;
            }
        }
    }

    debug!("manager dispatch loop finished");
}

/// Decode a `PropertiesChanged` signal, ignoring other interfaces.
fn decode_properties_changed(signal: &FdoPropertiesChanged) -> Option<PropertiesChanged> {
    let args = match signal.args() {
        Ok(args) => args,
        Err(e) => {
            warn!(error = %Error::from(e), "undecodable PropertiesChanged");
            return None;
        }
    };
    if args.interface_name().as_str() != MANAGER_INTERFACE {
        return None;
    }

    Some(PropertiesChanged {
        changed: args
            .changed_properties()
            .iter()
            .map(|(name, value)| ((*name).to_owned(), PropertyValue::from(value)))
            .collect(),
        invalidated: args
            .invalidated_properties()
            .iter()
            .map(|name| (*name).to_owned())
            .collect(),
    })
}

fn decode_signal(message: &Message) -> Option<SignalEvent> {
    let header = message.header();
    let name = header.member()?.to_string();

    let body = message.body();
    let args = body
        .deserialize::<Structure<'_>>()
        .map(|fields| fields.fields().iter().map(PropertyValue::from).collect())
        .unwrap_or_default();

    Some(SignalEvent { name, args })
}

// ── Helpers ──────────────────────────────────────────────────────────

async fn with_deadline<T, F>(deadline: Duration, operation: &str, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| Error::Timeout {
            operation: operation.to_owned(),
            timeout_secs: deadline.as_secs(),
        })?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    fn change(name: &str) -> PropertiesChanged {
        PropertiesChanged {
            changed: HashMap::from([(name.to_owned(), PropertyValue::U32(1))]),
            invalidated: Vec::new(),
        }
    }

    #[tokio::test]
    async fn signals_are_interleaved_with_property_changes() {
        let items: Vec<Inbound> = merge_inbound(
            stream::iter([change("NJobs"), change("NFailedUnits"), change("NNames")]),
            stream::iter([SignalEvent::new("JobRemoved")]),
        )
        .collect()
        .await;

        assert_eq!(items.len(), 6);
        assert_eq!(items[0], Inbound::Properties(change("NJobs")));
        assert_eq!(items[1], Inbound::Signal(SignalEvent::new("JobRemoved")));
        assert!(items.contains(&Inbound::Closed("PropertiesChanged")));
        assert!(items.contains(&Inbound::Closed("manager signal")));
    }

    #[tokio::test]
    async fn ended_stream_marks_connection_lost() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let property_listeners = Arc::new(ListenerSet::new(ListenerKind::PropertiesChanged));
        let signal_listeners = Arc::new(ListenerSet::new(ListenerKind::Signal));
        {
            let seen = Arc::clone(&seen);
            property_listeners.register(Box::new(move |change: &PropertiesChanged| {
                seen.lock().unwrap().push(change.names().join(","));
            }));
        }
        {
            let seen = Arc::clone(&seen);
            signal_listeners.register(Box::new(move |signal: &SignalEvent| {
                seen.lock().unwrap().push(signal.name.clone());
            }));
        }

        let lost = CancellationToken::new();
        dispatch_loop(
            merge_inbound(
                stream::iter([change("NFailedUnits")]),
                stream::iter([SignalEvent::new("JobRemoved")]),
            ),
            property_listeners,
            signal_listeners,
            CancellationToken::new(),
            lost.clone(),
        )
        .await;

        assert!(lost.is_cancelled());
        assert_eq!(*seen.lock().unwrap(), vec!["NFailedUnits", "JobRemoved"]);
    }

    #[tokio::test]
    async fn cancelled_loop_is_not_a_lost_connection() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let lost = CancellationToken::new();

        dispatch_loop(
            merge_inbound(
                stream::pending::<PropertiesChanged>(),
                stream::pending::<SignalEvent>(),
            ),
            Arc::new(ListenerSet::new(ListenerKind::PropertiesChanged)),
            Arc::new(ListenerSet::new(ListenerKind::Signal)),
            cancel,
            lost.clone(),
        )
        .await;

        assert!(!lost.is_cancelled());
    }
}
