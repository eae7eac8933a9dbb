//! OutPort - stream-multiplexing output port
//!
//! A push fans out to every eligible connection in attach order. Each
//! connection receives a stream's current SRI before its first data after
//! the SRI changed. A failing connection is detached once the fan-out is
//! over and never affects delivery to the others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    ConnectionDescriptor, ContractError, Packet, PortConfig, PortStatistics, PortTraits,
    PortTransport, PortUsage, PrecisionTime, RemoteConfig, StatsConfig, StreamId, StreamSri,
};

use crate::error::OutPortError;
use crate::filter::RoutingFilter;
use crate::metrics::{LinkStatistics, PortActivity};
use crate::registry::{Connection, ConnectionInfo, ConnectionRegistry};
use crate::sri_cache::{SriCache, SriEntry};
use crate::stream::OutputStream;
use crate::transports::{create_transport, Peer};

type Listener = Arc<dyn Fn(&str) + Send + Sync>;

/// Registry and filter change together under one lock
struct Routing<K: PortTraits> {
    registry: ConnectionRegistry<K>,
    filter: RoutingFilter,
}

/// Outcome of delivering one push to one connection
enum Delivery {
    Sent,
    Dropped,
    Failed,
}

pub(crate) struct PortInner<K: PortTraits> {
    name: String,
    routing: RwLock<Routing<K>>,
    sri: SriCache,
    activity: PortActivity,
    stats: StatsConfig,
    stats_enabled: AtomicBool,
    remote: RemoteConfig,
    on_connect: RwLock<Option<Listener>>,
    on_disconnect: RwLock<Option<Listener>>,
}

impl<K: PortTraits> PortInner<K> {
    pub(crate) fn sri_entry(&self, stream_id: &str) -> Option<SriEntry> {
        self.sri.get(stream_id)
    }

    pub(crate) fn install_sri(&self, sri: StreamSri) -> Result<SriEntry, OutPortError> {
        if sri.stream_id.is_empty() {
            return Err(OutPortError::invalid_argument("SRI stream id must not be empty"));
        }
        let entry = self.sri.install(sri);
        debug!(
            port = %self.name,
            stream = %entry.sri.stream_id,
            revision = entry.revision,
            "SRI installed"
        );
        Ok(entry)
    }

    pub(crate) fn push(
        &self,
        data: K::Buffer,
        time: PrecisionTime,
        eos: bool,
        stream_id: &str,
    ) -> Result<(), OutPortError> {
        if stream_id.is_empty() {
            return Err(OutPortError::invalid_argument("stream id must not be empty"));
        }
        // Keep-alive
        if K::is_empty(&data) && !eos {
            return Ok(());
        }

        let (entry, created) = self.sri.ensure(stream_id);
        if created {
            debug!(port = %self.name, stream = stream_id, "No SRI pushed, using default");
        }

        let elements = K::element_count(&data);
        let packet = Packet::new(data, time, eos, entry.sri.stream_id.clone());
        let mut stale = Vec::new();
        let mut highest_backlog = 0.0f32;

        {
            let routing = self.routing.read();
            for connection in routing.registry.iter() {
                if connection.is_stale() {
                    continue;
                }
                if routing.filter.allows(&self.name, connection.id(), stream_id) {
                    if let Delivery::Failed = self.deliver(connection, &entry, &packet, elements) {
                        stale.push(connection.id().to_string());
                    }
                    highest_backlog = highest_backlog.max(connection.transport().queue_depth());
                }
                if eos {
                    connection.forget_stream(stream_id);
                }
            }
        }

        self.activity.record_push(highest_backlog);
        observability::record_packet_pushed(&self.name, stream_id, elements);

        if eos {
            self.sri.retire(stream_id);
            debug!(port = %self.name, stream = stream_id, "End of stream");
        }

        for connection_id in stale {
            self.detach_stale(&connection_id);
        }
        Ok(())
    }

    fn deliver(
        &self,
        connection: &Connection<K>,
        entry: &SriEntry,
        packet: &Packet<K::Buffer>,
        elements: usize,
    ) -> Delivery {
        let transport = connection.transport();

        if connection.needs_sri(&packet.stream_id, entry.revision) {
            if let Err(e) = transport.send_sri(&entry.sri) {
                return self.send_failed(connection, &packet.stream_id, e);
            }
            connection.mark_sri(&packet.stream_id, entry.revision);
            observability::record_sri_delivered(&self.name, connection.id());
        }

        match transport.send(packet) {
            Ok(()) => {
                connection.record_push(
                    elements,
                    transport.queue_depth(),
                    packet.eos,
                    &packet.stream_id,
                );
                Delivery::Sent
            }
            Err(e) => self.send_failed(connection, &packet.stream_id, e),
        }
    }

    fn send_failed(
        &self,
        connection: &Connection<K>,
        stream_id: &str,
        err: ContractError,
    ) -> Delivery {
        if err.is_backpressure() {
            connection.record_drop();
            observability::record_packet_dropped(&self.name, connection.id());
            warn!(
                port = %self.name,
                connection = connection.id(),
                stream = stream_id,
                "Transport queue full, packet dropped"
            );
            return Delivery::Dropped;
        }

        connection.record_failure();
        observability::record_transport_fault(&self.name, connection.id());
        error!(
            port = %self.name,
            connection = connection.id(),
            stream = stream_id,
            error = %err,
            "Transport failed, detaching connection"
        );
        if connection.mark_stale() {
            Delivery::Failed
        } else {
            Delivery::Dropped
        }
    }

    fn detach_stale(&self, connection_id: &str) {
        let (removed, count) = {
            let mut routing = self.routing.write();
            // The id may have been detached and attached again meanwhile
            let is_stale = routing
                .registry
                .get(connection_id)
                .is_some_and(|c| c.is_stale());
            let removed = if is_stale {
                routing.registry.remove(connection_id)
            } else {
                None
            };
            (removed, routing.registry.len())
        };

        if removed.is_some() {
            self.connections_changed(count);
            info!(port = %self.name, connection = connection_id, "Stale connection detached");
            self.notify(&self.on_disconnect, connection_id);
        }
    }

    fn connections_changed(&self, count: usize) {
        self.activity.set_connections(count);
        observability::record_connection_count(&self.name, count);
    }

    fn notify(&self, slot: &RwLock<Option<Listener>>, connection_id: &str) {
        let listener = slot.read().clone();
        if let Some(listener) = listener {
            listener(connection_id);
        }
    }
}

/// Output port carrying one payload family `K`.
///
/// Cloning yields another handle to the same port.
pub struct OutPort<K: PortTraits> {
    inner: Arc<PortInner<K>>,
}

impl<K: PortTraits> Clone for OutPort<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: PortTraits> OutPort<K> {
    /// Port with default statistics and remote settings and an open filter
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(
            name.into(),
            StatsConfig::default(),
            RemoteConfig::default(),
            RoutingFilter::default(),
        )
    }

    #[instrument(name = "outport_from_config", skip(config), fields(port = %config.name))]
    pub fn from_config(config: &PortConfig) -> Result<Self, OutPortError> {
        if config.name.is_empty() {
            return Err(OutPortError::configuration("port name must not be empty"));
        }
        let filter = RoutingFilter::new(config.connection_table.clone())?;
        Ok(Self::build(
            config.name.clone(),
            config.stats.clone(),
            config.remote.clone(),
            filter,
        ))
    }

    fn build(name: String, stats: StatsConfig, remote: RemoteConfig, filter: RoutingFilter) -> Self {
        let stats_enabled = AtomicBool::new(stats.enabled);
        Self {
            inner: Arc::new(PortInner {
                name,
                routing: RwLock::new(Routing {
                    registry: ConnectionRegistry::new(),
                    filter,
                }),
                sri: SriCache::new(),
                activity: PortActivity::new(),
                stats,
                stats_enabled,
                remote,
                on_connect: RwLock::new(None),
                on_disconnect: RwLock::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn repid(&self) -> &'static str {
        K::REPID
    }

    // ===== Data flow =====

    /// Install or refresh a stream's SRI.
    ///
    /// Nothing is sent here; every connection gets the new SRI ahead of the
    /// stream's next data.
    pub fn push_sri(&self, sri: StreamSri) -> Result<(), OutPortError> {
        self.inner.install_sri(sri).map(|_| ())
    }

    /// Push one buffer of stream data.
    ///
    /// An empty non-EOS push does nothing. An EOS push ends the stream.
    pub fn push_packet(
        &self,
        data: impl Into<K::Buffer>,
        time: PrecisionTime,
        eos: bool,
        stream_id: &str,
    ) -> Result<(), OutPortError> {
        self.inner.push(data.into(), time, eos, stream_id)
    }

    // ===== Streams =====

    /// Handle for `stream_id`, creating the stream with a default SRI
    pub fn create_stream(&self, stream_id: &str) -> Result<OutputStream<K>, OutPortError> {
        if stream_id.is_empty() {
            return Err(OutPortError::invalid_argument("stream id must not be empty"));
        }
        let (entry, _) = self.inner.sri.ensure(stream_id);
        Ok(self.handle(entry))
    }

    /// Handle for a stream described by `sri`, installed like `push_sri`
    pub fn create_stream_with_sri(&self, sri: StreamSri) -> Result<OutputStream<K>, OutPortError> {
        let entry = self.inner.install_sri(sri)?;
        Ok(self.handle(entry))
    }

    /// Handle for an active stream; an invalid handle if there is none
    pub fn get_stream(&self, stream_id: &str) -> OutputStream<K> {
        match self.inner.sri.get(stream_id) {
            Some(entry) => self.handle(entry),
            None => OutputStream::invalid(StreamId::from(stream_id)),
        }
    }

    pub fn get_streams(&self) -> Vec<OutputStream<K>> {
        self.inner
            .sri
            .stream_ids()
            .iter()
            .filter_map(|id| self.inner.sri.get(id))
            .map(|entry| self.handle(entry))
            .collect()
    }

    fn handle(&self, entry: SriEntry) -> OutputStream<K> {
        OutputStream::new(
            Arc::downgrade(&self.inner),
            entry.sri.stream_id.clone(),
            entry.generation,
        )
    }

    // ===== Connections =====

    #[instrument(name = "outport_attach", skip(self, peer), fields(port = %self.inner.name))]
    pub fn attach(&self, connection_id: &str, peer: Peer<K>) -> Result<(), OutPortError> {
        if connection_id.is_empty() || connection_id.trim() != connection_id {
            return Err(OutPortError::configuration(format!(
                "invalid connection id '{connection_id}'"
            )));
        }
        if self.inner.routing.read().registry.contains(connection_id) {
            return Err(OutPortError::occupied_connection(connection_id));
        }

        let transport = create_transport(connection_id, peer, &self.inner.remote)?;
        let kind = transport.kind();
        let stats = LinkStatistics::new(K::BITS_PER_ELEMENT, self.inner.stats.history_window);
        let connection = Connection::new(connection_id, transport, stats);

        let count = {
            let mut routing = self.inner.routing.write();
            // Under the write lock so a concurrent `enable_stats` cannot miss it
            connection.set_stats_enabled(self.stats_enabled());
            routing.registry.insert(connection)?;
            routing.registry.len()
        };

        self.inner.connections_changed(count);
        info!(
            port = %self.inner.name,
            connection = connection_id,
            transport = ?kind,
            "Connection attached"
        );
        self.inner.notify(&self.inner.on_connect, connection_id);
        Ok(())
    }

    #[instrument(name = "outport_detach", skip(self), fields(port = %self.inner.name))]
    pub fn detach(&self, connection_id: &str) -> Result<(), OutPortError> {
        let (removed, count) = {
            let mut routing = self.inner.routing.write();
            let removed = routing.registry.remove(connection_id);
            (removed, routing.registry.len())
        };
        if removed.is_none() {
            return Err(OutPortError::unknown_connection(connection_id));
        }
        // Transport is dropped here, outside the lock
        drop(removed);

        self.inner.connections_changed(count);
        info!(port = %self.inner.name, connection = connection_id, "Connection detached");
        self.inner.notify(&self.inner.on_disconnect, connection_id);
        Ok(())
    }

    /// Called with the connection id after each attach
    pub fn set_connect_listener(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        *self.inner.on_connect.write() = Some(Arc::new(listener));
    }

    /// Called with the connection id after each detach, stale detaches included
    pub fn set_disconnect_listener(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        *self.inner.on_disconnect.write() = Some(Arc::new(listener));
    }

    pub fn get_connections(&self) -> Vec<ConnectionInfo> {
        self.inner
            .routing
            .read()
            .registry
            .iter()
            .map(|c| c.info())
            .collect()
    }

    // ===== Routing =====

    /// Replace the whole connection table; a malformed rule rejects all of it
    #[instrument(
        name = "outport_update_routing_filter",
        skip(self, rules),
        fields(port = %self.inner.name, rules = rules.len())
    )]
    pub fn update_routing_filter(
        &self,
        rules: Vec<ConnectionDescriptor>,
    ) -> Result<(), OutPortError> {
        let filter = RoutingFilter::new(rules)?;
        self.inner.routing.write().filter = filter;
        info!(port = %self.inner.name, "Routing filter updated");
        Ok(())
    }

    pub fn routing_filter(&self) -> Vec<ConnectionDescriptor> {
        self.inner.routing.read().filter.rules().to_vec()
    }

    // ===== Statistics =====

    pub fn statistics(&self) -> Vec<PortStatistics> {
        let routing = self.inner.routing.read();
        routing
            .registry
            .iter()
            .map(|connection| {
                let snapshot = connection.snapshot();
                PortStatistics {
                    port_name: self.inner.name.clone(),
                    connection_id: connection.id().to_string(),
                    transport: connection.transport().kind(),
                    elements_per_second: snapshot.elements_per_second,
                    bits_per_second: snapshot.bits_per_second,
                    calls_per_second: snapshot.calls_per_second,
                    stream_ids: snapshot.stream_ids,
                    average_queue_depth: snapshot.average_queue_depth,
                    time_since_last_call: snapshot.time_since_last_call,
                    dropped_packets: snapshot.dropped_count,
                    failed_calls: snapshot.failure_count,
                }
            })
            .collect()
    }

    /// Usage classification; reads atomics only
    pub fn state(&self) -> PortUsage {
        self.inner.activity.usage(
            Duration::from_millis(self.inner.stats.idle_after_ms),
            self.inner.stats.busy_threshold,
        )
    }

    pub fn enable_stats(&self, enabled: bool) {
        self.inner.stats_enabled.store(enabled, Ordering::Relaxed);
        for connection in self.inner.routing.read().registry.iter() {
            connection.set_stats_enabled(enabled);
        }
    }

    pub fn stats_enabled(&self) -> bool {
        self.inner.stats_enabled.load(Ordering::Relaxed)
    }

    // ===== SRI queries =====

    pub fn get_current_sri(&self) -> HashMap<String, StreamSri> {
        self.inner.sri.current()
    }

    pub fn get_active_sris(&self) -> Vec<StreamSri> {
        self.inner.sri.active()
    }

    /// SRI of an ended stream, until `clear_last_known`
    pub fn last_known_sri(&self, stream_id: &str) -> Option<StreamSri> {
        self.inner.sri.last_known(stream_id)
    }

    pub fn clear_last_known(&self) {
        self.inner.sri.clear_last_known();
    }
}
