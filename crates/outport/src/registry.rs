//! Connection registry
//!
//! Connections are kept in attach order. Each one remembers which SRI
//! revision it last received per stream and carries its own statistics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use contracts::{ContractError, PortTraits, PortTransport, StreamId, TransportKind};

use crate::metrics::{LinkSnapshot, LinkStatistics};

/// Public view of an attached connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub connection_id: String,
    pub kind: TransportKind,
}

pub struct Connection<K: PortTraits> {
    id: String,
    transport: Box<dyn PortTransport<K>>,
    /// Stream id -> SRI revision last delivered on this connection
    sri_marks: Mutex<HashMap<StreamId, u64>>,
    stats: Mutex<LinkStatistics>,
    stale: AtomicBool,
}

impl<K: PortTraits> Connection<K> {
    pub fn new(
        id: impl Into<String>,
        transport: Box<dyn PortTransport<K>>,
        stats: LinkStatistics,
    ) -> Self {
        Self {
            id: id.into(),
            transport,
            sri_marks: Mutex::new(HashMap::new()),
            stats: Mutex::new(stats),
            stale: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transport(&self) -> &dyn PortTransport<K> {
        self.transport.as_ref()
    }

    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            connection_id: self.id.clone(),
            kind: self.transport.kind(),
        }
    }

    /// True unless `revision` of the stream's SRI was already delivered here
    pub fn needs_sri(&self, stream_id: &str, revision: u64) -> bool {
        self.sri_marks.lock().get(stream_id) != Some(&revision)
    }

    pub fn mark_sri(&self, stream_id: &StreamId, revision: u64) {
        self.sri_marks.lock().insert(stream_id.clone(), revision);
    }

    /// Forget delivery state of an ended stream
    pub fn forget_stream(&self, stream_id: &str) {
        self.sri_marks.lock().remove(stream_id);
    }

    pub fn record_push(&self, elements: usize, queue_depth: f32, eos: bool, stream_id: &str) {
        self.stats
            .lock()
            .update(elements, queue_depth, eos, stream_id);
    }

    pub fn record_drop(&self) {
        self.stats.lock().inc_dropped_count();
    }

    pub fn record_failure(&self) {
        self.stats.lock().inc_failure_count();
    }

    pub fn set_stats_enabled(&self, enabled: bool) {
        self.stats.lock().set_enabled(enabled);
    }

    pub fn snapshot(&self) -> LinkSnapshot {
        self.stats.lock().retrieve()
    }

    /// Mark for detachment; true only for the call that set the flag
    pub fn mark_stale(&self) -> bool {
        !self.stale.swap(true, Ordering::AcqRel)
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }
}

/// Attached connections in attach order
pub struct ConnectionRegistry<K: PortTraits> {
    connections: Vec<Arc<Connection<K>>>,
}

impl<K: PortTraits> ConnectionRegistry<K> {
    pub fn new() -> Self {
        Self {
            connections: Vec::new(),
        }
    }

    pub fn insert(&mut self, connection: Connection<K>) -> Result<(), ContractError> {
        if self.contains(connection.id()) {
            return Err(ContractError::OccupiedConnection {
                connection_id: connection.id().to_string(),
            });
        }
        self.connections.push(Arc::new(connection));
        Ok(())
    }

    pub fn remove(&mut self, connection_id: &str) -> Option<Arc<Connection<K>>> {
        let idx = self
            .connections
            .iter()
            .position(|c| c.id() == connection_id)?;
        Some(self.connections.remove(idx))
    }

    pub fn get(&self, connection_id: &str) -> Option<&Arc<Connection<K>>> {
        self.connections.iter().find(|c| c.id() == connection_id)
    }

    pub fn contains(&self, connection_id: &str) -> bool {
        self.get(connection_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Connection<K>>> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }
}

impl<K: PortTraits> Default for ConnectionRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FloatTraits, Packet, SharedBuffer, StreamSri};

    struct NullTransport(&'static str);

    impl PortTransport<FloatTraits> for NullTransport {
        fn connection_id(&self) -> &str {
            self.0
        }

        fn kind(&self) -> TransportKind {
            TransportKind::Custom
        }

        fn send_sri(&self, _sri: &StreamSri) -> Result<(), ContractError> {
            Ok(())
        }

        fn send(&self, _packet: &Packet<SharedBuffer<f32>>) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn connection(id: &'static str) -> Connection<FloatTraits> {
        Connection::new(id, Box::new(NullTransport(id)), LinkStatistics::new(32, 10))
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut registry = ConnectionRegistry::new();
        registry.insert(connection("c1")).unwrap();
        let err = registry.insert(connection("c1")).unwrap_err();
        assert!(matches!(err, ContractError::OccupiedConnection { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_attach_order_is_kept() {
        let mut registry = ConnectionRegistry::new();
        for id in ["c3", "c1", "c2"] {
            registry.insert(connection(id)).unwrap();
        }
        registry.remove("c1").unwrap();
        let ids: Vec<_> = registry.iter().map(|c| c.id().to_string()).collect();
        assert_eq!(ids, vec!["c3", "c2"]);
        assert!(registry.remove("c1").is_none());
    }

    #[test]
    fn test_sri_marks_follow_revision() {
        let conn = connection("c1");
        let stream = StreamId::from("s1");
        assert!(conn.needs_sri("s1", 1));
        conn.mark_sri(&stream, 1);
        assert!(!conn.needs_sri("s1", 1));
        assert!(conn.needs_sri("s1", 2));
        conn.forget_stream("s1");
        assert!(conn.needs_sri("s1", 1));
    }

    #[test]
    fn test_mark_stale_reports_first_call_only() {
        let conn = connection("c1");
        assert!(conn.mark_stale());
        assert!(!conn.mark_stale());
        assert!(conn.is_stale());
    }
}
