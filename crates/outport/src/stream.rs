//! OutputStream - producer handle bound to one stream of a port

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use contracts::{AnyValue, PortTraits, PrecisionTime, StreamId, StreamSri};

use crate::error::OutPortError;
use crate::port::PortInner;
use crate::sri_cache::SriEntry;

/// Handle for pushing data and SRI changes on one stream.
///
/// A handle stops being valid once its stream ends (EOS pushed through any
/// path), once it is closed, or once the port is gone.
pub struct OutputStream<K: PortTraits> {
    port: Weak<PortInner<K>>,
    stream_id: StreamId,
    /// Generation of the stream this handle was created for
    generation: u64,
    closed: AtomicBool,
}

impl<K: PortTraits> OutputStream<K> {
    pub(crate) fn new(port: Weak<PortInner<K>>, stream_id: StreamId, generation: u64) -> Self {
        Self {
            port,
            stream_id,
            generation,
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn invalid(stream_id: StreamId) -> Self {
        Self {
            port: Weak::new(),
            stream_id,
            generation: 0,
            closed: AtomicBool::new(true),
        }
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub fn is_valid(&self) -> bool {
        self.live().is_some()
    }

    /// Port and current SRI entry, if this handle still refers to a live stream
    fn live(&self) -> Option<(Arc<PortInner<K>>, SriEntry)> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        let port = self.port.upgrade()?;
        let entry = port.sri_entry(&self.stream_id)?;
        (entry.generation == self.generation).then_some((port, entry))
    }

    fn require_live(&self) -> Result<(Arc<PortInner<K>>, SriEntry), OutPortError> {
        self.live().ok_or_else(|| {
            OutPortError::invalid_argument(format!(
                "stream '{}' handle is no longer valid",
                self.stream_id
            ))
        })
    }

    pub fn sri(&self) -> Option<StreamSri> {
        self.live().map(|(_, entry)| StreamSri::clone(&entry.sri))
    }

    /// Push data on this stream. Once the handle is invalid this is a no-op.
    pub fn send(&self, data: impl Into<K::Buffer>, time: PrecisionTime) -> Result<(), OutPortError> {
        let Some((port, _)) = self.live() else {
            return Ok(());
        };
        port.push(data.into(), time, false, &self.stream_id)
    }

    /// End the stream with an empty EOS push. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), OutPortError> {
        let Some((port, _)) = self.live() else {
            self.closed.store(true, Ordering::Release);
            return Ok(());
        };
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        port.push(K::Buffer::default(), PrecisionTime::now(), true, &self.stream_id)
    }

    /// Replace the SRI; its stream id is forced to this handle's
    pub fn set_sri(&self, mut sri: StreamSri) -> Result<(), OutPortError> {
        let (port, _) = self.require_live()?;
        sri.stream_id = self.stream_id.clone();
        port.install_sri(sri).map(|_| ())
    }

    fn modify(&self, edit: impl FnOnce(&mut StreamSri)) -> Result<(), OutPortError> {
        let (port, entry) = self.require_live()?;
        let mut sri = StreamSri::clone(&entry.sri);
        edit(&mut sri);
        port.install_sri(sri).map(|_| ())
    }

    pub fn set_xdelta(&self, xdelta: f64) -> Result<(), OutPortError> {
        self.modify(|sri| sri.xdelta = xdelta)
    }

    pub fn set_blocking(&self, blocking: bool) -> Result<(), OutPortError> {
        self.modify(|sri| sri.blocking = blocking)
    }

    pub fn set_keyword(
        &self,
        id: impl Into<String>,
        value: impl Into<AnyValue>,
    ) -> Result<(), OutPortError> {
        let (id, value) = (id.into(), value.into());
        self.modify(|sri| sri.set_keyword(id, value))
    }

    /// Remove a keyword; false if it was not present
    pub fn erase_keyword(&self, id: &str) -> Result<bool, OutPortError> {
        let (port, entry) = self.require_live()?;
        let mut sri = StreamSri::clone(&entry.sri);
        if !sri.erase_keyword(id) {
            return Ok(false);
        }
        port.install_sri(sri)?;
        Ok(true)
    }
}

impl<K: PortTraits> std::fmt::Debug for OutputStream<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("stream_id", &self.stream_id)
            .field("generation", &self.generation)
            .field("valid", &self.is_valid())
            .finish()
    }
}
