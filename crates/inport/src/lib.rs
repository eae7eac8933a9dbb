//! # InPort
//!
//! 进程内消费端口。
//!
//! 负责：
//! - 记录每个输入流的 SRI 并标记变化
//! - 非阻塞地缓存数据包
//! - 队列满时清空队列，并把丢失的 EOS / SRI 变化标记合并到下一个包

use std::collections::{HashMap, VecDeque};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use contracts::{
    ContractError, LocalInPort, Packet, PortTraits, PortUsage, PrecisionTime, StreamId, StreamSri,
};

/// Default number of queued packets before a flush
pub const DEFAULT_MAX_QUEUE_DEPTH: usize = 100;

/// One packet as handed to the consumer
#[derive(Debug, Clone)]
pub struct DataTransfer<B> {
    pub data: B,
    pub time: PrecisionTime,
    pub eos: bool,
    pub stream_id: StreamId,
    pub sri: Arc<StreamSri>,
    /// SRI differs from the one attached to the previous packet of the stream
    pub sri_changed: bool,
    /// Queued packets were discarded to make room for this one
    pub input_queue_flushed: bool,
}

#[derive(Debug)]
struct SriState {
    sri: Arc<StreamSri>,
    /// Set by `push_sri`, cleared once a packet carries the change
    changed: bool,
}

pub struct InPort<K: PortTraits> {
    name: String,
    sris: Mutex<HashMap<StreamId, SriState>>,
    queue: Mutex<VecDeque<DataTransfer<K::Buffer>>>,
    max_queue_depth: AtomicUsize,
    _traits: PhantomData<fn() -> K>,
}

impl<K: PortTraits> InPort<K> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_max_queue_depth(name, DEFAULT_MAX_QUEUE_DEPTH)
    }

    pub fn with_max_queue_depth(name: impl Into<String>, max_queue_depth: usize) -> Self {
        Self {
            name: name.into(),
            sris: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            max_queue_depth: AtomicUsize::new(max_queue_depth),
            _traits: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a stream's SRI; only new or different descriptors count as changes
    pub fn push_sri(&self, sri: &StreamSri) {
        let mut sris = self.sris.lock();
        match sris.get_mut(&sri.stream_id) {
            None => {
                debug!(port = %self.name, stream = %sri.stream_id, "New SRI");
                sris.insert(
                    sri.stream_id.clone(),
                    SriState {
                        sri: Arc::new(sri.clone()),
                        changed: true,
                    },
                );
            }
            Some(state) if *state.sri != *sri => {
                debug!(port = %self.name, stream = %sri.stream_id, "SRI changed");
                state.sri = Arc::new(sri.clone());
                state.changed = true;
            }
            Some(_) => {}
        }
    }

    /// Queue a packet. Never blocks; a full queue is flushed first.
    pub fn push_packet(&self, packet: Packet<K::Buffer>) {
        let max_depth = self.max_queue_depth();
        if max_depth == 0 {
            return;
        }

        let (sri, mut sri_changed) = {
            let mut sris = self.sris.lock();
            let state = sris.entry(packet.stream_id.clone()).or_insert_with(|| {
                warn!(
                    port = %self.name,
                    stream = %packet.stream_id,
                    "Received data for stream with no SRI"
                );
                SriState {
                    sri: Arc::new(StreamSri::new(packet.stream_id.clone())),
                    changed: true,
                }
            });
            let changed = std::mem::replace(&mut state.changed, false);
            (Arc::clone(&state.sri), changed)
        };

        let mut eos = packet.eos;
        let mut queue = self.queue.lock();
        let mut flushed = false;
        if queue.len() >= max_depth {
            for queued in queue.iter() {
                if eos && sri_changed {
                    break;
                }
                sri_changed |= queued.sri_changed;
                eos |= queued.eos;
            }
            warn!(
                port = %self.name,
                dropped = queue.len(),
                "Input queue full, flushing"
            );
            queue.clear();
            flushed = true;
        }

        queue.push_back(DataTransfer {
            data: packet.data,
            time: packet.time,
            eos,
            stream_id: packet.stream_id,
            sri,
            sri_changed,
            input_queue_flushed: flushed,
        });
    }

    /// Next queued packet, if any
    pub fn get_packet(&self) -> Option<DataTransfer<K::Buffer>> {
        let packet = self.queue.lock().pop_front()?;
        if packet.eos {
            self.sris.lock().remove(&packet.stream_id);
        }
        Some(packet)
    }

    /// Next queued packet of one stream, if any
    pub fn get_packet_for(&self, stream_id: &str) -> Option<DataTransfer<K::Buffer>> {
        let packet = {
            let mut queue = self.queue.lock();
            let idx = queue.iter().position(|p| p.stream_id == stream_id)?;
            queue.remove(idx)?
        };
        if packet.eos {
            self.sris.lock().remove(&packet.stream_id);
        }
        Some(packet)
    }

    /// SRIs of streams that have not delivered their EOS yet
    pub fn active_sris(&self) -> Vec<StreamSri> {
        let mut list: Vec<_> = self
            .sris
            .lock()
            .values()
            .map(|state| StreamSri::clone(&state.sri))
            .collect();
        list.sort_by(|a, b| a.stream_id.cmp(&b.stream_id));
        list
    }

    pub fn current_queue_depth(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn max_queue_depth(&self) -> usize {
        self.max_queue_depth.load(Ordering::Relaxed)
    }

    /// Zero discards every packet
    pub fn set_max_queue_depth(&self, depth: usize) {
        self.max_queue_depth.store(depth, Ordering::Relaxed);
    }

    /// Queue fill ratio in `[0, 1]`
    pub fn queue_depth(&self) -> f32 {
        match self.max_queue_depth() {
            0 => 0.0,
            max => (self.current_queue_depth() as f32 / max as f32).min(1.0),
        }
    }

    pub fn state(&self) -> PortUsage {
        let depth = self.current_queue_depth();
        if depth == 0 {
            PortUsage::Idle
        } else if depth >= self.max_queue_depth() {
            PortUsage::Busy
        } else {
            PortUsage::Active
        }
    }
}

impl<K: PortTraits> LocalInPort<K> for InPort<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn push_sri(&self, sri: &StreamSri) -> Result<(), ContractError> {
        InPort::push_sri(self, sri);
        Ok(())
    }

    fn push_packet(&self, packet: Packet<K::Buffer>) -> Result<(), ContractError> {
        InPort::push_packet(self, packet);
        Ok(())
    }

    fn queue_depth(&self) -> f32 {
        InPort::queue_depth(self)
    }
}
