//! Packet - one data push as seen by a transport

use serde::{Deserialize, Serialize};

use crate::{PrecisionTime, StreamId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet<B> {
    pub data: B,
    pub time: PrecisionTime,
    /// End-of-stream marker
    pub eos: bool,
    pub stream_id: StreamId,
}

impl<B> Packet<B> {
    pub fn new(data: B, time: PrecisionTime, eos: bool, stream_id: impl Into<StreamId>) -> Self {
        Self {
            data,
            time,
            eos,
            stream_id: stream_id.into(),
        }
    }
}
