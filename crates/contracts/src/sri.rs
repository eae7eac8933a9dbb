//! StreamSri - signal related information describing one stream
//!
//! The descriptor travels ahead of the data it describes: a consumer must
//! always see the current SRI of a stream before that stream's next packet.

use serde::{Deserialize, Serialize};

use crate::StreamId;

/// Value carried by a keyword or a property entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnyValue {
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
    Sequence(Vec<AnyValue>),
}

impl AnyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Long(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl From<&str> for AnyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AnyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for AnyValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<i64> for AnyValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<bool> for AnyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Named attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: String,
    pub value: AnyValue,
}

impl Keyword {
    pub fn new(id: impl Into<String>, value: impl Into<AnyValue>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

/// Stream descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSri {
    /// Header version
    pub hversion: i32,
    /// Start of the first (sample) axis
    pub xstart: f64,
    /// Interval between samples
    pub xdelta: f64,
    /// Units of the first axis (1 = seconds)
    pub xunits: i16,
    /// Frame length for framed data, 0 for contiguous samples
    pub subsize: i32,
    pub ystart: f64,
    pub ydelta: f64,
    pub yunits: i16,
    /// 0 = scalar, 1 = complex
    pub mode: i16,
    pub stream_id: StreamId,
    /// Consumer should block rather than drop when its queue is full
    pub blocking: bool,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

impl StreamSri {
    /// Default descriptor for a stream that has none yet
    pub fn new(stream_id: impl Into<StreamId>) -> Self {
        Self {
            hversion: 1,
            xstart: 0.0,
            xdelta: 1.0,
            xunits: 1,
            subsize: 0,
            ystart: 0.0,
            ydelta: 0.0,
            yunits: 0,
            mode: 0,
            stream_id: stream_id.into(),
            blocking: false,
            keywords: Vec::new(),
        }
    }

    pub fn is_complex(&self) -> bool {
        self.mode != 0
    }

    pub fn keyword(&self, id: &str) -> Option<&AnyValue> {
        self.keywords.iter().find(|k| k.id == id).map(|k| &k.value)
    }

    /// Insert or overwrite a keyword, keeping insertion order
    pub fn set_keyword(&mut self, id: impl Into<String>, value: impl Into<AnyValue>) {
        let id = id.into();
        let value = value.into();
        match self.keywords.iter_mut().find(|k| k.id == id) {
            Some(existing) => existing.value = value,
            None => self.keywords.push(Keyword { id, value }),
        }
    }

    /// Returns true when a keyword was removed
    pub fn erase_keyword(&mut self, id: &str) -> bool {
        let before = self.keywords.len();
        self.keywords.retain(|k| k.id != id);
        self.keywords.len() != before
    }
}
