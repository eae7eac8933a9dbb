//! Typed port aliases and payload-specific push helpers

use contracts::{
    CharTraits, DoubleTraits, FileTraits, FloatTraits, LongLongTraits, LongTraits, OctetTraits,
    PrecisionTime, Sample, SampleTraits, SharedBuffer, SharedText, ShortTraits, ULongLongTraits,
    ULongTraits, UShortTraits, XmlTraits,
};

use crate::error::OutPortError;
use crate::port::OutPort;

pub type OutCharPort = OutPort<CharTraits>;
pub type OutOctetPort = OutPort<OctetTraits>;
pub type OutShortPort = OutPort<ShortTraits>;
pub type OutUShortPort = OutPort<UShortTraits>;
pub type OutLongPort = OutPort<LongTraits>;
pub type OutULongPort = OutPort<ULongTraits>;
pub type OutLongLongPort = OutPort<LongLongTraits>;
pub type OutULongLongPort = OutPort<ULongLongTraits>;
pub type OutFloatPort = OutPort<FloatTraits>;
pub type OutDoublePort = OutPort<DoubleTraits>;
pub type OutFilePort = OutPort<FileTraits>;
pub type OutXmlPort = OutPort<XmlTraits>;

impl<T: Sample> OutPort<SampleTraits<T>> {
    /// Push borrowed samples; they are copied once into a shared buffer
    pub fn push_slice(
        &self,
        data: &[T],
        time: PrecisionTime,
        eos: bool,
        stream_id: &str,
    ) -> Result<(), OutPortError> {
        self.push_packet(SharedBuffer::copy_from_slice(data), time, eos, stream_id)
    }
}

impl OutPort<FileTraits> {
    /// Push a file URL
    pub fn push_url(
        &self,
        url: &str,
        time: PrecisionTime,
        eos: bool,
        stream_id: &str,
    ) -> Result<(), OutPortError> {
        self.push_packet(SharedText::from(url), time, eos, stream_id)
    }
}

impl OutPort<XmlTraits> {
    /// Push an XML document; XML carries no timestamp
    pub fn push_xml(&self, xml: &str, eos: bool, stream_id: &str) -> Result<(), OutPortError> {
        self.push_packet(SharedText::from(xml), PrecisionTime::not_set(), eos, stream_id)
    }
}
