//! Wire encoding of remote frames

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use contracts::{ContractError, Packet, StreamSri, WireFormat};

/// Decoded remote frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireMessage<B> {
    Sri(StreamSri),
    Packet(Packet<B>),
}

// Borrowing twin of `WireMessage`; both serialize identically
#[derive(Serialize)]
#[serde(rename = "WireMessage")]
enum WireMessageRef<'a, B> {
    Sri(&'a StreamSri),
    Packet(&'a Packet<B>),
}

fn encode<B: Serialize>(
    message: &WireMessageRef<'_, B>,
    format: WireFormat,
) -> Result<Bytes, ContractError> {
    let data = match format {
        WireFormat::Json => serde_json::to_vec(message).map_err(|e| ContractError::Encode {
            message: format!("json error: {e}"),
        })?,
        WireFormat::Bincode => bincode::serialize(message).map_err(|e| ContractError::Encode {
            message: format!("bincode error: {e}"),
        })?,
    };
    Ok(Bytes::from(data))
}

pub fn encode_sri(sri: &StreamSri, format: WireFormat) -> Result<Bytes, ContractError> {
    encode::<()>(&WireMessageRef::Sri(sri), format)
}

pub fn encode_packet<B: Serialize>(
    packet: &Packet<B>,
    format: WireFormat,
) -> Result<Bytes, ContractError> {
    encode(&WireMessageRef::Packet(packet), format)
}

/// Decode a frame produced by a remote transport
pub fn decode_message<B: DeserializeOwned>(
    frame: &[u8],
    format: WireFormat,
) -> Result<WireMessage<B>, ContractError> {
    match format {
        WireFormat::Json => serde_json::from_slice(frame)
            .map_err(|e| ContractError::decode(format!("json error: {e}"))),
        WireFormat::Bincode => bincode::deserialize(frame)
            .map_err(|e| ContractError::decode(format!("bincode error: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{PrecisionTime, SharedBuffer};

    #[test]
    fn test_json_frame_shape() {
        let frame = encode_sri(&StreamSri::new("s1"), WireFormat::Json).unwrap();
        let text = std::str::from_utf8(&frame).unwrap();
        assert!(text.starts_with("{\"Sri\":"));
        assert!(text.contains("\"stream_id\":\"s1\""));
    }

    #[test]
    fn test_bincode_packet_decodes() {
        let packet = Packet::new(
            SharedBuffer::from(vec![1.5_f32, -2.0]),
            PrecisionTime::from_secs(3.5),
            true,
            "s1",
        );
        let frame = encode_packet(&packet, WireFormat::Bincode).unwrap();
        match decode_message::<SharedBuffer<f32>>(&frame, WireFormat::Bincode).unwrap() {
            WireMessage::Packet(decoded) => assert_eq!(decoded, packet),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = decode_message::<SharedBuffer<u8>>(b"not json", WireFormat::Json);
        assert!(matches!(result, Err(ContractError::Decode { .. })));
    }
}
