//! Frame encoding and ready-made frame builders.
//!
//! A frame is one protocol message unit: `[msg_type: u16 LE][payload]`,
//! carried as a single binary transport message. The builders produce the
//! exact payloads the gateway emits, which also makes them the fixtures for
//! dispatch tests and in-process test servers.

use crate::msgtype::{
    MsgType, MT_CALL_ENTITY_METHOD_FROM_CLIENT, MT_CALL_FILTERED_CLIENTS,
    MT_CREATE_ENTITY_ON_CLIENT, MT_DESTROY_ENTITY_ON_CLIENT,
};
use crate::value::FieldValue;
use crate::wire::{PacketWriter, WireError};
use crate::{ClientId, EntityId};
use std::collections::HashMap;

/// One protocol message unit: a type code plus an opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Message-type code.
    pub msg_type: MsgType,
    /// Opaque payload, interpreted per message type.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Encode to the wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + self.payload.len());
        buf.extend_from_slice(&self.msg_type.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Decode from one transport message.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < 2 {
            return Err(WireError::UnexpectedEof {
                needed: 2 - data.len(),
            });
        }
        Ok(Self {
            msg_type: u16::from_le_bytes([data[0], data[1]]),
            payload: data[2..].to_vec(),
        })
    }
}

/// Build a create-entity frame: is-player flag, entity id, type name,
/// position (x, y, z, yaw), and the keyed client data blob.
pub fn create_entity_on_client(
    is_player: bool,
    entity_id: EntityId,
    type_name: &str,
    position: [f32; 4],
    data: &HashMap<String, FieldValue>,
) -> Result<Frame, WireError> {
    let mut w = PacketWriter::new();
    w.write_bool(is_player);
    w.write_u64(entity_id);
    w.write_var_str(type_name);
    for v in position {
        w.write_f32(v);
    }
    w.write_data(data)?;
    Ok(Frame {
        msg_type: MT_CREATE_ENTITY_ON_CLIENT,
        payload: w.into_inner(),
    })
}

/// Build a destroy-entity frame.
pub fn destroy_entity_on_client(type_name: &str, entity_id: EntityId) -> Frame {
    let mut w = PacketWriter::new();
    w.write_var_str(type_name);
    w.write_u64(entity_id);
    Frame {
        msg_type: MT_DESTROY_ENTITY_ON_CLIENT,
        payload: w.into_inner(),
    }
}

/// Build the body of a filtered-clients call: filter operator, filter
/// key/value, method name, and opaque arguments.
///
/// The gate proxy relays these, so the frame the client actually receives
/// additionally carries the routing header; wrap the result with
/// [`with_gate_redirect_header`] to reproduce that.
pub fn call_filtered_clients(
    op: u8,
    filter_key: &str,
    filter_val: &str,
    method: &str,
    args: &[Vec<u8>],
) -> Frame {
    let mut w = PacketWriter::new();
    w.write_u8(op);
    w.write_var_str(filter_key);
    w.write_var_str(filter_val);
    w.write_var_str(method);
    w.write_args(args);
    Frame {
        msg_type: MT_CALL_FILTERED_CLIENTS,
        payload: w.into_inner(),
    }
}

/// Build a client-to-server entity method call.
pub fn call_entity_method_from_client(
    entity_id: EntityId,
    method: &str,
    args: &[Vec<u8>],
) -> Frame {
    let mut w = PacketWriter::new();
    w.write_u64(entity_id);
    w.write_var_str(method);
    w.write_args(args);
    Frame {
        msg_type: MT_CALL_ENTITY_METHOD_FROM_CLIENT,
        payload: w.into_inner(),
    }
}

/// Prepend the gate-proxy routing header (gate id + client id) to a frame,
/// as the proxy does for every message type in the redirect range.
pub fn with_gate_redirect_header(frame: Frame, gate_id: u16, client_id: ClientId) -> Frame {
    let mut w = PacketWriter::new();
    w.write_u16(gate_id);
    w.write_u64(client_id);
    let mut payload = w.into_inner();
    payload.extend_from_slice(&frame.payload);
    Frame {
        msg_type: frame.msg_type,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::PacketReader;

    #[test]
    fn frame_roundtrips_through_encode() {
        let frame = Frame {
            msg_type: MT_DESTROY_ENTITY_ON_CLIENT,
            payload: vec![1, 2, 3],
        };
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn decode_rejects_short_input() {
        assert!(Frame::decode(&[]).is_err());
        assert!(Frame::decode(&[0x01]).is_err());
        // Two bytes is a valid frame with an empty payload.
        let frame = Frame::decode(&[0x01, 0x00]).unwrap();
        assert_eq!(frame.msg_type, 1);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn redirect_header_prefixes_payload() {
        let inner = call_filtered_clients(0, "", "", "OnLogin", &[]);
        let inner_len = inner.payload.len();
        let wrapped = with_gate_redirect_header(inner, 3, 77);

        assert_eq!(wrapped.payload.len(), inner_len + 10);
        let mut r = PacketReader::new(&wrapped.payload);
        assert_eq!(r.read_u16().unwrap(), 3);
        assert_eq!(r.read_u64().unwrap(), 77);
        r.read_u8().unwrap(); // op
        r.read_var_str().unwrap(); // key
        r.read_var_str().unwrap(); // val
        assert_eq!(r.read_var_str().unwrap(), "OnLogin");
    }

    #[test]
    fn create_entity_fields_parse_back() {
        let mut data = HashMap::new();
        data.insert("name".to_owned(), FieldValue::from("tester"));
        let frame =
            create_entity_on_client(true, 9001, "Avatar", [1.0, 2.0, 3.0, 0.5], &data).unwrap();

        let mut r = PacketReader::new(&frame.payload);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_u64().unwrap(), 9001);
        assert_eq!(r.read_var_str().unwrap(), "Avatar");
        for expected in [1.0f32, 2.0, 3.0, 0.5] {
            assert_eq!(r.read_f32().unwrap(), expected);
        }
        assert_eq!(r.read_data().unwrap(), data);
        assert_eq!(r.remaining(), 0);
    }
}
