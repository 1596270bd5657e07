#![warn(missing_docs)]
//! Client-facing wire protocol for the gateway cluster.
//!
//! Defines the frame format, the message-type taxonomy, and the packet
//! reader/writer primitives bots use to decode gateway traffic.

mod frame;
mod msgtype;
mod value;
mod wire;

pub use frame::{
    call_entity_method_from_client, call_filtered_clients, create_entity_on_client,
    destroy_entity_on_client, with_gate_redirect_header, Frame,
};
pub use msgtype::{
    is_gate_redirected, MsgType, MT_CALL_ENTITY_METHOD_FROM_CLIENT, MT_CALL_FILTERED_CLIENTS,
    MT_CREATE_ENTITY_ON_CLIENT, MT_DESTROY_ENTITY_ON_CLIENT, MT_GATE_REDIRECT_START,
    MT_GATE_REDIRECT_STOP,
};
pub use value::FieldValue;
pub use wire::{pack_arg, unpack_arg, PacketReader, PacketWriter, WireError};

/// Server-assigned entity identifier.
pub type EntityId = u64;

/// Gateway-assigned client identifier, carried in proxy routing headers.
pub type ClientId = u64;
