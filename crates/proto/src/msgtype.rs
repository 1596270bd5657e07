//! Message-type taxonomy for the client-facing protocol.
//!
//! Codes inside the gate-redirect range arrive with an extra routing header
//! (gate id + client id) prepended by the proxy; the client consumes and
//! discards it before parsing the message body.

/// Message-type code carried in every frame header.
pub type MsgType = u16;

/// First code in the range relayed through the gate proxy.
pub const MT_GATE_REDIRECT_START: MsgType = 900;

/// Last code in the range relayed through the gate proxy.
pub const MT_GATE_REDIRECT_STOP: MsgType = 999;

/// Fan-out method call to all clients matching a filter.
pub const MT_CALL_FILTERED_CLIENTS: MsgType = 910;

/// Server instructs the client to mirror a newly created entity.
pub const MT_CREATE_ENTITY_ON_CLIENT: MsgType = 502;

/// Server instructs the client to drop a mirrored entity.
pub const MT_DESTROY_ENTITY_ON_CLIENT: MsgType = 503;

/// Client-originated entity method call (outbound only).
pub const MT_CALL_ENTITY_METHOD_FROM_CLIENT: MsgType = 504;

/// Whether a message type was relayed through the gate proxy and therefore
/// carries the extra routing header.
pub fn is_gate_redirected(msg_type: MsgType) -> bool {
    (MT_GATE_REDIRECT_START..=MT_GATE_REDIRECT_STOP).contains(&msg_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_range_covers_filtered_calls() {
        assert!(is_gate_redirected(MT_CALL_FILTERED_CLIENTS));
        assert!(!is_gate_redirected(MT_CREATE_ENTITY_ON_CLIENT));
        assert!(!is_gate_redirected(MT_DESTROY_ENTITY_ON_CLIENT));
    }

    #[test]
    fn redirect_range_is_inclusive() {
        assert!(is_gate_redirected(MT_GATE_REDIRECT_START));
        assert!(is_gate_redirected(MT_GATE_REDIRECT_STOP));
        assert!(!is_gate_redirected(MT_GATE_REDIRECT_START - 1));
        assert!(!is_gate_redirected(MT_GATE_REDIRECT_STOP + 1));
    }
}
