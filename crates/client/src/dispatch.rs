//! In-order frame classification and routing.

use crate::entity::ClientEntity;
use crate::policy::FailurePolicy;
use crate::registry::{CallOutcome, MethodRegistry};
use gatesim_proto::{
    is_gate_redirected, Frame, MsgType, PacketReader, WireError, MT_CALL_FILTERED_CLIENTS,
    MT_CREATE_ENTITY_ON_CLIENT, MT_DESTROY_ENTITY_ON_CLIENT,
};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, error};

/// Method exempt from the missing-player error: login completion can race
/// with entity teardown.
const LOGIN_METHOD: &str = "OnLogin";

/// Frame handling failures.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A code outside the client-facing taxonomy: unrecoverable protocol
    /// violation for this bot.
    #[error("unknown message type {0}")]
    UnknownMsgType(MsgType),
    /// Payload did not match the format for its message type; the frame is
    /// dropped and processing continues.
    #[error(transparent)]
    Wire(#[from] WireError),
}

impl DispatchError {
    /// Whether the dispatch loop must stop after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DispatchError::UnknownMsgType(_))
    }
}

/// Classifies received frames and maintains the entity shadow.
pub struct Dispatcher {
    bot_id: u32,
    registry: Arc<MethodRegistry>,
    policy: FailurePolicy,
    // Serializes shadow mutation. Today only the dispatch loop locks it;
    // it stays the guard for any future second mutator.
    shadow: Mutex<Option<ClientEntity>>,
}

impl Dispatcher {
    /// Dispatcher for one bot.
    pub fn new(bot_id: u32, registry: Arc<MethodRegistry>, policy: FailurePolicy) -> Self {
        Self {
            bot_id,
            registry,
            policy,
            shadow: Mutex::new(None),
        }
    }

    /// Snapshot of the current player shadow, if any.
    pub fn player(&self) -> Option<ClientEntity> {
        self.shadow.lock().expect("shadow lock poisoned").clone()
    }

    /// Handle one received frame.
    ///
    /// An error with `is_fatal()` must terminate the caller's loop; any
    /// other error means this frame was dropped and the loop continues.
    pub fn handle_frame(&self, frame: Frame) -> Result<(), DispatchError> {
        let msg_type = frame.msg_type;
        let mut shadow = self.shadow.lock().expect("shadow lock poisoned");
        let mut reader = PacketReader::new(&frame.payload);

        if is_gate_redirected(msg_type) {
            // Routing metadata added by the gate proxy; irrelevant here.
            reader.read_u16()?;
            reader.read_u64()?;
        }

        match msg_type {
            MT_CALL_FILTERED_CLIENTS => self.handle_call_filtered(&mut shadow, &mut reader),
            MT_CREATE_ENTITY_ON_CLIENT => self.handle_create_entity(&mut shadow, &mut reader),
            MT_DESTROY_ENTITY_ON_CLIENT => self.handle_destroy_entity(&mut shadow, &mut reader),
            other => Err(DispatchError::UnknownMsgType(other)),
        }
    }

    /// Invoke `method` on the player shadow, reporting every failure
    /// outcome locally so a bad call never escapes the frame boundary.
    pub fn call_entity_method(&self, method: &str, args: &[Vec<u8>]) -> CallOutcome {
        let mut shadow = self.shadow.lock().expect("shadow lock poisoned");
        self.call_on_shadow(&mut shadow, method, args)
    }

    fn call_on_shadow(
        &self,
        shadow: &mut Option<ClientEntity>,
        method: &str,
        args: &[Vec<u8>],
    ) -> CallOutcome {
        let Some(entity) = shadow.as_mut() else {
            return CallOutcome::MissingPlayer {
                exempt: method == LOGIN_METHOD,
            };
        };
        match self.registry.table_for(&entity.type_name) {
            None => CallOutcome::UnknownMethod,
            Some(table) => {
                let table = table.clone();
                table.invoke(method, entity, args)
            }
        }
    }

    fn handle_call_filtered(
        &self,
        shadow: &mut Option<ClientEntity>,
        reader: &mut PacketReader<'_>,
    ) -> Result<(), DispatchError> {
        reader.read_u8()?; // filter operator, unused by the client
        reader.read_var_str()?; // filter key
        reader.read_var_str()?; // filter value
        let method = reader.read_var_str()?;
        let args = reader.read_args()?;

        match self.call_on_shadow(shadow, &method, &args) {
            CallOutcome::Invoked => {
                debug!(bot = self.bot_id, method, "invoked entity method");
            }
            CallOutcome::MissingPlayer { exempt: true } => {
                debug!(bot = self.bot_id, method, "no player shadow; dropping call");
            }
            CallOutcome::MissingPlayer { exempt: false } => {
                error!(bot = self.bot_id, method, "no player shadow for entity method call");
                self.policy.escalate();
            }
            CallOutcome::UnknownMethod => {
                error!(bot = self.bot_id, method, "entity method not registered");
                self.policy.escalate();
            }
            CallOutcome::Failed(err) => {
                error!(bot = self.bot_id, method, %err, "entity method call failed");
                self.policy.escalate();
            }
        }
        Ok(())
    }

    fn handle_create_entity(
        &self,
        shadow: &mut Option<ClientEntity>,
        reader: &mut PacketReader<'_>,
    ) -> Result<(), DispatchError> {
        let is_player = reader.read_bool()?;
        let entity_id = reader.read_u64()?;
        let type_name = reader.read_var_str()?;
        // x, y, z, yaw: consumed; position means nothing to a headless bot.
        for _ in 0..4 {
            reader.read_f32()?;
        }
        let fields = reader.read_data()?;

        debug!(
            bot = self.bot_id,
            entity = entity_id,
            %type_name,
            is_player,
            "create entity on client"
        );
        if !is_player {
            return Ok(());
        }

        if let Some(existing) = shadow.as_ref() {
            // Logged, not fatal: the newer create wins.
            error!(
                bot = self.bot_id,
                existing = existing.id,
                replacement = entity_id,
                "player shadow already set; replacing"
            );
        }
        *shadow = Some(ClientEntity::new(entity_id, type_name, true, fields));
        Ok(())
    }

    fn handle_destroy_entity(
        &self,
        shadow: &mut Option<ClientEntity>,
        reader: &mut PacketReader<'_>,
    ) -> Result<(), DispatchError> {
        let type_name = reader.read_var_str()?;
        let entity_id = reader.read_u64()?;
        debug!(bot = self.bot_id, entity = entity_id, %type_name, "destroy entity on client");

        if shadow.as_ref().is_some_and(|e| e.id == entity_id) {
            *shadow = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MethodTable;
    use gatesim_proto::{
        call_filtered_clients, create_entity_on_client, destroy_entity_on_client, pack_arg,
        with_gate_redirect_header, FieldValue,
    };
    use std::collections::HashMap;

    fn registry_with_defaults() -> Arc<MethodRegistry> {
        let mut table = MethodTable::new();
        table.register("OnLogin", |entity: &mut ClientEntity, (): ()| {
            entity.set_field("logged_in", FieldValue::Bool(true));
        });
        table.register(
            "OnAttrChange",
            |entity: &mut ClientEntity, (key, value): (String, FieldValue)| {
                entity.set_field(key, value);
            },
        );
        let mut registry = MethodRegistry::new();
        registry.set_default(table);
        Arc::new(registry)
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(0, registry_with_defaults(), FailurePolicy::Lenient)
    }

    fn create_player_frame(entity_id: u64, type_name: &str) -> Frame {
        create_entity_on_client(true, entity_id, type_name, [0.0; 4], &HashMap::new())
            .expect("build frame")
    }

    fn filtered_call(method: &str, args: &[Vec<u8>]) -> Frame {
        with_gate_redirect_header(call_filtered_clients(0, "", "", method, args), 1, 42)
    }

    #[test]
    fn create_then_destroy_clears_shadow() {
        let d = dispatcher();
        d.handle_frame(create_player_frame(1, "Avatar")).unwrap();
        assert_eq!(d.player().map(|e| e.id), Some(1));

        d.handle_frame(destroy_entity_on_client("Avatar", 1)).unwrap();
        assert!(d.player().is_none());
    }

    #[test]
    fn destroy_before_create_is_a_quiet_noop() {
        let d = dispatcher();
        d.handle_frame(destroy_entity_on_client("Avatar", 1)).unwrap();
        assert!(d.player().is_none());

        d.handle_frame(create_player_frame(1, "Avatar")).unwrap();
        assert_eq!(d.player().map(|e| e.id), Some(1));
    }

    #[test]
    fn destroy_with_mismatched_id_keeps_shadow() {
        let d = dispatcher();
        d.handle_frame(create_player_frame(1, "Avatar")).unwrap();
        d.handle_frame(destroy_entity_on_client("Avatar", 2)).unwrap();
        assert_eq!(d.player().map(|e| e.id), Some(1));
    }

    #[test]
    fn second_player_create_overwrites() {
        let d = dispatcher();
        d.handle_frame(create_player_frame(1, "Avatar")).unwrap();
        d.handle_frame(create_player_frame(2, "Account")).unwrap();

        let player = d.player().expect("shadow present");
        assert_eq!(player.id, 2);
        assert_eq!(player.type_name, "Account");
    }

    #[test]
    fn non_player_create_is_ignored() {
        let d = dispatcher();
        let frame =
            create_entity_on_client(false, 9, "Monster", [0.0; 4], &HashMap::new()).unwrap();
        d.handle_frame(frame).unwrap();
        assert!(d.player().is_none());
    }

    #[test]
    fn unknown_msg_type_is_fatal() {
        let d = dispatcher();
        let err = d
            .handle_frame(Frame {
                msg_type: 1,
                payload: Vec::new(),
            })
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn malformed_payload_is_recoverable() {
        let d = dispatcher();
        let err = d
            .handle_frame(Frame {
                msg_type: MT_CREATE_ENTITY_ON_CLIENT,
                payload: vec![0x01],
            })
            .unwrap_err();
        assert!(!err.is_fatal());

        // The next frame still processes normally.
        d.handle_frame(create_player_frame(5, "Avatar")).unwrap();
        assert_eq!(d.player().map(|e| e.id), Some(5));
    }

    #[test]
    fn filtered_call_reaches_registered_method() {
        let d = dispatcher();
        d.handle_frame(create_player_frame(1, "Avatar")).unwrap();

        let args = vec![
            pack_arg(&"title".to_owned()).unwrap(),
            pack_arg(&FieldValue::from("knight")).unwrap(),
        ];
        d.handle_frame(filtered_call("OnAttrChange", &args)).unwrap();

        let player = d.player().expect("shadow present");
        assert_eq!(player.field("title"), Some(&FieldValue::from("knight")));
    }

    #[test]
    fn redirect_header_is_stripped_before_parsing() {
        let d = dispatcher();
        d.handle_frame(create_player_frame(1, "Avatar")).unwrap();

        // Without the header the same body would misparse; with it, the
        // login call lands.
        d.handle_frame(filtered_call("OnLogin", &[])).unwrap();
        let player = d.player().expect("shadow present");
        assert_eq!(player.field("logged_in"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn missing_player_is_exempt_only_for_login() {
        let d = dispatcher();
        assert!(matches!(
            d.call_entity_method("OnLogin", &[]),
            CallOutcome::MissingPlayer { exempt: true }
        ));
        assert!(matches!(
            d.call_entity_method("OnAttrChange", &[]),
            CallOutcome::MissingPlayer { exempt: false }
        ));

        // Frame-level path drops the call without touching any shadow.
        d.handle_frame(filtered_call("OnLogin", &[])).unwrap();
        d.handle_frame(filtered_call("SomeMethod", &[])).unwrap();
        assert!(d.player().is_none());
    }

    #[test]
    fn unregistered_method_does_not_disturb_shadow() {
        let d = dispatcher();
        d.handle_frame(create_player_frame(1, "Avatar")).unwrap();
        d.handle_frame(filtered_call("NoSuchMethod", &[])).unwrap();
        assert_eq!(d.player().map(|e| e.id), Some(1));
    }
}
