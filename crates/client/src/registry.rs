//! Explicit method registration for server-to-client entity calls.
//!
//! Calls arrive as a method name plus positionally-encoded opaque
//! arguments. Instead of resolving names reflectively at call time, every
//! invocable method is registered up front with its declared argument
//! tuple; each opaque argument decodes into the type its position declares.

use crate::entity::ClientEntity;
use gatesim_proto::{unpack_arg, WireError};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Failure while decoding arguments for a resolved method.
#[derive(Debug, Error)]
pub enum CallError {
    /// Wrong number of wire arguments for the declared tuple.
    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch {
        /// Arguments the handler declares.
        expected: usize,
        /// Arguments the frame carried.
        got: usize,
    },
    /// One argument's bytes did not decode into the declared type.
    #[error("argument {index} failed to decode: {source}")]
    BadArgument {
        /// Zero-based argument position.
        index: usize,
        /// Underlying decode failure.
        #[source]
        source: WireError,
    },
}

/// Result of resolving and invoking a method on the shadow entity.
#[derive(Debug)]
pub enum CallOutcome {
    /// Handler resolved and ran.
    Invoked,
    /// No handler registered under this name.
    UnknownMethod,
    /// No player shadow present. `exempt` marks the login/teardown race
    /// that must not be reported as an error.
    MissingPlayer {
        /// Whether the method is exempt from the missing-player error.
        exempt: bool,
    },
    /// Handler resolved but its arguments did not decode.
    Failed(CallError),
}

/// Decode a positional argument list into a typed tuple.
pub trait FromArgs: Sized {
    /// Number of wire arguments consumed.
    const ARITY: usize;

    /// Decode each positional argument into its declared type.
    fn from_args(args: &[Vec<u8>]) -> Result<Self, CallError>;
}

fn decode_at<T: DeserializeOwned>(args: &[Vec<u8>], index: usize) -> Result<T, CallError> {
    unpack_arg(&args[index]).map_err(|source| CallError::BadArgument { index, source })
}

fn check_arity(expected: usize, args: &[Vec<u8>]) -> Result<(), CallError> {
    if args.len() != expected {
        return Err(CallError::ArityMismatch {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

impl FromArgs for () {
    const ARITY: usize = 0;

    fn from_args(args: &[Vec<u8>]) -> Result<Self, CallError> {
        check_arity(Self::ARITY, args)
    }
}

impl<A: DeserializeOwned> FromArgs for (A,) {
    const ARITY: usize = 1;

    fn from_args(args: &[Vec<u8>]) -> Result<Self, CallError> {
        check_arity(Self::ARITY, args)?;
        Ok((decode_at(args, 0)?,))
    }
}

impl<A: DeserializeOwned, B: DeserializeOwned> FromArgs for (A, B) {
    const ARITY: usize = 2;

    fn from_args(args: &[Vec<u8>]) -> Result<Self, CallError> {
        check_arity(Self::ARITY, args)?;
        Ok((decode_at(args, 0)?, decode_at(args, 1)?))
    }
}

impl<A: DeserializeOwned, B: DeserializeOwned, C: DeserializeOwned> FromArgs for (A, B, C) {
    const ARITY: usize = 3;

    fn from_args(args: &[Vec<u8>]) -> Result<Self, CallError> {
        check_arity(Self::ARITY, args)?;
        Ok((
            decode_at(args, 0)?,
            decode_at(args, 1)?,
            decode_at(args, 2)?,
        ))
    }
}

type Handler = Box<dyn Fn(&mut ClientEntity, &[Vec<u8>]) -> Result<(), CallError> + Send + Sync>;

/// Invocable methods for one entity type, built once at startup.
#[derive(Default)]
pub struct MethodTable {
    handlers: HashMap<String, Handler>,
}

impl MethodTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`, declaring its argument tuple type.
    pub fn register<A, F>(&mut self, name: &str, handler: F)
    where
        A: FromArgs + 'static,
        F: Fn(&mut ClientEntity, A) + Send + Sync + 'static,
    {
        self.handlers.insert(
            name.to_owned(),
            Box::new(move |entity, args| {
                let decoded = A::from_args(args)?;
                handler(entity, decoded);
                Ok(())
            }),
        );
    }

    /// Whether a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Resolve `name` and run it against the entity.
    pub fn invoke(&self, name: &str, entity: &mut ClientEntity, args: &[Vec<u8>]) -> CallOutcome {
        match self.handlers.get(name) {
            None => CallOutcome::UnknownMethod,
            Some(handler) => match handler(entity, args) {
                Ok(()) => CallOutcome::Invoked,
                Err(err) => CallOutcome::Failed(err),
            },
        }
    }
}

/// Per-entity-type method tables.
#[derive(Default)]
pub struct MethodRegistry {
    tables: HashMap<String, Arc<MethodTable>>,
    default_table: Option<Arc<MethodTable>>,
}

impl MethodRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a table for entities of `type_name`.
    pub fn insert(&mut self, type_name: &str, table: MethodTable) {
        self.tables.insert(type_name.to_owned(), Arc::new(table));
    }

    /// Table used when an entity type has no dedicated one.
    pub fn set_default(&mut self, table: MethodTable) {
        self.default_table = Some(Arc::new(table));
    }

    /// Look up the table for an entity type.
    pub fn table_for(&self, type_name: &str) -> Option<&Arc<MethodTable>> {
        self.tables.get(type_name).or(self.default_table.as_ref())
    }
}
