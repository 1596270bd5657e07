//! Simulated game clients ("bots") driving load against a gateway cluster.
//!
//! Each bot owns two tasks: a receive loop pulling frames off its WebSocket
//! connection, and a dispatch/scheduler loop consuming them in order while
//! flushing outbound traffic on a fixed tick.

mod bot;
mod connection;
mod dispatch;
mod entity;
mod policy;
mod registry;
mod swarm;
mod tick;
mod transport;

pub use bot::Bot;
pub use connection::{ConnError, FrameReceiver, FrameSender, FramedConnection};
pub use dispatch::{DispatchError, Dispatcher};
pub use entity::ClientEntity;
pub use policy::FailurePolicy;
pub use registry::{CallError, CallOutcome, FromArgs, MethodRegistry, MethodTable};
pub use swarm::run_swarm;
pub use tick::TickDriver;
pub use transport::{connect_gateway, WsStream};
