//! One simulated client: connect, receive, dispatch, tick.

use crate::connection::{ConnError, FrameReceiver, FrameSender, FramedConnection};
use crate::dispatch::Dispatcher;
use crate::policy::FailurePolicy;
use crate::registry::MethodRegistry;
use crate::tick::TickDriver;
use crate::transport::{connect_gateway, WsStream};
use anyhow::Result;
use gatesim_config::{GateConfig, SwarmConfig};
use gatesim_proto::Frame;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Barrier};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A simulated game client driving load against one gateway.
pub struct Bot {
    id: u32,
    config: Arc<SwarmConfig>,
    dispatcher: Arc<Dispatcher>,
    ticker: Arc<TickDriver>,
    policy: FailurePolicy,
}

impl Bot {
    /// Build a bot; no connection is attempted until [`Bot::run`].
    pub fn new(
        id: u32,
        config: Arc<SwarmConfig>,
        registry: Arc<MethodRegistry>,
        ticker: Arc<TickDriver>,
    ) -> Self {
        let policy = FailurePolicy::from_strict(config.strict);
        Self {
            id,
            dispatcher: Arc::new(Dispatcher::new(id, registry, policy)),
            config,
            ticker,
            policy,
        }
    }

    /// The bot's dispatcher, exposing the entity shadow for inspection.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    /// Connect (retrying forever), start the receive loop, rendezvous with
    /// the rest of the swarm, then run the dispatch/scheduler loop.
    ///
    /// Returns only on a protocol violation; otherwise the loop runs until
    /// the process exits.
    pub async fn run(self, all_connected: Arc<Barrier>) -> Result<()> {
        info!(bot = self.id, "bot starting");

        let gate = self.pick_gate().clone();
        let ws = self.connect_with_retry(&gate).await;
        info!(bot = self.id, host = %gate.host, port = gate.port, "connected to gateway");

        let (sender, receiver) = FramedConnection::new(ws, gate.compress).split();
        // Capacity 1: a slow dispatcher stalls the receive loop.
        let (frame_tx, frame_rx) = mpsc::channel(1);
        let _recv_task = spawn_recv_loop(self.id, receiver, frame_tx);

        all_connected.wait().await;
        debug!(bot = self.id, "all bots connected; entering main loop");

        self.main_loop(sender, frame_rx).await
    }

    fn pick_gate(&self) -> &GateConfig {
        let index = {
            let mut rng = rand::thread_rng();
            rng.gen_range(0..self.config.gates.len())
        };
        &self.config.gates[index]
    }

    /// Retry forever with jittered delay; no retry cap or circuit breaker.
    /// An unreachable gateway keeps the bot in this loop.
    async fn connect_with_retry(&self, gate: &GateConfig) -> WsStream {
        loop {
            match connect_gateway(gate).await {
                Ok(ws) => return ws,
                Err(err) => {
                    error!(bot = self.id, error = %format!("{err:#}"), "gateway connect failed");
                    self.policy.escalate();
                    let delay = {
                        let mut rng = rand::thread_rng();
                        rng.gen_range(
                            self.config.retry.min_delay_ms..=self.config.retry.max_delay_ms,
                        )
                    };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    async fn main_loop(
        &self,
        mut sender: FrameSender,
        mut frame_rx: mpsc::Receiver<Frame>,
    ) -> Result<()> {
        let mut flush_timer = tokio::time::interval(self.config.flush_interval());
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut queue_open = true;

        loop {
            tokio::select! {
                maybe_frame = frame_rx.recv(), if queue_open => match maybe_frame {
                    Some(frame) => match self.dispatcher.handle_frame(frame) {
                        Ok(()) => {}
                        Err(err) if err.is_fatal() => {
                            error!(bot = self.id, %err, "protocol violation; bot halting");
                            self.policy.escalate();
                            return Err(err.into());
                        }
                        Err(err) => {
                            error!(bot = self.id, %err, "dropping malformed frame");
                            self.policy.escalate();
                        }
                    },
                    None => {
                        // The receive loop died. The harness keeps the
                        // scheduler ticking on the dead connection; only the
                        // frame branch is disabled.
                        warn!(bot = self.id, "frame queue closed; continuing scheduler only");
                        queue_open = false;
                    }
                },
                _ = flush_timer.tick() => {
                    if let Err(err) = sender.flush("bot-loop").await {
                        debug!(bot = self.id, %err, "flush failed");
                    }
                    self.ticker.tick();
                }
            }
        }
    }
}

/// Receive loop: decouples transport reads from dispatch.
///
/// Transport errors terminate only this task; the dispatch loop keeps
/// draining whatever was already queued.
fn spawn_recv_loop(
    bot_id: u32,
    mut receiver: FrameReceiver,
    frame_tx: mpsc::Sender<Frame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(frame) => {
                    if frame_tx.send(frame).await.is_err() {
                        debug!(bot = bot_id, "dispatch loop gone; receive loop exiting");
                        break;
                    }
                }
                Err(ConnError::Timeout) => continue,
                Err(ConnError::Closed) => {
                    warn!(bot = bot_id, "connection closed; receive loop exiting");
                    break;
                }
                Err(err) => {
                    error!(bot = bot_id, %err, "receive failed; receive loop exiting");
                    break;
                }
            }
        }
    })
}
