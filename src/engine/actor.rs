use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::HostConfig;
use crate::core::{Block, BlockError, Emission, SlotCall, Value};
use crate::engine::state::BlockState;
use crate::observability::SlotMetrics;
use crate::resilience::{ResilientBlock, SlotOutcome};

type Reply = oneshot::Sender<Result<Vec<Emission>, BlockError>>;

enum Command {
    Call {
        call: SlotCall,
        reply: Option<Reply>,
    },
    Subscribe {
        signal: String,
        sender: mpsc::Sender<Vec<Value>>,
        reply: oneshot::Sender<Result<(), BlockError>>,
    },
    Shutdown,
}

/// Cloneable handle for sending slot calls to a running [`BlockActor`]
#[derive(Clone)]
pub struct BlockHandle {
    path: String,
    inbox: mpsc::Sender<Command>,
    state: watch::Receiver<BlockState>,
    metrics: Arc<SlotMetrics>,
    subscriber_capacity: usize,
}

impl BlockHandle {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Invoke a slot and wait for the signals it emitted
    pub async fn call(&self, slot: &str, args: Vec<Value>) -> Result<Vec<Emission>> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Call {
            call: SlotCall::new(slot, args),
            reply: Some(reply),
        })
        .await?;

        let result = response
            .await
            .map_err(|_| anyhow!("Block {} stopped before answering {}", self.path, slot))?;
        Ok(result?)
    }

    /// Enqueue a slot call without waiting for it to run
    pub async fn post(&self, slot: &str, args: Vec<Value>) -> Result<()> {
        self.send(Command::Call {
            call: SlotCall::new(slot, args),
            reply: None,
        })
        .await
    }

    /// Receive the arguments of every later emission of `signal`
    pub async fn subscribe(&self, signal: &str) -> Result<mpsc::Receiver<Vec<Value>>> {
        let (sender, receiver) = mpsc::channel(self.subscriber_capacity);
        let (reply, response) = oneshot::channel();
        self.send(Command::Subscribe {
            signal: signal.to_string(),
            sender,
            reply,
        })
        .await?;

        response
            .await
            .map_err(|_| anyhow!("Block {} stopped before subscribing {}", self.path, signal))??;
        Ok(receiver)
    }

    pub fn state(&self) -> BlockState {
        self.state.borrow().clone()
    }

    /// Watch lifecycle transitions
    pub fn watch_state(&self) -> watch::Receiver<BlockState> {
        self.state.clone()
    }

    pub fn metrics(&self) -> Arc<SlotMetrics> {
        self.metrics.clone()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.inbox
            .send(command)
            .await
            .map_err(|_| anyhow!("Block {} is no longer running", self.path))
    }
}

/// Owns one block on its own task and serializes every slot call to it
pub struct BlockActor {
    handle: BlockHandle,
    task: JoinHandle<Result<(), BlockError>>,
}

impl BlockActor {
    pub fn spawn(block: Box<dyn Block>, config: &HostConfig) -> Self {
        let path = block.path().to_string();
        let capacity = config.inbox_capacity.max(1);
        let (inbox, rx) = mpsc::channel(capacity);
        let (state_tx, state_rx) = watch::channel(BlockState::Idle);
        let metrics = Arc::new(SlotMetrics::new(&path));

        let resilient = ResilientBlock::new(block, metrics.clone(), config.error_policy);
        let task = tokio::spawn(run(resilient, rx, state_tx));

        info!(path = %path, policy = ?config.error_policy, "spawned block actor");
        Self {
            handle: BlockHandle {
                path,
                inbox,
                state: state_rx,
                metrics,
                subscriber_capacity: capacity,
            },
            task,
        }
    }

    pub fn handle(&self) -> BlockHandle {
        self.handle.clone()
    }

    /// Stop after the calls already queued and wait for the task.
    /// Returns the error that stopped the block, if any.
    pub async fn shutdown(self) -> Result<()> {
        // The task may already have stopped on its own
        let _ = self.handle.inbox.send(Command::Shutdown).await;
        let path = self.handle.path.clone();
        drop(self.handle);

        self.task
            .await
            .with_context(|| format!("Block task for {} panicked", path))?
            .with_context(|| format!("Block {} failed", path))
    }
}

impl std::ops::Deref for BlockActor {
    type Target = BlockHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

fn transition(state: &watch::Sender<BlockState>, next: BlockState) {
    state.send_if_modified(|current| {
        if current.can_transition_to(&next) {
            debug!(from = current.name(), to = next.name(), "block state transition");
            *current = next;
            true
        } else {
            warn!(from = current.name(), to = next.name(), "invalid block state transition");
            false
        }
    });
}

/// Deliver emissions without waiting on subscribers. A full subscriber
/// queue loses the emission; a dropped receiver unsubscribes.
fn forward(
    path: &str,
    subscribers: &mut HashMap<String, Vec<mpsc::Sender<Vec<Value>>>>,
    emissions: &[Emission],
) {
    for emission in emissions {
        let Some(senders) = subscribers.get_mut(&emission.signal) else {
            continue;
        };
        senders.retain(|sender| match sender.try_send(emission.args.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(path = %path, signal = %emission.signal, "subscriber queue full, emission dropped");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }
}

async fn run(
    mut block: ResilientBlock,
    mut inbox: mpsc::Receiver<Command>,
    state: watch::Sender<BlockState>,
) -> Result<(), BlockError> {
    if let Err(e) = block.activate().await {
        transition(&state, BlockState::Error { error_msg: e.to_string() });
        return Err(e);
    }
    transition(&state, BlockState::Active);

    let signals = block.inner().signals();
    let path = block.inner().path().to_string();
    let mut subscribers: HashMap<String, Vec<mpsc::Sender<Vec<Value>>>> = HashMap::new();

    while let Some(command) = inbox.recv().await {
        match command {
            Command::Call { call, reply } => match block.handle(call) {
                SlotOutcome::Emitted(emissions) => {
                    forward(&path, &mut subscribers, &emissions);
                    if let Some(reply) = reply {
                        let _ = reply.send(Ok(emissions));
                    }
                }
                SlotOutcome::Skipped(e) => {
                    if let Some(reply) = reply {
                        let _ = reply.send(Err(e));
                    }
                }
                SlotOutcome::Failed(e) => {
                    if let Some(reply) = reply {
                        let _ = reply.send(Err(e.clone()));
                    }
                    transition(&state, BlockState::Error { error_msg: e.to_string() });
                    return Err(e);
                }
            },
            Command::Subscribe { signal, sender, reply } => {
                let result = if signals.contains(&signal) {
                    subscribers.entry(signal).or_default().push(sender);
                    Ok(())
                } else {
                    Err(BlockError::UnknownSignal(signal))
                };
                let _ = reply.send(result);
            }
            Command::Shutdown => break,
        }
    }

    if let Err(e) = block.deactivate().await {
        transition(&state, BlockState::Error { error_msg: e.to_string() });
        return Err(e);
    }
    transition(&state, BlockState::Inactive);
    Ok(())
}
