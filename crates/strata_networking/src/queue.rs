//! # Command Queue
//!
//! Bounded multi-producer queue between network threads and the
//! simulation thread.
//!
//! ```text
//! net thread A --CommandSender--+
//!                               +--> CommandQueue --drain--> Session::tick
//! net thread B --CommandSender--+
//! ```
//!
//! Producers choose between blocking [`CommandSender::push`] (backpressure)
//! and [`CommandSender::try_push`] (drop on full). The simulation side
//! never blocks inside a tick: it drains what is queued, up to a limit.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use thiserror::Error;

use crate::command::SimCommand;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Why a command could not be queued. The command is handed back.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    /// The queue is at capacity.
    #[error("command queue is full")]
    Full(SimCommand),
    /// The simulation side has shut down.
    #[error("command queue is closed")]
    Closed(SimCommand),
}

impl QueueError {
    /// Recovers the rejected command.
    #[must_use]
    pub fn into_command(self) -> SimCommand {
        match self {
            Self::Full(cmd) | Self::Closed(cmd) => cmd,
        }
    }
}

/// Producer handle, cloneable across network threads.
#[derive(Clone, Debug)]
pub struct CommandSender {
    sender: Sender<SimCommand>,
}

impl CommandSender {
    /// Queues a command, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// [`QueueError::Closed`] if the queue was dropped.
    pub fn push(&self, command: SimCommand) -> Result<(), QueueError> {
        self.sender
            .send(command)
            .map_err(|err| QueueError::Closed(err.into_inner()))
    }

    /// Queues a command without waiting.
    ///
    /// # Errors
    ///
    /// [`QueueError::Full`] at capacity, [`QueueError::Closed`] if the
    /// queue was dropped.
    pub fn try_push(&self, command: SimCommand) -> Result<(), QueueError> {
        self.sender.try_send(command).map_err(|err| match err {
            TrySendError::Full(cmd) => QueueError::Full(cmd),
            TrySendError::Disconnected(cmd) => QueueError::Closed(cmd),
        })
    }
}

/// Consumer side, owned by the simulation thread.
pub struct CommandQueue {
    sender: Sender<SimCommand>,
    receiver: Receiver<SimCommand>,
    capacity: usize,
}

impl CommandQueue {
    /// Creates a queue holding at most `capacity` commands (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// A producer handle for another thread.
    #[must_use]
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            sender: self.sender.clone(),
        }
    }

    /// Maximum number of queued commands.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Commands currently queued.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Waits for the next command.
    ///
    /// The queue keeps a sender of its own, so this only returns `None` if
    /// the channel is torn down.
    pub fn pop(&self) -> Option<SimCommand> {
        self.receiver.recv().ok()
    }

    /// Waits up to `timeout` for the next command.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<SimCommand> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Takes the next command if one is queued.
    pub fn try_pop(&self) -> Option<SimCommand> {
        self.receiver.try_recv().ok()
    }

    /// Takes up to `limit` queued commands in FIFO order without waiting.
    pub fn drain(&self, limit: usize) -> Vec<SimCommand> {
        self.receiver.try_iter().take(limit).collect()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
