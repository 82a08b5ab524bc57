use crate::error::PacerResult;
use crate::request::RequestTarget;
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::oneshot;
use uuid::Uuid;

/// The scheduler's record of one pending or retrying request
#[derive(Debug)]
pub struct Descriptor {
    pub id: Uuid,
    pub target: RequestTarget,
    /// Counted dispatch attempts, starting at 1. Throttled responses do not advance it.
    pub attempt: u32,
    reply: oneshot::Sender<PacerResult<Value>>,
}

impl Descriptor {
    pub fn new(target: RequestTarget) -> (Self, oneshot::Receiver<PacerResult<Value>>) {
        let (reply, rx) = oneshot::channel();
        let descriptor = Self {
            id: Uuid::new_v4(),
            target,
            attempt: 1,
            reply,
        };
        (descriptor, rx)
    }

    /// Deliver the final outcome. Consumes the descriptor, so it happens at most once.
    pub fn resolve(self, outcome: PacerResult<Value>) {
        // The caller may have stopped waiting; nothing else to do then.
        let _ = self.reply.send(outcome);
    }
}

/// FIFO for fresh submissions with retries jumping to the head
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: VecDeque<Descriptor>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, descriptor: Descriptor) {
        self.items.push_back(descriptor);
    }

    pub fn push_front(&mut self, descriptor: Descriptor) {
        self.items.push_front(descriptor);
    }

    /// Remove up to `limit` descriptors from the head, oldest first
    pub fn take_batch(&mut self, limit: usize) -> Vec<Descriptor> {
        let count = limit.min(self.items.len());
        self.items.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
