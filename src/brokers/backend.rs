//! Overflow storage behind the in-memory queues.
//! The stats core only ever reads `depth()`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use parking_lot::Mutex;
use crate::brokers::message::Message;

pub const EPHEMERAL_SUFFIX: &str = "#ephemeral";

pub trait BackendQueue: Send + Sync {
    fn put(&self, msg: Message);
    fn read(&self) -> Option<Message>;
    /// Non-blocking.
    fn depth(&self) -> i64;
}

/// Backend for ephemeral topics/channels: overflow is dropped.
pub struct DummyBackendQueue;

impl BackendQueue for DummyBackendQueue {
    fn put(&self, _msg: Message) {}

    fn read(&self) -> Option<Message> {
        None
    }

    fn depth(&self) -> i64 {
        0
    }
}

/// Unbounded overflow list. Stands in for a disk queue.
#[derive(Default)]
pub struct MemoryBackendQueue {
    messages: Mutex<VecDeque<Message>>,
    // Mirrors messages.len() so depth() never waits on the mutex
    depth: AtomicI64,
}

impl MemoryBackendQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendQueue for MemoryBackendQueue {
    fn put(&self, msg: Message) {
        let mut messages = self.messages.lock();
        messages.push_back(msg);
        self.depth.store(messages.len() as i64, Ordering::Relaxed);
    }

    fn read(&self) -> Option<Message> {
        let mut messages = self.messages.lock();
        let msg = messages.pop_front();
        self.depth.store(messages.len() as i64, Ordering::Relaxed);
        msg
    }

    fn depth(&self) -> i64 {
        self.depth.load(Ordering::Relaxed)
    }
}

pub fn is_ephemeral(name: &str) -> bool {
    name.ends_with(EPHEMERAL_SUFFIX)
}

pub fn backend_for(name: &str) -> Box<dyn BackendQueue> {
    if is_ephemeral(name) {
        Box::new(DummyBackendQueue)
    } else {
        Box::new(MemoryBackendQueue::new())
    }
}
