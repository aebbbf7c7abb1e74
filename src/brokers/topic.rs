//! Topic: a named message stream fanned out to every channel.
//!
//! Messages published while the topic has no channels (or is paused) wait
//! in the topic's own queue and are pumped out once that changes.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use bytes::Bytes;
use parking_lot::Mutex;
use crate::brokers::backend::{backend_for, BackendQueue};
use crate::brokers::broker::BrokerOptions;
use crate::brokers::channel::Channel;
use crate::brokers::message::Message;
use crate::brokers::registry::Registry;
use crate::stats::quantile::E2eLatencyStream;

pub struct Topic {
    name: String,
    options: BrokerOptions,
    channels: Registry<Channel>,

    memory_queue: Mutex<VecDeque<Message>>,
    // Mirrors memory_queue.len() so depth() never waits on the mutex
    memory_depth: AtomicI64,
    backend: Box<dyn BackendQueue>,

    message_count: AtomicU64,
    paused: AtomicBool,
}

impl Topic {
    pub fn new(name: &str, options: BrokerOptions) -> Self {
        Self {
            name: name.to_string(),
            channels: Registry::new(),
            memory_queue: Mutex::new(VecDeque::new()),
            memory_depth: AtomicI64::new(0),
            backend: backend_for(name),
            message_count: AtomicU64::new(0),
            paused: AtomicBool::new(false),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channels(&self) -> &Registry<Channel> {
        &self.channels
    }

    // ========================================
    // CHANNELS
    // ========================================

    pub fn get_or_create_channel(&self, name: &str) -> Arc<Channel> {
        let (channel, created) = self
            .channels
            .get_or_insert_with(name, || Channel::new(&self.name, name, &self.options));
        if created {
            tracing::info!("[Topic] {}: created channel '{}'", self.name, name);
            self.pump();
        }
        channel
    }

    pub fn get_existing_channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.lookup(name)
    }

    /// Collectors already holding the channel keep reading it until they finish.
    pub fn delete_channel(&self, name: &str) -> bool {
        let removed = self.channels.remove(name).is_some();
        if removed {
            tracing::info!("[Topic] {}: deleted channel '{}'", self.name, name);
        }
        removed
    }

    // ========================================
    // MESSAGE FLOW
    // ========================================

    pub fn publish(&self, body: Bytes) {
        self.put_message(Message::new(body));
    }

    pub fn put_message(&self, msg: Message) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
        self.enqueue(msg);
        self.pump();
    }

    /// Drains the topic queue into every channel. No-op while paused or
    /// while there is nobody to deliver to.
    pub fn pump(&self) -> usize {
        if self.is_paused() {
            return 0;
        }
        let channels = self.channels.snapshot();
        if channels.is_empty() {
            return 0;
        }

        let mut pumped = 0;
        while let Some(msg) = self.next_pending() {
            for channel in &channels {
                let mut copy = msg.clone();
                copy.attempts = 0;
                channel.put_message(copy);
            }
            pumped += 1;
        }
        pumped
    }

    fn next_pending(&self) -> Option<Message> {
        let next = {
            let mut queue = self.memory_queue.lock();
            let next = queue.pop_front();
            self.memory_depth.store(queue.len() as i64, Ordering::Relaxed);
            next
        };
        next.or_else(|| self.backend.read())
    }

    fn enqueue(&self, msg: Message) {
        let mut queue = self.memory_queue.lock();
        if queue.len() < self.options.mem_queue_size {
            queue.push_back(msg);
            self.memory_depth.store(queue.len() as i64, Ordering::Relaxed);
        } else {
            drop(queue);
            self.backend.put(msg);
        }
    }

    // ========================================
    // PAUSE
    // ========================================

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
        tracing::info!("[Topic] {}: paused", self.name);
    }

    pub fn unpause(&self) {
        self.paused.store(false, Ordering::Relaxed);
        tracing::info!("[Topic] {}: unpaused", self.name);
        self.pump();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    // ========================================
    // COUNTERS
    // ========================================

    pub fn depth(&self) -> i64 {
        self.memory_depth.load(Ordering::Relaxed) + self.backend.depth()
    }

    pub fn backend_depth(&self) -> i64 {
        self.backend.depth()
    }

    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::Relaxed)
    }

    /// Merges the latency window of every current channel into a fresh
    /// stream. Copies membership first; the merge itself runs unlocked.
    pub fn aggregate_channel_e2e_latency(&self) -> E2eLatencyStream {
        let aggregate =
            E2eLatencyStream::new(self.options.e2e_percentiles.clone(), self.options.e2e_window);
        if !aggregate.is_enabled() {
            return aggregate;
        }
        for channel in self.channels.snapshot() {
            aggregate.merge(channel.e2e_latency());
        }
        aggregate
    }
}
