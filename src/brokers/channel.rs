//! Channel: an independently consumed copy of a topic's message stream.
//!
//! Counters are plain relaxed atomics updated by the consume paths. The
//! client registry lock guards membership only.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use parking_lot::Mutex;
use crate::brokers::backend::{backend_for, BackendQueue};
use crate::brokers::broker::BrokerOptions;
use crate::brokers::client::Client;
use crate::brokers::message::Message;
use crate::brokers::registry::Registry;
use crate::stats::models::ClientStats;
use crate::stats::quantile::E2eLatencyStream;
use crate::utils::utils_time::current_time_ns;

pub struct Channel {
    topic_name: String,
    name: String,
    clients: Registry<dyn Client>,

    memory_queue: Mutex<VecDeque<Message>>,
    // Mirrors memory_queue.len() so depth() never waits on the mutex
    memory_depth: AtomicI64,
    mem_queue_size: usize,
    backend: Box<dyn BackendQueue>,
    deferred: Mutex<VecDeque<Message>>,

    in_flight_count: AtomicU64,
    deferred_count: AtomicU64,
    message_count: AtomicU64,
    requeue_count: AtomicU64,
    timeout_count: AtomicU64,
    paused: AtomicBool,

    e2e_latency: E2eLatencyStream,
}

impl Channel {
    pub fn new(topic_name: &str, name: &str, options: &BrokerOptions) -> Self {
        Self {
            topic_name: topic_name.to_string(),
            name: name.to_string(),
            clients: Registry::new(),
            memory_queue: Mutex::new(VecDeque::new()),
            memory_depth: AtomicI64::new(0),
            mem_queue_size: options.mem_queue_size,
            backend: backend_for(name),
            deferred: Mutex::new(VecDeque::new()),
            in_flight_count: AtomicU64::new(0),
            deferred_count: AtomicU64::new(0),
            message_count: AtomicU64::new(0),
            requeue_count: AtomicU64::new(0),
            timeout_count: AtomicU64::new(0),
            paused: AtomicBool::new(false),
            e2e_latency: E2eLatencyStream::new(options.e2e_percentiles.clone(), options.e2e_window),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic_name(&self) -> &str {
        &self.topic_name
    }

    // ========================================
    // MESSAGE FLOW
    // ========================================

    pub fn put_message(&self, msg: Message) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
        self.enqueue(msg);
    }

    /// Hands the next ready message to a consumer and marks it in flight.
    pub fn deliver(&self) -> Option<Message> {
        if self.is_paused() {
            return None;
        }
        let next = {
            let mut queue = self.memory_queue.lock();
            let next = queue.pop_front();
            self.memory_depth.store(queue.len() as i64, Ordering::Relaxed);
            next
        };
        let mut msg = next.or_else(|| self.backend.read())?;
        msg.attempts = msg.attempts.saturating_add(1);
        self.in_flight_count.fetch_add(1, Ordering::Relaxed);
        Some(msg)
    }

    /// Acknowledged by the consumer: records publish-to-finish latency.
    pub fn finish_message(&self, msg: &Message) {
        decrement(&self.in_flight_count);
        let latency_ns = current_time_ns().saturating_sub(msg.timestamp_ns).max(0) as u64;
        self.e2e_latency.insert(latency_ns);
    }

    /// Puts an in-flight message back; with `defer` it waits for `flush_deferred`.
    pub fn requeue_message(&self, msg: Message, defer: bool) {
        decrement(&self.in_flight_count);
        self.requeue_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("[Channel] {}/{}: message {} requeued (defer={})", self.topic_name, self.name, msg.id, defer);
        if defer {
            self.deferred_count.fetch_add(1, Ordering::Relaxed);
            self.deferred.lock().push_back(msg);
        } else {
            self.enqueue(msg);
        }
    }

    pub fn timeout_message(&self, msg: Message) {
        decrement(&self.in_flight_count);
        self.timeout_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("[Channel] {}/{}: message {} timed out", self.topic_name, self.name, msg.id);
        self.enqueue(msg);
    }

    /// Moves every deferred message back to the ready queue.
    pub fn flush_deferred(&self) -> usize {
        let drained: Vec<Message> = self.deferred.lock().drain(..).collect();
        let count = drained.len();
        for msg in drained {
            decrement(&self.deferred_count);
            self.enqueue(msg);
        }
        count
    }

    fn enqueue(&self, msg: Message) {
        let mut queue = self.memory_queue.lock();
        if queue.len() < self.mem_queue_size {
            queue.push_back(msg);
            self.memory_depth.store(queue.len() as i64, Ordering::Relaxed);
        } else {
            drop(queue);
            self.backend.put(msg);
        }
    }

    // ========================================
    // CLIENTS
    // ========================================

    pub fn add_client(&self, client: Arc<dyn Client>) {
        let id = client.id().to_string();
        if self.clients.insert(&id, client).is_none() {
            tracing::debug!("[Channel] {}/{}: client {} attached", self.topic_name, self.name, id);
        }
    }

    pub fn remove_client(&self, client_id: i64) -> bool {
        let removed = self.clients.remove(&client_id.to_string()).is_some();
        if removed {
            tracing::debug!("[Channel] {}/{}: client {} detached", self.topic_name, self.name, client_id);
        }
        removed
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Every client's snapshot, taken in one pass under the registry read lock.
    pub fn client_snapshots(&self) -> Vec<ClientStats> {
        self.clients.map_snapshot(|client| client.stats())
    }

    // ========================================
    // PAUSE
    // ========================================

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    pub fn unpause(&self) {
        self.paused.store(false, Ordering::Relaxed);
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

    pub fn in_flight_count(&self) -> u64 {
        self.in_flight_count.load(Ordering::Relaxed)
    }

    pub fn deferred_count(&self) -> u64 {
        self.deferred_count.load(Ordering::Relaxed)
    }

    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::Relaxed)
    }

    pub fn requeue_count(&self) -> u64 {
        self.requeue_count.load(Ordering::Relaxed)
    }

    pub fn timeout_count(&self) -> u64 {
        self.timeout_count.load(Ordering::Relaxed)
    }

    pub fn e2e_latency(&self) -> &E2eLatencyStream {
        &self.e2e_latency
    }
}

fn decrement(counter: &AtomicU64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
}
