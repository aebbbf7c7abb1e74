//! Stats DTOs. JSON field names are consumed by external monitoring and must
//! not change.
//!
//! Counters are read with independent relaxed loads, so a parent's
//! `message_count` is not guaranteed to match the sum of its children at any
//! instant. Do not add cross-counter locking to "fix" this.

use serde::{Deserialize, Serialize};
use crate::brokers::channel::Channel;
use crate::brokers::topic::Topic;
use crate::stats::quantile::QuantileResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicStats {
    pub topic_name: String,
    pub channels: Vec<ChannelStats>,
    pub depth: i64,
    pub backend_depth: i64,
    pub message_count: u64,
    pub paused: bool,
    pub e2e_processing_latency: Option<QuantileResult>,
}

impl TopicStats {
    /// Reads the topic counters and merges the channel latency streams.
    /// Must run outside any broker lock.
    pub fn new(topic: &Topic, channels: Vec<ChannelStats>) -> Self {
        Self {
            topic_name: topic.name().to_string(),
            channels,
            depth: topic.depth(),
            backend_depth: topic.backend_depth(),
            message_count: topic.message_count(),
            paused: topic.is_paused(),
            e2e_processing_latency: topic.aggregate_channel_e2e_latency().result(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub channel_name: String,
    pub depth: i64,
    pub backend_depth: i64,
    pub in_flight_count: u64,
    pub deferred_count: u64,
    pub message_count: u64,
    pub requeue_count: u64,
    pub timeout_count: u64,
    pub clients: Vec<ClientStats>,
    pub paused: bool,
    pub e2e_processing_latency: Option<QuantileResult>,
}

impl ChannelStats {
    /// Must run outside the channel lock: the latency result sorts the window.
    pub fn new(channel: &Channel, clients: Vec<ClientStats>) -> Self {
        Self {
            channel_name: channel.name().to_string(),
            depth: channel.depth(),
            backend_depth: channel.backend_depth(),
            in_flight_count: channel.in_flight_count(),
            deferred_count: channel.deferred_count(),
            message_count: channel.message_count(),
            requeue_count: channel.requeue_count(),
            timeout_count: channel.timeout_count(),
            clients,
            paused: channel.is_paused(),
            e2e_processing_latency: channel.e2e_latency().result(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientStats {
    pub client_id: String,
    pub hostname: String,
    pub version: String,
    pub remote_address: String,
    pub state: i32,
    pub ready_count: i64,
    pub in_flight_count: i64,
    pub message_count: u64,
    pub finish_count: u64,
    pub requeue_count: u64,
    pub connect_ts: i64,
    pub sample_rate: i32,
    pub deflate: bool,
    pub snappy: bool,
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub authed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_identity: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_identity_url: String,

    pub tls: bool,
    pub tls_cipher_suite: String,
    pub tls_version: String,
    pub tls_negotiated_protocol: String,
    pub tls_negotiated_protocol_is_mutual: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemSample {
    pub heap_objects: u64,
    pub heap_idle_bytes: u64,
    pub heap_in_use_bytes: u64,
    pub heap_released_bytes: u64,
    pub gc_pause_usec_100: u64,
    pub gc_pause_usec_99: u64,
    pub gc_pause_usec_95: u64,
    pub next_gc_bytes: u64,
    pub gc_total_runs: u32,
}
