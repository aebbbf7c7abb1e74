#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use bytes::Bytes;
use nexo_stats::brokers::client::{ClientIdentity, ClientState, ConsumerClient};
use nexo_stats::brokers::{Broker, BrokerOptions};
use nexo_stats::config::{Config, MemoryConfig, ServerConfig, StatsConfig};
use nexo_stats::stats::memory::{MemoryStatsProvider, RuntimeMemStats, PAUSE_BUFFER_LEN};
use nexo_stats::stats::StatsAggregator;
use nexo_stats::NexoEngine;

pub struct FixedMemoryProvider(pub RuntimeMemStats);

impl MemoryStatsProvider for FixedMemoryProvider {
    fn read(&self) -> RuntimeMemStats {
        self.0.clone()
    }
}

pub fn fixed_mem_stats() -> RuntimeMemStats {
    let mut pause_ns = vec![0; PAUSE_BUFFER_LEN];
    pause_ns[..5].copy_from_slice(&[1_000, 2_000, 3_000, 4_000, 5_000]);
    RuntimeMemStats {
        heap_objects: 42,
        heap_idle: 1024,
        heap_in_use: 2048,
        heap_released: 512,
        next_gc: 4096,
        num_gc: 5,
        pause_ns,
    }
}

pub fn test_options() -> BrokerOptions {
    BrokerOptions {
        mem_queue_size: 100,
        e2e_percentiles: vec![1.0, 0.5],
        e2e_window: Duration::from_secs(600),
    }
}

pub fn setup_broker() -> (Arc<Broker>, StatsAggregator) {
    let broker = Arc::new(Broker::new(test_options()));
    let aggregator = StatsAggregator::new(broker.clone(), None);
    (broker, aggregator)
}

pub fn setup_engine() -> NexoEngine {
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            http_port: 0,
            log_level: "error".to_string(),
        },
        stats: StatsConfig {
            e2e_percentiles: vec![0.99],
            ..StatsConfig::default()
        },
        memory: MemoryConfig {
            purge_interval_ms: 10_000,
            purge_headroom_bytes: 4096,
        },
    };
    NexoEngine::new(&config, Arc::new(FixedMemoryProvider(fixed_mem_stats())))
}

pub fn attach_client(broker: &Broker, topic: &str, channel: &str, id: i64) -> Arc<ConsumerClient> {
    let client = Arc::new(ConsumerClient::new(
        id,
        ClientIdentity {
            client_id: format!("consumer-{}", id),
            hostname: format!("consumer-{}.local", id),
            remote_address: format!("10.0.0.{}:4150", id),
            user_agent: "nexo-test/1.0".to_string(),
            ..Default::default()
        },
    ));
    client.set_state(ClientState::Subscribed);
    broker
        .get_or_create_topic(topic)
        .get_or_create_channel(channel)
        .add_client(client.clone());
    client
}

pub fn publish(broker: &Broker, topic: &str, count: usize) {
    let topic = broker.get_or_create_topic(topic);
    for i in 0..count {
        topic.publish(Bytes::from(format!("msg-{}", i)));
    }
}
