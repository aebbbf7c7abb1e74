pub mod brokers;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod stats;
pub mod utils;

use std::sync::Arc;
use std::time::Instant;
use chrono::{DateTime, Utc};
use crate::brokers::{Broker, BrokerOptions};
use crate::config::Config;
use crate::stats::{MemSample, MemoryStatsProvider, MemoryStatsSampler, StatsAggregator, TopicStats};

// ========================================
// ENGINE (The Singleton)
// ========================================

/// Holds the broker state and the stats readers built on it.
/// Cheap to clone.
#[derive(Clone)]
pub struct NexoEngine {
    pub broker: Arc<Broker>,
    pub stats: StatsAggregator,
    pub memory: Arc<MemoryStatsSampler>,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl NexoEngine {
    pub fn new(config: &Config, memory: Arc<dyn MemoryStatsProvider>) -> Self {
        let broker = Arc::new(Broker::new(BrokerOptions::from_config(&config.stats)));
        Self {
            stats: StatsAggregator::new(broker.clone(), config.stats.deadline()),
            broker,
            memory: Arc::new(MemoryStatsSampler::new(memory)),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub async fn get_stats(&self, topic: &str, channel: &str) -> Vec<TopicStats> {
        self.stats.get_stats(topic, channel).await
    }

    pub fn mem_stats(&self) -> MemSample {
        self.memory.sample()
    }
}
