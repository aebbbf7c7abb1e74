//! Broker: the top-level topic set.

use std::sync::Arc;
use std::time::Duration;
use crate::brokers::registry::Registry;
use crate::brokers::topic::Topic;
use crate::config::StatsConfig;

/// Settings every topic and channel is created with.
#[derive(Debug, Clone)]
pub struct BrokerOptions {
    pub mem_queue_size: usize,
    /// Empty disables e2e latency tracking.
    pub e2e_percentiles: Vec<f64>,
    pub e2e_window: Duration,
}

impl BrokerOptions {
    pub fn from_config(sys: &StatsConfig) -> Self {
        Self {
            mem_queue_size: sys.mem_queue_size,
            e2e_percentiles: sys.e2e_percentiles.clone(),
            e2e_window: sys.e2e_window(),
        }
    }
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self::from_config(&StatsConfig::default())
    }
}

pub struct Broker {
    topics: Registry<Topic>,
    options: BrokerOptions,
}

impl Broker {
    pub fn new(options: BrokerOptions) -> Self {
        Self {
            topics: Registry::new(),
            options,
        }
    }

    pub fn topics(&self) -> &Registry<Topic> {
        &self.topics
    }

    pub fn get_or_create_topic(&self, name: &str) -> Arc<Topic> {
        let (topic, created) = self
            .topics
            .get_or_insert_with(name, || Topic::new(name, self.options.clone()));
        if created {
            tracing::info!("[Broker] Created topic '{}'", name);
        }
        topic
    }

    pub fn get_existing_topic(&self, name: &str) -> Option<Arc<Topic>> {
        self.topics.lookup(name)
    }

    /// In-progress stats collections keep their reference until they finish.
    pub fn delete_topic(&self, name: &str) -> bool {
        let removed = self.topics.remove(name).is_some();
        if removed {
            tracing::info!("[Broker] Deleted topic '{}'", name);
        }
        removed
    }

    pub fn topic_names(&self) -> Vec<String> {
        let mut names = self.topics.snapshot_keys();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_lifecycle() {
        let broker = Broker::new(BrokerOptions::default());
        let a = broker.get_or_create_topic("b-topic");
        let b = broker.get_or_create_topic("a-topic");
        assert!(Arc::ptr_eq(&a, &broker.get_or_create_topic("b-topic")));
        assert_eq!(broker.topic_names(), vec!["a-topic", "b-topic"]);

        assert!(broker.delete_topic("a-topic"));
        assert!(broker.get_existing_topic("a-topic").is_none());
        assert_eq!(b.name(), "a-topic");
    }
}
