//! Name orderings applied at every aggregation level.
//!
//! Byte-wise ascending, used with the stable `sort_by` so output is
//! reproducible regardless of map iteration order.

use std::cmp::Ordering;
use std::sync::Arc;
use crate::brokers::channel::Channel;
use crate::brokers::topic::Topic;
use crate::stats::models::{ChannelStats, TopicStats};

pub fn topics_by_name(a: &Arc<Topic>, b: &Arc<Topic>) -> Ordering {
    a.name().as_bytes().cmp(b.name().as_bytes())
}

pub fn channels_by_name(a: &Arc<Channel>, b: &Arc<Channel>) -> Ordering {
    a.name().as_bytes().cmp(b.name().as_bytes())
}

pub fn topic_stats_by_name(a: &TopicStats, b: &TopicStats) -> Ordering {
    a.topic_name.as_bytes().cmp(b.topic_name.as_bytes())
}

pub fn channel_stats_by_name(a: &ChannelStats, b: &ChannelStats) -> Ordering {
    a.channel_name.as_bytes().cmp(b.channel_name.as_bytes())
}

pub fn sort_topic_stats(topics: &mut [TopicStats]) {
    topics.sort_by(topic_stats_by_name);
}

pub fn sort_channel_stats(channels: &mut [ChannelStats]) {
    channels.sort_by(channel_stats_by_name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brokers::broker::BrokerOptions;

    fn channel_stats(name: &str, depth: i64) -> ChannelStats {
        ChannelStats {
            channel_name: name.to_string(),
            depth,
            backend_depth: 0,
            in_flight_count: 0,
            deferred_count: 0,
            message_count: 0,
            requeue_count: 0,
            timeout_count: 0,
            clients: vec![],
            paused: false,
            e2e_processing_latency: None,
        }
    }

    fn topic_stats(name: &str) -> TopicStats {
        TopicStats {
            topic_name: name.to_string(),
            channels: vec![],
            depth: 0,
            backend_depth: 0,
            message_count: 0,
            paused: false,
            e2e_processing_latency: None,
        }
    }

    #[test]
    fn test_byte_wise_not_case_folded() {
        let mut topics = vec![topic_stats("beta"), topic_stats("Zulu"), topic_stats("alpha"), topic_stats("_x")];
        sort_topic_stats(&mut topics);
        let names: Vec<&str> = topics.iter().map(|t| t.topic_name.as_str()).collect();
        assert_eq!(names, vec!["Zulu", "_x", "alpha", "beta"]);
    }

    #[test]
    fn test_channel_sort_is_stable() {
        let mut channels = vec![channel_stats("b", 1), channel_stats("a", 1), channel_stats("b", 2)];
        sort_channel_stats(&mut channels);
        let keys: Vec<(&str, i64)> = channels.iter().map(|c| (c.channel_name.as_str(), c.depth)).collect();
        assert_eq!(keys, vec![("a", 1), ("b", 1), ("b", 2)]);
    }

    #[test]
    fn test_empty_input() {
        let mut topics: Vec<TopicStats> = vec![];
        sort_topic_stats(&mut topics);
        assert!(topics.is_empty());
    }

    #[test]
    fn test_entity_comparators() {
        let options = BrokerOptions::default();
        let mut topics = vec![Arc::new(Topic::new("orders", options.clone())), Arc::new(Topic::new("events", options.clone()))];
        topics.sort_by(topics_by_name);
        assert_eq!(topics[0].name(), "events");

        let mut channels = vec![
            Arc::new(Channel::new("orders", "z", &options)),
            Arc::new(Channel::new("orders", "m", &options)),
        ];
        channels.sort_by(channels_by_name);
        assert_eq!(channels[0].name(), "m");
    }
}
