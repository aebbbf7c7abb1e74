//! Stats collection: broker -> topics -> channels -> clients.
//!
//! Each tier copies its membership under a short read lock, releases it,
//! spawns one task per child and joins them. Aggregates (latency merge, DTO
//! construction) are always built after the lock is gone, so collection
//! never nests lock acquisitions and cannot deadlock against the publish and
//! consume paths that take the same locks.
//!
//! A `CancellationToken` is threaded through every tier. When it fires, a
//! tier stops waiting, aborts its outstanding children and returns what it
//! has. Missing entities are omitted, never reported as errors.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use crate::brokers::broker::Broker;
use crate::brokers::channel::Channel;
use crate::brokers::topic::Topic;
use crate::stats::models::{ChannelStats, TopicStats};
use crate::stats::ordering::{channels_by_name, sort_channel_stats, sort_topic_stats, topics_by_name};

#[derive(Clone)]
pub struct StatsAggregator {
    broker: Arc<Broker>,
    deadline: Option<Duration>,
}

impl StatsAggregator {
    pub fn new(broker: Arc<Broker>, deadline: Option<Duration>) -> Self {
        Self { broker, deadline }
    }

    /// Stats for the selected topics, ascending by name.
    ///
    /// Empty filters select everything. An unknown topic yields an empty
    /// vec; an unknown channel drops every topic that lacks it.
    pub async fn get_stats(&self, topic_filter: &str, channel_filter: &str) -> Vec<TopicStats> {
        self.get_stats_with_deadline(topic_filter, channel_filter, self.deadline).await
    }

    pub async fn get_stats_with_deadline(
        &self,
        topic_filter: &str,
        channel_filter: &str,
        deadline: Option<Duration>,
    ) -> Vec<TopicStats> {
        let start = Instant::now();
        let cancel = CancellationToken::new();
        let _timer = deadline.map(|after| {
            let token = cancel.clone();
            AbortOnDropHandle::new(tokio::spawn(async move {
                tokio::time::sleep(after).await;
                tracing::warn!("stats: deadline of {:?} reached, returning partial stats", after);
                token.cancel();
            }))
        });

        let mut selected = self.broker.topics().select(topic_filter);
        tracing::debug!("stats: acquired topic list (under lock) in {:?}", start.elapsed());
        selected.sort_by(topics_by_name);

        let channel_filter: Arc<str> = Arc::from(channel_filter);
        let mut tasks = JoinSet::new();
        for topic in selected {
            tasks.spawn(collect_topic(topic, channel_filter.clone(), cancel.child_token()));
        }

        let mut topics: Vec<TopicStats> = join_until_cancelled(tasks, &cancel, "topic")
            .await
            .into_iter()
            .flatten()
            .collect();
        sort_topic_stats(&mut topics);

        tracing::debug!("stats: finished acquiring stats in {:?}", start.elapsed());
        topics
    }
}

/// Builds one topic's stats, or `None` when the channel filter names a
/// channel this topic does not have.
pub async fn collect_topic(
    topic: Arc<Topic>,
    channel_filter: Arc<str>,
    cancel: CancellationToken,
) -> Option<TopicStats> {
    let start = Instant::now();
    let mut selected = topic.channels().select(&channel_filter);
    if selected.is_empty() && !channel_filter.is_empty() {
        return None;
    }
    tracing::debug!(
        "stats: acquired channels (under lock) for topic ({}) in {:?}",
        topic.name(),
        start.elapsed()
    );
    selected.sort_by(channels_by_name);

    let mut tasks = JoinSet::new();
    for channel in selected {
        tasks.spawn(collect_channel(channel));
    }
    let mut channels = join_until_cancelled(tasks, &cancel, "channel").await;
    if cancel.is_cancelled() {
        return None;
    }
    sort_channel_stats(&mut channels);

    let build_start = Instant::now();
    let stats = TopicStats::new(&topic, channels);
    tracing::debug!(
        "stats: acquired topic stats for topic ({}) in {:?}",
        topic.name(),
        build_start.elapsed()
    );
    Some(stats)
}

pub async fn collect_channel(channel: Arc<Channel>) -> ChannelStats {
    let start = Instant::now();
    let clients = channel.client_snapshots();
    tracing::debug!(
        "stats: acquired clients (under lock) for topic/channel ({}/{}) in {:?}",
        channel.topic_name(),
        channel.name(),
        start.elapsed()
    );

    let build_start = Instant::now();
    let stats = ChannelStats::new(&channel, clients);
    tracing::debug!(
        "stats: acquired channel stats for topic/channel ({}/{}) in {:?}",
        channel.topic_name(),
        channel.name(),
        build_start.elapsed()
    );
    stats
}

/// Joins every task unless `cancel` fires first; pending tasks are aborted
/// when the set is dropped. A panicked child is logged and skipped.
async fn join_until_cancelled<T: 'static>(
    mut tasks: JoinSet<T>,
    cancel: &CancellationToken,
    tier: &str,
) -> Vec<T> {
    let mut results = Vec::with_capacity(tasks.len());
    loop {
        tokio::select! {
            joined = tasks.join_next() => match joined {
                Some(Ok(result)) => results.push(result),
                Some(Err(err)) => {
                    tracing::warn!("stats: {} collector task failed: {}", tier, err);
                }
                None => break,
            },
            _ = cancel.cancelled() => {
                tracing::debug!("stats: {} tier cancelled with {} tasks pending", tier, tasks.len());
                tasks.abort_all();
                break;
            }
        }
    }
    results
}
