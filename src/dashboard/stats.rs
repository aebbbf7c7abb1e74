use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use crate::stats::{MemSample, TopicStats};
use crate::NexoEngine;

#[derive(Serialize)]
pub struct StatsResponse {
    pub version: &'static str,
    pub health: &'static str,
    pub start_time: i64,
    pub uptime_seconds: u64,
    pub topics: Vec<TopicStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemSample>,
}

#[derive(Deserialize, Default)]
pub struct StatsQuery {
    pub topic: Option<String>,
    pub channel: Option<String>,
    pub include_clients: Option<bool>,
    pub include_mem: Option<bool>,
}

/// Always 200: unknown topics or channels just produce an empty list.
pub async fn get_stats(
    State(engine): State<NexoEngine>,
    Query(query): Query<StatsQuery>,
) -> impl IntoResponse {
    let topic = query.topic.unwrap_or_default();
    let channel = query.channel.unwrap_or_default();

    let mut topics = engine.get_stats(&topic, &channel).await;
    if !query.include_clients.unwrap_or(true) {
        for channel_stats in topics.iter_mut().flat_map(|t| t.channels.iter_mut()) {
            channel_stats.clients = Vec::new();
        }
    }

    let memory = query.include_mem.unwrap_or(true).then(|| engine.mem_stats());

    axum::Json(StatsResponse {
        version: env!("CARGO_PKG_VERSION"),
        health: "OK",
        start_time: engine.started_at.timestamp(),
        uptime_seconds: engine.start_time.elapsed().as_secs(),
        topics,
        memory,
    })
}

pub async fn ping() -> &'static str {
    "OK"
}
