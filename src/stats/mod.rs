pub mod allocator;
pub mod collector;
pub mod memory;
pub mod models;
pub mod ordering;
pub mod quantile;

pub use collector::StatsAggregator;
pub use memory::{MemoryStatsProvider, MemoryStatsSampler};
pub use models::{ChannelStats, ClientStats, MemSample, TopicStats};
