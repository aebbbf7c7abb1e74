pub mod backend;
pub mod broker;
pub mod channel;
pub mod client;
pub mod message;
pub mod registry;
pub mod topic;

pub use broker::{Broker, BrokerOptions};
pub use channel::Channel;
pub use topic::Topic;
