//! Consumer connections as seen by a channel.
//!
//! Protocol handling lives elsewhere; a channel only needs an id and a
//! self-synchronized stats snapshot it can take under its own read lock.

use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU64, Ordering};
use crate::stats::models::ClientStats;
use crate::utils::utils_time::unix_timestamp;

pub trait Client: Send + Sync {
    fn id(&self) -> i64;

    /// Must not block on any channel/topic lock.
    fn stats(&self) -> ClientStats;
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Init = 0,
    Disconnected = 1,
    Connected = 2,
    Subscribed = 3,
    Closing = 4,
}

#[derive(Debug, Clone, Default)]
pub struct TlsInfo {
    pub version: String,
    pub cipher_suite: String,
    pub negotiated_protocol: String,
    pub negotiated_protocol_is_mutual: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AuthInfo {
    pub identity: String,
    pub identity_url: String,
}

/// What a consumer announced when it identified itself.
#[derive(Debug, Clone, Default)]
pub struct ClientIdentity {
    pub client_id: String,
    pub hostname: String,
    pub user_agent: String,
    pub remote_address: String,
    pub sample_rate: i32,
    pub deflate: bool,
    pub snappy: bool,
    pub tls: Option<TlsInfo>,
    pub auth: Option<AuthInfo>,
}

pub struct ConsumerClient {
    id: i64,
    version: String,
    identity: ClientIdentity,
    connect_ts: i64,

    state: AtomicI32,
    ready_count: AtomicI64,
    in_flight_count: AtomicI64,
    message_count: AtomicU64,
    finish_count: AtomicU64,
    requeue_count: AtomicU64,
}

impl ConsumerClient {
    pub fn new(id: i64, identity: ClientIdentity) -> Self {
        Self {
            id,
            version: "V2".to_string(),
            identity,
            connect_ts: unix_timestamp(),
            state: AtomicI32::new(ClientState::Init as i32),
            ready_count: AtomicI64::new(0),
            in_flight_count: AtomicI64::new(0),
            message_count: AtomicU64::new(0),
            finish_count: AtomicU64::new(0),
            requeue_count: AtomicU64::new(0),
        }
    }

    pub fn set_state(&self, state: ClientState) {
        self.state.store(state as i32, Ordering::Relaxed);
    }

    pub fn set_ready_count(&self, count: i64) {
        self.ready_count.store(count, Ordering::Relaxed);
    }

    pub fn sent_message(&self) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
        self.in_flight_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn finished_message(&self) {
        self.finish_count.fetch_add(1, Ordering::Relaxed);
        self.in_flight_count.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn requeued_message(&self) {
        self.requeue_count.fetch_add(1, Ordering::Relaxed);
        self.in_flight_count.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn timed_out_message(&self) {
        self.in_flight_count.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Client for ConsumerClient {
    fn id(&self) -> i64 {
        self.id
    }

    fn stats(&self) -> ClientStats {
        let tls = self.identity.tls.clone().unwrap_or_default();
        let auth = self.identity.auth.clone();

        ClientStats {
            client_id: self.identity.client_id.clone(),
            hostname: self.identity.hostname.clone(),
            version: self.version.clone(),
            remote_address: self.identity.remote_address.clone(),
            state: self.state.load(Ordering::Relaxed),
            ready_count: self.ready_count.load(Ordering::Relaxed),
            in_flight_count: self.in_flight_count.load(Ordering::Relaxed),
            message_count: self.message_count.load(Ordering::Relaxed),
            finish_count: self.finish_count.load(Ordering::Relaxed),
            requeue_count: self.requeue_count.load(Ordering::Relaxed),
            connect_ts: self.connect_ts,
            sample_rate: self.identity.sample_rate,
            deflate: self.identity.deflate,
            snappy: self.identity.snappy,
            user_agent: self.identity.user_agent.clone(),
            authed: auth.is_some(),
            auth_identity: auth.as_ref().map(|a| a.identity.clone()).unwrap_or_default(),
            auth_identity_url: auth.map(|a| a.identity_url).unwrap_or_default(),
            tls: self.identity.tls.is_some(),
            tls_cipher_suite: tls.cipher_suite,
            tls_version: tls.version,
            tls_negotiated_protocol: tls.negotiated_protocol,
            tls_negotiated_protocol_is_mutual: tls.negotiated_protocol_is_mutual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_reflect_counters() {
        let client = ConsumerClient::new(
            7,
            ClientIdentity {
                client_id: "worker".to_string(),
                hostname: "worker.local".to_string(),
                snappy: true,
                tls: Some(TlsInfo {
                    version: "TLS1.3".to_string(),
                    cipher_suite: "TLS_AES_128_GCM_SHA256".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        client.set_state(ClientState::Subscribed);
        client.set_ready_count(10);
        client.sent_message();
        client.sent_message();
        client.finished_message();

        let stats = client.stats();
        assert_eq!(client.id(), 7);
        assert_eq!(stats.client_id, "worker");
        assert_eq!(stats.state, 3);
        assert_eq!(stats.ready_count, 10);
        assert_eq!(stats.message_count, 2);
        assert_eq!(stats.finish_count, 1);
        assert_eq!(stats.in_flight_count, 1);
        assert!(stats.tls);
        assert_eq!(stats.tls_version, "TLS1.3");
        assert!(!stats.authed);
        assert!(stats.auth_identity.is_empty());
    }
}
