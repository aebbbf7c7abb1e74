use bytes::Bytes;
use uuid::Uuid;
use crate::utils::utils_time::current_time_ns;

#[derive(Clone, Debug)]
pub struct Message {
    pub id: Uuid,
    pub body: Bytes,
    /// Publish time, unix nanoseconds. E2E latency is measured from here.
    pub timestamp_ns: i64,
    pub attempts: u16,
}

impl Message {
    pub fn new(body: Bytes) -> Self {
        Self {
            id: Uuid::new_v4(),
            body,
            timestamp_ns: current_time_ns(),
            attempts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_message_gets_its_own_id() {
        let a = Message::new(Bytes::from_static(b"x"));
        let b = Message::new(Bytes::from_static(b"x"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.attempts, 0);
    }
}
