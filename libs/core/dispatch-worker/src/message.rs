//! Message model shared by the consumer, the retry engine and the
//! dead-letter publisher.

use rdkafka::message::Headers;

/// A single message header. Keys keep their original case; duplicates allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub value: Vec<u8>,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A message read from the source topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Broker timestamp in milliseconds, when the broker provided one
    pub timestamp: Option<i64>,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub headers: Vec<Header>,
}

impl Message {
    /// Create a message with no key, headers or position.
    pub fn new(topic: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            partition: 0,
            offset: 0,
            timestamp: None,
            key: None,
            value: value.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push(Header::new(key, value));
        self
    }

    pub fn at(mut self, partition: i32, offset: i64) -> Self {
        self.partition = partition;
        self.offset = offset;
        self
    }

    /// First header whose key matches `name` ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&Header> {
        find_header(&self.headers, name)
    }

    /// Copy of this message addressed to another topic.
    ///
    /// Key, value, headers and timestamp are carried over unchanged.
    pub fn retarget(&self, topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..self.clone()
        }
    }

    /// Convert any rdkafka message (borrowed or owned) into the worker's model.
    pub fn from_kafka<M: rdkafka::Message>(message: &M) -> Self {
        let headers = message
            .headers()
            .map(|headers| {
                headers
                    .iter()
                    .map(|header| Header {
                        key: header.key.to_string(),
                        value: header.value.map(<[u8]>::to_vec).unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            timestamp: message.timestamp().to_millis(),
            key: message.key().map(<[u8]>::to_vec),
            value: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            headers,
        }
    }
}

pub(crate) fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a Header> {
    headers
        .iter()
        .find(|header| header.key.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdkafka::message::{Header as KafkaHeader, OwnedHeaders, OwnedMessage, Timestamp};

    #[test]
    fn test_header_lookup_ignores_case_and_keeps_first() {
        let message = Message::new("orders", "{}")
            .with_header("Trace", "a")
            .with_header("TRACE", "b");

        let header = message.header("trace").unwrap();
        assert_eq!(header.key, "Trace");
        assert_eq!(header.value, b"a");
        assert!(message.header("missing").is_none());
    }

    #[test]
    fn test_retarget_preserves_everything_but_topic() {
        let message = Message::new("orders", r#"{"id":1}"#)
            .with_key("order-1")
            .with_header("x-request-id", "abc")
            .at(3, 42);

        let dead = message.retarget("orders-dlq");

        assert_eq!(dead.topic, "orders-dlq");
        assert_eq!(dead.key, message.key);
        assert_eq!(dead.value, message.value);
        assert_eq!(dead.headers, message.headers);
        assert_eq!(dead.partition, 3);
        assert_eq!(message.topic, "orders");
    }

    #[test]
    fn test_from_kafka_message() {
        let headers = OwnedHeaders::new()
            .insert(KafkaHeader {
                key: "X-Request-Id",
                value: Some("abc"),
            })
            .insert(KafkaHeader::<&str> {
                key: "empty",
                value: None,
            });

        let kafka = OwnedMessage::new(
            Some(b"payload".to_vec()),
            Some(b"key".to_vec()),
            "orders".to_string(),
            Timestamp::CreateTime(1_700_000_000_000),
            2,
            17,
            Some(headers),
        );

        let message = Message::from_kafka(&kafka);

        assert_eq!(message.topic, "orders");
        assert_eq!(message.partition, 2);
        assert_eq!(message.offset, 17);
        assert_eq!(message.timestamp, Some(1_700_000_000_000));
        assert_eq!(message.key.as_deref(), Some(&b"key"[..]));
        assert_eq!(message.value, b"payload");
        assert_eq!(
            message.headers,
            vec![Header::new("X-Request-Id", "abc"), Header::new("empty", "")]
        );
    }

    #[test]
    fn test_from_kafka_message_without_payload() {
        let kafka = OwnedMessage::new(
            None,
            None,
            "orders".to_string(),
            Timestamp::NotAvailable,
            0,
            0,
            None,
        );

        let message = Message::from_kafka(&kafka);
        assert!(message.value.is_empty());
        assert!(message.key.is_none());
        assert!(message.headers.is_empty());
        assert_eq!(message.timestamp, None);
    }
}
