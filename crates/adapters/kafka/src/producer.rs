//! Kafka Producer
//!
//! 提供同步确认的消息发布功能

use std::time::Duration;

use kafkacli_errors::{AppError, AppResult};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::debug;

use crate::config::ProducerConfig;

/// Kafka Publisher
///
/// 每条消息等待所有副本确认后返回 (partition, offset)。
pub struct KafkaPublisher {
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaPublisher {
    pub fn new(config: &ProducerConfig) -> AppResult<Self> {
        let mut client_config = ClientConfig::new();

        for (key, value) in config.to_client_config_entries() {
            client_config.set(&key, &value);
        }

        let producer: FutureProducer = client_config
            .create()
            .map_err(|e| AppError::connection(format!("Failed to create Kafka producer: {}", e)))?;

        Ok(Self {
            producer,
            timeout: config.delivery_timeout,
        })
    }

    /// 从 broker 地址创建（同步确认预设）
    pub fn from_brokers(brokers: &str) -> AppResult<Self> {
        let config = ProducerConfig::sync(brokers);
        Self::new(&config)
    }

    /// 设置交付等待上限
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 发布一条消息，等待交付确认，返回 (partition, offset)
    pub async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &str,
    ) -> AppResult<(i32, i64)> {
        let mut record: FutureRecord<'_, str, str> = FutureRecord::to(topic).payload(payload);

        if let Some(key) = key {
            record = record.key(key);
        }

        let result = self
            .producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map_err(|(e, _)| AppError::broker(format!("Failed to publish message: {}", e)))?;

        debug!(
            topic = topic,
            partition = result.0,
            offset = result.1,
            "Message published"
        );

        Ok(result)
    }

    /// 刷新所有待发送的消息
    pub fn flush(&self, timeout: Duration) -> AppResult<()> {
        self.producer
            .flush(Timeout::After(timeout))
            .map_err(|e| AppError::broker(format!("Failed to flush producer: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_profile_entries() {
        let config = ProducerConfig::sync("localhost:9092").with_client_id("test-client");

        let entries = config.to_client_config_entries();
        assert!(entries.iter().any(|(k, v)| k == "acks" && v == "-1"));
        assert!(entries.iter().any(|(k, v)| k == "retries" && v == "10"));
        assert!(entries
            .iter()
            .any(|(k, v)| k == "client.id" && v == "test-client"));
    }

    #[tokio::test]
    #[ignore] // 需要 Kafka 实例
    async fn test_publish() {
        let publisher = KafkaPublisher::from_brokers("localhost:9092").unwrap();

        let (partition, offset) = publisher
            .publish("test-topic", Some("key1"), r#"{"message":"hello"}"#)
            .await
            .unwrap();

        assert!(partition >= 0);
        assert!(offset >= 0);
    }
}
