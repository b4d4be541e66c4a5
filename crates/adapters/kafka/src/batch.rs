//! Kafka 批量生产模块
//!
//! 短窗口聚批、不回读交付结果的发送方式

use std::time::Duration;

use kafkacli_errors::{AppError, AppResult};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::debug;

use crate::config::ProducerConfig;

/// 批量 Publisher
///
/// linger 窗口内聚批发送，单条写入不返回 partition/offset。
pub struct KafkaBatchPublisher {
    producer: FutureProducer,
}

impl KafkaBatchPublisher {
    pub fn new(config: &ProducerConfig) -> AppResult<Self> {
        let mut client_config = ClientConfig::new();

        for (key, value) in config.to_client_config_entries() {
            client_config.set(&key, &value);
        }

        let producer: FutureProducer = client_config
            .create()
            .map_err(|e| AppError::connection(format!("Failed to create Kafka producer: {}", e)))?;

        Ok(Self { producer })
    }

    /// 从 broker 地址创建（批量缓冲预设）
    pub fn from_brokers(brokers: &str) -> AppResult<Self> {
        let config = ProducerConfig::batching(brokers);
        Self::new(&config)
    }

    /// 发送一条消息，只确认进入发送队列，不等待交付
    pub fn send(&self, topic: &str, key: Option<&str>, payload: &str) -> AppResult<()> {
        let mut record: FutureRecord<'_, str, str> = FutureRecord::to(topic).payload(payload);

        if let Some(key) = key {
            record = record.key(key);
        }

        self.producer
            .send_result(record)
            .map_err(|(e, _)| AppError::broker(format!("Failed to enqueue message: {}", e)))?;

        debug!(topic = topic, "Message enqueued");

        Ok(())
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
    fn test_batching_profile_entries() {
        let config = ProducerConfig::batching("localhost:9092");

        let entries = config.to_client_config_entries();
        assert!(entries
            .iter()
            .any(|(k, v)| k == "linger.ms" && v == "100"));
        assert!(!entries.iter().any(|(k, _)| k == "acks"));
    }

    #[tokio::test]
    #[ignore] // 需要 Kafka 实例
    async fn test_batch_send() {
        let publisher = KafkaBatchPublisher::from_brokers("localhost:9092").unwrap();

        for i in 0..3 {
            publisher
                .send("test-topic", None, &format!("message {}", i))
                .unwrap();
        }

        publisher.flush(Duration::from_secs(5)).unwrap();
    }
}
