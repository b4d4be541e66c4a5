//! Kafka Consumer
//!
//! 消费组会话管理与消息过滤打印

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::DateTime;
use colored::Colorize;
use kafkacli_errors::{AppError, AppResult};
use rdkafka::client::ClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{
    BaseConsumer, CommitMode, Consumer, ConsumerContext, Rebalance, StreamConsumer,
};
use rdkafka::error::KafkaResult;
use rdkafka::message::{BorrowedMessage, Headers, Message};
use rdkafka::TopicPartitionList;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ConsumerConfig;

/// 会话就绪信号
///
/// 一次性使用：open 只在首次生效，rebalance 后整体换新，
/// 旧的发送端作废，不复用。
pub struct SessionGate {
    slot: Mutex<Option<oneshot::Sender<()>>>,
}

impl SessionGate {
    /// 创建 gate 和首个会话的等待端
    pub fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// 打开 gate；重复调用只有首次生效
    pub fn open(&self) {
        if let Some(tx) = self.lock_slot().take() {
            let _ = tx.send(());
        }
    }

    /// 换一个全新的 gate，返回新的等待端
    pub fn rearm(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        *self.lock_slot() = Some(tx);
        rx
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 消费组会话回调
///
/// 分区分配后打开就绪 gate，分区回收时换新 gate，提交结果记日志。
pub struct SessionContext {
    gate: SessionGate,
}

impl SessionContext {
    pub fn new(gate: SessionGate) -> Self {
        Self { gate }
    }
}

impl ClientContext for SessionContext {}

impl ConsumerContext for SessionContext {
    fn pre_rebalance(&self, _consumer: &BaseConsumer<Self>, rebalance: &Rebalance<'_>) {
        if let Rebalance::Revoke(partitions) = rebalance {
            info!(partitions = partitions.count(), "Partitions revoked");
            // 首个会话之后没有等待者，新接收端直接丢弃
            let _ = self.gate.rearm();
        }
    }

    fn post_rebalance(&self, _consumer: &BaseConsumer<Self>, rebalance: &Rebalance<'_>) {
        match rebalance {
            Rebalance::Assign(partitions) => {
                info!(partitions = partitions.count(), "Partitions assigned");
                self.gate.open();
            }
            Rebalance::Revoke(_) => {}
            Rebalance::Error(e) => {
                error!(error = %e, "Rebalance error");
            }
        }
    }

    fn commit_callback(&self, result: KafkaResult<()>, _offsets: &TopicPartitionList) {
        match result {
            Ok(_) => debug!("Offsets committed"),
            Err(e) => warn!(error = %e, "Offset commit failed"),
        }
    }
}

/// 消费到的消息（脱离 rdkafka 生命周期的自持副本）
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Topic
    pub topic: String,
    /// 分区
    pub partition: i32,
    /// 偏移量
    pub offset: i64,
    /// 消息键
    pub key: Option<String>,
    /// 消息内容
    pub payload: Option<Vec<u8>>,
    /// 时间戳（毫秒）
    pub timestamp: Option<i64>,
    /// 消息头
    pub headers: Vec<HeaderRecord>,
}

/// 消息头键值对
#[derive(Debug, Clone)]
pub struct HeaderRecord {
    pub key: String,
    pub value: Option<String>,
}

impl ReceivedMessage {
    pub fn from_borrowed(message: &BorrowedMessage<'_>) -> Self {
        let headers = message
            .headers()
            .map(|headers| {
                headers
                    .iter()
                    .map(|header| HeaderRecord {
                        key: header.key.to_string(),
                        value: header
                            .value
                            .map(|v| String::from_utf8_lossy(v).into_owned()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message
                .key()
                .map(|k| String::from_utf8_lossy(k).into_owned()),
            payload: message.payload().map(|p| p.to_vec()),
            timestamp: message.timestamp().to_millis(),
            headers,
        }
    }
}

/// 消息打印器
///
/// 可选 key 过滤；完整模式把消息体按 JSON 解码后一起输出，
/// 解码失败不致命，message 字段降级为 null。
pub struct MessagePrinter {
    key_filter: Option<String>,
    show_message: bool,
}

impl MessagePrinter {
    pub fn new(key_filter: Option<String>, show_message: bool) -> Self {
        Self {
            key_filter,
            show_message,
        }
    }

    /// 无过滤全放行，有过滤要求 key 完全相等
    pub fn matches(&self, key: Option<&str>) -> bool {
        match &self.key_filter {
            None => true,
            Some(filter) => key == Some(filter.as_str()),
        }
    }

    pub fn print(&self, message: &ReceivedMessage) {
        println!("{}", self.render(message));
    }

    pub fn render(&self, message: &ReceivedMessage) -> String {
        let mut lines = vec!["{".to_string()];

        lines.push(format!("  key: {}", render_text(message.key.as_deref())));

        if self.show_message {
            let value = match self.decode_payload(message) {
                Some(map) => Value::Object(map).to_string().yellow().to_string(),
                None => "null".dimmed().to_string(),
            };
            lines.push(format!("  message: {}", value));
        }

        let timestamp = message
            .timestamp
            .and_then(DateTime::from_timestamp_millis)
            .map(|ts| ts.to_rfc3339().cyan().to_string())
            .unwrap_or_else(|| "null".dimmed().to_string());
        lines.push(format!("  timestamp: {}", timestamp));

        lines.push(format!("  topic: {}", render_text(Some(&message.topic))));

        let headers = message
            .headers
            .iter()
            .map(|header| match &header.value {
                Some(value) => format!("{}={}", header.key, value),
                None => format!("{}=null", header.key),
            })
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("  headers: [{}]", headers.yellow()));

        lines.push(format!("  offset: {}", message.offset.to_string().green()));
        lines.push(format!(
            "  partition: {}",
            message.partition.to_string().green()
        ));
        lines.push("}".to_string());

        lines.join("\n")
    }

    /// 按 JSON 对象解码消息体，数字保留原始文本形式
    fn decode_payload(&self, message: &ReceivedMessage) -> Option<Map<String, Value>> {
        let payload = message.payload.as_deref()?;
        match serde_json::from_slice::<Map<String, Value>>(payload) {
            Ok(map) => Some(map),
            Err(e) => {
                error!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    error = %e,
                    "Failed to decode message payload"
                );
                None
            }
        }
    }
}

fn render_text(value: Option<&str>) -> String {
    match value {
        Some(s) => format!("\"{}\"", s).yellow().to_string(),
        None => "null".dimmed().to_string(),
    }
}

/// 消费组 Consumer
pub struct GroupConsumer {
    consumer: StreamConsumer<SessionContext>,
}

impl GroupConsumer {
    /// 创建并订阅，返回首个会话的就绪等待端
    pub fn subscribe(config: &ConsumerConfig) -> AppResult<(Self, oneshot::Receiver<()>)> {
        let mut client_config = ClientConfig::new();

        for (key, value) in config.to_client_config_entries() {
            client_config.set(&key, &value);
        }

        let (gate, ready) = SessionGate::new();

        let consumer: StreamConsumer<SessionContext> = client_config
            .create_with_context(SessionContext::new(gate))
            .map_err(|e| AppError::connection(format!("Failed to create Kafka consumer: {}", e)))?;

        let topics: Vec<&str> = config.topics.iter().map(|s| s.as_str()).collect();
        consumer
            .subscribe(&topics)
            .map_err(|e| AppError::connection(format!("Failed to subscribe to topics: {}", e)))?;

        info!(
            group_id = %config.group_id,
            topics = ?config.topics,
            "Kafka consumer created"
        );

        Ok((Self { consumer }, ready))
    }

    /// 消费循环
    ///
    /// 命中过滤器的消息打印，所有消息无条件提交偏移；
    /// 取消令牌是唯一的正常退出路径，其余错误直接终止。
    pub async fn run(&self, cancel: CancellationToken, printer: &MessagePrinter) -> AppResult<()> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Consume loop cancelled");
                    return Ok(());
                }
                result = self.consumer.recv() => {
                    match result {
                        Ok(message) => {
                            let received = ReceivedMessage::from_borrowed(&message);
                            if printer.matches(received.key.as_deref()) {
                                printer.print(&received);
                            }
                            // 过滤只影响展示，偏移照常提交
                            if let Err(e) =
                                self.consumer.commit_message(&message, CommitMode::Async)
                            {
                                error!(error = %e, "Failed to commit offset");
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "Kafka error");
                            return Err(AppError::broker(format!("Consume failed: {}", e)));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample_message(payload: Option<Vec<u8>>) -> ReceivedMessage {
        ReceivedMessage {
            topic: "events".to_string(),
            partition: 0,
            offset: 42,
            key: Some("user-1".to_string()),
            payload,
            timestamp: Some(1755820800000),
            headers: vec![HeaderRecord {
                key: "trace-id".to_string(),
                value: Some("abc".to_string()),
            }],
        }
    }

    #[tokio::test]
    async fn test_session_gate_opens_once() {
        let (gate, ready) = SessionGate::new();
        gate.open();
        // 再次打开不生效也不 panic
        gate.open();
        assert!(ready.await.is_ok());
    }

    #[tokio::test]
    async fn test_session_gate_rearm_discards_old() {
        let (gate, first) = SessionGate::new();
        let second = gate.rearm();
        gate.open();

        assert!(first.await.is_err());
        assert!(second.await.is_ok());
    }

    #[test]
    fn test_key_filter() {
        let printer = MessagePrinter::new(Some("user-1".to_string()), false);
        assert!(printer.matches(Some("user-1")));
        assert!(!printer.matches(Some("user-2")));
        assert!(!printer.matches(None));

        let unfiltered = MessagePrinter::new(None, false);
        assert!(unfiltered.matches(Some("anything")));
        assert!(unfiltered.matches(None));
    }

    #[test]
    fn test_render_metadata_only() {
        colored::control::set_override(false);
        let printer = MessagePrinter::new(None, false);
        let rendered = printer.render(&sample_message(Some(b"{}".to_vec())));

        assert!(rendered.contains("key: \"user-1\""));
        assert!(rendered.contains("topic: \"events\""));
        assert!(rendered.contains("offset: 42"));
        assert!(!rendered.contains("message:"));
    }

    #[test]
    fn test_render_full_message() {
        colored::control::set_override(false);
        let printer = MessagePrinter::new(None, true);
        let rendered = printer.render(&sample_message(Some(br#"{"a":1}"#.to_vec())));

        assert!(rendered.contains(r#"message: {"a":1}"#));
    }

    #[test]
    fn test_render_invalid_json_yields_null() {
        colored::control::set_override(false);
        let printer = MessagePrinter::new(None, true);
        let rendered = printer.render(&sample_message(Some(b"not json".to_vec())));

        assert!(rendered.contains("message: null"));
        assert!(rendered.contains("offset: 42"));
    }

    #[test]
    fn test_render_preserves_number_text() {
        colored::control::set_override(false);
        let printer = MessagePrinter::new(None, true);
        let rendered = printer.render(&sample_message(Some(
            br#"{"a":1,"big":9007199254740993}"#.to_vec(),
        )));

        assert!(rendered.contains(r#""a":1"#));
        assert!(rendered.contains("9007199254740993"));
        assert!(!rendered.contains("9007199254740992"));
    }

    #[tokio::test]
    #[ignore] // 需要 Kafka 实例
    async fn test_consume_loop() {
        let config = ConsumerConfig::new("localhost:9092", "test-group").with_topic("test-topic");
        let (consumer, ready) = GroupConsumer::subscribe(&config).unwrap();

        let cancel = CancellationToken::new();
        let watcher = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            watcher.cancel();
        });

        ready.await.unwrap();

        let printer = MessagePrinter::new(None, true);
        consumer.run(cancel, &printer).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // 需要 Kafka 实例
    async fn test_filtered_consume_commits_all_offsets() {
        use crate::admin::{KafkaAdmin, TopicConfig};
        use crate::config::AutoOffsetReset;
        use crate::producer::KafkaPublisher;
        use rdkafka::Offset;

        let topic = "test-filter-commit";

        let admin = KafkaAdmin::from_brokers("localhost:9092").unwrap();
        let _ = admin.create_topic(&TopicConfig::new(topic, 1, 1)).await;

        let publisher = KafkaPublisher::from_brokers("localhost:9092").unwrap();
        for i in 0..6 {
            let key = if i % 2 == 0 { "keep" } else { "skip" };
            publisher
                .publish(topic, Some(key), &format!(r#"{{"seq":{}}}"#, i))
                .await
                .unwrap();
        }

        let config = ConsumerConfig::new("localhost:9092", "test-filter-commit-group")
            .with_topic(topic)
            .with_auto_offset_reset(AutoOffsetReset::Earliest);
        let (consumer, ready) = GroupConsumer::subscribe(&config).unwrap();
        ready.await.unwrap();

        let cancel = CancellationToken::new();
        let watcher = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            watcher.cancel();
        });

        // 过滤掉一半消息，偏移仍须全部提交
        let printer = MessagePrinter::new(Some("keep".to_string()), false);
        consumer.run(cancel, &printer).await.unwrap();

        // 等异步提交送达 broker
        tokio::time::sleep(Duration::from_secs(1)).await;

        let (_, high) = consumer
            .consumer
            .fetch_watermarks(topic, 0, Duration::from_secs(5))
            .unwrap();
        let committed = consumer.consumer.committed(Duration::from_secs(5)).unwrap();
        let offset = committed.find_partition(topic, 0).unwrap().offset();
        assert_eq!(offset, Offset::Offset(high));
    }
}
