//! Kafka 配置模块
//!
//! 提供统一的 Kafka 配置管理

use std::collections::HashMap;
use std::time::Duration;

/// Kafka 基础配置
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Broker 地址列表
    pub brokers: String,
    /// 客户端 ID
    pub client_id: Option<String>,
    /// 额外配置
    pub extra: HashMap<String, String>,
}

impl KafkaConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            client_id: None,
            extra: HashMap::new(),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// 转换为 rdkafka ClientConfig 的配置项
    pub fn to_client_config_entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![("bootstrap.servers".to_string(), self.brokers.clone())];

        if let Some(client_id) = &self.client_id {
            entries.push(("client.id".to_string(), client_id.clone()));
        }

        for (key, value) in &self.extra {
            entries.push((key.clone(), value.clone()));
        }

        entries
    }
}

/// Producer 配置
///
/// 两种预设：`sync` 同步确认（逐条等待 broker 确认），
/// `batching` 批量缓冲（靠 linger 聚批，交付结果不回读）。
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// 基础配置
    pub base: KafkaConfig,
    /// 确认模式：0=不等待，1=leader确认，-1=所有副本确认
    pub acks: Option<i32>,
    /// 重试次数
    pub retries: Option<u32>,
    /// 延迟发送时间（用于批量聚合）
    pub linger_ms: Option<u64>,
    /// 单条发送等待交付的上限
    pub delivery_timeout: Duration,
}

impl ProducerConfig {
    /// 同步确认配置：所有副本确认，重试 10 次
    pub fn sync(brokers: impl Into<String>) -> Self {
        Self {
            base: KafkaConfig::new(brokers),
            acks: Some(-1),
            retries: Some(10),
            linger_ms: None,
            delivery_timeout: Duration::from_secs(30),
        }
    }

    /// 批量缓冲配置：linger 100ms 聚批，重试沿用库默认
    pub fn batching(brokers: impl Into<String>) -> Self {
        Self {
            base: KafkaConfig::new(brokers),
            acks: None,
            retries: None,
            linger_ms: Some(100),
            delivery_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.base = self.base.with_client_id(client_id);
        self
    }

    pub fn with_acks(mut self, acks: i32) -> Self {
        self.acks = Some(acks);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_linger_ms(mut self, ms: u64) -> Self {
        self.linger_ms = Some(ms);
        self
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// 转换为 rdkafka ClientConfig 的配置项
    pub fn to_client_config_entries(&self) -> Vec<(String, String)> {
        let mut entries = self.base.to_client_config_entries();

        if let Some(acks) = self.acks {
            entries.push(("acks".to_string(), acks.to_string()));
        }
        if let Some(retries) = self.retries {
            entries.push(("retries".to_string(), retries.to_string()));
        }
        if let Some(linger_ms) = self.linger_ms {
            entries.push(("linger.ms".to_string(), linger_ms.to_string()));
        }

        entries
    }
}

/// Consumer 配置
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// 基础配置
    pub base: KafkaConfig,
    /// 消费者组 ID
    pub group_id: String,
    /// 订阅的 topics
    pub topics: Vec<String>,
    /// 自动提交（关闭时逐条显式提交）
    pub enable_auto_commit: bool,
    /// 自动偏移重置策略
    pub auto_offset_reset: AutoOffsetReset,
}

/// 自动偏移重置策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoOffsetReset {
    Earliest,
    #[default]
    Latest,
}

impl AutoOffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoOffsetReset::Earliest => "earliest",
            AutoOffsetReset::Latest => "latest",
        }
    }
}

impl ConsumerConfig {
    pub fn new(brokers: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            base: KafkaConfig::new(brokers),
            group_id: group_id.into(),
            topics: Vec::new(),
            enable_auto_commit: false,
            auto_offset_reset: AutoOffsetReset::default(),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.base = self.base.with_client_id(client_id);
        self
    }

    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.push(topic.into());
        self
    }

    pub fn with_auto_offset_reset(mut self, reset: AutoOffsetReset) -> Self {
        self.auto_offset_reset = reset;
        self
    }

    /// 转换为 rdkafka ClientConfig 的配置项
    pub fn to_client_config_entries(&self) -> Vec<(String, String)> {
        let mut entries = self.base.to_client_config_entries();

        entries.push(("group.id".to_string(), self.group_id.clone()));
        entries.push((
            "enable.auto.commit".to_string(),
            self.enable_auto_commit.to_string(),
        ));
        entries.push((
            "auto.offset.reset".to_string(),
            self.auto_offset_reset.as_str().to_string(),
        ));

        entries
    }
}
