//! Kafka Admin 模块
//!
//! 提供 Topic 管理功能：查看、创建、删除、保留期调整

use std::collections::HashMap;
use std::time::Duration;

use kafkacli_errors::{AppError, AppResult};
use rdkafka::admin::{
    AdminClient, AdminOptions, AlterConfig, NewTopic, ResourceSpecifier, TopicReplication,
};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use tracing::{debug, error, info};

use crate::config::KafkaConfig;

/// Topic 配置
#[derive(Debug, Clone)]
pub struct TopicConfig {
    /// Topic 名称
    pub name: String,
    /// 分区数量
    pub num_partitions: i32,
    /// 副本因子
    pub replication_factor: i32,
    /// 额外配置
    pub config: HashMap<String, String>,
}

impl TopicConfig {
    pub fn new(name: impl Into<String>, num_partitions: i32, replication_factor: i32) -> Self {
        Self {
            name: name.into(),
            num_partitions,
            replication_factor,
            config: HashMap::new(),
        }
    }

    /// 设置保留时间（毫秒）
    pub fn with_retention_ms(mut self, ms: i64) -> Self {
        self.config
            .insert("retention.ms".to_string(), ms.to_string());
        self
    }

    /// 添加自定义配置
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// Topic 元数据
#[derive(Debug, Clone)]
pub struct TopicMetadata {
    /// Topic 名称
    pub name: String,
    /// 分区列表
    pub partitions: Vec<PartitionMetadata>,
    /// 保留时间（毫秒，broker 返回的文本值）
    pub retention_ms: Option<String>,
}

impl TopicMetadata {
    /// 副本因子，由首个分区的副本集推导
    pub fn replication_factor(&self) -> usize {
        self.partitions
            .first()
            .map(|p| p.replicas.len())
            .unwrap_or(0)
    }
}

/// 分区元数据
#[derive(Debug, Clone)]
pub struct PartitionMetadata {
    /// 分区 ID
    pub id: i32,
    /// Leader broker ID
    pub leader: i32,
    /// 副本 broker IDs
    pub replicas: Vec<i32>,
    /// ISR (In-Sync Replicas) broker IDs
    pub isr: Vec<i32>,
}

/// Kafka Admin 客户端
pub struct KafkaAdmin {
    admin: AdminClient<DefaultClientContext>,
    config: KafkaConfig,
    timeout: Duration,
}

impl KafkaAdmin {
    /// 创建 Admin 客户端
    pub fn new(config: &KafkaConfig) -> AppResult<Self> {
        let mut client_config = ClientConfig::new();

        for (key, value) in config.to_client_config_entries() {
            client_config.set(&key, &value);
        }

        let admin: AdminClient<DefaultClientContext> = client_config
            .create()
            .map_err(|e| AppError::connection(format!("Failed to create admin client: {}", e)))?;

        Ok(Self {
            admin,
            config: config.clone(),
            timeout: Duration::from_secs(30),
        })
    }

    /// 从 broker 地址创建
    pub fn from_brokers(brokers: &str) -> AppResult<Self> {
        let config = KafkaConfig::new(brokers);
        Self::new(&config)
    }

    /// 设置超时时间
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 查看单个 Topic 的元数据
    ///
    /// 请求的是一个 topic，broker 返回的数量不是一就报错。
    pub async fn describe_topic(&self, topic: &str) -> AppResult<TopicMetadata> {
        let config = self.config.clone();
        let name = topic.to_string();
        let timeout = self.timeout;

        let mut topic_metadata =
            tokio::task::spawn_blocking(move || fetch_topic_metadata(&config, &name, timeout))
                .await
                .map_err(|e| AppError::internal(format!("Metadata task failed: {}", e)))??;

        topic_metadata.retention_ms = self.topic_retention(topic).await;

        Ok(topic_metadata)
    }

    /// 查询 topic 的 retention.ms 配置，查不到时降级为 None
    async fn topic_retention(&self, topic: &str) -> Option<String> {
        let opts = AdminOptions::new().request_timeout(Some(self.timeout));
        let specifier = ResourceSpecifier::Topic(topic);

        let results = match self.admin.describe_configs(&[specifier], &opts).await {
            Ok(results) => results,
            Err(e) => {
                debug!(topic = topic, error = %e, "Failed to describe topic configs");
                return None;
            }
        };

        results.into_iter().next().and_then(|result| match result {
            Ok(resource) => resource
                .get("retention.ms")
                .and_then(|entry| entry.value.clone()),
            Err(e) => {
                debug!(topic = topic, error = ?e, "Topic config lookup failed");
                None
            }
        })
    }

    /// 创建 Topic
    ///
    /// 不做幂等处理，topic 已存在时原样返回 broker 错误。
    pub async fn create_topic(&self, topic_config: &TopicConfig) -> AppResult<()> {
        let mut new_topic = NewTopic::new(
            &topic_config.name,
            topic_config.num_partitions,
            TopicReplication::Fixed(topic_config.replication_factor),
        );

        for (key, value) in &topic_config.config {
            new_topic = new_topic.set(key, value);
        }

        let opts = AdminOptions::new().operation_timeout(Some(self.timeout));

        let results: Vec<Result<String, (String, rdkafka::error::RDKafkaErrorCode)>> = self
            .admin
            .create_topics(&[new_topic], &opts)
            .await
            .map_err(|e| AppError::broker(format!("Failed to create topic: {}", e)))?;

        for result in results {
            match result {
                Ok(name) => {
                    info!(topic = %name, "Topic created successfully");
                }
                Err((name, err)) => {
                    error!(topic = %name, error = ?err, "Failed to create topic");
                    return Err(AppError::broker(format!(
                        "Failed to create topic {}: {:?}",
                        name, err
                    )));
                }
            }
        }

        Ok(())
    }

    /// 删除 Topic
    pub async fn delete_topic(&self, topic: &str) -> AppResult<()> {
        let opts = AdminOptions::new().operation_timeout(Some(self.timeout));

        let results: Vec<Result<String, (String, rdkafka::error::RDKafkaErrorCode)>> = self
            .admin
            .delete_topics(&[topic], &opts)
            .await
            .map_err(|e| AppError::broker(format!("Failed to delete topic: {}", e)))?;

        for result in results {
            match result {
                Ok(name) => {
                    info!(topic = %name, "Topic deleted successfully");
                }
                Err((name, err)) => {
                    error!(topic = %name, error = ?err, "Failed to delete topic");
                    return Err(AppError::broker(format!(
                        "Failed to delete topic {}: {:?}",
                        name, err
                    )));
                }
            }
        }

        Ok(())
    }

    /// 调整 Topic 的保留时间（毫秒）
    pub async fn alter_retention(&self, topic: &str, retention_ms: i64) -> AppResult<()> {
        let retention = retention_ms.to_string();
        let alter =
            AlterConfig::new(ResourceSpecifier::Topic(topic)).set("retention.ms", &retention);

        let opts = AdminOptions::new().request_timeout(Some(self.timeout));

        let results = self
            .admin
            .alter_configs(&[alter], &opts)
            .await
            .map_err(|e| AppError::broker(format!("Failed to alter retention: {}", e)))?;

        for result in results {
            match result {
                Ok(resource) => {
                    info!(resource = ?resource, retention_ms = retention_ms, "Retention updated");
                }
                Err((resource, err)) => {
                    error!(resource = ?resource, error = ?err, "Failed to alter retention");
                    return Err(AppError::broker(format!(
                        "Failed to alter retention for {:?}: {:?}",
                        resource, err
                    )));
                }
            }
        }

        Ok(())
    }
}

/// 拉取单个 topic 的元数据（阻塞调用，放在 blocking 线程池执行）
fn fetch_topic_metadata(
    config: &KafkaConfig,
    topic: &str,
    timeout: Duration,
) -> AppResult<TopicMetadata> {
    let mut client_config = ClientConfig::new();

    for (key, value) in config.to_client_config_entries() {
        client_config.set(&key, &value);
    }

    let consumer: BaseConsumer = client_config
        .create()
        .map_err(|e| AppError::connection(format!("Failed to create metadata client: {}", e)))?;

    let metadata = consumer
        .fetch_metadata(Some(topic), timeout)
        .map_err(|e| AppError::connection(format!("Failed to fetch metadata: {}", e)))?;

    for t in metadata.topics() {
        if let Some(err) = t.error() {
            return Err(AppError::broker(format!(
                "Topic {} metadata error: {:?}",
                t.name(),
                err
            )));
        }
    }

    let topics: Vec<TopicMetadata> = metadata
        .topics()
        .iter()
        .map(|t| TopicMetadata {
            name: t.name().to_string(),
            partitions: t
                .partitions()
                .iter()
                .map(|p| PartitionMetadata {
                    id: p.id(),
                    leader: p.leader(),
                    replicas: p.replicas().to_vec(),
                    isr: p.isr().to_vec(),
                })
                .collect(),
            retention_ms: None,
        })
        .collect();

    single_topic(topics)
}

/// 要求元数据结果恰好包含一个 topic
fn single_topic(mut topics: Vec<TopicMetadata>) -> AppResult<TopicMetadata> {
    if topics.len() != 1 {
        return Err(AppError::broker(format!(
            "number of topic informations should be 1, got {}",
            topics.len()
        )));
    }
    Ok(topics.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic_metadata(name: &str) -> TopicMetadata {
        TopicMetadata {
            name: name.to_string(),
            partitions: vec![PartitionMetadata {
                id: 0,
                leader: 1,
                replicas: vec![1],
                isr: vec![1],
            }],
            retention_ms: None,
        }
    }

    #[test]
    fn test_topic_config() {
        let config = TopicConfig::new("test-topic", 3, 2)
            .with_retention_ms(86400000)
            .with_config("cleanup.policy", "delete");

        assert_eq!(config.name, "test-topic");
        assert_eq!(config.num_partitions, 3);
        assert_eq!(config.replication_factor, 2);
        assert_eq!(
            config.config.get("retention.ms"),
            Some(&"86400000".to_string())
        );
        assert_eq!(
            config.config.get("cleanup.policy"),
            Some(&"delete".to_string())
        );
    }

    #[test]
    fn test_single_topic() {
        let result = single_topic(vec![topic_metadata("events")]).unwrap();
        assert_eq!(result.name, "events");
    }

    #[test]
    fn test_replication_factor_from_first_partition() {
        let mut metadata = topic_metadata("events");
        metadata.partitions[0].replicas = vec![1, 2, 3];
        assert_eq!(metadata.replication_factor(), 3);

        metadata.partitions.clear();
        assert_eq!(metadata.replication_factor(), 0);
    }

    #[test]
    fn test_single_topic_empty() {
        let err = single_topic(vec![]).unwrap_err();
        assert!(err.to_string().contains("should be 1"));
    }

    #[test]
    fn test_single_topic_multiple() {
        let err = single_topic(vec![topic_metadata("a"), topic_metadata("b")]).unwrap_err();
        assert!(err.to_string().contains("got 2"));
    }

    #[tokio::test]
    #[ignore] // 需要 Kafka 实例
    async fn test_topic_lifecycle() {
        let admin = KafkaAdmin::from_brokers("localhost:9092").unwrap();

        let config = TopicConfig::new("test-admin-topic", 3, 1).with_retention_ms(60000);
        admin.create_topic(&config).await.unwrap();

        let metadata = admin.describe_topic("test-admin-topic").await.unwrap();
        assert_eq!(metadata.partitions.len(), 3);

        admin.alter_retention("test-admin-topic", 120000).await.unwrap();
        admin.delete_topic("test-admin-topic").await.unwrap();
    }
}
