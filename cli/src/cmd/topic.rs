//! topic 管理命令

use clap::Args;
use colored::Colorize;
use kafkacli_adapter_kafka::{KafkaAdmin, TopicConfig, TopicMetadata};
use kafkacli_errors::AppResult;
use tracing::info;

#[derive(Args)]
pub struct ShowArgs {
    /// Kafka broker address
    #[arg(long, env = "KAFKA_BROKER")]
    pub broker: String,

    /// Topic name
    #[arg(long)]
    pub topic: String,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Kafka broker address
    #[arg(long, env = "KAFKA_BROKER")]
    pub broker: String,

    /// Topic name
    #[arg(long)]
    pub topic: String,

    /// Number of partitions
    #[arg(long)]
    pub partitions: i32,

    /// Replication factor
    #[arg(long)]
    pub replication: i32,

    /// Retention time in milliseconds
    #[arg(long, default_value_t = 2137)]
    pub retention: i64,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Kafka broker address
    #[arg(long, env = "KAFKA_BROKER")]
    pub broker: String,

    /// Topic name
    #[arg(long)]
    pub topic: String,
}

#[derive(Args)]
pub struct PurgeArgs {
    /// Kafka broker address
    #[arg(long, env = "KAFKA_BROKER")]
    pub broker: String,

    /// Topic name
    #[arg(long)]
    pub topic: String,

    /// New retention.ms value; records older than this expire
    #[arg(long)]
    pub retention: i64,
}

pub async fn show(args: ShowArgs) -> AppResult<()> {
    let admin = KafkaAdmin::from_brokers(&args.broker)?;
    let metadata = admin.describe_topic(&args.topic).await?;

    println!("{}", render_topic(&metadata));

    Ok(())
}

pub async fn create(args: CreateArgs) -> AppResult<()> {
    let admin = KafkaAdmin::from_brokers(&args.broker)?;
    let config = TopicConfig::new(&args.topic, args.partitions, args.replication)
        .with_retention_ms(args.retention);

    admin.create_topic(&config).await?;
    info!(topic = %args.topic, retention = args.retention, "Topic created");

    Ok(())
}

pub async fn delete(args: DeleteArgs) -> AppResult<()> {
    let admin = KafkaAdmin::from_brokers(&args.broker)?;
    admin.delete_topic(&args.topic).await?;
    info!(topic = %args.topic, "Topic deleted");

    Ok(())
}

pub async fn purge(args: PurgeArgs) -> AppResult<()> {
    let admin = KafkaAdmin::from_brokers(&args.broker)?;
    admin.alter_retention(&args.topic, args.retention).await?;
    info!(topic = %args.topic, retention = args.retention, "Topic retention altered");

    Ok(())
}

/// 渲染 topic 元数据：字符串黄色，数字绿色加粗
fn render_topic(metadata: &TopicMetadata) -> String {
    let mut lines = vec![format!("topic: {}", metadata.name.yellow())];

    match &metadata.retention_ms {
        Some(retention) => lines.push(format!("retention.ms: {}", retention.green().bold())),
        None => lines.push(format!("retention.ms: {}", "unknown".dimmed())),
    }

    lines.push(format!(
        "partitions: {}",
        metadata.partitions.len().to_string().green().bold()
    ));
    lines.push(format!(
        "replication: {}",
        metadata.replication_factor().to_string().green().bold()
    ));

    for partition in &metadata.partitions {
        lines.push(format!(
            "  [{}] leader: {}  replicas: {}  isr: {}",
            partition.id.to_string().green().bold(),
            partition.leader.to_string().green().bold(),
            render_ids(&partition.replicas),
            render_ids(&partition.isr),
        ));
    }

    lines.join("\n")
}

fn render_ids(ids: &[i32]) -> String {
    let rendered: Vec<String> = ids
        .iter()
        .map(|id| id.to_string().green().bold().to_string())
        .collect();
    format!("[{}]", rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafkacli_adapter_kafka::PartitionMetadata;

    #[test]
    fn test_render_topic() {
        colored::control::set_override(false);
        let metadata = TopicMetadata {
            name: "events".to_string(),
            partitions: vec![PartitionMetadata {
                id: 0,
                leader: 1,
                replicas: vec![1, 2],
                isr: vec![1],
            }],
            retention_ms: Some("604800000".to_string()),
        };

        let rendered = render_topic(&metadata);
        assert!(rendered.contains("topic: events"));
        assert!(rendered.contains("retention.ms: 604800000"));
        assert!(rendered.contains("partitions: 1"));
        assert!(rendered.contains("replication: 2"));
        assert!(rendered.contains("[0] leader: 1"));
        assert!(rendered.contains("replicas: [1, 2]"));
        assert!(rendered.contains("isr: [1]"));
    }

    #[test]
    fn test_render_topic_unknown_retention() {
        colored::control::set_override(false);
        let metadata = TopicMetadata {
            name: "events".to_string(),
            partitions: vec![],
            retention_ms: None,
        };

        let rendered = render_topic(&metadata);
        assert!(rendered.contains("retention.ms: unknown"));
        assert!(rendered.contains("partitions: 0"));
    }
}
