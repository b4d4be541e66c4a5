//! publish 命令

use std::fs;

use clap::Args;
use kafkacli_adapter_kafka::KafkaPublisher;
use kafkacli_errors::{AppError, AppResult};
use tracing::info;

#[derive(Args)]
pub struct PublishArgs {
    /// Kafka broker address
    #[arg(long, env = "KAFKA_BROKER")]
    pub broker: String,

    /// Topic name
    #[arg(long)]
    pub topic: String,

    /// Inline message body
    #[arg(long, conflicts_with = "json")]
    pub message: Option<String>,

    /// Path to a JSON file used as the message body
    #[arg(long)]
    pub json: Option<String>,

    /// Message key
    #[arg(long)]
    pub key: Option<String>,
}

pub async fn run(args: PublishArgs) -> AppResult<()> {
    // 先解析消息内容，拿不到就不触发任何网络调用
    let payload = resolve_payload(args.message, args.json)?;

    let publisher = KafkaPublisher::from_brokers(&args.broker)?;
    let (partition, offset) = publisher
        .publish(&args.topic, args.key.as_deref(), &payload)
        .await?;

    info!(partition = partition, offset = offset, "Message sent");

    Ok(())
}

/// 确定消息内容：优先 inline 字符串，其次文件内容
fn resolve_payload(message: Option<String>, json: Option<String>) -> AppResult<String> {
    if let Some(message) = message {
        if !message.is_empty() {
            return Ok(message);
        }
    }

    if let Some(path) = json {
        let contents = fs::read_to_string(&path)
            .map_err(|e| AppError::io(format!("Failed to read {}: {}", path, e)))?;
        return Ok(contents);
    }

    Err(AppError::validation("no message provided"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_payload_inline() {
        let payload = resolve_payload(Some("hello".to_string()), None).unwrap();
        assert_eq!(payload, "hello");
    }

    #[test]
    fn test_resolve_payload_file() {
        let dir = std::env::temp_dir().join("kafkacli-publish-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("message.json");
        fs::write(&path, r#"{"a":1}"#).unwrap();

        let payload = resolve_payload(None, Some(path.to_string_lossy().into_owned())).unwrap();
        assert_eq!(payload, r#"{"a":1}"#);
    }

    #[test]
    fn test_resolve_payload_missing() {
        let err = resolve_payload(None, None).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: no message provided");
    }

    #[test]
    fn test_resolve_payload_missing_file() {
        let err = resolve_payload(None, Some("/nonexistent/message.json".to_string())).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_resolve_payload_empty_inline() {
        let err = resolve_payload(Some(String::new()), None).unwrap_err();
        assert!(err.to_string().contains("no message provided"));
    }
}
