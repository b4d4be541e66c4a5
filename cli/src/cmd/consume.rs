//! consume 命令
//!
//! 启动一个消费循环 worker，等首个会话就绪后阻塞到循环结束。

use clap::{Args, ValueEnum};
use kafkacli_adapter_kafka::{AutoOffsetReset, ConsumerConfig, GroupConsumer, MessagePrinter};
use kafkacli_errors::{AppError, AppResult};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::shutdown::shutdown_signal;

#[derive(Args)]
pub struct ConsumeArgs {
    /// Kafka broker address
    #[arg(long, env = "KAFKA_BROKER")]
    pub broker: String,

    /// Topic name
    #[arg(long)]
    pub topic: String,

    /// Kafka consumer group id
    #[arg(long = "groupid")]
    pub group_id: String,

    /// Where to start when the group has no committed offset
    #[arg(long = "offsetReset", value_enum, default_value_t = OffsetResetArg::Latest)]
    pub offset_reset: OffsetResetArg,

    /// Print only messages whose key equals this value
    #[arg(long)]
    pub key: Option<String>,

    /// Decode and print the message body as JSON
    #[arg(long = "showMessage")]
    pub show_message: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OffsetResetArg {
    Earliest,
    Latest,
}

impl From<OffsetResetArg> for AutoOffsetReset {
    fn from(value: OffsetResetArg) -> Self {
        match value {
            OffsetResetArg::Earliest => AutoOffsetReset::Earliest,
            OffsetResetArg::Latest => AutoOffsetReset::Latest,
        }
    }
}

pub async fn run(args: ConsumeArgs) -> AppResult<()> {
    let config = ConsumerConfig::new(&args.broker, &args.group_id)
        .with_client_id(&args.group_id)
        .with_topic(&args.topic)
        .with_auto_offset_reset(args.offset_reset.into());

    let (consumer, ready) = GroupConsumer::subscribe(&config)?;

    // 空字符串视同未设置过滤
    let key_filter = args.key.filter(|k| !k.is_empty());
    let printer = MessagePrinter::new(key_filter, args.show_message);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    let worker = tokio::spawn(async move { consumer.run(cancel, &printer).await });

    if ready.await.is_err() {
        // 首个会话还没建立消费循环就结束了，取它的结果作为答案
        return worker
            .await
            .map_err(|e| AppError::internal(format!("Consumer task failed: {}", e)))?;
    }
    info!("Consumer up and running, waiting for messages");

    worker
        .await
        .map_err(|e| AppError::internal(format!("Consumer task failed: {}", e)))?
}
