//! kafkacli-adapter-kafka - Kafka 适配器
//!
//! 面向 CLI 的 Kafka 功能封装：
//! - 消息消费（消费组、key 过滤、就绪信号）
//! - 消息生产（同步确认、批量缓冲）
//! - Topic 管理（查看、创建、删除、保留期调整）

mod admin;
mod batch;
mod config;
mod consumer;
mod producer;

pub use admin::*;
pub use batch::*;
pub use config::*;
pub use consumer::*;
pub use producer::*;
