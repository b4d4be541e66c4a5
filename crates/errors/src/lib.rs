//! kafkacli-errors - 统一错误处理

use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn broker(msg: impl Into<String>) -> Self {
        Self::Broker(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::connection("broker unreachable");
        assert_eq!(err.to_string(), "Connection error: broker unreachable");

        let err = AppError::broker("topic already exists");
        assert_eq!(err.to_string(), "Broker error: topic already exists");

        let err = AppError::validation("no message provided");
        assert_eq!(err.to_string(), "Validation error: no message provided");

        let err = AppError::io("failed to read message file");
        assert_eq!(err.to_string(), "IO error: failed to read message file");

        let err = AppError::internal("consumer task failed");
        assert_eq!(err.to_string(), "Internal error: consumer task failed");
    }
}
