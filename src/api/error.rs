// ==========================================
// 仓储 ERP 后台 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，将下层技术错误转换为用户可读的错误消息
// 约定: 输入校验失败不走这里（返回结构化失败响应）；这里只承载协作方故障
// ==========================================

use crate::config::ConfigError;
use crate::engine::RedistributionError;
use crate::export::ExportError;
use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入 / 导出 / 配置错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("文件导出失败: {0}")]
    ExportError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::InvalidSchemaName(name) => {
                ApiError::ConfigError(format!("非法 schema 名称: {}", name))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Other(e) => ApiError::Other(e),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::NotFound(name) => ApiError::NotFound(format!("导出文件 {} 不存在", name)),
            ExportError::InvalidFileName(name) => {
                ApiError::InvalidInput(format!("非法文件名: {}", name))
            }
            other => ApiError::ExportError(other.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<RedistributionError> for ApiError {
    fn from(err: RedistributionError) -> Self {
        match err {
            RedistributionError::Repository(e) => e.into(),
            other => ApiError::InvalidInput(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Invoice".to_string(),
            id: "9001".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Invoice"));
                assert!(msg.contains("9001"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = RepositoryError::DatabaseTransactionError("发票 9001 提交失败".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseTransactionError(ref m) if m.contains("9001")));
    }

    #[test]
    fn test_lock_and_unexpected_errors() {
        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseConnectionError(ref m) if m.contains("poisoned")));

        let import_err = ImportError::Other(anyhow::anyhow!("unexpected"));
        assert!(!import_err.is_input_error());
        assert!(matches!(ApiError::from(import_err), ApiError::Other(_)));

        let import_err = ImportError::HeaderMismatch("Order".to_string());
        assert!(import_err.is_input_error());
        assert!(matches!(ApiError::from(import_err), ApiError::ImportError(_)));
    }

    #[test]
    fn test_export_error_conversion() {
        let api_err: ApiError = ExportError::NotFound("a.xlsx".to_string()).into();
        assert!(matches!(api_err, ApiError::NotFound(_)));

        let api_err: ApiError = ExportError::InvalidFileName("../a".to_string()).into();
        assert!(matches!(api_err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_redistribution_error_conversion() {
        let api_err: ApiError =
            RedistributionError::Repository(RepositoryError::DatabaseQueryError("boom".to_string())).into();
        assert!(matches!(api_err, ApiError::DatabaseError(_)));

        let api_err: ApiError = RedistributionError::UnsupportedAction("x".to_string()).into();
        assert!(matches!(api_err, ApiError::InvalidInput(_)));
    }
}
