// ==========================================
// 仓储 ERP 后台 - 配置层
// ==========================================
// 职责: 系统配置管理（环境变量 → config_kv → 默认值）
// 存储: <运营 schema>.config_kv 表
// ==========================================

pub mod app_config;
pub mod config_manager;
pub mod engine_config_trait;

// 重导出核心配置管理器
pub use app_config::AppConfig;
pub use config_manager::{config_keys, ConfigError, ConfigManager, SchemaSettings, DEFAULT_EAST_STATES};
pub use engine_config_trait::EngineConfigReader;
