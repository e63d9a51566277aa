// ==========================================
// 仓储 ERP 后台 - 配置管理器
// ==========================================
// 职责: 配置加载、查询（带默认值）
// 存储: <运营 schema>.config_kv 表 (key-value)
// ==========================================

use crate::config::engine_config_trait::EngineConfigReader;
use crate::db::validate_schema_name;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// 默认东部州代码
pub const DEFAULT_EAST_STATES: [&str; 18] = [
    "CT", "DE", "FL", "GA", "ME", "MD", "MA", "NH", "NJ", "NY", "NC", "PA", "RI", "SC", "VT", "VA",
    "WV", "DC",
];

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置读取失败 (key: {key}): {message}")]
    ReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ValueError {
        key: String,
        value: String,
        message: String,
    },

    #[error("锁获取失败: {0}")]
    LockError(String),
}

// ==========================================
// SchemaSettings - 业务 schema 名称
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSettings {
    /// 当前 schema: 订单、物料主档、D1 库存
    pub d1: String,
    /// 旧 schema: D5 库存与成本
    pub d5: String,
    /// 发票默认库
    pub invoice: String,
    /// 发票 MD 变体库
    pub invoice_md: String,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            d1: "aisdata1".to_string(),
            d5: "aisdata5".to_string(),
            invoice: "aisdata1".to_string(),
            invoice_md: "aisdata3".to_string(),
        }
    }
}

impl SchemaSettings {
    /// 需要挂载的全部 schema（去重，保持顺序）
    pub fn all(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for s in [&self.d1, &self.d5, &self.invoice, &self.invoice_md] {
            if !out.contains(&s.as_str()) {
                out.push(s.as_str());
            }
        }
        out
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
    schema: String,
    /// 优先于 config_kv 的覆写（来自环境变量）
    overrides: HashMap<String, String>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// # 参数
    /// - conn: 已挂载运营 schema 的连接
    /// - schema: 运营 schema 名称（如 data0）
    pub fn from_connection(conn: Arc<Mutex<Connection>>, schema: &str) -> Result<Self, ConfigError> {
        if !validate_schema_name(schema) {
            return Err(ConfigError::ValueError {
                key: "ops_schema".to_string(),
                value: schema.to_string(),
                message: "非法 schema 名称".to_string(),
            });
        }
        Ok(Self {
            conn,
            schema: schema.to_string(),
            overrides: HashMap::new(),
        })
    }

    /// 追加一个覆写值（优先级最高）
    pub fn with_override(mut self, key: &str, value: &str) -> Self {
        self.overrides.insert(key.to_string(), value.to_string());
        self
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在（含 config_kv 表不存在）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        if let Some(v) = self.overrides.get(key) {
            return Ok(Some(v.clone()));
        }

        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;
        let read_err = |e: rusqlite::Error| ConfigError::ReadError {
            key: key.to_string(),
            message: e.to_string(),
        };

        let has_table: bool = conn
            .query_row(
                &format!(
                    "SELECT 1 FROM {s}.sqlite_master WHERE type = 'table' AND name = 'config_kv' LIMIT 1",
                    s = self.schema
                ),
                [],
                |_row| Ok(true),
            )
            .optional()
            .map_err(read_err)?
            .unwrap_or(false);
        if !has_table {
            return Ok(None);
        }

        conn.query_row(
            &format!("SELECT value FROM {s}.config_kv WHERE key = ?1", s = self.schema),
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(read_err)
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        Ok(self
            .get_config_value(key)?
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    fn get_schema_value(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        let value = self.get_config_or_default(key, default)?.trim().to_string();
        if !validate_schema_name(&value) {
            return Err(ConfigError::ValueError {
                key: key.to_string(),
                value,
                message: "schema 名称只允许字母、数字和下划线".to_string(),
            });
        }
        Ok(value)
    }

    /// 运营 schema 名称
    pub fn ops_schema(&self) -> &str {
        &self.schema
    }
}

#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn get_east_states(&self) -> Result<HashSet<String>, ConfigError> {
        let default = DEFAULT_EAST_STATES.join(",");
        let value = self.get_config_or_default(config_keys::EAST_STATES, &default)?;

        let states: HashSet<String> = value
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        if states.is_empty() {
            return Ok(DEFAULT_EAST_STATES.iter().map(|s| s.to_string()).collect());
        }
        Ok(states)
    }

    async fn get_schema_settings(&self) -> Result<SchemaSettings, ConfigError> {
        let defaults = SchemaSettings::default();
        Ok(SchemaSettings {
            d1: self.get_schema_value(config_keys::SCHEMA_D1, &defaults.d1)?,
            d5: self.get_schema_value(config_keys::SCHEMA_D5, &defaults.d5)?,
            invoice: self.get_schema_value(config_keys::SCHEMA_INVOICE, &defaults.invoice)?,
            invoice_md: self.get_schema_value(config_keys::SCHEMA_INVOICE_MD, &defaults.invoice_md)?,
        })
    }

    async fn get_staging_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = self.get_config_value(config_keys::STAGING_DIR)? {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }
        Ok(default_staging_dir())
    }
}

/// 默认导出暂存目录: 用户本地数据目录/erp-backoffice/exports
pub fn default_staging_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join("erp-backoffice").join("exports"),
        None => PathBuf::from("./exports"),
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 库位分配
    pub const EAST_STATES: &str = "allocation/east_states";

    // schema 路由
    pub const SCHEMA_D1: &str = "schema/d1";
    pub const SCHEMA_D5: &str = "schema/d5";
    pub const SCHEMA_INVOICE: &str = "schema/invoice";
    pub const SCHEMA_INVOICE_MD: &str = "schema/invoice_md";

    // 导出
    pub const STAGING_DIR: &str = "export/staging_dir";
}
