// ==========================================
// 仓储 ERP 后台 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义 API 层组装引擎时所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::config_manager::{ConfigError, SchemaSettings};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 获取东部州代码集合（大写）
    ///
    /// # 默认值
    /// - CT, DE, FL, GA, ME, MD, MA, NH, NJ, NY, NC, PA, RI, SC, VT, VA, WV, DC
    async fn get_east_states(&self) -> Result<HashSet<String>, ConfigError>;

    /// 获取各业务 schema 名称
    ///
    /// # 默认值
    /// - d1=aisdata1, d5=aisdata5, invoice=aisdata1, invoice_md=aisdata3
    async fn get_schema_settings(&self) -> Result<SchemaSettings, ConfigError>;

    /// 获取导出文件暂存目录
    async fn get_staging_dir(&self) -> Result<PathBuf, ConfigError>;
}
