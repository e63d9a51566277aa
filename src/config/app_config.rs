// ==========================================
// 仓储 ERP 后台 - 进程级配置
// ==========================================
// 来源: 环境变量（优先） → 用户数据目录 → 当前目录
// ==========================================

use std::path::PathBuf;

/// 数据库目录（目录下每个 schema 一个 `<schema>.db` 文件）
pub const ENV_DB_DIR: &str = "ERP_BACKOFFICE_DB_DIR";

/// 导出暂存目录覆写
pub const ENV_STAGING_DIR: &str = "ERP_BACKOFFICE_STAGING_DIR";

/// 运营 schema（config_kv / action_log 所在库）
pub const DEFAULT_OPS_SCHEMA: &str = "data0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub ops_schema: String,
    /// 来自环境变量的暂存目录；None 时由 config_kv / 默认值决定
    pub staging_dir_override: Option<PathBuf>,
}

impl AppConfig {
    /// 从环境变量加载
    pub fn from_env() -> Self {
        Self {
            db_dir: env_path(ENV_DB_DIR).unwrap_or_else(default_db_dir),
            ops_schema: DEFAULT_OPS_SCHEMA.to_string(),
            staging_dir_override: env_path(ENV_STAGING_DIR),
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    let value = std::env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

/// 默认数据库目录
///
/// 开发构建使用独立目录，避免污染生产数据
pub fn default_db_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(data_dir) => {
            #[cfg(debug_assertions)]
            {
                data_dir.join("erp-backoffice-dev")
            }
            #[cfg(not(debug_assertions))]
            {
                data_dir.join("erp-backoffice")
            }
        }
        None => PathBuf::from("./data"),
    }
}
