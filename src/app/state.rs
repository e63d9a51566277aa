// ==========================================
// 仓储 ERP 后台 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 装配顺序: 运营 schema → 配置 → 业务 schema → 仓储 → API
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{AllocationApi, ExportApi, RedistributionApi};
use crate::config::{config_keys, AppConfig, ConfigManager, EngineConfigReader, SchemaSettings};
use crate::db::{attach_missing_schemas, open_erp_connection};
use crate::export::ExportStaging;
use crate::repository::{ActionLogRepository, InventoryRepository, InvoiceRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 已生效的 schema 配置
    pub schemas: SchemaSettings,

    /// 库位分配API
    pub allocation_api: Arc<AllocationApi>,

    /// 其他费用重分摊API
    pub redistribution_api: Arc<RedistributionApi>,

    /// 导出文件下载API
    pub export_api: Arc<ExportApi>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 按进程配置打开数据库并装配
    ///
    /// # 说明
    /// 1. 挂载运营 schema，读取 config_kv
    /// 2. 按配置挂载业务 schema
    /// 3. 初始化仓储与 API
    pub async fn new(app_config: AppConfig) -> Result<Self, String> {
        tracing::info!(db_dir = %app_config.db_dir.display(), "初始化AppState");

        std::fs::create_dir_all(&app_config.db_dir)
            .map_err(|e| format!("无法创建数据库目录: {}", e))?;
        let conn = open_erp_connection(&app_config.db_dir, &[app_config.ops_schema.as_str()])
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config = Self::config_manager(conn.clone(), &app_config)?;
        let schemas = config
            .get_schema_settings()
            .await
            .map_err(|e| format!("无法读取 schema 配置: {}", e))?;

        {
            let guard = conn.lock().map_err(|e| format!("数据库锁获取失败: {}", e))?;
            attach_missing_schemas(&guard, &app_config.db_dir, &schemas.all())
                .map_err(|e| format!("无法挂载业务 schema: {}", e))?;
        }

        Self::assemble(conn, config, schemas).await
    }

    /// 基于已挂载全部 schema 的连接装配（测试 / 嵌入使用）
    pub async fn from_connection(conn: Connection, app_config: AppConfig) -> Result<Self, String> {
        let conn = Arc::new(Mutex::new(conn));
        let config = Self::config_manager(conn.clone(), &app_config)?;
        let schemas = config
            .get_schema_settings()
            .await
            .map_err(|e| format!("无法读取 schema 配置: {}", e))?;
        Self::assemble(conn, config, schemas).await
    }

    fn config_manager(
        conn: Arc<Mutex<Connection>>,
        app_config: &AppConfig,
    ) -> Result<Arc<ConfigManager>, String> {
        let mut manager = ConfigManager::from_connection(conn, &app_config.ops_schema)
            .map_err(|e| format!("无法创建ConfigManager: {}", e))?;
        if let Some(dir) = &app_config.staging_dir_override {
            manager = manager.with_override(config_keys::STAGING_DIR, &dir.to_string_lossy());
        }
        Ok(Arc::new(manager))
    }

    async fn assemble(
        conn: Arc<Mutex<Connection>>,
        config: Arc<ConfigManager>,
        schemas: SchemaSettings,
    ) -> Result<Self, String> {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let action_log_repo = Arc::new(
            ActionLogRepository::new(conn.clone(), config.ops_schema())
                .map_err(|e| format!("无法创建ActionLogRepository: {}", e))?,
        );
        // best-effort: 日志表缺失不阻塞启动，写日志时再告警
        if let Err(e) = action_log_repo.ensure_table() {
            tracing::warn!("action_log 表初始化失败(将继续启动): {}", e);
        }

        let inventory_repo = Arc::new(
            InventoryRepository::new(conn.clone(), &schemas.d1, &schemas.d5)
                .map_err(|e| format!("无法创建InventoryRepository: {}", e))?,
        );
        let invoice_repo = Arc::new(InvoiceRepository::new(conn.clone()));

        // ==========================================
        // 导出暂存目录
        // ==========================================
        let staging_dir = config
            .get_staging_dir()
            .await
            .map_err(|e| format!("无法读取暂存目录配置: {}", e))?;
        let staging = ExportStaging::new(&staging_dir)
            .map_err(|e| format!("无法创建暂存目录 {}: {}", staging_dir.display(), e))?;

        // ==========================================
        // 初始化API层
        // ==========================================
        let allocation_api = Arc::new(AllocationApi::new(
            inventory_repo,
            config.clone(),
            staging.clone(),
            action_log_repo.clone(),
        ));
        let redistribution_api = Arc::new(RedistributionApi::new(
            invoice_repo,
            config,
            action_log_repo.clone(),
        ));
        let export_api = Arc::new(ExportApi::new(staging));

        tracing::info!(
            d1 = %schemas.d1,
            d5 = %schemas.d5,
            invoice = %schemas.invoice,
            invoice_md = %schemas.invoice_md,
            staging = %staging_dir.display(),
            "AppState初始化完成"
        );

        Ok(Self {
            schemas,
            allocation_api,
            redistribution_api,
            export_api,
            action_log_repo,
        })
    }
}
