// ==========================================
// 仓储 ERP 后台 - 库位分配 API
// ==========================================
// 职责: 上传订单号清单 → 分配 → 派生工作表 → 写出工作簿
// 入口:
//   allocate_csv    CSV 文本
//   allocate_upload 上传文件（CSV / Excel）
//   save_grid       前端回传的二维数组（回存再导出，不重新分配）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, EngineConfigReader};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::table::AllocationTable;
use crate::engine::{BinAllocationEngine, OpoBuilder};
use crate::export::{ExportStaging, WorkbookWriter};
use crate::importer::{ImportError, OrderListParser};
use crate::repository::{ActionLogRepository, InventoryRepository};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub const STATUS_OK: &str = "ok";
pub const STATUS_ERROR: &str = "error";

/// 分配 API 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResponse {
    /// "ok" / "error"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<AllocationTable>,
    /// 暂存目录中的工作簿文件名（用于下载）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl AllocationResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: Some(message.into()),
            table: None,
            file_name: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// 库位分配 API
pub struct AllocationApi {
    engine: BinAllocationEngine<InventoryRepository>,
    opo_builder: OpoBuilder<InventoryRepository>,
    config: Arc<ConfigManager>,
    staging: ExportStaging,
    action_log_repo: Arc<ActionLogRepository>,
}

impl AllocationApi {
    pub fn new(
        inventory_repo: Arc<InventoryRepository>,
        config: Arc<ConfigManager>,
        staging: ExportStaging,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            engine: BinAllocationEngine::new(inventory_repo.clone()),
            opo_builder: OpoBuilder::new(inventory_repo),
            config,
            staging,
            action_log_repo,
        }
    }

    /// 解析 CSV 文本并分配
    pub async fn allocate_csv(&self, text: &str, actor: &str) -> ApiResult<AllocationResponse> {
        match OrderListParser::parse_csv_text(text) {
            Ok(ordnos) => self.allocate_orders(&ordnos, actor).await,
            Err(e) => Self::input_failure(e),
        }
    }

    /// 解析上传文件并分配
    pub async fn allocate_upload(&self, path: &Path, actor: &str) -> ApiResult<AllocationResponse> {
        match OrderListParser::parse_file(path) {
            Ok(ordnos) => self.allocate_orders(&ordnos, actor).await,
            Err(e) => Self::input_failure(e),
        }
    }

    /// 按订单号分配并导出
    pub async fn allocate_orders(&self, ordnos: &[String], actor: &str) -> ApiResult<AllocationResponse> {
        let east_states = self.config.get_east_states().await?;
        let table = self.engine.allocate(ordnos, &east_states)?;

        let message = if table.is_empty() {
            Some("未找到任何订单行".to_string())
        } else {
            None
        };

        let file_name = self.export(&table)?;
        self.record(
            ActionType::AllocationExport,
            actor,
            json!({ "ordnos": ordnos }),
            json!({ "rows": table.rows.len(), "file_name": file_name }),
        );

        info!(orders = ordnos.len(), rows = table.rows.len(), file = %file_name, "分配导出完成");
        Ok(AllocationResponse {
            status: STATUS_OK.to_string(),
            message,
            table: Some(table),
            file_name: Some(file_name),
        })
    }

    /// 回存前端编辑后的分配表并重新导出
    pub async fn save_grid(&self, grid: Vec<Vec<Value>>, actor: &str) -> ApiResult<AllocationResponse> {
        let table = match AllocationTable::from_grid(grid) {
            Some(t) if t.columns.iter().any(|c| !c.is_empty()) => t,
            _ => return Ok(AllocationResponse::error("表格为空，缺少表头")),
        };

        let file_name = self.export(&table)?;
        self.record(
            ActionType::AllocationResave,
            actor,
            json!({ "columns": table.columns }),
            json!({ "rows": table.rows.len(), "file_name": file_name }),
        );

        Ok(AllocationResponse {
            status: STATUS_OK.to_string(),
            message: None,
            table: Some(table),
            file_name: Some(file_name),
        })
    }

    fn export(&self, table: &AllocationTable) -> ApiResult<String> {
        let today = Local::now().date_naive();
        let sheets = self.opo_builder.build_sheets(table, today)?;
        let (name, path) = self.staging.allocate_file();
        WorkbookWriter::write_to_path(&sheets, &path)?;
        Ok(name)
    }

    fn input_failure(err: ImportError) -> ApiResult<AllocationResponse> {
        if err.is_input_error() {
            warn!(error = %err, "订单号清单解析失败");
            Ok(AllocationResponse::error(err.to_string()))
        } else {
            Err(ApiError::from(err))
        }
    }

    /// 记录操作日志（失败只告警，不影响导出结果）
    fn record(&self, action_type: ActionType, actor: &str, payload: Value, impact: Value) {
        let mut log = ActionLog::now(action_type, actor);
        log.payload_json = Some(payload);
        log.impact_summary_json = Some(impact);
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %action_type, "操作日志写入失败");
        }
    }
}
