// ==========================================
// 仓储 ERP 后台 - 其他费用重分摊 API
// ==========================================
// 职责: 请求 → 引擎 → 结构化响应；提交时记录操作日志
// 约定:
//   - 输入校验失败 → { success: false, error }
//   - 无数据 → success + 零计数 + 说明
//   - 数据库故障 → ApiError 向上传播
// ==========================================

use crate::api::error::ApiResult;
use crate::config::{ConfigManager, EngineConfigReader};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::invoice::ChangeRow;
use crate::engine::{RedistributionEngine, RedistributionOutcome, RedistributionRequest};
use crate::repository::{ActionLogRepository, InvoiceRepository};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// 重分摊 API 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedistributionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub dry_run: bool,
    pub db: String,
    pub affected_trno_count: usize,
    pub updated_rows: usize,
    pub changes: Vec<ChangeRow>,
    pub notes: Vec<String>,
}

impl RedistributionResponse {
    pub fn failure(dry_run: bool, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            dry_run,
            db: String::new(),
            affected_trno_count: 0,
            updated_rows: 0,
            changes: Vec::new(),
            notes: Vec::new(),
        }
    }
}

impl From<RedistributionOutcome> for RedistributionResponse {
    fn from(outcome: RedistributionOutcome) -> Self {
        Self {
            success: true,
            error: None,
            dry_run: outcome.dry_run,
            db: outcome.db,
            affected_trno_count: outcome.affected_trno_count,
            updated_rows: outcome.updated_rows,
            changes: outcome.changes,
            notes: outcome.notes,
        }
    }
}

/// 其他费用重分摊 API
pub struct RedistributionApi {
    engine: RedistributionEngine<InvoiceRepository>,
    config: Arc<ConfigManager>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl RedistributionApi {
    pub fn new(
        invoice_repo: Arc<InvoiceRepository>,
        config: Arc<ConfigManager>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            engine: RedistributionEngine::new(invoice_repo),
            config,
            action_log_repo,
        }
    }

    /// 执行重分摊
    pub async fn run(&self, request: &RedistributionRequest, actor: &str) -> ApiResult<RedistributionResponse> {
        let schemas = self.config.get_schema_settings().await?;

        let outcome = match self.engine.run(request, &schemas) {
            Ok(outcome) => outcome,
            Err(e) if e.is_validation() => {
                warn!(error = %e, "重分摊请求校验失败");
                return Ok(RedistributionResponse::failure(request.dry_run, e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if !outcome.dry_run && outcome.affected_trno_count > 0 {
            let mut log = ActionLog::now(ActionType::OtherChargeRemove, actor);
            log.db = Some(outcome.db.clone());
            log.payload_json = Some(json!(request));
            log.impact_summary_json = Some(json!({
                "affected_trno_count": outcome.affected_trno_count,
                "updated_rows": outcome.updated_rows,
            }));
            log.detail = Some(format!(
                "{} ~ {} 清零其他费用 {} 张发票",
                request.start_date, request.end_date, outcome.affected_trno_count
            ));
            if let Err(e) = self.action_log_repo.insert(&log) {
                warn!(error = %e, "操作日志写入失败");
            }
        }

        Ok(outcome.into())
    }
}
