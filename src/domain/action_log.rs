// ==========================================
// 仓储 ERP 后台 - 操作日志领域模型
// ==========================================
// 用途: 审计追踪（写入 data0.action_log）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,
    pub action_ts: NaiveDateTime,
    pub actor: String,

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>,

    // ===== 影响摘要 =====
    pub impact_summary_json: Option<JsonValue>,

    /// 涉及的 schema
    pub db: Option<String>,
    pub detail: Option<String>,
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    AllocationExport,  // 库位分配导出
    AllocationResave,  // 分配表回存再导出
    OtherChargeRemove, // 其他费用重分摊（已提交）
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::AllocationExport => write!(f, "AllocationExport"),
            ActionType::AllocationResave => write!(f, "AllocationResave"),
            ActionType::OtherChargeRemove => write!(f, "OtherChargeRemove"),
        }
    }
}

impl ActionLog {
    /// 以当前时间创建日志
    pub fn now(action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            payload_json: None,
            impact_summary_json: None,
            db: None,
            detail: None,
        }
    }
}
