// ==========================================
// 仓储 ERP 后台 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 区域 (Region)
// ==========================================
// 由订单收货州代码决定；影响同一订单内 D1 仓号的优先顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    East,
    West,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::East => "East",
            Region::West => "West",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 仓库范围 (Warehouse Scope)
// ==========================================
// D1: 当前 schema 的库存/物料；D5: 旧 schema 的库存/物料
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarehouseScope {
    D1,
    D5,
}

impl WarehouseScope {
    /// AltBin 审计串中使用的仓号
    pub fn warehouse_number(&self) -> &'static str {
        match self {
            WarehouseScope::D1 => "1",
            WarehouseScope::D5 => "5",
        }
    }
}

impl fmt::Display for WarehouseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarehouseScope::D1 => write!(f, "D1"),
            WarehouseScope::D5 => write!(f, "D5"),
        }
    }
}

// ==========================================
// 发票库变体 (Invoice Schema Variant)
// ==========================================
// 操作名包含 "(MD)" 时使用 MD 变体库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceSchemaVariant {
    Default,
    Md,
}

impl InvoiceSchemaVariant {
    pub fn from_action(action: &str) -> Self {
        if action.contains("(MD)") {
            InvoiceSchemaVariant::Md
        } else {
            InvoiceSchemaVariant::Default
        }
    }
}
