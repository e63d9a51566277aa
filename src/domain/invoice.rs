// ==========================================
// 仓储 ERP 后台 - 发票领域模型（其他费用重分摊）
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// InvoiceHeader - 候选发票（表头）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceHeader {
    pub trno: String,
    pub invdate: Option<String>,
    /// 其他费用 1
    pub other_charge1: f64,
}

// ==========================================
// InvoiceLine - 发票行（已关联表头）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub trno: String,
    pub custpo: Option<String>,
    pub invdate: Option<String>,
    pub itemno: String,
    /// 发货数量
    pub shiqty: f64,
    pub unit_price: f64,
    /// 行金额
    pub unit_amount: f64,
    pub other_charge1: f64,
    pub tax_amount: f64,
    pub jrnl: Option<String>,
}

// ==========================================
// LineAdjustment - 行价格调整
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAdjustment {
    pub itemno: String,
    /// 单价增量
    pub add: f64,
    pub new_price: f64,
    pub total_price: f64,
}

// ==========================================
// InvoiceAdjustment - 单张发票的重分摊结果（写库单元）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceAdjustment {
    pub trno: String,
    /// 最大可解析行日期 (YYYY-MM-DD)，都无法解析时为空串
    pub invdate: String,
    /// 原行金额合计
    pub total: f64,
    pub other_charge1: f64,
    /// 新小计 = round2(total + other_charge1)
    pub sub_total: f64,
    pub lines: Vec<LineAdjustment>,
}

// ==========================================
// ChangeRow - 每张发票一行的变更摘要
// ==========================================
// 每次调用重新计算，不落库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRow {
    pub trno: String,
    pub invdate: String,
    pub old_othamt1: f64,
    pub new_othamt1: f64,
    pub subtotal_before: f64,
    pub subtotal_after: f64,
}
