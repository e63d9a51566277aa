// ==========================================
// 仓储 ERP 后台 - 订单行领域模型（库位分配）
// ==========================================
// 流水线各阶段使用独立类型:
//   OrderLine (取数) → TaggedLine (区域标记) → AllocatedLine (分类完成)
// 每个阶段产生新值，不在原行上就地修改
// ==========================================

use crate::domain::types::Region;
use serde::{Deserialize, Serialize};

/// 分类结果中会被清空的尾缀（历史行为，见 `Classification::finalize`）
pub const CLEARED_CATEGORY_SUFFIX: &str = "Alt2";

// ==========================================
// OrderLine - 取数阶段的订单行
// ==========================================
// 一行 = (订单号, 行号, D1 候选仓) 组合；
// 同一行号可能因 D1 仓 1/2 都有库存而出现两次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub ordno: String,
    pub lno: i64,
    /// 订单原始物料号（OrigOrder）
    pub orig_order: String,
    pub qty: f64,
    /// 订单日期（原始字符串）
    pub order_date: Option<String>,
    pub alt1: Option<String>,
    pub alt2: Option<String>,
    pub alt3: Option<String>,
    /// 代发/供应商物料号
    pub adino: Option<String>,
    /// 收货州代码
    pub state: Option<String>,

    // ===== D1 候选库位 =====
    pub d1_bin: Option<String>,
    pub d1_onhand: Option<f64>,
    pub d1_whse: Option<i64>,

    // ===== D5 候选库位 =====
    pub d5_bin: Option<String>,
    pub d5_onhand: Option<f64>,
}

impl OrderLine {
    /// D1 库位存在且非空
    pub fn has_d1_bin(&self) -> bool {
        self.d1_bin.as_deref().map_or(false, |b| !b.is_empty())
    }

    /// D5 库位非 NULL（空串也算存在）
    pub fn has_d5_bin(&self) -> bool {
        self.d5_bin.is_some()
    }
}

// ==========================================
// TaggedLine - 区域标记后的订单行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedLine {
    pub line: OrderLine,
    pub region: Region,
}

// ==========================================
// BinHit - 库位查询命中
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinHit {
    pub bin: String,
    pub onhand: f64,
    pub whse: i64,
}

// ==========================================
// Classification - 分类结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// 履约分类（D1 / D1E / D5 / D1Alt1 / D5(PrintJob) / Check Size / DDS / 空）
    pub category: String,
    pub pick_bin: Option<String>,
    pub stock: Option<f64>,
    /// 实际履约物料号
    pub itemno: String,
    /// 替代料审计串 "{altKey},{bin},{仓号}"
    pub alt_bin: Option<String>,
}

impl Classification {
    /// 初始状态：未分类，履约物料号为原始物料号
    pub fn unresolved(line: &OrderLine) -> Self {
        Self {
            category: String::new(),
            pick_bin: None,
            stock: None,
            itemno: line.orig_order.clone(),
            alt_bin: None,
        }
    }

    /// 收尾: 以 "Alt2" 结尾的分类一律置空（保持历史行为）
    pub fn finalize(mut self) -> Self {
        if self.category.ends_with(CLEARED_CATEGORY_SUFFIX) {
            self.category.clear();
        }
        self
    }
}

// ==========================================
// AllocatedLine - 分类完成的订单行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedLine {
    pub line: OrderLine,
    pub region: Region,
    pub classification: Classification,
}
