// ==========================================
// 仓储 ERP 后台 - 其他费用重分摊引擎
// ==========================================
// 职责: 将发票的"其他费用1"按行金额占比折算进单价，并将其他费用清零
// 流程:
//   0. 校验操作名与日期，选择发票库（"(MD)" → MD 变体库）
//   1. 候选发票: 日期区间内 |其他费用1| >= 0.05
//   2. 分批（每批 <= 500 张）取发票行
//   3. 每张发票小计 Total = round2(Σ 行金额)
//   4. 每行: Add / new_price / total_price
//   5. 每张发票汇总行
//   6. 日期降序、发票号降序
//   7. 非试算时逐张发票提交（单发票单事务）
// 红线: 金额每个中间量都 round2
// ==========================================

use crate::common::{cmp_numeric_str, parse_flexible_date, round2};
use crate::config::SchemaSettings;
use crate::domain::invoice::{ChangeRow, InvoiceAdjustment, InvoiceLine, LineAdjustment};
use crate::domain::types::InvoiceSchemaVariant;
use crate::perf::PerfGuard;
use crate::repository::error::RepositoryError;
use crate::repository::invoice_repo::InvoiceStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// 支持的操作名前缀
pub const ACTION_PREFIX: &str = "Other Charge Remove";

/// 其他费用最小绝对值（含）
pub const OTHER_CHARGE_THRESHOLD: f64 = 0.05;

/// 单次 IN 查询的最大发票数
pub const LINE_FETCH_CHUNK: usize = 500;

/// 返回的汇总行上限
pub const MAX_CHANGES: usize = 200;

// ==========================================
// 错误类型
// ==========================================
#[derive(Error, Debug)]
pub enum RedistributionError {
    #[error("不支持的操作: {0}（操作名必须以 \"Other Charge Remove\" 开头）")]
    UnsupportedAction(String),

    #[error("{field} 为空")]
    MissingDate { field: String },

    #[error("{field} 日期格式无效: {value}")]
    InvalidDate { field: String, value: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl RedistributionError {
    /// 是否为输入校验错误（返回结构化失败响应，而非向上传播）
    pub fn is_validation(&self) -> bool {
        !matches!(self, RedistributionError::Repository(_))
    }
}

// ==========================================
// 请求 / 结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedistributionRequest {
    pub action: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

fn default_dry_run() -> bool {
    true
}

/// 校验通过的请求
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub variant: InvoiceSchemaVariant,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedistributionOutcome {
    pub dry_run: bool,
    /// 实际使用的发票库
    pub db: String,
    pub affected_trno_count: usize,
    /// 行更新影响的记录数之和
    pub updated_rows: usize,
    /// 汇总行（最多 200 条）
    pub changes: Vec<ChangeRow>,
    pub notes: Vec<String>,
}

impl RedistributionOutcome {
    fn empty(dry_run: bool, db: &str, note: String) -> Self {
        Self {
            dry_run,
            db: db.to_string(),
            affected_trno_count: 0,
            updated_rows: 0,
            changes: Vec::new(),
            notes: vec![note],
        }
    }
}

// ==========================================
// RedistributionEngine
// ==========================================
pub struct RedistributionEngine<S>
where
    S: InvoiceStore,
{
    store: Arc<S>,
}

impl<S> RedistributionEngine<S>
where
    S: InvoiceStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// 执行重分摊（试算或提交）
    #[instrument(skip(self, request, schemas), fields(action = %request.action, dry_run = request.dry_run))]
    pub fn run(
        &self,
        request: &RedistributionRequest,
        schemas: &SchemaSettings,
    ) -> Result<RedistributionOutcome, RedistributionError> {
        let _perf = PerfGuard::new("redistribution.run");

        let validated = validate_request(request)?;
        let db = match validated.variant {
            InvoiceSchemaVariant::Default => schemas.invoice.as_str(),
            InvoiceSchemaVariant::Md => schemas.invoice_md.as_str(),
        };

        // === 步骤 1: 候选发票 ===
        let headers = self.store.find_candidate_invoices(
            db,
            validated.start,
            validated.end,
            OTHER_CHARGE_THRESHOLD,
        )?;
        if headers.is_empty() {
            warn!(db, "区间内无符合条件的发票");
            return Ok(RedistributionOutcome::empty(
                validated.dry_run,
                db,
                format!(
                    "{} ~ {} 之间没有其他费用 >= {} 的发票",
                    validated.start, validated.end, OTHER_CHARGE_THRESHOLD
                ),
            ));
        }

        // === 步骤 2: 分批取发票行 ===
        let mut seen = HashSet::new();
        let trnos: Vec<String> = headers
            .iter()
            .filter(|h| seen.insert(h.trno.clone()))
            .map(|h| h.trno.clone())
            .collect();

        let mut lines = Vec::new();
        for chunk in trnos.chunks(LINE_FETCH_CHUNK) {
            lines.extend(self.store.fetch_invoice_lines(db, chunk)?);
        }
        if lines.is_empty() {
            warn!(db, invoices = trnos.len(), "候选发票没有发票行");
            return Ok(RedistributionOutcome::empty(
                validated.dry_run,
                db,
                format!("找到 {} 张候选发票，但没有对应的发票行", trnos.len()),
            ));
        }

        // === 步骤 3-6: 计算与排序 ===
        let mut adjustments = build_adjustments(&lines);
        sort_adjustments(&mut adjustments);
        let changes: Vec<ChangeRow> = adjustments.iter().map(summarize).collect();

        // === 步骤 7: 提交 ===
        let mut updated_rows = 0;
        let mut notes = Vec::new();
        if validated.dry_run {
            notes.push("试算模式，未写入数据库".to_string());
        } else {
            for adjustment in &adjustments {
                updated_rows += self.store.commit_invoice(db, adjustment)?;
            }
            notes.push(format!("已提交 {} 张发票", adjustments.len()));
        }

        let affected = adjustments.len();
        if changes.len() > MAX_CHANGES {
            notes.push(format!("仅返回前 {} 条汇总（共 {} 条）", MAX_CHANGES, changes.len()));
        }

        info!(db, affected, updated_rows, "其他费用重分摊完成");
        Ok(RedistributionOutcome {
            dry_run: validated.dry_run,
            db: db.to_string(),
            affected_trno_count: affected,
            updated_rows,
            changes: changes.into_iter().take(MAX_CHANGES).collect(),
            notes,
        })
    }
}

// ==========================================
// 校验
// ==========================================

/// 校验操作名与日期
pub fn validate_request(request: &RedistributionRequest) -> Result<ValidatedRequest, RedistributionError> {
    if !request.action.starts_with(ACTION_PREFIX) {
        return Err(RedistributionError::UnsupportedAction(request.action.clone()));
    }
    Ok(ValidatedRequest {
        start: parse_required_date("start_date", &request.start_date)?,
        end: parse_required_date("end_date", &request.end_date)?,
        variant: InvoiceSchemaVariant::from_action(&request.action),
        dry_run: request.dry_run,
    })
}

fn parse_required_date(field: &str, value: &str) -> Result<NaiveDate, RedistributionError> {
    if value.trim().is_empty() {
        return Err(RedistributionError::MissingDate {
            field: field.to_string(),
        });
    }
    parse_flexible_date(value).ok_or_else(|| RedistributionError::InvalidDate {
        field: field.to_string(),
        value: value.to_string(),
    })
}

// ==========================================
// 计算
// ==========================================

/// 单行调整
///
/// ```text
/// Add         = 0                                              (Total == 0 或 Shiqty == 0)
///             = round2((UnitAmount / Total) * (OtherCharge1 / Shiqty))
/// new_price   = round2(UnitPrice + Add)
/// total_price = round2(new_price * Shiqty)
/// ```
pub fn compute_line_adjustment(line: &InvoiceLine, total: f64) -> LineAdjustment {
    let add = if total == 0.0 || line.shiqty == 0.0 {
        0.0
    } else {
        round2((line.unit_amount / total) * (line.other_charge1 / line.shiqty))
    };
    let new_price = round2(line.unit_price + add);
    LineAdjustment {
        itemno: line.itemno.clone(),
        add,
        new_price,
        total_price: round2(new_price * line.shiqty),
    }
}

/// 按发票汇总行调整（保持发票首次出现顺序）
pub fn build_adjustments(lines: &[InvoiceLine]) -> Vec<InvoiceAdjustment> {
    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<&InvoiceLine>> = HashMap::new();
    for line in lines {
        let entry = grouped.entry(line.trno.as_str()).or_default();
        if entry.is_empty() {
            order.push(line.trno.as_str());
        }
        entry.push(line);
    }

    order
        .into_iter()
        .map(|trno| {
            let invoice_lines = &grouped[trno];
            let total = round2(invoice_lines.iter().map(|l| l.unit_amount).sum());
            let other_charge1 = invoice_lines[0].other_charge1;
            let invdate = invoice_lines
                .iter()
                .filter_map(|l| l.invdate.as_deref().and_then(parse_flexible_date))
                .max()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();

            InvoiceAdjustment {
                trno: trno.to_string(),
                invdate,
                total,
                other_charge1,
                sub_total: round2(total + other_charge1),
                lines: invoice_lines
                    .iter()
                    .map(|l| compute_line_adjustment(l, total))
                    .collect(),
            }
        })
        .collect()
}

/// 日期降序（字符串比较），发票号降序
pub fn sort_adjustments(adjustments: &mut [InvoiceAdjustment]) {
    adjustments.sort_by(|a, b| {
        b.invdate
            .cmp(&a.invdate)
            .then_with(|| cmp_numeric_str(&b.trno, &a.trno))
    });
}

/// 发票汇总行
pub fn summarize(adjustment: &InvoiceAdjustment) -> ChangeRow {
    let old = round2(adjustment.other_charge1);
    ChangeRow {
        trno: adjustment.trno.clone(),
        invdate: adjustment.invdate.clone(),
        old_othamt1: old,
        new_othamt1: 0.0,
        subtotal_before: round2(adjustment.total + old),
        subtotal_after: round2(adjustment.total),
    }
}
