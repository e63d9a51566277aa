// ==========================================
// 仓储 ERP 后台 - 采购暂存 / 代发表单派生
// ==========================================
// 输入: 分配结果表（引擎产出或前端回传的二维数组）
// 输出: 工作簿的 5 张工作表
//   DTO          原始分配表
//   D1-OPO       D5 类行，按物料汇总（无仓号列）
//   D5-SO        D5 类行，按物料汇总（含 Whse No. = "PC"）
//   D1-OPO(DDS)  DDS 类行，按原始物料汇总
//   DDS          代发表单（62 列）
// ==========================================

use crate::common::{coerce_f64, number_value};
use crate::domain::table::{blank_drop_ship_row, AllocationTable, SheetRow, SheetTable};
use crate::domain::types::WarehouseScope;
use crate::perf::{record_lookup, LookupKind, PerfGuard};
use crate::repository::error::RepositoryResult;
use crate::repository::inventory_repo::InventoryLookup;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

pub const SHEET_DTO: &str = "DTO";
pub const SHEET_D1_OPO: &str = "D1-OPO";
pub const SHEET_D5_SO: &str = "D5-SO";
pub const SHEET_D1_OPO_DDS: &str = "D1-OPO(DDS)";
pub const SHEET_DDS: &str = "DDS";

/// D5-SO 固定仓号
pub const PURCHASE_WHSE_NO: &str = "PC";

/// 代发表单固定运输方式
pub const DROP_SHIP_SERVICE: &str = "DHL";

const COL_ITEM_NO: &str = "Item No.";
const COL_ORDER_QTY: &str = "Order Qty";
const COL_WHSE_NO: &str = "Whse No.";
const COL_UNIT_PRICE: &str = "Unit Price";

// ==========================================
// OpoBuilder
// ==========================================
pub struct OpoBuilder<L>
where
    L: InventoryLookup,
{
    lookup: Arc<L>,
}

impl<L> OpoBuilder<L>
where
    L: InventoryLookup,
{
    pub fn new(lookup: Arc<L>) -> Self {
        Self { lookup }
    }

    /// 派生全部工作表
    ///
    /// # 参数
    /// - table: 分配结果表
    /// - today: 代发表单的销售日期
    #[instrument(skip(self, table), fields(rows = table.rows.len()))]
    pub fn build_sheets(&self, table: &AllocationTable, today: NaiveDate) -> RepositoryResult<Vec<SheetTable>> {
        let mut perf = PerfGuard::new("allocation.build_sheets");
        perf.set_rows(table.rows.len());

        let d5_rows = self.d5_purchase_rows(table)?;
        let d5_grouped = group_by_item(&d5_rows);
        let d1_opo: Vec<SheetRow> = d5_grouped.iter().map(|r| r.without(COL_WHSE_NO)).collect();

        let dds_opo = group_by_item(&self.dds_purchase_rows(table)?);
        let dds_form = self.drop_ship_form_rows(table, today)?;

        info!(
            d1_opo = d1_opo.len(),
            d5_so = d5_grouped.len(),
            dds_opo = dds_opo.len(),
            dds_form = dds_form.len(),
            "工作表派生完成"
        );

        Ok(vec![
            SheetTable::new(SHEET_DTO, table.to_sheet_rows()),
            SheetTable::new(SHEET_D1_OPO, d1_opo),
            SheetTable::new(SHEET_D5_SO, d5_grouped),
            SheetTable::new(SHEET_D1_OPO_DDS, dds_opo),
            SheetTable::new(SHEET_DDS, dds_form),
        ])
    }

    /// 分类含 "D5" 的行 → {Item No., Order Qty, Whse No., Unit Price}（未汇总）
    pub fn d5_purchase_rows(&self, table: &AllocationTable) -> RepositoryResult<Vec<SheetRow>> {
        let mut rows = Vec::new();
        for row in rows_with_category(table, "D5") {
            let item = table.cell_text(row, "Itemno");
            record_lookup(LookupKind::UnitCost);
            let cost = self.lookup.find_unit_cost(WarehouseScope::D5, &item)?;
            rows.push(
                SheetRow::new()
                    .with(COL_ITEM_NO, Value::String(item))
                    .with(COL_ORDER_QTY, number_value(coerce_f64(table.cell(row, "Qty"))))
                    .with(COL_WHSE_NO, Value::String(PURCHASE_WHSE_NO.to_string()))
                    .with(COL_UNIT_PRICE, price_value(cost)),
            );
        }
        Ok(rows)
    }

    /// 分类含 "DDS" 的行 → {Item No.: OrigOrder, Order Qty, Unit Price}（未汇总）
    pub fn dds_purchase_rows(&self, table: &AllocationTable) -> RepositoryResult<Vec<SheetRow>> {
        let mut rows = Vec::new();
        for row in rows_with_category(table, "DDS") {
            let item = table.cell_text(row, "OrigOrder");
            record_lookup(LookupKind::UnitCost);
            let cost = self.lookup.find_unit_cost(WarehouseScope::D1, &item)?;
            rows.push(
                SheetRow::new()
                    .with(COL_ITEM_NO, Value::String(item))
                    .with(COL_ORDER_QTY, number_value(coerce_f64(table.cell(row, "Qty"))))
                    .with(COL_UNIT_PRICE, price_value(cost)),
            );
        }
        Ok(rows)
    }

    /// DDS 代发表单行
    ///
    /// 以订单的收货/买家记录为底（无记录时为空白行），覆盖 6 个计算字段，
    /// 并清理收货电话的 "+1" 前缀与 "ext. N" 分机尾缀。
    pub fn drop_ship_form_rows(&self, table: &AllocationTable, today: NaiveDate) -> RepositoryResult<Vec<SheetRow>> {
        let sale_date = today.format("%-m/%-d/%Y").to_string();
        let mut rows = Vec::new();

        for row in rows_with_category(table, "DDS") {
            let ordno = table.cell_text(row, "Ordno");
            record_lookup(LookupKind::DropShipRecord);
            let mut form = self
                .lookup
                .find_drop_ship_record(&ordno)?
                .unwrap_or_else(blank_drop_ship_row);

            form.set("Sales Record Number", Value::String(ordno));
            form.set("Item Title", table.cell(row, "OrigOrder").clone());
            form.set("Custom Label", table.cell(row, "Itemno").clone());
            form.set("Quantity", number_value(coerce_f64(table.cell(row, "Qty"))));
            form.set("Sale Date", Value::String(sale_date.clone()));
            form.set("Shipping Service", Value::String(DROP_SHIP_SERVICE.to_string()));

            let cleaned = match form.get("Ship To Phone") {
                Some(Value::String(phone)) => Some(clean_phone(phone)),
                _ => None,
            };
            if let Some(phone) = cleaned {
                form.set("Ship To Phone", Value::String(phone));
            }
            rows.push(form);
        }
        Ok(rows)
    }
}

fn rows_with_category<'a>(table: &'a AllocationTable, needle: &'a str) -> impl Iterator<Item = &'a Vec<Value>> + 'a {
    table
        .rows
        .iter()
        .filter(move |row| table.cell_text(row, "Category").contains(needle))
}

fn price_value(cost: Option<f64>) -> Value {
    cost.map(number_value).unwrap_or(Value::Null)
}

/// 按 Item No. 汇总 Order Qty
///
/// 其余字段取该物料首行；结果保持物料首次出现顺序。
pub fn group_by_item(rows: &[SheetRow]) -> Vec<SheetRow> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut grouped: Vec<SheetRow> = Vec::new();
    let mut totals: Vec<f64> = Vec::new();

    for row in rows {
        let key = row
            .get(COL_ITEM_NO)
            .map(crate::domain::table::value_text)
            .unwrap_or_default();
        let qty = row.get(COL_ORDER_QTY).map(coerce_f64).unwrap_or(0.0);

        match index.get(&key) {
            Some(&idx) => totals[idx] += qty,
            None => {
                index.insert(key, grouped.len());
                grouped.push(row.clone());
                totals.push(qty);
            }
        }
    }

    for (row, total) in grouped.iter_mut().zip(totals) {
        row.set(COL_ORDER_QTY, number_value(total));
    }
    grouped
}

/// 清理电话: 去掉开头的 "+1" 与结尾的 "ext. N"
pub fn clean_phone(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("+1") {
        s = rest.trim_start();
    }

    let lower = s.to_ascii_lowercase();
    if let Some(pos) = lower.rfind("ext.") {
        let tail = s[pos + 4..].trim();
        if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
            s = s[..pos].trim_end();
        }
    }
    s.to_string()
}
