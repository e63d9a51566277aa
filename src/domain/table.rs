// ==========================================
// 仓储 ERP 后台 - 表格模型
// ==========================================
// AllocationTable: 固定 20 列的分配结果表（也可由前端回传的二维数组构建）
// SheetRow / SheetTable: 有序键值行，工作表表头 = 首行的键集合
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 分配结果表的固定列
pub const ALLOCATION_COLUMNS: [&str; 20] = [
    "Ordno", "Itemno", "Qty", "Category", "PickBin", "Stock", "Lno", "OrigOrder", "Date", "Alt1",
    "Alt2", "Alt3", "Adino", "State", "D1Bin", "D1", "D5Bin", "D5", "W/E", "AltBin",
];

/// 空表工作表的占位表头
pub const NO_DATA_HEADER: &str = "No data";

/// DDS 代发表单的固定列（电商平台订单报表格式）
pub const DROP_SHIP_FORM_COLUMNS: [&str; 62] = [
    "Sales Record Number",
    "Order Number",
    "Buyer Username",
    "Buyer Name",
    "Buyer Email",
    "Buyer Phone Number",
    "Buyer Address 1",
    "Buyer Address 2",
    "Buyer City",
    "Buyer State",
    "Buyer Zip",
    "Buyer Country",
    "Buyer Tax Identifier Name",
    "Buyer Tax Identifier Value",
    "Ship To Name",
    "Ship To Phone",
    "Ship To Address 1",
    "Ship To Address 2",
    "Ship To City",
    "Ship To State",
    "Ship To Zip",
    "Ship To Country",
    "Item Number",
    "Item Title",
    "Custom Label",
    "Sold Via Promoted Listings",
    "Quantity",
    "Sold For",
    "Shipping And Handling",
    "Item Location",
    "Item Zip Code",
    "Item Country",
    "eBay Collect And Remit Tax Rate",
    "eBay Collect And Remit Tax Type",
    "eBay Reference Name",
    "eBay Reference Value",
    "Tax Status",
    "Seller Collected Tax",
    "eBay Collected Tax",
    "Electronic Waste Recycling Fee",
    "Mattress Recycling Fee",
    "Battery Recycling Fee",
    "Additional Fee",
    "Tire Recycling Fee",
    "Total Price",
    "eBay Collected Tax and Fees Included in Total",
    "Payment Method",
    "Sale Date",
    "Paid On Date",
    "Ship By Date",
    "Minimum Estimated Delivery Date",
    "Maximum Estimated Delivery Date",
    "Shipped On Date",
    "Feedback Left",
    "Feedback Received",
    "My Item Note",
    "PayPal Transaction ID",
    "Shipping Service",
    "Tracking Number",
    "Transaction ID",
    "Variation Details",
    "Global Shipping Program",
];

/// 创建所有列均为空串的 DDS 表单行
pub fn blank_drop_ship_row() -> SheetRow {
    let mut row = SheetRow::new();
    for col in DROP_SHIP_FORM_COLUMNS {
        row.set(col, Value::String(String::new()));
    }
    row
}

// ==========================================
// AllocationTable
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl AllocationTable {
    /// 创建使用固定 20 列的空表
    pub fn with_standard_columns() -> Self {
        Self {
            columns: ALLOCATION_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// 由二维数组（首行为表头）构建
    ///
    /// 表头单元格非字符串时取其文本形式；空数组返回 None。
    pub fn from_grid(grid: Vec<Vec<Value>>) -> Option<Self> {
        let mut iter = grid.into_iter();
        let header = iter.next()?;
        let columns: Vec<String> = header
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s.trim().to_string(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect();

        let width = columns.len();
        let rows = iter
            .filter(|row| row.iter().any(|v| !is_blank(v)))
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();

        Some(Self { columns, rows })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// 读取单元格；列不存在或越界时返回 Null
    pub fn cell<'a>(&'a self, row: &'a [Value], name: &str) -> &'a Value {
        self.column_index(name)
            .and_then(|idx| row.get(idx))
            .unwrap_or(&Value::Null)
    }

    /// 单元格文本（Null → 空串）
    pub fn cell_text(&self, row: &[Value], name: &str) -> String {
        value_text(self.cell(row, name))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 转为以列名为键的有序行
    pub fn to_sheet_rows(&self) -> Vec<SheetRow> {
        self.rows
            .iter()
            .map(|row| {
                let mut out = SheetRow::new();
                for (idx, col) in self.columns.iter().enumerate() {
                    out.set(col, row.get(idx).cloned().unwrap_or(Value::Null));
                }
                out
            })
            .collect()
    }
}

/// 单元格是否为空（Null 或空白字符串）
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// 单元格文本形式（字符串不带引号，Null 为空串）
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ==========================================
// SheetRow - 有序键值行
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    cells: Vec<(String, Value)>,
}

impl SheetRow {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    /// 链式追加（键已存在时覆盖）
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.set(key, value);
        self
    }

    /// 设置值；键已存在时原位覆盖，保持列顺序
    pub fn set(&mut self, key: &str, value: Value) {
        match self.cells.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.cells.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.cells.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> Vec<String> {
        self.cells.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.cells.iter().map(|(_, v)| v)
    }

    /// 去掉指定列后的新行
    pub fn without(&self, key: &str) -> Self {
        Self {
            cells: self
                .cells
                .iter()
                .filter(|(k, _)| k != key)
                .cloned()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ==========================================
// SheetTable - 工作表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetTable {
    pub name: String,
    pub rows: Vec<SheetRow>,
}

impl SheetTable {
    pub fn new(name: &str, rows: Vec<SheetRow>) -> Self {
        Self {
            name: name.to_string(),
            rows,
        }
    }

    /// 表头: 首行的键集合；无数据时为 ["No data"]
    pub fn header(&self) -> Vec<String> {
        match self.rows.first() {
            Some(first) => first.keys(),
            None => vec![NO_DATA_HEADER.to_string()],
        }
    }

    /// 按表头顺序展开的数据行（缺失键为 Null）
    pub fn body(&self) -> Vec<Vec<Value>> {
        let header = self.header();
        self.rows
            .iter()
            .map(|row| {
                header
                    .iter()
                    .map(|k| row.get(k).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect()
    }
}
