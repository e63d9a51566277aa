// ==========================================
// 仓储 ERP 后台 - 订单号清单解析器
// ==========================================
// 支持: CSV 文本 / CSV 文件 / Excel (.xlsx/.xls)
// 规则:
//   - 首行为表头，首列必须为 Ordno（不区分大小写，忽略 UTF-8 BOM）
//   - 取其余各行首列，去空白、去空值、去重（保持首次出现顺序）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, instrument};

/// 表头首列名
pub const ORDER_HEADER: &str = "Ordno";

const UTF8_BOM: char = '\u{feff}';

pub struct OrderListParser;

impl OrderListParser {
    /// 解析 CSV 文本（标准双引号转义，行长度可不一致）
    pub fn parse_csv_text(text: &str) -> ImportResult<Vec<String>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut first_cells = Vec::new();
        for result in reader.records() {
            let record = result?;
            first_cells.push(record.get(0).unwrap_or("").to_string());
        }
        collect_order_numbers(first_cells)
    }

    /// 按扩展名解析上传文件
    #[instrument]
    pub fn parse_file(path: &Path) -> ImportResult<Vec<String>> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let ordnos = match ext.as_str() {
            "csv" | "txt" => {
                let bytes = std::fs::read(path)?;
                Self::parse_csv_text(&String::from_utf8_lossy(&bytes))?
            }
            "xlsx" | "xls" => Self::parse_workbook(path)?,
            _ => return Err(ImportError::UnsupportedFormat(ext)),
        };
        debug!(count = ordnos.len(), "订单号解析完成");
        Ok(ordnos)
    }

    /// 读取工作簿第一张工作表
    pub fn parse_workbook(path: &Path) -> ImportResult<Vec<String>> {
        let mut workbook = open_workbook_auto(path)?;
        let sheet_names = workbook.sheet_names();
        let first = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&first)?;
        let first_cells = range
            .rows()
            .map(|row| row.first().map(|c| c.to_string()).unwrap_or_default())
            .collect();
        collect_order_numbers(first_cells)
    }
}

/// 校验表头并提取订单号
fn collect_order_numbers(first_cells: Vec<String>) -> ImportResult<Vec<String>> {
    let mut cells = first_cells.into_iter();
    let header = cells.next().ok_or(ImportError::MissingHeader)?;
    let header = header.trim_start_matches(UTF8_BOM).trim();
    if !header.eq_ignore_ascii_case(ORDER_HEADER) {
        return Err(ImportError::HeaderMismatch(header.to_string()));
    }

    let mut seen = HashSet::new();
    Ok(cells
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && seen.insert(c.clone()))
        .collect())
}
