// ==========================================
// 仓储 ERP 后台 - 工作簿写出
// ==========================================
// 约定: 每张工作表首行为表头（加粗），其后为数据行
//   数字 → 数值单元格；Null → 空单元格；其余 → 文本
// ==========================================

use crate::domain::table::SheetTable;
use crate::export::error::ExportResult;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, instrument};

pub struct WorkbookWriter;

impl WorkbookWriter {
    /// 写出到文件
    #[instrument(skip(sheets), fields(sheet_count = sheets.len()))]
    pub fn write_to_path(sheets: &[SheetTable], path: &Path) -> ExportResult<()> {
        let mut workbook = Self::build(sheets)?;
        workbook.save(path)?;
        Ok(())
    }

    /// 写出到内存
    pub fn write_to_buffer(sheets: &[SheetTable]) -> ExportResult<Vec<u8>> {
        let mut workbook = Self::build(sheets)?;
        Ok(workbook.save_to_buffer()?)
    }

    fn build(sheets: &[SheetTable]) -> ExportResult<Workbook> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        for sheet in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;

            for (col, title) in sheet.header().iter().enumerate() {
                worksheet.write_string_with_format(0, col as u16, title, &header_format)?;
            }
            for (idx, row) in sheet.body().iter().enumerate() {
                for (col, value) in row.iter().enumerate() {
                    write_cell(worksheet, idx as u32 + 1, col as u16, value)?;
                }
            }
            debug!(sheet = %sheet.name, rows = sheet.rows.len(), "工作表写出");
        }
        Ok(workbook)
    }
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> ExportResult<()> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) => {
                worksheet.write_number(row, col, f)?;
            }
            None => {
                worksheet.write_string(row, col, n.to_string())?;
            }
        },
        Value::String(s) => {
            if !s.is_empty() {
                worksheet.write_string(row, col, s)?;
            }
        }
        other => {
            worksheet.write_string(row, col, other.to_string())?;
        }
    }
    Ok(())
}
