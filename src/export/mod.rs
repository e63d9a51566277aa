// ==========================================
// 仓储 ERP 后台 - 导出层
// ==========================================
// 职责: 分配结果工作簿写出与暂存目录管理
// ==========================================

pub mod error;
pub mod staging;
pub mod workbook_writer;

// 重导出核心类型
pub use error::{ExportError, ExportResult};
pub use staging::ExportStaging;
pub use workbook_writer::WorkbookWriter;
