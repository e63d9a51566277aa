// ==========================================
// 仓储 ERP 后台 - 导入层
// ==========================================
// 职责: 解析上传的订单号清单
// 支持: CSV, Excel
// ==========================================

pub mod error;
pub mod order_list_parser;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use order_list_parser::{OrderListParser, ORDER_HEADER};
