// ==========================================
// 仓储 ERP 后台 - 公共工具模块
// ==========================================
// 职责: 日期解析、金额舍入、数值型字符串比较、SQL 片段构建
// ==========================================

/// 日期解析与规范化
pub mod dates;

/// 数值工具
pub mod numeric;

/// SQL 构建工具
pub mod sql;

// 重新导出常用函数
pub use dates::{normalize_date_string, parse_flexible_date};
pub use numeric::{cmp_numeric_str, coerce_f64, number_value, round2};
pub use sql::build_in_clause;
