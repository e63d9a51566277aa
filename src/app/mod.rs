// ==========================================
// 仓储 ERP 后台 - 应用层
// ==========================================
// 职责: 装配仓储、引擎与 API，供命令行入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::AppState;
