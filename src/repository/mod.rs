// ==========================================
// 仓储 ERP 后台 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入；schema 名单独校验
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod inventory_repo;
pub mod inventory_repo_impl;
pub mod invoice_repo;
pub mod invoice_repo_impl;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use inventory_repo::InventoryLookup;
pub use inventory_repo_impl::InventoryRepository;
pub use invoice_repo::{InvoiceStore, GL_ACCOUNT_OFFSET, GL_ACCOUNT_OTHER_CHARGE};
pub use invoice_repo_impl::InvoiceRepository;
