// ==========================================
// 仓储 ERP 后台 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod invoice;
pub mod order_line;
pub mod table;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use invoice::{ChangeRow, InvoiceAdjustment, InvoiceHeader, InvoiceLine, LineAdjustment};
pub use order_line::{AllocatedLine, BinHit, Classification, OrderLine, TaggedLine};
pub use table::{AllocationTable, SheetRow, SheetTable, ALLOCATION_COLUMNS};
pub use types::{InvoiceSchemaVariant, Region, WarehouseScope};
