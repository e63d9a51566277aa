// ==========================================
// 仓储 ERP 后台 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL，只通过仓储 trait 取数/写数
// ==========================================

pub mod allocation;
pub mod classification;
pub mod opo;
pub mod redistribution;

// 重导出核心引擎
pub use allocation::BinAllocationEngine;
pub use classification::{classify_line, ClassificationRule, CLASSIFICATION_RULES};
pub use opo::OpoBuilder;
pub use redistribution::{
    RedistributionEngine, RedistributionError, RedistributionOutcome, RedistributionRequest,
};
