// ==========================================
// 仓储 ERP 后台 - API 层
// ==========================================
// 职责: 对外业务接口，组装配置/引擎/导出，塑形响应
// ==========================================

pub mod allocation_api;
pub mod error;
pub mod export_api;
pub mod redistribution_api;

// 重导出
pub use allocation_api::{AllocationApi, AllocationResponse};
pub use error::{ApiError, ApiResult};
pub use export_api::ExportApi;
pub use redistribution_api::{RedistributionApi, RedistributionResponse};
