// ==========================================
// 仓储 ERP 后台 - 核心库
// ==========================================
// 范围: DTO 库位分配引擎 + 其他费用重分摊引擎
// 技术栈: Rust + SQLite（多 schema ATTACH）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 公共工具 - 日期/数值/SQL 片段
pub mod common;

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 订单号清单
pub mod importer;

// 导出层 - 工作簿与暂存目录
pub mod export;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/ATTACH 统一）
pub mod db;

// SQL 性能统计
pub mod perf;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{InvoiceSchemaVariant, Region, WarehouseScope};

// 领域实体
pub use domain::{
    ActionLog, ActionType, AllocatedLine, AllocationTable, ChangeRow, InvoiceLine, OrderLine,
    SheetTable,
};

// 引擎
pub use engine::{BinAllocationEngine, OpoBuilder, RedistributionEngine};

// API
pub use api::{AllocationApi, ExportApi, RedistributionApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "仓储 ERP 后台";
