// ==========================================
// 仓储 ERP 后台 - 库存/订单查询 Trait
// ==========================================
// 职责: 定义库位分配引擎所需的数据访问接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据查询
// ==========================================

use crate::domain::order_line::{BinHit, OrderLine};
use crate::domain::table::SheetRow;
use crate::domain::types::WarehouseScope;
use crate::repository::error::RepositoryResult;

// ==========================================
// InventoryLookup Trait
// ==========================================
// 用途: 库位分配引擎的取数接口
// 实现者: InventoryRepository（使用 rusqlite）
pub trait InventoryLookup: Send + Sync {
    /// 取订单的全部订单行（已附带 D1 / D5 最优库位）
    ///
    /// # 说明
    /// - D1 最优库位按仓号（1、2）各取一条：A 开头优先，其次 0 开头，同级按在手量升序
    /// - D5 最优库位只看仓 1，按在手量升序
    /// - 物料号以 `CB` 开头的行在源头排除
    /// - 同一行号可能返回多条（每个有库存的 D1 仓一条）
    fn fetch_order_lines(&self, ordno: &str) -> RepositoryResult<Vec<OrderLine>>;

    /// 替代料的 D1 库位（额外允许 1 开头的库位）
    fn find_d1_substitute_bin(&self, itemno: &str) -> RepositoryResult<Option<BinHit>>;

    /// 替代料的 D5 库位（仓 1，在手量 > 0）
    fn find_d5_bin(&self, itemno: &str) -> RepositoryResult<Option<BinHit>>;

    /// 物料的箱型/运输代码
    fn find_box_code(&self, itemno: &str) -> RepositoryResult<Option<String>>;

    /// 指定范围的物料单位成本
    fn find_unit_cost(&self, scope: WarehouseScope, itemno: &str) -> RepositoryResult<Option<f64>>;

    /// 按销售记录号（订单号）取 DDS 表单的收货/买家信息
    ///
    /// 返回含全部 62 列的行，未取到的列为空串；订单不存在返回 None。
    fn find_drop_ship_record(&self, ordno: &str) -> RepositoryResult<Option<SheetRow>>;
}
