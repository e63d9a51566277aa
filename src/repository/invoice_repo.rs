// ==========================================
// 仓储 ERP 后台 - 发票数据访问 Trait
// ==========================================
// 职责: 定义其他费用重分摊引擎所需的读写接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::invoice::{InvoiceAdjustment, InvoiceHeader, InvoiceLine};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;

/// 冲减科目（更新为新小计）
pub const GL_ACCOUNT_OFFSET: &str = "3050";

/// 其他费用科目（整行删除）
pub const GL_ACCOUNT_OTHER_CHARGE: &str = "3320";

// ==========================================
// InvoiceStore Trait
// ==========================================
// 实现者: InvoiceRepository（使用 rusqlite）
pub trait InvoiceStore: Send + Sync {
    /// 查询候选发票
    ///
    /// # 条件
    /// - 发票日期在 [start, end] 内（含两端）
    /// - |其他费用1| >= min_other_charge
    ///
    /// # 排序
    /// - 日期降序，发票号降序
    fn find_candidate_invoices(
        &self,
        schema: &str,
        start: NaiveDate,
        end: NaiveDate,
        min_other_charge: f64,
    ) -> RepositoryResult<Vec<InvoiceHeader>>;

    /// 按发票号批量取发票行（调用方负责分批，单批不宜超过 500）
    fn fetch_invoice_lines(&self, schema: &str, trnos: &[String]) -> RepositoryResult<Vec<InvoiceLine>>;

    /// 提交单张发票的调整（单事务）
    ///
    /// # 写入
    /// 1. 每行单价/行金额（按 发票号 + 物料号）
    /// 2. 表头其他费用置 0、小计更新
    /// 3. 冲减科目 3050 金额更新为新小计
    /// 4. 删除其他费用科目 3320
    ///
    /// # 返回
    /// - Ok(usize): 行更新影响的记录数
    /// - Err: 事务已回滚
    fn commit_invoice(&self, schema: &str, adjustment: &InvoiceAdjustment) -> RepositoryResult<usize>;
}
