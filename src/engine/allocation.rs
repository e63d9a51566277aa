// ==========================================
// 仓储 ERP 后台 - DTO 库位分配引擎
// ==========================================
// 职责: 订单号列表 → 固定 20 列的分配结果表
// 流水线（每阶段产生新值）:
//   1. fetch       取订单行（附 D1 / D5 最优库位）
//   2. tag         区域标记 East / West
//   3. prioritize  同一订单内按 D1 仓号排序（含 West 升序，全 East 降序）
//   4. dedup       按行号去重（保留首条），再按行号升序
//   5. classify    规则表分类
//   6. finalize    清空 "Alt2" 尾缀分类
//   7. sort        分类升序，订单号数值升序
//   8. project     映射为 20 列
// 红线: Engine 不拼 SQL
// ==========================================

use crate::common::{cmp_numeric_str, normalize_date_string, number_value};
use crate::domain::order_line::{AllocatedLine, OrderLine, TaggedLine};
use crate::domain::table::AllocationTable;
use crate::domain::types::Region;
use crate::engine::classification::classify_line;
use crate::perf::PerfGuard;
use crate::repository::error::RepositoryResult;
use crate::repository::inventory_repo::InventoryLookup;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// BinAllocationEngine
// ==========================================
pub struct BinAllocationEngine<L>
where
    L: InventoryLookup,
{
    lookup: Arc<L>,
}

impl<L> BinAllocationEngine<L>
where
    L: InventoryLookup,
{
    pub fn new(lookup: Arc<L>) -> Self {
        Self { lookup }
    }

    /// 执行库位分配
    ///
    /// # 参数
    /// - ordnos: 订单号（可重复、可含空白，内部去重）
    /// - east_states: 东部州代码集合（大写）
    ///
    /// # 返回
    /// - 分配结果表；订单均无数据时返回空表
    #[instrument(skip(self, ordnos, east_states), fields(order_count = ordnos.len()))]
    pub fn allocate(
        &self,
        ordnos: &[String],
        east_states: &HashSet<String>,
    ) -> RepositoryResult<AllocationTable> {
        let mut perf = PerfGuard::new("allocation.allocate");

        let mut deduped: Vec<AllocatedLine> = Vec::new();
        for ordno in distinct_order_numbers(ordnos) {
            let lines = self.lookup.fetch_order_lines(&ordno)?;
            if lines.is_empty() {
                warn!(ordno = %ordno, "订单无可分配行，跳过");
                continue;
            }

            let tagged = tag_regions(lines, east_states);
            let prioritized = prioritize_by_region(tagged);
            let unique = dedup_by_line_number(prioritized);
            debug!(ordno = %ordno, lines = unique.len(), "订单行去重完成");

            for tagged_line in unique {
                deduped.push(self.classify(tagged_line)?);
            }
        }

        sort_allocated(&mut deduped);
        let table = project(&deduped);
        perf.set_rows(table.rows.len());

        info!(
            rows = table.rows.len(),
            substitute_lookups = perf.substitute_lookups(),
            "库位分配完成"
        );
        Ok(table)
    }

    /// 单行分类并收尾
    pub fn classify(&self, tagged: TaggedLine) -> RepositoryResult<AllocatedLine> {
        let classification = classify_line(self.lookup.as_ref(), &tagged.line)?.finalize();
        Ok(AllocatedLine {
            line: tagged.line,
            region: tagged.region,
            classification,
        })
    }
}

// ==========================================
// 流水线阶段
// ==========================================

/// 去空白、去空值、去重（保持首次出现顺序）
pub fn distinct_order_numbers(ordnos: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ordnos
        .iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty() && seen.insert(o.clone()))
        .collect()
}

/// 区域标记: 州代码（大写）在东部集合内为 East，否则 West
pub fn tag_regions(lines: Vec<OrderLine>, east_states: &HashSet<String>) -> Vec<TaggedLine> {
    lines
        .into_iter()
        .map(|line| {
            let state = line
                .state
                .as_deref()
                .map(|s| s.trim().to_uppercase())
                .unwrap_or_default();
            let region = if east_states.contains(&state) {
                Region::East
            } else {
                Region::West
            };
            TaggedLine { line, region }
        })
        .collect()
}

/// 同一订单内的 D1 仓号排序
///
/// 任一行为 West → 仓号升序；全部 East → 仓号降序。
/// 缺失仓号视为最小值。稳定排序。
pub fn prioritize_by_region(mut lines: Vec<TaggedLine>) -> Vec<TaggedLine> {
    let any_west = lines.iter().any(|l| l.region == Region::West);
    if any_west {
        lines.sort_by(|a, b| a.line.d1_whse.cmp(&b.line.d1_whse));
    } else {
        lines.sort_by(|a, b| b.line.d1_whse.cmp(&a.line.d1_whse));
    }
    lines
}

/// 按行号去重（首条保留），结果按行号升序
pub fn dedup_by_line_number(lines: Vec<TaggedLine>) -> Vec<TaggedLine> {
    let mut seen = HashSet::new();
    let mut unique: Vec<TaggedLine> = lines
        .into_iter()
        .filter(|l| seen.insert(l.line.lno))
        .collect();
    unique.sort_by_key(|l| l.line.lno);
    unique
}

/// 最终排序: 分类升序，同分类按订单号数值升序
pub fn sort_allocated(lines: &mut [AllocatedLine]) {
    lines.sort_by(|a, b| {
        a.classification
            .category
            .cmp(&b.classification.category)
            .then_with(|| cmp_numeric_str(&a.line.ordno, &b.line.ordno))
    });
}

fn text(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::String(s.clone()),
        None => Value::Null,
    }
}

/// 履约物料号为空（缺 Adino 的代发行）时输出 null
fn resolved_item(itemno: &str) -> Value {
    if itemno.is_empty() {
        Value::Null
    } else {
        Value::String(itemno.to_string())
    }
}

fn num(value: Option<f64>) -> Value {
    value.map(number_value).unwrap_or(Value::Null)
}

/// 映射为固定 20 列（列顺序见 `ALLOCATION_COLUMNS`）
pub fn project(lines: &[AllocatedLine]) -> AllocationTable {
    let mut table = AllocationTable::with_standard_columns();
    for allocated in lines {
        let line = &allocated.line;
        let c = &allocated.classification;
        let date = line
            .order_date
            .as_deref()
            .map(|d| Value::String(normalize_date_string(d)))
            .unwrap_or(Value::Null);

        table.rows.push(vec![
            Value::String(line.ordno.clone()),
            resolved_item(&c.itemno),
            number_value(line.qty),
            Value::String(c.category.clone()),
            text(&c.pick_bin),
            num(c.stock),
            Value::from(line.lno),
            Value::String(line.orig_order.clone()),
            date,
            text(&line.alt1),
            text(&line.alt2),
            text(&line.alt3),
            text(&line.adino),
            text(&line.state),
            text(&line.d1_bin),
            num(line.d1_onhand),
            text(&line.d5_bin),
            num(line.d5_onhand),
            Value::String(allocated.region.as_str().to_string()),
            text(&c.alt_bin),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(lno: i64, whse: Option<i64>, state: &str) -> OrderLine {
        OrderLine {
            ordno: "7001".to_string(),
            lno,
            orig_order: "ORIG".to_string(),
            qty: 1.0,
            order_date: Some("03/15/2024".to_string()),
            alt1: None,
            alt2: None,
            alt3: None,
            adino: None,
            state: Some(state.to_string()),
            d1_bin: whse.map(|w| format!("A0{}", w)),
            d1_onhand: Some(5.0),
            d1_whse: whse,
            d5_bin: None,
            d5_onhand: None,
        }
    }

    fn east() -> HashSet<String> {
        ["NY", "NJ"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_distinct_order_numbers() {
        let input = vec![
            " 100 ".to_string(),
            "".to_string(),
            "200".to_string(),
            "100".to_string(),
        ];
        assert_eq!(distinct_order_numbers(&input), vec!["100", "200"]);
    }

    #[test]
    fn test_tag_regions_case_insensitive() {
        let tagged = tag_regions(vec![line(1, Some(1), "ny"), line(2, Some(1), "CA")], &east());
        assert_eq!(tagged[0].region, Region::East);
        assert_eq!(tagged[1].region, Region::West);
    }

    #[test]
    fn test_region_tie_break_direction() {
        // 全 East: 仓号降序，保留仓 2
        let tagged = tag_regions(vec![line(1, Some(1), "NY"), line(1, Some(2), "NJ")], &east());
        let kept = dedup_by_line_number(prioritize_by_region(tagged));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].line.d1_whse, Some(2));

        // 含 West: 仓号升序，保留仓 1
        let tagged = tag_regions(vec![line(1, Some(2), "NY"), line(1, Some(1), "CA")], &east());
        let kept = dedup_by_line_number(prioritize_by_region(tagged));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].line.d1_whse, Some(1));
    }

    #[test]
    fn test_missing_whse_sorts_lowest() {
        let tagged = tag_regions(vec![line(1, Some(1), "CA"), line(2, None, "CA")], &east());
        let sorted = prioritize_by_region(tagged);
        assert_eq!(sorted[0].line.d1_whse, None);

        let tagged = tag_regions(vec![line(1, None, "NY"), line(2, Some(1), "NY")], &east());
        let sorted = prioritize_by_region(tagged);
        assert_eq!(sorted[1].line.d1_whse, None);
    }

    #[test]
    fn test_dedup_sorts_by_line_number() {
        let tagged = tag_regions(
            vec![line(10, Some(1), "CA"), line(2, Some(1), "CA"), line(10, Some(2), "CA")],
            &east(),
        );
        let kept = dedup_by_line_number(tagged);
        let lnos: Vec<i64> = kept.iter().map(|l| l.line.lno).collect();
        assert_eq!(lnos, vec![2, 10]);
    }

    #[test]
    fn test_project_normalizes_date_and_nulls() {
        let tagged = tag_regions(vec![line(1, Some(1), "NY")], &east());
        let allocated = AllocatedLine {
            classification: crate::domain::order_line::Classification::unresolved(&tagged[0].line),
            line: tagged[0].line.clone(),
            region: tagged[0].region,
        };
        let table = project(&[allocated]);
        assert_eq!(table.columns.len(), 20);
        let row = &table.rows[0];
        assert_eq!(table.cell_text(row, "Date"), "2024-03-15");
        assert_eq!(table.cell(row, "Alt1"), &Value::Null);
        assert_eq!(table.cell(row, "Qty"), &Value::from(1));
        assert_eq!(table.cell_text(row, "W/E"), "East");
        assert_eq!(table.cell_text(row, "Itemno"), "ORIG");
    }

    #[test]
    fn test_project_missing_adino_item_is_null() {
        let tagged = tag_regions(vec![line(1, None, "CA")], &east());
        let mut classification =
            crate::domain::order_line::Classification::unresolved(&tagged[0].line);
        classification.category = "DDS".to_string();
        classification.itemno = String::new();
        let allocated = AllocatedLine {
            classification,
            line: tagged[0].line.clone(),
            region: tagged[0].region,
        };
        let table = project(&[allocated]);
        let row = &table.rows[0];
        assert_eq!(table.cell(row, "Itemno"), &Value::Null);
        assert_eq!(table.cell_text(row, "Category"), "DDS");
    }
}
