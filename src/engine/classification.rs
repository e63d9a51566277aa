// ==========================================
// 仓储 ERP 后台 - 履约分类规则表
// ==========================================
// 职责: 按固定优先级为每个订单行确定 分类 / 拣货库位 / 库存 / 履约物料号
// 规则顺序:
//   1. PrimaryD1Bin    - 原物料 D1 库位
//   2. SubstituteChain - 替代料链（Alt1 → Alt2）
//   3. PrimaryD5Bin    - 原物料 D5 库位
//   4. DropShip        - 代发（DDS）
// 红线: 规则只读库存，不写库；首个命中的规则决定结果
// ==========================================

use crate::domain::order_line::{BinHit, Classification, OrderLine};
use crate::domain::types::WarehouseScope;
use crate::perf::{record_lookup, LookupKind};
use crate::repository::error::RepositoryResult;
use crate::repository::inventory_repo::InventoryLookup;
use tracing::debug;

/// 规则前置条件
pub type RulePredicate = fn(&OrderLine) -> bool;

/// 规则动作（可能需要额外查询库存）
pub type RuleAction = fn(&dyn InventoryLookup, &OrderLine) -> RepositoryResult<Classification>;

// ==========================================
// ClassificationRule
// ==========================================
pub struct ClassificationRule {
    pub name: &'static str,
    pub applies: RulePredicate,
    pub action: RuleAction,
}

/// 分类规则表（按优先级排列，最后一条恒成立）
pub const CLASSIFICATION_RULES: [ClassificationRule; 4] = [
    ClassificationRule {
        name: "PrimaryD1Bin",
        applies: has_primary_d1_bin,
        action: classify_primary_d1,
    },
    ClassificationRule {
        name: "SubstituteChain",
        applies: has_distinct_substitute,
        action: classify_substitute_chain,
    },
    ClassificationRule {
        name: "PrimaryD5Bin",
        applies: has_primary_d5_bin,
        action: classify_primary_d5,
    },
    ClassificationRule {
        name: "DropShip",
        applies: always,
        action: classify_drop_ship,
    },
];

/// 依规则表分类单个订单行（未收尾，`finalize` 由调用方执行）
pub fn classify_line(
    lookup: &dyn InventoryLookup,
    line: &OrderLine,
) -> RepositoryResult<Classification> {
    for rule in CLASSIFICATION_RULES.iter() {
        if (rule.applies)(line) {
            let result = (rule.action)(lookup, line)?;
            debug!(
                ordno = %line.ordno,
                lno = line.lno,
                rule = rule.name,
                category = %result.category,
                "订单行分类"
            );
            return Ok(result);
        }
    }
    // 规则表最后一条恒成立，不会走到这里
    classify_drop_ship(lookup, line)
}

// ==========================================
// 前置条件
// ==========================================

fn has_primary_d1_bin(line: &OrderLine) -> bool {
    line.has_d1_bin()
}

/// Alt1 与 Alt2 不同且 Alt2 非空值
fn has_distinct_substitute(line: &OrderLine) -> bool {
    line.alt2.is_some() && line.alt1 != line.alt2
}

/// D5 库位非 NULL 即可（空串库位仍走 D5）
fn has_primary_d5_bin(line: &OrderLine) -> bool {
    line.has_d5_bin()
}

fn always(_line: &OrderLine) -> bool {
    true
}

// ==========================================
// 规则动作
// ==========================================

/// D1 分类: A 开头为 `D1`，否则 `D1E`
fn d1_category(bin: &str, suffix: &str) -> String {
    if bin.starts_with('A') {
        format!("D1{}", suffix)
    } else {
        format!("D1E{}", suffix)
    }
}

fn classify_primary_d1(
    _lookup: &dyn InventoryLookup,
    line: &OrderLine,
) -> RepositoryResult<Classification> {
    let bin = line.d1_bin.clone().unwrap_or_default();
    Ok(Classification {
        category: d1_category(&bin, ""),
        pick_bin: Some(bin),
        stock: line.d1_onhand,
        itemno: line.orig_order.clone(),
        alt_bin: None,
    })
}

fn classify_primary_d5(
    _lookup: &dyn InventoryLookup,
    line: &OrderLine,
) -> RepositoryResult<Classification> {
    Ok(Classification {
        category: "D5".to_string(),
        pick_bin: line.d5_bin.clone(),
        stock: line.d5_onhand,
        itemno: line.orig_order.clone(),
        alt_bin: None,
    })
}

fn classify_drop_ship(
    _lookup: &dyn InventoryLookup,
    line: &OrderLine,
) -> RepositoryResult<Classification> {
    Ok(Classification {
        category: "DDS".to_string(),
        pick_bin: None,
        stock: None,
        itemno: line.adino.clone().unwrap_or_default(),
        alt_bin: None,
    })
}

/// 替代料链
///
/// 依次检查 Alt1、Alt2（空值跳过）:
/// - 替代料有 D1 库位且尚未记录 AltBin → `D1{key}` / `D1E{key}`
/// - 否则查 D5 库位:
///   - 命中且分类仍为空 → `D5{key}`
///   - 未命中且分类仍为空 → 原物料 D5 库位（`D5`）或按箱型代码回退
///     （`D44` → `D5(PrintJob)`，空 → `Check Size`，其他 → `DDS`）
///
/// AltBin 一旦记录即停止。回退分类不阻止 Alt2 的 D1 命中覆盖，
/// 覆盖后的 `…Alt2` 分类在收尾时被清空。
fn classify_substitute_chain(
    lookup: &dyn InventoryLookup,
    line: &OrderLine,
) -> RepositoryResult<Classification> {
    let mut result = Classification::unresolved(line);
    let substitutes = [("Alt1", line.alt1.as_deref()), ("Alt2", line.alt2.as_deref())];

    for (key, value) in substitutes {
        let alt = match value {
            Some(v) if !v.is_empty() => v,
            _ => continue,
        };

        record_lookup(LookupKind::SubstituteD1Bin);
        if let Some(hit) = lookup.find_d1_substitute_bin(alt)? {
            if result.alt_bin.is_none() {
                apply_substitute_hit(&mut result, key, alt, &hit, WarehouseScope::D1);
            }
        } else {
            record_lookup(LookupKind::SubstituteD5Bin);
            match lookup.find_d5_bin(alt)? {
                Some(hit) => {
                    if result.category.is_empty() {
                        apply_substitute_hit(&mut result, key, alt, &hit, WarehouseScope::D5);
                    }
                }
                None => {
                    if result.category.is_empty() {
                        apply_substitute_fallback(lookup, line, alt, &mut result)?;
                    }
                }
            }
        }

        if result.alt_bin.is_some() {
            break;
        }
    }

    Ok(result)
}

fn apply_substitute_hit(
    result: &mut Classification,
    key: &str,
    alt: &str,
    hit: &BinHit,
    scope: WarehouseScope,
) {
    result.alt_bin = Some(format!("{},{},{}", key, hit.bin, scope.warehouse_number()));
    result.category = match scope {
        WarehouseScope::D1 => d1_category(&hit.bin, key),
        WarehouseScope::D5 => format!("D5{}", key),
    };
    result.pick_bin = Some(hit.bin.clone());
    result.stock = Some(hit.onhand);
    result.itemno = alt.to_string();
}

fn apply_substitute_fallback(
    lookup: &dyn InventoryLookup,
    line: &OrderLine,
    alt: &str,
    result: &mut Classification,
) -> RepositoryResult<()> {
    if line.has_d5_bin() {
        result.category = "D5".to_string();
        result.pick_bin = line.d5_bin.clone();
        result.stock = line.d5_onhand;
        result.itemno = line.orig_order.clone();
        return Ok(());
    }

    record_lookup(LookupKind::BoxCode);
    let box_code = lookup.find_box_code(alt)?.unwrap_or_default();
    result.itemno = line.adino.clone().unwrap_or_default();
    result.category = match box_code.trim() {
        "D44" => "D5(PrintJob)".to_string(),
        "" => "Check Size".to_string(),
        _ => "DDS".to_string(),
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::SheetRow;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeLookup {
        d1: HashMap<String, BinHit>,
        d5: HashMap<String, BinHit>,
        box_codes: HashMap<String, String>,
    }

    impl InventoryLookup for FakeLookup {
        fn fetch_order_lines(&self, _ordno: &str) -> RepositoryResult<Vec<OrderLine>> {
            Ok(vec![])
        }
        fn find_d1_substitute_bin(&self, itemno: &str) -> RepositoryResult<Option<BinHit>> {
            Ok(self.d1.get(itemno).cloned())
        }
        fn find_d5_bin(&self, itemno: &str) -> RepositoryResult<Option<BinHit>> {
            Ok(self.d5.get(itemno).cloned())
        }
        fn find_box_code(&self, itemno: &str) -> RepositoryResult<Option<String>> {
            Ok(self.box_codes.get(itemno).cloned())
        }
        fn find_unit_cost(&self, _scope: WarehouseScope, _itemno: &str) -> RepositoryResult<Option<f64>> {
            Ok(None)
        }
        fn find_drop_ship_record(&self, _ordno: &str) -> RepositoryResult<Option<SheetRow>> {
            Ok(None)
        }
    }

    fn hit(bin: &str, onhand: f64) -> BinHit {
        BinHit {
            bin: bin.to_string(),
            onhand,
            whse: 1,
        }
    }

    fn line() -> OrderLine {
        OrderLine {
            ordno: "5001".to_string(),
            lno: 1,
            orig_order: "ORIG".to_string(),
            qty: 1.0,
            order_date: None,
            alt1: None,
            alt2: None,
            alt3: None,
            adino: Some("ADI-1".to_string()),
            state: Some("NY".to_string()),
            d1_bin: None,
            d1_onhand: None,
            d1_whse: None,
            d5_bin: None,
            d5_onhand: None,
        }
    }

    #[test]
    fn test_primary_d1_bin() {
        let lookup = FakeLookup::default();
        let mut l = line();
        l.d1_bin = Some("A01-02".to_string());
        l.d1_onhand = Some(7.0);
        let c = classify_line(&lookup, &l).unwrap();
        assert_eq!(c.category, "D1");
        assert_eq!(c.pick_bin.as_deref(), Some("A01-02"));
        assert_eq!(c.stock, Some(7.0));
        assert_eq!(c.itemno, "ORIG");

        l.d1_bin = Some("0B-11".to_string());
        assert_eq!(classify_line(&lookup, &l).unwrap().category, "D1E");
    }

    #[test]
    fn test_substitute_d1_hit_records_alt_bin() {
        let mut lookup = FakeLookup::default();
        lookup.d1.insert("SUB1".to_string(), hit("1C-04", 3.0));
        let mut l = line();
        l.alt1 = Some("SUB1".to_string());
        l.alt2 = Some("SUB2".to_string());

        let c = classify_line(&lookup, &l).unwrap();
        assert_eq!(c.category, "D1EAlt1");
        assert_eq!(c.alt_bin.as_deref(), Some("Alt1,1C-04,1"));
        assert_eq!(c.itemno, "SUB1");
        assert_eq!(c.stock, Some(3.0));
    }

    #[test]
    fn test_substitute_d5_hit() {
        let mut lookup = FakeLookup::default();
        lookup.d5.insert("SUB1".to_string(), hit("R5-01", 9.0));
        let mut l = line();
        l.alt1 = Some("SUB1".to_string());
        l.alt2 = Some("SUB2".to_string());

        let c = classify_line(&lookup, &l).unwrap();
        assert_eq!(c.category, "D5Alt1");
        assert_eq!(c.alt_bin.as_deref(), Some("Alt1,R5-01,5"));
        assert_eq!(c.pick_bin.as_deref(), Some("R5-01"));
    }

    #[test]
    fn test_substitute_fallback_box_codes() {
        let mut lookup = FakeLookup::default();
        lookup.box_codes.insert("SUB1".to_string(), "D44".to_string());
        let mut l = line();
        l.alt1 = Some("SUB1".to_string());
        l.alt2 = Some("".to_string());
        let c = classify_line(&lookup, &l).unwrap();
        assert_eq!(c.category, "D5(PrintJob)");
        assert_eq!(c.itemno, "ADI-1");
        assert!(c.alt_bin.is_none());

        lookup.box_codes.insert("SUB1".to_string(), "B12".to_string());
        assert_eq!(classify_line(&lookup, &l).unwrap().category, "DDS");

        lookup.box_codes.remove("SUB1");
        assert_eq!(classify_line(&lookup, &l).unwrap().category, "Check Size");
    }

    #[test]
    fn test_substitute_fallback_prefers_own_d5_bin() {
        let lookup = FakeLookup::default();
        let mut l = line();
        l.alt1 = Some("SUB1".to_string());
        l.alt2 = Some("SUB2".to_string());
        l.d5_bin = Some("R9-09".to_string());
        l.d5_onhand = Some(4.0);

        let c = classify_line(&lookup, &l).unwrap();
        assert_eq!(c.category, "D5");
        assert_eq!(c.itemno, "ORIG");
        assert_eq!(c.pick_bin.as_deref(), Some("R9-09"));
    }

    #[test]
    fn test_alt2_d1_hit_overrides_fallback_then_clears() {
        let mut lookup = FakeLookup::default();
        lookup.d1.insert("SUB2".to_string(), hit("A07-01", 2.0));
        let mut l = line();
        l.alt1 = Some("SUB1".to_string());
        l.alt2 = Some("SUB2".to_string());

        let c = classify_line(&lookup, &l).unwrap();
        assert_eq!(c.category, "D1Alt2");
        assert_eq!(c.alt_bin.as_deref(), Some("Alt2,A07-01,1"));

        let c = c.finalize();
        assert_eq!(c.category, "");
        assert_eq!(c.itemno, "SUB2");
    }

    #[test]
    fn test_equal_substitutes_skip_chain() {
        let mut lookup = FakeLookup::default();
        lookup.d1.insert("SAME".to_string(), hit("A01-01", 1.0));
        let mut l = line();
        l.alt1 = Some("SAME".to_string());
        l.alt2 = Some("SAME".to_string());

        let c = classify_line(&lookup, &l).unwrap();
        assert_eq!(c.category, "DDS");
        assert_eq!(c.itemno, "ADI-1");
    }

    #[test]
    fn test_empty_but_present_d5_bin_is_d5() {
        let lookup = FakeLookup::default();
        let mut l = line();
        l.d5_bin = Some(String::new());
        l.d5_onhand = Some(3.0);

        let c = classify_line(&lookup, &l).unwrap();
        assert_eq!(c.category, "D5");
        assert_eq!(c.itemno, "ORIG");
        assert_eq!(c.pick_bin.as_deref(), Some(""));
        assert_eq!(c.stock, Some(3.0));
    }

    #[test]
    fn test_substitute_chain_lookup_counts() {
        use crate::perf::PerfGuard;

        let lookup = FakeLookup::default();
        let mut l = line();
        l.alt1 = Some("SUB1".to_string());
        l.alt2 = Some("SUB2".to_string());

        // Alt1: D1 + D5 未命中 → 箱型；Alt2: D1 + D5 未命中，分类已定不再查箱型
        let perf = PerfGuard::new("test.classify");
        let c = classify_line(&lookup, &l).unwrap();
        assert_eq!(c.category, "Check Size");
        assert_eq!(perf.lookup_count(LookupKind::SubstituteD1Bin), 2);
        assert_eq!(perf.lookup_count(LookupKind::SubstituteD5Bin), 2);
        assert_eq!(perf.lookup_count(LookupKind::BoxCode), 1);
        assert_eq!(perf.substitute_lookups(), 5);

        // 原物料有 D1 库位时不发起点查
        let mut primary = line();
        primary.d1_bin = Some("A01-01".to_string());
        let perf = PerfGuard::new("test.classify");
        classify_line(&lookup, &primary).unwrap();
        assert_eq!(perf.total_lookups(), 0);
    }

    #[test]
    fn test_classification_is_repeatable() {
        let mut lookup = FakeLookup::default();
        lookup.d1.insert("SUB2".to_string(), hit("A07-01", 2.0));
        lookup.d5.insert("SUB3".to_string(), hit("R5-03", 6.0));
        lookup.box_codes.insert("SUB4".to_string(), "D44".to_string());

        let mut primary = line();
        primary.d1_bin = Some("0B-11".to_string());
        primary.d1_onhand = Some(1.0);

        let mut alt2_override = line();
        alt2_override.alt1 = Some("SUB1".to_string());
        alt2_override.alt2 = Some("SUB2".to_string());

        let mut d5_substitute = line();
        d5_substitute.alt1 = Some("SUB3".to_string());
        d5_substitute.alt2 = Some("SUB4".to_string());

        let mut print_job = line();
        print_job.alt1 = Some("".to_string());
        print_job.alt2 = Some("SUB4".to_string());

        for l in [primary, alt2_override, d5_substitute, print_job, line()] {
            let first = classify_line(&lookup, &l).unwrap();
            let second = classify_line(&lookup, &l).unwrap();
            assert_eq!(first, second);
            assert_eq!(first.clone().finalize(), second.finalize());
        }
    }

    #[test]
    fn test_primary_d5_then_drop_ship() {
        let lookup = FakeLookup::default();
        let mut l = line();
        l.d5_bin = Some("R1-01".to_string());
        l.d5_onhand = Some(12.0);
        let c = classify_line(&lookup, &l).unwrap();
        assert_eq!(c.category, "D5");
        assert_eq!(c.stock, Some(12.0));

        l.d5_bin = None;
        l.adino = None;
        let c = classify_line(&lookup, &l).unwrap();
        assert_eq!(c.category, "DDS");
        assert_eq!(c.itemno, "");
    }
}
