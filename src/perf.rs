// ==========================================
// 仓储 ERP 后台 - 性能统计
// ==========================================
// 统计口径:
//   - 库存点查: 分配流水线里逐行发起的查询（替代料库位、箱型、成本、代发记录）
//   - SQL 语句数 / 慢 SQL: 依赖 rusqlite trace/profile 钩子，默认仅 Debug 开启
// 计数均为线程局部，由 PerfGuard 在生命周期结束时汇总输出
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

const ENV_PERF_SQL: &str = "ERP_BACKOFFICE_PERF_SQL";
const ENV_SLOW_SQL_MS: &str = "ERP_BACKOFFICE_SLOW_SQL_MS";

static PERF_SQL_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

// ==========================================
// LookupKind - 逐行库存点查种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    SubstituteD1Bin,
    SubstituteD5Bin,
    BoxCode,
    UnitCost,
    DropShipRecord,
}

impl LookupKind {
    const COUNT: usize = 5;

    pub const ALL: [LookupKind; LookupKind::COUNT] = [
        LookupKind::SubstituteD1Bin,
        LookupKind::SubstituteD5Bin,
        LookupKind::BoxCode,
        LookupKind::UnitCost,
        LookupKind::DropShipRecord,
    ];

    fn index(self) -> usize {
        match self {
            LookupKind::SubstituteD1Bin => 0,
            LookupKind::SubstituteD5Bin => 1,
            LookupKind::BoxCode => 2,
            LookupKind::UnitCost => 3,
            LookupKind::DropShipRecord => 4,
        }
    }

    /// 替代料链产生的点查
    pub fn is_substitute_chain(self) -> bool {
        matches!(
            self,
            LookupKind::SubstituteD1Bin | LookupKind::SubstituteD5Bin | LookupKind::BoxCode
        )
    }
}

thread_local! {
    static GUARD_DEPTH: Cell<u32> = Cell::new(0);
    static SQL_COUNT: Cell<u64> = Cell::new(0);
    static SLOW_SQL_COUNT: Cell<u64> = Cell::new(0);
    static LOOKUP_COUNTS: Cell<[u64; LookupKind::COUNT]> = Cell::new([0; LookupKind::COUNT]);
}

/// 记一次库存点查
pub fn record_lookup(kind: LookupKind) {
    LOOKUP_COUNTS.with(|c| {
        let mut counts = c.get();
        counts[kind.index()] = counts[kind.index()].saturating_add(1);
        c.set(counts);
    });
}

fn lookup_snapshot() -> [u64; LookupKind::COUNT] {
    LOOKUP_COUNTS.with(|c| c.get())
}

// ==========================================
// SQL trace / profile
// ==========================================

/// SQL 统计开关
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlTraceSettings {
    pub enabled: bool,
    pub slow_ms: u64,
}

impl SqlTraceSettings {
    /// 从环境变量读取
    ///
    /// - `ERP_BACKOFFICE_PERF_SQL`: 缺省时 Debug 开启、Release 关闭
    /// - `ERP_BACKOFFICE_SLOW_SQL_MS`: 慢 SQL 阈值，缺省 Debug 50ms / Release 200ms
    pub fn from_env() -> Self {
        Self::resolve(
            std::env::var(ENV_PERF_SQL).ok().as_deref(),
            std::env::var(ENV_SLOW_SQL_MS).ok().as_deref(),
            cfg!(debug_assertions),
        )
    }

    fn resolve(enabled: Option<&str>, slow_ms: Option<&str>, debug: bool) -> Self {
        let enabled = match enabled {
            Some(v) => matches!(
                v.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "y" | "on"
            ),
            None => debug,
        };
        let slow_ms = slow_ms
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(if debug { 50 } else { 200 });
        Self { enabled, slow_ms }
    }
}

/// 安装 SQLite trace/profile 钩子
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let settings = SqlTraceSettings::from_env();
    PERF_SQL_ENABLED.store(settings.enabled, Ordering::Relaxed);
    SLOW_SQL_THRESHOLD_MS.store(settings.slow_ms, Ordering::Relaxed);

    if settings.enabled {
        conn.trace(Some(on_sql_statement));
        conn.profile(Some(on_sql_profile));
    } else {
        conn.trace(None);
        conn.profile(None);
    }
}

fn guard_active() -> bool {
    GUARD_DEPTH.with(|d| d.get() > 0)
}

fn on_sql_statement(_sql: &str) {
    if PERF_SQL_ENABLED.load(Ordering::Relaxed) && guard_active() {
        SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
    }
}

fn on_sql_profile(sql: &str, duration: Duration) {
    if !PERF_SQL_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold == 0 || ms < threshold {
        return;
    }

    let statement: String = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    let statement: String = statement.chars().take(400).collect();
    tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %statement, "slow sql");
    if guard_active() {
        SLOW_SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
    }
}

// ==========================================
// PerfGuard
// ==========================================

/// 单次引擎调用的耗时与点查统计，Drop 时输出到 `perf` target
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    sql_start: u64,
    slow_sql_start: u64,
    lookups_start: [u64; LookupKind::COUNT],
    rows: Option<usize>,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        GUARD_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        Self {
            op,
            start: Instant::now(),
            sql_start: SQL_COUNT.with(|c| c.get()),
            slow_sql_start: SLOW_SQL_COUNT.with(|c| c.get()),
            lookups_start: lookup_snapshot(),
            rows: None,
        }
    }

    /// 登记本次处理的订单行数（用于折算每行点查数）
    pub fn set_rows(&mut self, rows: usize) {
        self.rows = Some(rows);
    }

    /// 本 Guard 生命周期内的 SQL 语句数（钩子未开启时恒为 0）
    pub fn sql_count(&self) -> u64 {
        SQL_COUNT.with(|c| c.get()).saturating_sub(self.sql_start)
    }

    pub fn lookup_count(&self, kind: LookupKind) -> u64 {
        lookup_snapshot()[kind.index()].saturating_sub(self.lookups_start[kind.index()])
    }

    /// 替代料链的点查总数
    pub fn substitute_lookups(&self) -> u64 {
        LookupKind::ALL
            .iter()
            .filter(|k| k.is_substitute_chain())
            .map(|&k| self.lookup_count(k))
            .sum()
    }

    pub fn total_lookups(&self) -> u64 {
        LookupKind::ALL.iter().map(|&k| self.lookup_count(k)).sum()
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let slow_sql_count = SLOW_SQL_COUNT
            .with(|c| c.get())
            .saturating_sub(self.slow_sql_start);
        let lookups = self.total_lookups();
        let lookups_per_row = match self.rows {
            Some(rows) if rows > 0 => lookups as f64 / rows as f64,
            _ => 0.0,
        };

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            sql_count = self.sql_count(),
            slow_sql_count,
            rows = self.rows.unwrap_or(0),
            lookups,
            substitute_lookups = self.substitute_lookups(),
            unit_cost_lookups = self.lookup_count(LookupKind::UnitCost),
            drop_ship_lookups = self.lookup_count(LookupKind::DropShipRecord),
            lookups_per_row,
            "done"
        );

        GUARD_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_trace_settings() {
        let s = SqlTraceSettings::resolve(Some(" Yes "), Some("75"), false);
        assert!(s.enabled);
        assert_eq!(s.slow_ms, 75);

        let s = SqlTraceSettings::resolve(Some("off"), None, true);
        assert!(!s.enabled);
        assert_eq!(s.slow_ms, 50);

        let s = SqlTraceSettings::resolve(None, Some("x"), false);
        assert!(!s.enabled);
        assert_eq!(s.slow_ms, 200);
    }

    #[test]
    fn test_guard_counts_only_its_own_lookups() {
        record_lookup(LookupKind::UnitCost);

        let outer = PerfGuard::new("outer");
        record_lookup(LookupKind::SubstituteD1Bin);
        {
            let inner = PerfGuard::new("inner");
            record_lookup(LookupKind::SubstituteD5Bin);
            record_lookup(LookupKind::BoxCode);
            assert_eq!(inner.substitute_lookups(), 2);
            assert_eq!(inner.lookup_count(LookupKind::SubstituteD1Bin), 0);
        }
        record_lookup(LookupKind::DropShipRecord);

        assert_eq!(outer.substitute_lookups(), 3);
        assert_eq!(outer.lookup_count(LookupKind::UnitCost), 0);
        assert_eq!(outer.total_lookups(), 4);
    }
}
