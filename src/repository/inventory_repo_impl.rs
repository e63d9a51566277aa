// ==========================================
// 仓储 ERP 后台 - 库存/订单查询实现
// ==========================================
// 职责: InventoryLookup 的 rusqlite 实现
// 约束: 所有值参数化；schema 名在构造时校验
// 注意: SQLite 的 LIKE 对 ASCII 大小写不敏感，库位首字符判断统一用 substr
// ==========================================

use crate::domain::order_line::{BinHit, OrderLine};
use crate::domain::table::{blank_drop_ship_row, SheetRow};
use crate::domain::types::WarehouseScope;
use crate::repository::error::{checked_schema, RepositoryError, RepositoryResult};
use crate::repository::inventory_repo::InventoryLookup;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::sync::{Arc, Mutex};

// ==========================================
// InventoryRepository
// ==========================================
pub struct InventoryRepository {
    conn: Arc<Mutex<Connection>>,
    d1_schema: String,
    d5_schema: String,
}

impl InventoryRepository {
    /// 创建仓储实例
    ///
    /// # 参数
    /// - conn: 已挂载 D1 / D5 schema 的共享连接
    /// - d1_schema: 当前 schema（订单、物料主档、D1 库存、国家代码）
    /// - d5_schema: 旧 schema（D5 库存、D5 物料成本）
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        d1_schema: &str,
        d5_schema: &str,
    ) -> RepositoryResult<Self> {
        Ok(Self {
            conn,
            d1_schema: checked_schema(d1_schema)?.to_string(),
            d5_schema: checked_schema(d5_schema)?.to_string(),
        })
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn schema_for(&self, scope: WarehouseScope) -> &str {
        match scope {
            WarehouseScope::D1 => &self.d1_schema,
            WarehouseScope::D5 => &self.d5_schema,
        }
    }

    fn order_lines_sql(&self) -> String {
        format!(
            r#"
            WITH d1 AS (
                SELECT itemno, whse, bin, onhand,
                       ROW_NUMBER() OVER (
                           PARTITION BY itemno, whse
                           ORDER BY CASE substr(bin, 1, 1) WHEN 'A' THEN 0 ELSE 1 END,
                                    onhand ASC, bin ASC
                       ) AS rn
                FROM {d1}.binloc
                WHERE whse IN (1, 2)
                  AND onhand > 0
                  AND substr(bin, 1, 1) IN ('A', '0')
            ),
            d5 AS (
                SELECT itemno, bin, onhand,
                       ROW_NUMBER() OVER (
                           PARTITION BY itemno
                           ORDER BY onhand ASC, bin ASC
                       ) AS rn
                FROM {d5}.binloc
                WHERE whse = 1
                  AND onhand > 0
            )
            SELECT
                CAST(l.ordno AS TEXT), l.lno, l.itemno, l.qty, h.orddate,
                m.alt1, m.alt2, m.alt3, m.adino, h.state,
                d1.bin, d1.onhand, d1.whse,
                d5.bin, d5.onhand
            FROM {d1}.soline l
            JOIN {d1}.sohead h ON h.ordno = l.ordno
            LEFT JOIN {d1}.itemmast m ON m.itemno = l.itemno
            LEFT JOIN d1 ON d1.itemno = l.itemno AND d1.rn = 1
            LEFT JOIN d5 ON d5.itemno = l.itemno AND d5.rn = 1
            WHERE l.ordno = ?1
              AND substr(l.itemno, 1, 2) <> 'CB'
            ORDER BY l.lno, d1.whse
            "#,
            d1 = self.d1_schema,
            d5 = self.d5_schema,
        )
    }
}

impl InventoryLookup for InventoryRepository {
    fn fetch_order_lines(&self, ordno: &str) -> RepositoryResult<Vec<OrderLine>> {
        let conn = self.get_conn()?;
        let sql = self.order_lines_sql();
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(params![ordno], |row| {
            Ok(OrderLine {
                ordno: row.get(0)?,
                lno: row.get(1)?,
                orig_order: row.get(2)?,
                qty: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                order_date: row.get(4)?,
                alt1: row.get(5)?,
                alt2: row.get(6)?,
                alt3: row.get(7)?,
                adino: row.get(8)?,
                state: row.get(9)?,
                d1_bin: row.get(10)?,
                d1_onhand: row.get(11)?,
                d1_whse: row.get(12)?,
                d5_bin: row.get(13)?,
                d5_onhand: row.get(14)?,
            })
        })?;

        let mut lines = Vec::new();
        for row in rows {
            lines.push(row?);
        }
        Ok(lines)
    }

    fn find_d1_substitute_bin(&self, itemno: &str) -> RepositoryResult<Option<BinHit>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT bin, onhand, whse
            FROM {d1}.binloc
            WHERE itemno = ?1
              AND whse IN (1, 2)
              AND onhand > 0
              AND substr(bin, 1, 1) IN ('A', '0', '1')
            ORDER BY CASE substr(bin, 1, 1) WHEN 'A' THEN 0 WHEN '0' THEN 1 ELSE 2 END,
                     onhand ASC, bin ASC
            LIMIT 1
            "#,
            d1 = self.d1_schema,
        );

        let hit = conn
            .query_row(&sql, params![itemno], |row| {
                Ok(BinHit {
                    bin: row.get(0)?,
                    onhand: row.get(1)?,
                    whse: row.get(2)?,
                })
            })
            .optional()?;
        Ok(hit)
    }

    fn find_d5_bin(&self, itemno: &str) -> RepositoryResult<Option<BinHit>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT bin, onhand, whse
            FROM {d5}.binloc
            WHERE itemno = ?1
              AND whse = 1
              AND onhand > 0
            ORDER BY onhand ASC, bin ASC
            LIMIT 1
            "#,
            d5 = self.d5_schema,
        );

        let hit = conn
            .query_row(&sql, params![itemno], |row| {
                Ok(BinHit {
                    bin: row.get(0)?,
                    onhand: row.get(1)?,
                    whse: row.get(2)?,
                })
            })
            .optional()?;
        Ok(hit)
    }

    fn find_box_code(&self, itemno: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT boxcode FROM {d1}.itemmast WHERE itemno = ?1",
            d1 = self.d1_schema
        );
        let code: Option<Option<String>> = conn
            .query_row(&sql, params![itemno], |row| row.get(0))
            .optional()?;
        Ok(code.flatten())
    }

    fn find_unit_cost(&self, scope: WarehouseScope, itemno: &str) -> RepositoryResult<Option<f64>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT unitcost FROM {schema}.itemmast WHERE itemno = ?1",
            schema = self.schema_for(scope)
        );
        let cost: Option<Option<f64>> = conn
            .query_row(&sql, params![itemno], |row| row.get(0))
            .optional()?;
        Ok(cost.flatten())
    }

    fn find_drop_ship_record(&self, ordno: &str) -> RepositoryResult<Option<SheetRow>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT
                CAST(h.ordno AS TEXT),
                h.buyer_name, h.buyer_email, h.buyer_phone,
                h.buyer_addr1, h.buyer_addr2, h.buyer_city, h.buyer_state, h.buyer_zip,
                COALESCE(bc.name, h.buyer_country),
                h.shipto_name, h.shipto_phone,
                h.shipto_addr1, h.shipto_addr2, h.shipto_city, h.state, h.shipto_zip,
                COALESCE(sc.name, h.shipto_country)
            FROM {d1}.sohead h
            LEFT JOIN {d1}.country bc ON bc.code = h.buyer_country
            LEFT JOIN {d1}.country sc ON sc.code = h.shipto_country
            WHERE h.ordno = ?1
            "#,
            d1 = self.d1_schema,
        );

        const MAPPED: [&str; 18] = [
            "Order Number",
            "Buyer Name",
            "Buyer Email",
            "Buyer Phone Number",
            "Buyer Address 1",
            "Buyer Address 2",
            "Buyer City",
            "Buyer State",
            "Buyer Zip",
            "Buyer Country",
            "Ship To Name",
            "Ship To Phone",
            "Ship To Address 1",
            "Ship To Address 2",
            "Ship To City",
            "Ship To State",
            "Ship To Zip",
            "Ship To Country",
        ];

        let record = conn
            .query_row(&sql, params![ordno], |row| {
                let mut out = blank_drop_ship_row();
                for (idx, col) in MAPPED.iter().enumerate() {
                    let v: Option<String> = row.get(idx)?;
                    out.set(col, Value::String(v.unwrap_or_default()));
                }
                Ok(out)
            })
            .optional()?;
        Ok(record)
    }
}
