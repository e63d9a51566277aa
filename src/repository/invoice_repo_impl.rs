// ==========================================
// 仓储 ERP 后台 - 发票数据访问实现
// ==========================================
// 职责: InvoiceStore 的 rusqlite 实现
// ==========================================

use crate::common::sql::build_in_clause;
use crate::common::{cmp_numeric_str, parse_flexible_date};
use crate::domain::invoice::{InvoiceAdjustment, InvoiceHeader, InvoiceLine};
use crate::repository::error::{checked_schema, RepositoryError, RepositoryResult};
use crate::repository::invoice_repo::{InvoiceStore, GL_ACCOUNT_OFFSET, GL_ACCOUNT_OTHER_CHARGE};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// InvoiceRepository
// ==========================================
pub struct InvoiceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InvoiceRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在事务中写入单张发票
    fn commit_invoice_tx(
        tx: &Transaction,
        schema: &str,
        adjustment: &InvoiceAdjustment,
    ) -> rusqlite::Result<usize> {
        let mut updated = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "UPDATE {s}.invline SET unitprice = ?1, unitamount = ?2 WHERE trno = ?3 AND itemno = ?4",
                s = schema
            ))?;
            for line in &adjustment.lines {
                updated += stmt.execute(params![
                    line.new_price,
                    line.total_price,
                    adjustment.trno,
                    line.itemno
                ])?;
            }
        }

        tx.execute(
            &format!(
                "UPDATE {s}.invhead SET othamt1 = 0, subtotal = ?1 WHERE trno = ?2",
                s = schema
            ),
            params![adjustment.sub_total, adjustment.trno],
        )?;

        tx.execute(
            &format!(
                "UPDATE {s}.glpost SET amount = ?1 WHERE trno = ?2 AND acctno = ?3",
                s = schema
            ),
            params![adjustment.sub_total, adjustment.trno, GL_ACCOUNT_OFFSET],
        )?;

        tx.execute(
            &format!(
                "DELETE FROM {s}.glpost WHERE trno = ?1 AND acctno = ?2",
                s = schema
            ),
            params![adjustment.trno, GL_ACCOUNT_OTHER_CHARGE],
        )?;

        Ok(updated)
    }
}

impl InvoiceStore for InvoiceRepository {
    fn find_candidate_invoices(
        &self,
        schema: &str,
        start: NaiveDate,
        end: NaiveDate,
        min_other_charge: f64,
    ) -> RepositoryResult<Vec<InvoiceHeader>> {
        let schema = checked_schema(schema)?;
        let conn = self.get_conn()?;
        // ISO 日期在 SQL 中过滤；date() 无法识别的格式（如 M/D/YYYY）取回后再解析
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT CAST(trno AS TEXT), invdate, othamt1
            FROM {s}.invhead
            WHERE (date(invdate) BETWEEN ?1 AND ?2 OR date(invdate) IS NULL)
              AND ABS(othamt1) >= ?3
            "#,
            s = schema
        ))?;

        let rows = stmt.query_map(
            params![
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string(),
                min_other_charge
            ],
            |row| {
                Ok(InvoiceHeader {
                    trno: row.get(0)?,
                    invdate: row.get(1)?,
                    other_charge1: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                })
            },
        )?;

        let mut dated = Vec::new();
        for row in rows {
            let header = row?;
            match header.invdate.as_deref().and_then(parse_flexible_date) {
                Some(d) if d >= start && d <= end => dated.push((d, header)),
                _ => {}
            }
        }

        dated.sort_by(|(da, a), (db, b)| db.cmp(da).then_with(|| cmp_numeric_str(&b.trno, &a.trno)));
        Ok(dated.into_iter().map(|(_, h)| h).collect())
    }

    fn fetch_invoice_lines(&self, schema: &str, trnos: &[String]) -> RepositoryResult<Vec<InvoiceLine>> {
        if trnos.is_empty() {
            return Ok(vec![]);
        }
        let schema = checked_schema(schema)?;
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT
                CAST(l.trno AS TEXT), h.custpo, h.invdate, l.itemno,
                l.shiqty, l.unitprice, l.unitamount,
                h.othamt1, h.taxamt, h.jrnl
            FROM {s}.invline l
            JOIN {s}.invhead h ON h.trno = l.trno
            WHERE {in_clause}
            ORDER BY h.invdate DESC, l.trno DESC
            "#,
            s = schema,
            in_clause = build_in_clause("l.trno", trnos),
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(params_from_iter(trnos.iter()), |row| {
            Ok(InvoiceLine {
                trno: row.get(0)?,
                custpo: row.get(1)?,
                invdate: row.get(2)?,
                itemno: row.get(3)?,
                shiqty: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
                unit_price: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
                unit_amount: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
                other_charge1: row.get::<_, Option<f64>>(7)?.unwrap_or(0.0),
                tax_amount: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
                jrnl: row.get(9)?,
            })
        })?;

        let mut lines = Vec::new();
        for row in rows {
            lines.push(row?);
        }
        Ok(lines)
    }

    fn commit_invoice(&self, schema: &str, adjustment: &InvoiceAdjustment) -> RepositoryResult<usize> {
        let schema = checked_schema(schema)?;
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        // 失败时 tx 被 drop，自动回滚
        let updated = Self::commit_invoice_tx(&tx, schema, adjustment).map_err(|e| {
            RepositoryError::DatabaseTransactionError(format!(
                "发票 {} 提交失败: {}",
                adjustment.trno, e
            ))
        })?;

        tx.commit().map_err(|e| {
            RepositoryError::DatabaseTransactionError(format!(
                "发票 {} 提交失败: {}",
                adjustment.trno, e
            ))
        })?;
        Ok(updated)
    }
}
