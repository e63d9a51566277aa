// ==========================================
// 仓储 ERP 后台 - 操作日志数据仓储
// ==========================================
// 存储: <运营 schema>.action_log
// 红线: 写库操作必须记录
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::error::{checked_schema, RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
    schema: String,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>, schema: &str) -> RepositoryResult<Self> {
        Ok(Self {
            conn,
            schema: checked_schema(schema)?.to_string(),
        })
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 确保 action_log 表存在
    pub fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {s}.action_log (
                action_id TEXT PRIMARY KEY,
                action_type TEXT NOT NULL,
                action_ts TEXT NOT NULL,
                actor TEXT NOT NULL,
                payload_json TEXT,
                impact_summary_json TEXT,
                db TEXT,
                detail TEXT
            );
            CREATE INDEX IF NOT EXISTS {s}.idx_action_ts ON action_log(action_ts);
            "#,
            s = self.schema
        ))?;
        Ok(())
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入,返回action_id
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            &format!(
                r#"
                INSERT INTO {s}.action_log (
                    action_id, action_type, action_ts, actor,
                    payload_json, impact_summary_json, db, detail
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                s = self.schema
            ),
            params![
                log.action_id,
                log.action_type,
                log.action_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                log.actor,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.impact_summary_json.as_ref().map(|v| v.to_string()),
                log.db,
                log.detail,
            ],
        )?;

        Ok(log.action_id.clone())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 最近的操作日志（时间降序）
    pub fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT action_id, action_type, action_ts, actor,
                   payload_json, impact_summary_json, db, detail
            FROM {s}.action_log
            ORDER BY action_ts DESC
            LIMIT ?1
            "#,
            s = self.schema
        ))?;

        let rows = stmt.query_map(params![limit], |row| {
            let ts: String = row.get(2)?;
            let payload: Option<String> = row.get(4)?;
            let impact: Option<String> = row.get(5)?;
            Ok(ActionLog {
                action_id: row.get(0)?,
                action_type: row.get(1)?,
                action_ts: NaiveDateTime::parse_from_str(&ts, "%Y-%m-%d %H:%M:%S")
                    .unwrap_or_default(),
                actor: row.get(3)?,
                payload_json: payload.and_then(|s| serde_json::from_str(&s).ok()),
                impact_summary_json: impact.and_then(|s| serde_json::from_str(&s).ok()),
                db: row.get(6)?,
                detail: row.get(7)?,
            })
        })?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action_log::ActionType;
    use serde_json::json;

    fn setup_repo() -> ActionLogRepository {
        let conn = crate::db::open_in_memory_erp_connection(&["data0"]).unwrap();
        let repo = ActionLogRepository::new(Arc::new(Mutex::new(conn)), "data0").unwrap();
        repo.ensure_table().unwrap();
        repo
    }

    #[test]
    fn test_insert_and_list_recent() {
        let repo = setup_repo();

        let mut log = ActionLog::now(ActionType::OtherChargeRemove, "tester");
        log.db = Some("aisdata1".to_string());
        log.impact_summary_json = Some(json!({"affected_trno_count": 2}));
        let id = repo.insert(&log).unwrap();
        assert_eq!(id, log.action_id);

        let logs = repo.list_recent(10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action_type, "OtherChargeRemove");
        assert_eq!(logs[0].db.as_deref(), Some("aisdata1"));
        assert_eq!(
            logs[0].impact_summary_json,
            Some(json!({"affected_trno_count": 2}))
        );
    }

    #[test]
    fn test_rejects_bad_schema() {
        let conn = Connection::open_in_memory().unwrap();
        let result = ActionLogRepository::new(Arc::new(Mutex::new(conn)), "data0;--");
        assert!(result.is_err());
    }
}
