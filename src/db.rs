// ==========================================
// 仓储 ERP 后台 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 以 ATTACH 方式挂载各 ERP schema（aisdata1 / aisdata5 / data0 ...），
//   SQL 中统一使用 `schema.table` 访问，与多库布局保持一致
// ==========================================

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 校验 schema 名称
///
/// schema 名会被拼进 SQL（标识符无法参数化），只允许 ASCII 字母、数字与下划线。
pub fn validate_schema_name(schema: &str) -> bool {
    !schema.is_empty()
        && schema.len() <= 64
        && schema
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// 挂载一个 schema
///
/// - `file`: 数据库文件路径；传 `":memory:"` 挂载内存库（测试用）
pub fn attach_schema(conn: &Connection, schema: &str, file: &str) -> rusqlite::Result<()> {
    if !validate_schema_name(schema) {
        return Err(rusqlite::Error::InvalidParameterName(schema.to_string()));
    }
    conn.execute(&format!("ATTACH DATABASE ?1 AS {}", schema), [file])?;
    Ok(())
}

/// 打开 ERP 连接并挂载全部 schema
///
/// # 参数
/// - db_dir: 存放 `<schema>.db` 的目录
/// - schemas: 需要挂载的 schema 名称（重复项只挂载一次）
pub fn open_erp_connection(db_dir: &Path, schemas: &[&str]) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    crate::perf::install_sqlite_tracing(&mut conn);

    let mut attached: Vec<&str> = Vec::new();
    for schema in schemas {
        if attached.contains(schema) {
            continue;
        }
        let file = db_dir.join(format!("{}.db", schema));
        attach_schema(&conn, schema, &file.to_string_lossy())?;
        attached.push(schema);
    }

    tracing::info!(dir = %db_dir.display(), schemas = ?attached, "ERP 连接已打开");
    Ok(conn)
}

/// 当前连接已挂载的 schema 名称
pub fn attached_schemas(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA database_list")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    rows.collect()
}

/// 挂载尚未挂载的 schema（文件位于 db_dir/<schema>.db）
pub fn attach_missing_schemas(conn: &Connection, db_dir: &Path, schemas: &[&str]) -> rusqlite::Result<()> {
    let mut attached = attached_schemas(conn)?;
    for schema in schemas {
        if attached.iter().any(|s| s == schema) {
            continue;
        }
        let file = db_dir.join(format!("{}.db", schema));
        attach_schema(conn, schema, &file.to_string_lossy())?;
        attached.push(schema.to_string());
    }
    Ok(())
}

/// 打开内存 ERP 连接（所有 schema 均为内存库）
pub fn open_in_memory_erp_connection(schemas: &[&str]) -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;

    let mut attached: Vec<&str> = Vec::new();
    for schema in schemas {
        if attached.contains(schema) {
            continue;
        }
        attach_schema(&conn, schema, ":memory:")?;
        attached.push(schema);
    }
    Ok(conn)
}
