/// 构建 IN 子句 SQL 片段
///
/// # 参数
/// - `column_name`: 列名
/// - `values`: 值列表（仅用于计数，值本身通过参数绑定）
///
/// # 返回
/// - `column IN (?, ?, ...)`；空列表返回永假条件 `1 = 0`
///
/// # 示例
/// ```
/// use erp_backoffice::common::sql::build_in_clause;
///
/// let ids = vec!["1001".to_string(), "1002".to_string()];
/// assert_eq!(build_in_clause("h.trno", &ids), "h.trno IN (?, ?)");
///
/// let empty: Vec<String> = vec![];
/// assert_eq!(build_in_clause("h.trno", &empty), "1 = 0");
/// ```
pub fn build_in_clause<T: AsRef<str>>(column_name: &str, values: &[T]) -> String {
    if values.is_empty() {
        // 空列表时返回永假条件，确保 SQL 语法正确
        return "1 = 0".to_string();
    }

    let placeholders = values.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    format!("{} IN ({})", column_name, placeholders)
}
