// ==========================================
// 数值工具
// ==========================================

use serde_json::Value;
use std::cmp::Ordering;

/// 保留两位小数（四舍五入，远离零）
///
/// 重分摊计算中每个中间量都要经过此函数。
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 数值型字符串比较
///
/// 两侧都能解析为数字时按数值比较，否则按字符串比较。
/// 用于订单号 / 行号 / 发票号这类以文本存储的数字键。
pub fn cmp_numeric_str(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// 将单元格值强制转换为数值
///
/// - 数字 → 原值
/// - 字符串 → 去空白后解析，失败为 0
/// - 布尔 → 1 / 0
/// - 其他 → 0
pub fn coerce_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// f64 → JSON 数值（整数值输出为整数，NaN/无穷输出为 Null）
pub fn number_value(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
