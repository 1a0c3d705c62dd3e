use crate::models::CellValue;

/// 解析本地化数字: 去掉 `.`、空白、`đ`、`$`, 再把 `,` 当作小数点
///
/// 无法解析时返回 0, 从不报错。
pub fn parse_number(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(n) if n.is_nan() => 0.0,
        CellValue::Number(n) => *n,
        CellValue::Text(s) => parse_str(s),
        CellValue::Bool(_) | CellValue::Empty => 0.0,
    }
}

pub fn parse_str(raw: &str) -> f64 {
    let normalized: String = raw
        .chars()
        .filter(|c| !(*c == '.' || *c == 'đ' || *c == '$' || c.is_whitespace()))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    leading_float(&normalized)
        .filter(|n| !n.is_nan())
        .unwrap_or(0.0)
}

/// 取最长的合法浮点前缀, "12abc" -> 12, "1.000.5" -> 1.0
fn leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    // 指数部分必须完整才计入
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}
