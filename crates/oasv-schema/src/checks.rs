//! Pure value checks shared by the keyword validators and compiled programs.
//!
//! Both execution paths call into this module so that interpreted and
//! compiled validation reach the same verdict for the same value.

use serde_json::Value;

use oasv_core::PrimitiveType;

/// Tolerance for `multipleOf` on non-integral divisors.
const MULTIPLE_OF_EPSILON: f64 = 1e-9;

/// Longest rendering of a value embedded in a message.
const RENDER_LIMIT: usize = 60;

/// JSON type name of a value, with integral numbers reported as `integer`.
pub fn type_name(value: &Value) -> &'static str {
    PrimitiveType::of(value).as_str()
}

/// Structural equality where `1` and `1.0` are equal.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| json_equal(v, w)))
        }
        _ => a == b,
    }
}

/// Length of a string in Unicode scalar values.
pub fn char_length(s: &str) -> u64 {
    s.chars().count() as u64
}

/// Whether `value` is an integer multiple of `divisor`.
pub fn is_multiple_of(value: &serde_json::Number, divisor: f64) -> bool {
    if divisor.fract() == 0.0 && divisor.abs() < i64::MAX as f64 {
        if let Some(v) = value.as_i64() {
            return v % (divisor as i64) == 0;
        }
    }
    let Some(v) = value.as_f64() else {
        return false;
    };
    let quotient = v / divisor;
    if !quotient.is_finite() {
        return false;
    }
    (quotient - quotient.round()).abs() < MULTIPLE_OF_EPSILON
}

/// First pair of equal elements, as `(earlier, later)` indexes.
pub fn find_duplicate(items: &[Value]) -> Option<(usize, usize)> {
    for (j, later) in items.iter().enumerate() {
        for (i, earlier) in items[..j].iter().enumerate() {
            if json_equal(earlier, later) {
                return Some((i, j));
            }
        }
    }
    None
}

/// Short rendering of a value for messages.
pub fn render(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= RENDER_LIMIT {
        return text;
    }
    let cut: String = text.chars().take(RENDER_LIMIT).collect();
    format!("{cut}...")
}

/// Render a bound without a trailing `.0` for integral values.
pub fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Best-effort candidate for a misspelled enum value.
pub fn closest_match<'a>(actual: &str, allowed: &'a [Value]) -> Option<&'a str> {
    let actual = actual.to_lowercase();
    allowed
        .iter()
        .filter_map(Value::as_str)
        .map(|candidate| (candidate, edit_distance(&actual, &candidate.to_lowercase())))
        .filter(|(candidate, d)| *d <= (candidate.chars().count() / 3).max(1))
        .min_by_key(|(_, d)| *d)
        .map(|(candidate, _)| candidate)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut row = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            row[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(row[j] + 1);
        }
        prev = row;
    }
    prev[b.len()]
}
