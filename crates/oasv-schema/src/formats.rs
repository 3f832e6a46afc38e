//! # Format Validators
//!
//! `format` is checked through a [`FormatRegistry`] keyed by the value's type
//! and the format name. A format name the registry does not know is a silent
//! no-op, never an error.
//!
//! ## Built-ins
//!
//! | type    | formats                                                        |
//! |---------|----------------------------------------------------------------|
//! | string  | date, date-time, time, email, uuid, uri, hostname, ipv4, ipv6, byte |
//! | integer | int32, int64                                                   |
//! | number  | float, double                                                  |
//!
//! Integers are also checked against `number` formats, so `{type: integer,
//! format: double}` behaves as expected.

use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, NaiveDate};
use oasv_core::PrimitiveType;
use serde_json::Value;

/// A format predicate.
pub type FormatFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Format predicates keyed by `(type, name)`.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: HashMap<(PrimitiveType, String), FormatFn>,
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .formats
            .keys()
            .map(|(ty, name)| format!("{ty}:{name}"))
            .collect();
        names.sort();
        f.debug_struct("FormatRegistry").field("formats", &names).finish()
    }
}

impl FormatRegistry {
    /// A registry with no formats.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in format.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_str("date", is_date);
        registry.register_str("date-time", is_date_time);
        registry.register_str("time", is_time);
        registry.register_str("email", is_email);
        registry.register_str("uuid", is_uuid);
        registry.register_str("uri", is_uri);
        registry.register_str("hostname", is_hostname);
        registry.register_str("ipv4", |s| s.parse::<Ipv4Addr>().is_ok());
        registry.register_str("ipv6", |s| s.parse::<Ipv6Addr>().is_ok());
        registry.register_str("byte", is_base64);
        registry.register(PrimitiveType::Integer, "int32", |v| {
            integral(v).is_some_and(|n| n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX))
        });
        registry.register(PrimitiveType::Integer, "int64", |v| {
            v.as_i64().is_some() || integral(v).is_some_and(|n| n.abs() < 9.223_372_036_854_776e18)
        });
        registry.register(PrimitiveType::Number, "float", |v| {
            v.as_f64()
                .is_some_and(|n| n.is_finite() && n.abs() <= f64::from(f32::MAX))
        });
        registry.register(PrimitiveType::Number, "double", |v| {
            v.as_f64().is_some_and(f64::is_finite)
        });
        registry
    }

    /// Register a predicate for `(ty, name)`, replacing any existing one.
    pub fn register(
        &mut self,
        ty: PrimitiveType,
        name: impl Into<String>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) {
        self.formats.insert((ty, name.into()), Arc::new(check));
    }

    /// Register a predicate over string values.
    pub fn register_str(
        &mut self,
        name: impl Into<String>,
        check: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) {
        self.register(PrimitiveType::String, name, move |v| {
            v.as_str().map_or(true, &check)
        });
    }

    /// Whether a predicate is registered for `(ty, name)`.
    pub fn contains(&self, ty: PrimitiveType, name: &str) -> bool {
        self.formats.contains_key(&(ty, name.to_string()))
    }

    /// Check `value` against `format`.
    ///
    /// Returns `None` when no predicate applies to the value's type.
    pub fn check(&self, format: &str, value: &Value) -> Option<bool> {
        candidate_types(value)
            .iter()
            .find_map(|ty| self.formats.get(&(*ty, format.to_string())))
            .map(|check| check(value))
    }
}

fn candidate_types(value: &Value) -> &'static [PrimitiveType] {
    match PrimitiveType::of(value) {
        PrimitiveType::String => &[PrimitiveType::String],
        PrimitiveType::Integer => &[PrimitiveType::Integer, PrimitiveType::Number],
        PrimitiveType::Number => &[PrimitiveType::Number, PrimitiveType::Integer],
        _ => &[],
    }
}

/// Check a value against a built-in format.
///
/// This is the host hook called by emitted validator source. Unknown formats
/// pass.
pub fn check_builtin(format: &str, value: &Value) -> bool {
    static BUILTINS: OnceLock<FormatRegistry> = OnceLock::new();
    BUILTINS
        .get_or_init(FormatRegistry::with_builtins)
        .check(format, value)
        .unwrap_or(true)
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

fn integral(v: &Value) -> Option<f64> {
    let n = v.as_f64()?;
    (n.fract() == 0.0).then_some(n)
}

fn is_date(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn is_date_time(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_time(s: &str) -> bool {
    // RFC 3339 full-time: borrow the date-time parser with a fixed date.
    DateTime::parse_from_rfc3339(&format!("1970-01-01T{s}")).is_ok()
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && local.len() <= 64
        && !local.contains(char::is_whitespace)
        && !local.contains('@')
        && domain.contains('.')
        && is_hostname(domain)
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36 && uuid::Uuid::parse_str(s).is_ok()
}

fn is_uri(s: &str) -> bool {
    url::Url::parse(s).is_ok()
}

fn is_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

fn is_base64(s: &str) -> bool {
    if s.len() % 4 != 0 {
        return false;
    }
    let body = s.trim_end_matches('=');
    if s.len() - body.len() > 2 {
        return false;
    }
    body.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/')
}
