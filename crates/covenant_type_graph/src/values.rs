//! Dynamic values.
//!
//! Every fixture the framework synthesizes and every result it observes is a
//! [`Value`]. Targets receive slices of values and return a value; the
//! contract validator evaluates rules against values. The core never handles
//! concrete host types directly.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// An exact small decimal: `mantissa * 10^-scale`.
///
/// Backs the `BigDecimal` generation strategy and the `DecimalMin`/`Digits`
/// rules. The mantissa is an `i128`, which covers every value the framework
/// generates; comparisons fall back to an `f64` approximation only when
/// rescaling would overflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

impl Decimal {
    pub fn new(mantissa: i128, scale: u32) -> Self {
        Self { mantissa, scale }.normalized()
    }

    pub fn from_long(value: i64) -> Self {
        Self::new(i128::from(value), 0)
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Number of digits before the decimal point (at least 1).
    pub fn integer_digits(&self) -> u32 {
        let abs = self.mantissa.unsigned_abs();
        let total = decimal_digits(abs);
        total.saturating_sub(self.scale).max(1)
    }

    /// Number of digits after the decimal point, trailing zeros removed.
    pub fn fraction_digits(&self) -> u32 {
        self.scale
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < 0
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    /// The smallest representable step at this scale.
    pub fn ulp(&self) -> Self {
        Self {
            mantissa: 1,
            scale: self.scale,
        }
    }

    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        let (a, b, scale) = Self::aligned(self, other)?;
        Some(Self::new(a.checked_add(b)?, scale))
    }

    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        let (a, b, scale) = Self::aligned(self, other)?;
        Some(Self::new(a.checked_sub(b)?, scale))
    }

    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }

    fn normalized(mut self) -> Self {
        while self.scale > 0 && self.mantissa % 10 == 0 && self.mantissa != 0 {
            self.mantissa /= 10;
            self.scale -= 1;
        }
        if self.mantissa == 0 {
            self.scale = 0;
        }
        self
    }

    fn aligned(a: &Self, b: &Self) -> Option<(i128, i128, u32)> {
        let scale = a.scale.max(b.scale);
        let lift = |d: &Self| -> Option<i128> {
            let shift = scale - d.scale;
            let factor = 10i128.checked_pow(shift)?;
            d.mantissa.checked_mul(factor)
        };
        Some((lift(a)?, lift(b)?, scale))
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match Self::aligned(self, other) {
            Some((a, b, _)) => a.cmp(&b),
            // Magnitudes this far apart cannot be equal; the approximation
            // preserves ordering.
            None => self
                .to_f64()
                .partial_cmp(&other.to_f64())
                .unwrap_or(std::cmp::Ordering::Equal),
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let abs = self.mantissa.unsigned_abs();
        let divisor = 10u128.pow(self.scale);
        let int = abs / divisor;
        let frac = abs % divisor;
        write!(
            f,
            "{sign}{int}.{frac:0width$}",
            width = self.scale as usize
        )
    }
}

fn decimal_digits(mut value: u128) -> u32 {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}

/// A dynamically typed value at the invocation boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Decimal(Decimal),
    Str(String),
    Uuid(Uuid),
    Enum {
        type_id: String,
        variant: String,
    },
    Timestamp(DateTime<Utc>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Array(Vec<Value>),
    Struct {
        type_id: String,
        fields: Vec<(String, Value)>,
    },
    /// An instance owned by the mocking engine; the core never looks inside.
    Opaque {
        type_id: String,
        token: u64,
    },
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the value's kind, used in failure messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::Decimal(_) => "decimal",
            Self::Str(_) => "string",
            Self::Uuid(_) => "uuid",
            Self::Enum { .. } => "enum",
            Self::Timestamp(_) => "timestamp",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Array(_) => "array",
            Self::Struct { .. } => "struct",
            Self::Opaque { .. } => "opaque",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    /// Lossy numeric view used by sign rules; exact rules read the variant.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(f64::from(*value)),
            Self::Long(value) => Some(*value as f64),
            Self::Double(value) => Some(*value),
            Self::Decimal(value) => Some(value.to_f64()),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int(_) | Self::Long(_) | Self::Double(_) | Self::Decimal(_)
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Timestamp(_))
    }

    /// Element count for collection-like values.
    pub fn collection_len(&self) -> Option<usize> {
        match self {
            Self::List(items) | Self::Array(items) => Some(items.len()),
            Self::Map(entries) => Some(entries.len()),
            Self::Str(value) => Some(value.chars().count()),
            _ => None,
        }
    }

    /// Stable, locale-free rendering used for trace argument snapshots.
    pub fn render(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::Bool(value) => value.to_string(),
            Self::Int(value) => value.to_string(),
            Self::Long(value) => value.to_string(),
            Self::Double(value) => {
                if value.is_nan() {
                    "NaN".to_owned()
                } else if value.is_infinite() {
                    if *value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
                } else {
                    format!("{value:?}")
                }
            }
            Self::Decimal(value) => value.to_string(),
            Self::Str(value) => format!("\"{value}\""),
            Self::Uuid(value) => value.to_string(),
            Self::Enum { variant, .. } => variant.clone(),
            Self::Timestamp(value) => value.to_rfc3339(),
            Self::List(items) | Self::Array(items) => {
                let rendered: Vec<String> = items.iter().map(Value::render).collect();
                format!("[{}]", rendered.join(", "))
            }
            Self::Map(entries) => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.render(), value.render()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Self::Struct { type_id, fields } => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|(name, value)| format!("{name}={}", value.render()))
                    .collect();
                format!("{}({})", simple_name_of(type_id), rendered.join(", "))
            }
            Self::Opaque { type_id, token } => {
                format!("<{}@{token}>", simple_name_of(type_id))
            }
        }
    }
}

fn simple_name_of(type_id: &str) -> &str {
    let base = type_id.split('<').next().unwrap_or(type_id);
    base.rsplit('.').next().unwrap_or(base).trim_end_matches('?')
}
