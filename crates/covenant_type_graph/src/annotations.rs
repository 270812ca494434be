//! The annotation and constraint model.
//!
//! Annotations are plain name + attribute-map records attached to types,
//! parameters, properties and method return positions. The typed constraint
//! objects below are parsed views over those records; strategies and the
//! contract validator only ever see the typed form.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::values::Decimal;

/// Canonical annotation names understood by the framework.
pub mod names {
    pub const NULL: &str = "Null";
    pub const NOT_NULL: &str = "NotNull";
    pub const NOT_BLANK: &str = "NotBlank";
    pub const ASSERT_TRUE: &str = "AssertTrue";
    pub const ASSERT_FALSE: &str = "AssertFalse";
    pub const PAST: &str = "Past";
    pub const FUTURE: &str = "Future";
    pub const POSITIVE: &str = "Positive";
    pub const POSITIVE_OR_ZERO: &str = "PositiveOrZero";
    pub const NEGATIVE: &str = "Negative";
    pub const NEGATIVE_OR_ZERO: &str = "NegativeOrZero";
    pub const PATTERN: &str = "Pattern";
    pub const SIZE: &str = "Size";
    pub const INT_RANGE: &str = "IntRange";
    pub const LONG_RANGE: &str = "LongRange";
    pub const DOUBLE_RANGE: &str = "DoubleRange";
    pub const DECIMAL_MIN: &str = "DecimalMin";
    pub const DIGITS: &str = "Digits";
    pub const STRING_LENGTH: &str = "StringLength";
    pub const EMAIL: &str = "Email";
    pub const URL: &str = "Url";

    pub const CONTRACT: &str = "Contract";
    pub const COVENANT_TEST: &str = "CovenantTest";
    pub const DATA_CONTRACT: &str = "DataContract";
    pub const STATEFUL: &str = "Stateful";
    pub const TEST: &str = "Test";

    /// Rules that constrain the value itself, as opposed to nullability.
    /// `Null` combined with any of these is a configuration error.
    pub const VALUE_CONSTRAINTS: &[&str] = &[
        NOT_BLANK,
        ASSERT_TRUE,
        ASSERT_FALSE,
        PAST,
        FUTURE,
        POSITIVE,
        POSITIVE_OR_ZERO,
        NEGATIVE,
        NEGATIVE_OR_ZERO,
        PATTERN,
        SIZE,
        INT_RANGE,
        LONG_RANGE,
        DOUBLE_RANGE,
        DECIMAL_MIN,
        DIGITS,
        STRING_LENGTH,
        EMAIL,
        URL,
    ];
}

/// A single annotation attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationValue {
    Bool(bool),
    Long(i64),
    Double(f64),
    Str(String),
    StrList(Vec<String>),
}

impl AnnotationValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Long(value) => Some(*value as f64),
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            Self::StrList(values) => Some(values),
            _ => None,
        }
    }
}

impl From<bool> for AnnotationValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AnnotationValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for AnnotationValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<Vec<String>> for AnnotationValue {
    fn from(value: Vec<String>) -> Self {
        Self::StrList(value)
    }
}

/// An annotation instance: a name plus attribute map.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub name: String,
    pub attributes: BTreeMap<String, AnnotationValue>,
}

impl Annotation {
    pub fn marker(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<AnnotationValue>) -> Self {
        self.attributes.insert(key.to_owned(), value.into());
        self
    }
}

/// Ordered set of annotations on one element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationSet {
    entries: Vec<Annotation>,
}

impl AnnotationSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(entries: impl IntoIterator<Item = Annotation>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.entries.iter()
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Annotation> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn attributes(&self, name: &str) -> Option<&BTreeMap<String, AnnotationValue>> {
        self.get(name).map(|entry| &entry.attributes)
    }

    /// Merge two sets; entries of `self` shadow same-named entries of `base`.
    pub fn merged_over(&self, base: &AnnotationSet) -> AnnotationSet {
        let mut entries = self.entries.clone();
        for entry in &base.entries {
            if !self.has(&entry.name) {
                entries.push(entry.clone());
            }
        }
        AnnotationSet { entries }
    }

    fn long_attr(&self, name: &str, key: &str) -> Option<i64> {
        self.attributes(name)?.get(key)?.as_long()
    }

    fn double_attr(&self, name: &str, key: &str) -> Option<f64> {
        self.attributes(name)?.get(key)?.as_double()
    }

    fn str_list_attr(&self, name: &str, key: &str) -> Vec<String> {
        self.attributes(name)
            .and_then(|attrs| attrs.get(key))
            .and_then(|value| value.as_str_list().map(<[String]>::to_vec))
            .unwrap_or_default()
    }

    /// `IntRange`/`LongRange` bounds; attributes default to the full domain
    /// of the annotated kind.
    pub fn integer_bounds(&self, name: &str, domain_min: i64, domain_max: i64) -> Option<IntBounds> {
        let attrs = self.attributes(name)?;
        Some(IntBounds {
            min: attrs
                .get("min")
                .and_then(AnnotationValue::as_long)
                .unwrap_or(domain_min),
            max: attrs
                .get("max")
                .and_then(AnnotationValue::as_long)
                .unwrap_or(domain_max),
        })
    }

    /// `DoubleRange` bounds.
    pub fn real_bounds(&self) -> Option<RealBounds> {
        let attrs = self.attributes(names::DOUBLE_RANGE)?;
        Some(RealBounds {
            min: attrs
                .get("min")
                .and_then(AnnotationValue::as_double)
                .unwrap_or(f64::MIN),
            max: attrs
                .get("max")
                .and_then(AnnotationValue::as_double)
                .unwrap_or(f64::MAX),
        })
    }

    /// `DecimalMin(value, inclusive)`; `value` is a decimal literal string.
    pub fn decimal_min(&self) -> Option<DecimalBound> {
        let attrs = self.attributes(names::DECIMAL_MIN)?;
        let literal = attrs.get("value")?.as_str()?;
        let value = parse_decimal(literal)?;
        Some(DecimalBound {
            value,
            inclusive: attrs
                .get("inclusive")
                .and_then(AnnotationValue::as_bool)
                .unwrap_or(true),
        })
    }

    /// `Digits(integer, fraction)`.
    pub fn digits(&self) -> Option<DigitsRule> {
        let attrs = self.attributes(names::DIGITS)?;
        Some(DigitsRule {
            integer: attrs
                .get("integer")
                .and_then(AnnotationValue::as_long)
                .unwrap_or(i64::from(u32::MAX))
                .clamp(0, i64::from(u32::MAX)) as u32,
            fraction: attrs
                .get("fraction")
                .and_then(AnnotationValue::as_long)
                .unwrap_or(i64::from(u32::MAX))
                .clamp(0, i64::from(u32::MAX)) as u32,
        })
    }

    /// `StringLength(min, max)`.
    pub fn string_length(&self) -> Option<LengthBounds> {
        let attrs = self.attributes(names::STRING_LENGTH)?;
        Some(LengthBounds {
            min: attrs
                .get("min")
                .and_then(AnnotationValue::as_long)
                .unwrap_or(0),
            max: attrs
                .get("max")
                .and_then(AnnotationValue::as_long)
                .unwrap_or(i64::MAX),
        })
    }

    /// `Size(min, max)` on collection-like elements. Values are kept signed
    /// so the configuration validator can reject `min < 0`.
    pub fn size(&self) -> Option<SizeBounds> {
        let attrs = self.attributes(names::SIZE)?;
        Some(SizeBounds {
            min: attrs
                .get("min")
                .and_then(AnnotationValue::as_long)
                .unwrap_or(0),
            max: attrs
                .get("max")
                .and_then(AnnotationValue::as_long)
                .unwrap_or(i64::MAX),
        })
    }

    /// `Pattern(regexp)`.
    pub fn pattern(&self) -> Option<PatternRule> {
        let regexp = self
            .attributes(names::PATTERN)?
            .get("regexp")?
            .as_str()?
            .to_owned();
        Some(PatternRule { regexp })
    }

    /// `Email(allow, block)` domain lists.
    pub fn email(&self) -> Option<EmailRule> {
        self.get(names::EMAIL)?;
        Some(EmailRule {
            allow: self.str_list_attr(names::EMAIL, "allow"),
            block: self.str_list_attr(names::EMAIL, "block"),
        })
    }

    /// `Url(protocol, hostAllow, hostBlock)` lists.
    pub fn url(&self) -> Option<UrlRule> {
        self.get(names::URL)?;
        Some(UrlRule {
            protocols: self.str_list_attr(names::URL, "protocol"),
            host_allow: self.str_list_attr(names::URL, "hostAllow"),
            host_block: self.str_list_attr(names::URL, "hostBlock"),
        })
    }
}

impl FromIterator<Annotation> for AnnotationSet {
    fn from_iter<T: IntoIterator<Item = Annotation>>(iter: T) -> Self {
        Self::of(iter)
    }
}

fn parse_decimal(literal: &str) -> Option<Decimal> {
    let trimmed = literal.trim();
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (trimmed, ""),
    };
    let negative = int_part.starts_with('-');
    let digits: String = int_part
        .trim_start_matches(['-', '+'])
        .chars()
        .chain(frac_part.chars())
        .collect();
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    let mantissa: i128 = digits.parse().ok()?;
    let mantissa = if negative { -mantissa } else { mantissa };
    Some(Decimal::new(mantissa, frac_part.len() as u32))
}

/// Inclusive integer bounds shared by the `Int` and `Long` strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntBounds {
    pub min: i64,
    pub max: i64,
}

/// Inclusive floating-point bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RealBounds {
    pub min: f64,
    pub max: f64,
}

/// A lower decimal bound, inclusive or exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecimalBound {
    pub value: Decimal,
    pub inclusive: bool,
}

/// Maximum digit counts before and after the decimal point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DigitsRule {
    pub integer: u32,
    pub fraction: u32,
}

/// String length bounds. Signed so misconfigured values survive parsing and
/// are rejected by the configuration validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LengthBounds {
    pub min: i64,
    pub max: i64,
}

/// Collection size bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeBounds {
    pub min: i64,
    pub max: i64,
}

/// A regular-expression constraint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternRule {
    pub regexp: String,
}

/// Email domain allow/block lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmailRule {
    pub allow: Vec<String>,
    pub block: Vec<String>,
}

/// Url protocol and host lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UrlRule {
    pub protocols: Vec<String>,
    pub host_allow: Vec<String>,
    pub host_block: Vec<String>,
}

/// Bounds for temporal generation, computed from `Past`/`Future` against the
/// frozen clock rather than parsed from a single annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemporalBounds {
    pub min: DateTime<Utc>,
    pub max: DateTime<Utc>,
}
