//! The contract validator: evaluates declared constraint annotations
//! against observed values.

use covenant_type_graph::{names, AnnotationSet, Decimal, FrozenClock, Value};

use crate::{
    error::ContractViolation,
    result::AssertionRule,
};

/// Evaluates every constraint on an element against a value. The first
/// broken rule is raised as a [`ContractViolation`] carrying that rule.
///
/// Null handling follows the usual constraint semantics: `NotNull` and
/// `Null` see nulls, every other rule passes on a null value.
#[derive(Clone, Copy, Debug)]
pub struct ContractValidator {
    clock: FrozenClock,
}

impl ContractValidator {
    pub fn new(clock: FrozenClock) -> Self {
        Self { clock }
    }

    pub fn validate(
        &self,
        annotations: &AnnotationSet,
        value: &Value,
    ) -> Result<(), ContractViolation> {
        if annotations.has(names::NOT_NULL) && value.is_null() {
            return Err(violation(names::NOT_NULL, "value must not be null")
                .with_comparison("non-null", "null"));
        }
        if annotations.has(names::NULL) && !value.is_null() {
            return Err(violation(names::NULL, "value must be null")
                .with_comparison("null", value.render()));
        }
        if value.is_null() {
            return Ok(());
        }

        self.check_booleans(annotations, value)?;
        self.check_numeric_ranges(annotations, value)?;
        self.check_signs(annotations, value)?;
        self.check_decimals(annotations, value)?;
        self.check_strings(annotations, value)?;
        self.check_size(annotations, value)?;
        self.check_temporal(annotations, value)?;
        Ok(())
    }

    fn check_booleans(
        &self,
        annotations: &AnnotationSet,
        value: &Value,
    ) -> Result<(), ContractViolation> {
        if annotations.has(names::ASSERT_TRUE) && value.as_bool() != Some(true) {
            return Err(violation(names::ASSERT_TRUE, "value must be true")
                .with_comparison("true", value.render()));
        }
        if annotations.has(names::ASSERT_FALSE) && value.as_bool() != Some(false) {
            return Err(violation(names::ASSERT_FALSE, "value must be false")
                .with_comparison("false", value.render()));
        }
        Ok(())
    }

    fn check_numeric_ranges(
        &self,
        annotations: &AnnotationSet,
        value: &Value,
    ) -> Result<(), ContractViolation> {
        if let Some(bounds) =
            annotations.integer_bounds(names::INT_RANGE, i64::from(i32::MIN), i64::from(i32::MAX))
        {
            let observed = match value {
                Value::Int(observed) => i64::from(*observed),
                other => {
                    return Err(violation(
                        names::INT_RANGE,
                        format!("expected an int, found {}", other.kind_name()),
                    ))
                }
            };
            check_range(names::INT_RANGE, observed, bounds.min, bounds.max)?;
        }
        if let Some(bounds) = annotations.integer_bounds(names::LONG_RANGE, i64::MIN, i64::MAX) {
            let observed = match value {
                Value::Long(observed) => *observed,
                other => {
                    return Err(violation(
                        names::LONG_RANGE,
                        format!("expected a long, found {}", other.kind_name()),
                    ))
                }
            };
            check_range(names::LONG_RANGE, observed, bounds.min, bounds.max)?;
        }
        if let Some(bounds) = annotations.real_bounds() {
            let observed = match value {
                Value::Double(observed) => *observed,
                other => {
                    return Err(violation(
                        names::DOUBLE_RANGE,
                        format!("expected a double, found {}", other.kind_name()),
                    ))
                }
            };
            if observed.is_nan() || observed < bounds.min || observed > bounds.max {
                return Err(violation(
                    names::DOUBLE_RANGE,
                    format!("{observed} is outside [{}, {}]", bounds.min, bounds.max),
                )
                .with_comparison(
                    format!("[{}, {}]", bounds.min, bounds.max),
                    value.render(),
                ));
            }
        }
        Ok(())
    }

    fn check_signs(
        &self,
        annotations: &AnnotationSet,
        value: &Value,
    ) -> Result<(), ContractViolation> {
        let sign_rules: [(&str, fn(f64) -> bool, &str); 4] = [
            (names::POSITIVE, |n| n > 0.0, "strictly positive"),
            (names::POSITIVE_OR_ZERO, |n| n >= 0.0, "positive or zero"),
            (names::NEGATIVE, |n| n < 0.0, "strictly negative"),
            (names::NEGATIVE_OR_ZERO, |n| n <= 0.0, "negative or zero"),
        ];
        for (name, accepts, description) in sign_rules {
            if !annotations.has(name) {
                continue;
            }
            let Some(observed) = value.as_f64() else {
                return Err(violation(
                    name,
                    format!("expected a numeric value, found {}", value.kind_name()),
                ));
            };
            if observed.is_nan() || !accepts(observed) {
                return Err(violation(
                    name,
                    format!("value must be {description}, was {}", value.render()),
                )
                .with_comparison(description, value.render()));
            }
        }
        Ok(())
    }

    fn check_decimals(
        &self,
        annotations: &AnnotationSet,
        value: &Value,
    ) -> Result<(), ContractViolation> {
        let as_decimal = |value: &Value| -> Option<Decimal> {
            match value {
                Value::Decimal(decimal) => Some(*decimal),
                Value::Int(int) => Some(Decimal::from_long(i64::from(*int))),
                Value::Long(long) => Some(Decimal::from_long(*long)),
                _ => None,
            }
        };
        if let Some(bound) = annotations.decimal_min() {
            let Some(observed) = as_decimal(value) else {
                return Err(violation(
                    names::DECIMAL_MIN,
                    format!("expected a decimal value, found {}", value.kind_name()),
                ));
            };
            let holds = if bound.inclusive {
                observed >= bound.value
            } else {
                observed > bound.value
            };
            if !holds {
                let relation = if bound.inclusive { ">=" } else { ">" };
                return Err(violation(
                    names::DECIMAL_MIN,
                    format!("{observed} must be {relation} {}", bound.value),
                )
                .with_comparison(format!("{relation} {}", bound.value), observed.to_string()));
            }
        }
        if let Some(rule) = annotations.digits() {
            let Some(observed) = as_decimal(value) else {
                return Err(violation(
                    names::DIGITS,
                    format!("expected a decimal value, found {}", value.kind_name()),
                ));
            };
            if observed.integer_digits() > rule.integer || observed.fraction_digits() > rule.fraction
            {
                return Err(violation(
                    names::DIGITS,
                    format!(
                        "{observed} exceeds digits(integer={}, fraction={})",
                        rule.integer, rule.fraction
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_strings(
        &self,
        annotations: &AnnotationSet,
        value: &Value,
    ) -> Result<(), ContractViolation> {
        let text = value.as_str();
        if let Some(bounds) = annotations.string_length() {
            let Some(text) = text else {
                return Err(violation(
                    names::STRING_LENGTH,
                    format!("expected a string, found {}", value.kind_name()),
                ));
            };
            let length = text.chars().count() as i64;
            if length < bounds.min || length > bounds.max {
                return Err(violation(
                    names::STRING_LENGTH,
                    format!(
                        "length {length} is outside [{}, {}]",
                        bounds.min, bounds.max
                    ),
                )
                .with_comparison(
                    format!("length in [{}, {}]", bounds.min, bounds.max),
                    format!("length {length}"),
                ));
            }
        }
        if annotations.has(names::NOT_BLANK) {
            let blank = text.is_none_or(|text| text.trim().is_empty());
            if blank {
                return Err(violation(names::NOT_BLANK, "value must not be blank"));
            }
        }
        if let Some(rule) = annotations.pattern() {
            let Some(text) = text else {
                return Err(violation(
                    names::PATTERN,
                    format!("expected a string, found {}", value.kind_name()),
                ));
            };
            match regex::Regex::new(&format!("^(?:{})$", rule.regexp)) {
                Ok(compiled) => {
                    if !compiled.is_match(text) {
                        return Err(violation(
                            names::PATTERN,
                            format!("`{text}` does not match `{}`", rule.regexp),
                        )
                        .with_comparison(rule.regexp, text.to_owned()));
                    }
                }
                Err(error) => {
                    return Err(violation(
                        names::PATTERN,
                        format!("pattern `{}` does not compile: {error}", rule.regexp),
                    ));
                }
            }
        }
        if let Some(rule) = annotations.email() {
            let Some(text) = text else {
                return Err(violation(
                    names::EMAIL,
                    format!("expected a string, found {}", value.kind_name()),
                ));
            };
            let Some((_, domain)) = split_email(text) else {
                return Err(violation(
                    names::EMAIL,
                    format!("`{text}` is not a well-formed address"),
                ));
            };
            if !rule.allow.is_empty() && !rule.allow.iter().any(|allowed| allowed == domain) {
                return Err(violation(
                    names::EMAIL,
                    format!("domain `{domain}` is not in the allow list"),
                ));
            }
            if rule.block.iter().any(|blocked| blocked == domain) {
                return Err(violation(
                    names::EMAIL,
                    format!("domain `{domain}` is blocked"),
                ));
            }
        }
        if let Some(rule) = annotations.url() {
            let Some(text) = text else {
                return Err(violation(
                    names::URL,
                    format!("expected a string, found {}", value.kind_name()),
                ));
            };
            let Some((protocol, host)) = split_url(text) else {
                return Err(violation(
                    names::URL,
                    format!("`{text}` is not a well-formed url"),
                ));
            };
            if !rule.protocols.is_empty() && !rule.protocols.iter().any(|known| known == protocol)
            {
                return Err(violation(
                    names::URL,
                    format!("protocol `{protocol}` is not allowed"),
                ));
            }
            if !rule.host_allow.is_empty() && !rule.host_allow.iter().any(|allowed| allowed == host)
            {
                return Err(violation(
                    names::URL,
                    format!("host `{host}` is not in the allow list"),
                ));
            }
            if rule.host_block.iter().any(|blocked| blocked == host) {
                return Err(violation(names::URL, format!("host `{host}` is blocked")));
            }
        }
        Ok(())
    }

    fn check_size(
        &self,
        annotations: &AnnotationSet,
        value: &Value,
    ) -> Result<(), ContractViolation> {
        let Some(bounds) = annotations.size() else {
            return Ok(());
        };
        let Some(length) = value.collection_len() else {
            return Err(violation(
                names::SIZE,
                format!("expected a sized value, found {}", value.kind_name()),
            ));
        };
        let length = length as i64;
        if length < bounds.min || length > bounds.max {
            return Err(violation(
                names::SIZE,
                format!("size {length} is outside [{}, {}]", bounds.min, bounds.max),
            )
            .with_comparison(
                format!("size in [{}, {}]", bounds.min, bounds.max),
                format!("size {length}"),
            ));
        }
        Ok(())
    }

    fn check_temporal(
        &self,
        annotations: &AnnotationSet,
        value: &Value,
    ) -> Result<(), ContractViolation> {
        for (name, must_be_past) in [(names::PAST, true), (names::FUTURE, false)] {
            if !annotations.has(name) {
                continue;
            }
            let Some(observed) = value.as_timestamp() else {
                return Err(violation(
                    name,
                    format!("expected a temporal value, found {}", value.kind_name()),
                ));
            };
            let now = self.clock.now();
            let holds = if must_be_past {
                observed < now
            } else {
                observed > now
            };
            if !holds {
                let relation = if must_be_past { "before" } else { "after" };
                return Err(violation(
                    name,
                    format!("{observed} must be {relation} {now}"),
                )
                .with_comparison(format!("{relation} {now}"), observed.to_rfc3339()));
            }
        }
        Ok(())
    }
}

fn check_range(name: &str, observed: i64, min: i64, max: i64) -> Result<(), ContractViolation> {
    if observed < min || observed > max {
        return Err(
            violation(name, format!("{observed} is outside [{min}, {max}]"))
                .with_comparison(format!("[{min}, {max}]"), observed.to_string()),
        );
    }
    Ok(())
}

fn violation(annotation: &str, message: impl Into<String>) -> ContractViolation {
    ContractViolation::new(
        AssertionRule::Annotation {
            name: annotation.to_owned(),
        },
        message,
    )
}

fn split_email(text: &str) -> Option<(&str, &str)> {
    let (local, domain) = text.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some((local, domain))
}

fn split_url(text: &str) -> Option<(&str, &str)> {
    let (protocol, rest) = text.split_once("://")?;
    if protocol.is_empty() {
        return None;
    }
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    if host.is_empty() {
        return None;
    }
    Some((protocol, host))
}
