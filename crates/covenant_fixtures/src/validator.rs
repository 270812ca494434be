//! Constraint configuration pre-pass.
//!
//! Runs before strategy selection and rejects mutually exclusive or
//! nonsensical annotation combinations, so a bad contract fails fast instead
//! of producing garbage fixtures.

use covenant_type_graph::{names, TypeDescriptor, ValueKind};

use crate::{error::GenerationError, request::GenerationRequest};

pub fn validate_configuration(request: &GenerationRequest) -> Result<(), GenerationError> {
    let annotations = &request.annotations;
    let fail = |reason: String| {
        Err(GenerationError::InvalidAnnotationValue {
            subject: request.name.clone(),
            reason,
        })
    };

    const EXCLUSIVE: &[(&str, &str)] = &[
        (names::NULL, names::NOT_NULL),
        (names::ASSERT_TRUE, names::ASSERT_FALSE),
        (names::PAST, names::FUTURE),
        (names::POSITIVE, names::NEGATIVE),
    ];
    for (left, right) in EXCLUSIVE {
        if annotations.has(left) && annotations.has(right) {
            return fail(format!("`{left}` and `{right}` are mutually exclusive"));
        }
    }

    if annotations.has(names::NULL) {
        for name in names::VALUE_CONSTRAINTS {
            if annotations.has(name) {
                return fail(format!("`Null` cannot be combined with `{name}`"));
            }
        }
    }

    if annotations.has(names::PATTERN) && !is_string(&request.descriptor) {
        return fail(format!(
            "`Pattern` requires a string type, found `{}`",
            request.descriptor.kind_label()
        ));
    }

    const SIGN_RULES: &[&str] = &[
        names::POSITIVE,
        names::POSITIVE_OR_ZERO,
        names::NEGATIVE,
        names::NEGATIVE_OR_ZERO,
    ];
    for name in SIGN_RULES {
        if annotations.has(name) && !is_numeric(&request.descriptor) {
            return fail(format!(
                "`{name}` requires a numeric type, found `{}`",
                request.descriptor.kind_label()
            ));
        }
    }

    for name in [names::PAST, names::FUTURE] {
        if annotations.has(name) && !is_temporal(&request.descriptor) {
            return fail(format!(
                "`{name}` requires a temporal type, found `{}`",
                request.descriptor.kind_label()
            ));
        }
    }

    if let Some(size) = annotations.size() {
        if size.min < 0 {
            return fail(format!("`Size` min must not be negative, was {}", size.min));
        }
        if size.min > size.max {
            return fail(format!(
                "`Size` min {} exceeds max {}",
                size.min, size.max
            ));
        }
    }

    if let Some(length) = annotations.string_length() {
        if length.min < 0 {
            return fail(format!(
                "`StringLength` min must not be negative, was {}",
                length.min
            ));
        }
        if length.min > length.max {
            return fail(format!(
                "`StringLength` min {} exceeds max {}",
                length.min, length.max
            ));
        }
    }

    Ok(())
}

fn is_string(descriptor: &TypeDescriptor) -> bool {
    matches!(descriptor.value_kind(), Some(ValueKind::Str))
}

fn is_numeric(descriptor: &TypeDescriptor) -> bool {
    matches!(
        descriptor.value_kind(),
        Some(ValueKind::Int | ValueKind::Long | ValueKind::Double | ValueKind::Decimal)
    )
}

fn is_temporal(descriptor: &TypeDescriptor) -> bool {
    matches!(descriptor.value_kind(), Some(ValueKind::Timestamp))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use covenant_type_graph::{
        Annotation, AnnotationSet, TypeAttributes, TypeId,
    };

    use super::*;

    fn request_with(kind: ValueKind, annotations: AnnotationSet) -> GenerationRequest {
        let descriptor = Arc::new(TypeDescriptor::Value {
            attrs: TypeAttributes {
                type_id: TypeId::plain("covenant.T"),
                simple_name: "T".into(),
                qualified_name: "covenant.T".into(),
                is_nullable: false,
                is_inline: false,
                annotations: AnnotationSet::empty(),
            },
            kind,
        });
        GenerationRequest {
            descriptor,
            name: "slot".into(),
            annotations,
        }
    }

    #[test]
    fn rejects_exclusive_pairs() {
        let request = request_with(
            ValueKind::Bool,
            AnnotationSet::of([
                Annotation::marker(names::ASSERT_TRUE),
                Annotation::marker(names::ASSERT_FALSE),
            ]),
        );
        assert!(validate_configuration(&request).is_err());
    }

    #[test]
    fn rejects_null_with_value_constraint() {
        let request = request_with(
            ValueKind::Int,
            AnnotationSet::of([
                Annotation::marker(names::NULL),
                Annotation::marker(names::POSITIVE),
            ]),
        );
        let error = validate_configuration(&request).unwrap_err();
        assert!(error.to_string().contains("Null"));
    }

    #[test]
    fn rejects_type_mismatches() {
        let pattern = request_with(
            ValueKind::Int,
            AnnotationSet::of([Annotation::marker(names::PATTERN).with("regexp", "a+")]),
        );
        assert!(validate_configuration(&pattern).is_err());

        let positive = request_with(
            ValueKind::Str,
            AnnotationSet::of([Annotation::marker(names::POSITIVE)]),
        );
        assert!(validate_configuration(&positive).is_err());

        let future = request_with(
            ValueKind::Str,
            AnnotationSet::of([Annotation::marker(names::FUTURE)]),
        );
        assert!(validate_configuration(&future).is_err());
    }

    #[test]
    fn rejects_bad_size_values() {
        let negative = request_with(
            ValueKind::Str,
            AnnotationSet::of([Annotation::marker(names::SIZE).with("min", -1i64)]),
        );
        assert!(validate_configuration(&negative).is_err());

        let inverted = request_with(
            ValueKind::Str,
            AnnotationSet::of([Annotation::marker(names::SIZE)
                .with("min", 5i64)
                .with("max", 2i64)]),
        );
        assert!(validate_configuration(&inverted).is_err());
    }

    #[test]
    fn accepts_consistent_configuration() {
        let request = request_with(
            ValueKind::Int,
            AnnotationSet::of([
                Annotation::marker(names::NOT_NULL),
                Annotation::marker(names::INT_RANGE)
                    .with("min", 1i64)
                    .with("max", 10i64),
            ]),
        );
        assert!(validate_configuration(&request).is_ok());
    }
}
