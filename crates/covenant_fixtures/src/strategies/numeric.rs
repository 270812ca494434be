//! Numeric strategies: `Int`, `Long`, `Double`, `Decimal`.
//!
//! Each is parameterized by inclusive `[min, max]` bounds derived from the
//! range annotation refined by the sign rules. `generate` samples the edge
//! set with 10% probability, otherwise draws uniformly over the bounds.

use covenant_type_graph::{names, Decimal, IntBounds, Value, ValueKind};

use crate::{
    context::GenerationContext,
    error::GenerationError,
    request::GenerationRequest,
    strategies::{extend_unique, GenerationStrategy, Regen},
};

const EDGE_BIAS: f64 = 0.10;

fn refine_signed(mut bounds: IntBounds, request: &GenerationRequest) -> IntBounds {
    let annotations = &request.annotations;
    if annotations.has(names::POSITIVE) {
        bounds.min = bounds.min.max(1);
    }
    if annotations.has(names::POSITIVE_OR_ZERO) {
        bounds.min = bounds.min.max(0);
    }
    if annotations.has(names::NEGATIVE) {
        bounds.max = bounds.max.min(-1);
    }
    if annotations.has(names::NEGATIVE_OR_ZERO) {
        bounds.max = bounds.max.min(0);
    }
    bounds
}

fn integer_edges(bounds: IntBounds) -> Vec<i64> {
    let IntBounds { min, max } = bounds;
    let mut candidates = vec![min, max];
    if min < max {
        candidates.push(min + 1);
        candidates.push(max - 1);
    }
    if min <= 0 && 0 <= max {
        candidates.push(0);
    }
    let mut edges: Vec<i64> = Vec::new();
    for candidate in candidates {
        if !edges.contains(&candidate) {
            edges.push(candidate);
        }
    }
    edges
}

fn pick_biased(ctx: &mut GenerationContext, edges: &[i64], bounds: IntBounds) -> i64 {
    if !edges.is_empty() && ctx.chance(EDGE_BIAS) {
        edges[ctx.pick_index(edges.len())]
    } else {
        ctx.next_long_inclusive(bounds.min, bounds.max)
    }
}

/// 32-bit integers.
pub struct IntStrategy;

impl IntStrategy {
    fn bounds(request: &GenerationRequest) -> IntBounds {
        let declared = request
            .annotations
            .integer_bounds(names::INT_RANGE, i64::from(i32::MIN), i64::from(i32::MAX))
            .unwrap_or(IntBounds {
                min: i64::from(i32::MIN),
                max: i64::from(i32::MAX),
            });
        refine_signed(declared, request)
    }
}

impl GenerationStrategy for IntStrategy {
    fn name(&self) -> &'static str {
        "IntStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(request.descriptor.value_kind(), Some(ValueKind::Int))
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        let bounds = Self::bounds(request);
        let edges = integer_edges(bounds);
        Ok(Value::Int(pick_biased(ctx, &edges, bounds) as i32))
    }

    fn edge_cases(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        integer_edges(Self::bounds(request))
            .into_iter()
            .map(|edge| Value::Int(edge as i32))
            .collect()
    }

    fn invalid(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let bounds = Self::bounds(request);
        let mut samples = Vec::new();
        if bounds.min > i64::from(i32::MIN) {
            samples.push(Value::Int((bounds.min - 1) as i32));
        }
        if bounds.max < i64::from(i32::MAX) {
            samples.push(Value::Int((bounds.max + 1) as i32));
        }
        // Type-overflow injection: a long one past the int domain.
        samples.push(Value::Long(i64::from(i32::MAX) + 1));
        samples
    }
}

/// 64-bit integers.
pub struct LongStrategy;

impl LongStrategy {
    fn bounds(request: &GenerationRequest) -> IntBounds {
        let declared = request
            .annotations
            .integer_bounds(names::LONG_RANGE, i64::MIN, i64::MAX)
            .unwrap_or(IntBounds {
                min: i64::MIN,
                max: i64::MAX,
            });
        refine_signed(declared, request)
    }
}

impl GenerationStrategy for LongStrategy {
    fn name(&self) -> &'static str {
        "LongStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(request.descriptor.value_kind(), Some(ValueKind::Long))
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        let bounds = Self::bounds(request);
        let edges = integer_edges(bounds);
        Ok(Value::Long(pick_biased(ctx, &edges, bounds)))
    }

    fn edge_cases(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        integer_edges(Self::bounds(request))
            .into_iter()
            .map(Value::Long)
            .collect()
    }

    fn invalid(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let bounds = Self::bounds(request);
        let mut samples = Vec::new();
        if let Some(below) = bounds.min.checked_sub(1) {
            samples.push(Value::Long(below));
        }
        if let Some(above) = bounds.max.checked_add(1) {
            samples.push(Value::Long(above));
        }
        // One past the long domain only exists as a decimal.
        samples.push(Value::Decimal(Decimal::new(i128::from(i64::MAX) + 1, 0)));
        samples
    }
}

/// 64-bit floats.
pub struct DoubleStrategy;

impl DoubleStrategy {
    fn bounds(request: &GenerationRequest) -> (f64, f64) {
        let declared = request.annotations.real_bounds();
        let (mut min, mut max) = declared
            .map(|bounds| (bounds.min, bounds.max))
            .unwrap_or((f64::MIN, f64::MAX));
        let annotations = &request.annotations;
        if annotations.has(names::POSITIVE) {
            min = min.max(0.0_f64.next_up());
        }
        if annotations.has(names::POSITIVE_OR_ZERO) {
            min = min.max(0.0);
        }
        if annotations.has(names::NEGATIVE) {
            max = max.min(0.0_f64.next_down());
        }
        if annotations.has(names::NEGATIVE_OR_ZERO) {
            max = max.min(0.0);
        }
        (min, max)
    }
}

impl GenerationStrategy for DoubleStrategy {
    fn name(&self) -> &'static str {
        "DoubleStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(request.descriptor.value_kind(), Some(ValueKind::Double))
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        let (min, max) = Self::bounds(request);
        if ctx.chance(EDGE_BIAS) {
            let edges = self.edge_cases(request, ctx, regen);
            if !edges.is_empty() {
                return Ok(edges[ctx.pick_index(edges.len())].clone());
            }
        }
        Ok(Value::Double(ctx.next_double_inclusive(min, max)))
    }

    fn edge_cases(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let (min, max) = Self::bounds(request);
        let mut edges = vec![min, max];
        if min < max {
            edges.push(min.next_up());
            edges.push(max.next_down());
        }
        if min <= 0.0 && 0.0 <= max {
            edges.push(0.0);
            edges.push(-0.0);
        }
        let mut out = Vec::new();
        extend_unique(&mut out, edges.into_iter().map(Value::Double).collect());
        out
    }

    fn invalid(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let (min, max) = Self::bounds(request);
        let mut samples = Vec::new();
        if min > f64::MIN {
            samples.push(Value::Double(min.next_down()));
        }
        if max < f64::MAX {
            samples.push(Value::Double(max.next_up()));
        }
        samples.push(Value::Double(f64::NAN));
        samples.push(Value::Double(f64::INFINITY));
        samples.push(Value::Double(f64::NEG_INFINITY));
        samples
    }
}

/// Exact decimals, parameterized by `DecimalMin` and `Digits`.
pub struct DecimalStrategy;

impl DecimalStrategy {
    const DEFAULT_SCALE: u32 = 2;
    const DEFAULT_MAGNITUDE: i64 = 1_000_000_000;

    /// Inclusive decimal bounds at the working scale.
    fn bounds(request: &GenerationRequest) -> (Decimal, Decimal, u32) {
        let digits = request.annotations.digits();
        let scale = digits
            .map(|rule| rule.fraction.min(9))
            .unwrap_or(Self::DEFAULT_SCALE);

        let magnitude = digits
            .map(|rule| {
                let capped = rule.integer.min(18);
                10i64.saturating_pow(capped).saturating_sub(1)
            })
            .unwrap_or(Self::DEFAULT_MAGNITUDE);
        let mut min = Decimal::from_long(-magnitude);
        let max = Decimal::from_long(magnitude);

        if let Some(bound) = request.annotations.decimal_min() {
            min = if bound.inclusive {
                bound.value
            } else {
                bound
                    .value
                    .checked_add(&Decimal::new(1, scale))
                    .unwrap_or(bound.value)
            };
        }
        let annotations = &request.annotations;
        if annotations.has(names::POSITIVE) {
            min = min.max(Decimal::new(1, scale));
        }
        if annotations.has(names::POSITIVE_OR_ZERO) {
            min = min.max(Decimal::from_long(0));
        }
        let max = if annotations.has(names::NEGATIVE) {
            max.min(Decimal::new(-1, scale))
        } else if annotations.has(names::NEGATIVE_OR_ZERO) {
            max.min(Decimal::from_long(0))
        } else {
            max
        };
        (min, max, scale)
    }

    fn mantissa_at(value: &Decimal, scale: u32) -> i64 {
        let shift = scale.saturating_sub(value.scale());
        let lifted = value
            .mantissa()
            .saturating_mul(10i128.saturating_pow(shift));
        lifted.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }
}

impl GenerationStrategy for DecimalStrategy {
    fn name(&self) -> &'static str {
        "DecimalStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(request.descriptor.value_kind(), Some(ValueKind::Decimal))
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        let (min, max, scale) = Self::bounds(request);
        if ctx.chance(EDGE_BIAS) {
            let edges = self.edge_cases(request, ctx, regen);
            if !edges.is_empty() {
                return Ok(edges[ctx.pick_index(edges.len())].clone());
            }
        }
        let low = Self::mantissa_at(&min, scale);
        let high = Self::mantissa_at(&max, scale).max(low);
        let mantissa = ctx.next_long_inclusive(low, high);
        Ok(Value::Decimal(Decimal::new(i128::from(mantissa), scale)))
    }

    fn edge_cases(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let (min, max, scale) = Self::bounds(request);
        let step = Decimal::new(1, scale);
        let mut edges = vec![min, max];
        if min < max {
            if let Some(just_above) = min.checked_add(&step) {
                edges.push(just_above);
            }
            if let Some(just_below) = max.checked_sub(&step) {
                edges.push(just_below);
            }
        }
        let zero = Decimal::from_long(0);
        if min <= zero && zero <= max {
            edges.push(zero);
        }
        let mut out = Vec::new();
        extend_unique(&mut out, edges.into_iter().map(Value::Decimal).collect());
        out
    }

    fn invalid(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let (min, max, scale) = Self::bounds(request);
        let step = Decimal::new(1, scale);
        let mut samples = Vec::new();
        if let Some(below) = min.checked_sub(&step) {
            samples.push(Value::Decimal(below));
        }
        if let Some(above) = max.checked_add(&step) {
            samples.push(Value::Decimal(above));
        }
        if let Some(bound) = request.annotations.decimal_min() {
            if !bound.inclusive {
                // The exclusive bound itself is out of range.
                samples.push(Value::Decimal(bound.value));
            }
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use covenant_type_graph::{
        Annotation, AnnotationSet, FrozenClock, TypeAttributes, TypeDescriptor, TypeId,
    };
    use covenant_trace::ScenarioTrace;

    use super::*;
    use crate::strategies::Regenerator;

    fn request(kind: ValueKind, annotations: AnnotationSet) -> GenerationRequest {
        GenerationRequest {
            descriptor: Arc::new(TypeDescriptor::Value {
                attrs: TypeAttributes {
                    type_id: TypeId::plain("covenant.N"),
                    simple_name: "N".into(),
                    qualified_name: "covenant.N".into(),
                    is_nullable: false,
                    is_inline: false,
                    annotations: AnnotationSet::empty(),
                },
                kind,
            }),
            name: "n".into(),
            annotations,
        }
    }

    fn ctx(seed: i64) -> GenerationContext {
        GenerationContext::new(
            seed,
            FrozenClock::freeze(),
            Arc::new(ScenarioTrace::new(uuid::Uuid::nil())),
        )
    }

    fn with_regen<T>(f: impl FnOnce(Regen<'_, '_>) -> T) -> T {
        let produce = |_: &GenerationRequest, _: &mut GenerationContext| Ok(Value::Null);
        let child = |_: &str,
                     _: &covenant_type_graph::TypeReference,
                     _: &AnnotationSet|
         -> Result<GenerationRequest, GenerationError> {
            unreachable!("terminal strategies never request children")
        };
        let invalid = |_: &GenerationRequest, _: &mut GenerationContext| Vec::new();
        let regen = Regenerator::new(&produce, &child, &invalid);
        f(&regen)
    }

    #[test]
    fn int_draws_stay_in_range_and_hit_bounds() {
        let request = request(
            ValueKind::Int,
            AnnotationSet::of([Annotation::marker(names::INT_RANGE)
                .with("min", 1i64)
                .with("max", 10i64)]),
        );
        let mut ctx = ctx(42);
        let mut seen_min = false;
        let mut seen_max = false;
        with_regen(|regen| {
            for _ in 0..3000 {
                match IntStrategy.generate(&request, &mut ctx, regen).unwrap() {
                    Value::Int(value) => {
                        assert!((1..=10).contains(&value));
                        seen_min |= value == 1;
                        seen_max |= value == 10;
                    }
                    other => panic!("unexpected {other:?}"),
                }
            }
        });
        assert!(seen_min && seen_max);
    }

    #[test]
    fn int_edges_and_invalid() {
        let request = request(
            ValueKind::Int,
            AnnotationSet::of([Annotation::marker(names::INT_RANGE)
                .with("min", -1i64)
                .with("max", 5i64)]),
        );
        let mut ctx = ctx(1);
        with_regen(|regen| {
            let edges = IntStrategy.edge_cases(&request, &mut ctx, regen);
            assert_eq!(
                edges,
                vec![Value::Int(-1), Value::Int(5), Value::Int(0), Value::Int(4)]
            );
            let invalid = IntStrategy.invalid(&request, &mut ctx, regen);
            assert!(invalid.contains(&Value::Int(-2)));
            assert!(invalid.contains(&Value::Int(6)));
            assert!(invalid.contains(&Value::Long(i64::from(i32::MAX) + 1)));
        });
    }

    #[test]
    fn positive_refines_lower_bound() {
        let request = request(
            ValueKind::Long,
            AnnotationSet::of([Annotation::marker(names::POSITIVE)]),
        );
        let mut ctx = ctx(7);
        with_regen(|regen| {
            for _ in 0..500 {
                match LongStrategy.generate(&request, &mut ctx, regen).unwrap() {
                    Value::Long(value) => assert!(value >= 1),
                    other => panic!("unexpected {other:?}"),
                }
            }
        });
    }

    #[test]
    fn double_invalid_includes_non_finite() {
        let request = request(
            ValueKind::Double,
            AnnotationSet::of([Annotation::marker(names::DOUBLE_RANGE)
                .with("min", 0.0f64)
                .with("max", 1.0f64)]),
        );
        let mut ctx = ctx(2);
        with_regen(|regen| {
            let invalid = DoubleStrategy.invalid(&request, &mut ctx, regen);
            assert!(invalid.iter().any(|value| matches!(value, Value::Double(d) if d.is_nan())));
            assert!(invalid.contains(&Value::Double(f64::INFINITY)));
            assert!(invalid.contains(&Value::Double(f64::NEG_INFINITY)));
            assert!(invalid.contains(&Value::Double(1.0f64.next_up())));
        });
    }

    #[test]
    fn double_edges_include_signed_zero() {
        let request = request(
            ValueKind::Double,
            AnnotationSet::of([Annotation::marker(names::DOUBLE_RANGE)
                .with("min", -1.0f64)
                .with("max", 1.0f64)]),
        );
        let mut ctx = ctx(3);
        with_regen(|regen| {
            let edges = DoubleStrategy.edge_cases(&request, &mut ctx, regen);
            assert!(edges.contains(&Value::Double(0.0)));
            // Rendered forms distinguish 0.0 from -0.0.
            assert!(edges.iter().any(|value| value.render() == "-0.0"));
        });
    }

    #[test]
    fn decimal_respects_exclusive_minimum() {
        let request = request(
            ValueKind::Decimal,
            AnnotationSet::of([Annotation::marker(names::DECIMAL_MIN)
                .with("value", "0.00")
                .with("inclusive", false)]),
        );
        let mut ctx = ctx(4);
        with_regen(|regen| {
            for _ in 0..500 {
                match DecimalStrategy.generate(&request, &mut ctx, regen).unwrap() {
                    Value::Decimal(value) => assert!(value > Decimal::from_long(0)),
                    other => panic!("unexpected {other:?}"),
                }
            }
            let invalid = DecimalStrategy.invalid(&request, &mut ctx, regen);
            assert!(invalid.contains(&Value::Decimal(Decimal::from_long(0))));
        });
    }
}
