//! Temporal strategy.
//!
//! Instants are sampled at second resolution between the bound instants,
//! with nanos constrained when the drawn second sits on a boundary. `Past`
//! and `Future` derive the bounds from the frozen clock.

use chrono::{DateTime, Duration, TimeZone, Utc};
use covenant_type_graph::{names, TemporalBounds, Value, ValueKind};

use crate::{
    context::GenerationContext,
    error::GenerationError,
    request::GenerationRequest,
    strategies::{extend_unique, GenerationStrategy, Regen},
};

/// Default generation horizon on each side of the frozen instant.
const HORIZON_SECS: i64 = 100 * 365 * 24 * 3600;

const BOUNDARY_BIAS: f64 = 0.10;

pub struct TimeStrategy;

impl TimeStrategy {
    fn bounds(request: &GenerationRequest, ctx: &GenerationContext) -> TemporalBounds {
        let now = ctx.clock().now();
        let second = Duration::seconds(1);
        let horizon = Duration::seconds(HORIZON_SECS);
        if request.annotations.has(names::PAST) {
            TemporalBounds {
                min: now - horizon,
                max: now - second,
            }
        } else if request.annotations.has(names::FUTURE) {
            TemporalBounds {
                min: now + second,
                max: now + horizon,
            }
        } else {
            TemporalBounds {
                min: now - horizon,
                max: now + horizon,
            }
        }
    }

    fn draw(bounds: TemporalBounds, ctx: &mut GenerationContext) -> DateTime<Utc> {
        let min_sec = bounds.min.timestamp();
        let max_sec = bounds.max.timestamp();
        let sec = ctx.next_long_inclusive(min_sec, max_sec);
        // Nanos are free in the interior; on a boundary second they are
        // clamped so the draw stays inside the bounds.
        let mut nanos = ctx.next_long_inclusive(0, 999_999_999) as u32;
        if sec == min_sec {
            nanos = nanos.max(bounds.min.timestamp_subsec_nanos());
        }
        if sec == max_sec {
            nanos = nanos.min(bounds.max.timestamp_subsec_nanos());
        }
        Utc.timestamp_opt(sec, nanos)
            .single()
            .unwrap_or(bounds.min)
    }
}

impl GenerationStrategy for TimeStrategy {
    fn name(&self) -> &'static str {
        "TimeStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(request.descriptor.value_kind(), Some(ValueKind::Timestamp))
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        let bounds = Self::bounds(request, ctx);
        if ctx.chance(BOUNDARY_BIAS) {
            let boundary = if ctx.chance(0.5) { bounds.min } else { bounds.max };
            return Ok(Value::Timestamp(boundary));
        }
        Ok(Value::Timestamp(Self::draw(bounds, ctx)))
    }

    fn edge_cases(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let bounds = Self::bounds(request, ctx);
        let second = Duration::seconds(1);
        let mut edges = Vec::new();
        extend_unique(
            &mut edges,
            vec![
                Value::Timestamp(bounds.min),
                Value::Timestamp(bounds.max),
                Value::Timestamp(bounds.min + second),
                Value::Timestamp(bounds.max - second),
            ],
        );
        edges
    }

    fn invalid(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let bounds = Self::bounds(request, ctx);
        let second = Duration::seconds(1);
        vec![
            Value::Timestamp(bounds.min - second),
            Value::Timestamp(bounds.max + second),
        ]
    }
}
