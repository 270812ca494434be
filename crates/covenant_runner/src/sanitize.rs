//! Frame sanitization and source-location extraction.
//!
//! Before a failure is displayed or persisted, frames belonging to the
//! framework and to runtime plumbing are filtered out so the remaining
//! coordinate points at user code.

use covenant_type_graph::FrameRecord;

use crate::result::SourceLocation;

/// Module prefixes considered framework-internal or runtime plumbing.
const INTERNAL_PREFIXES: &[&str] = &[
    "covenant_",
    "std::",
    "core::",
    "alloc::",
    "tokio::",
    "rayon::",
    "rayon_core::",
];

fn is_internal(frame: &FrameRecord) -> bool {
    INTERNAL_PREFIXES
        .iter()
        .any(|prefix| frame.module.starts_with(prefix))
}

/// Removes internal frames, preserving order. Debug mode keeps the raw
/// trace untouched.
pub fn sanitize_frames(frames: &[FrameRecord], debug: bool) -> Vec<FrameRecord> {
    if debug {
        return frames.to_vec();
    }
    frames
        .iter()
        .filter(|frame| !is_internal(frame))
        .cloned()
        .collect()
}

/// Best available location for a failure:
/// an exact user frame when the sanitized trace has one; an approximate
/// class pointer when trace mode is on; unknown otherwise.
pub fn extract_location(
    sanitized: &[FrameRecord],
    trace_mode: bool,
    target_fqn: &str,
    display_name: &str,
) -> SourceLocation {
    if let Some(frame) = sanitized.first() {
        return SourceLocation::Exact {
            file: frame.file.clone(),
            line: frame.line,
            class: frame.module.clone(),
            method: frame.method.clone(),
        };
    }
    if trace_mode {
        SourceLocation::Approximate {
            class: target_fqn.to_owned(),
            display: display_name.to_owned(),
        }
    } else {
        SourceLocation::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames() -> Vec<FrameRecord> {
        vec![
            FrameRecord::new("covenant_runner::executor", "executor.rs", 10, "invoke"),
            FrameRecord::new("std::panicking", "panicking.rs", 5, "begin_panic"),
            FrameRecord::new("demo::adder", "adder.rs", 14, "sum"),
            FrameRecord::new("rayon_core::registry", "registry.rs", 99, "work"),
        ]
    }

    #[test]
    fn drops_framework_and_runtime_frames() {
        let sanitized = sanitize_frames(&frames(), false);
        assert_eq!(sanitized.len(), 1);
        assert_eq!(sanitized[0].module, "demo::adder");
    }

    #[test]
    fn debug_mode_preserves_the_raw_trace() {
        assert_eq!(sanitize_frames(&frames(), true).len(), 4);
    }

    #[test]
    fn location_prefers_the_first_user_frame() {
        let sanitized = sanitize_frames(&frames(), false);
        let location = extract_location(&sanitized, false, "demo.Adder", "Adder");
        assert_eq!(
            location,
            SourceLocation::Exact {
                file: "adder.rs".into(),
                line: 14,
                class: "demo::adder".into(),
                method: "sum".into(),
            }
        );
        assert_eq!(location.render(), "adder.rs:14 (sum)");
    }

    #[test]
    fn falls_back_to_approximate_only_in_trace_mode() {
        assert_eq!(
            extract_location(&[], true, "demo.Adder", "Adder"),
            SourceLocation::Approximate {
                class: "demo.Adder".into(),
                display: "Adder".into(),
            }
        );
        assert_eq!(
            extract_location(&[], false, "demo.Adder", "Adder"),
            SourceLocation::Unknown
        );
    }
}
