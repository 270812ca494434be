//! Trace events and their wire format.

use serde::{Deserialize, Serialize};

/// Exception stacks are truncated to this many lines on the wire.
pub const STACK_LINE_LIMIT: usize = 15;

/// The audit phase an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Design,
    Execution,
    Verification,
    Exception,
    Verdict,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Design => "DESIGN",
            Self::Execution => "EXECUTION",
            Self::Verification => "VERIFICATION",
            Self::Exception => "EXCEPTION",
            Self::Verdict => "VERDICT",
        }
    }
}

/// A single audit event. Serialized as NDJSON with a `type` discriminator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TraceEvent {
    /// A fixture-generation decision: which strategy was chosen and what it
    /// produced for the named subject.
    Design {
        subject: String,
        strategy: String,
        value: String,
        ts: i64,
    },
    /// One method invocation with its recorded argument list.
    Execution {
        method: String,
        args: Vec<String>,
        #[serde(rename = "durationMs")]
        duration_ms: u64,
        ts: i64,
    },
    /// One evaluated assertion record.
    Verification {
        rule: String,
        status: String,
        detail: String,
        ts: i64,
    },
    /// An escaped failure, with a sanitized stack.
    Exception {
        #[serde(rename = "exType")]
        ex_type: String,
        message: String,
        stack: Vec<String>,
        ts: i64,
    },
    /// The final verdict of the run. The status object is the
    /// `TestResultEvent` status wire shape.
    Verdict {
        status: serde_json::Value,
        #[serde(rename = "durationTotalMs")]
        duration_total_ms: u64,
        ts: i64,
    },
}

impl TraceEvent {
    /// Constructor for exception events; truncates the stack to
    /// [`STACK_LINE_LIMIT`] lines.
    pub fn exception(ex_type: &str, message: &str, mut stack: Vec<String>, ts: i64) -> Self {
        stack.truncate(STACK_LINE_LIMIT);
        Self::Exception {
            ex_type: ex_type.to_owned(),
            message: message.to_owned(),
            stack,
            ts,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Design { .. } => Phase::Design,
            Self::Execution { .. } => Phase::Execution,
            Self::Verification { .. } => Phase::Verification,
            Self::Exception { .. } => Phase::Exception,
            Self::Verdict { .. } => Phase::Verdict,
        }
    }

    /// Critical events bypass the sink buffer so they reach disk even if the
    /// process dies right after.
    pub fn is_critical(&self) -> bool {
        match self {
            Self::Design { .. } => false,
            Self::Execution { .. }
            | Self::Verification { .. }
            | Self::Exception { .. }
            | Self::Verdict { .. } => true,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Design { ts, .. }
            | Self::Execution { ts, .. }
            | Self::Verification { ts, .. }
            | Self::Exception { ts, .. }
            | Self::Verdict { ts, .. } => *ts,
        }
    }

    /// The event as one NDJSON line, newline included.
    pub fn to_ndjson_line(&self) -> String {
        let mut line = serde_json::to_string(self).expect("trace events serialize infallibly");
        line.push('\n');
        line
    }
}
