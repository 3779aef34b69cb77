//! Logging facilities for Veneer core.
//!
//! Veneer uses the `tracing` crate for instrumentation. To see logs, install
//! a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! Hot-path bookkeeping (enqueue, cache hits) logs at trace level, flush
//! summaries at debug, and the soft-failure taxonomy (unknown names, codec
//! rejections) at warn/info.

use std::fmt::Write as FmtWrite;

use crate::bridge::Operation;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "veneer_core";
    /// Operation batching and flushing.
    pub const BRIDGE: &str = "veneer_core::bridge";
    /// Object registry.
    pub const REGISTRY: &str = "veneer_core::registry";
    /// Type coding table.
    pub const CODEC: &str = "veneer_core::codec";
}

/// Format a pending operation queue for debug output, one operation per line.
pub fn format_queue(operations: &[Operation]) -> String {
    let mut out = String::new();
    for (index, op) in operations.iter().enumerate() {
        let _ = writeln!(out, "{index:>4}  {op}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Cid, ValueMap};

    #[test]
    fn test_format_queue() {
        let ops = vec![
            Operation::Create {
                cid: Cid::new("o1"),
                type_name: "Composite".into(),
                properties: ValueMap::new(),
            },
            Operation::Destroy { cid: Cid::new("o1") },
        ];
        let text = format_queue(&ops);
        assert!(text.contains("create o1"));
        assert!(text.contains("destroy o1"));
        assert_eq!(text.lines().count(), 2);
    }
}
