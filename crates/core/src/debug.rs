//! Debug output to context-supplied sinks
//!
//! Lines are prefixed with the context's trace breadcrumb so interleaved
//! output from nested specs stays attributable. `tracing` carries the same
//! information as structured log events; the sinks exist so embedders can
//! capture a run's debug stream directly.

use std::io::Write;

use crate::context::RunContext;

/// Write a message line to every debug sink on the context.
pub fn debug_println(ctx: &RunContext, msg: &str) {
    let sinks = ctx.debug_sinks();
    if sinks.is_empty() {
        return;
    }
    let trace = ctx.trace();
    let line = if trace.is_empty() {
        format!("[specrun] {}\n", msg)
    } else {
        format!("[specrun] {} {}\n", trace, msg)
    };
    for sink in sinks {
        let _ = sink.lock().write_all(line.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_debug_println_prefixes_trace() {
        let buf = SharedBuf::default();
        let ctx = RunContext::default()
            .with_debug(buf.clone())
            .push_trace("scenario")
            .push_trace("0:first");

        debug_println(&ctx, "wait: 250ms before");

        let out = String::from_utf8(buf.0.lock().clone()).unwrap();
        assert_eq!(out, "[specrun] scenario/0:first wait: 250ms before\n");
    }

    #[test]
    fn test_no_sinks_is_noop() {
        let ctx = RunContext::default();
        debug_println(&ctx, "dropped");
    }
}
