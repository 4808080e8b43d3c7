/// Per-element tracing for hot paths (pushes, slot allocations).
///
/// Expands to nothing unless the `trace-verbose` feature is enabled, in which
/// case it forwards to [`tracing::trace!`] tagged with the call site.
#[macro_export]
macro_rules! trace_verbose {
    ($($arg:tt)*) => {
        #[cfg(feature = "trace-verbose")] {
            ::tracing::trace!(site = concat!(file!(), ":", line!()), $($arg)*);
        }
    };
}

#[test]
fn test_trace_verbose() {
    #[allow(unused)]
    let local = "QWERTY";
    trace_verbose!("This is a test with value `{}`, and local {local}!", 123);
}
