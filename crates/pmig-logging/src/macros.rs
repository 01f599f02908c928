//! ---
//! pmig_section: "03-persistence-logging"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Structured logging adapters and sinks."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
//! Level-specific logging macros that flatten a [`crate::LogContext`] into fields.

#[doc(hidden)]
#[macro_export]
macro_rules! __pmig_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            process = ctx.process.unwrap_or(""),
            host = ctx.host.unwrap_or(""),
            peer = ctx.peer.unwrap_or(""),
            step = ctx.step.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with process context.
#[macro_export]
macro_rules! pmig_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__pmig_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__pmig_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with process context.
#[macro_export]
macro_rules! pmig_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__pmig_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__pmig_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with process context.
#[macro_export]
macro_rules! pmig_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__pmig_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__pmig_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with process context.
#[macro_export]
macro_rules! pmig_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__pmig_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__pmig_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
