//! ---
//! pmig_section: "03-persistence-logging"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Structured logging adapters and sinks."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Structured logging helpers shared by hosts and the coordinator.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber writing to stderr.
///
/// Command line tools keep stdout for their structured output.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Process identifier associated with the log event.
    pub process: Option<&'a str>,
    /// Host the event happened on or was addressed to.
    pub host: Option<&'a str>,
    /// Counterpart host, e.g. the migration target.
    pub peer: Option<&'a str>,
    /// Protocol step (`pause`, `resume`, ...).
    pub step: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a process identifier.
    pub fn with_process(mut self, process: &'a str) -> Self {
        self.process = Some(process);
        self
    }

    /// Attach a host name.
    pub fn with_host(mut self, host: &'a str) -> Self {
        self.host = Some(host);
        self
    }

    /// Attach the counterpart host name.
    pub fn with_peer(mut self, peer: &'a str) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Attach a protocol step.
    pub fn with_step(mut self, step: &'a str) -> Self {
        self.step = Some(step);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation was refused or failed in an expected way.
    Rejected,
    /// The operation failed and may need operator attention.
    Fault,
}

impl SystemEventOutcome {
    /// Stable lowercase label emitted in the `outcome` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Rejected => "rejected",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized system event with an outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                event,
                outcome = outcome.as_str(),
                process = ctx.process.unwrap_or(""),
                host = ctx.host.unwrap_or(""),
                peer = ctx.peer.unwrap_or(""),
                step = ctx.step.unwrap_or(""),
                message = %message
            )
        };
    }
    match outcome {
        SystemEventOutcome::Success => emit!(Level::INFO),
        SystemEventOutcome::Rejected => emit!(Level::WARN),
        SystemEventOutcome::Fault => emit!(Level::ERROR),
    }
}
