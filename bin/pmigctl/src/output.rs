//! ---
//! pmig_section: "05-networking-external-interfaces"
//! pmig_subsection: "binary"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Coordinator CLI driving a pmig fleet."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
//! JSON rendering of command results.
use std::process::ExitCode;

use anyhow::Result;
use pmig_lifecycle::ErrorCode;
use serde::Serialize;
use serde_json::{json, Value};

/// Result of one CLI command: a JSON document and whether it succeeded.
#[derive(Debug)]
pub(crate) struct Output {
    pub(crate) body: Value,
    pub(crate) success: bool,
}

impl Output {
    pub(crate) fn success<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self {
                body,
                success: true,
            },
            Err(err) => Self::failure(ErrorCode::Internal, err.to_string(), Value::Null),
        }
    }

    /// Failure document; `details` object fields are merged next to the code.
    pub(crate) fn failure(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        let mut body = json!({
            "error": code,
            "message": message.into(),
        });
        if let (Some(target), Value::Object(extra)) = (body.as_object_mut(), details) {
            target.extend(extra);
        }
        Self {
            body,
            success: false,
        }
    }

    pub(crate) fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(&self.body)?);
        Ok(())
    }

    pub(crate) fn exit_code(&self) -> ExitCode {
        if self.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_merges_details() {
        let output = Output::failure(
            ErrorCode::UnknownHost,
            "unknown host 'server-z'",
            json!({"host": "server-z"}),
        );
        assert!(!output.success);
        assert_eq!(output.body["error"], json!("unknown_host"));
        assert_eq!(output.body["host"], json!("server-z"));
    }
}
