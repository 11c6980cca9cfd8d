//! Structured error types shared across the selection crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`Kmu2Error`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code, namespaced by crate.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Dotted configuration path of the offending setting, e.g.
    /// `downstream.muv3.time_window`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Further key value pairs (offending values, file paths, line numbers).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with a code and message only.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Payload blaming the configuration setting at `field`.
    pub fn for_field(
        code: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::new(code, message)
        }
    }

    /// Adds a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets the remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the selection workspace.
///
/// Per-event selection never produces one of these: a failed cut is a
/// rejection, not an error. Errors only surface while loading or validating
/// configuration and while decoding event input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum Kmu2Error {
    /// Invalid selection or geometry configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Malformed event input.
    #[error("event error: {0}")]
    Event(ErrorInfo),
    /// Serialization, schema and file access errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "{field}: ")?;
        }
        write!(f, "{} [{}]", self.message, self.code)?;
        let mut context = self.context.iter();
        if let Some((key, value)) = context.next() {
            write!(f, " ({key}={value}")?;
            for (key, value) in context {
                write!(f, ", {key}={value}")?;
            }
            write!(f, ")")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "; hint: {hint}")?;
        }
        Ok(())
    }
}

impl Kmu2Error {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            Kmu2Error::Config(info) | Kmu2Error::Event(info) | Kmu2Error::Serde(info) => info,
        }
    }

    /// Configuration error blaming the setting at `field`.
    pub fn config(code: &str, field: &str, message: impl Into<String>) -> Self {
        Kmu2Error::Config(ErrorInfo::for_field(code, field, message))
    }

    /// Stable code of the underlying payload.
    pub fn code(&self) -> &str {
        &self.info().code
    }
}
