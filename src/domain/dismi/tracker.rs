use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::dismi::model::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    NullPointer,
    ObjectIsNot(ActionKind),
    NoDecomposer,
    NoDirectionality,
    ConnectionPointNotFound,
    ConnectionPointNotUnique,
    ConnectionPointHasNoEndpoints,
    NoCommonEndpointType,
    InvalidConstraint,
    InvalidSelector,
    NoOptionalParameter,
    ServiceNotFound,
    IntentNotFound,
    SubmissionFailed,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorType::ObjectIsNot(kind) => write!(f, "OBJECTISNOT{}", kind.to_string().to_uppercase()),
            ErrorType::NullPointer => f.write_str("NULLPOINTER"),
            ErrorType::NoDecomposer => f.write_str("NODECOMPOSER"),
            ErrorType::NoDirectionality => f.write_str("NODIRECTIONALITY"),
            ErrorType::ConnectionPointNotFound => f.write_str("CONNECTIONPOINTNOTFOUND"),
            ErrorType::ConnectionPointNotUnique => f.write_str("CONNECTIONPOINTNOTUNIQUE"),
            ErrorType::ConnectionPointHasNoEndpoints => f.write_str("CONNECTIONPOINTHASNOENDPOINTS"),
            ErrorType::NoCommonEndpointType => f.write_str("NOCOMMONENDPOINTTYPE"),
            ErrorType::InvalidConstraint => f.write_str("INVALIDCONSTRAINT"),
            ErrorType::InvalidSelector => f.write_str("INVALIDSELECTOR"),
            ErrorType::NoOptionalParameter => f.write_str("NOOPTIONALPARAMETER"),
            ErrorType::ServiceNotFound => f.write_str("SERVICENOTFOUND"),
            ErrorType::IntentNotFound => f.write_str("INTENTNOTFOUND"),
            ErrorType::SubmissionFailed => f.write_str("SUBMISSIONFAILED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub error_type: ErrorType,
    /// Component that raised the issue.
    pub source: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {} ({}): {}", self.severity, self.error_type, self.source, self.message)
    }
}

/// Accumulates validation and resolution issues for one request. Issues never
/// abort processing by themselves; callers check `is_valid` at stage
/// boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    issues: Vec<Issue>,
    valid: bool,
}

impl Default for Tracker {
    fn default() -> Self {
        Self { issues: Vec::new(), valid: true }
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, source: &str, severity: Severity, error_type: ErrorType, message: impl Into<String>) {
        self.issues.push(Issue { severity, error_type, source: source.to_string(), message: message.into() });
    }

    pub fn set_invalid(&mut self) {
        self.valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn has_issue(&self, error_type: ErrorType) -> bool {
        self.issues.iter().any(|i| i.error_type == error_type)
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Takes over the issues and validity of `other`.
    pub fn merge(&mut self, other: Tracker) {
        self.valid &= other.valid;
        self.issues.extend(other.issues);
    }
}
