//! Error types for catalog construction and program generation.

use alloc::string::String;

/// Errors raised while building a [`Target`](crate::target::Target).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("syscall {call} references unknown resource {resource}")]
    UnknownResource { call: String, resource: String },

    #[error("duplicate syscall name: {name}")]
    DuplicateSyscall { name: String },

    #[error("duplicate resource name: {name}")]
    DuplicateResource { name: String },

    #[error("syscall {call} argument {arg} has inverted bounds")]
    InvalidBounds { call: String, arg: String },

    #[error("resource {name} has no special values")]
    NoResourceValues { name: String },
}

/// Structural or resource-consistency violation found in a program.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("call #{call}: {reason}")]
pub struct ValidationError {
    /// Index of the offending call.
    pub call: usize,
    /// Human readable description.
    pub reason: String,
}

impl ValidationError {
    pub fn new(call: usize, reason: impl Into<String>) -> Self {
        Self {
            call,
            reason: reason.into(),
        }
    }
}

/// Faults raised by the generator.
///
/// Every variant means a collaborator or the generator itself broke an
/// invariant. Callers should treat them as fatal rather than retry.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("synthesizer returned no calls for {call}")]
    EmptySynthesis { call: String },

    #[error("no call is enabled for generation")]
    NoEnabledCalls,

    #[error("selector returned a call that may not be generated: {call}")]
    DisallowedCall { call: String },

    #[error("generated program failed validation: {0}")]
    Validation(#[from] ValidationError),
}
