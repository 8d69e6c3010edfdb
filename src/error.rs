//! Core error type.
//!
//! The core never retries and never falls back to alternative physics: a
//! component either succeeds or raises one of these three kinds, with a
//! context descriptor naming the offending component.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    InsufficientSamples,
    ConfigurationInvalid,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed input in {component}: {message}")]
    MalformedInput { component: &'static str, message: String },

    #[error("insufficient samples in {component}: {message}")]
    InsufficientSamples { component: &'static str, message: String },

    #[error("invalid configuration in {component}: {message}")]
    ConfigurationInvalid { component: &'static str, message: String },
}

impl CoreError {
    pub fn malformed(component: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedInput { component, message: message.into() }
    }

    pub fn insufficient(component: &'static str, message: impl Into<String>) -> Self {
        Self::InsufficientSamples { component, message: message.into() }
    }

    pub fn config_invalid(component: &'static str, message: impl Into<String>) -> Self {
        Self::ConfigurationInvalid { component, message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput { .. } => ErrorKind::MalformedInput,
            Self::InsufficientSamples { .. } => ErrorKind::InsufficientSamples,
            Self::ConfigurationInvalid { .. } => ErrorKind::ConfigurationInvalid,
        }
    }

    pub fn component(&self) -> &'static str {
        match self {
            Self::MalformedInput { component, .. }
            | Self::InsufficientSamples { component, .. }
            | Self::ConfigurationInvalid { component, .. } => component,
        }
    }
}
