use std::fmt;

use crate::validate::Interval;
use crate::variables::DataType;

/// Which derivative directives a method is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeOrder {
    Gradients,
    Hessians,
}

impl fmt::Display for DerivativeOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivativeOrder::Gradients => write!(f, "gradients"),
            DerivativeOrder::Hessians => write!(f, "hessians"),
        }
    }
}

/// Errors raised while building or serializing a deck.
///
/// All of these are configuration errors: they are reported at the point the
/// offending value is set (or at `Deck::get_deck` for cross-entity checks)
/// and never recovered internally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeckError {
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("duplicate {what} {key:?}")]
    DuplicateKey { what: &'static str, key: String },

    #[error("{key} must be type {expected}, got {found}")]
    TypeMismatch {
        key: String,
        expected: DataType,
        found: DataType,
    },

    #[error("{attribute} = {value} is outside {interval}")]
    OutOfRange {
        attribute: &'static str,
        value: String,
        interval: Interval,
    },

    #[error("{attribute} = {value:?} must be one of {allowed:?}")]
    InvalidEnumValue {
        attribute: &'static str,
        value: String,
        allowed: Vec<&'static str>,
    },

    #[error("{attribute} may only be used with {requires}")]
    MissingPrerequisite {
        attribute: &'static str,
        requires: String,
    },

    #[error("refinement of {given} samples breaks the doubling sequence (expected {expected})")]
    RefinementSequence { expected: u32, given: u32 },

    #[error("method {method:?} requires {derivative} but none are configured")]
    MissingDerivatives {
        method: String,
        derivative: DerivativeOrder,
    },
}

impl DeckError {
    pub(crate) fn prerequisite(attribute: &'static str, requires: impl Into<String>) -> Self {
        DeckError::MissingPrerequisite {
            attribute,
            requires: requires.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;
