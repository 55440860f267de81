// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Error kinds produced by the persistent reservation codec.
//!
//! Orchestration code (config, handlers, the binary) wraps these in
//! `anyhow::Error`; the codec itself keeps them typed so callers can match on
//! the kind.

use thiserror::Error;

/// Failure of an encode, decode or input-parsing step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrError {
    /// A caller supplied a field outside its wire range (service action >
    /// 0x1f, length > 0xffff, hex byte > 0xff, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport-id text did not form a well-formed token stream.
    /// `line` and `pos` are 1-based.
    #[error("malformed input at line {line}, pos {pos}: {reason}")]
    MalformedInput {
        line: usize,
        pos: usize,
        reason: String,
    },

    /// A response buffer violates a structural precondition of the
    /// requested service action.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A declared length exceeds what the buffer actually holds. Decoding
    /// recovers by clamping; only strict callers see this as an error.
    #[error("declared length {declared} exceeds available {available} bytes")]
    Truncated { declared: usize, available: usize },
}

pub type Result<T, E = PrError> = std::result::Result<T, E>;

impl PrError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        PrError::InvalidArgument(msg.into())
    }

    pub(crate) fn malformed_response(msg: impl Into<String>) -> Self {
        PrError::MalformedResponse(msg.into())
    }
}
