use thiserror::Error;

use crate::intent::IntentId;

/// Failure of a single fold step. The cache is left untouched when this is returned.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("data for intent {intent_id} is unavailable")]
    DataUnavailable {
        intent_id: IntentId,
        #[source]
        source: FetchError,
    },
}

/// Failure reported by the on-chain collaborator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("intent {0} does not exist")]
    NotFound(IntentId),
    #[error("upstream call failed: {0}")]
    Upstream(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("call script truncated at byte {offset}")]
    Truncated { offset: usize },
    #[error("unsupported call script spec id 0x{0}")]
    UnsupportedSpec(String),
    #[error("malformed forward(bytes) payload")]
    InvalidForwardPayload,
    #[error("forwarding depth exceeds {0}")]
    TooDeep(usize),
}

/// A known event kind whose payload could not be read.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("{kind}: missing field `{field}`")]
    MissingField { kind: String, field: &'static str },
    #[error("{kind}: invalid field `{field}`: {reason}")]
    InvalidField {
        kind: String,
        field: &'static str,
        reason: String,
    },
}
