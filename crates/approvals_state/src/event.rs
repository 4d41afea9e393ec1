use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{trace, warn};

use crate::{error::EventError, intent::IntentId};

pub const SYNC_STATUS_SYNCING: &str = "SYNC_STATUS_SYNCING";
pub const SYNC_STATUS_SYNCED: &str = "SYNC_STATUS_SYNCED";
pub const ACCOUNTS_TRIGGER: &str = "ACCOUNTS_TRIGGER";
pub const INTENT_SUBMITTED: &str = "IntentSubmitted";
pub const INTENT_APPROVED: &str = "IntentApproved";
pub const INTENT_REJECTED: &str = "IntentRejected";

/// An event record as delivered by the subscription, before classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub event: String,
    #[serde(default)]
    pub return_values: Value,
}

impl RawEvent {
    pub fn new(event: impl Into<String>, return_values: Value) -> Self {
        Self {
            event: event.into(),
            return_values,
        }
    }

    pub fn sync_started() -> Self {
        Self::new(SYNC_STATUS_SYNCING, Value::Null)
    }

    pub fn sync_ended() -> Self {
        Self::new(SYNC_STATUS_SYNCED, Value::Null)
    }

    pub fn account_changed(account: Option<Address>) -> Self {
        Self::new(ACCOUNTS_TRIGGER, json!({ "account": account }))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApprovalsEvent {
    SyncStarted,
    SyncEnded,
    /// `None` when no account is connected.
    AccountChanged { account: Option<Address> },
    IntentSubmitted { intent_id: IntentId, submitter: Address },
    IntentApproved { intent_id: IntentId, moderator: Address },
    IntentRejected { intent_id: IntentId, moderator: Address },
    Noop,
}

impl TryFrom<&RawEvent> for ApprovalsEvent {
    type Error = EventError;

    fn try_from(raw: &RawEvent) -> Result<Self, Self::Error> {
        let payload = Payload {
            kind: &raw.event,
            values: &raw.return_values,
        };
        let event = match raw.event.as_str() {
            SYNC_STATUS_SYNCING => Self::SyncStarted,
            SYNC_STATUS_SYNCED => Self::SyncEnded,
            ACCOUNTS_TRIGGER => Self::AccountChanged {
                account: payload.optional_address("account")?,
            },
            INTENT_SUBMITTED => Self::IntentSubmitted {
                intent_id: payload.intent_id()?,
                submitter: payload.address("submitter")?,
            },
            INTENT_APPROVED => Self::IntentApproved {
                intent_id: payload.intent_id()?,
                moderator: payload.address("moderator")?,
            },
            INTENT_REJECTED => Self::IntentRejected {
                intent_id: payload.intent_id()?,
                moderator: payload.address("moderator")?,
            },
            _ => Self::Noop,
        };
        Ok(event)
    }
}

/// Classifies a raw record. Unknown kinds and unreadable payloads become [`ApprovalsEvent::Noop`].
pub fn normalize(raw: &RawEvent) -> ApprovalsEvent {
    match ApprovalsEvent::try_from(raw) {
        Ok(ApprovalsEvent::Noop) => {
            trace!(kind = %raw.event, "ignoring unknown event kind");
            ApprovalsEvent::Noop
        }
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "dropping malformed event payload");
            ApprovalsEvent::Noop
        }
    }
}

struct Payload<'a> {
    kind: &'a str,
    values: &'a Value,
}

impl Payload<'_> {
    fn get(&self, field: &'static str) -> Result<&Value, EventError> {
        match self.values.get(field) {
            Some(Value::Null) | None => Err(EventError::MissingField {
                kind: self.kind.to_string(),
                field,
            }),
            Some(value) => Ok(value),
        }
    }

    fn invalid(&self, field: &'static str, reason: impl ToString) -> EventError {
        EventError::InvalidField {
            kind: self.kind.to_string(),
            field,
            reason: reason.to_string(),
        }
    }

    /// Accepts a JSON number, a decimal string or a `0x` hex string (how `uint256` serializes).
    fn intent_id(&self) -> Result<IntentId, EventError> {
        const FIELD: &str = "intentId";
        match self.get(FIELD)? {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| self.invalid(FIELD, format!("{n} is not a u64"))),
            Value::String(s) => parse_intent_id(s).map_err(|reason| self.invalid(FIELD, reason)),
            other => Err(self.invalid(FIELD, format!("unexpected value {other}"))),
        }
    }

    fn address(&self, field: &'static str) -> Result<Address, EventError> {
        match self.get(field)? {
            Value::String(s) => s.parse().map_err(|err| self.invalid(field, err)),
            other => Err(self.invalid(field, format!("unexpected value {other}"))),
        }
    }

    fn optional_address(&self, field: &'static str) -> Result<Option<Address>, EventError> {
        match self.values.get(field) {
            Some(Value::Null) | None => Ok(None),
            Some(_) => self.address(field).map(Some),
        }
    }
}

fn parse_intent_id(s: &str) -> Result<IntentId, String> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => {
            let digits = hex.trim_start_matches('0');
            if digits.is_empty() {
                return if hex.is_empty() {
                    Err("empty hex value".to_string())
                } else {
                    Ok(0)
                };
            }
            IntentId::from_str_radix(digits, 16).map_err(|err| err.to_string())
        }
        None => s.parse::<IntentId>().map_err(|err| err.to_string()),
    }
}
