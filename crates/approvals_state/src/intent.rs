use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

/// Chain-assigned intent counter. Never reused, never decreases.
pub type IntentId = u64;

/// Call script with no actions.
pub const EMPTY_CALLSCRIPT: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

pub fn is_empty_script(script: &[u8]) -> bool {
    script.is_empty() || script == EMPTY_CALLSCRIPT
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl IntentStatus {
    /// Maps the contract's `uint8` intent state.
    pub fn from_contract(state: u8) -> Option<Self> {
        match state {
            0 => Some(Self::Pending),
            1 => Some(Self::Approved),
            2 => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_decided(self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentData {
    #[serde(default)]
    pub status: IntentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderator: Option<Address>,
    #[serde(default)]
    pub script: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IntentData {
    /// Records the submitter. The submitter is set once and the status never moves backwards.
    pub fn submitted(mut self, submitter: Address) -> Self {
        if self.submitter.is_none() {
            self.submitter = Some(submitter);
        }
        self
    }

    /// Whether a transition to `status` would change or complete this record.
    ///
    /// A pending intent accepts any decision. A decided intent only accepts the same
    /// decision when the moderator is still unknown, which happens when the record was
    /// backfilled from the contract after it had already been decided.
    pub fn accepts(&self, status: IntentStatus) -> bool {
        match self.status {
            IntentStatus::Pending => true,
            current => current == status && self.moderator.is_none(),
        }
    }

    pub fn decided(mut self, status: IntentStatus, moderator: Address) -> Self {
        if self.accepts(status) {
            self.status = status;
            self.moderator = Some(moderator);
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub intent_id: IntentId,
    pub data: IntentData,
}

impl Intent {
    pub fn new(intent_id: IntentId, data: IntentData) -> Self {
        Self { intent_id, data }
    }

    pub fn is_pending(&self) -> bool {
        self.data.status == IntentStatus::Pending
    }

    /// Whether approving this intent executes anything.
    pub fn is_action(&self) -> bool {
        !is_empty_script(&self.data.script)
    }

    pub fn is_submitted_by(&self, account: &Address) -> bool {
        self.data.submitter.as_ref() == Some(account)
    }
}
