use std::future::Future;

use alloy_primitives::{Address, Bytes};
use tracing::{debug, warn};

use crate::{
    error::{FetchError, ScriptError, SyncError},
    forwarding_path::{describe_forwarding_path, ForwardingPath},
    intent::{is_empty_script, IntentData, IntentId, IntentStatus},
};

/// Shown in place of a description when the intent script cannot be decoded.
pub const SCRIPT_DESCRIPTION_FALLBACK: &str = "Unable to describe intent script";

/// What `getIntent` returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnchainIntent {
    pub status: IntentStatus,
    pub script: Bytes,
}

/// Read side of the Approvals contract, as needed by the fold.
pub trait ApprovalsContract: Send + Sync {
    fn get_intent(
        &self,
        intent_id: IntentId,
    ) -> impl Future<Output = Result<OnchainIntent, FetchError>> + Send;

    fn describe_script(
        &self,
        script: &[u8],
    ) -> impl Future<Output = Result<ForwardingPath, ScriptError>> + Send;

    /// `canForward(account, script)`: whether `account` may submit `script` as an intent.
    fn can_forward(
        &self,
        account: Address,
        script: &[u8],
    ) -> impl Future<Output = Result<bool, FetchError>> + Send;
}

/// Whether the connected account may submit new intents. No account, or a failed
/// check, means it may not.
pub async fn can_submit<C: ApprovalsContract>(contract: &C, account: Option<Address>) -> bool {
    let Some(account) = account else {
        return false;
    };
    match contract.can_forward(account, &[]).await {
        Ok(allowed) => allowed,
        Err(err) => {
            warn!(%account, error = %err, "could not check submit permission");
            false
        }
    }
}

/// Per-session handle threaded through the fold. Owns the contract client.
pub struct SyncContext<C> {
    contract: C,
}

impl<C: ApprovalsContract> SyncContext<C> {
    pub fn new(contract: C) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    /// Fetches canonical data for an intent missing from the cache.
    pub async fn fetch_intent(&self, intent_id: IntentId) -> Result<IntentData, SyncError> {
        debug!(intent_id, "fetching intent missing from cache");
        let OnchainIntent { status, script } = self
            .contract
            .get_intent(intent_id)
            .await
            .map_err(|source| SyncError::DataUnavailable { intent_id, source })?;
        let description = self.describe(intent_id, &script).await;
        Ok(IntentData {
            status,
            script,
            description,
            ..Default::default()
        })
    }

    async fn describe(&self, intent_id: IntentId, script: &[u8]) -> Option<String> {
        if is_empty_script(script) {
            return None;
        }
        match self.contract.describe_script(script).await {
            Ok(path) if path.is_empty() => None,
            Ok(path) => Some(describe_forwarding_path(&path)),
            Err(err) => {
                warn!(intent_id, error = %err, "could not describe intent script");
                Some(SCRIPT_DESCRIPTION_FALLBACK.to_string())
            }
        }
    }
}
