use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
};
use anyhow::{Context, Result};
use approvals_state::{
    evmscript::CallScriptDecoder, ApprovalsContract, FetchError, ForwardingPath, IntentId,
    IntentStatus, OnchainIntent, ScriptError,
};

use tracing::info;

use crate::{cfg::Cfg, events::Approvals};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntentAction {
    Approve,
    Reject,
}

impl IntentAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

#[derive(Clone)]
pub struct EthClient {
    pub provider: DynProvider,
    /// Same node, with the moderator wallet attached.
    pub signer_provider: Option<DynProvider>,
    pub contract: Address,
    pub decoder: CallScriptDecoder,
}

impl EthClient {
    /// Dials the node, plus a second signing connection when a moderator key is configured.
    pub async fn connect(cfg: &Cfg) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .connect(&cfg.eth_rpc_url)
            .await
            .context("failed to connect provider")?
            .erased();

        let signer_provider = match cfg.moderator_private_key.clone() {
            Some(signer) => {
                info!(moderator = %signer.address(), "moderator key loaded");
                let provider = ProviderBuilder::new()
                    .wallet(signer)
                    .connect(&cfg.eth_rpc_url)
                    .await
                    .context("failed to connect signing provider")?;
                Some(provider.erased())
            }
            None => None,
        };

        Ok(Self {
            provider,
            signer_provider,
            contract: cfg.approvals_contract_address,
            decoder: CallScriptDecoder::new(cfg.known_apps.iter().cloned()),
        })
    }

    pub fn can_submit(&self) -> bool {
        self.signer_provider.is_some()
    }

    /// Sends the transaction and returns once the node has accepted it; inclusion is not awaited.
    pub async fn submit(&self, action: IntentAction, intent_id: IntentId) -> Result<TxHash> {
        let provider = self
            .signer_provider
            .clone()
            .context("no moderator key configured")?;
        let approvals = Approvals::new(self.contract, provider);
        let id = U256::from(intent_id);
        let pending = match action {
            IntentAction::Approve => approvals.approve(id).send().await,
            IntentAction::Reject => approvals.reject(id).send().await,
        }
        .with_context(|| format!("sending {} for intent {}", action.as_str(), intent_id))?;
        Ok(*pending.tx_hash())
    }
}

impl ApprovalsContract for EthClient {
    async fn get_intent(&self, intent_id: IntentId) -> Result<OnchainIntent, FetchError> {
        let approvals = Approvals::new(self.contract, self.provider.clone());
        let intent = approvals
            .getIntent(U256::from(intent_id))
            .call()
            .await
            .map_err(|err| FetchError::Upstream(err.to_string()))?;
        let status = IntentStatus::from_contract(intent.state).ok_or_else(|| {
            FetchError::Upstream(format!("unknown intent state {}", intent.state))
        })?;
        Ok(OnchainIntent {
            status,
            script: intent.script,
        })
    }

    async fn describe_script(&self, script: &[u8]) -> Result<ForwardingPath, ScriptError> {
        self.decoder.decode(script)
    }

    async fn can_forward(&self, account: Address, script: &[u8]) -> Result<bool, FetchError> {
        let approvals = Approvals::new(self.contract, self.provider.clone());
        approvals
            .canForward(account, Bytes::copy_from_slice(script))
            .call()
            .await
            .map_err(|err| FetchError::Upstream(err.to_string()))
    }
}
