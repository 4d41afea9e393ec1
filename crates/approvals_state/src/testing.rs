//! In-memory contract used by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use alloy_primitives::{Address, Bytes};

use crate::{
    error::{FetchError, ScriptError},
    evmscript::{tests::encode_call_script, CallScriptDecoder},
    forwarding_path::ForwardingPath,
    gateway::{ApprovalsContract, OnchainIntent},
    intent::{IntentId, IntentStatus, EMPTY_CALLSCRIPT},
};

#[derive(Default)]
pub(crate) struct FakeContract {
    intents: Mutex<HashMap<IntentId, OnchainIntent>>,
    forwarders: Mutex<HashSet<Address>>,
    offline: Mutex<bool>,
    fetches: AtomicUsize,
    decoder: CallScriptDecoder,
}

impl FakeContract {
    pub(crate) fn with_decoder(decoder: CallScriptDecoder) -> Self {
        Self {
            decoder,
            ..Default::default()
        }
    }

    pub(crate) fn insert_raw(&self, intent_id: IntentId, status: IntentStatus, script: Vec<u8>) {
        self.intents.lock().unwrap().insert(
            intent_id,
            OnchainIntent {
                status,
                script: Bytes::from(script),
            },
        );
    }

    pub(crate) fn insert_empty(&self, intent_id: IntentId, status: IntentStatus) {
        self.insert_raw(intent_id, status, EMPTY_CALLSCRIPT.to_vec());
    }

    pub(crate) fn insert_action(&self, intent_id: IntentId, status: IntentStatus) {
        let script = encode_call_script(&[(Address::repeat_byte(0xcc), vec![0x12, 0x34, 0x56, 0x78])]);
        self.insert_raw(intent_id, status, script);
    }

    pub(crate) fn allow_forwarder(&self, account: Address) {
        self.forwarders.lock().unwrap().insert(account);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ApprovalsContract for FakeContract {
    async fn get_intent(&self, intent_id: IntentId) -> Result<OnchainIntent, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if *self.offline.lock().unwrap() {
            return Err(FetchError::Upstream("connection refused".to_string()));
        }
        self.intents
            .lock()
            .unwrap()
            .get(&intent_id)
            .cloned()
            .ok_or(FetchError::NotFound(intent_id))
    }

    async fn describe_script(&self, script: &[u8]) -> Result<ForwardingPath, ScriptError> {
        self.decoder.decode(script)
    }

    async fn can_forward(&self, account: Address, _script: &[u8]) -> Result<bool, FetchError> {
        if *self.offline.lock().unwrap() {
            return Err(FetchError::Upstream("connection refused".to_string()));
        }
        Ok(self.forwarders.lock().unwrap().contains(&account))
    }
}
