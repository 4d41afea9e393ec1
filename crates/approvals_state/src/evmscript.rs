//! Decoder for spec-1 EVM call scripts into a forwarding path.
//!
//! Layout: a 4-byte spec id `0x00000001`, then repeated
//! `address (20) | calldata length (u32 BE) | calldata`. Calls to `forward(bytes)`
//! carry a nested call script, which becomes the step's children.

use std::{collections::HashMap, str::FromStr};

use alloy_primitives::Address;
use alloy_sol_types::{sol, SolCall};
use thiserror::Error;

use crate::{
    error::ScriptError,
    forwarding_path::{ForwardingPath, ForwardingStep},
    intent::EMPTY_CALLSCRIPT,
};

const ADDRESS_LEN: usize = 20;
const LENGTH_LEN: usize = 4;
const MAX_FORWARDING_DEPTH: usize = 8;

sol! {
    /// Forwarder entry point. The argument is itself a call script.
    function forward(bytes evmScript);
}

/// Display label of a known app, from `address=name[:identifier]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnownApp {
    pub address: Address,
    pub name: String,
    pub identifier: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid known app `{0}`, expected address=name[:identifier]")]
pub struct KnownAppParseError(String);

impl FromStr for KnownApp {
    type Err = KnownAppParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KnownAppParseError(s.to_string());
        let (address, label) = s.split_once('=').ok_or_else(err)?;
        let address = address.trim().parse().map_err(|_| err())?;
        let (name, identifier) = match label.split_once(':') {
            Some((name, identifier)) => (name, Some(identifier.trim().to_string())),
            None => (label, None),
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(err());
        }
        Ok(Self {
            address,
            name: name.to_string(),
            identifier: identifier.filter(|i| !i.is_empty()),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct CallScriptDecoder {
    apps: HashMap<Address, KnownApp>,
}

impl CallScriptDecoder {
    pub fn new(apps: impl IntoIterator<Item = KnownApp>) -> Self {
        Self {
            apps: apps.into_iter().map(|app| (app.address, app)).collect(),
        }
    }

    pub fn decode(&self, script: &[u8]) -> Result<ForwardingPath, ScriptError> {
        self.decode_at(script, 0)
    }

    fn decode_at(&self, script: &[u8], depth: usize) -> Result<ForwardingPath, ScriptError> {
        if depth > MAX_FORWARDING_DEPTH {
            return Err(ScriptError::TooDeep(MAX_FORWARDING_DEPTH));
        }
        if script.is_empty() {
            return Ok(Vec::new());
        }
        let spec_id = script
            .get(..EMPTY_CALLSCRIPT.len())
            .ok_or(ScriptError::Truncated { offset: 0 })?;
        if spec_id != EMPTY_CALLSCRIPT {
            return Err(ScriptError::UnsupportedSpec(hex::encode(spec_id)));
        }

        let mut steps = Vec::new();
        let mut offset = EMPTY_CALLSCRIPT.len();
        while offset < script.len() {
            let header = script
                .get(offset..offset + ADDRESS_LEN + LENGTH_LEN)
                .ok_or(ScriptError::Truncated { offset })?;
            let to = Address::from_slice(&header[..ADDRESS_LEN]);
            let mut len = [0u8; LENGTH_LEN];
            len.copy_from_slice(&header[ADDRESS_LEN..]);
            let len = u32::from_be_bytes(len) as usize;

            let start = offset + ADDRESS_LEN + LENGTH_LEN;
            let calldata = start
                .checked_add(len)
                .and_then(|end| script.get(start..end))
                .ok_or(ScriptError::Truncated { offset: start })?;
            steps.push(self.describe_call(to, calldata, depth)?);
            offset = start + len;
        }
        Ok(steps)
    }

    fn describe_call(
        &self,
        to: Address,
        calldata: &[u8],
        depth: usize,
    ) -> Result<ForwardingStep, ScriptError> {
        let mut step = ForwardingStep {
            to: to.to_checksum(None),
            ..Default::default()
        };
        if let Some(app) = self.apps.get(&to) {
            step.name = Some(app.name.clone());
            step.identifier = app.identifier.clone();
        }

        match calldata.get(..4) {
            None => step.description = Some("Call without calldata".to_string()),
            Some(selector) if selector == forwardCall::SELECTOR => {
                let forward = forwardCall::abi_decode_raw(&calldata[4..])
                    .map_err(|_| ScriptError::InvalidForwardPayload)?;
                step.description = Some("Forward script".to_string());
                step.children = self.decode_at(&forward.evmScript, depth + 1)?;
            }
            Some(selector) => {
                step.description = Some(format!("Call 0x{}", hex::encode(selector)));
            }
        }
        Ok(step)
    }
}
