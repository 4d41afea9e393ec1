use std::{fmt::Debug, future::Future, time::Duration};

use alloy::{
    primitives::{Address, B256},
    providers::{DynProvider, Provider},
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
};
use anyhow::{Context, Result};
use approvals_state::RawEvent;
use serde::Serialize;
use tokio::{sync::mpsc::Sender, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    app_state::ServiceState,
    backoff::Backoff,
    eth_client::EthClient,
    events::{IntentApproved, IntentRejected, IntentSubmitted},
};

/// Dials the node and blocks until it answers. A failed dial and a failed request are
/// both only logged and retried.
pub async fn wait_for_upstream<F, Fut>(mut dial: F, mut backoff: Backoff) -> EthClient
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<EthClient>>,
{
    loop {
        let attempt = async {
            let eth = dial().await?;
            let chain_id = eth.provider.get_chain_id().await.context("getting chain id")?;
            Ok::<_, anyhow::Error>((eth, chain_id))
        };
        match attempt.await {
            Ok((eth, chain_id)) => {
                info!(chain_id, "upstream node reachable");
                return eth;
            }
            Err(err) => {
                let delay = backoff.next_delay();
                warn!(?delay, "upstream node unavailable; retrying: {:#}", err);
                sleep(delay).await;
            }
        }
    }
}

/// Backfills from the deployment block, then tails new blocks. Every contract log becomes
/// a [`RawEvent`] sent to the fold task, bracketed by the sync lifecycle events.
pub async fn indexer_loop(state: ServiceState, events: Sender<RawEvent>) -> Result<()> {
    info!(contract = %state.eth.contract, "indexer loop started");

    let mut backoff = Backoff::from_cfg(&state.cfg);
    let poll_interval = Duration::from_secs(state.cfg.poll_secs);
    let mut next_block = state.cfg.deployment_block;
    let mut backfilled = false;

    events.send(RawEvent::sync_started()).await.context("fold task gone")?;
    loop {
        match indexer_tick(&state, &mut next_block, &events).await {
            Ok(()) => {
                backoff.reset();
                if !backfilled {
                    backfilled = true;
                    info!(next_block, "backfill complete");
                    events.send(RawEvent::sync_ended()).await.context("fold task gone")?;
                }
                sleep(poll_interval).await;
            }
            Err(err) => {
                let delay = backoff.next_delay();
                warn!("indexer tick failed; backing off {:?}: {:#}", delay, err);
                sleep(delay).await;
            }
        }
    }
}

/// Forwards logs from `next_block` up to the finalized head, advancing `next_block` per range.
pub async fn indexer_tick(
    state: &ServiceState,
    next_block: &mut u64,
    events: &Sender<RawEvent>,
) -> Result<()> {
    let head = state.eth.provider.get_block_number().await.context("getting head")?;
    let finalized = head.saturating_sub(state.cfg.confirmations);
    if *next_block > finalized {
        // nothing new finalized
        return Ok(());
    }

    // Bounded ranges so eth_getLogs doesn't blow up on large spans.
    let range = state.cfg.max_block_range.max(1);
    while *next_block <= finalized {
        let to = next_block.saturating_add(range - 1).min(finalized);
        let mut logs = fetch_logs(&state.eth.provider, state.eth.contract, *next_block, to).await?;
        logs.sort_by_key(|l| {
            (
                l.block_number.unwrap_or_default(),
                l.log_index.unwrap_or_default(),
            )
        });
        debug!(from = *next_block, to, logs = logs.len(), "fetched range");

        for log in &logs {
            if let Some(raw) = to_raw_event(log)? {
                events.send(raw).await.context("fold task gone")?;
            }
        }
        *next_block = to + 1;
    }
    Ok(())
}

pub async fn fetch_logs(provider: &DynProvider, contract: Address, from: u64, to: u64) -> Result<Vec<Log>> {
    let topics: Vec<B256> = vec![
        IntentSubmitted::SIGNATURE_HASH,
        IntentApproved::SIGNATURE_HASH,
        IntentRejected::SIGNATURE_HASH,
    ];
    let filter = Filter::new()
        .address(contract)
        .event_signature(topics)
        .from_block(from)
        .to_block(to);

    provider.get_logs(&filter).await.context("getting logs")
}

/// Decodes a contract log into the subscription's `{event, returnValues}` shape.
pub fn to_raw_event(log: &Log) -> Result<Option<RawEvent>> {
    let Some(topic0) = log.topic0().copied() else {
        return Ok(None);
    };
    if topic0 == IntentSubmitted::SIGNATURE_HASH {
        encode::<IntentSubmitted>(log).map(Some)
    } else if topic0 == IntentApproved::SIGNATURE_HASH {
        encode::<IntentApproved>(log).map(Some)
    } else if topic0 == IntentRejected::SIGNATURE_HASH {
        encode::<IntentRejected>(log).map(Some)
    } else {
        Ok(None)
    }
}

fn encode<Event>(log: &Log) -> Result<RawEvent>
where
    Event: Debug + SolEvent + Serialize,
{
    let typed = Event::decode_log(&log.inner).context("decoding log")?;
    let name = Event::SIGNATURE.split('(').next().unwrap_or(Event::SIGNATURE);
    let return_values = serde_json::to_value(&typed.data).context("encoding event")?;
    debug!(block = log.block_number, "decoded {:?}", typed.data);
    Ok(RawEvent::new(name, return_values))
}
