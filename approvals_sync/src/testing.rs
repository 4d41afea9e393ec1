//! Service state wired to a mocked node, for handler and indexer tests.

use std::sync::{Arc, Mutex};

use alloy::{
    providers::{Provider, ProviderBuilder},
    transports::mock::Asserter,
};
use approvals_state::{evmscript::CallScriptDecoder, RawEvent, ViewCache};
use clap::Parser;
use tokio::sync::{mpsc, watch};

use crate::{
    app_state::{Published, ServiceState},
    cfg::Cfg,
    eth_client::EthClient,
};

pub(crate) struct MockedService {
    pub state: ServiceState,
    /// Queue of node responses, consumed in request order.
    pub asserter: Asserter,
    pub events: mpsc::Receiver<RawEvent>,
    pub published: watch::Sender<Published>,
}

pub(crate) fn mocked_service(extra_args: &[&str]) -> MockedService {
    let mut args = vec![
        "approvals_sync",
        "--eth-rpc-url",
        "http://127.0.0.1:8545",
        "--approvals-contract-address",
        "0x00000000000000000000000000000000000000aa",
    ];
    args.extend_from_slice(extra_args);
    let cfg = Cfg::parse_from(args);

    let asserter = Asserter::new();
    let provider = ProviderBuilder::new()
        .connect_mocked_client(asserter.clone())
        .erased();
    let eth = EthClient {
        provider,
        signer_provider: None,
        contract: cfg.approvals_contract_address,
        decoder: CallScriptDecoder::default(),
    };

    let (events_tx, events) = mpsc::channel(64);
    let (published, snapshots) = watch::channel(Published::default());
    let state = ServiceState {
        cfg: Arc::new(cfg),
        eth,
        events: events_tx,
        snapshots,
        views: Arc::new(Mutex::new(ViewCache::default())),
    };
    MockedService {
        state,
        asserter,
        events,
        published,
    }
}
