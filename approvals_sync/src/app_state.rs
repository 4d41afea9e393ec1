use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use approvals_state::{AppState, RawEvent, ViewCache};
use tokio::sync::{mpsc, watch};

use crate::{cfg::Cfg, eth_client::EthClient};

/// Latest folded state, tagged with the store revision it was taken at.
#[derive(Clone, Debug, Default)]
pub struct Published {
    pub revision: u64,
    pub state: Arc<AppState>,
    pub connected_account: Option<Address>,
}

#[derive(Clone)]
pub struct ServiceState {
    pub cfg: Arc<Cfg>,
    pub eth: EthClient,
    pub events: mpsc::Sender<RawEvent>,
    pub snapshots: watch::Receiver<Published>,
    pub views: Arc<Mutex<ViewCache>>,
}
