use std::sync::Arc;

use approvals_state::{normalize, ApprovalsContract, RawEvent, Store};
use tokio::{
    sync::{mpsc::Receiver, watch::Sender},
    time::sleep,
};
use tracing::{info, warn};

use crate::{app_state::Published, backoff::Backoff};

/// Folds events one at a time in arrival order and publishes each resulting state.
///
/// A fold that fails is retried with backoff before the next event is taken, so no
/// transition is ever dropped and two events can never race on the same missing intent.
pub async fn fold_loop<C: ApprovalsContract>(
    mut store: Store<C>,
    mut events: Receiver<RawEvent>,
    published: Sender<Published>,
    backoff: Backoff,
) {
    store.init(None);
    publish(&store, &published);

    while let Some(raw) = events.recv().await {
        let event = normalize(&raw);
        let mut backoff = backoff.clone();
        while let Err(err) = store.fold(&event).await {
            let delay = backoff.next_delay();
            warn!(error = %err, ?delay, "fold failed; retrying event {}", raw.event);
            sleep(delay).await;
        }
        publish(&store, &published);
    }
    info!("event stream closed; fold loop stopped");
}

fn publish<C: ApprovalsContract>(store: &Store<C>, published: &Sender<Published>) {
    published.send_replace(Published {
        revision: store.revision(),
        state: Arc::new(store.snapshot()),
        connected_account: store.state().and_then(|state| state.connected_account),
    });
}
