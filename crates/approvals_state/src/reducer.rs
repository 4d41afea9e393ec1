use std::collections::BTreeMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    cache::IntentCache,
    error::SyncError,
    event::{normalize, ApprovalsEvent, RawEvent},
    gateway::{ApprovalsContract, SyncContext},
    intent::{Intent, IntentId, IntentStatus},
};

pub type AccountIntents = BTreeMap<Address, Vec<Intent>>;

/// Cached state as handed over by an upstream source. Any field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub is_syncing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_account: Option<Address>,
    #[serde(default)]
    pub intents: Option<Vec<Intent>>,
    #[serde(default)]
    pub connected_account_intents: Option<AccountIntents>,
}

/// The state the presentation layer reads. Always fully populated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub ready: bool,
    pub is_syncing: bool,
    pub intents: Vec<Intent>,
    pub connected_account_intents: AccountIntents,
}

impl AppState {
    /// Normalizes a snapshot. No snapshot yet means not ready.
    pub fn from_snapshot(snapshot: Option<&Snapshot>) -> Self {
        let Some(snapshot) = snapshot else {
            return Self::default();
        };
        Self {
            ready: true,
            is_syncing: snapshot.is_syncing,
            intents: snapshot.intents.clone().unwrap_or_default(),
            connected_account_intents: snapshot.connected_account_intents.clone().unwrap_or_default(),
        }
    }
}

impl From<&SyncState> for AppState {
    fn from(state: &SyncState) -> Self {
        Self {
            ready: true,
            is_syncing: state.is_syncing,
            intents: state.intents.all().to_vec(),
            connected_account_intents: state.connected_account_intents.clone(),
        }
    }
}

/// Live folding state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncState {
    pub is_syncing: bool,
    pub connected_account: Option<Address>,
    pub intents: IntentCache,
    pub connected_account_intents: AccountIntents,
}

impl SyncState {
    /// The cached account mapping is not trusted; it is rebuilt from `intents`.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut state = Self {
            is_syncing: snapshot.is_syncing,
            connected_account: snapshot.connected_account,
            intents: IntentCache::from(snapshot.intents.unwrap_or_default()),
            connected_account_intents: AccountIntents::new(),
        };
        state.refresh_connected_account_intents();
        state
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            is_syncing: self.is_syncing,
            connected_account: self.connected_account,
            intents: Some(self.intents.all().to_vec()),
            connected_account_intents: Some(self.connected_account_intents.clone()),
        }
    }

    /// Folds one event. Returns whether anything changed.
    pub async fn apply<C: ApprovalsContract>(
        &mut self,
        event: &ApprovalsEvent,
        context: &SyncContext<C>,
    ) -> Result<bool, SyncError> {
        match *event {
            ApprovalsEvent::SyncStarted => self.is_syncing = true,
            ApprovalsEvent::SyncEnded => self.is_syncing = false,
            ApprovalsEvent::AccountChanged { account } => {
                self.connected_account = account;
                self.refresh_connected_account_intents();
            }
            ApprovalsEvent::IntentSubmitted { intent_id, submitter } => {
                self.intents
                    .upsert(intent_id, context, |data| data.submitted(submitter))
                    .await?;
                self.refresh_connected_account_intents();
            }
            ApprovalsEvent::IntentApproved { intent_id, moderator } => {
                return self
                    .decide(intent_id, IntentStatus::Approved, moderator, context)
                    .await;
            }
            ApprovalsEvent::IntentRejected { intent_id, moderator } => {
                return self
                    .decide(intent_id, IntentStatus::Rejected, moderator, context)
                    .await;
            }
            ApprovalsEvent::Noop => return Ok(false),
        }
        Ok(true)
    }

    async fn decide<C: ApprovalsContract>(
        &mut self,
        intent_id: IntentId,
        status: IntentStatus,
        moderator: Address,
        context: &SyncContext<C>,
    ) -> Result<bool, SyncError> {
        if let Some(intent) = self.intents.find(intent_id) {
            if !intent.data.accepts(status) {
                debug!(
                    intent_id,
                    current = ?intent.data.status,
                    attempted = ?status,
                    "ignoring transition of an already decided intent"
                );
                return Ok(false);
            }
        }
        self.intents
            .upsert(intent_id, context, |data| data.decided(status, moderator))
            .await?;
        self.refresh_connected_account_intents();
        Ok(true)
    }

    /// Keyed by the connected account only; no entry when it has submitted nothing.
    fn refresh_connected_account_intents(&mut self) {
        self.connected_account_intents.clear();
        if let Some(account) = self.connected_account {
            let own = self.intents.submitted_by(&account);
            if !own.is_empty() {
                self.connected_account_intents.insert(account, own);
            }
        }
    }
}

/// Owns the state of one sync session and serializes folds against it.
pub struct Store<C> {
    state: Option<SyncState>,
    context: SyncContext<C>,
    revision: u64,
}

impl<C: ApprovalsContract> Store<C> {
    pub fn new(context: SyncContext<C>) -> Self {
        Self {
            state: None,
            context,
            revision: 0,
        }
    }

    /// Seeds the state from a cached snapshot, or from scratch. Backfill starts immediately.
    pub fn init(&mut self, cached: Option<Snapshot>) {
        let mut state = cached.map(SyncState::from_snapshot).unwrap_or_default();
        state.is_syncing = true;
        info!(cached_intents = state.intents.len(), "sync session initialized");
        self.state = Some(state);
        self.revision += 1;
    }

    /// Drops everything and starts a full resync.
    pub fn reset(&mut self) {
        self.init(None);
    }

    /// Events arriving before [`Store::init`] are ignored. On error nothing is written.
    pub async fn fold(&mut self, event: &ApprovalsEvent) -> Result<(), SyncError> {
        let Some(state) = self.state.as_mut() else {
            debug!(?event, "no snapshot yet, ignoring event");
            return Ok(());
        };
        if state.apply(event, &self.context).await? {
            self.revision += 1;
        }
        Ok(())
    }

    pub async fn fold_raw(&mut self, raw: &RawEvent) -> Result<(), SyncError> {
        self.fold(&normalize(raw)).await
    }

    /// The latest normalized state (`getState`).
    pub fn snapshot(&self) -> AppState {
        self.state.as_ref().map(AppState::from).unwrap_or_default()
    }

    pub fn state(&self) -> Option<&SyncState> {
        self.state.as_ref()
    }

    pub fn context(&self) -> &SyncContext<C> {
        &self.context
    }

    /// Bumped on every change; used to memoize derived views.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{intent::IntentData, testing::FakeContract};
    use alloy_primitives::address;

    const S1: Address = address!("0x1111111111111111111111111111111111111111");
    const S2: Address = address!("0x2222222222222222222222222222222222222222");
    const MODERATOR: Address = address!("0x3333333333333333333333333333333333333333");

    fn store() -> Store<FakeContract> {
        Store::new(SyncContext::new(FakeContract::default()))
    }

    fn submitted(intent_id: IntentId, submitter: Address) -> ApprovalsEvent {
        ApprovalsEvent::IntentSubmitted { intent_id, submitter }
    }

    #[tokio::test]
    async fn test_absent_state_ignores_events() {
        let mut store = store();
        store.fold(&ApprovalsEvent::SyncStarted).await.unwrap();
        let first = store.snapshot();
        store.fold(&ApprovalsEvent::SyncStarted).await.unwrap();
        assert_eq!(store.snapshot(), first);
        assert_eq!(first, AppState::default());
        assert!(!first.ready);
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn test_init_marks_ready_and_syncing() {
        let mut store = store();
        store.init(None);
        let state = store.snapshot();
        assert!(state.ready);
        assert!(state.is_syncing);
        assert!(state.intents.is_empty());
        assert!(state.connected_account_intents.is_empty());
    }

    #[tokio::test]
    async fn test_init_from_partial_snapshot() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{"intents":[{"intentId":4,"data":{"status":"approved"}}]}"#,
        )
        .unwrap();
        let mut store = store();
        store.init(Some(snapshot));
        let state = store.snapshot();
        assert!(state.ready);
        assert_eq!(state.intents.len(), 1);
        assert!(state.connected_account_intents.is_empty());
    }

    #[tokio::test]
    async fn test_init_rebuilds_stale_account_mapping() {
        let stale = Intent {
            intent_id: 9,
            data: IntentData {
                submitter: Some(S2),
                ..Default::default()
            },
        };
        let own = Intent {
            intent_id: 4,
            data: IntentData {
                submitter: Some(S1),
                ..Default::default()
            },
        };
        let snapshot = Snapshot {
            connected_account: Some(S1),
            intents: Some(vec![own.clone()]),
            connected_account_intents: Some(AccountIntents::from([(S2, vec![stale])])),
            ..Default::default()
        };
        let mut store = store();
        store.init(Some(snapshot));

        let state = store.snapshot();
        assert_eq!(
            state.connected_account_intents,
            AccountIntents::from([(S1, vec![own])])
        );
    }

    #[tokio::test]
    async fn test_snapshot_matches_normalized_round_trip() {
        let mut store = store();
        store.init(None);
        store.context().contract().insert_action(1, IntentStatus::Pending);
        store
            .fold(&ApprovalsEvent::AccountChanged { account: Some(S1) })
            .await
            .unwrap();
        store.fold(&submitted(1, S1)).await.unwrap();

        let cached = store.state().unwrap().to_snapshot();
        assert_eq!(store.snapshot(), AppState::from_snapshot(Some(&cached)));
        assert_eq!(store.snapshot().connected_account_intents[&S1].len(), 1);
    }

    #[tokio::test]
    async fn test_sync_flag_toggles() {
        let mut store = store();
        store.init(None);
        store.context().contract().insert_empty(1, IntentStatus::Pending);

        store.fold(&ApprovalsEvent::SyncStarted).await.unwrap();
        assert!(store.snapshot().is_syncing);
        store.fold(&submitted(1, S1)).await.unwrap();
        assert!(store.snapshot().is_syncing);
        store.fold(&ApprovalsEvent::SyncEnded).await.unwrap();
        assert!(!store.snapshot().is_syncing);
    }

    #[tokio::test]
    async fn test_submitted_then_approved() {
        let mut store = store();
        store.init(None);
        store.context().contract().insert_action(0, IntentStatus::Pending);

        store.fold(&submitted(0, S1)).await.unwrap();
        store
            .fold(&ApprovalsEvent::IntentApproved {
                intent_id: 0,
                moderator: MODERATOR,
            })
            .await
            .unwrap();

        let state = store.snapshot();
        assert_eq!(state.intents.len(), 1);
        let data = &state.intents[0].data;
        assert_eq!(data.status, IntentStatus::Approved);
        assert_eq!(data.submitter, Some(S1));
        assert_eq!(data.moderator, Some(MODERATOR));
        assert!(data.description.is_some());
        assert_eq!(store.context().contract().fetches(), 1);
    }

    #[tokio::test]
    async fn test_conflicting_transition_is_noop() {
        let mut store = store();
        store.init(None);
        store.context().contract().insert_empty(2, IntentStatus::Pending);
        store.fold(&submitted(2, S1)).await.unwrap();
        store
            .fold(&ApprovalsEvent::IntentRejected {
                intent_id: 2,
                moderator: MODERATOR,
            })
            .await
            .unwrap();
        let revision = store.revision();

        store
            .fold(&ApprovalsEvent::IntentApproved {
                intent_id: 2,
                moderator: S2,
            })
            .await
            .unwrap();

        let data = &store.snapshot().intents[0].data;
        assert_eq!(data.status, IntentStatus::Rejected);
        assert_eq!(data.moderator, Some(MODERATOR));
        assert_eq!(store.revision(), revision);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_all_or_nothing() {
        let mut store = store();
        store.init(None);
        store.context().contract().insert_empty(1, IntentStatus::Pending);
        store.fold(&submitted(1, S1)).await.unwrap();
        store.context().contract().set_offline(true);
        let before = store.snapshot();
        let revision = store.revision();

        let err = store
            .fold(&ApprovalsEvent::IntentApproved {
                intent_id: 8,
                moderator: MODERATOR,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::DataUnavailable { intent_id: 8, .. }));
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.revision(), revision);
    }

    #[tokio::test]
    async fn test_account_filter() {
        let mut store = store();
        store.init(None);
        for id in 1..=3 {
            store.context().contract().insert_empty(id, IntentStatus::Pending);
        }
        store
            .fold(&ApprovalsEvent::AccountChanged { account: Some(S1) })
            .await
            .unwrap();
        assert!(store.snapshot().connected_account_intents.is_empty());

        for (id, submitter) in [(1, S1), (2, S2), (3, S1)] {
            store.fold(&submitted(id, submitter)).await.unwrap();
        }
        let state = store.snapshot();
        let own: Vec<_> = state.connected_account_intents[&S1]
            .iter()
            .map(|i| i.intent_id)
            .collect();
        assert_eq!(own, [1, 3]);
        assert!(!state.connected_account_intents.contains_key(&S2));

        store
            .fold(&ApprovalsEvent::AccountChanged { account: None })
            .await
            .unwrap();
        assert!(store.snapshot().connected_account_intents.is_empty());
    }

    #[tokio::test]
    async fn test_noop_does_not_bump_revision() {
        let mut store = store();
        store.init(None);
        let revision = store.revision();
        store.fold(&ApprovalsEvent::Noop).await.unwrap();
        assert_eq!(store.revision(), revision);
    }

    #[tokio::test]
    async fn test_reset_rebuilds_from_scratch() {
        let mut store = store();
        store.init(None);
        store.context().contract().insert_empty(1, IntentStatus::Pending);
        store.fold(&submitted(1, S1)).await.unwrap();
        store.fold(&ApprovalsEvent::SyncEnded).await.unwrap();

        store.reset();
        let state = store.snapshot();
        assert!(state.intents.is_empty());
        assert!(state.is_syncing);
    }
}
