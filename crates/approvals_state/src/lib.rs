//! Client-side state for the Approvals app: a cache of intents kept in sync
//! with the contract's event log, plus the view data derived from it.

pub mod cache;
pub mod error;
pub mod event;
pub mod evmscript;
pub mod forwarding_path;
pub mod gateway;
pub mod intent;
pub mod reducer;
pub mod view;

pub use cache::IntentCache;
pub use error::{EventError, FetchError, ScriptError, SyncError};
pub use event::{normalize, ApprovalsEvent, RawEvent};
pub use forwarding_path::{describe_forwarding_path, ForwardingPath, ForwardingStep};
pub use gateway::{can_submit, ApprovalsContract, OnchainIntent, SyncContext};
pub use intent::{Intent, IntentData, IntentId, IntentStatus, EMPTY_CALLSCRIPT};
pub use reducer::{AppState, Snapshot, Store, SyncState};
pub use view::{derive_view, AppView, UiSelection, ViewCache};

#[cfg(test)]
pub(crate) mod testing;
