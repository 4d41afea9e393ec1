use std::collections::HashMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    error::SyncError,
    gateway::{ApprovalsContract, SyncContext},
    intent::{Intent, IntentData, IntentId},
};

/// Intents in discovery order, indexed by id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Intent>", into = "Vec<Intent>")]
pub struct IntentCache {
    intents: Vec<Intent>,
    index: HashMap<IntentId, usize>,
}

impl IntentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, intent_id: IntentId) -> Option<&Intent> {
        self.index.get(&intent_id).map(|&pos| &self.intents[pos])
    }

    pub fn all(&self) -> &[Intent] {
        &self.intents
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Applies `transform` to the cached intent, or to freshly fetched data when the
    /// intent has not been seen yet, in which case the result is appended.
    ///
    /// The fetch happens before anything is written, so a failed fetch leaves the cache as it was.
    pub async fn upsert<C, F>(
        &mut self,
        intent_id: IntentId,
        context: &SyncContext<C>,
        transform: F,
    ) -> Result<&Intent, SyncError>
    where
        C: ApprovalsContract,
        F: FnOnce(IntentData) -> IntentData,
    {
        if let Some(&pos) = self.index.get(&intent_id) {
            let intent = &mut self.intents[pos];
            intent.data = transform(std::mem::take(&mut intent.data));
            return Ok(&*intent);
        }

        let data = context.fetch_intent(intent_id).await?;
        let pos = self.intents.len();
        self.intents.push(Intent::new(intent_id, transform(data)));
        self.index.insert(intent_id, pos);
        Ok(&self.intents[pos])
    }

    /// Intents submitted by `account`, in discovery order.
    pub fn submitted_by(&self, account: &Address) -> Vec<Intent> {
        self.intents
            .iter()
            .filter(|intent| intent.is_submitted_by(account))
            .cloned()
            .collect()
    }
}

impl From<Vec<Intent>> for IntentCache {
    /// Later duplicates of an id are dropped.
    fn from(intents: Vec<Intent>) -> Self {
        let mut cache = Self::new();
        for intent in intents {
            if cache.index.contains_key(&intent.intent_id) {
                continue;
            }
            cache.index.insert(intent.intent_id, cache.intents.len());
            cache.intents.push(intent);
        }
        cache
    }
}

impl From<IntentCache> for Vec<Intent> {
    fn from(cache: IntentCache) -> Self {
        cache.intents
    }
}
