//! Filtering, ordering, and publish-delay policy

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;
use time::OffsetDateTime;

use crate::model::{HistoryRecord, Item, Partition};

/// Partitions aggregated search results into relayable and discarded items
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    bot_user_id: String,
}

impl FilterPolicy {
    pub fn new(bot_user_id: impl Into<String>) -> Self {
        Self {
            bot_user_id: bot_user_id.into(),
        }
    }

    /// Classify each item as self-authored, duplicate, or accepted
    ///
    /// Keywords may overlap, so the same item can appear more than once in
    /// one batch; repeats within the batch count as duplicates. Accepted
    /// items come back sorted ascending by origination time, which fixes the
    /// publish order for the run.
    pub fn partition(&self, items: Vec<Item>, history: &HistoryRecord) -> Partition {
        let mut accepted = Vec::new();
        let mut self_authored = 0;
        let mut duplicates = 0;
        let mut seen_this_batch: HashSet<String> = HashSet::new();

        for item in items {
            if item.author_id == self.bot_user_id {
                self_authored += 1;
            } else if history.contains(&item.id) || !seen_this_batch.insert(item.id.clone()) {
                duplicates += 1;
            } else {
                accepted.push(item);
            }
        }

        accepted.sort_by_key(|item| {
            item.created_instant()
                .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        });

        Partition {
            accepted,
            self_authored,
            duplicates,
        }
    }
}

/// Randomized pause between successful publishes
///
/// Picks `base × n` with `n` drawn uniformly from `[1, jitter]`.
#[derive(Debug, Clone)]
pub struct DelayPolicy {
    base: Duration,
    jitter: u32,
}

impl DelayPolicy {
    pub fn new(base: Duration, jitter: u32) -> Self {
        Self {
            base,
            jitter: jitter.max(1),
        }
    }

    pub fn pick(&self) -> Duration {
        let factor = rand::rng().random_range(1..=self.jitter);
        self.base * factor
    }
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), 6)
    }
}
