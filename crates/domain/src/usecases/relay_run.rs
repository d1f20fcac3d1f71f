//! Relay run use case - one load/search/filter/publish/save pass

use std::sync::Arc;

use crate::model::{HistoryRecord, RunReport};
use crate::policy::{DelayPolicy, FilterPolicy};
use crate::ports::{Clock, HistoryStore, PostSearch, PublishError, RelayPublisher, Sleeper};
use crate::transform;
use crate::usecases::aggregate::SearchAggregator;

/// Configuration for one relay run
#[derive(Debug, Clone)]
pub struct RelayRunConfig {
    /// Keywords to track
    pub keywords: Vec<String>,
    /// The bot's own author identifier, used to discard its own posts
    pub bot_user_id: String,
    /// Page size requested from the search collaborator
    pub page_size: u32,
    /// Character budget for relays
    pub relay_budget: usize,
    /// Dry run mode (don't actually publish)
    pub dry_run: bool,
    /// Pause between successful publishes
    pub delay: DelayPolicy,
}

impl Default for RelayRunConfig {
    fn default() -> Self {
        Self {
            keywords: vec![],
            bot_user_id: String::new(),
            page_size: 100,
            relay_budget: transform::RELAY_BUDGET,
            dry_run: true,
            delay: DelayPolicy::default(),
        }
    }
}

/// Errors that terminate a run
///
/// By the time either variant surfaces, history for the items already
/// relayed has been saved.
#[derive(Debug, thiserror::Error)]
pub enum RelayRunError {
    #[error("Publish failed: {0}")]
    Publish(#[source] PublishError),
    #[error("History error: {0}")]
    History(#[from] crate::ports::HistoryError),
}

/// Relay run orchestrator
///
/// Strictly sequential: no concurrent searches, no concurrent publishes,
/// items relayed oldest first.
#[derive(Clone)]
pub struct RelayRun<S, P, H, C, Sl>
where
    S: PostSearch + ?Sized,
    P: RelayPublisher + ?Sized,
    H: HistoryStore + ?Sized,
    C: Clock + ?Sized,
    Sl: Sleeper + ?Sized,
{
    search: Arc<S>,
    publisher: Arc<P>,
    history_store: Arc<H>,
    clock: Arc<C>,
    sleeper: Arc<Sl>,
    config: RelayRunConfig,
}

impl<S, P, H, C, Sl> RelayRun<S, P, H, C, Sl>
where
    S: PostSearch + ?Sized,
    P: RelayPublisher + ?Sized,
    H: HistoryStore + ?Sized,
    C: Clock + ?Sized,
    Sl: Sleeper + ?Sized,
{
    pub fn new(
        search: Arc<S>,
        publisher: Arc<P>,
        history_store: Arc<H>,
        clock: Arc<C>,
        sleeper: Arc<Sl>,
        config: RelayRunConfig,
    ) -> Self {
        Self {
            search,
            publisher,
            history_store,
            clock,
            sleeper,
            config,
        }
    }

    /// Execute one pass of the pipeline
    ///
    /// History is saved exactly once at the end, including when the publish
    /// loop aborts on an unrecoverable error, so items relayed before the
    /// failure stay remembered.
    pub async fn run_once(&self) -> Result<RunReport, RelayRunError> {
        let mut history = match self.history_store.load().await {
            Ok(history) => history,
            Err(error) => {
                tracing::warn!(error = %error, "Could not load history, starting from an empty record");
                HistoryRecord::default()
            }
        };

        tracing::info!(
            since_id = %history.since_id,
            remembered = history.len(),
            last_update = %history.last_update,
            "Loaded history"
        );

        let since_id = history.since_id.clone();
        history.touch(self.clock.now());

        let aggregator = SearchAggregator::new(Arc::clone(&self.search), self.config.page_size);
        let outcome = aggregator
            .search_many(&self.config.keywords, &since_id)
            .await;

        let policy = FilterPolicy::new(self.config.bot_user_id.as_str());
        let fetched = outcome.items.len();
        let partition = policy.partition(outcome.items, &history);

        tracing::info!(
            fetched = fetched,
            fresh = partition.fresh(),
            self_authored = partition.self_authored,
            duplicates = partition.duplicates,
            failed_keywords = outcome.failed_keywords,
            "Classified search results"
        );

        let mut report = RunReport {
            fetched,
            failed_keywords: outcome.failed_keywords,
            fresh: partition.fresh(),
            self_authored: partition.self_authored,
            duplicates: partition.duplicates,
            relayed: 0,
            skipped: 0,
        };

        let mut fatal: Option<PublishError> = None;

        for item in partition.accepted {
            let text = transform::format_relay(&item, self.config.relay_budget);

            if self.config.dry_run {
                tracing::info!(item_id = %item.id, text = %text, "[DRY RUN] Would relay");
                report.relayed += 1;
                continue;
            }

            match self.publisher.publish(&text).await {
                Ok(published) => {
                    tracing::info!(
                        item_id = %item.id,
                        relay_id = %published.id,
                        created_at = %published.created_at,
                        "Relayed"
                    );
                    // The original fetched item is remembered, not the relay
                    history.remember(item);
                    report.relayed += 1;

                    let pause = self.config.delay.pick();
                    tracing::debug!(seconds = pause.as_secs(), "Sleeping between publishes");
                    self.sleeper.sleep(pause).await;
                }
                Err(error) if error.is_recoverable() => {
                    tracing::warn!(item_id = %item.id, error = %error, "Relay rejected, skipping");
                    report.skipped += 1;
                }
                Err(error) => {
                    tracing::error!(
                        item_id = %item.id,
                        error = %error,
                        "Relay failed, aborting remaining publishes"
                    );
                    fatal = Some(error);
                    break;
                }
            }
        }

        self.history_store.save(&history).await?;

        if let Some(error) = fatal {
            return Err(RelayRunError::Publish(error));
        }

        tracing::info!(
            relayed = report.relayed,
            skipped = report.skipped,
            "Run complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, PublishedPost};
    use crate::ports::{HistoryError, PageToken, SearchError, SearchPage, SearchRequest};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn item(id: &str, author_id: &str, created_at: &str) -> Item {
        Item {
            id: id.to_string(),
            author_id: author_id.to_string(),
            author_handle: "someone".to_string(),
            text: format!("@someone post {id}"),
            created_at: created_at.to_string(),
        }
    }

    const BOT: &str = "42";

    // Fake implementations for testing

    struct FakeSearch {
        items: Vec<Item>,
        requests: Mutex<Vec<SearchRequest>>,
    }

    impl FakeSearch {
        fn with_items(items: Vec<Item>) -> Self {
            Self {
                items,
                requests: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl PostSearch for FakeSearch {
        async fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(SearchPage {
                items: self.items.clone(),
                next_page: None,
            })
        }

        async fn fetch_next(&self, _token: &PageToken) -> Result<SearchPage, SearchError> {
            Ok(SearchPage::default())
        }
    }

    /// Publishes successfully unless an error is scripted for the call
    struct FakePublisher {
        scripted: Mutex<VecDeque<Option<PublishError>>>,
        published: Mutex<Vec<String>>,
    }

    impl FakePublisher {
        fn succeeding() -> Self {
            Self {
                scripted: Mutex::new(VecDeque::new()),
                published: Mutex::new(vec![]),
            }
        }

        fn with_outcomes(outcomes: Vec<Option<PublishError>>) -> Self {
            Self {
                scripted: Mutex::new(outcomes.into()),
                published: Mutex::new(vec![]),
            }
        }

        fn published(&self) -> Vec<String> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RelayPublisher for FakePublisher {
        async fn publish(&self, text: &str) -> Result<PublishedPost, PublishError> {
            if let Some(Some(error)) = self.scripted.lock().unwrap().pop_front() {
                return Err(error);
            }

            let mut published = self.published.lock().unwrap();
            published.push(text.to_string());
            Ok(PublishedPost {
                id: format!("relay_{}", published.len()),
                created_at: "Mon, 05 Dec 2011 20:00:00 +0000".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct FakeHistoryStore {
        record: Mutex<Option<HistoryRecord>>,
        fail_load: bool,
    }

    impl FakeHistoryStore {
        fn failing_load() -> Self {
            Self {
                record: Mutex::new(None),
                fail_load: true,
            }
        }

        fn saved(&self) -> Option<HistoryRecord> {
            self.record.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HistoryStore for FakeHistoryStore {
        async fn load(&self) -> Result<HistoryRecord, HistoryError> {
            if self.fail_load {
                return Err(HistoryError::Malformed("scripted corruption".to_string()));
            }
            Ok(self.record.lock().unwrap().clone().unwrap_or_default())
        }

        async fn save(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
            let mut saved = record.clone();
            saved.since_id = saved.compute_since_id();
            *self.record.lock().unwrap() = Some(saved);
            Ok(())
        }
    }

    struct FakeClock;

    impl Clock for FakeClock {
        fn now(&self) -> OffsetDateTime {
            datetime!(2011-12-05 21:00:00 UTC)
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        pauses: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.pauses.lock().unwrap().push(duration);
        }
    }

    fn config() -> RelayRunConfig {
        RelayRunConfig {
            keywords: vec!["civic".to_string()],
            bot_user_id: BOT.to_string(),
            dry_run: false,
            ..Default::default()
        }
    }

    fn run_with(
        search: Arc<FakeSearch>,
        publisher: Arc<FakePublisher>,
        store: Arc<FakeHistoryStore>,
        config: RelayRunConfig,
    ) -> RelayRun<FakeSearch, FakePublisher, FakeHistoryStore, FakeClock, RecordingSleeper> {
        RelayRun::new(
            search,
            publisher,
            store,
            Arc::new(FakeClock),
            Arc::new(RecordingSleeper::default()),
            config,
        )
    }

    #[tokio::test]
    async fn relays_accepted_items_oldest_first() {
        let search = Arc::new(FakeSearch::with_items(vec![
            item("3", "7", "Mon, 05 Dec 2011 19:30:00 +0000"),
            item("1", "7", "Mon, 05 Dec 2011 17:30:00 +0000"),
            item("2", "7", "Mon, 05 Dec 2011 18:30:00 +0000"),
        ]));
        let publisher = Arc::new(FakePublisher::succeeding());
        let store = Arc::new(FakeHistoryStore::default());

        let report = run_with(search, Arc::clone(&publisher), Arc::clone(&store), config())
            .run_once()
            .await
            .unwrap();

        assert_eq!(report.relayed, 3);
        assert_eq!(
            publisher.published(),
            vec![
                "RT @someone post 1",
                "RT @someone post 2",
                "RT @someone post 3",
            ]
        );

        let saved = store.saved().unwrap();
        assert_eq!(saved.len(), 3);
        assert_eq!(saved.since_id, "3");
        assert!(!saved.last_update.is_empty());
    }

    #[tokio::test]
    async fn second_run_relays_nothing() {
        let search = Arc::new(FakeSearch::with_items(vec![
            item("1", "7", "Mon, 05 Dec 2011 17:30:00 +0000"),
            item("2", "7", "Mon, 05 Dec 2011 18:30:00 +0000"),
        ]));
        let store = Arc::new(FakeHistoryStore::default());

        let first = run_with(
            Arc::clone(&search),
            Arc::new(FakePublisher::succeeding()),
            Arc::clone(&store),
            config(),
        );
        assert_eq!(first.run_once().await.unwrap().relayed, 2);

        let second_publisher = Arc::new(FakePublisher::succeeding());
        let second = run_with(
            Arc::clone(&search),
            Arc::clone(&second_publisher),
            Arc::clone(&store),
            config(),
        );
        let report = second.run_once().await.unwrap();

        assert_eq!(report.relayed, 0);
        assert_eq!(report.duplicates, 2);
        assert!(second_publisher.published().is_empty());

        // The second search starts from the advanced cursor
        let requests = search.requests.lock().unwrap();
        assert_eq!(requests[0].since_id, "1");
        assert_eq!(requests[1].since_id, "2");
    }

    #[tokio::test]
    async fn self_authored_items_are_never_relayed() {
        let search = Arc::new(FakeSearch::with_items(vec![
            item("1", BOT, "Mon, 05 Dec 2011 17:30:00 +0000"),
            item("2", "7", "Mon, 05 Dec 2011 18:30:00 +0000"),
        ]));
        let publisher = Arc::new(FakePublisher::succeeding());
        let store = Arc::new(FakeHistoryStore::default());

        let report = run_with(search, Arc::clone(&publisher), store, config())
            .run_once()
            .await
            .unwrap();

        assert_eq!(report.self_authored, 1);
        assert_eq!(report.relayed, 1);
        assert_eq!(publisher.published(), vec!["RT @someone post 2"]);
    }

    #[tokio::test]
    async fn recoverable_rejection_skips_and_continues() {
        let search = Arc::new(FakeSearch::with_items(vec![
            item("1", "7", "Mon, 05 Dec 2011 17:30:00 +0000"),
            item("2", "7", "Mon, 05 Dec 2011 18:30:00 +0000"),
        ]));
        let publisher = Arc::new(FakePublisher::with_outcomes(vec![
            Some(PublishError::DuplicateContent),
            None,
        ]));
        let store = Arc::new(FakeHistoryStore::default());

        let report = run_with(search, Arc::clone(&publisher), Arc::clone(&store), config())
            .run_once()
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.relayed, 1);

        // Only the successfully relayed item is remembered
        let saved = store.saved().unwrap();
        assert!(!saved.contains("1"));
        assert!(saved.contains("2"));
    }

    #[tokio::test]
    async fn fatal_error_aborts_but_saves_earlier_items() {
        let search = Arc::new(FakeSearch::with_items(vec![
            item("1", "7", "Mon, 05 Dec 2011 17:30:00 +0000"),
            item("2", "7", "Mon, 05 Dec 2011 18:30:00 +0000"),
            item("3", "7", "Mon, 05 Dec 2011 19:30:00 +0000"),
        ]));
        let publisher = Arc::new(FakePublisher::with_outcomes(vec![
            None,
            Some(PublishError::Api("boom".to_string())),
        ]));
        let store = Arc::new(FakeHistoryStore::default());

        let result = run_with(search, Arc::clone(&publisher), Arc::clone(&store), config())
            .run_once()
            .await;

        assert!(matches!(result, Err(RelayRunError::Publish(_))));

        let saved = store.saved().unwrap();
        assert!(saved.contains("1"));
        assert!(!saved.contains("2"));
        assert!(!saved.contains("3"));
        assert_eq!(saved.since_id, "1");
        assert_eq!(publisher.published(), vec!["RT @someone post 1"]);
    }

    #[tokio::test]
    async fn failed_history_load_starts_fresh() {
        let search = Arc::new(FakeSearch::with_items(vec![item(
            "1",
            "7",
            "Mon, 05 Dec 2011 17:30:00 +0000",
        )]));
        let publisher = Arc::new(FakePublisher::succeeding());
        let store = Arc::new(FakeHistoryStore::failing_load());

        let report = run_with(
            Arc::clone(&search),
            publisher,
            Arc::clone(&store),
            config(),
        )
        .run_once()
        .await
        .unwrap();

        assert_eq!(report.relayed, 1);
        assert_eq!(store.saved().unwrap().since_id, "1");
        assert_eq!(search.requests.lock().unwrap()[0].since_id, "1");
    }

    #[tokio::test]
    async fn dry_run_publishes_and_remembers_nothing() {
        let search = Arc::new(FakeSearch::with_items(vec![item(
            "1",
            "7",
            "Mon, 05 Dec 2011 17:30:00 +0000",
        )]));
        let publisher = Arc::new(FakePublisher::succeeding());
        let store = Arc::new(FakeHistoryStore::default());

        let report = run_with(
            search,
            Arc::clone(&publisher),
            Arc::clone(&store),
            RelayRunConfig {
                dry_run: true,
                ..config()
            },
        )
        .run_once()
        .await
        .unwrap();

        assert_eq!(report.relayed, 1);
        assert!(publisher.published().is_empty());
        assert!(store.saved().unwrap().is_empty());
    }
}
