//! Search aggregation use case - multi-keyword paginated queries

use std::sync::Arc;

use crate::model::Item;
use crate::ports::{PostSearch, ResultType, SearchError, SearchRequest};

/// Merged results of one run's searches
#[derive(Debug, Clone, Default)]
pub struct AggregateOutcome {
    /// All pages of all keywords, concatenated in API-delivered order
    pub items: Vec<Item>,
    /// Keywords whose search failed and was skipped
    pub failed_keywords: usize,
}

/// Issues paginated queries per keyword and merges the result pages
pub struct SearchAggregator<S>
where
    S: PostSearch + ?Sized,
{
    source: Arc<S>,
    page_size: u32,
}

impl<S> SearchAggregator<S>
where
    S: PostSearch + ?Sized,
{
    pub fn new(source: Arc<S>, page_size: u32) -> Self {
        Self { source, page_size }
    }

    /// Fetch every page of results for one keyword
    ///
    /// Follows the continuation token until no further page remains; pages
    /// are concatenated in API-delivered order, not globally sorted.
    pub async fn search_one(
        &self,
        keyword: &str,
        since_id: &str,
    ) -> Result<Vec<Item>, SearchError> {
        let request = SearchRequest {
            keyword: keyword.to_string(),
            since_id: since_id.to_string(),
            page_size: self.page_size,
            result_type: ResultType::Recent,
        };

        let mut page = self.source.search(&request).await?;
        let mut items = std::mem::take(&mut page.items);

        while let Some(token) = page.next_page {
            page = self.source.fetch_next(&token).await?;
            items.append(&mut page.items);
        }

        Ok(items)
    }

    /// Search every keyword independently and concatenate the results
    ///
    /// One keyword failing does not abort the others; the failure is logged
    /// and counted. Cross-keyword duplicates are left in place for the
    /// filter policy to discard.
    pub async fn search_many(&self, keywords: &[String], since_id: &str) -> AggregateOutcome {
        let mut outcome = AggregateOutcome::default();

        for keyword in keywords {
            match self.search_one(keyword, since_id).await {
                Ok(items) => {
                    tracing::debug!(keyword = %keyword, count = items.len(), "Search finished");
                    outcome.items.extend(items);
                }
                Err(error) => {
                    tracing::warn!(keyword = %keyword, error = %error, "Keyword search failed, continuing");
                    outcome.failed_keywords += 1;
                }
            }
        }

        outcome
    }
}
