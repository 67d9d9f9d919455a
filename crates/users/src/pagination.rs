use crate::error::Result;
use crate::model::User;
use crate::search::UserSearch;
use crate::service::UserService;
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Offset-paginated source where a page shorter than requested is the last one.
#[async_trait]
pub trait Paginator<T>: Sync {
    async fn fetch_page(&self, start_at: u32, max_results: u32) -> Result<Vec<T>>;

    async fn fetch_all(&self, max_results: u32) -> Result<Vec<T>>
    where
        T: Send,
    {
        let max_results = max_results.max(1);
        let mut all_items = Vec::new();
        let mut start_at = 0;

        loop {
            debug!(start_at, max_results, "Fetching page");
            let page = self.fetch_page(start_at, max_results).await?;
            let item_count = page.len();
            all_items.extend(page);

            match next_offset(start_at, item_count, max_results) {
                Some(next) => start_at = next,
                None => {
                    debug!(total_items = all_items.len(), "Finished pagination");
                    break;
                }
            }
        }

        Ok(all_items)
    }

    fn stream<'a>(
        &'a self,
        max_results: u32,
    ) -> Pin<Box<dyn Stream<Item = Result<Vec<T>>> + Send + 'a>>
    where
        T: Send + 'a,
    {
        let max_results = max_results.max(1);
        Box::pin(async_stream::stream! {
            let mut start_at = 0;

            loop {
                debug!(start_at, max_results, "Fetching page in stream");
                match self.fetch_page(start_at, max_results).await {
                    Ok(page) => {
                        let item_count = page.len();
                        if item_count > 0 {
                            yield Ok(page);
                        }

                        match next_offset(start_at, item_count, max_results) {
                            Some(next) => start_at = next,
                            None => break,
                        }
                    }
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        })
    }
}

/// Offset of the page after one of `page_len` items fetched at `start_at`,
/// or `None` when that page was the last one or the offset would overflow.
fn next_offset(start_at: u32, page_len: usize, max_results: u32) -> Option<u32> {
    if page_len < max_results as usize {
        return None;
    }
    start_at.checked_add(max_results)
}

/// Drains `paginator`, stopping early once `limit` items are collected.
pub async fn collect_pages<T, P: Paginator<T>>(
    paginator: &P,
    max_results: u32,
    limit: Option<usize>,
) -> Result<Vec<T>>
where
    T: Send,
{
    let mut stream = paginator.stream(max_results);
    let mut all_items = Vec::new();

    while let Some(result) = stream.next().await {
        all_items.extend(result?);

        if let Some(limit) = limit {
            if all_items.len() >= limit {
                all_items.truncate(limit);
                break;
            }
        }
    }

    Ok(all_items)
}

/// Pages through user search results for one property.
///
/// `startAt` and `maxResults` set on the base search are overridden per page.
pub struct UserSearchPager<'a> {
    service: &'a UserService,
    ctx: CancellationToken,
    property: String,
    search: UserSearch,
}

impl<'a> UserSearchPager<'a> {
    pub fn new(service: &'a UserService, property: impl Into<String>, search: UserSearch) -> Self {
        Self {
            service,
            ctx: CancellationToken::new(),
            property: property.into(),
            search,
        }
    }

    pub fn with_context(mut self, ctx: CancellationToken) -> Self {
        self.ctx = ctx;
        self
    }
}

#[async_trait]
impl Paginator<User> for UserSearchPager<'_> {
    async fn fetch_page(&self, start_at: u32, max_results: u32) -> Result<Vec<User>> {
        let search = self
            .search
            .clone()
            .start_at(start_at)
            .max_results(max_results);
        self.service
            .find_with_context(&self.ctx, &self.property, &search)
            .await
    }
}
