//! Page-number pagination shared by every feed.
//!
//! Out-of-range requests never fail: a missing or malformed number means
//! the first page, anything past the end means the last one.

use sea_orm::{ConnectionTrait, DbErr, PaginatorTrait, Select};

use crate::entity::prelude::{Post, PostModel};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// The raw `?page=` value as it came in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<String>,
}

impl PageRequest {
    pub fn number(n: u64) -> Self {
        Self {
            page: Some(n.to_string()),
        }
    }

    /// 1-based page number before clamping against the page count.
    pub fn requested(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(1)
    }

    /// Resolves against a known page count. An empty result still has page 1.
    pub fn resolve(&self, num_pages: u64) -> u64 {
        self.requested().min(num_pages.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            number: 1,
            num_pages: 1,
            count: 0,
            has_next: false,
            has_previous: false,
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        let items = self.items.into_iter().map(f).collect();
        Page {
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next,
            has_previous: self.has_previous,
            items,
        }
    }

    /// Same page metadata, different contents.
    pub fn with_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next,
            has_previous: self.has_previous,
            items,
        }
    }
}

/// Runs a post query through a SeaORM paginator and returns the requested page.
pub async fn fetch_page<C>(
    db: &C,
    select: Select<Post>,
    page_size: u64,
    request: &PageRequest,
) -> Result<Page<PostModel>, DbErr>
where
    C: ConnectionTrait,
{
    let paginator = select.paginate(db, page_size.max(1));
    let totals = paginator.num_items_and_pages().await?;
    let num_pages = totals.number_of_pages.max(1);
    let number = request.resolve(num_pages);

    let items = paginator.fetch_page(number - 1).await?;

    Ok(Page {
        number,
        num_pages,
        count: totals.number_of_items,
        has_next: number < num_pages,
        has_previous: number > 1,
        items,
    })
}
