//! Page requests and the totals written back by pagination.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub column: String,
    #[serde(default)]
    pub desc: bool,
}

impl OrderItem {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            desc: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            desc: true,
        }
    }
}

/// A page request, passed to a call through [`crate::ExecOption::with_page`].
///
/// `page_number` is 1-based. A zero size or number disables pagination for the call.
/// The totals are filled in by the pagination interceptor when `wants_count` is set.
#[derive(Debug, Default)]
pub struct Page {
    page_number: u64,
    page_size: u64,
    orders: Vec<OrderItem>,
    wants_count: bool,
    total_count: AtomicU64,
    total_pages: AtomicU64,
}

impl Page {
    /// Request page `page_number` (1-based) of `page_size` rows, with a total count.
    pub fn new(page_number: u64, page_size: u64) -> Self {
        Self {
            page_number,
            page_size,
            wants_count: true,
            ..Self::default()
        }
    }

    pub fn asc(mut self, column: impl Into<String>) -> Self {
        self.orders.push(OrderItem::asc(column));
        self
    }

    pub fn desc(mut self, column: impl Into<String>) -> Self {
        self.orders.push(OrderItem::desc(column));
        self
    }

    pub fn order_by(mut self, items: impl IntoIterator<Item = OrderItem>) -> Self {
        self.orders.extend(items);
        self
    }

    /// Skip the companion COUNT query.
    pub fn without_count(mut self) -> Self {
        self.wants_count = false;
        self
    }

    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn orders(&self) -> &[OrderItem] {
        &self.orders
    }

    pub fn wants_count(&self) -> bool {
        self.wants_count
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> u64 {
        self.page_number.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn is_enabled(&self) -> bool {
        self.page_size != 0 && self.page_number != 0
    }

    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::Acquire)
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages.load(Ordering::Acquire)
    }

    pub(crate) fn record_total(&self, count: u64) {
        self.total_count.store(count, Ordering::Release);
        self.total_pages
            .store(total_pages(count, self.page_size), Ordering::Release);
    }
}

/// Integer ceiling of `count / page_size`; zero for a zero page size.
pub fn total_pages(count: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    count / page_size + u64::from(count % page_size != 0)
}
