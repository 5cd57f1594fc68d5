use crate::common::{self, condition, expression, selection};
use crate::error::{Error, Result};

use serde::Serialize;
use std::{ops, str};

/// Options of a single-item read.
///
/// ```rust
/// use dynamodb_service::{common::selection::SelectionMap, read::common::GetOptions};
///
/// let options = GetOptions::default()
///     .projection(SelectionMap::attributes(["TestV"]))
///     .consistent(true);
/// ```
///
/// Clauses are added only through these methods, so a read never carries a clause it
/// does not send:
///
/// ```compile_fail
/// use dynamodb_service::{common::condition, read::common::GetOptions};
///
/// let mut options = GetOptions::default();
/// options.builder = options.builder.with_condition(condition::item_exists());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetOptions {
    /// Clauses compiled into the request; only the projection is used.
    pub(crate) builder: expression::ExpressionBuilder,
    /// Strongly consistent read when `Some(true)`.
    pub consistent_read: Option<bool>,
}

impl GetOptions {
    /// Restrict the returned attributes.
    pub fn projection(mut self, projection: selection::SelectionMap) -> Self {
        self.builder = self.builder.with_projection(projection);
        self
    }

    /// Select read consistency; the last call wins.
    pub fn consistent(mut self, consistent_read: bool) -> Self {
        self.consistent_read = Some(consistent_read);
        self
    }
}

/// How a query returns its matches.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum SelectMode {
    /// Items in ascending sort key order.
    #[default]
    Asc,
    /// Items in descending sort key order.
    Desc,
    /// Only the number of matches.
    Count,
}

impl str::FromStr for SelectMode {
    type Err = Error;

    fn from_str(mode: &str) -> Result<Self> {
        match mode {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            "COUNT" => Ok(Self::Count),
            _ => Err(Error::InvalidInput(format!("unknown select mode `{mode}`"))),
        }
    }
}

/// Options of a query.
///
/// ```rust
/// use dynamodb_service::{
///     common::condition::{Condition, ConditionMap},
///     read::common::{QueryOptions, SelectMode},
/// };
///
/// let options = QueryOptions::default()
///     .filter(ConditionMap::attribute("TestV", Condition::Equals("v1")))
///     .index("GSI1")
///     .select(SelectMode::Desc);
/// ```
///
/// ```compile_fail
/// use dynamodb_service::{common::condition, read::common::QueryOptions};
///
/// let options = QueryOptions::default();
/// let builder = options.builder.with_condition(condition::item_exists());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOptions {
    /// Filter and projection clauses.
    pub(crate) builder: expression::ExpressionBuilder,
    /// Strongly consistent read when `Some(true)`.
    pub consistent_read: Option<bool>,
    /// Secondary index to query instead of the table.
    pub index_name: Option<String>,
    /// Result order, or count only.
    pub select: SelectMode,
    /// Maximum items evaluated per backend page.
    pub page_size: Option<i32>,
}

impl QueryOptions {
    /// AND a filter onto the result filter.
    pub fn filter<T: Serialize>(mut self, filter: condition::ConditionMap<T>) -> Self {
        self.builder = self.builder.with_filter(filter);
        self
    }

    /// Restrict the returned attributes.
    pub fn projection(mut self, projection: selection::SelectionMap) -> Self {
        self.builder = self.builder.with_projection(projection);
        self
    }

    /// Query a secondary index; the last call wins.
    pub fn index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    /// Select read consistency; the last call wins.
    pub fn consistent(mut self, consistent_read: bool) -> Self {
        self.consistent_read = Some(consistent_read);
        self
    }

    /// Select result order or count mode; the last call wins.
    pub fn select(mut self, select: SelectMode) -> Self {
        self.select = select;
        self
    }

    /// Limit the items evaluated per backend page; the last call wins.
    pub fn page_size(mut self, page_size: i32) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// Accumulates pages of a multi-page read.
///
/// Stops once more than `max_items` items are held. The page that crosses the cap is
/// kept whole, so the result may exceed the cap by less than one page.
#[derive(Debug)]
pub(crate) struct PaginatedReader {
    max_items: usize,
    items: Vec<common::Item>,
    count: i64,
    pages: usize,
}

impl PaginatedReader {
    pub(crate) fn new(max_items: usize) -> Self {
        Self {
            max_items,
            items: Vec::new(),
            count: 0,
            pages: 0,
        }
    }

    /// Add one page; `Break` once the cap has been exceeded.
    pub(crate) fn push(&mut self, items: Vec<common::Item>, count: i32) -> ops::ControlFlow<()> {
        self.pages += 1;
        self.count += i64::from(count);
        self.items.extend(items);
        if self.items.len() > self.max_items {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                items = self.items.len(),
                pages = self.pages,
                "stopping pagination early"
            );
            ops::ControlFlow::Break(())
        } else {
            ops::ControlFlow::Continue(())
        }
    }

    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    pub(crate) fn pages(&self) -> usize {
        self.pages
    }

    pub(crate) fn count(&self) -> i64 {
        self.count
    }

    pub(crate) fn into_items(self) -> Vec<common::Item> {
        self.items
    }
}
