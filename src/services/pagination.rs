use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite};

use crate::db::Database;
use crate::error::Result;

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

/// An entity that can be listed page by page, scoped to one owner
pub trait Paginatable: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    const TABLE: &'static str;
    const OWNER_COLUMN: &'static str;
    /// Columns holding lowercased text, matched by substring against the
    /// lowercased query
    const SEARCH_COLUMNS: &'static [&'static str];
    const ORDER_BY: &'static str;
}

/// Page query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub query: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    fn search(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PageMeta {
    pub fn new(page: u32, limit: u32, total_items: i64) -> Self {
        let limit_items = i64::from(limit);
        let total_pages = (total_items + limit_items - 1) / limit_items;
        Self {
            page,
            limit,
            total_items,
            total_pages,
            has_next_page: i64::from(page) < total_pages,
            has_previous_page: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

pub struct PaginationService;

impl PaginationService {
    /// Fetch one page and the total count inside a single transaction
    pub async fn paginate<T: Paginatable>(
        db: &Database,
        owner_id: &str,
        query: &PageQuery,
    ) -> Result<Paginated<T>> {
        let page = query.page();
        let limit = query.limit();
        let offset = i64::from(page - 1) * i64::from(limit);

        let mut items_query = QueryBuilder::<Sqlite>::new("SELECT * FROM ");
        items_query.push(T::TABLE);
        Self::push_filters::<T>(&mut items_query, owner_id, query.search());
        items_query
            .push(" ORDER BY ")
            .push(T::ORDER_BY)
            .push(" LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(offset);

        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ");
        count_query.push(T::TABLE);
        Self::push_filters::<T>(&mut count_query, owner_id, query.search());

        let mut tx = db.pool().begin().await?;
        let items: Vec<T> = items_query.build_query_as().fetch_all(&mut *tx).await?;
        let (total_items,): (i64,) = count_query.build_query_as().fetch_one(&mut *tx).await?;
        tx.commit().await?;

        Ok(Paginated {
            items,
            meta: PageMeta::new(page, limit, total_items),
        })
    }

    fn push_filters<'a, T: Paginatable>(
        builder: &mut QueryBuilder<'a, Sqlite>,
        owner_id: &'a str,
        search: Option<&str>,
    ) {
        builder
            .push(" WHERE ")
            .push(T::OWNER_COLUMN)
            .push(" = ")
            .push_bind(owner_id);

        if let Some(search) = search {
            let folded = search.to_lowercase();
            builder.push(" AND (");
            for (i, column) in T::SEARCH_COLUMNS.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder
                    .push("instr(")
                    .push(*column)
                    .push(", ")
                    .push_bind(folded.clone())
                    .push(") > 0");
            }
            builder.push(")");
        }
    }
}
