use std::fmt;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::errors::SnowflakeResult;
use crate::rows::{decode_row, ColumnDescriptor, DecodedRow, StringTable};

/// Capability to load one page (1-based) of a statement's rows.
///
/// The service injects this at construction so a result set can navigate
/// between pages without holding the service itself.
pub(crate) type PartitionFetcher =
    Box<dyn Fn(usize) -> BoxFuture<'static, SnowflakeResult<StringTable>> + Send + Sync>;

/// The outcome of one submitted statement.
///
/// A result set is either still pending (the statement was accepted for
/// asynchronous execution and carries nothing but its handle) or ready, with
/// row metadata and the current page of raw rows loaded. Decoding is derived
/// from the raw rows and descriptors on demand; page navigation replaces the
/// raw rows in place.
pub struct ResultSet {
    id: String,
    executed: bool,
    total: Option<u64>,
    page: Option<usize>,
    page_total: Option<usize>,
    fields: Option<Vec<ColumnDescriptor>>,
    raw_data: Option<StringTable>,
    timestamp: Option<DateTime<Utc>>,
    fetcher: PartitionFetcher,
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("id", &self.id)
            .field("executed", &self.executed)
            .field("total", &self.total)
            .field("page", &self.page)
            .field("page_total", &self.page_total)
            .field("fields", &self.fields)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

impl ResultSet {
    /// A statement accepted for asynchronous execution: no metadata or rows
    /// yet, only the handle to fetch them with later.
    pub(crate) fn pending(id: String, fetcher: PartitionFetcher) -> Self {
        ResultSet {
            id,
            executed: false,
            total: None,
            page: None,
            page_total: None,
            fields: None,
            raw_data: None,
            timestamp: None,
            fetcher,
        }
    }

    /// An executed statement with its first page of rows.
    pub(crate) fn ready(
        id: String,
        total: u64,
        page_total: usize,
        fields: Vec<ColumnDescriptor>,
        raw_data: StringTable,
        timestamp: DateTime<Utc>,
        fetcher: PartitionFetcher,
    ) -> Self {
        ResultSet {
            id,
            executed: true,
            total: Some(total),
            page: Some(1),
            page_total: Some(page_total),
            fields: Some(fields),
            raw_data: Some(raw_data),
            timestamp: Some(timestamp),
            fetcher,
        }
    }

    /// The statement handle assigned by the server.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// False while the statement is still running asynchronously; no
    /// metadata or row data is populated until then.
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Total row count across all pages.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// The currently loaded page, 1-based.
    pub fn page(&self) -> Option<usize> {
        self.page
    }

    pub fn page_total(&self) -> Option<usize> {
        self.page_total
    }

    pub fn fields(&self) -> Option<&[ColumnDescriptor]> {
        self.fields.as_deref()
    }

    /// The current page of rows as returned by the server.
    pub fn raw_data(&self) -> Option<&StringTable> {
        self.raw_data.as_ref()
    }

    /// Server-side creation time of the statement.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Decode the currently loaded page.
    ///
    /// Returns `None` until both row data and column descriptors are
    /// present. The rows are decoded anew on every call so the output always
    /// reflects the page that is loaded right now.
    pub fn decoded_data(&self) -> SnowflakeResult<Option<Vec<DecodedRow>>> {
        let (Some(raw_data), Some(fields)) = (&self.raw_data, &self.fields) else {
            return Ok(None);
        };
        raw_data
            .iter()
            .map(|row| decode_row(row, fields))
            .collect::<SnowflakeResult<Vec<_>>>()
            .map(Some)
    }

    /// Load page `page`, replacing the current rows.
    ///
    /// Returns `false` without any request when the result is still pending
    /// or `page` is out of range; `true` once the page is loaded.
    pub async fn goto_page(&mut self, page: usize) -> SnowflakeResult<bool> {
        if !self.executed {
            return Ok(false);
        }
        let page_total = self.page_total.unwrap_or(0);
        if page < 1 || page > page_total {
            return Ok(false);
        }
        let data = (self.fetcher)(page).await?;
        self.raw_data = Some(data);
        self.page = Some(page);
        Ok(true)
    }

    pub async fn first_page(&mut self) -> SnowflakeResult<bool> {
        self.goto_page(1).await
    }

    pub async fn previous_page(&mut self) -> SnowflakeResult<bool> {
        match self.page {
            Some(page) if page > 1 => self.goto_page(page - 1).await,
            _ => Ok(false),
        }
    }

    pub async fn next_page(&mut self) -> SnowflakeResult<bool> {
        match self.page {
            Some(page) => self.goto_page(page + 1).await,
            None => Ok(false),
        }
    }

    pub async fn last_page(&mut self) -> SnowflakeResult<bool> {
        match self.page_total {
            Some(page_total) => self.goto_page(page_total).await,
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::cells::Cell;
    use crate::errors::{SnowflakeError, STATUS_UNPROCESSABLE};

    use super::*;

    fn canned_fetcher(pages: Vec<StringTable>) -> PartitionFetcher {
        Box::new(move |page| {
            let data = pages.get(page - 1).cloned();
            Box::pin(async move {
                data.ok_or_else(|| SnowflakeError::missing_field("data", STATUS_UNPROCESSABLE))
            })
        })
    }

    fn page_of(rows: &[&[Option<&str>]]) -> StringTable {
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.map(str::to_owned)).collect())
            .collect()
    }

    fn text_fields(names: &[&str]) -> Vec<ColumnDescriptor> {
        names
            .iter()
            .map(|name| ColumnDescriptor {
                name: (*name).to_owned(),
                data_type: "text".to_owned(),
                scale: None,
            })
            .collect()
    }

    fn two_page_result() -> ResultSet {
        let first = page_of(&[&[Some("0"), Some("first")]]);
        let second = page_of(&[&[Some("1"), Some("second")]]);
        ResultSet::ready(
            "ID".to_owned(),
            2,
            2,
            text_fields(&["WORD"]),
            first.clone(),
            Utc.with_ymd_and_hms(2021, 10, 1, 9, 55, 16).unwrap(),
            canned_fetcher(vec![first, second]),
        )
    }

    #[tokio::test]
    async fn out_of_range_pages_leave_the_result_untouched() {
        let mut result = two_page_result();

        assert!(!result.goto_page(0).await.unwrap());
        assert!(!result.goto_page(3).await.unwrap());
        assert_eq!(result.page(), Some(1));
        assert_eq!(result.raw_data().unwrap()[0][1].as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn pending_results_do_not_paginate() {
        let mut result = ResultSet::pending("ID".to_owned(), canned_fetcher(vec![]));

        assert!(!result.goto_page(1).await.unwrap());
        assert!(!result.next_page().await.unwrap());
        assert!(!result.last_page().await.unwrap());
        assert!(!result.is_executed());
        assert_eq!(result.page(), None);
        assert!(result.decoded_data().unwrap().is_none());
    }

    #[tokio::test]
    async fn goto_page_replaces_rows_and_page_number() {
        let mut result = two_page_result();

        assert!(result.goto_page(2).await.unwrap());
        assert_eq!(result.page(), Some(2));
        assert_eq!(result.raw_data().unwrap()[0][1].as_deref(), Some("second"));

        let rows = result.decoded_data().unwrap().unwrap();
        assert_eq!(rows[0].get("WORD"), Some(&Cell::Text("second".to_owned())));
    }

    #[tokio::test]
    async fn navigation_walks_between_first_and_last_page() {
        let mut result = two_page_result();

        assert!(result.next_page().await.unwrap());
        assert_eq!(result.page(), Some(2));
        assert!(!result.next_page().await.unwrap());

        assert!(result.previous_page().await.unwrap());
        assert_eq!(result.page(), Some(1));
        assert!(!result.previous_page().await.unwrap());

        assert!(result.last_page().await.unwrap());
        assert_eq!(result.page(), Some(2));
        assert!(result.first_page().await.unwrap());
        assert_eq!(result.page(), Some(1));
    }

    #[tokio::test]
    async fn decoding_is_recomputed_for_the_loaded_page() {
        let mut result = two_page_result();

        let before = result.decoded_data().unwrap().unwrap();
        assert_eq!(before[0].get("WORD"), Some(&Cell::Text("first".to_owned())));

        result.goto_page(2).await.unwrap();
        let after = result.decoded_data().unwrap().unwrap();
        assert_eq!(after[0].get("WORD"), Some(&Cell::Text("second".to_owned())));
    }
}
