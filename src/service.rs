use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bindings::Binding;
use crate::errors::{SnowflakeError, SnowflakeResult, STATUS_NOT_ACCEPTABLE, STATUS_UNPROCESSABLE};
use crate::result::{PartitionFetcher, ResultSet};
use crate::rows::{ColumnDescriptor, StringTable};
use crate::{jwt, Client};

/// Statement completed and the first page of rows is in the envelope.
const CODE_SUCCESS: &str = "090001";
/// Statement accepted and still running asynchronously.
const CODE_ASYNC: &str = "333334";

/// Submits, fetches and cancels statements for one account.
///
/// Created by [`Client::service`]; session context is layered on with the
/// `with_*` methods:
///
/// ```rust,no_run
/// # use snowflake_service::Client;
/// # fn example(client: Client) {
/// let service = client
///     .service()
///     .with_warehouse("COMPUTE_WH")
///     .with_database("MY_DB")
///     .with_schema("PUBLIC");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StatementService {
    client: Client,
    warehouse: Option<String>,
    database: Option<String>,
    schema: Option<String>,
    role: Option<String>,
    run_async: bool,
    nullable: bool,
    page_size: Option<u64>,
}

impl StatementService {
    pub(crate) fn new(client: Client) -> Self {
        StatementService {
            client,
            warehouse: None,
            database: None,
            schema: None,
            role: None,
            run_async: false,
            nullable: true,
            page_size: None,
        }
    }

    pub fn with_warehouse(mut self, warehouse: &str) -> Self {
        self.warehouse = Some(warehouse.to_owned());
        self
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = Some(database.to_owned());
        self
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_owned());
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_owned());
        self
    }

    /// Submit statements for asynchronous execution; [`StatementService::submit`]
    /// then returns a pending [`ResultSet`] to poll with [`StatementService::fetch`].
    pub fn with_async(mut self, run_async: bool) -> Self {
        self.run_async = run_async;
        self
    }

    /// Whether the server may return SQL NULL cells as JSON nulls. On by
    /// default.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Request a maximum number of rows per returned page.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Submit a statement, with `?` placeholders bound in order.
    ///
    /// Returns a ready [`ResultSet`] with the first page of rows, or a
    /// pending one when the service runs in async mode and the server
    /// reports the statement as still executing.
    pub async fn submit(&self, statement: &str, bindings: Vec<Binding>) -> SnowflakeResult<ResultSet> {
        let wire = WireStatement {
            statement: statement.to_owned(),
            warehouse: self.warehouse.clone(),
            database: self.database.clone(),
            schema: self.schema.clone(),
            role: self.role.clone(),
            page_size: self.page_size,
            bindings: number_bindings(bindings),
            result_set_meta_data: WireResultFormat { format: "jsonv2" },
        };
        log::debug!("submitting statement: {}", serde_json::to_string(&wire)?);

        let envelope = self
            .http_client()?
            .post(format!("{}/api/v2/statements", self.host()))
            .query(&[("async", self.run_async), ("nullable", self.nullable)])
            .query(&[("requestId", uuid::Uuid::new_v4().to_string())])
            .json(&wire)
            .send()
            .await?
            .json::<WireEnvelope>()
            .await?;

        validate(&envelope, true)?;
        let executed = envelope.code.as_deref() == Some(CODE_SUCCESS);
        self.translate_result(envelope, executed)
    }

    /// Fetch the result of a previously submitted statement as a fully
    /// populated [`ResultSet`] holding its first page.
    pub async fn fetch(&self, id: &str) -> SnowflakeResult<ResultSet> {
        let envelope = self.fetch_envelope(id, 1).await?;
        validate(&envelope, false)?;
        self.translate_result(envelope, true)
    }

    /// Fetch the raw rows of one page (1-based) of a statement's result.
    ///
    /// Only the `data` field of the response is required here; the caller
    /// already holds the metadata from the original submit.
    pub async fn fetch_page(&self, id: &str, page: usize) -> SnowflakeResult<StringTable> {
        let envelope = self.fetch_envelope(id, page).await?;
        translate_data(envelope)
    }

    /// Ask the server to stop executing a statement. The local call returns
    /// once the server has acknowledged the cancellation.
    pub async fn cancel(&self, id: &str) -> SnowflakeResult<()> {
        let envelope = self
            .http_client()?
            .post(format!("{}/api/v2/statements/{}/cancel", self.host(), id))
            .send()
            .await?
            .json::<WireEnvelope>()
            .await?;
        validate(&envelope, true)?;
        log::debug!("statement {} cancelled", id);
        Ok(())
    }

    async fn fetch_envelope(&self, id: &str, page: usize) -> SnowflakeResult<WireEnvelope> {
        Ok(self
            .http_client()?
            .get(format!("{}/api/v2/statements/{}", self.host(), id))
            .query(&[("partition", page.saturating_sub(1))])
            .send()
            .await?
            .json::<WireEnvelope>()
            .await?)
    }

    fn host(&self) -> String {
        format!(
            "https://{}.snowflakecomputing.com",
            self.client.account.to_ascii_lowercase(),
        )
    }

    fn http_client(&self) -> SnowflakeResult<reqwest::Client> {
        use reqwest::header::*;
        let token = jwt::create_token(
            &self.client.key_pair,
            &self.client.account.to_ascii_uppercase(),
            &self.client.user.to_ascii_uppercase(),
            self.client.token_lifetime_mins,
        )?;

        let mut headers = HeaderMap::with_capacity(5);
        headers.append(CONTENT_TYPE, "application/json".parse()?);
        headers.append(AUTHORIZATION, format!("Bearer {}", token).parse()?);
        headers.append(
            "X-Snowflake-Authorization-Token-Type",
            "KEYPAIR_JWT".parse()?,
        );
        headers.append(ACCEPT, "application/json".parse()?);
        headers.append(
            USER_AGENT,
            concat!(env!("CARGO_PKG_NAME"), '/', env!("CARGO_PKG_VERSION")).parse()?,
        );

        Ok(reqwest::Client::builder()
            .default_headers(headers)
            .build()?)
    }

    /// A narrow fetch-page-N capability for [`ResultSet`], so the result can
    /// paginate without holding the service.
    fn partition_fetcher(&self, id: String) -> PartitionFetcher {
        let service = self.clone();
        Box::new(move |page| {
            let service = service.clone();
            let id = id.clone();
            Box::pin(async move { service.fetch_page(&id, page).await })
        })
    }

    /// Re-hydrate a validated envelope into a [`ResultSet`].
    ///
    /// A non-executed statement yields a pending result carrying only its
    /// handle. An executed one must carry the full metadata block, row data
    /// and creation time; each absence is reported by name.
    fn translate_result(&self, envelope: WireEnvelope, executed: bool) -> SnowflakeResult<ResultSet> {
        let id = envelope
            .statement_handle
            .ok_or_else(|| SnowflakeError::missing_field("statementHandle", STATUS_UNPROCESSABLE))?;
        let fetcher = self.partition_fetcher(id.clone());
        if !executed {
            return Ok(ResultSet::pending(id, fetcher));
        }

        let missing = |field: &str| SnowflakeError::missing_field(field, STATUS_UNPROCESSABLE);
        let meta = envelope.result_set_meta_data.ok_or_else(|| missing("resultSetMetaData"))?;
        let data = envelope.data.ok_or_else(|| missing("data"))?;
        let created_on = envelope.created_on.ok_or_else(|| missing("createdOn"))?;
        let total = meta.num_rows.ok_or_else(|| missing("numRows"))?;
        let partition_info = meta.partition_info.ok_or_else(|| missing("partitionInfo"))?;
        let fields = meta.row_type.ok_or_else(|| missing("rowType"))?;

        // Millisecond epoch; the sub-second part is dropped.
        let timestamp = DateTime::<Utc>::from_timestamp(created_on / 1000, 0)
            .ok_or_else(|| missing("createdOn"))?;

        Ok(ResultSet::ready(
            id,
            total,
            partition_info.len(),
            fields,
            data,
            timestamp,
            fetcher,
        ))
    }
}

/// Check a response envelope for the success or still-running status codes
/// and the correlation fields every statement response must carry.
///
/// The status URL is not required on the paginated fetch variant, whose
/// responses only correlate by handle.
fn validate(envelope: &WireEnvelope, require_status_url: bool) -> SnowflakeResult<()> {
    let code = envelope
        .code
        .as_deref()
        .ok_or_else(|| SnowflakeError::missing_field("code", STATUS_NOT_ACCEPTABLE))?;
    let message = envelope
        .message
        .as_deref()
        .ok_or_else(|| SnowflakeError::missing_field("message", STATUS_NOT_ACCEPTABLE))?;

    if code != CODE_SUCCESS && code != CODE_ASYNC {
        return Err(SnowflakeError::Statement {
            message: message.to_owned(),
            code: code.to_owned(),
        });
    }

    if envelope.statement_handle.is_none() {
        return Err(SnowflakeError::missing_field("statementHandle", STATUS_UNPROCESSABLE));
    }
    if require_status_url && envelope.statement_status_url.is_none() {
        return Err(SnowflakeError::missing_field("statementStatusUrl", STATUS_UNPROCESSABLE));
    }

    Ok(())
}

fn translate_data(envelope: WireEnvelope) -> SnowflakeResult<StringTable> {
    envelope
        .data
        .ok_or_else(|| SnowflakeError::missing_field("data", STATUS_UNPROCESSABLE))
}

fn number_bindings(bindings: Vec<Binding>) -> HashMap<String, Binding> {
    bindings
        .into_iter()
        .enumerate()
        .map(|(index, binding)| ((index + 1).to_string(), binding))
        .collect()
}

//
// Wire types
//

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct WireStatement {
    statement: String,
    warehouse: Option<String>,
    database: Option<String>,
    schema: Option<String>,
    role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_size: Option<u64>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    bindings: HashMap<String, Binding>,
    result_set_meta_data: WireResultFormat,
}

#[derive(Serialize, Debug, Clone)]
struct WireResultFormat {
    format: &'static str,
}

/// The outer envelope of every statement response. All fields are optional
/// on the wire; [`validate`] and [`StatementService::translate_result`]
/// decide which must be present at each stage.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    code: Option<String>,
    message: Option<String>,
    statement_handle: Option<String>,
    statement_status_url: Option<String>,
    result_set_meta_data: Option<WireResultSetMetaData>,
    data: Option<StringTable>,
    created_on: Option<i64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireResultSetMetaData {
    num_rows: Option<u64>,
    partition_info: Option<Vec<WirePartitionInfo>>,
    row_type: Option<Vec<ColumnDescriptor>>,
}

/// Only the number of partitions matters to the client; per-partition sizes
/// are informational.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WirePartitionInfo {
    #[serde(default)]
    #[allow(dead_code)]
    row_count: Option<u64>,
}
