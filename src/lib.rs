//! A typed client for Snowflake's SQL statement REST API.
//!
//! The API returns every cell of a result set as a string inside a row
//! array, with a separate column-type descriptor per position. This crate
//! submits statements with a key-pair-signed JWT, validates the response
//! envelope, reconstructs typed values from the cell strings, and loads
//! additional result pages on demand.
//!
//! Example usage:
//!
//! ```rust,no_run
//! use snowflake_service::{Cell, Client, SnowflakeError};
//! use snowflake_service::jwt_simple::algorithms::RS256KeyPair;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SnowflakeError> {
//!     let key_pair = RS256KeyPair::generate(2048)?;
//!     let client = Client::from_key_pair("ACCOUNT", "USER", key_pair)?;
//!     let service = client
//!         .service()
//!         .with_warehouse("COMPUTE_WH")
//!         .with_database("MY_DB")
//!         .with_schema("PUBLIC");
//!
//!     let mut result = service
//!         .submit(
//!             "SELECT id, name FROM users WHERE id = ? AND name = ?",
//!             vec![10.into(), "Henry".into()],
//!         )
//!         .await?;
//!
//!     // The first page is loaded with the result; further pages on demand.
//!     loop {
//!         for row in result.decoded_data()?.unwrap_or_default() {
//!             match row.get("NAME") {
//!                 Some(Cell::Text(name)) => println!("name: {}", name),
//!                 _ => println!("no name"),
//!             }
//!         }
//!         if !result.next_page().await? {
//!             break;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
use jwt_simple::algorithms::RS256KeyPair;

mod bindings;
mod cells;
mod errors;
mod jwt;
mod result;
mod rows;
mod service;

pub use bindings::Binding;
pub use cells::{Cell, ColumnKind};
pub use errors::{SnowflakeError, SnowflakeResult};
pub use jwt_simple;
pub use result::ResultSet;
pub use rows::{decode_row, ColumnDescriptor, DecodedRow, StringTable};
pub use service::StatementService;

const DEFAULT_TOKEN_LIFETIME_MINS: u64 = 59;

/// Connection parameters for one Snowflake account and user.
///
/// All required parameters are validated when the client is constructed, so
/// a `Client` that exists can always issue tokens.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) key_pair: RS256KeyPair,
    pub(crate) account: String,
    pub(crate) user: String,
    pub(crate) token_lifetime_mins: u64,
}

impl Client {
    /// Create a client from PEM-encoded RSA private key material.
    pub fn new(account: &str, user: &str, private_key_pem: &str) -> SnowflakeResult<Self> {
        let key_pair = RS256KeyPair::from_pem(private_key_pem)
            .map_err(|error| SnowflakeError::Configuration(format!("invalid private key: {error}")))?;
        Self::from_key_pair(account, user, key_pair)
    }

    /// Create a client from an already-loaded key pair.
    pub fn from_key_pair(account: &str, user: &str, key_pair: RS256KeyPair) -> SnowflakeResult<Self> {
        if account.is_empty() {
            return Err(SnowflakeError::Configuration("account not set".to_owned()));
        }
        if user.is_empty() {
            return Err(SnowflakeError::Configuration("user not set".to_owned()));
        }
        Ok(Client {
            key_pair,
            account: account.to_owned(),
            user: user.to_owned(),
            token_lifetime_mins: DEFAULT_TOKEN_LIFETIME_MINS,
        })
    }

    /// Override the bearer-token expiry window.
    pub fn with_token_lifetime(mut self, minutes: u64) -> Self {
        self.token_lifetime_mins = minutes;
        self
    }

    /// Start a statement service for this client.
    pub fn service(&self) -> StatementService {
        StatementService::new(self.clone())
    }
}
