/// HTTP status class for an envelope that cannot be interpreted at all.
pub(crate) const STATUS_NOT_ACCEPTABLE: u16 = 406;
/// HTTP status class for an envelope that is well-formed but incomplete
/// or reports a failed statement.
pub(crate) const STATUS_UNPROCESSABLE: u16 = 422;

#[derive(thiserror::Error, Debug)]
pub enum SnowflakeError {
    /// A client parameter (account, user, key material) was missing or
    /// invalid when the [`crate::Client`] was constructed.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Token(#[from] jwt_simple::Error),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
    /// A column descriptor named a type the decoder does not recognize.
    #[error("column type \"{0}\" is not supported")]
    UnsupportedType(String),
    /// A field required at the current validation stage was absent from a
    /// server envelope. `status` is the HTTP-equivalent class: 406 when the
    /// envelope carries no status at all, 422 when it is incomplete.
    #[error("field \"{field}\" missing from server response")]
    MissingField { field: String, status: u16 },
    /// The server reported a terminal, non-success statement status.
    #[error("{message} ({code})")]
    Statement { message: String, code: String },
    /// A row could not be decoded against its column descriptors.
    #[error("failed to decode row: {0}")]
    Decode(#[source] Box<SnowflakeError>),
}

impl SnowflakeError {
    pub(crate) fn missing_field(field: impl Into<String>, status: u16) -> Self {
        SnowflakeError::MissingField {
            field: field.into(),
            status,
        }
    }
}

pub type SnowflakeResult<T> = Result<T, SnowflakeError>;
