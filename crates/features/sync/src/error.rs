use std::borrow::Cow;

/// Fatal synchronizer failures.
///
/// A single failing batch is not one of these: it is recorded as a
/// [`SyncBatchError`](crate::SyncBatchError) in the report and the run continues.
#[kreg_derive::kreg_error]
pub enum SyncError {
    #[error("Database error{}: {source}", format_context(.context))]
    Database { source: kreg_database::DatabaseError, context: Option<Cow<'static, str>> },

    #[error("SurrealDB error{}: {source}", format_context(.context))]
    Surreal {
        #[source]
        source: surrealdb::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Metadata encoding failed{}: {source}", format_context(.context))]
    Json { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// The store rejected an operation (memory store failure injection, closed handle).
    #[error("Store error{}: {message}", format_context(.context))]
    Store { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A fetched row did not match the expected shape.
    #[error("Cannot decode {table}.{field}{}: {message}", format_context(.context))]
    Decode {
        table: &'static str,
        field: &'static str,
        message: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },

    /// More than one snapshot is flagged current for the kernel line.
    #[error("Kernel line {kernel_line} is transitioning ({rows} current rows){}", format_context(.context))]
    Transitioning { kernel_line: String, rows: usize, context: Option<Cow<'static, str>> },

    #[error("Invalid sync options{}: {message}", format_context(.context))]
    InvalidOptions { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal sync error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl SyncError {
    pub(crate) fn decode(table: &'static str, field: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::Decode { table, field, message: message.into(), context: None }
    }

    pub(crate) fn store(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Store { message: message.into(), context: None }
    }
}
