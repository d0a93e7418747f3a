use crate::validator::ValidationError;
use std::borrow::Cow;

/// Failures while reading, parsing or validating pack documents.
///
/// Every variant names the pack it concerns: the declared id when it could be read,
/// otherwise the file path.
#[kreg_derive::kreg_error]
pub enum PackError {
    #[error("I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Invalid JSON pack{}: {source}", format_context(.context))]
    Json { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Invalid TOML pack{}: {source}", format_context(.context))]
    Toml { source: toml::de::Error, context: Option<Cow<'static, str>> },

    #[error("Pack directory walk failed{}: {source}", format_context(.context))]
    Walk { source: walkdir::Error, context: Option<Cow<'static, str>> },

    #[error("Pack '{pack}' failed validation{}: {error}", format_context(.context))]
    Invalid { pack: String, error: ValidationError, context: Option<Cow<'static, str>> },

    #[error("Unsupported pack format{}: {message}", format_context(.context))]
    UnsupportedFormat { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Duplicate pack id '{pack}'{}: {message}", format_context(.context))]
    DuplicatePack { pack: String, message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Pack loader task failed{}: {source}", format_context(.context))]
    Task { source: tokio::task::JoinError, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl PackError {
    /// The pack id (or path) this error concerns, when it was known at failure time.
    #[must_use]
    pub fn pack(&self) -> Option<&str> {
        match self {
            Self::Invalid { pack, .. } | Self::DuplicatePack { pack, .. } => Some(pack),
            Self::Io { context, .. }
            | Self::Json { context, .. }
            | Self::Toml { context, .. }
            | Self::Walk { context, .. }
            | Self::UnsupportedFormat { context, .. } => context.as_deref(),
            Self::Task { .. } | Self::Internal { .. } => None,
        }
    }
}
