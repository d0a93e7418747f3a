use std::borrow::Cow;

#[kreg_derive::kreg_error]
pub enum CodegenError {
    #[error("Identifier collision in module `{module}`{}: `{identifier}` is produced by both {first} and {second}", format_context(.context))]
    IdentifierCollision {
        module: String,
        identifier: String,
        first: String,
        second: String,
        context: Option<Cow<'static, str>>,
    },

    #[error("Formatting error{}: {source}", format_context(.context))]
    Format { source: std::fmt::Error, context: Option<Cow<'static, str>> },

    #[error("I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },
}
