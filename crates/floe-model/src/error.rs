use crate::expr::ExprError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error("Invalid element UUID: {text}")]
    InvalidUuid { text: String },

    #[error("Malformed document ({context}): {message}")]
    MalformedDocument { context: String, message: String },

    #[error("Invalid document JSON: {message}")]
    InvalidJson { message: String },
}

impl Error {
    pub(crate) fn malformed(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            context: context.into(),
            message: message.into(),
        }
    }
}
