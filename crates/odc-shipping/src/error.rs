//! Error types for quoting, serving and calling the quote API

use odc_model::ErrorBody;

/// A quote request was rejected; the message is the response's `error` text
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    /// No body, no field, or a `null` field
    #[error("Missing numberOfItems field")]
    MissingItems,

    /// Field present but not a non-negative integer
    #[error("Invalid number of items")]
    InvalidItems,

    /// Request was not declared as JSON
    #[error("Invalid or missing Content-Type header")]
    ContentType,

    /// Body declared as JSON but unparsable
    #[error("Malformed JSON body")]
    MalformedBody,
}

impl QuoteError {
    /// Response body for this rejection
    #[must_use]
    pub fn to_body(self) -> ErrorBody {
        ErrorBody::new(self.to_string())
    }
}

/// Mock service could not start
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Address could not be bound
    #[error("cannot bind shipping service: {0}")]
    Bind(#[from] warp::Error),
}

/// Quote client errors
#[derive(Debug, thiserror::Error)]
pub enum QuoteClientError {
    /// Request never got a response
    #[error("shipping request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Service answered with a 4xx and an error body
    #[error("shipping rejected the request ({status}): {error}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// `error` field of the body
        error: String,
    },

    /// Any other non-2xx, or a body that is not a quote
    #[error("unexpected shipping response ({status}): {body}")]
    Unexpected {
        /// HTTP status
        status: u16,
        /// Raw body
        body: String,
    },
}

impl QuoteClientError {
    /// Check if the service refused the request itself
    #[inline]
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}
