use thiserror::Error;

/// Everything that can go wrong while turning one page into a record.
/// Nothing here is fatal to a run: a parse failure drops one payload, a
/// coercion failure drops one field, a fetch failure leaves an image slot
/// empty, and a page with no usable source is dropped whole.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed JSON in {kind} payload: {message}")]
    ParseFailure { kind: &'static str, message: String },

    #[error("no payload on the page yielded any fields")]
    NoExtractableData,

    #[error("field {field} could not be coerced from {raw:?}")]
    FieldCoercion { field: &'static str, raw: String },

    #[error("image fetch failed: {message}")]
    ImageFetch { message: String },
}

impl ExtractError {
    /// Stable tag for (reason, url) keyed logging.
    pub fn reason(&self) -> &'static str {
        match self {
            ExtractError::ParseFailure { .. } => "parse-failure",
            ExtractError::NoExtractableData => "no-extractable-data",
            ExtractError::FieldCoercion { .. } => "field-coercion",
            ExtractError::ImageFetch { .. } => "image-fetch",
        }
    }
}
