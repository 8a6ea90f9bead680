use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A field holds a value outside of its allowed range.
    #[error("`{field}` {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
    /// The search engine URL is not an http(s) URL.
    #[error("Invalid elasticsearch config: `url` must start with `http://` or `https://`, got `{0}`")]
    InvalidElasticsearchUrl(String),
}
