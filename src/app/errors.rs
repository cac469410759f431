/// What callers of [`crate::app::VideoService`] and the http api see.
///
/// Upstream detail (transport, status, json, missing fields) is logged
/// where it happens and collapsed into `FetchFailed`.
#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    #[error("not a recognized mlb.com video url")]
    InvalidUrl,

    #[error("could not retrieve video data from mlb.com, try again later")]
    FetchFailed,

    #[error("you are not allowed to perform this action")]
    Forbidden,

    #[error("cache storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl VideoError {
    /// Machine-readable error kind.
    pub fn code(&self) -> &'static str {
        match self {
            VideoError::InvalidUrl => "invalid_url",
            VideoError::FetchFailed => "fetch_failed",
            VideoError::Forbidden => "forbidden",
            VideoError::Storage(_) => "internal",
        }
    }
}
