pub mod fetcher;
pub mod normalize;
pub mod types;

pub use fetcher::{MlbFetcher, VideoFetcher};
pub use normalize::normalize;
pub use types::{FetchError, ValidationError, VideoRecord};
