pub mod errors;
pub mod factory;
pub mod service;

pub use errors::VideoError;
pub use factory::AppFactory;
pub use service::{UrlValidation, VideoService};
