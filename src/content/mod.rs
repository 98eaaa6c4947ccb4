pub mod patch;
pub mod service;

pub use service::{ContentError, ContentService, ImageTarget};
