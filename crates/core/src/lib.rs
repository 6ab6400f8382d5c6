pub mod error;
pub mod intent;
pub mod models;

pub use error::AssistError;
pub use intent::{classify, normalize_text};
pub use models::*;
