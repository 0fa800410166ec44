pub mod catalog;
pub mod collection;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod models;
pub mod placement;
pub mod prompt;

pub use catalog::*;
pub use collection::*;
pub use error::*;
pub use layout::*;
pub use metadata::*;
pub use models::*;
pub use placement::*;
pub use prompt::*;
