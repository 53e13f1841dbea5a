//! Loading a production model, a production plan and layout settings from
//! RON, TOML or JSON data files.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, LayoutData, load_layout_data};
