pub mod store;
pub mod templates;
pub use store::*;
pub use templates::*;
