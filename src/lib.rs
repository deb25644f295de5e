pub mod backend;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod result;
pub mod server;
pub mod table;
pub mod view;
pub mod visual;

pub use catalog::{CatalogEntry, QueryId};
pub use dispatch::Dispatcher;
pub use error::{AppError, AppResult};
pub use result::QueryResult;
