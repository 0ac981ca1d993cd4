//! Named SQL templates and the binder that turns them into positional statements.

mod binder;
mod render;
mod store;
mod value;

pub use binder::{BoundStatement, QueryBinder, QueryError};
pub use store::{TemplateError, TemplateStore};
pub use value::{QueryParams, SqlValue};
