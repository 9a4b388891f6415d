//! Value, column and row types for query results.

mod column;
mod row;
mod sql_type;
mod value;

pub use column::{Column, ColumnInfo};
pub use row::Row;
pub use sql_type::SqlType;
pub use value::Value;
