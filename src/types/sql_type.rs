//! SQL data types reported by the driver for result columns.
//!
//! Nullability is a column property, not a type property.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::value::Value;

/// SQL data type of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// CHAR / GRAPHIC - fixed-length string.
    Char,
    /// VARCHAR / VARGRAPHIC / CLOB - variable-length string.
    VarChar,
    /// SMALLINT.
    SmallInt,
    /// INTEGER.
    Integer,
    /// BIGINT.
    BigInt,
    /// DECIMAL / NUMERIC (packed and zoned).
    Decimal { precision: u16, scale: i16 },
    /// REAL / FLOAT / DOUBLE.
    Double,
    /// DATE.
    Date,
    /// TIME.
    Time,
    /// TIMESTAMP.
    Timestamp,
    /// BINARY / VARBINARY / BLOB / FOR BIT DATA.
    Binary,
    /// Anything else; values are surfaced as text.
    Unknown,
}

/// Formats DB2 for i and ODBC use when returning temporal values as text.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%d.%m.%y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H.%M.%S"];
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d-%H.%M.%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d-%H.%M.%S",
    "%Y-%m-%d %H:%M:%S",
];

impl SqlType {
    /// Check if values of this type are numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SqlType::SmallInt
                | SqlType::Integer
                | SqlType::BigInt
                | SqlType::Decimal { .. }
                | SqlType::Double
        )
    }

    /// Check if values of this type are character data.
    pub fn is_character(&self) -> bool {
        matches!(self, SqlType::Char | SqlType::VarChar | SqlType::Unknown)
    }

    /// Convert the driver's text rendering of a value into a typed `Value`.
    ///
    /// Text that does not parse as the column type is kept as `Value::Text`
    /// rather than failing the row.
    pub fn value_from_text(&self, text: String) -> Value {
        match self {
            SqlType::SmallInt | SqlType::Integer | SqlType::BigInt => text
                .trim()
                .parse()
                .map(Value::Integer)
                .unwrap_or(Value::Text(text)),
            SqlType::Decimal { .. } => Value::Decimal(text.trim().to_string()),
            SqlType::Double => text
                .trim()
                .parse()
                .map(Value::Double)
                .unwrap_or(Value::Text(text)),
            SqlType::Date => DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text.trim(), fmt).ok())
                .map(Value::Date)
                .unwrap_or(Value::Text(text)),
            SqlType::Time => TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(text.trim(), fmt).ok())
                .map(Value::Time)
                .unwrap_or(Value::Text(text)),
            SqlType::Timestamp => TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text.trim(), fmt).ok())
                .map(Value::Timestamp)
                .unwrap_or(Value::Text(text)),
            SqlType::Binary => Value::Binary(text.into_bytes()),
            SqlType::Char | SqlType::VarChar | SqlType::Unknown => Value::Text(text),
        }
    }
}
