use std::fmt::{self, Display};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A value bound into a criteria predicate or a query template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Null,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    List(Vec<QueryValue>),
}

impl QueryValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            QueryValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            QueryValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[QueryValue]> {
        match self {
            QueryValue::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }

    /// Flattens a list value into its items; any other value yields itself.
    pub fn into_items(self) -> Vec<QueryValue> {
        match self {
            QueryValue::List(values) => values,
            other => vec![other],
        }
    }
}

impl Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Null => write!(f, "null"),
            QueryValue::String(s) => write!(f, "{}", s),
            QueryValue::Int(i) => write!(f, "{}", i),
            QueryValue::Float(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            QueryValue::Bool(b) => write!(f, "{}", b),
            QueryValue::Timestamp(t) => {
                write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            QueryValue::List(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
        }
    }
}

// Helper trait to convert types to QueryValue
pub trait ToQueryValue {
    fn to_query_value(&self) -> QueryValue;
}

impl<T: ToQueryValue + ?Sized> ToQueryValue for &T {
    fn to_query_value(&self) -> QueryValue {
        (**self).to_query_value()
    }
}

impl ToQueryValue for QueryValue {
    fn to_query_value(&self) -> QueryValue {
        self.clone()
    }
}

impl ToQueryValue for str {
    fn to_query_value(&self) -> QueryValue {
        QueryValue::String(self.to_string())
    }
}

impl ToQueryValue for String {
    fn to_query_value(&self) -> QueryValue {
        QueryValue::String(self.clone())
    }
}

impl ToQueryValue for i32 {
    fn to_query_value(&self) -> QueryValue {
        QueryValue::Int(*self as i64)
    }
}

impl ToQueryValue for i64 {
    fn to_query_value(&self) -> QueryValue {
        QueryValue::Int(*self)
    }
}

impl ToQueryValue for u32 {
    fn to_query_value(&self) -> QueryValue {
        QueryValue::Int(*self as i64)
    }
}

impl ToQueryValue for u64 {
    fn to_query_value(&self) -> QueryValue {
        match i64::try_from(*self) {
            Ok(v) => QueryValue::Int(v),
            Err(_) => QueryValue::String(self.to_string()),
        }
    }
}

impl ToQueryValue for usize {
    fn to_query_value(&self) -> QueryValue {
        (*self as u64).to_query_value()
    }
}

impl ToQueryValue for f64 {
    fn to_query_value(&self) -> QueryValue {
        QueryValue::Float(*self)
    }
}

impl ToQueryValue for f32 {
    fn to_query_value(&self) -> QueryValue {
        // widen through the shortest decimal form so 0.1f32 stays 0.1
        QueryValue::Float(self.to_string().parse().unwrap_or(*self as f64))
    }
}

impl ToQueryValue for bool {
    fn to_query_value(&self) -> QueryValue {
        QueryValue::Bool(*self)
    }
}

impl ToQueryValue for DateTime<Utc> {
    fn to_query_value(&self) -> QueryValue {
        QueryValue::Timestamp(*self)
    }
}

impl ToQueryValue for Uuid {
    fn to_query_value(&self) -> QueryValue {
        QueryValue::String(self.to_string())
    }
}

impl<T: ToQueryValue> ToQueryValue for Option<T> {
    fn to_query_value(&self) -> QueryValue {
        match self {
            Some(v) => v.to_query_value(),
            None => QueryValue::Null,
        }
    }
}

impl<T: ToQueryValue> ToQueryValue for Vec<T> {
    fn to_query_value(&self) -> QueryValue {
        QueryValue::List(self.iter().map(|v| v.to_query_value()).collect())
    }
}

impl<T: ToQueryValue> ToQueryValue for [T] {
    fn to_query_value(&self) -> QueryValue {
        QueryValue::List(self.iter().map(|v| v.to_query_value()).collect())
    }
}

/// Builds a positional parameter list for repository invocations and templates.
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::query::QueryValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::query::ToQueryValue::to_query_value(&$value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn floats_keep_fraction() {
        assert_eq!(200.0_f64.to_query_value().to_string(), "200.0");
        assert_eq!(19.95_f64.to_query_value().to_string(), "19.95");
        assert_eq!(0.1_f32.to_query_value().to_string(), "0.1");
    }

    #[test]
    fn null_and_lists() {
        let none: Option<i32> = None;
        assert_eq!(none.to_query_value().to_string(), "null");
        assert_eq!(vec![1_i32, 2, 3].to_query_value().to_string(), "1 2 3");
    }

    #[test]
    fn timestamps_render_in_utc_millis() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(t.to_query_value().to_string(), "2024-03-01T12:30:00.000Z");
    }

    #[test]
    fn params_macro_mixes_types() {
        let values = crate::params!["x", 100, 200.0, true];
        assert_eq!(
            values,
            vec![
                QueryValue::String("x".to_string()),
                QueryValue::Int(100),
                QueryValue::Float(200.0),
                QueryValue::Bool(true),
            ]
        );
        assert!(crate::params![].is_empty());
    }
}
