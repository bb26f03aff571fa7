//! Row filters shared by every record store backend

use serde_json::Value;
use std::cmp::Ordering;

/// Operator for filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to
    Eq,

    /// Not equal to
    Neq,

    /// Greater than
    Gt,

    /// Greater than or equal to
    Gte,

    /// Less than
    Lt,

    /// Less than or equal to
    Lte,

    /// In a list of values
    In,

    /// Is (null / true / false)
    Is,
}

impl FilterOperator {
    /// Convert the operator to its PostgREST string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::In => "in",
            FilterOperator::Is => "is",
        }
    }
}

/// A single `column <op> value` predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl Filter {
    pub fn new(column: &str, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(column: &str, value: impl ToString) -> Self {
        Self::new(column, FilterOperator::Eq, Value::String(value.to_string()))
    }

    /// `column IN (values)`
    pub fn in_list<T: ToString>(column: &str, values: &[T]) -> Self {
        let values = values
            .iter()
            .map(|v| Value::String(v.to_string()))
            .collect::<Vec<_>>();
        Self::new(column, FilterOperator::In, Value::Array(values))
    }

    /// `column IS NULL`
    pub fn is_null(column: &str) -> Self {
        Self::new(column, FilterOperator::Is, Value::Null)
    }

    /// The query-string value PostgREST expects, e.g. `eq.42` or `in.(a,b)`
    pub fn to_param(&self) -> String {
        let value = match (&self.operator, &self.value) {
            (FilterOperator::In, Value::Array(items)) => {
                let items = items.iter().map(render).collect::<Vec<_>>();
                format!("({})", items.join(","))
            }
            (_, value) => render(value),
        };
        format!("{}.{}", self.operator.as_str(), value)
    }

    /// Evaluate the predicate against a JSON row
    pub fn matches(&self, row: &Value) -> bool {
        let actual = row.get(&self.column).unwrap_or(&Value::Null);
        match self.operator {
            FilterOperator::Eq => loose_eq(actual, &self.value),
            FilterOperator::Neq => !loose_eq(actual, &self.value),
            FilterOperator::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            FilterOperator::Gte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            FilterOperator::Lte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOperator::In => match &self.value {
                Value::Array(items) => items.iter().any(|item| loose_eq(actual, item)),
                other => loose_eq(actual, other),
            },
            FilterOperator::Is => actual == &self.value,
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// Query-string values arrive as text, so `"5"` must equal `5`.
fn loose_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            compare(actual, expected) == Some(Ordering::Equal)
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            s == if *b { "true" } else { "false" }
        }
        _ => actual == expected,
    }
}

/// Ordering between two JSON scalars, numbers compared numerically
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (a, b) {
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            _ => None,
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}
