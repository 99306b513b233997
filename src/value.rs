use std::fmt;

/// A single cell scalar.
///
/// `Missing` is the sentinel for an absent cell: an empty field in the
/// source, or an ancestor column for a row that does not descend from that
/// ancestor. It is distinct from `Text("")` and from `Number(0.0)`; parsing
/// never produces an empty `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
}

impl Value {
    /// Parse a raw source field. Empty (after trimming) is `Missing`,
    /// numeric-looking fields become `Number`, anything else `Text`.
    pub fn parse(field: &str) -> Self {
        let field = field.trim();
        if field.is_empty() {
            return Value::Missing;
        }
        match field.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(field.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Exact-match test against a caller-supplied filter value.
    ///
    /// Numeric cells compare numerically when the filter parses as a number;
    /// text cells compare as strings. `Missing` matches nothing.
    pub fn matches(&self, filter: &str) -> bool {
        match self {
            Value::Missing => false,
            Value::Number(n) => filter.trim().parse::<f64>().is_ok_and(|f| f == *n),
            Value::Text(t) => t == filter,
        }
    }

    /// The cell as a number, if it is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Text(t) => f.write_str(t),
        }
    }
}
