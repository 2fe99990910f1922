//! Filter predicates and ordering, expressed as data so stores can
//! translate them instead of running opaque closures.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::value::Value;

/// Comparison operator of a field test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn holds(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (CompareOp::Eq, Some(o)) => o == Ordering::Equal,
            (CompareOp::Ne, Some(o)) => o != Ordering::Equal,
            (CompareOp::Ne, None) => true,
            (CompareOp::Lt, Some(o)) => o == Ordering::Less,
            (CompareOp::Le, Some(o)) => o != Ordering::Greater,
            (CompareOp::Gt, Some(o)) => o == Ordering::Greater,
            (CompareOp::Ge, Some(o)) => o != Ordering::Less,
            (_, None) => false,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A boolean expression over a record's scalar fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    True,
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn le(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Le, value)
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn ge(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ge, value)
    }

    pub fn compare(field: &str, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    /// Conjunction of `self` and `other`, flattening nested `And`s.
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::True, p) | (p, Predicate::True) => p,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, q) => Predicate::And(vec![p, q]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(vec![self, other])
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Evaluates the predicate against a record. Missing fields read as null.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::True => true,
            Predicate::Compare { field, op, value } => {
                let actual = record.get(field);
                if actual.is_null() || value.is_null() {
                    // null only equals null
                    let both = actual.is_null() && value.is_null();
                    return match op {
                        CompareOp::Eq => both,
                        CompareOp::Ne => !both,
                        _ => false,
                    };
                }
                op.holds(actual.partial_cmp(value))
            }
            Predicate::And(parts) => parts.iter().all(|p| p.matches(record)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(record)),
            Predicate::Not(inner) => !inner.matches(record),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => f.write_str("true"),
            Predicate::Compare { field, op, value } => {
                write!(f, "{} {} {}", field, op.symbol(), value)
            }
            Predicate::And(parts) => write_joined(f, parts, "&&"),
            Predicate::Or(parts) => write_joined(f, parts, "||"),
            Predicate::Not(inner) => write!(f, "!{}", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Predicate], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", sep)?;
        }
        write!(f, "{}", p)?;
    }
    write!(f, ")")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Ordering by one scalar field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        OrderBy {
            field: field.to_string(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: &str) -> Self {
        OrderBy {
            field: field.to_string(),
            direction: Direction::Descending,
        }
    }

    /// The same field in the opposite direction.
    pub fn reversed(&self) -> Self {
        OrderBy {
            field: self.field.clone(),
            direction: match self.direction {
                Direction::Ascending => Direction::Descending,
                Direction::Descending => Direction::Ascending,
            },
        }
    }

    /// Compares two records by this ordering.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ord = a.get(&self.field).total_cmp(b.get(&self.field));
        match self.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i64) -> Record {
        Record::new("OrderLine").with("qty", qty).with("sku", "A-1")
    }

    #[test]
    fn comparisons() {
        let r = line(3);
        assert!(Predicate::eq("qty", 3).matches(&r));
        assert!(Predicate::gt("qty", 2).matches(&r));
        assert!(!Predicate::lt("qty", 3).matches(&r));
        assert!(Predicate::le("qty", 3).matches(&r));
        assert!(Predicate::ne("sku", "B-2").matches(&r));
    }

    #[test]
    fn null_semantics() {
        let r = line(1);
        assert!(Predicate::eq("missing", Value::Null).matches(&r));
        assert!(!Predicate::eq("missing", 1).matches(&r));
        assert!(Predicate::ne("missing", 1).matches(&r));
        assert!(!Predicate::gt("missing", 0).matches(&r));
    }

    #[test]
    fn and_flattens_and_drops_true() {
        let p = Predicate::True
            .and(Predicate::eq("a", 1))
            .and(Predicate::eq("b", 2))
            .and(Predicate::eq("c", 3));
        match p {
            Predicate::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_kinds_never_match_ordering_ops() {
        let r = line(1);
        assert!(!Predicate::eq("qty", "1").matches(&r));
        assert!(!Predicate::gt("qty", "0").matches(&r));
    }

    #[test]
    fn display() {
        let p = Predicate::eq("tenant_id", 1).and(Predicate::eq("local_id", 2));
        assert_eq!(p.to_string(), "(tenant_id == 1 && local_id == 2)");
    }

    #[test]
    fn order_by_descending() {
        let mut rows = vec![line(1), line(3), line(2)];
        let order = OrderBy::desc("qty");
        rows.sort_by(|a, b| order.compare(a, b));
        let qtys: Vec<_> = rows.iter().map(|r| r.get("qty").clone()).collect();
        assert_eq!(qtys, vec![Value::Int(3), Value::Int(2), Value::Int(1)]);
        assert_eq!(order.reversed(), OrderBy::asc("qty"));
    }
}
