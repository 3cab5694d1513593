//! Explicit query specifications: filter predicates, sort orders and bulk mutations.
//!
//! Finders are built from these values at the call site instead of being
//! inferred from method names. Backends render them to SQL; in-memory stores
//! evaluate them directly against a row image (`columns` + `values`).

use crate::ParamValue;
use std::cmp::Ordering;

/// Binary comparison operators supported in predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    fn accepts(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
        }
    }
}

/// One condition on a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        column: String,
        op: CompareOp,
        value: ParamValue,
    },
    In {
        column: String,
        values: Vec<ParamValue>,
    },
    IsNull {
        column: String,
    },
    IsNotNull {
        column: String,
    },
}

impl Condition {
    pub fn column(&self) -> &str {
        match self {
            Condition::Compare { column, .. }
            | Condition::In { column, .. }
            | Condition::IsNull { column }
            | Condition::IsNotNull { column } => column,
        }
    }

    /// Evaluates against one column value. Comparisons with `Null` never match.
    pub fn matches(&self, value: &ParamValue) -> bool {
        match self {
            Condition::Compare { op, value: rhs, .. } => {
                value.compare(rhs).map_or(false, |ord| op.accepts(ord))
            }
            Condition::In { values, .. } => values
                .iter()
                .any(|v| value.compare(v) == Some(Ordering::Equal)),
            Condition::IsNull { .. } => value.is_null(),
            Condition::IsNotNull { .. } => !value.is_null(),
        }
    }
}

/// A conjunction of conditions. The empty predicate matches every row.
///
/// ```
/// use pageit_core::Predicate;
/// let p = Predicate::all().eq("username", "AAA").gt("age", 15);
/// assert_eq!(p.conditions().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn compare(
        mut self,
        column: impl Into<String>,
        op: CompareOp,
        value: impl Into<ParamValue>,
    ) -> Self {
        self.conditions.push(Condition::Compare {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.compare(column, CompareOp::Eq, value)
    }

    pub fn ne(self, column: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.compare(column, CompareOp::Ne, value)
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.compare(column, CompareOp::Gt, value)
    }

    pub fn ge(self, column: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.compare(column, CompareOp::Ge, value)
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.compare(column, CompareOp::Lt, value)
    }

    pub fn le(self, column: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.compare(column, CompareOp::Le, value)
    }

    /// Membership test. An empty list matches nothing.
    pub fn is_in<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        self.conditions.push(Condition::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.push(Condition::IsNull {
            column: column.into(),
        });
        self
    }

    pub fn is_not_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.push(Condition::IsNotNull {
            column: column.into(),
        });
        self
    }

    /// Conjunction of both predicates.
    pub fn and(mut self, other: Predicate) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.conditions.iter().map(Condition::column)
    }

    /// Evaluates against a row image. A condition on a column missing from
    /// `columns` does not match.
    pub fn matches(&self, columns: &[&str], values: &[ParamValue]) -> bool {
        self.conditions.iter().all(|c| {
            column_value(columns, values, c.column()).map_or(false, |v| c.matches(v))
        })
    }
}

fn column_value<'v>(columns: &[&str], values: &'v [ParamValue], column: &str) -> Option<&'v ParamValue> {
    columns
        .iter()
        .position(|c| *c == column)
        .and_then(|i| values.get(i))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    /// Case-insensitive `asc` / `desc`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }
}

/// Ordering on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    column: String,
    direction: Direction,
}

impl Sort {
    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Desc)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Parses `column` or `column,asc|desc` (the query-string form).
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(2, ',');
        let column = parts.next()?.trim();
        if column.is_empty() {
            return None;
        }
        let direction = match parts.next() {
            Some(d) => Direction::parse(d)?,
            None => Direction::Asc,
        };
        Some(Self::new(column, direction))
    }

    /// Orders two row images by this sort. `Null` sorts before any value in
    /// ascending order, as SQLite does.
    pub fn compare_rows(&self, columns: &[&str], a: &[ParamValue], b: &[ParamValue]) -> Ordering {
        let left = column_value(columns, a, &self.column).unwrap_or(&ParamValue::Null);
        let right = column_value(columns, b, &self.column).unwrap_or(&ParamValue::Null);
        let ord = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => left.compare(right).unwrap_or(Ordering::Equal),
        };
        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

/// One column assignment of a bulk update.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Set { column: String, value: ParamValue },
    Increment { column: String, delta: ParamValue },
}

impl Assignment {
    pub fn column(&self) -> &str {
        match self {
            Assignment::Set { column, .. } | Assignment::Increment { column, .. } => column,
        }
    }
}

/// The SET side of a bulk update, applied to every row a predicate matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mutation {
    assignments: Vec<Assignment>,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.assignments.push(Assignment::Set {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// `column = column + delta`
    pub fn increment(mut self, column: impl Into<String>, delta: impl Into<ParamValue>) -> Self {
        self.assignments.push(Assignment::Increment {
            column: column.into(),
            delta: delta.into(),
        });
        self
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.assignments.iter().map(Assignment::column)
    }

    /// Applies the assignments to a row image in place.
    pub fn apply(&self, columns: &[&str], values: &mut [ParamValue]) {
        for a in &self.assignments {
            let Some(i) = columns.iter().position(|c| *c == a.column()) else {
                continue;
            };
            let Some(slot) = values.get_mut(i) else {
                continue;
            };
            match a {
                Assignment::Set { value, .. } => *slot = value.clone(),
                Assignment::Increment { delta, .. } => *slot = add(slot, delta),
            }
        }
    }
}

// NULL + x stays NULL; the column's own width is kept.
fn add(current: &ParamValue, delta: &ParamValue) -> ParamValue {
    match (current, delta) {
        (ParamValue::I32(a), ParamValue::I32(d)) => int_sum(i64::from(*a), i64::from(*d), true),
        (ParamValue::I32(a), ParamValue::I64(d)) => int_sum(i64::from(*a), *d, true),
        (ParamValue::I64(a), ParamValue::I32(d)) => int_sum(*a, i64::from(*d), false),
        (ParamValue::I64(a), ParamValue::I64(d)) => int_sum(*a, *d, false),
        (ParamValue::F64(a), ParamValue::F64(d)) => ParamValue::F64(a + d),
        (ParamValue::F64(a), ParamValue::I32(d)) => ParamValue::F64(a + f64::from(*d)),
        (ParamValue::F64(a), ParamValue::I64(d)) => ParamValue::F64(a + *d as f64),
        _ => ParamValue::Null,
    }
}

/// Integer addition as SQLite does it: 64-bit, falling back to a float on
/// overflow. `narrow` keeps an `I32` column as `I32` while the sum fits.
fn int_sum(a: i64, d: i64, narrow: bool) -> ParamValue {
    match a.checked_add(d) {
        Some(sum) if narrow => i32::try_from(sum).map_or(ParamValue::I64(sum), ParamValue::I32),
        Some(sum) => ParamValue::I64(sum),
        None => ParamValue::F64(a as f64 + d as f64),
    }
}
