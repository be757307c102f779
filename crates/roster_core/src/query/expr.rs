//! Typed expressions, predicates and sort specifiers.
//!
//! # Invariants
//! - Literal operands are always carried as bind values, never as SQL text.
//! - Number and string expressions only compare against operands of the
//!   same family.

use super::select::SubQuery;
use rusqlite::types::Value;
use std::marker::PhantomData;

/// Untyped expression tree rendered by the SQL writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column {
        alias: String,
        column: &'static str,
    },
    Value(Value),
    Aggregate {
        func: AggregateFn,
        arg: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Like {
        expr: Box<Expr>,
        pattern: String,
        escaped: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        items: Vec<Value>,
        negated: bool,
    },
    InSubQuery {
        expr: Box<Expr>,
        query: Box<SubQuery>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    SubQuery(Box<SubQuery>),
}

impl Expr {
    pub(crate) fn column(alias: &str, column: &'static str) -> Self {
        Self::Column {
            alias: alias.to_string(),
            column,
        }
    }

    pub(crate) fn logical(op: LogicalOp, left: Expr, right: Expr) -> Self {
        Self::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Self::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn aggregate(func: AggregateFn, arg: Expr) -> Self {
        Self::Aggregate {
            func,
            arg: Box::new(arg),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Goe,
    Lt,
    Loe,
}

impl CompareOp {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Goe => ">=",
            Self::Lt => "<",
            Self::Loe => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFn {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Max => "MAX",
            Self::Min => "MIN",
        }
    }
}

/// Anything usable in GROUP BY or as a raw expression.
pub trait Expression {
    fn to_expr(&self) -> Expr;
}

/// Right-hand side of a numeric comparison.
pub trait NumberOperand {
    fn into_operand(self) -> Expr;
}

impl NumberOperand for i32 {
    fn into_operand(self) -> Expr {
        Expr::Value(Value::Integer(i64::from(self)))
    }
}

impl NumberOperand for i64 {
    fn into_operand(self) -> Expr {
        Expr::Value(Value::Integer(self))
    }
}

impl NumberOperand for f64 {
    fn into_operand(self) -> Expr {
        Expr::Value(Value::Real(self))
    }
}

impl<T> NumberOperand for NumberExpr<T> {
    fn into_operand(self) -> Expr {
        self.expr
    }
}

impl<T> NumberOperand for &NumberExpr<T> {
    fn into_operand(self) -> Expr {
        self.expr.clone()
    }
}

impl NumberOperand for SubQuery {
    fn into_operand(self) -> Expr {
        Expr::SubQuery(Box::new(self))
    }
}

/// Right-hand side of a string comparison.
pub trait StringOperand {
    fn into_operand(self) -> Expr;
}

impl StringOperand for &str {
    fn into_operand(self) -> Expr {
        Expr::Value(Value::Text(self.to_string()))
    }
}

impl StringOperand for String {
    fn into_operand(self) -> Expr {
        Expr::Value(Value::Text(self))
    }
}

impl StringOperand for &String {
    fn into_operand(self) -> Expr {
        Expr::Value(Value::Text(self.clone()))
    }
}

impl StringOperand for StringExpr {
    fn into_operand(self) -> Expr {
        self.expr
    }
}

impl StringOperand for &StringExpr {
    fn into_operand(self) -> Expr {
        self.expr.clone()
    }
}

impl StringOperand for SubQuery {
    fn into_operand(self) -> Expr {
        Expr::SubQuery(Box::new(self))
    }
}

/// Boolean condition for WHERE, ON and HAVING clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    expr: Expr,
}

impl Predicate {
    fn new(expr: Expr) -> Self {
        Self { expr }
    }

    pub fn and(self, other: Predicate) -> Predicate {
        Self::new(Expr::logical(LogicalOp::And, self.expr, other.expr))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Self::new(Expr::logical(LogicalOp::Or, self.expr, other.expr))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Self::new(Expr::Not(Box::new(self.expr)))
    }

    /// Conjunction of all predicates, or `None` when the input is empty.
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
        predicates.into_iter().reduce(Predicate::and)
    }

    /// Disjunction of all predicates, or `None` when the input is empty.
    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
        predicates.into_iter().reduce(Predicate::or)
    }

    pub(crate) fn into_expr(self) -> Expr {
        self.expr
    }
}

impl Expression for Predicate {
    fn to_expr(&self) -> Expr {
        self.expr.clone()
    }
}

/// Maps a numeric column type to the type `SUM` produces for it.
pub trait Numeric {
    type Sum;
}

impl Numeric for i32 {
    type Sum = i64;
}

impl Numeric for i64 {
    type Sum = i64;
}

impl Numeric for f64 {
    type Sum = f64;
}

/// Numeric column, aggregate or derived value read back as `T`.
#[derive(Debug)]
pub struct NumberExpr<T> {
    expr: Expr,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for NumberExpr<T> {
    fn clone(&self) -> Self {
        Self::from_expr(self.expr.clone())
    }
}

impl<T> PartialEq for NumberExpr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl<T> NumberExpr<T> {
    pub(crate) fn from_expr(expr: Expr) -> Self {
        Self {
            expr,
            _value: PhantomData,
        }
    }

    pub(crate) fn column(alias: &str, column: &'static str) -> Self {
        Self::from_expr(Expr::column(alias, column))
    }

    fn compare(&self, op: CompareOp, rhs: impl NumberOperand) -> Predicate {
        Predicate::new(Expr::compare(op, self.expr.clone(), rhs.into_operand()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn eq(&self, rhs: impl NumberOperand) -> Predicate {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn ne(&self, rhs: impl NumberOperand) -> Predicate {
        self.compare(CompareOp::Ne, rhs)
    }

    pub fn gt(&self, rhs: impl NumberOperand) -> Predicate {
        self.compare(CompareOp::Gt, rhs)
    }

    /// Greater than or equal.
    pub fn goe(&self, rhs: impl NumberOperand) -> Predicate {
        self.compare(CompareOp::Goe, rhs)
    }

    pub fn lt(&self, rhs: impl NumberOperand) -> Predicate {
        self.compare(CompareOp::Lt, rhs)
    }

    /// Less than or equal.
    pub fn loe(&self, rhs: impl NumberOperand) -> Predicate {
        self.compare(CompareOp::Loe, rhs)
    }

    /// Inclusive range check.
    pub fn between(&self, low: impl NumberOperand, high: impl NumberOperand) -> Predicate {
        Predicate::new(Expr::Between {
            expr: Box::new(self.expr.clone()),
            low: Box::new(low.into_operand()),
            high: Box::new(high.into_operand()),
        })
    }

    pub fn in_list(&self, items: impl IntoIterator<Item = T>) -> Predicate
    where
        T: Into<Value>,
    {
        in_list(&self.expr, items.into_iter().map(Into::into).collect(), false)
    }

    pub fn not_in(&self, items: impl IntoIterator<Item = T>) -> Predicate
    where
        T: Into<Value>,
    {
        in_list(&self.expr, items.into_iter().map(Into::into).collect(), true)
    }

    pub fn in_sub_query(&self, query: SubQuery) -> Predicate {
        in_sub_query(&self.expr, query, false)
    }

    pub fn not_in_sub_query(&self, query: SubQuery) -> Predicate {
        in_sub_query(&self.expr, query, true)
    }

    pub fn is_null(&self) -> Predicate {
        is_null(&self.expr, false)
    }

    pub fn is_not_null(&self) -> Predicate {
        is_null(&self.expr, true)
    }

    pub fn asc(&self) -> OrderSpecifier {
        OrderSpecifier::new(self.expr.clone(), Direction::Asc)
    }

    pub fn desc(&self) -> OrderSpecifier {
        OrderSpecifier::new(self.expr.clone(), Direction::Desc)
    }

    /// `COUNT(expr)`: non-null values only.
    pub fn count(&self) -> NumberExpr<i64> {
        NumberExpr::from_expr(Expr::aggregate(AggregateFn::Count, self.expr.clone()))
    }

    pub fn sum(&self) -> NumberExpr<T::Sum>
    where
        T: Numeric,
    {
        NumberExpr::from_expr(Expr::aggregate(AggregateFn::Sum, self.expr.clone()))
    }

    /// SQLite averages are always floating point.
    pub fn avg(&self) -> NumberExpr<f64> {
        NumberExpr::from_expr(Expr::aggregate(AggregateFn::Avg, self.expr.clone()))
    }

    pub fn max(&self) -> NumberExpr<T> {
        NumberExpr::from_expr(Expr::aggregate(AggregateFn::Max, self.expr.clone()))
    }

    pub fn min(&self) -> NumberExpr<T> {
        NumberExpr::from_expr(Expr::aggregate(AggregateFn::Min, self.expr.clone()))
    }
}

impl<T> Expression for NumberExpr<T> {
    fn to_expr(&self) -> Expr {
        self.expr.clone()
    }
}

/// Text column or derived value.
#[derive(Debug, Clone, PartialEq)]
pub struct StringExpr {
    expr: Expr,
}

impl StringExpr {
    pub(crate) fn column(alias: &str, column: &'static str) -> Self {
        Self {
            expr: Expr::column(alias, column),
        }
    }

    fn compare(&self, op: CompareOp, rhs: impl StringOperand) -> Predicate {
        Predicate::new(Expr::compare(op, self.expr.clone(), rhs.into_operand()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn eq(&self, rhs: impl StringOperand) -> Predicate {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn ne(&self, rhs: impl StringOperand) -> Predicate {
        self.compare(CompareOp::Ne, rhs)
    }

    pub fn in_list<S: Into<String>>(&self, items: impl IntoIterator<Item = S>) -> Predicate {
        let values = items
            .into_iter()
            .map(|item| Value::Text(item.into()))
            .collect();
        in_list(&self.expr, values, false)
    }

    pub fn not_in<S: Into<String>>(&self, items: impl IntoIterator<Item = S>) -> Predicate {
        let values = items
            .into_iter()
            .map(|item| Value::Text(item.into()))
            .collect();
        in_list(&self.expr, values, true)
    }

    /// Raw `LIKE` with caller-supplied `%`/`_` wildcards.
    pub fn like(&self, pattern: impl Into<String>) -> Predicate {
        self.like_with(pattern.into(), false)
    }

    /// Substring match; wildcard characters in `needle` match literally.
    pub fn contains(&self, needle: &str) -> Predicate {
        self.like_with(format!("%{}%", escape_like(needle)), true)
    }

    pub fn starts_with(&self, prefix: &str) -> Predicate {
        self.like_with(format!("{}%", escape_like(prefix)), true)
    }

    pub fn ends_with(&self, suffix: &str) -> Predicate {
        self.like_with(format!("%{}", escape_like(suffix)), true)
    }

    fn like_with(&self, pattern: String, escaped: bool) -> Predicate {
        Predicate::new(Expr::Like {
            expr: Box::new(self.expr.clone()),
            pattern,
            escaped,
        })
    }

    pub fn is_null(&self) -> Predicate {
        is_null(&self.expr, false)
    }

    pub fn is_not_null(&self) -> Predicate {
        is_null(&self.expr, true)
    }

    pub fn asc(&self) -> OrderSpecifier {
        OrderSpecifier::new(self.expr.clone(), Direction::Asc)
    }

    pub fn desc(&self) -> OrderSpecifier {
        OrderSpecifier::new(self.expr.clone(), Direction::Desc)
    }

    pub fn count(&self) -> NumberExpr<i64> {
        NumberExpr::from_expr(Expr::aggregate(AggregateFn::Count, self.expr.clone()))
    }

    pub fn max(&self) -> StringExpr {
        Self {
            expr: Expr::aggregate(AggregateFn::Max, self.expr.clone()),
        }
    }

    pub fn min(&self) -> StringExpr {
        Self {
            expr: Expr::aggregate(AggregateFn::Min, self.expr.clone()),
        }
    }
}

impl Expression for StringExpr {
    fn to_expr(&self) -> Expr {
        self.expr.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpecifier {
    pub(crate) expr: Expr,
    pub(crate) direction: Direction,
    pub(crate) nulls: Option<NullsOrder>,
}

impl OrderSpecifier {
    fn new(expr: Expr, direction: Direction) -> Self {
        Self {
            expr,
            direction,
            nulls: None,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }
}

fn in_list(expr: &Expr, items: Vec<Value>, negated: bool) -> Predicate {
    Predicate::new(Expr::InList {
        expr: Box::new(expr.clone()),
        items,
        negated,
    })
}

fn in_sub_query(expr: &Expr, query: SubQuery, negated: bool) -> Predicate {
    Predicate::new(Expr::InSubQuery {
        expr: Box::new(expr.clone()),
        query: Box::new(query),
        negated,
    })
}

fn is_null(expr: &Expr, negated: bool) -> Predicate {
    Predicate::new(Expr::IsNull {
        expr: Box::new(expr.clone()),
        negated,
    })
}

/// Escapes LIKE wildcards for use with `ESCAPE '\'`.
pub(crate) fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{escape_like, NumberExpr, Predicate, StringExpr};

    #[test]
    fn escape_like_protects_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn all_and_any_are_none_for_empty_input() {
        assert!(Predicate::all(Vec::new()).is_none());
        assert!(Predicate::any(Vec::new()).is_none());
    }

    #[test]
    fn all_folds_left_to_right() {
        let age: NumberExpr<i32> = NumberExpr::column("m", "age");
        let name = StringExpr::column("m", "user_name");
        let folded = Predicate::all([name.eq("a"), age.gt(1), age.lt(9)]).unwrap();
        let manual = name.eq("a").and(age.gt(1)).and(age.lt(9));
        assert_eq!(folded, manual);
    }
}
