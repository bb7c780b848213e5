//! Query compiler - grammar tree to executable plan
//!
//! Compilation is a single walk over the grammar tree. Every handler goes
//! through [`compile`] to lower a child node, so the mapping from grammar
//! kinds to plan fragments lives in one exhaustive `match`.
//!
//! Clause order is fixed by the `select_query` handler:
//!
//! ```text
//! FROM (or a single null row) -> WHERE -> ORDER BY -> TOP -> SELECT
//! ```
//!
//! Each clause wraps the pipeline built so far. Only the FROM compiler
//! changes the row-binding shape; later clauses read it to know which names
//! are in scope for a row.

mod clauses;
mod from;
mod function;
mod scalar;
mod select;

pub use clauses::{SortKey, sort_key_path};
pub use function::{AGGREGATE_FUNCTIONS, is_aggregate_call};

use crate::ast::Node;
use crate::plan::{Expr, RowPattern, Table};
use crate::runtime::CompiledQuery;
use crate::{Error, Result};

/// Names bound for each row of the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// The whole row under one name; only seen while the first source is compiled
    Row(String),
    /// Every alias bound by FROM/JOIN so far, in binding order
    Record(Vec<String>),
}

impl Binding {
    /// Number of aliases a `SELECT *` would have to choose from
    pub fn cardinality(&self) -> usize {
        match self {
            Binding::Row(_) => 1,
            Binding::Record(names) => names.len(),
        }
    }

    /// Lambda parameter pattern for this shape
    pub fn pattern(&self) -> RowPattern {
        match self {
            Binding::Row(name) => RowPattern::Row(name.clone()),
            Binding::Record(names) => RowPattern::Record(names.clone()),
        }
    }

    /// Names carried forward into the next row object
    pub(crate) fn carried(&self) -> &[String] {
        match self {
            Binding::Row(_) => &[],
            Binding::Record(names) => names,
        }
    }

    /// Shape after binding `alias`
    pub(crate) fn extend(&self, alias: &str) -> Binding {
        let mut names = self.carried().to_vec();
        if !names.iter().any(|name| name == alias) {
            names.push(alias.to_string());
        }
        Binding::Record(names)
    }
}

/// Mutable state threaded through one compilation
#[derive(Debug, Default)]
pub struct CompileContext {
    /// Pipeline built so far
    pub plan: Option<Expr>,
    /// Row-binding shape
    pub binding: Option<Binding>,
    /// Set once SELECT decides the projection aggregates
    pub aggregating: bool,
    in_query: bool,
}

impl CompileContext {
    /// Fresh context for one compile call
    pub fn new() -> Self {
        Self::default()
    }

    /// Lambda pattern for the current shape
    pub fn row_pattern(&self) -> RowPattern {
        self.binding
            .as_ref()
            .map(Binding::pattern)
            .unwrap_or(RowPattern::None)
    }

    /// Take the pipeline for wrapping; a clause compiled on its own reads the collection
    pub(crate) fn take_pipeline(&mut self) -> Expr {
        self.plan.take().unwrap_or(Expr::Table(Table::Collection))
    }
}

/// Compile one grammar node into a plan fragment
pub fn compile(ctx: &mut CompileContext, node: &Node) -> Result<Expr> {
    match node {
        Node::SelectQuery {
            top,
            select,
            from,
            where_clause,
            order_by,
        } => select::compile_select_query(
            ctx,
            select::QueryClauses {
                top: top.as_deref(),
                select,
                from: from.as_deref(),
                where_clause: where_clause.as_deref(),
                order_by: order_by.as_deref(),
            },
        ),
        Node::SelectSpecification {
            star,
            properties,
            value,
        } => select::compile_select_specification(
            ctx,
            *star,
            properties.as_deref(),
            value.as_deref(),
        ),
        Node::FromSpecification { source, joins } => from::compile_from(ctx, source, joins),
        Node::FromSource {
            expression, alias, ..
        } => compile(ctx, alias.as_deref().unwrap_or(expression.as_ref())),
        Node::CollectionExpression { expression } => compile(ctx, expression),
        Node::CollectionMemberExpression {
            object,
            property,
            computed,
        }
        | Node::ScalarMemberExpression {
            object,
            property,
            computed,
        } => scalar::compile_member(ctx, object, property, *computed),
        Node::FilterCondition { condition } => clauses::compile_where(ctx, condition),
        Node::SortSpecification { expressions } => clauses::compile_order_by(ctx, expressions),
        Node::SortExpression { expression, order } => {
            clauses::compile_sort_expression(ctx, expression, *order)
        }
        Node::TopSpecification { value } => clauses::compile_top(ctx, value),
        Node::Identifier { name } => Ok(Expr::Variable(name.clone())),
        Node::ParameterName { name } => Ok(scalar::compile_parameter(name)),
        Node::ObjectConstant { properties } | Node::ScalarObjectExpression { properties } => {
            scalar::compile_object(ctx, properties)
        }
        Node::ObjectPropertyList { properties } => select::compile_property_list(ctx, properties),
        Node::ArrayConstant { elements } | Node::ScalarArrayExpression { elements } => {
            scalar::compile_array(ctx, elements)
        }
        Node::ScalarBinaryExpression {
            left,
            operator,
            right,
        } => scalar::compile_binary(ctx, left, *operator, right),
        Node::ScalarUnaryExpression { operator, argument } => {
            scalar::compile_unary(ctx, *operator, argument)
        }
        Node::ScalarConditionalExpression {
            test,
            consequent,
            alternate,
        } => scalar::compile_conditional(ctx, test, consequent, alternate),
        Node::ScalarBetweenExpression { value, begin, end } => {
            scalar::compile_between(ctx, value, begin, end)
        }
        Node::ScalarInExpression { value, list } => scalar::compile_in(ctx, value, list),
        Node::ScalarFunctionExpression {
            name,
            arguments,
            udf,
        } => function::compile_function(ctx, name, arguments, *udf),
        Node::BooleanConstant { value } => Ok(Expr::literal(*value)),
        Node::NumberConstant { value } => Ok(Expr::literal(*value)),
        Node::StringConstant { value } => Ok(Expr::literal(value.as_str())),
        Node::NullConstant => Ok(Expr::Literal(crate::Value::Null)),
        Node::UndefinedConstant => Ok(Expr::Literal(crate::Value::Undefined)),
    }
}

/// Compile a full query. The root must be a `select_query` node.
pub fn compile_query(node: &Node) -> Result<CompiledQuery> {
    if !matches!(node, Node::SelectQuery { .. }) {
        return Err(Error::unsupported(node.kind()));
    }
    let mut ctx = CompileContext::new();
    let body = compile(&mut ctx, node)?;
    Ok(CompiledQuery::new(body))
}

/// Name a plan fragment stands for when used as an alias or object key
pub(crate) fn fragment_name(expr: &Expr) -> String {
    match expr {
        Expr::Variable(name) => name.clone(),
        Expr::Literal(crate::Value::String(s)) => s.clone(),
        Expr::Literal(value) => value.to_string(),
        Expr::Member { key, .. } => match key {
            crate::plan::Key::Name(name) => name.clone(),
            crate::plan::Key::Computed(inner) => fragment_name(inner),
        },
        other => other.to_string(),
    }
}
