//! WHERE, ORDER BY and TOP
//!
//! Each clause takes the pipeline out of the context, wraps it and hands the
//! wrapped expression back to the orchestrator.

use super::{CompileContext, compile};
use crate::ast::{Node, SortOrder};
use crate::plan::{Expr, Helper, Key, Lambda};
use crate::{Result, Value};
use tracing::debug;

/// One ORDER BY key: a property path into the row and its direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Root-to-leaf property names; empty compares whole rows
    pub path: Vec<String>,
    /// Descending order
    pub descending: bool,
}

impl SortKey {
    /// Plan literal form: `[[path...], descending]`
    pub fn to_value(&self) -> Value {
        Value::Array(vec![
            Value::Array(self.path.iter().map(|p| Value::from(p.as_str())).collect()),
            Value::Bool(self.descending),
        ])
    }

    /// Read a key back from its plan literal form
    pub fn from_value(value: &Value) -> Option<SortKey> {
        let [path, descending] = value.as_array()? else {
            return None;
        };
        let path = path
            .as_array()?
            .iter()
            .map(|segment| segment.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()?;
        Some(SortKey {
            path,
            descending: descending.as_bool()?,
        })
    }
}

/// Property path a compiled sort expression reads from the row.
///
/// `f.age` gives `["f", "age"]` and `c.tags[0]` gives `["c", "tags", "0"]`.
/// Anything that is not a member chain rooted at a variable, or that
/// contains a computed key which is not a literal, gives an empty path.
pub fn sort_key_path(expr: &Expr) -> Vec<String> {
    if !expr.is_member() {
        return Vec::new();
    }

    let mut path = Vec::new();
    let mut current = expr;
    loop {
        match current {
            Expr::Member { object, key } => {
                let segment = match key {
                    Key::Name(name) => name.clone(),
                    Key::Computed(inner) => match inner.as_ref() {
                        Expr::Literal(Value::String(s)) => s.clone(),
                        Expr::Literal(number @ Value::Number(_)) => number.to_string(),
                        _ => return Vec::new(),
                    },
                };
                path.push(segment);
                current = object;
            }
            Expr::Variable(root) => {
                path.push(root.clone());
                break;
            }
            _ => return Vec::new(),
        }
    }
    path.reverse();
    path
}

pub(super) fn compile_where(ctx: &mut CompileContext, condition: &Node) -> Result<Expr> {
    let source = ctx.take_pipeline();
    let condition = compile(ctx, condition)?;
    debug!(pattern = %ctx.row_pattern(), "compiling WHERE");
    Ok(Expr::Filter {
        source: Box::new(source),
        lambda: Lambda::new(ctx.row_pattern(), Expr::strict_true(condition)),
    })
}

pub(super) fn compile_order_by(ctx: &mut CompileContext, expressions: &[Node]) -> Result<Expr> {
    let source = ctx.take_pipeline();
    let mut arguments = Vec::with_capacity(expressions.len() + 1);
    arguments.push(source);
    for expression in expressions {
        arguments.push(compile(ctx, expression)?);
    }
    debug!(keys = expressions.len(), "compiling ORDER BY");
    Ok(Expr::helper(Helper::Sort, arguments))
}

pub(super) fn compile_sort_expression(
    ctx: &mut CompileContext,
    expression: &Node,
    order: Option<SortOrder>,
) -> Result<Expr> {
    let expr = compile(ctx, expression)?;
    let key = SortKey {
        path: sort_key_path(&expr),
        descending: order == Some(SortOrder::Descending),
    };
    Ok(Expr::Literal(key.to_value()))
}

pub(super) fn compile_top(ctx: &mut CompileContext, value: &Node) -> Result<Expr> {
    let source = ctx.take_pipeline();
    let count = compile(ctx, value)?;
    debug!(count = %count, "compiling TOP");
    Ok(Expr::Slice {
        source: Box::new(source),
        count: Box::new(count),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    fn member(object: Expr, key: Key) -> Expr {
        Expr::Member {
            object: Box::new(object),
            key,
        }
    }

    #[test]
    fn test_sort_key_path_member_chain() {
        let expr = member(var("f"), Key::Name("age".to_string()));
        assert_eq!(sort_key_path(&expr), vec!["f", "age"]);
    }

    #[test]
    fn test_sort_key_path_literal_index() {
        let expr = member(
            member(var("c"), Key::Name("tags".to_string())),
            Key::Computed(Box::new(Expr::literal(0i64))),
        );
        assert_eq!(sort_key_path(&expr), vec!["c", "tags", "0"]);
    }

    #[test]
    fn test_sort_key_path_non_member_is_empty() {
        assert!(sort_key_path(&var("c")).is_empty());
        assert!(sort_key_path(&Expr::literal(1i64)).is_empty());

        let dynamic = member(var("c"), Key::Computed(Box::new(var("k"))));
        assert!(sort_key_path(&dynamic).is_empty());
    }

    #[test]
    fn test_sort_key_value_form() {
        let key = SortKey {
            path: vec!["f".to_string(), "age".to_string()],
            descending: true,
        };
        assert_eq!(SortKey::from_value(&key.to_value()), Some(key));
        assert_eq!(SortKey::from_value(&Value::from("f.age")), None);
    }

    #[test]
    fn test_top_wraps_pipeline() {
        let mut ctx = CompileContext::new();
        ctx.plan = Some(Expr::Table(crate::plan::Table::Collection));
        let expr = compile_top(&mut ctx, &Node::NumberConstant { value: 2.0 }).unwrap();
        assert_eq!(expr.to_string(), "$collection\n  .take(2)");
        assert!(ctx.plan.is_none());
    }
}
