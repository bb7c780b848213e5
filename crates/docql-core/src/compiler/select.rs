//! SELECT projection and the query orchestrator

use super::{CompileContext, compile, fragment_name, function::is_aggregate_call};
use crate::ast::{Node, PropertyItem};
use crate::plan::{Expr, Helper, Lambda, Table};
use crate::{Error, Result, Value};
use tracing::debug;

/// Clauses of one `select_query` node
pub(super) struct QueryClauses<'a> {
    pub top: Option<&'a Node>,
    pub select: &'a Node,
    pub from: Option<&'a Node>,
    pub where_clause: Option<&'a Node>,
    pub order_by: Option<&'a Node>,
}

pub(super) fn compile_select_query(ctx: &mut CompileContext, clauses: QueryClauses<'_>) -> Result<Expr> {
    // subqueries are not part of the grammar this compiler accepts
    if ctx.in_query {
        return Err(Error::unsupported("select_query"));
    }
    ctx.in_query = true;

    let source = match clauses.from {
        Some(from) => {
            ctx.plan = Some(Expr::Table(Table::Collection));
            compile(ctx, from)?
        }
        None => Expr::Array(vec![Expr::Literal(Value::Null)]),
    };
    ctx.plan = Some(source);

    for clause in [clauses.where_clause, clauses.order_by, clauses.top]
        .into_iter()
        .flatten()
    {
        let wrapped = compile(ctx, clause)?;
        ctx.plan = Some(wrapped);
    }

    let projection = compile(ctx, clauses.select)?;
    debug!(aggregating = ctx.aggregating, "compiled select_query");
    Ok(Expr::helper(Helper::StripUndefined, vec![projection]))
}

pub(super) fn compile_select_specification(
    ctx: &mut CompileContext,
    star: bool,
    properties: Option<&Node>,
    value: Option<&Node>,
) -> Result<Expr> {
    let source = ctx.take_pipeline();

    if star {
        let name = match &ctx.binding {
            Some(binding) if binding.cardinality() == 1 => binding.carried().first().cloned(),
            _ => None,
        };
        let Some(name) = name else {
            return Err(Error::AmbiguousStarProjection);
        };
        return Ok(Expr::Map {
            source: Box::new(source),
            lambda: Lambda::new(ctx.row_pattern(), Expr::Variable(name)),
        });
    }

    let projected = properties
        .or(value)
        .ok_or_else(|| Error::unsupported("select_specification"))?;

    ctx.aggregating = match properties {
        Some(Node::ObjectPropertyList { properties }) => properties
            .iter()
            .any(|item| is_aggregate_call(&item.property)),
        Some(other) => is_aggregate_call(other),
        None => is_aggregate_call(projected),
    };

    let projection = compile(ctx, projected)?;
    if ctx.aggregating {
        // the aggregate query collapses to one row computed from the cached rows
        return Ok(Expr::Sequence(vec![
            Expr::AssignCache(Box::new(source)),
            Expr::Array(vec![projection]),
        ]));
    }

    Ok(Expr::Map {
        source: Box::new(source),
        lambda: Lambda::new(ctx.row_pattern(), projection),
    })
}

/// `SELECT a, b AS x, a + 1` as one object per row.
///
/// A column is named by its alias, else by the property it reads, else
/// `$1`, `$2`, ... counting unnamed columns only.
pub(super) fn compile_property_list(ctx: &mut CompileContext, items: &[PropertyItem]) -> Result<Expr> {
    let mut unnamed = 0;
    let mut properties = Vec::with_capacity(items.len());
    for PropertyItem { property, alias } in items {
        let key = match alias.as_ref().or_else(|| member_property(property)) {
            Some(key) => fragment_name(&compile(ctx, key)?),
            None => {
                unnamed += 1;
                format!("${unnamed}")
            }
        };
        properties.push((key, compile(ctx, property)?));
    }
    Ok(Expr::Object(properties))
}

/// Property node of a member access, when the column reads one
fn member_property(node: &Node) -> Option<&Node> {
    match node {
        Node::ScalarMemberExpression { property, .. }
        | Node::CollectionMemberExpression { property, .. } => Some(property.as_ref()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{Binding, compile_query};
    use crate::plan::RowPattern;

    fn select_star() -> Node {
        Node::SelectSpecification {
            star: true,
            properties: None,
            value: None,
        }
    }

    #[test]
    fn test_star_requires_single_alias() {
        let mut ctx = CompileContext::new();
        ctx.binding = Some(Binding::Record(vec!["f".to_string(), "c".to_string()]));
        let err = compile_select_specification(&mut ctx, true, None, None).unwrap_err();
        assert!(matches!(err, Error::AmbiguousStarProjection));

        let mut ctx = CompileContext::new();
        ctx.binding = Some(Binding::Record(vec!["f".to_string()]));
        let expr = compile_select_specification(&mut ctx, true, None, None).unwrap();
        assert_eq!(ctx.row_pattern(), RowPattern::Record(vec!["f".to_string()]));
        assert_eq!(expr.to_string(), "$collection\n  .map({f} => f)");
    }

    #[test]
    fn test_star_without_from_is_rejected() {
        let query = Node::SelectQuery {
            top: None,
            select: Box::new(select_star()),
            from: None,
            where_clause: None,
            order_by: None,
        };
        assert!(matches!(
            compile_query(&query),
            Err(Error::AmbiguousStarProjection)
        ));
    }

    #[test]
    fn test_unnamed_columns_are_numbered() {
        let mut ctx = CompileContext::new();
        let items = vec![
            PropertyItem {
                property: Node::NumberConstant { value: 1.0 },
                alias: None,
            },
            PropertyItem {
                property: Node::ScalarMemberExpression {
                    object: Box::new(Node::ident("c")),
                    property: Box::new(Node::ident("id")),
                    computed: false,
                },
                alias: None,
            },
            PropertyItem {
                property: Node::NumberConstant { value: 2.0 },
                alias: None,
            },
            PropertyItem {
                property: Node::NumberConstant { value: 3.0 },
                alias: Some(Node::ident("three")),
            },
        ];
        let expr = compile_property_list(&mut ctx, &items).unwrap();
        assert_eq!(expr.to_string(), "{$1: 1, id: c.id, $2: 2, three: 3}");
    }

    #[test]
    fn test_nested_select_query_is_unsupported() {
        let mut ctx = CompileContext::new();
        ctx.in_query = true;
        let clauses = QueryClauses {
            top: None,
            select: &select_star(),
            from: None,
            where_clause: None,
            order_by: None,
        };
        let err = compile_select_query(&mut ctx, clauses).unwrap_err();
        assert!(matches!(err, Error::UnsupportedNodeKind(kind) if kind == "select_query"));
    }
}
