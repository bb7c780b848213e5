//! Function calls and aggregate detection

use super::{CompileContext, compile, fragment_name};
use crate::ast::Node;
use crate::plan::{Expr, FunctionKind, Lambda, Table};
use crate::Result;
use tracing::trace;

/// Names dispatched to the aggregate table when SELECT aggregates
pub const AGGREGATE_FUNCTIONS: &[&str] = &["AVG", "COUNT", "MAX", "MIN", "SUM"];

/// True when `node` is a call to one of [`AGGREGATE_FUNCTIONS`].
///
/// Only the node itself is inspected; an aggregate nested inside another
/// expression does not make the projection aggregate.
pub fn is_aggregate_call(node: &Node) -> bool {
    match node {
        Node::ScalarFunctionExpression { name, udf, .. } if !udf => {
            called_name(name).is_some_and(|name| is_aggregate_name(&name))
        }
        _ => false,
    }
}

fn is_aggregate_name(name: &str) -> bool {
    AGGREGATE_FUNCTIONS
        .iter()
        .any(|aggregate| aggregate.eq_ignore_ascii_case(name))
}

/// Function name as written, without compiling the node
fn called_name(name: &Node) -> Option<String> {
    match name {
        Node::Identifier { name } | Node::StringConstant { value: name } => Some(name.clone()),
        _ => None,
    }
}

pub(super) fn compile_function(
    ctx: &mut CompileContext,
    name: &Node,
    arguments: &[Node],
    udf: bool,
) -> Result<Expr> {
    let name = fragment_name(&compile(ctx, name)?);
    let aggregate = ctx.aggregating && !udf && is_aggregate_name(&name);

    if aggregate {
        // every argument becomes the column of per-row values over the cached rows
        let pattern = ctx.row_pattern();
        let mut columns = Vec::with_capacity(arguments.len());
        for argument in arguments {
            columns.push(Expr::Map {
                source: Box::new(Expr::Table(Table::Cache)),
                lambda: Lambda::new(pattern.clone(), compile(ctx, argument)?),
            });
        }
        trace!(function = %name, "aggregate call");
        return Ok(Expr::Function {
            kind: FunctionKind::Aggregate,
            name: name.to_uppercase(),
            arguments: columns,
        });
    }

    let arguments = arguments
        .iter()
        .map(|argument| compile(ctx, argument))
        .collect::<Result<Vec<_>>>()?;
    Ok(Expr::Function {
        kind: if udf {
            FunctionKind::Udf
        } else {
            FunctionKind::Builtin
        },
        name,
        arguments,
    })
}
