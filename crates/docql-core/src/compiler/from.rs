//! FROM / JOIN pipeline
//!
//! Every source folds one step onto the pipeline. A step receives each row
//! built so far and yields zero or more rows binding one more alias:
//!
//! ```text
//! FROM Families f JOIN c IN f.children
//!
//! $collection
//!   .flat_map(Families => (defined(Families) ? [{f: Families}] : []))
//!   .flat_map({f} => (f.children || []).map(c => {f: f, c: c}))
//! ```

use super::{Binding, CompileContext, compile, fragment_name};
use crate::ast::Node;
use crate::plan::{Expr, Lambda, NativeOp, RowPattern};
use crate::Result;
use tracing::{debug, trace};

/// Pattern used when the first source is not rooted at a name
const ANONYMOUS_ROOT: &str = "$root";

pub(super) fn compile_from(ctx: &mut CompileContext, source: &Node, joins: &[Node]) -> Result<Expr> {
    let mut pipeline = ctx.take_pipeline();

    for node in std::iter::once(source).chain(joins) {
        let (expression, alias, iteration) = match node {
            Node::FromSource {
                expression,
                alias,
                iteration,
            } => (expression.as_ref(), alias.as_deref(), *iteration),
            other => (other, None, false),
        };

        let exp = compile(ctx, expression)?;
        let name = match alias {
            Some(alias) => fragment_name(&compile(ctx, alias)?),
            None => fragment_name(&exp),
        };

        let previous = match ctx.binding.take() {
            Some(binding) => binding,
            None => Binding::Row(root_name(&exp)),
        };
        let next = previous.extend(&name);

        trace!(alias = %name, iteration, source = %exp, "binding FROM source");

        let lambda = if iteration {
            iteration_step(&previous, &name, exp)
        } else {
            conditional_step(&previous, &name, exp)
        };
        pipeline = Expr::FlatMap {
            source: Box::new(pipeline),
            lambda,
        };
        ctx.binding = Some(next);
    }

    debug!(
        sources = joins.len() + 1,
        pattern = %ctx.row_pattern(),
        "compiled FROM pipeline"
    );
    Ok(pipeline)
}

/// Name the first source's rows are bound to: the collection reference
/// itself, or the root identifier of a member chain
fn root_name(exp: &Expr) -> String {
    let mut current = exp;
    loop {
        match current {
            Expr::Variable(name) => return name.clone(),
            Expr::Member { object, .. } => current = object,
            _ => return ANONYMOUS_ROOT.to_string(),
        }
    }
}

/// Properties of the previous row, copied into the next one
fn carried_fields(previous: &Binding, except: &str) -> Vec<(String, Expr)> {
    previous
        .carried()
        .iter()
        .filter(|name| name.as_str() != except)
        .map(|name| (name.clone(), Expr::Variable(name.clone())))
        .collect()
}

/// `JOIN name IN exp`: one row per element of `exp`; absent or falsy
/// arrays produce no rows
fn iteration_step(previous: &Binding, name: &str, exp: Expr) -> Lambda {
    let mut fields = carried_fields(previous, name);
    fields.push((name.to_string(), Expr::Variable(name.to_string())));

    let elements = Expr::native(NativeOp::Or, exp, Expr::Array(Vec::new()));
    Lambda::new(
        previous.pattern(),
        Expr::Map {
            source: Box::new(elements),
            lambda: Lambda::new(RowPattern::Row(name.to_string()), Expr::Object(fields)),
        },
    )
}

/// `JOIN exp` and plain sources: keep the row unless `exp` is absent
fn conditional_step(previous: &Binding, name: &str, exp: Expr) -> Lambda {
    let mut fields = carried_fields(previous, name);
    fields.push((name.to_string(), exp.clone()));

    Lambda::new(
        previous.pattern(),
        Expr::Conditional {
            test: Box::new(Expr::IsDefined(Box::new(exp))),
            consequent: Box::new(Expr::Array(vec![Expr::Object(fields)])),
            alternate: Box::new(Expr::Array(Vec::new())),
        },
    )
}
