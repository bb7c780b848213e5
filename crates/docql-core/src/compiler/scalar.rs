//! Scalar expressions: literals, member access, operators, BETWEEN, IN

use super::{CompileContext, compile, fragment_name};
use crate::ast::{BinaryOperator, Node, ObjectEntry, UnaryOperator};
use crate::plan::{ArithmeticOp, CompareOp, Expr, Helper, Key, NativeOp, UnaryArithmeticOp};
use crate::{Result, Value};

/// `@name` reads the parameter bag under `name`
pub(super) fn compile_parameter(name: &str) -> Expr {
    Expr::Parameter(name.strip_prefix('@').unwrap_or(name).to_string())
}

pub(super) fn compile_member(
    ctx: &mut CompileContext,
    object: &Node,
    property: &Node,
    computed: bool,
) -> Result<Expr> {
    let object = compile(ctx, object)?;
    let property = compile(ctx, property)?;
    let key = match property {
        Expr::Variable(name) if !computed => Key::Name(name),
        Expr::Literal(Value::String(name)) if !computed => Key::Name(name),
        other => Key::Computed(Box::new(other)),
    };
    Ok(Expr::Member {
        object: Box::new(object),
        key,
    })
}

pub(super) fn compile_object(ctx: &mut CompileContext, entries: &[ObjectEntry]) -> Result<Expr> {
    let mut properties = Vec::with_capacity(entries.len());
    for ObjectEntry { key, value } in entries {
        let key = fragment_name(&compile(ctx, key)?);
        properties.push((key, compile(ctx, value)?));
    }
    Ok(Expr::Object(properties))
}

pub(super) fn compile_array(ctx: &mut CompileContext, elements: &[Node]) -> Result<Expr> {
    let elements = elements
        .iter()
        .map(|element| compile(ctx, element))
        .collect::<Result<Vec<_>>>()?;
    Ok(Expr::Array(elements))
}

pub(super) fn compile_binary(
    ctx: &mut CompileContext,
    left: &Node,
    operator: BinaryOperator,
    right: &Node,
) -> Result<Expr> {
    let left = compile(ctx, left)?;
    let right = compile(ctx, right)?;

    let helper = match operator {
        BinaryOperator::Coalesce => {
            return Ok(Expr::Conditional {
                test: Box::new(Expr::IsDefined(Box::new(left.clone()))),
                consequent: Box::new(left),
                alternate: Box::new(right),
            });
        }
        BinaryOperator::And => Helper::And,
        BinaryOperator::Or => Helper::Or,
        BinaryOperator::Equal => Helper::Equal,
        BinaryOperator::NotEqual | BinaryOperator::NotEqualSql => Helper::NotEqual,
        BinaryOperator::GreaterThan => Helper::Compare(CompareOp::Greater),
        BinaryOperator::LessThan => Helper::Compare(CompareOp::Less),
        BinaryOperator::GreaterThanOrEqual => Helper::Compare(CompareOp::GreaterOrEqual),
        BinaryOperator::LessThanOrEqual => Helper::Compare(CompareOp::LessOrEqual),
        BinaryOperator::Concat => Helper::Concat,
        BinaryOperator::Add => Helper::Calculate(ArithmeticOp::Add),
        BinaryOperator::Subtract => Helper::Calculate(ArithmeticOp::Subtract),
        BinaryOperator::Multiply => Helper::Calculate(ArithmeticOp::Multiply),
        BinaryOperator::Divide => Helper::Calculate(ArithmeticOp::Divide),
        BinaryOperator::Modulo => Helper::Calculate(ArithmeticOp::Modulo),
        BinaryOperator::BitOr => Helper::Calculate(ArithmeticOp::BitOr),
        BinaryOperator::BitAnd => Helper::Calculate(ArithmeticOp::BitAnd),
        BinaryOperator::BitXor => Helper::Calculate(ArithmeticOp::BitXor),
        BinaryOperator::ShiftLeft => Helper::Calculate(ArithmeticOp::ShiftLeft),
        BinaryOperator::ShiftRight => Helper::Calculate(ArithmeticOp::ShiftRight),
        BinaryOperator::ShiftRightZeroFill => Helper::Calculate(ArithmeticOp::ShiftRightZeroFill),
    };
    Ok(Expr::helper(helper, vec![left, right]))
}

pub(super) fn compile_unary(
    ctx: &mut CompileContext,
    operator: UnaryOperator,
    argument: &Node,
) -> Result<Expr> {
    let argument = compile(ctx, argument)?;
    let helper = match operator {
        UnaryOperator::Not => Helper::Not,
        UnaryOperator::Minus => Helper::CalculateUnary(UnaryArithmeticOp::Minus),
        UnaryOperator::Plus => Helper::CalculateUnary(UnaryArithmeticOp::Plus),
        UnaryOperator::BitNot => Helper::CalculateUnary(UnaryArithmeticOp::BitNot),
    };
    Ok(Expr::helper(helper, vec![argument]))
}

/// The test must be exactly `true`; undefined and null pick the alternate
pub(super) fn compile_conditional(
    ctx: &mut CompileContext,
    test: &Node,
    consequent: &Node,
    alternate: &Node,
) -> Result<Expr> {
    Ok(Expr::Conditional {
        test: Box::new(Expr::strict_true(compile(ctx, test)?)),
        consequent: Box::new(compile(ctx, consequent)?),
        alternate: Box::new(compile(ctx, alternate)?),
    })
}

/// `value >= begin && value <= end` with plain comparisons.
///
/// Unlike every other comparison this does not go through the helper
/// library, so an undefined operand yields `false` rather than undefined.
pub(super) fn compile_between(
    ctx: &mut CompileContext,
    value: &Node,
    begin: &Node,
    end: &Node,
) -> Result<Expr> {
    let value = compile(ctx, value)?;
    let lower = Expr::native(NativeOp::GreaterOrEqual, value.clone(), compile(ctx, begin)?);
    let upper = Expr::native(NativeOp::LessOrEqual, value, compile(ctx, end)?);
    Ok(Expr::native(NativeOp::And, lower, upper))
}

pub(super) fn compile_in(ctx: &mut CompileContext, value: &Node, list: &[Node]) -> Result<Expr> {
    let list = compile_array(ctx, list)?;
    Ok(Expr::Includes {
        list: Box::new(list),
        value: Box::new(compile(ctx, value)?),
    })
}
