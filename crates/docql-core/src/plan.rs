//! Executable plan - the compiler's output
//!
//! A plan is an expression tree over a small fixed vocabulary. It does not
//! capture any data: the seven runtime tables (aggregates, built-ins,
//! collection, operator helpers, UDFs, parameters and the intermediate cache
//! slot) are supplied when the plan runs.

pub use crate::error::FunctionKind;
use crate::value::Value;
use std::fmt;

/// Runtime tables a plan can read as values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// The document collection
    Collection,
    /// Intermediate result cached by an aggregate projection
    Cache,
}

/// Member key of a property access
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    /// `object.name`
    Name(String),
    /// `object[expr]`
    Computed(Box<Expr>),
}

/// Comparison operators routed to the operator-semantics helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `>`
    Greater,
    /// `<`
    Less,
    /// `>=`
    GreaterOrEqual,
    /// `<=`
    LessOrEqual,
}

/// Arithmetic and bitwise operators routed to the helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `|`
    BitOr,
    /// `&`
    BitAnd,
    /// `^`
    BitXor,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `>>>`
    ShiftRightZeroFill,
}

/// Unary operators routed to the helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryArithmeticOp {
    /// `-`
    Minus,
    /// `+`
    Plus,
    /// `~`
    BitNot,
}

/// Operator-semantics helper entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    /// Three-valued AND
    And,
    /// Three-valued OR
    Or,
    /// Three-valued NOT
    Not,
    /// Typed equality
    Equal,
    /// Typed inequality
    NotEqual,
    /// Typed ordering comparison
    Compare(CompareOp),
    /// Numeric binary operation
    Calculate(ArithmeticOp),
    /// Numeric unary operation
    CalculateUnary(UnaryArithmeticOp),
    /// String concatenation
    Concat,
    /// Multi-key stable sort; arguments are the collection then `[path, descending]` pairs
    Sort,
    /// Recursive removal of undefined object properties
    StripUndefined,
}

/// Operators evaluated directly by the plan, without the helper library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOp {
    /// Strict equality (same type and value)
    StrictEq,
    /// Plain `>=`; strings compare lexically, anything else numerically
    GreaterOrEqual,
    /// Plain `<=`, coercing like `>=`
    LessOrEqual,
    /// Left operand when falsy, else right operand
    And,
    /// Left operand when truthy, else right operand
    Or,
}

/// Shape of the row a lambda receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowPattern {
    /// No names bound (query without FROM)
    None,
    /// The whole row bound to one name
    Row(String),
    /// Row destructured by property name, in binding order
    Record(Vec<String>),
}

/// Single-row function used by collection operations
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    /// Names bound for each row
    pub pattern: RowPattern,
    /// Body evaluated per row
    pub body: Box<Expr>,
}

impl Lambda {
    /// Build a lambda over the given row pattern
    pub fn new(pattern: RowPattern, body: Expr) -> Self {
        Self {
            pattern,
            body: Box::new(body),
        }
    }
}

/// Plan expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant
    Literal(Value),
    /// Name bound by an enclosing lambda
    Variable(String),
    /// Read of a runtime table
    Table(Table),
    /// Query parameter lookup (name without the `@` sigil)
    Parameter(String),
    /// Property or index access
    Member {
        /// Accessed value
        object: Box<Expr>,
        /// Key
        key: Key,
    },
    /// Operator-semantics helper call
    Helper {
        /// Entry point
        helper: Helper,
        /// Arguments
        arguments: Vec<Expr>,
    },
    /// Function table call
    Function {
        /// Table the call dispatches to
        kind: FunctionKind,
        /// Name used for the lookup
        name: String,
        /// Arguments
        arguments: Vec<Expr>,
    },
    /// Native binary operation
    Native {
        /// Operator
        op: NativeOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// True unless the operand is undefined
    IsDefined(Box<Expr>),
    /// `test ? consequent : alternate` on truthiness of `test`
    Conditional {
        /// Condition
        test: Box<Expr>,
        /// Value when truthy
        consequent: Box<Expr>,
        /// Value otherwise
        alternate: Box<Expr>,
    },
    /// Array construction
    Array(Vec<Expr>),
    /// Object construction, properties in order
    Object(Vec<(String, Expr)>),
    /// Evaluate each expression in order, yield the last
    Sequence(Vec<Expr>),
    /// Store the operand in the cache slot and yield it
    AssignCache(Box<Expr>),
    /// Keep rows for which the lambda is truthy
    Filter {
        /// Input rows
        source: Box<Expr>,
        /// Predicate
        lambda: Lambda,
    },
    /// Transform every row
    Map {
        /// Input rows
        source: Box<Expr>,
        /// Row transformation
        lambda: Lambda,
    },
    /// Per-row reduction step: concatenate the arrays the lambda yields
    FlatMap {
        /// Input rows
        source: Box<Expr>,
        /// Row expansion
        lambda: Lambda,
    },
    /// First `count` rows
    Slice {
        /// Input rows
        source: Box<Expr>,
        /// Row count
        count: Box<Expr>,
    },
    /// Array membership
    Includes {
        /// Candidate array
        list: Box<Expr>,
        /// Tested value
        value: Box<Expr>,
    },
}

impl Expr {
    /// Boxed literal helper
    pub fn literal(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    /// Helper call
    pub fn helper(helper: Helper, arguments: Vec<Expr>) -> Expr {
        Expr::Helper { helper, arguments }
    }

    /// Native binary operation
    pub fn native(op: NativeOp, left: Expr, right: Expr) -> Expr {
        Expr::Native {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `value === true`
    pub fn strict_true(value: Expr) -> Expr {
        Expr::native(NativeOp::StrictEq, value, Expr::Literal(Value::Bool(true)))
    }

    /// True when the expression is a property access
    pub fn is_member(&self) -> bool {
        matches!(self, Expr::Member { .. })
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Collection => f.write_str("$collection"),
            Table::Cache => f.write_str("$cache"),
        }
    }
}

impl fmt::Display for RowPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowPattern::None => f.write_str("()"),
            RowPattern::Row(name) => f.write_str(name),
            RowPattern::Record(names) => write!(f, "{{{}}}", names.join(", ")),
        }
    }
}

impl fmt::Display for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Helper::And => "and",
            Helper::Or => "or",
            Helper::Not => "not",
            Helper::Equal => "equal",
            Helper::NotEqual => "notEqual",
            Helper::Compare(op) => return write!(f, "compare[{}]", op.symbol()),
            Helper::Calculate(op) => return write!(f, "calculate[{}]", op.symbol()),
            Helper::CalculateUnary(op) => return write!(f, "calculateUnary[{}]", op.symbol()),
            Helper::Concat => "concat",
            Helper::Sort => "sort",
            Helper::StripUndefined => "stripUndefined",
        };
        f.write_str(name)
    }
}

impl CompareOp {
    /// Surface spelling
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Greater => ">",
            CompareOp::Less => "<",
            CompareOp::GreaterOrEqual => ">=",
            CompareOp::LessOrEqual => "<=",
        }
    }
}

impl ArithmeticOp {
    /// Surface spelling
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Modulo => "%",
            ArithmeticOp::BitOr => "|",
            ArithmeticOp::BitAnd => "&",
            ArithmeticOp::BitXor => "^",
            ArithmeticOp::ShiftLeft => "<<",
            ArithmeticOp::ShiftRight => ">>",
            ArithmeticOp::ShiftRightZeroFill => ">>>",
        }
    }
}

impl UnaryArithmeticOp {
    /// Surface spelling
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryArithmeticOp::Minus => "-",
            UnaryArithmeticOp::Plus => "+",
            UnaryArithmeticOp::BitNot => "~",
        }
    }
}

impl NativeOp {
    /// Surface spelling
    pub fn symbol(self) -> &'static str {
        match self {
            NativeOp::StrictEq => "===",
            NativeOp::GreaterOrEqual => ">=",
            NativeOp::LessOrEqual => "<=",
            NativeOp::And => "&&",
            NativeOp::Or => "||",
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.pattern, self.body)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Variable(name) => f.write_str(name),
            Expr::Table(table) => write!(f, "{table}"),
            Expr::Parameter(name) => write!(f, "@{name}"),
            Expr::Member { object, key } => match key {
                Key::Name(name) => write!(f, "{object}.{name}"),
                Key::Computed(expr) => write!(f, "{object}[{expr}]"),
            },
            Expr::Helper { helper, arguments } => {
                write!(f, "${helper}(")?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            Expr::Function {
                kind,
                name,
                arguments,
            } => {
                let prefix = match kind {
                    FunctionKind::Aggregate => "aggregate:",
                    FunctionKind::Builtin => "",
                    FunctionKind::Udf => "udf.",
                };
                write!(f, "{prefix}{name}(")?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            Expr::Native { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::IsDefined(expr) => write!(f, "defined({expr})"),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => write!(f, "({test} ? {consequent} : {alternate})"),
            Expr::Array(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Expr::Object(properties) => {
                f.write_str("{")?;
                for (i, (key, value)) in properties.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Expr::Sequence(items) => {
                f.write_str("(")?;
                write_list(f, items)?;
                f.write_str(")")
            }
            Expr::AssignCache(expr) => write!(f, "{} = {expr}", Table::Cache),
            Expr::Filter { source, lambda } => write!(f, "{source}\n  .filter({lambda})"),
            Expr::Map { source, lambda } => write!(f, "{source}\n  .map({lambda})"),
            Expr::FlatMap { source, lambda } => write!(f, "{source}\n  .flat_map({lambda})"),
            Expr::Slice { source, count } => write!(f, "{source}\n  .take({count})"),
            Expr::Includes { list, value } => write!(f, "{list}.includes({value})"),
        }
    }
}
