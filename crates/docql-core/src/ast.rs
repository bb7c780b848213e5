//! Grammar tree - the node shapes produced by the query parser
//!
//! The parser itself lives outside this crate. It hands over a JSON tree in
//! which every node carries a `type` discriminant; [`Node`] mirrors that tree
//! as a closed enum so the compiler can match on it exhaustively.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A node of the query grammar tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Full query: `SELECT [TOP n] ... [FROM ...] [WHERE ...] [ORDER BY ...]`
    SelectQuery {
        /// TOP clause
        #[serde(default)]
        top: Option<Box<Node>>,
        /// SELECT clause
        select: Box<Node>,
        /// FROM clause
        #[serde(default)]
        from: Option<Box<Node>>,
        /// WHERE clause
        #[serde(default, rename = "where")]
        where_clause: Option<Box<Node>>,
        /// ORDER BY clause
        #[serde(default, rename = "orderBy")]
        order_by: Option<Box<Node>>,
    },
    /// Projection list: `*`, `VALUE expr` or a property list
    SelectSpecification {
        /// `SELECT *`
        #[serde(default, rename = "*")]
        star: bool,
        /// `SELECT a, b AS x`
        #[serde(default)]
        properties: Option<Box<Node>>,
        /// `SELECT VALUE expr`
        #[serde(default)]
        value: Option<Box<Node>>,
    },
    /// FROM source followed by its joins
    FromSpecification {
        /// First source
        source: Box<Node>,
        /// JOIN clauses in query order
        #[serde(default)]
        joins: Vec<Node>,
    },
    /// One FROM/JOIN source
    FromSource {
        /// Collection expression
        expression: Box<Node>,
        /// Optional alias identifier
        #[serde(default)]
        alias: Option<Box<Node>>,
        /// `alias IN expression` form
        #[serde(default)]
        iteration: bool,
    },
    /// Collection reference wrapper
    CollectionExpression {
        /// Wrapped expression
        expression: Box<Node>,
    },
    /// Property access on a collection source (`Families.children`)
    CollectionMemberExpression {
        /// Accessed object
        object: Box<Node>,
        /// Property name or index expression
        property: Box<Node>,
        /// Bracket access
        #[serde(default)]
        computed: bool,
    },
    /// WHERE condition
    FilterCondition {
        /// Predicate
        condition: Box<Node>,
    },
    /// ORDER BY list
    SortSpecification {
        /// Sort expressions in priority order
        expressions: Vec<Node>,
    },
    /// One ORDER BY item
    SortExpression {
        /// Key expression
        expression: Box<Node>,
        /// Direction, ascending when absent
        #[serde(default)]
        order: Option<SortOrder>,
    },
    /// TOP count
    TopSpecification {
        /// Count expression (literal or parameter)
        value: Box<Node>,
    },
    /// Bare name
    Identifier {
        /// Name as written
        name: String,
    },
    /// Query parameter (`@name`)
    ParameterName {
        /// Name including the `@` sigil
        name: String,
    },
    /// Object literal of constants
    ObjectConstant {
        /// Key/value pairs
        properties: Vec<ObjectEntry>,
    },
    /// SELECT property list
    ObjectPropertyList {
        /// Projected properties
        properties: Vec<PropertyItem>,
    },
    /// Object built from scalar expressions
    ScalarObjectExpression {
        /// Key/value pairs
        properties: Vec<ObjectEntry>,
    },
    /// Array literal of constants
    ArrayConstant {
        /// Elements
        elements: Vec<Node>,
    },
    /// Array built from scalar expressions
    ScalarArrayExpression {
        /// Elements
        elements: Vec<Node>,
    },
    /// Binary operation
    ScalarBinaryExpression {
        /// Left operand
        left: Box<Node>,
        /// Operator
        operator: BinaryOperator,
        /// Right operand
        right: Box<Node>,
    },
    /// Unary operation
    ScalarUnaryExpression {
        /// Operator
        operator: UnaryOperator,
        /// Operand
        argument: Box<Node>,
    },
    /// `test ? consequent : alternate`
    ScalarConditionalExpression {
        /// Condition
        test: Box<Node>,
        /// Value when the condition is true
        consequent: Box<Node>,
        /// Value otherwise
        alternate: Box<Node>,
    },
    /// `value BETWEEN begin AND end`
    ScalarBetweenExpression {
        /// Tested value
        value: Box<Node>,
        /// Inclusive lower bound
        begin: Box<Node>,
        /// Inclusive upper bound
        end: Box<Node>,
    },
    /// `value IN (a, b, ...)`
    ScalarInExpression {
        /// Tested value
        value: Box<Node>,
        /// Candidates
        list: Vec<Node>,
    },
    /// Property or index access on a scalar
    ScalarMemberExpression {
        /// Accessed object
        object: Box<Node>,
        /// Property name or index expression
        property: Box<Node>,
        /// Bracket access
        #[serde(default)]
        computed: bool,
    },
    /// Function call
    ScalarFunctionExpression {
        /// Function name identifier
        name: Box<Node>,
        /// Arguments
        #[serde(default)]
        arguments: Vec<Node>,
        /// `udf.name(...)` call
        #[serde(default)]
        udf: bool,
    },
    /// `true` / `false`
    BooleanConstant {
        /// Value
        value: bool,
    },
    /// Numeric literal
    NumberConstant {
        /// Value
        value: f64,
    },
    /// String literal
    StringConstant {
        /// Value
        value: String,
    },
    /// `null`
    NullConstant,
    /// `undefined`
    UndefinedConstant,
}

/// `key: value` entry of an object literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Identifier or string constant
    pub key: Node,
    /// Value expression
    pub value: Node,
}

/// One projected column of a SELECT list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyItem {
    /// Projected expression
    pub property: Node,
    /// `AS alias`
    #[serde(default)]
    pub alias: Option<Node>,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending
    #[serde(rename = "ASC")]
    Ascending,
    /// Descending
    #[serde(rename = "DESC")]
    Descending,
}

/// Binary operators of the query language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// Addition
    #[serde(rename = "+")]
    Add,
    /// Subtraction
    #[serde(rename = "-")]
    Subtract,
    /// Multiplication
    #[serde(rename = "*")]
    Multiply,
    /// Division
    #[serde(rename = "/")]
    Divide,
    /// Remainder
    #[serde(rename = "%")]
    Modulo,
    /// Bitwise OR
    #[serde(rename = "|")]
    BitOr,
    /// Bitwise AND
    #[serde(rename = "&")]
    BitAnd,
    /// Bitwise XOR
    #[serde(rename = "^")]
    BitXor,
    /// Left shift
    #[serde(rename = "<<")]
    ShiftLeft,
    /// Sign-propagating right shift
    #[serde(rename = ">>")]
    ShiftRight,
    /// Zero-fill right shift
    #[serde(rename = ">>>")]
    ShiftRightZeroFill,
    /// String concatenation
    #[serde(rename = "||")]
    Concat,
    /// Equality
    #[serde(rename = "=")]
    Equal,
    /// Inequality
    #[serde(rename = "!=")]
    NotEqual,
    /// Inequality, SQL spelling
    #[serde(rename = "<>")]
    NotEqualSql,
    /// Greater than
    #[serde(rename = ">")]
    GreaterThan,
    /// Less than
    #[serde(rename = "<")]
    LessThan,
    /// Greater than or equal
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    /// Less than or equal
    #[serde(rename = "<=")]
    LessThanOrEqual,
    /// Logical AND
    #[serde(rename = "AND")]
    And,
    /// Logical OR
    #[serde(rename = "OR")]
    Or,
    /// Left operand unless it is undefined
    #[serde(rename = "??")]
    Coalesce,
}

/// Unary operators of the query language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Negation
    #[serde(rename = "-")]
    Minus,
    /// Numeric identity
    #[serde(rename = "+")]
    Plus,
    /// Bitwise NOT
    #[serde(rename = "~")]
    BitNot,
    /// Logical NOT
    #[serde(rename = "NOT")]
    Not,
}

impl Node {
    /// Every grammar kind the compiler has a handler for
    pub const KINDS: &'static [&'static str] = &[
        "select_query",
        "select_specification",
        "from_specification",
        "from_source",
        "collection_expression",
        "collection_member_expression",
        "filter_condition",
        "sort_specification",
        "sort_expression",
        "top_specification",
        "identifier",
        "parameter_name",
        "object_constant",
        "object_property_list",
        "scalar_object_expression",
        "array_constant",
        "scalar_array_expression",
        "scalar_binary_expression",
        "scalar_unary_expression",
        "scalar_conditional_expression",
        "scalar_between_expression",
        "scalar_in_expression",
        "scalar_member_expression",
        "scalar_function_expression",
        "boolean_constant",
        "number_constant",
        "string_constant",
        "null_constant",
        "undefined_constant",
    ];

    /// Decode a parser-produced JSON tree.
    ///
    /// Kinds are validated before decoding so that an unknown node surfaces
    /// as [`Error::UnsupportedNodeKind`] instead of a generic decode error.
    pub fn from_json(value: JsonValue) -> Result<Node> {
        check_kinds(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Parse a JSON document into a grammar tree
    pub fn from_json_str(input: &str) -> Result<Node> {
        Self::from_json(serde_json::from_str(input)?)
    }

    /// Grammar kind of this node
    pub fn kind(&self) -> &'static str {
        match self {
            Node::SelectQuery { .. } => "select_query",
            Node::SelectSpecification { .. } => "select_specification",
            Node::FromSpecification { .. } => "from_specification",
            Node::FromSource { .. } => "from_source",
            Node::CollectionExpression { .. } => "collection_expression",
            Node::CollectionMemberExpression { .. } => "collection_member_expression",
            Node::FilterCondition { .. } => "filter_condition",
            Node::SortSpecification { .. } => "sort_specification",
            Node::SortExpression { .. } => "sort_expression",
            Node::TopSpecification { .. } => "top_specification",
            Node::Identifier { .. } => "identifier",
            Node::ParameterName { .. } => "parameter_name",
            Node::ObjectConstant { .. } => "object_constant",
            Node::ObjectPropertyList { .. } => "object_property_list",
            Node::ScalarObjectExpression { .. } => "scalar_object_expression",
            Node::ArrayConstant { .. } => "array_constant",
            Node::ScalarArrayExpression { .. } => "scalar_array_expression",
            Node::ScalarBinaryExpression { .. } => "scalar_binary_expression",
            Node::ScalarUnaryExpression { .. } => "scalar_unary_expression",
            Node::ScalarConditionalExpression { .. } => "scalar_conditional_expression",
            Node::ScalarBetweenExpression { .. } => "scalar_between_expression",
            Node::ScalarInExpression { .. } => "scalar_in_expression",
            Node::ScalarMemberExpression { .. } => "scalar_member_expression",
            Node::ScalarFunctionExpression { .. } => "scalar_function_expression",
            Node::BooleanConstant { .. } => "boolean_constant",
            Node::NumberConstant { .. } => "number_constant",
            Node::StringConstant { .. } => "string_constant",
            Node::NullConstant => "null_constant",
            Node::UndefinedConstant => "undefined_constant",
        }
    }

    /// Shorthand for an identifier node
    pub fn ident(name: impl Into<String>) -> Node {
        Node::Identifier { name: name.into() }
    }
}

fn check_kinds(value: &JsonValue) -> Result<()> {
    match value {
        JsonValue::Object(map) => {
            if let Some(JsonValue::String(kind)) = map.get("type") {
                if !Node::KINDS.contains(&kind.as_str()) {
                    return Err(Error::unsupported(kind.clone()));
                }
            }
            map.values().try_for_each(check_kinds)
        }
        JsonValue::Array(items) => items.iter().try_for_each(check_kinds),
        _ => Ok(()),
    }
}
