//! docql Core - query compiler for a SQL dialect over JSON documents
//!
//! This crate turns the grammar tree of a `SELECT` query into an executable
//! plan and runs it against an in-memory document collection:
//! - Grammar tree decoding with kind checking ([`ast`])
//! - Plan compilation: FROM/JOIN flattening, three-valued WHERE, sort-key
//!   extraction, aggregate detection ([`compiler`])
//! - A typed plan IR with a readable rendering ([`plan`])
//! - A reference runtime: interpreter, operator semantics, aggregate,
//!   built-in and user-defined function tables ([`runtime`])
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │   Grammar tree (JSON from the parser)        │
//! └──────────────┬───────────────────────────────┘
//!                │ Node::from_json
//! ┌──────────────┴───────────────────────────────┐
//! │   Compiler                                   │
//! │   FROM → WHERE → ORDER BY → TOP → SELECT     │
//! └──────────────┬───────────────────────────────┘
//!                │ CompiledQuery (plan::Expr)
//! ┌──────────────┴───────────────────────────────┐
//! │   Runtime                                    │
//! │   (Interpreter + the seven runtime tables)   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Absent properties are their own value ([`Value::Undefined`]) throughout;
//! they never surface in result rows.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod plan;
pub mod runtime;
pub mod value;

pub use ast::Node;
pub use compiler::compile_query;
pub use engine::Engine;
pub use error::{Error, Result};
pub use runtime::{CompiledQuery, Parameters};
pub use value::Value;
