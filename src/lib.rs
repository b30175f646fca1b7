//! Type-annotation introspection.
//!
//! Annotations such as `Optional[int]`, `int | None` or `t.List[t.List[str]]`
//! are parsed into [`ir::Ty`]; [`introspect`] then answers the questions
//! callers ask of them:
//!
//! ```
//! use annotype::{introspect, parse::parse_annotation};
//!
//! let ty = parse_annotation("Optional[list[list[str]]]").unwrap();
//! let inner = introspect::unwrap_optional(&ty);
//! assert!(introspect::is_nested_list(inner));
//! assert_eq!(introspect::base_element_type(inner).to_string(), "str");
//! ```
pub mod cli;
pub mod introspect;
pub mod ir;
pub mod logging;
pub mod parse;
pub mod source;
