//! Questions asked of a type descriptor.
//!
//! All functions here are total: shapes they don't recognize fall through to
//! returning the input (or `false`) instead of failing.
use serde::Serialize;

use crate::ir::{Origin, Ty};

/// Strip an optional wrapper: `X | None` → `X`.
///
/// Only a union of exactly two members, one of them `None`, counts as
/// optional. Everything else comes back unchanged.
pub fn unwrap_optional(ty: &Ty) -> &Ty {
    if ty.origin() == Origin::Union {
        let members = ty.args();
        if members.len() == 2 && members.iter().any(Ty::is_none) {
            if let Some(inner) = members.iter().find(|m| !m.is_none()) {
                return inner;
            }
        }
    }
    ty
}

/// `true` for `list[list[..]]`.
pub fn is_nested_list(ty: &Ty) -> bool {
    ty.origin() == Origin::List
        && ty.args().first().is_some_and(|a| a.origin() == Origin::List)
}

/// Innermost element type of a (possibly nested) list.
///
/// Descriptors without type arguments are returned as-is, so `list` yields
/// `list`, not an element type.
pub fn base_element_type(ty: &Ty) -> &Ty {
    match ty.args().first() {
        Some(first) if first.origin() == Origin::List => base_element_type(first),
        Some(first) => first,
        None => ty,
    }
}

/// All answers for one descriptor, in report form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Introspection {
    pub canonical: String,
    pub optional: bool,
    pub inner: Ty,
    pub nested_list: bool,
    pub base_type: Ty,
}

pub fn inspect(ty: &Ty) -> Introspection {
    let inner = unwrap_optional(ty);
    Introspection {
        canonical: ty.to_string(),
        optional: inner != ty,
        inner: inner.clone(),
        nested_list: is_nested_list(ty),
        base_type: base_element_type(ty).clone(),
    }
}

// ------------------------------- Tests ------------------------------------ //
