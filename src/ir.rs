// Type descriptors. Both union spellings end up as `Ty::Union`.
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ty {
    None,                    // absence marker
    Plain { name: String },
    List { item: Box<Ty> },
    BareList,                // `list` with no type arguments
    Union { members: Vec<Ty> },
    Generic {
        origin: String,      // normalized constructor name (`dict`, `tuple`, ...)
        args: Vec<Ty>,
    },
}

/// The generic constructor of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin<'a> {
    Union,
    List,
    Generic(&'a str),
    Plain,
}

impl Ty {
    pub fn plain(name: impl Into<String>) -> Self {
        Ty::Plain { name: name.into() }
    }

    pub fn list(item: Ty) -> Self {
        Ty::List { item: Box::new(item) }
    }

    pub fn generic(origin: impl Into<String>, args: Vec<Ty>) -> Self {
        Ty::Generic { origin: origin.into(), args }
    }

    /// `X | None`
    pub fn optional(inner: Ty) -> Self {
        Ty::union([inner, Ty::None])
    }

    /// Canonical union constructor.
    ///
    /// - nested unions are flattened
    /// - duplicates are dropped, first occurrence wins
    /// - a single surviving member is returned as-is
    ///
    /// An empty input returns `Ty::None`; the parser rejects `Union[]` before
    /// getting here.
    pub fn union<I>(members: I) -> Self
    where
        I: IntoIterator<Item = Ty>,
    {
        let mut flat: Vec<Ty> = Vec::new();
        for m in members {
            match m {
                Ty::Union { members: inner } => {
                    for x in inner {
                        if !flat.contains(&x) { flat.push(x); }
                    }
                }
                other => {
                    if !flat.contains(&other) { flat.push(other); }
                }
            }
        }
        match flat.len() {
            0 => Ty::None,
            1 => flat.remove(0),
            _ => Ty::Union { members: flat },
        }
    }

    pub fn origin(&self) -> Origin<'_> {
        match self {
            Ty::Union { .. } => Origin::Union,
            Ty::List { .. } | Ty::BareList => Origin::List,
            Ty::Generic { origin, .. } => Origin::Generic(origin),
            Ty::None | Ty::Plain { .. } => Origin::Plain,
        }
    }

    /// Ordered type arguments, empty for non-generic descriptors.
    pub fn args(&self) -> &[Ty] {
        match self {
            Ty::List { item } => std::slice::from_ref(item.as_ref()),
            Ty::Union { members } => members,
            Ty::Generic { args, .. } => args,
            Ty::None | Ty::Plain { .. } | Ty::BareList => &[],
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Ty::None)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::None => f.write_str("None"),
            Ty::Plain { name } => f.write_str(name),
            Ty::List { item } => write!(f, "list[{item}]"),
            Ty::BareList => f.write_str("list"),
            Ty::Union { members } => write_joined(f, members, " | "),
            Ty::Generic { origin, args } => {
                write!(f, "{origin}[")?;
                write_joined(f, args, ", ")?;
                f.write_str("]")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, xs: &[Ty], sep: &str) -> fmt::Result {
    for (i, x) in xs.iter().enumerate() {
        if i > 0 { f.write_str(sep)?; }
        write!(f, "{x}")?;
    }
    Ok(())
}
