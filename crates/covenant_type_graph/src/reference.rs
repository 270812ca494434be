//! Type references and canonical type identifiers.

use std::fmt;

/// Variance tag carried by a generic argument in a canonical type id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variance {
    Invariant,
    Out,
    In,
}

impl Variance {
    fn prefix(self) -> &'static str {
        match self {
            Self::Invariant => "",
            Self::Out => "out ",
            Self::In => "in ",
        }
    }
}

/// A generic argument of a type reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GenericArg {
    pub variance: Variance,
    pub type_id: TypeId,
}

impl GenericArg {
    pub fn invariant(type_id: TypeId) -> Self {
        Self {
            variance: Variance::Invariant,
            type_id,
        }
    }
}

/// Canonical identifier of a type within a resolver session.
///
/// Built from the fully qualified name, variance-tagged generic arguments and
/// a `?` nullability suffix. Equal ids denote identical descriptors within
/// one session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(String);

impl TypeId {
    pub fn build(qualified_name: &str, args: &[GenericArg], nullable: bool) -> Self {
        let mut id = String::from(qualified_name);
        if !args.is_empty() {
            id.push('<');
            for (index, arg) in args.iter().enumerate() {
                if index > 0 {
                    id.push_str(", ");
                }
                id.push_str(arg.variance.prefix());
                id.push_str(arg.type_id.as_str());
            }
            id.push('>');
        }
        if nullable {
            id.push('?');
        }
        Self(id)
    }

    pub fn plain(qualified_name: &str) -> Self {
        Self::build(qualified_name, &[], false)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_nullable(&self) -> bool {
        self.0.ends_with('?')
    }

    /// The id without its nullability suffix.
    pub fn non_nullable(&self) -> TypeId {
        Self(self.0.trim_end_matches('?').to_owned())
    }

    /// The fully qualified name without generic arguments or suffix.
    pub fn qualified_name(&self) -> &str {
        let base = self.0.split('<').next().unwrap_or(&self.0);
        base.trim_end_matches('?')
    }

    /// Well-formedness used by the resolver before touching the adapter:
    /// non-empty, balanced angle brackets, no empty argument slots.
    pub fn is_well_formed(&self) -> bool {
        let body = self.0.trim_end_matches('?');
        if body.is_empty() {
            return false;
        }
        let mut depth = 0i32;
        let mut prev = ' ';
        for ch in body.chars() {
            match ch {
                '<' => {
                    depth += 1;
                    prev = ch;
                }
                '>' => {
                    if depth == 0 || prev == '<' || prev == ',' {
                        return false;
                    }
                    depth -= 1;
                    prev = ch;
                }
                ',' => {
                    if depth == 0 || prev == '<' || prev == ',' {
                        return false;
                    }
                    prev = ch;
                }
                ' ' => {}
                other => prev = other,
            }
        }
        depth == 0 && prev != ','
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A reference to a type: an opaque source key for the adapter plus the
/// canonical id. References are the lazy edges of the type graph; cyclic
/// graphs stay finite because an edge is only resolved on demand.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeReference {
    source: String,
    type_id: TypeId,
}

impl TypeReference {
    pub fn new(source: impl Into<String>, type_id: TypeId) -> Self {
        Self {
            source: source.into(),
            type_id,
        }
    }

    /// Reference whose source key is the qualified name itself, which is what
    /// the catalog adapter uses.
    pub fn by_name(type_id: TypeId) -> Self {
        let source = type_id.qualified_name().to_owned();
        Self { source, type_id }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn type_id(&self) -> &TypeId {
        &self.type_id
    }

    pub fn is_nullable(&self) -> bool {
        self.type_id.is_nullable()
    }

    /// The same reference with nullability flipped on.
    pub fn nullable(&self) -> Self {
        if self.is_nullable() {
            self.clone()
        } else {
            Self {
                source: self.source.clone(),
                type_id: TypeId(format!("{}?", self.type_id.as_str())),
            }
        }
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_id.as_str())
    }
}
