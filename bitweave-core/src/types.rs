use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Name of a decode target type.
///
/// Tags are plain names; any relationship between them is declared in a
/// [`TypeHierarchy`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeTag(Cow<'static, str>);

impl TypeTag {
    /// Root of every hierarchy.
    pub const ANY: TypeTag = TypeTag(Cow::Borrowed("any"));
    pub const BOOL: TypeTag = TypeTag(Cow::Borrowed("bool"));
    pub const BOXED_BOOL: TypeTag = TypeTag(Cow::Borrowed("Box<bool>"));
    pub const LIST: TypeTag = TypeTag(Cow::Borrowed("list"));

    pub fn new(name: impl Into<String>) -> Self {
        TypeTag(Cow::Owned(name.into()))
    }

    pub const fn from_static(name: &'static str) -> Self {
        TypeTag(Cow::Borrowed(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.0)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Integer target types understood by the numeric codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
}

impl IntType {
    /// Returns all variants in order.
    pub fn all() -> &'static [IntType] {
        &[
            IntType::U8,
            IntType::U16,
            IntType::U32,
            IntType::U64,
            IntType::I8,
            IntType::I16,
            IntType::I32,
            IntType::I64,
        ]
    }

    /// Natural width in bits.
    pub fn bits(self) -> u32 {
        match self {
            IntType::U8 | IntType::I8 => 8,
            IntType::U16 | IntType::I16 => 16,
            IntType::U32 | IntType::I32 => 32,
            IntType::U64 | IntType::I64 => 64,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, IntType::I8 | IntType::I16 | IntType::I32 | IntType::I64)
    }

    pub fn type_tag(self) -> TypeTag {
        TypeTag::from_static(match self {
            IntType::U8 => "u8",
            IntType::U16 => "u16",
            IntType::U32 => "u32",
            IntType::U64 => "u64",
            IntType::I8 => "i8",
            IntType::I16 => "i16",
            IntType::I32 => "i32",
            IntType::I64 => "i64",
        })
    }

    /// Maps a target type tag back to an integer type, if it names one.
    pub fn from_tag(tag: &TypeTag) -> Option<IntType> {
        IntType::all()
            .iter()
            .copied()
            .find(|ty| ty.type_tag() == *tag)
    }
}

/// Declared parent relation between type tags.
///
/// Each schema declares which tags specialise which. Undeclared tags hang
/// directly off [`TypeTag::ANY`].
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    parents: HashMap<TypeTag, TypeTag>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `parent` as the direct supertype of `child`.
    ///
    /// Fails if the declaration would make a tag its own ancestor.
    pub fn declare(&mut self, child: TypeTag, parent: TypeTag) -> Result<(), SchemaError> {
        if child == TypeTag::ANY || self.ancestors(&parent).contains(&child) {
            return Err(SchemaError::CyclicType(child));
        }
        self.parents.insert(child, parent);
        Ok(())
    }

    /// Builder-style variant of [`TypeHierarchy::declare`].
    pub fn with(mut self, child: TypeTag, parent: TypeTag) -> Result<Self, SchemaError> {
        self.declare(child, parent)?;
        Ok(self)
    }

    pub fn parent(&self, tag: &TypeTag) -> Option<&TypeTag> {
        if *tag == TypeTag::ANY {
            return None;
        }
        Some(self.parents.get(tag).unwrap_or(&TypeTag::ANY))
    }

    /// The tag itself followed by its ancestors, ending with `any`.
    pub fn ancestors(&self, tag: &TypeTag) -> Vec<TypeTag> {
        let mut chain = vec![tag.clone()];
        let mut current = tag;
        while let Some(parent) = self.parent(current) {
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    pub fn is_assignable(&self, tag: &TypeTag, to: &TypeTag) -> bool {
        self.ancestors(tag).contains(to)
    }

    /// Nearest common ancestor of all given tags.
    ///
    /// Duplicates are ignored. An empty input yields `any`.
    pub fn common_supertype<'a>(&self, tags: impl IntoIterator<Item = &'a TypeTag>) -> TypeTag {
        let unique: IndexSet<&TypeTag> = tags.into_iter().collect();
        let mut iter = unique.iter();
        let Some(first) = iter.next() else {
            return TypeTag::ANY;
        };
        let rest: Vec<Vec<TypeTag>> = iter.map(|tag| self.ancestors(tag)).collect();
        self.ancestors(first)
            .into_iter()
            .find(|candidate| rest.iter().all(|chain| chain.contains(candidate)))
            .unwrap_or(TypeTag::ANY)
    }
}
