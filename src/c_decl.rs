//! Types for handling information about C declarations in header files.
//!
//! This is the data handed over by a [`HeaderParser`](crate::c_parser::HeaderParser)
//! implementation. Only the C subset relevant to metadata extraction is
//! represented: named struct definitions, direct struct typedefs and the
//! members of those structs.

use serde_derive::{Deserialize, Serialize};

/// Name of the sentinel struct type that tags a struct for metadata
/// generation. A struct participates when one of its direct members is
/// declared with this type.
pub const DROP_MARKER_TYPE: &str = "drop_meta_type_s";

/// Suffix token that separates the owner name from the marker member name
/// (`state_meta` tags the struct registered as `state`).
pub const MARKER_NAME_SUFFIX: &str = "_meta";

/// Declared type of a struct member, reduced to the shapes the extractor
/// distinguishes.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CTypeRef {
    /// Named type: a builtin or a typedef name. For multi-keyword builtins
    /// the parser supplies only the first identifier (`unsigned long x`
    /// arrives as `unsigned`).
    Name(String),
    /// Elaborated struct reference (`struct foo x`).
    StructRef(String),
    /// Elaborated union reference.
    UnionRef(String),
    /// Elaborated enum reference.
    EnumRef(String),
    /// Any pointer, regardless of pointee.
    Pointer,
    /// Pointer to function.
    FunctionPointer,
    /// Anonymous struct or union defined in place of a type name.
    Anonymous,
}

impl CTypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        CTypeRef::Name(name.into())
    }

    pub fn struct_ref(name: impl Into<String>) -> Self {
        CTypeRef::StructRef(name.into())
    }

    pub fn short_text(&self) -> String {
        match self {
            CTypeRef::Name(name) => name.clone(),
            CTypeRef::StructRef(name) => format!("struct {}", name),
            CTypeRef::UnionRef(name) => format!("union {}", name),
            CTypeRef::EnumRef(name) => format!("enum {}", name),
            CTypeRef::Pointer => "pointer".into(),
            CTypeRef::FunctionPointer => "function pointer".into(),
            CTypeRef::Anonymous => "anonymous aggregate".into(),
        }
    }
}

/// One member of a struct declaration.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct CMember {
    pub name: String,
    pub type_ref: CTypeRef,
    /// One entry per array dimension, in declaration order. Each entry
    /// holds the dimension's length expression exactly as spelled in the
    /// source (`None` for an unsized dimension). Empty for scalars.
    pub array_dims: Vec<Option<String>>,
    /// Declared width for bitfield members.
    pub bit_width: Option<u32>,
}

impl CMember {
    pub fn scalar(name: impl Into<String>, type_ref: CTypeRef) -> Self {
        CMember {
            name: name.into(),
            type_ref,
            array_dims: Vec::new(),
            bit_width: None,
        }
    }

    pub fn array(name: impl Into<String>, type_ref: CTypeRef, dims: Vec<Option<String>>) -> Self {
        CMember {
            name: name.into(),
            type_ref,
            array_dims: dims,
            bit_width: None,
        }
    }

    /// True for the sentinel member that tags the enclosing struct.
    /// Only a plain member declared directly as `struct drop_meta_type_s`
    /// counts; arrays, bitfields and typedef aliases of the marker type
    /// do not tag anything.
    pub fn is_marker(&self) -> bool {
        match &self.type_ref {
            CTypeRef::StructRef(name) => {
                name == DROP_MARKER_TYPE && self.array_dims.is_empty() && self.bit_width.is_none()
            }
            _ => false,
        }
    }
}

/// A named struct definition with its members in declaration order.
/// Forward declarations and anonymous definitions are dropped by the
/// parser and never appear here.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct CStructDecl {
    pub name: String,
    pub members: Vec<CMember>,
}

impl CStructDecl {
    pub fn marker_members(&self) -> impl Iterator<Item = &CMember> {
        self.members.iter().filter(|member| member.is_marker())
    }
}

/// A typedef whose underlying type is directly a struct reference
/// (`typedef struct foo foo_t`). Other typedefs are not reported.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct CTypedefDecl {
    pub name: String,
    pub underlying: String,
}

/// Top-level declaration reported by the parser, in source order.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CDecl {
    Struct(CStructDecl),
    Typedef(CTypedefDecl),
}

#[test]
fn marker_recognition_should_work() {
    let member = CMember::scalar("state_meta", CTypeRef::struct_ref(DROP_MARKER_TYPE));
    assert!(member.is_marker());

    let by_alias = CMember::scalar("state_meta", CTypeRef::named("drop_meta_type_t"));
    assert!(!by_alias.is_marker());

    let array = CMember::array(
        "states_meta",
        CTypeRef::struct_ref(DROP_MARKER_TYPE),
        vec![Some("2".to_string())],
    );
    assert!(!array.is_marker());

    let bitfield = CMember {
        bit_width: Some(1),
        ..CMember::scalar("state_meta", CTypeRef::struct_ref(DROP_MARKER_TYPE))
    };
    assert!(!bitfield.is_marker());
}
