//! The header parsing capability and its libclang implementation.
//!
//! The pipeline consumes parsing through the [`HeaderParser`] trait, so
//! the scanning and extraction logic can be exercised against synthetic
//! declaration lists without a C toolchain. [`ClangHeaderParser`] is the
//! production implementation.

use crate::c_decl::{CDecl, CMember, CStructDecl, CTypeRef, CTypedefDecl};
use crate::errors::{bail, err_msg, format_err, Result};
use clang::diagnostic::Severity;
use clang::{Clang, Entity, EntityKind, Index, Type, TypeKind};
use itertools::Itertools;
use log::trace;
use std::path::Path;

/// Turns one header file into its top-level declarations, in source
/// order. Declarations pulled in through `#include` are reported too,
/// exactly as the preprocessor sees them.
pub trait HeaderParser {
    fn parse(&self, path: &Path, arguments: &[String]) -> Result<Vec<CDecl>>;
}

/// Production parser on top of libclang. At most one instance can
/// exist per process; `new` fails if another one is alive.
pub struct ClangHeaderParser {
    clang: Clang,
}

impl ClangHeaderParser {
    pub fn new() -> Result<ClangHeaderParser> {
        let clang = Clang::new().map_err(err_msg)?;
        Ok(ClangHeaderParser { clang })
    }
}

impl HeaderParser for ClangHeaderParser {
    fn parse(&self, path: &Path, arguments: &[String]) -> Result<Vec<CDecl>> {
        let index = Index::new(&self.clang, false, false);
        let tu = index
            .parser(path)
            .arguments(arguments)
            .parse()
            .map_err(|err| format_err!("clang parse failed for {:?}: {}", path, err))?;

        let diagnostics = tu.get_diagnostics();
        for diagnostic in &diagnostics {
            trace!("clang: {}", diagnostic);
        }
        if diagnostics
            .iter()
            .any(|d| d.get_severity() == Severity::Error || d.get_severity() == Severity::Fatal)
        {
            bail!(
                "fatal clang error in {:?}:\n{}",
                path,
                diagnostics.iter().map(|d| d.to_string()).join("\n")
            );
        }

        let mut decls = Vec::new();
        for child in tu.get_entity().get_children() {
            match child.get_kind() {
                EntityKind::StructDecl => {
                    if let Some(decl) = lower_struct(child)? {
                        decls.push(CDecl::Struct(decl));
                    }
                }
                EntityKind::TypedefDecl => {
                    if let Some(decl) = lower_typedef(child) {
                        decls.push(CDecl::Typedef(decl));
                    }
                }
                _ => {}
            }
        }
        Ok(decls)
    }
}

/// Lowers a struct entity. Forward declarations, anonymous definitions
/// and empty definitions carry nothing extractable and produce `None`.
fn lower_struct(entity: Entity<'_>) -> Result<Option<CStructDecl>> {
    if !entity.is_definition() {
        return Ok(None);
    }
    let name = match entity.get_name() {
        Some(name) => name,
        None => return Ok(None),
    };
    let mut members = Vec::new();
    for child in entity.get_children() {
        if child.get_kind() == EntityKind::FieldDecl {
            members.push(lower_member(child)?);
        }
    }
    if members.is_empty() {
        return Ok(None);
    }
    Ok(Some(CStructDecl { name, members }))
}

/// Lowers a typedef entity. Only typedefs whose underlying type is
/// directly a named struct reference are relevant; everything else
/// (typedefs of typedefs, of builtins, of pointers, of unions) is
/// dropped here.
fn lower_typedef(entity: Entity<'_>) -> Option<CTypedefDecl> {
    let name = entity.get_name()?;
    let underlying = entity.get_typedef_underlying_type()?;
    match underlying.get_kind() {
        TypeKind::Elaborated | TypeKind::Record => {}
        _ => return None,
    }
    let declaration = underlying.get_declaration()?;
    if declaration.get_kind() != EntityKind::StructDecl {
        return None;
    }
    let target = declaration.get_name()?;
    Some(CTypedefDecl {
        name,
        underlying: target,
    })
}

fn lower_member(entity: Entity<'_>) -> Result<CMember> {
    let name = entity.get_name().unwrap_or_default();
    let field_type = entity
        .get_type()
        .ok_or_else(|| format_err!("field '{}' has no type information", name))?;
    let bit_width = if entity.is_bit_field() {
        entity.get_bit_field_width().map(|width| width as u32)
    } else {
        None
    };

    let mut dim_sizes = Vec::new();
    let mut element = field_type;
    loop {
        match element.get_kind() {
            TypeKind::ConstantArray => {
                dim_sizes.push(element.get_size());
                element = element
                    .get_element_type()
                    .ok_or_else(|| format_err!("array field '{}' has no element type", name))?;
            }
            TypeKind::IncompleteArray => {
                dim_sizes.push(None);
                element = element
                    .get_element_type()
                    .ok_or_else(|| format_err!("array field '{}' has no element type", name))?;
            }
            _ => break,
        }
    }

    let array_dims = if dim_sizes.is_empty() {
        Vec::new()
    } else {
        // Prefer the dimension text as spelled in the source so macro
        // names survive; fall back to the evaluated extents when the
        // tokens cannot be recovered.
        match array_dim_texts(entity) {
            Some(texts) if texts.len() == dim_sizes.len() => texts
                .into_iter()
                .map(|text| if text.is_empty() { None } else { Some(text) })
                .collect(),
            _ => dim_sizes
                .into_iter()
                .map(|size| size.map(|value| value.to_string()))
                .collect(),
        }
    };

    Ok(CMember {
        name,
        type_ref: lower_type_ref(element),
        array_dims,
        bit_width,
    })
}

fn lower_type_ref(type1: Type<'_>) -> CTypeRef {
    match type1.get_kind() {
        TypeKind::Pointer | TypeKind::BlockPointer => {
            let points_at_function = type1
                .get_pointee_type()
                .map(|pointee| {
                    matches!(
                        pointee.get_kind(),
                        TypeKind::FunctionPrototype | TypeKind::FunctionNoPrototype
                    )
                })
                .unwrap_or(false);
            if points_at_function {
                CTypeRef::FunctionPointer
            } else {
                CTypeRef::Pointer
            }
        }
        TypeKind::FunctionPrototype | TypeKind::FunctionNoPrototype => CTypeRef::FunctionPointer,
        // The typedef name is kept as spelled; resolution to the
        // canonical struct name is the typedef table's job, not the
        // parser's.
        TypeKind::Typedef => CTypeRef::Name(first_identifier(&type1.get_display_name())),
        TypeKind::Elaborated | TypeKind::Record => match type1.get_declaration() {
            Some(declaration) => lower_aggregate_ref(declaration),
            None => CTypeRef::Anonymous,
        },
        TypeKind::Enum => match type1.get_declaration().and_then(|d| d.get_name()) {
            Some(name) => CTypeRef::EnumRef(name),
            None => CTypeRef::Anonymous,
        },
        _ => {
            let name = first_identifier(&type1.get_display_name());
            if name.is_empty() {
                CTypeRef::Anonymous
            } else {
                CTypeRef::Name(name)
            }
        }
    }
}

fn lower_aggregate_ref(declaration: Entity<'_>) -> CTypeRef {
    match (declaration.get_kind(), declaration.get_name()) {
        (EntityKind::StructDecl, Some(name)) => CTypeRef::StructRef(name),
        (EntityKind::UnionDecl, Some(name)) => CTypeRef::UnionRef(name),
        (EntityKind::EnumDecl, Some(name)) => CTypeRef::EnumRef(name),
        _ => CTypeRef::Anonymous,
    }
}

/// First identifier of a type spelling, skipping qualifiers:
/// `const unsigned int` yields `unsigned`.
fn first_identifier(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .find(|word| *word != "const" && *word != "volatile")
        .unwrap_or("")
        .to_string()
}

/// Recovers each array dimension's text from the field's source tokens:
/// `char name[MAX_LEN]` yields `["MAX_LEN"]`. Returns `None` when the
/// declaration's tokens are unavailable.
fn array_dim_texts(entity: Entity<'_>) -> Option<Vec<String>> {
    let range = entity.get_range()?;
    let mut dims = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for token in range.tokenize() {
        let spelling = token.get_spelling();
        match spelling.as_str() {
            "[" => {
                if depth == 0 {
                    current.clear();
                } else {
                    current.push('[');
                }
                depth += 1;
            }
            "]" => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    dims.push(current.clone());
                } else {
                    current.push(']');
                }
            }
            _ if depth > 0 => {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&spelling);
            }
            _ => {}
        }
    }
    if dims.is_empty() {
        None
    } else {
        Some(dims)
    }
}

#[cfg(test)]
mod tests {
    use super::first_identifier;

    #[test]
    fn first_identifier_should_skip_qualifiers() {
        assert_eq!(first_identifier("int"), "int");
        assert_eq!(first_identifier("unsigned int"), "unsigned");
        assert_eq!(first_identifier("const unsigned long"), "unsigned");
        assert_eq!(first_identifier("const vec2"), "vec2");
        assert_eq!(first_identifier(""), "");
    }
}
