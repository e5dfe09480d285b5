//! Extraction of field models from a scanned corpus.
//!
//! The second pipeline phase. The scan state is read-only here; every
//! tagged owner is looked up, its members are classified and resolved,
//! and the result is an ordered list of [`DropStruct`]s for the
//! renderer. Per-member anomalies skip the member with a diagnostic and
//! never abort the run.

use crate::c_decl::{CMember, CStructDecl, CTypeRef};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::drop_data::{DropField, DropStruct};
use crate::scan::ScanState;
use log::{debug, trace};

/// Shape of a struct member as far as the metadata model is concerned.
/// Classification is exhaustive; a shape with no counterpart in the
/// model comes out as `Unsupported` and is reported, never silently
/// dropped or mis-extracted.
#[derive(Debug)]
enum MemberShape<'a> {
    /// The sentinel member tagging the struct. Metadata, not data.
    Marker,
    /// Plain member of a named type.
    Scalar { type_name: &'a str },
    /// Array with a single sized dimension.
    Array { type_name: &'a str, count: &'a str },
    Unsupported { reason: String },
}

fn classify(member: &CMember) -> MemberShape<'_> {
    if member.is_marker() {
        return MemberShape::Marker;
    }
    if member.name.is_empty() {
        return MemberShape::Unsupported {
            reason: "unnamed member".to_string(),
        };
    }
    if member.bit_width.is_some() {
        return MemberShape::Unsupported {
            reason: "bitfield".to_string(),
        };
    }
    let type_name = match &member.type_ref {
        CTypeRef::Name(name) => name.as_str(),
        CTypeRef::StructRef(name) => name.as_str(),
        CTypeRef::UnionRef(_)
        | CTypeRef::EnumRef(_)
        | CTypeRef::Pointer
        | CTypeRef::FunctionPointer
        | CTypeRef::Anonymous => {
            return MemberShape::Unsupported {
                reason: member.type_ref.short_text(),
            };
        }
    };
    match member.array_dims.as_slice() {
        [] => MemberShape::Scalar { type_name },
        [Some(count)] => MemberShape::Array { type_name, count },
        [None] => MemberShape::Unsupported {
            reason: "array of unknown length".to_string(),
        },
        _ => MemberShape::Unsupported {
            reason: "multi-dimensional array".to_string(),
        },
    }
}

/// Builds the final metadata list from a fully scanned corpus. Owners
/// are processed in name order, so the output does not depend on the
/// order headers were scanned in. An owner without a registered struct
/// definition is skipped with a diagnostic.
pub fn extract_structs(state: &ScanState, diagnostics: &mut Diagnostics) -> Vec<DropStruct> {
    let mut result = Vec::new();
    for owner in state.markers.iter() {
        match state.structs.get(owner) {
            Some(decl) => result.push(extract_one(owner, decl, state, diagnostics)),
            None => {
                diagnostics.report(
                    DiagnosticKind::UnresolvedOwner,
                    format!("failed to find struct '{}' tagged for metadata", owner),
                );
            }
        }
    }
    result
}

fn extract_one(
    owner: &str,
    decl: &CStructDecl,
    state: &ScanState,
    diagnostics: &mut Diagnostics,
) -> DropStruct {
    debug!("extracting struct {}", owner);
    let mut drop_struct = DropStruct::new(owner);
    for member in &decl.members {
        let field = match classify(member) {
            MemberShape::Marker => {
                trace!("skipping marker member '{}'", member.name);
                continue;
            }
            MemberShape::Scalar { type_name } => {
                match resolve(state, owner, member, type_name, diagnostics) {
                    Some(resolved) => {
                        debug!("> {} {}", resolved, member.name);
                        DropField::scalar(member.name.clone(), resolved)
                    }
                    None => continue,
                }
            }
            MemberShape::Array { type_name, count } => {
                match resolve(state, owner, member, type_name, diagnostics) {
                    Some(resolved) => {
                        debug!("> {} {}[{}]", resolved, member.name, count);
                        DropField::array(member.name.clone(), resolved, count)
                    }
                    None => continue,
                }
            }
            MemberShape::Unsupported { reason } => {
                diagnostics.report(
                    DiagnosticKind::UnsupportedMember,
                    format!(
                        "unsupported member '{}' in struct '{}': {}",
                        member.name, owner, reason
                    ),
                );
                continue;
            }
        };
        if !drop_struct.add_field(field) {
            diagnostics.report(
                DiagnosticKind::DuplicateField,
                format!(
                    "duplicate field name '{}' in struct '{}'",
                    member.name, owner
                ),
            );
        }
    }
    drop_struct
}

fn resolve(
    state: &ScanState,
    owner: &str,
    member: &CMember,
    type_name: &str,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    match state.typedefs.resolve(type_name) {
        Ok(resolved) => {
            trace!("Resolved {} -> {}.", type_name, resolved);
            Some(resolved)
        }
        Err(err) => {
            diagnostics.report(
                DiagnosticKind::TypedefCycle,
                format!(
                    "skipping field '{}' in struct '{}': {}",
                    member.name, owner, err
                ),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c_decl::{CDecl, CTypedefDecl, DROP_MARKER_TYPE};

    fn tagged_struct(name: &str, mut members: Vec<CMember>) -> CDecl {
        members.push(CMember::scalar(
            format!("{}_meta", name),
            CTypeRef::struct_ref(DROP_MARKER_TYPE),
        ));
        CDecl::Struct(CStructDecl {
            name: name.to_string(),
            members,
        })
    }

    fn scan(decls: Vec<CDecl>) -> (ScanState, Diagnostics) {
        let mut state = ScanState::new();
        let mut diagnostics = Diagnostics::new();
        state.scan_decls("input.h", decls, &mut diagnostics);
        (state, diagnostics)
    }

    #[test]
    fn should_extract_scalars_and_skip_the_marker() {
        let decls = vec![tagged_struct(
            "point",
            vec![
                CMember::scalar("x", CTypeRef::named("int")),
                CMember::scalar("y", CTypeRef::named("int")),
            ],
        )];
        let (state, mut diagnostics) = scan(decls);
        let structs = extract_structs(&state, &mut diagnostics);

        assert_eq!(structs.len(), 1);
        assert_eq!(structs[0].name(), "point");
        let fields = structs[0].fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0], DropField::scalar("x", "int"));
        assert_eq!(fields[1], DropField::scalar("y", "int"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn should_capture_array_lengths_verbatim() {
        let decls = vec![tagged_struct(
            "arr",
            vec![
                CMember::array("name", CTypeRef::named("char"), vec![Some("32".into())]),
                CMember::array(
                    "entries",
                    CTypeRef::named("int"),
                    vec![Some("MAX_ENTRIES".into())],
                ),
            ],
        )];
        let (state, mut diagnostics) = scan(decls);
        let structs = extract_structs(&state, &mut diagnostics);

        let fields = structs[0].fields();
        assert_eq!(fields[0], DropField::array("name", "char", "32"));
        assert_eq!(fields[1], DropField::array("entries", "int", "MAX_ENTRIES"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn should_resolve_field_types_through_typedefs() {
        let decls = vec![
            CDecl::Typedef(CTypedefDecl {
                name: "vec2".to_string(),
                underlying: "vec2_s".to_string(),
            }),
            tagged_struct(
                "body",
                vec![
                    CMember::scalar("position", CTypeRef::named("vec2")),
                    CMember::scalar("anchor", CTypeRef::struct_ref("vec2")),
                ],
            ),
        ];
        let (state, mut diagnostics) = scan(decls);
        let structs = extract_structs(&state, &mut diagnostics);

        let fields = structs[0].fields();
        assert_eq!(fields[0].field_type, "vec2_s");
        assert_eq!(fields[1].field_type, "vec2_s");
    }

    #[test]
    fn should_report_unsupported_members_and_keep_the_rest() {
        let decls = vec![tagged_struct(
            "mixed",
            vec![
                CMember::scalar("ok", CTypeRef::named("int")),
                CMember::scalar("ptr", CTypeRef::Pointer),
                CMember::scalar("callback", CTypeRef::FunctionPointer),
                CMember::scalar("u", CTypeRef::UnionRef("u_s".to_string())),
                CMember::scalar("e", CTypeRef::EnumRef("color".to_string())),
                CMember::scalar("anon", CTypeRef::Anonymous),
                CMember {
                    bit_width: Some(3),
                    ..CMember::scalar("flags", CTypeRef::named("int"))
                },
                CMember::array(
                    "grid",
                    CTypeRef::named("int"),
                    vec![Some("2".into()), Some("2".into())],
                ),
                CMember::array("open", CTypeRef::named("int"), vec![None]),
                CMember::scalar("", CTypeRef::named("int")),
            ],
        )];
        let (state, mut diagnostics) = scan(decls);
        let structs = extract_structs(&state, &mut diagnostics);

        let fields = structs[0].fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "ok");
        assert_eq!(diagnostics.count_of(DiagnosticKind::UnsupportedMember), 9);
    }

    #[test]
    fn should_report_duplicate_fields_once_per_attempt() {
        let decls = vec![tagged_struct(
            "dup",
            vec![
                CMember::scalar("x", CTypeRef::named("int")),
                CMember::scalar("x", CTypeRef::named("float")),
            ],
        )];
        let (state, mut diagnostics) = scan(decls);
        let structs = extract_structs(&state, &mut diagnostics);

        let fields = structs[0].fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_type, "int");
        assert_eq!(diagnostics.count_of(DiagnosticKind::DuplicateField), 1);
    }

    #[test]
    fn should_skip_owners_without_a_registered_struct() {
        let orphan = CDecl::Struct(CStructDecl {
            name: "carrier".to_string(),
            members: vec![CMember::scalar(
                "ghost_meta",
                CTypeRef::struct_ref(DROP_MARKER_TYPE),
            )],
        });
        let (state, mut diagnostics) = scan(vec![orphan]);
        let structs = extract_structs(&state, &mut diagnostics);

        assert!(structs.is_empty());
        assert_eq!(diagnostics.count_of(DiagnosticKind::UnresolvedOwner), 1);
    }

    #[test]
    fn owner_name_should_come_from_the_marker_member() {
        // The marker inside `container` names `payload`, so the layout
        // of `payload` is extracted even though `container` carries it.
        let decls = vec![
            CDecl::Struct(CStructDecl {
                name: "payload".to_string(),
                members: vec![CMember::scalar("value", CTypeRef::named("int"))],
            }),
            CDecl::Struct(CStructDecl {
                name: "container".to_string(),
                members: vec![CMember::scalar(
                    "payload_meta",
                    CTypeRef::struct_ref(DROP_MARKER_TYPE),
                )],
            }),
        ];
        let (state, mut diagnostics) = scan(decls);
        let structs = extract_structs(&state, &mut diagnostics);

        assert_eq!(structs.len(), 1);
        assert_eq!(structs[0].name(), "payload");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn typedef_cycle_should_skip_the_field_not_the_struct() {
        let decls = vec![
            CDecl::Typedef(CTypedefDecl {
                name: "A".to_string(),
                underlying: "B".to_string(),
            }),
            CDecl::Typedef(CTypedefDecl {
                name: "B".to_string(),
                underlying: "A".to_string(),
            }),
            tagged_struct(
                "cyclic",
                vec![
                    CMember::scalar("looped", CTypeRef::named("A")),
                    CMember::scalar("fine", CTypeRef::named("int")),
                ],
            ),
        ];
        let (state, mut diagnostics) = scan(decls);
        let structs = extract_structs(&state, &mut diagnostics);

        let fields = structs[0].fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "fine");
        assert_eq!(diagnostics.count_of(DiagnosticKind::TypedefCycle), 1);
    }
}
