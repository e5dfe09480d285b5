//! Run-scoped state populated while scanning a header corpus.
//!
//! Scanning is the first of the two pipeline phases: every matched
//! header is parsed and its declarations are folded into a [`ScanState`].
//! The state is then read-only input to the extraction phase. A new
//! generation target starts from a fresh state; nothing is shared
//! between runs.

use crate::c_decl::{CDecl, CStructDecl, CTypedefDecl, MARKER_NAME_SUFFIX};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::errors::{bail, Result};
use itertools::Itertools;
use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet};

/// Typedef aliases that point directly at struct types.
///
/// Only `typedef struct X Y;` declarations are recorded. Typedefs of
/// builtins, pointers or other typedefs never enter the table, so
/// `resolve` only chases chains composed of direct struct aliases.
#[derive(Debug, Default)]
pub struct TypedefTable {
    aliases: BTreeMap<String, String>,
}

impl TypedefTable {
    /// Records `alias -> target`, overwriting any previous mapping.
    /// Returns the previous target so the caller can report the
    /// overwrite; re-inserting an identical mapping is not an anomaly
    /// (the same header is routinely parsed through several files).
    pub fn insert(&mut self, alias: String, target: String) -> Option<String> {
        self.aliases.insert(alias, target)
    }

    /// Follows alias mappings until the current name is absent from the
    /// table. The result is a fixed point: resolving it again returns it
    /// unchanged. A cyclic chain is reported as an error instead of
    /// looping forever.
    pub fn resolve(&self, name: &str) -> Result<String> {
        let mut chain = vec![name.to_string()];
        let mut visited = BTreeSet::new();
        let mut current = name.to_string();
        while let Some(target) = self.aliases.get(&current) {
            if !visited.insert(current.clone()) {
                bail!(
                    "typedef cycle while resolving '{}': {}",
                    name,
                    chain.iter().join(" -> ")
                );
            }
            current = target.clone();
            chain.push(current.clone());
        }
        Ok(current)
    }
}

/// Outcome of a registry insert, reported instead of silently
/// overwriting so the caller can decide between warn and fail.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RegistryOutcome {
    Inserted,
    /// The same declaration was already registered; not an anomaly.
    Identical,
    /// A different declaration owns this name; the first one is kept.
    Conflict,
}

/// Struct declarations keyed by name. The first definition wins.
#[derive(Debug, Default)]
pub struct StructRegistry {
    structs: BTreeMap<String, CStructDecl>,
}

impl StructRegistry {
    pub fn insert(&mut self, decl: CStructDecl) -> RegistryOutcome {
        match self.structs.get(&decl.name) {
            None => {
                self.structs.insert(decl.name.clone(), decl);
                RegistryOutcome::Inserted
            }
            Some(existing) if *existing == decl => RegistryOutcome::Identical,
            Some(_) => RegistryOutcome::Conflict,
        }
    }

    pub fn get(&self, name: &str) -> Option<&CStructDecl> {
        self.structs.get(name)
    }
}

/// Names of structs tagged for metadata generation. Insertion-only and
/// deduplicated; iteration is in name order, which makes extraction
/// independent of the order headers were scanned in.
#[derive(Debug, Default)]
pub struct MarkerSet {
    owners: BTreeSet<String>,
}

impl MarkerSet {
    /// Returns `false` if the owner was already present.
    pub fn insert(&mut self, owner: String) -> bool {
        self.owners.insert(owner)
    }

    pub fn contains(&self, owner: &str) -> bool {
        self.owners.contains(owner)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.owners.iter().map(|owner| owner.as_str())
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Derives the owner struct name from a marker member name by
/// truncating it at the first occurrence of the reserved suffix.
/// `state_meta` yields `state`. Returns `None` when the suffix is
/// missing or the truncation leaves nothing.
pub fn owner_from_marker_name(member_name: &str) -> Option<&str> {
    let index = member_name.find(MARKER_NAME_SUFFIX)?;
    if index == 0 {
        return None;
    }
    Some(&member_name[..index])
}

/// All state accumulated while scanning one generation target.
#[derive(Debug, Default)]
pub struct ScanState {
    pub typedefs: TypedefTable,
    pub structs: StructRegistry,
    pub markers: MarkerSet,
    /// Basenames of the files that tagged at least one owner, the raw
    /// material of the generated include list.
    pub include_basenames: BTreeSet<String>,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one parsed file's declarations into the state. `basename`
    /// is the file's name without directories; it is recorded when the
    /// file tags at least one owner.
    pub fn scan_decls(
        &mut self,
        basename: &str,
        decls: Vec<CDecl>,
        diagnostics: &mut Diagnostics,
    ) {
        for decl in decls {
            match decl {
                CDecl::Typedef(typedef) => self.scan_typedef(typedef, diagnostics),
                CDecl::Struct(struct_decl) => {
                    self.scan_struct(basename, struct_decl, diagnostics)
                }
            }
        }
    }

    fn scan_typedef(&mut self, typedef: CTypedefDecl, diagnostics: &mut Diagnostics) {
        trace!("typedef {} -> struct {}", typedef.name, typedef.underlying);
        let CTypedefDecl { name, underlying } = typedef;
        if let Some(previous) = self.typedefs.insert(name.clone(), underlying.clone()) {
            if previous != underlying {
                diagnostics.report(
                    DiagnosticKind::DuplicateTypedef,
                    format!(
                        "typedef '{}' redefined: now 'struct {}', was 'struct {}'",
                        name, underlying, previous
                    ),
                );
            }
        }
    }

    fn scan_struct(
        &mut self,
        basename: &str,
        decl: CStructDecl,
        diagnostics: &mut Diagnostics,
    ) {
        let mut tags_file = false;
        for member in decl.marker_members() {
            match owner_from_marker_name(&member.name) {
                Some(owner) => {
                    debug!("Selected struct {}...", owner);
                    self.markers.insert(owner.to_string());
                    tags_file = true;
                }
                None => {
                    diagnostics.report(
                        DiagnosticKind::MalformedMarker,
                        format!(
                            "marker member '{}' in struct '{}' does not follow \
                             the '<owner>{}' naming convention",
                            member.name, decl.name, MARKER_NAME_SUFFIX
                        ),
                    );
                }
            }
        }
        if tags_file {
            self.include_basenames.insert(basename.to_string());
        }

        let name = decl.name.clone();
        match self.structs.insert(decl) {
            RegistryOutcome::Inserted | RegistryOutcome::Identical => {}
            RegistryOutcome::Conflict => {
                diagnostics.report(
                    DiagnosticKind::DuplicateStruct,
                    format!(
                        "struct '{}' defined more than once with different members; \
                         keeping the first definition",
                        name
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c_decl::{CMember, CTypeRef, DROP_MARKER_TYPE};

    #[test]
    fn resolve_should_reach_a_fixed_point() {
        let mut table = TypedefTable::default();
        table.insert("Foo".to_string(), "Bar".to_string());

        assert_eq!(table.resolve("Foo").unwrap(), "Bar");
        assert_eq!(table.resolve("Bar").unwrap(), "Bar");
        assert_eq!(table.resolve("Baz").unwrap(), "Baz");

        let once = table.resolve("Foo").unwrap();
        assert_eq!(table.resolve(&once).unwrap(), once);
    }

    #[test]
    fn resolve_should_follow_alias_chains() {
        let mut table = TypedefTable::default();
        table.insert("vec2".to_string(), "vec2_s".to_string());
        table.insert("vec2_s".to_string(), "vec2_impl".to_string());

        assert_eq!(table.resolve("vec2").unwrap(), "vec2_impl");
    }

    #[test]
    fn resolve_should_detect_cycles() {
        let mut table = TypedefTable::default();
        table.insert("A".to_string(), "B".to_string());
        table.insert("B".to_string(), "A".to_string());

        let err = table.resolve("A").unwrap_err();
        assert!(err.to_string().contains("typedef cycle"));
    }

    #[test]
    fn owner_derivation_should_truncate_at_suffix() {
        assert_eq!(owner_from_marker_name("tag_meta"), Some("tag"));
        assert_eq!(owner_from_marker_name("state_meta"), Some("state"));
        assert_eq!(owner_from_marker_name("a_meta_meta"), Some("a"));
        assert_eq!(owner_from_marker_name("_meta"), None);
        assert_eq!(owner_from_marker_name("state"), None);
    }

    #[test]
    fn registry_should_keep_first_definition() {
        let mut registry = StructRegistry::default();
        let first = CStructDecl {
            name: "state".to_string(),
            members: vec![CMember::scalar("x", CTypeRef::named("int"))],
        };
        let identical = first.clone();
        let conflicting = CStructDecl {
            name: "state".to_string(),
            members: vec![CMember::scalar("x", CTypeRef::named("float"))],
        };

        assert_eq!(registry.insert(first), RegistryOutcome::Inserted);
        assert_eq!(registry.insert(identical), RegistryOutcome::Identical);
        assert_eq!(registry.insert(conflicting), RegistryOutcome::Conflict);

        let kept = registry.get("state").unwrap();
        assert_eq!(kept.members[0].type_ref, CTypeRef::named("int"));
    }

    #[test]
    fn scan_should_collect_markers_and_basenames() {
        let mut state = ScanState::new();
        let mut diagnostics = Diagnostics::new();

        let tagged = CStructDecl {
            name: "state".to_string(),
            members: vec![
                CMember::scalar("x", CTypeRef::named("int")),
                CMember::scalar("state_meta", CTypeRef::struct_ref(DROP_MARKER_TYPE)),
            ],
        };
        state.scan_decls("state.h", vec![CDecl::Struct(tagged)], &mut diagnostics);

        let plain = CStructDecl {
            name: "helper".to_string(),
            members: vec![CMember::scalar("n", CTypeRef::named("int"))],
        };
        state.scan_decls("helper.h", vec![CDecl::Struct(plain)], &mut diagnostics);

        assert!(state.markers.contains("state"));
        assert_eq!(state.markers.len(), 1);
        assert!(state.include_basenames.contains("state.h"));
        assert!(!state.include_basenames.contains("helper.h"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn scan_should_report_malformed_marker_names() {
        let mut state = ScanState::new();
        let mut diagnostics = Diagnostics::new();

        let tagged = CStructDecl {
            name: "state".to_string(),
            members: vec![CMember::scalar(
                "marker",
                CTypeRef::struct_ref(DROP_MARKER_TYPE),
            )],
        };
        state.scan_decls("state.h", vec![CDecl::Struct(tagged)], &mut diagnostics);

        assert!(state.markers.is_empty());
        assert!(state.include_basenames.is_empty());
        assert_eq!(diagnostics.count_of(DiagnosticKind::MalformedMarker), 1);
    }

    #[test]
    fn scan_should_report_typedef_redefinition() {
        let mut state = ScanState::new();
        let mut diagnostics = Diagnostics::new();

        let decls = vec![
            CDecl::Typedef(CTypedefDecl {
                name: "handle".to_string(),
                underlying: "handle_s".to_string(),
            }),
            CDecl::Typedef(CTypedefDecl {
                name: "handle".to_string(),
                underlying: "handle_s".to_string(),
            }),
            CDecl::Typedef(CTypedefDecl {
                name: "handle".to_string(),
                underlying: "other_s".to_string(),
            }),
        ];
        state.scan_decls("handle.h", decls, &mut diagnostics);

        assert_eq!(diagnostics.count_of(DiagnosticKind::DuplicateTypedef), 1);
        assert_eq!(state.typedefs.resolve("handle").unwrap(), "other_s");
    }

    #[test]
    fn scan_should_report_conflicting_struct_definitions() {
        let mut state = ScanState::new();
        let mut diagnostics = Diagnostics::new();

        let first = CStructDecl {
            name: "state".to_string(),
            members: vec![CMember::scalar("x", CTypeRef::named("int"))],
        };
        let repeat = first.clone();
        let conflicting = CStructDecl {
            name: "state".to_string(),
            members: vec![CMember::scalar("x", CTypeRef::named("float"))],
        };

        state.scan_decls("state.h", vec![CDecl::Struct(first)], &mut diagnostics);
        state.scan_decls("state.h", vec![CDecl::Struct(repeat)], &mut diagnostics);
        assert!(diagnostics.is_empty());

        state.scan_decls(
            "state_alt.h",
            vec![CDecl::Struct(conflicting)],
            &mut diagnostics,
        );
        assert_eq!(diagnostics.count_of(DiagnosticKind::DuplicateStruct), 1);

        let kept = state.structs.get("state").unwrap();
        assert_eq!(kept.members[0].type_ref, CTypeRef::named("int"));
    }
}
