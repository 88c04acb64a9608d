// Reference index built from tree-sitter `locals` queries
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tree_sitter::{Node, Query, QueryCursor, StreamingIterator, Tree};
use url::Url;

use super::{IndexError, ReferenceIndex, ReferenceOrigin, ReferenceTarget};
use crate::document::PositionMapper;

const DEFINITION_CAPTURE: &str = "local.definition";
const REFERENCE_CAPTURE: &str = "local.reference";
const SCOPE_CAPTURE: &str = "local.scope";

/// Definition kinds visible before the point where they are declared
const HOISTED_KINDS: &[&str] = &[
    "function",
    "method",
    "type",
    "struct",
    "enum",
    "class",
    "macro",
    "module",
    "namespace",
    "import",
];

/// Fields through which a declaration node names what it declares
const DECLARATION_FIELDS: &[&str] = &["name", "pattern"];

/// Where a definition becomes visible, from `#set! <capture>.scope` properties
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum ScopeMode {
    #[default]
    Local,
    Parent,
    Global,
}

struct DefinitionCapture<'tree> {
    node: Node<'tree>,
    kind: Option<String>,
    scope_mode: ScopeMode,
}

#[derive(Default)]
struct Captures<'tree> {
    scopes: HashSet<usize>,
    definitions: Vec<DefinitionCapture<'tree>>,
    references: Vec<Node<'tree>>,
}

/// What reference resolution needs to know about a definition
struct Visibility {
    record: usize,
    scope_id: usize,
    start_byte: usize,
    declaration: (usize, usize),
    hoisted: bool,
}

/// Reference index over one document snapshot.
///
/// Everything is resolved up front, so lookups never touch the syntax tree
/// again and the index can outlive the snapshot it was built from.
#[derive(Debug)]
pub struct LocalsIndex {
    uri: Url,
    /// Distinct targets in document order
    targets: Vec<ReferenceTarget>,
    records: HashMap<ReferenceTarget, usize>,
    origins: Vec<Vec<ReferenceOrigin>>,
}

impl LocalsIndex {
    pub fn build(uri: Url, text: &str, tree: &Tree, query: &Query) -> Self {
        let captures = collect_captures(text, tree, query);
        let mapper = PositionMapper::new(text);
        let root = tree.root_node();

        let mut targets = Vec::with_capacity(captures.definitions.len());
        let mut records: HashMap<ReferenceTarget, usize> = HashMap::new();
        let mut visible = Vec::new();
        let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut definition_nodes = HashSet::new();

        for definition in &captures.definitions {
            let node = definition.node;
            let Ok(name) = node.utf8_text(text.as_bytes()) else {
                continue;
            };
            let declaration = declaration_of(node);
            let (Some(range), Some(def_range)) = (
                mapper.source_range(declaration.start_byte(), declaration.end_byte()),
                mapper.source_range(node.start_byte(), node.end_byte()),
            ) else {
                continue;
            };

            let target = ReferenceTarget {
                range,
                def_range: Some(def_range),
                name: name.to_string(),
                kind: definition.kind.clone(),
            };
            // A pattern repeated in the query yields the same target twice
            let record = match records.entry(target) {
                Entry::Occupied(entry) => *entry.get(),
                Entry::Vacant(entry) => {
                    targets.push(entry.key().clone());
                    *entry.insert(targets.len() - 1)
                }
            };

            // The same node captured under several kinds resolves to its first record
            if !definition_nodes.insert(node.id()) {
                continue;
            }

            let chain = scope_chain(node, &captures.scopes, root);
            by_name.entry(name).or_default().push(visible.len());
            visible.push(Visibility {
                record,
                scope_id: definition_scope(definition, &chain),
                start_byte: node.start_byte(),
                declaration: (declaration.start_byte(), declaration.end_byte()),
                hoisted: definition.kind.as_deref().is_some_and(is_hoisted),
            });
        }

        let mut origins = vec![Vec::new(); targets.len()];
        let mut seen_references = HashSet::new();

        for reference in &captures.references {
            if definition_nodes.contains(&reference.id()) || !seen_references.insert(reference.id())
            {
                continue;
            }
            let Ok(name) = reference.utf8_text(text.as_bytes()) else {
                continue;
            };
            let Some(candidates) = by_name.get(name) else {
                continue;
            };

            let chain: Vec<usize> = scope_chain(*reference, &captures.scopes, root)
                .iter()
                .map(|scope| scope.id())
                .collect();

            let resolved = candidates
                .iter()
                .map(|&index| &visible[index])
                .filter_map(|definition| {
                    resolution_rank(definition, reference, &chain).map(|rank| (rank, definition))
                })
                .min_by_key(|(rank, _)| *rank);

            let Some((_, definition)) = resolved else {
                continue;
            };
            if let Some(range) = mapper.source_range(reference.start_byte(), reference.end_byte()) {
                origins[definition.record].push(ReferenceOrigin { range });
            }
        }

        log::debug!(
            target: "reflens::locals",
            "Indexed {}: {} targets, {} scopes, {} references",
            uri,
            targets.len(),
            captures.scopes.len(),
            captures.references.len()
        );

        Self {
            uri,
            targets,
            records,
            origins,
        }
    }
}

impl ReferenceIndex for LocalsIndex {
    fn targets_in_file(&self, file: &Url) -> Result<Vec<ReferenceTarget>, IndexError> {
        if file != &self.uri {
            return Err(IndexError::decode(
                file.as_str(),
                format!("index was built for {}", self.uri),
            ));
        }
        Ok(self.targets.clone())
    }

    fn origins_targeting(
        &self,
        target: &ReferenceTarget,
    ) -> Result<Vec<ReferenceOrigin>, IndexError> {
        self.records
            .get(target)
            .map(|&record| self.origins[record].clone())
            .ok_or_else(|| IndexError::lookup(&target.name, "target is not part of this document"))
    }
}

fn collect_captures<'tree>(text: &str, tree: &'tree Tree, query: &Query) -> Captures<'tree> {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, tree.root_node(), text.as_bytes());
    let capture_names = query.capture_names();
    let mut captures = Captures::default();

    while let Some(match_) = matches.next() {
        for capture in match_.captures {
            let capture_name = capture_names[capture.index as usize];
            let node = capture.node;

            if capture_name == SCOPE_CAPTURE {
                captures.scopes.insert(node.id());
            } else if let Some(suffix) = capture_name.strip_prefix(DEFINITION_CAPTURE) {
                let Some(kind) = capture_kind(suffix) else {
                    continue;
                };
                let scope_mode = query
                    .property_settings(match_.pattern_index)
                    .iter()
                    .filter(|property| {
                        property.key.ends_with(".scope")
                            && property
                                .capture_id
                                .is_none_or(|id| id == capture.index as usize)
                    })
                    .find_map(|property| match property.value.as_deref() {
                        Some("parent") => Some(ScopeMode::Parent),
                        Some("global") => Some(ScopeMode::Global),
                        Some("local") => Some(ScopeMode::Local),
                        _ => None,
                    })
                    .unwrap_or_default();
                captures.definitions.push(DefinitionCapture {
                    node,
                    kind,
                    scope_mode,
                });
            } else if let Some(suffix) = capture_name.strip_prefix(REFERENCE_CAPTURE) {
                if capture_kind(suffix).is_some() {
                    captures.references.push(node);
                }
            }
        }
    }

    captures
}

/// `""` is an unkinded capture, `".kind"` a kinded one; anything else
/// (e.g. `local.definitionx`) is not a locals capture at all.
fn capture_kind(suffix: &str) -> Option<Option<String>> {
    if suffix.is_empty() {
        Some(None)
    } else {
        suffix
            .strip_prefix('.')
            .filter(|kind| !kind.is_empty())
            .map(|kind| Some(kind.to_string()))
    }
}

fn is_hoisted(kind: &str) -> bool {
    let base = kind.split('.').next().unwrap_or(kind);
    HOISTED_KINDS.contains(&base)
}

/// The declaration a definition names, or the definition itself.
fn declaration_of(node: Node<'_>) -> Node<'_> {
    node.parent()
        .filter(|parent| {
            DECLARATION_FIELDS.iter().any(|field| {
                parent
                    .child_by_field_name(field)
                    .is_some_and(|child| child.id() == node.id())
            })
        })
        .unwrap_or(node)
}

/// Scopes enclosing `node`, innermost first, always ending at the root.
fn scope_chain<'tree>(
    node: Node<'tree>,
    scopes: &HashSet<usize>,
    root: Node<'tree>,
) -> Vec<Node<'tree>> {
    let mut chain = Vec::new();
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if scopes.contains(&ancestor.id()) {
            chain.push(ancestor);
        }
        current = ancestor.parent();
    }
    if chain.last().is_none_or(|last| last.id() != root.id()) {
        chain.push(root);
    }
    chain
}

fn definition_scope(definition: &DefinitionCapture<'_>, chain: &[Node<'_>]) -> usize {
    let root = chain[chain.len() - 1];
    let innermost = chain[0];
    let outer = chain.get(1).copied().unwrap_or(root);

    let scope = match definition.scope_mode {
        ScopeMode::Global => root,
        ScopeMode::Parent => outer,
        ScopeMode::Local => {
            // `fn foo() {}`: the function is its own scope but `foo` lives outside it
            let names_definition = DECLARATION_FIELDS.iter().any(|field| {
                innermost
                    .child_by_field_name(field)
                    .is_some_and(|child| child.id() == definition.node.id())
            });
            if names_definition { outer } else { innermost }
        }
    };
    scope.id()
}

/// Rank of `definition` as the target of `reference`; lower is better,
/// `None` when the definition is not visible from the reference.
///
/// Deeper scopes win. Within a scope, the closest preceding definition beats
/// any hoisted definition that appears later.
fn resolution_rank(
    definition: &Visibility,
    reference: &Node<'_>,
    chain: &[usize],
) -> Option<(usize, u8, usize)> {
    let depth = chain.iter().position(|&id| id == definition.scope_id)?;
    let reference_start = reference.start_byte();

    if definition.start_byte <= reference_start {
        // `let x = x + 1;` reads the previous `x`
        let (decl_start, decl_end) = definition.declaration;
        let inside_own_declaration =
            decl_start <= reference_start && reference.end_byte() <= decl_end;
        if inside_own_declaration && !definition.hoisted {
            return None;
        }
        Some((depth, 0, usize::MAX - definition.start_byte))
    } else if definition.hoisted {
        Some((depth, 1, definition.start_byte))
    } else {
        None
    }
}
