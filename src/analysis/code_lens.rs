//! Reference-count code lenses.
//!
//! For every declaration in a document the index knows about, count the
//! places that reference it and produce one lens per source location:
//!
//! 1. targets sharing a range are grouped, so a location addressable under
//!    several kinds yields a single lens;
//! 2. origins are summed across the whole group;
//! 3. the lens is anchored in the middle of the declared name when known;
//! 4. the label and the show-references command arguments are rendered.
//!
//! The computation is best effort. A failed lookup only removes that target's
//! contribution, a failed render only removes that group's lens.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde_json::Value;
use thiserror::Error;
use tower_lsp_server::ls_types::{CodeLens, Command, Position, ReferenceContext};
use url::Url;

use crate::domain::{SourcePos, SourceRange};
use crate::references::{IndexError, ReferenceIndex, ReferenceTarget};

const REFERENCE_SINGULAR: &str = "reference";
const REFERENCE_PLURAL: &str = "references";

#[derive(Debug, Error)]
pub enum LensError {
    #[error("Failed to serialize command argument: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Targets occupying the same source range
#[derive(Clone, Debug, PartialEq)]
pub struct TargetGroup {
    pub range: SourceRange,
    pub targets: Vec<ReferenceTarget>,
}

/// A positioned reference count with the command that lists the references
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub range: SourceRange,
    pub anchor: SourcePos,
    pub label: String,
    pub command_id: String,
    /// Anchor position, then reference context; each serialized on its own.
    pub command_args: [Value; 2],
}

impl From<Annotation> for CodeLens {
    fn from(annotation: Annotation) -> Self {
        CodeLens {
            range: annotation.range.into(),
            command: Some(Command {
                title: annotation.label,
                command: annotation.command_id,
                arguments: Some(annotation.command_args.into()),
            }),
            data: None,
        }
    }
}

/// Compute reference-count annotations for `file`.
///
/// `show_references` is the client command negotiated for listing
/// references; without it the feature is off and the index is not queried.
pub fn reference_count_annotations<I>(
    index: &I,
    file: &Url,
    show_references: Option<&str>,
) -> Vec<Annotation>
where
    I: ReferenceIndex + ?Sized,
{
    let Some(command_id) = show_references else {
        return Vec::new();
    };

    let targets = match index.targets_in_file(file) {
        Ok(targets) => targets,
        Err(e) => {
            log::debug!(target: "reflens::code_lens", "No reference targets for {}: {}", file, e);
            return Vec::new();
        }
    };

    group_targets(targets)
        .into_iter()
        .filter_map(|group| {
            let count = count_origins(index, &group);
            if count == 0 {
                return None;
            }
            match render_annotation(&group, count, command_id) {
                Ok(annotation) => Some(annotation),
                Err(e) => {
                    log::warn!(
                        target: "reflens::code_lens",
                        "Dropping code lens at {:?}: {}",
                        group.range.start,
                        e
                    );
                    None
                }
            }
        })
        .collect()
}

/// Group targets by their range value, in first-seen order.
pub fn group_targets(targets: Vec<ReferenceTarget>) -> Vec<TargetGroup> {
    let mut slots: HashMap<SourceRange, usize> = HashMap::new();
    let mut groups: Vec<TargetGroup> = Vec::new();

    for target in targets {
        match slots.entry(target.range) {
            Entry::Occupied(slot) => groups[*slot.get()].targets.push(target),
            Entry::Vacant(slot) => {
                slot.insert(groups.len());
                groups.push(TargetGroup {
                    range: target.range,
                    targets: vec![target],
                });
            }
        }
    }

    groups
}

/// Total number of origins pointing at any target of the group.
///
/// Targets whose lookup fails contribute nothing.
pub fn count_origins<I>(index: &I, group: &TargetGroup) -> usize
where
    I: ReferenceIndex + ?Sized,
{
    group
        .targets
        .iter()
        .map(|target| match index.origins_targeting(target) {
            Ok(origins) => origins.len(),
            Err(IndexError::Lookup { name, reason }) => {
                log::debug!(target: "reflens::code_lens", "Skipping '{}': {}", name, reason);
                0
            }
            Err(e) => {
                log::debug!(target: "reflens::code_lens", "Skipping target: {}", e);
                0
            }
        })
        .sum()
}

/// Where the lens points: the middle of the declared name if any target
/// carries one (the last such target wins), else the middle of the range.
pub fn anchor_position(group: &TargetGroup) -> SourcePos {
    group
        .targets
        .iter()
        .rev()
        .find_map(|target| target.def_range.filter(|range| !range.is_empty()))
        .unwrap_or(group.range)
        .midpoint()
}

/// `"1 reference"`, `"0 references"`, `"2 references"`
pub fn reference_label(count: usize) -> String {
    count_label(REFERENCE_SINGULAR, REFERENCE_PLURAL, count)
}

fn count_label(singular: &str, plural: &str, count: usize) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

fn render_annotation(
    group: &TargetGroup,
    count: usize,
    command_id: &str,
) -> Result<Annotation, LensError> {
    let anchor = anchor_position(group);
    let position = serde_json::to_value(Position::from(anchor))?;
    let context = serde_json::to_value(ReferenceContext {
        include_declaration: false,
    })?;

    Ok(Annotation {
        range: group.range,
        anchor,
        label: reference_label(count),
        command_id: command_id.to_string(),
        command_args: [position, context],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::ReferenceOrigin;
    use rstest::rstest;
    use serde_json::json;
    use std::cell::Cell;

    const SHOW_REFERENCES: &str = "client.showReferences";

    /// Index answering from a table keyed by target name
    #[derive(Default)]
    struct FakeIndex {
        targets: Vec<ReferenceTarget>,
        origins: HashMap<String, Result<usize, String>>,
        fail_decode: bool,
        calls: Cell<usize>,
    }

    impl FakeIndex {
        fn with_target(mut self, target: ReferenceTarget, origins: usize) -> Self {
            self.origins.insert(target.name.clone(), Ok(origins));
            self.targets.push(target);
            self
        }

        fn with_failing_target(mut self, target: ReferenceTarget) -> Self {
            self.origins
                .insert(target.name.clone(), Err("lookup exploded".to_string()));
            self.targets.push(target);
            self
        }
    }

    impl ReferenceIndex for FakeIndex {
        fn targets_in_file(&self, file: &Url) -> Result<Vec<ReferenceTarget>, IndexError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_decode {
                return Err(IndexError::decode(file.as_str(), "syntax error"));
            }
            Ok(self.targets.clone())
        }

        fn origins_targeting(
            &self,
            target: &ReferenceTarget,
        ) -> Result<Vec<ReferenceOrigin>, IndexError> {
            self.calls.set(self.calls.get() + 1);
            match self.origins.get(&target.name) {
                Some(Ok(count)) => Ok(vec![
                    ReferenceOrigin {
                        range: SourceRange::default()
                    };
                    *count
                ]),
                Some(Err(reason)) => Err(IndexError::lookup(&target.name, reason)),
                None => Err(IndexError::lookup(&target.name, "unknown")),
            }
        }
    }

    fn file() -> Url {
        Url::parse("file:///main.tf").unwrap()
    }

    fn cols(line: u32, start: u32, end: u32) -> SourceRange {
        SourceRange::new(
            SourcePos::new(line, start, start as usize),
            SourcePos::new(line, end, end as usize),
        )
    }

    fn target(name: &str, range: SourceRange, def_range: Option<SourceRange>) -> ReferenceTarget {
        ReferenceTarget {
            range,
            def_range,
            name: name.to_string(),
            kind: None,
        }
    }

    #[test]
    fn test_declaration_with_def_range_anchors_on_name() {
        let declaration = SourceRange::new(SourcePos::new(0, 0, 0), SourcePos::new(2, 1, 30));
        let index = FakeIndex::default()
            .with_target(target("var.region", declaration, Some(cols(0, 3, 6))), 2);

        let annotations = reference_count_annotations(&index, &file(), Some(SHOW_REFERENCES));

        assert_eq!(annotations.len(), 1);
        let annotation = &annotations[0];
        assert_eq!(annotation.label, "2 references");
        assert_eq!(annotation.range, declaration);
        assert_eq!(annotation.anchor, SourcePos::new(0, 4, 4));
        assert_eq!(annotation.command_id, SHOW_REFERENCES);
    }

    #[test]
    fn test_unreferenced_target_is_silent() {
        let index = FakeIndex::default().with_target(target("local.unused", cols(1, 0, 5), None), 0);
        let annotations = reference_count_annotations(&index, &file(), Some(SHOW_REFERENCES));
        assert!(annotations.is_empty());
    }

    #[test]
    fn test_targets_sharing_range_produce_one_annotation() {
        let index = FakeIndex::default()
            .with_target(target("module.a", cols(3, 10, 14), None), 1)
            .with_target(target("module.a.object", cols(3, 10, 14), None), 1);

        let annotations = reference_count_annotations(&index, &file(), Some(SHOW_REFERENCES));

        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].label, "2 references");
        assert_eq!(annotations[0].anchor.column, 12);
    }

    #[test]
    fn test_missing_capability_never_queries_index() {
        let index = FakeIndex::default().with_target(target("var.a", cols(0, 0, 3), None), 4);
        let annotations = reference_count_annotations(&index, &file(), None);
        assert!(annotations.is_empty());
        assert_eq!(index.calls.get(), 0);
    }

    #[test]
    fn test_decode_failure_yields_no_annotations() {
        let mut index = FakeIndex::default().with_target(target("var.a", cols(0, 0, 3), None), 4);
        index.fail_decode = true;
        let annotations = reference_count_annotations(&index, &file(), Some(SHOW_REFERENCES));
        assert!(annotations.is_empty());
        assert_eq!(index.calls.get(), 1, "only the target enumeration ran");
    }

    #[test]
    fn test_lookup_failure_skips_only_that_target() {
        let shared = cols(5, 0, 8);
        let index = FakeIndex::default()
            .with_failing_target(target("data.broken", shared, None))
            .with_target(target("data.fine", shared, None), 1)
            .with_target(target("var.other", cols(9, 0, 4), None), 3);

        let mut labels: Vec<_> = reference_count_annotations(&index, &file(), Some(SHOW_REFERENCES))
            .into_iter()
            .map(|annotation| annotation.label)
            .collect();
        labels.sort();

        assert_eq!(labels, vec!["1 reference", "3 references"]);
    }

    #[test]
    fn test_group_targets_collapses_identical_ranges() {
        let range = cols(0, 2, 9);
        let targets = vec![
            target("a", range, None),
            target("b", cols(1, 0, 1), None),
            target("c", range, None),
            target("d", range, None),
        ];

        let groups = group_targets(targets);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].range, range);
        let names: Vec<_> = groups[0].targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "d"]);
        assert_eq!(groups[1].targets.len(), 1);
    }

    #[test]
    fn test_group_targets_ignores_def_range() {
        let range = cols(0, 0, 10);
        let groups = group_targets(vec![
            target("a", range, Some(cols(0, 1, 2))),
            target("b", range, Some(cols(0, 5, 6))),
        ]);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_count_is_sum_over_group() {
        let range = cols(0, 0, 4);
        let index = FakeIndex::default()
            .with_target(target("a", range, None), 2)
            .with_target(target("b", range, None), 5)
            .with_target(target("c", range, None), 0);
        let group = group_targets(index.targets.clone()).remove(0);
        assert_eq!(count_origins(&index, &group), 7);
    }

    #[test]
    fn test_anchor_prefers_last_def_range() {
        let range = cols(0, 0, 20);
        let group = TargetGroup {
            range,
            targets: vec![
                target("a", range, Some(cols(0, 2, 4))),
                target("b", range, None),
                target("c", range, Some(cols(0, 10, 16))),
            ],
        };
        assert_eq!(anchor_position(&group), SourcePos::new(0, 13, 13));
    }

    #[test]
    fn test_anchor_ignores_empty_def_range() {
        let range = cols(0, 0, 20);
        let group = TargetGroup {
            range,
            targets: vec![target("a", range, Some(cols(0, 7, 7)))],
        };
        assert_eq!(anchor_position(&group), SourcePos::new(0, 10, 10));
    }

    #[test]
    fn test_anchor_multi_line_range_without_def_range() {
        let range = SourceRange::new(SourcePos::new(2, 4, 40), SourcePos::new(6, 1, 90));
        let group = TargetGroup {
            range,
            targets: vec![target("a", range, None)],
        };
        assert_eq!(anchor_position(&group), SourcePos::new(2, 4, 40));
    }

    #[rstest]
    #[case::zero(0, "0 references")]
    #[case::one(1, "1 reference")]
    #[case::two(2, "2 references")]
    #[case::many(137, "137 references")]
    fn test_reference_label(#[case] count: usize, #[case] expected: &str) {
        assert_eq!(reference_label(count), expected);
    }

    #[test]
    fn test_command_arguments_are_position_then_context() {
        let index = FakeIndex::default()
            .with_target(target("var.a", cols(7, 5, 11), None), 1);

        let annotation = reference_count_annotations(&index, &file(), Some(SHOW_REFERENCES))
            .remove(0);

        assert_eq!(
            annotation.command_args,
            [
                json!({ "line": 7, "character": 8 }),
                json!({ "includeDeclaration": false }),
            ]
        );
    }

    #[test]
    fn test_annotation_into_code_lens() {
        let index = FakeIndex::default().with_target(target("var.a", cols(1, 0, 4), None), 3);
        let lens: CodeLens = reference_count_annotations(&index, &file(), Some(SHOW_REFERENCES))
            .remove(0)
            .into();

        assert_eq!(lens.range.start, Position::new(1, 0));
        assert_eq!(lens.range.end, Position::new(1, 4));
        let command = lens.command.expect("lens carries a command");
        assert_eq!(command.title, "3 references");
        assert_eq!(command.command, SHOW_REFERENCES);
        assert_eq!(command.arguments.map(|args| args.len()), Some(2));
        assert!(lens.data.is_none());
    }
}
