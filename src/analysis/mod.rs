pub mod code_lens;
pub mod file_lenses;

pub use code_lens::{
    Annotation, LensError, TargetGroup, anchor_position, count_origins, group_targets,
    reference_count_annotations, reference_label,
};
pub use file_lenses::lenses_for_file;
