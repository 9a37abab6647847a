//! Patch synthesis: parse model output, diff proposals against the working
//! tree and write the aggregated result.

pub mod differ;
pub mod parser;
pub mod synthesizer;
pub mod writer;

pub use differ::{BuiltinDiffer, GitDiffer, TextDiffer};
pub use parser::{ParsedChanges, ProposedChange, parse_file_blocks};
pub use synthesizer::{AggregatedPatch, DiffFragment, PatchSynthesizer, SynthesisReport};
pub use writer::{PATCH_FILE_NAME, WriteOutcome, write_patch};

use crate::config::DifferKind;

/// Differ implementation for a configured [`DifferKind`].
pub fn differ_for(kind: DifferKind) -> Box<dyn TextDiffer> {
    match kind {
        DifferKind::Git => Box::new(GitDiffer::default()),
        DifferKind::Builtin => Box::new(BuiltinDiffer),
    }
}
