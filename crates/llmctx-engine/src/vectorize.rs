//! Vectorized semantics over [`ArtifactSet`].
//!
//! Reducers (a fixed refiner set plus every adapter) see the whole set
//! folded into one artifact; everything else maps elementwise, with
//! inner sets concatenated into the outer set and input order preserved.

use crate::dispatch::{apply_additive, apply_verb};
use crate::pipeline::{PipeValue, Step, Verb, VerbKind};
use crate::registry::Runtime;
use llmctx_core::{ArtifactSet, LlmctxError, Result};

/// Refiners that consume a whole set (fold) rather than mapping.
pub const REDUCER_REFINERS: &[&str] = &["tile_images", "combine_images", "merge_text"];

/// Whether a verb reduces a set to a single artifact.
pub fn is_reducer(verb: &Verb) -> bool {
    match verb.kind() {
        VerbKind::Adapt => true,
        VerbKind::Refine => REDUCER_REFINERS.contains(&verb.name()),
        _ => false,
    }
}

/// Apply one step to a set.
pub fn apply_step_to_set(rt: &Runtime, set: ArtifactSet, step: &Step) -> Result<PipeValue> {
    match step {
        Step::One(verb) if is_reducer(verb) => {
            let folded = set.fold();
            apply_verb(rt, folded, verb)
        }
        Step::One(verb) => {
            let mut out = ArtifactSet::default();
            for member in set {
                match apply_verb(rt, member, verb)? {
                    PipeValue::One(att) => out.push(att),
                    PipeValue::Many(inner) => out.extend(inner),
                    PipeValue::Adapted(_) => {
                        return Err(LlmctxError::Pipeline(format!(
                            "adapter '{}' cannot map over a set",
                            verb.name()
                        )))
                    }
                }
            }
            Ok(PipeValue::Many(out))
        }
        Step::Additive(verbs) => {
            let mut out = ArtifactSet::default();
            for member in set {
                out.push(apply_additive(rt, member, verbs)?);
            }
            Ok(PipeValue::Many(out))
        }
    }
}
