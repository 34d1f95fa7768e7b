//! Pipeline algebra: lazy verb references, additive groups, sequential
//! composition and fallback chains.
//!
//! A [`Verb`] names a registry entry without resolving it; resolution
//! happens at run time against the frozen runtime. `verb.with(value)`
//! is partial application: it stores a value that lands in the
//! artifact's `commands` under the verb's name when the verb is
//! applied. Additive groups (`also`) run every member on the same
//! artifact and bind tighter than sequential composition by
//! construction.

use crate::dispatch::apply_step;
use crate::registry::{AdapterParams, Runtime};
use llmctx_core::{Artifact, ArtifactSet, Result};
use serde_json::Value;

/// Registry a verb belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbKind {
    /// Sets the payload from the path.
    Load,
    /// Reshapes the payload.
    Modify,
    /// Appends text/images from the payload.
    Present,
    /// Post-processes presented content.
    Refine,
    /// Explodes an artifact into a set of chunks.
    Split,
    /// Folds an artifact into provider-shaped output.
    Adapt,
}

/// A lazy reference to a registered verb, optionally carrying a partial
/// argument or adapter parameters.
#[derive(Debug, Clone)]
pub struct Verb {
    pub(crate) kind: VerbKind,
    pub(crate) name: String,
    pub(crate) arg: Option<String>,
    pub(crate) params: AdapterParams,
}

impl Verb {
    fn new(kind: VerbKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            arg: None,
            params: AdapterParams::default(),
        }
    }

    /// Verb name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry this verb resolves against.
    pub fn kind(&self) -> VerbKind {
        self.kind
    }

    /// Partial application: `commands[name] = value` is set on the
    /// artifact just before the verb runs.
    pub fn with(mut self, value: &str) -> Self {
        self.arg = Some(value.to_string());
        self
    }

    /// Attach adapter parameters (adapters only).
    pub fn with_params(mut self, params: AdapterParams) -> Self {
        self.params = params;
        self
    }

    /// Attach a prompt parameter (adapters only).
    pub fn with_prompt(self, prompt: &str) -> Self {
        self.with_params(AdapterParams::with_prompt(prompt))
    }

    /// Additive composition: run `self` and `other` on the same
    /// artifact. Binds tighter than [`Pipeline::then`].
    pub fn also(self, other: Verb) -> Additive {
        Additive {
            verbs: vec![self, other],
        }
    }
}

/// An additive group of verbs, each appending to the same artifact.
#[derive(Debug, Clone)]
pub struct Additive {
    pub(crate) verbs: Vec<Verb>,
}

impl Additive {
    /// Extend the group.
    pub fn also(mut self, verb: Verb) -> Self {
        self.verbs.push(verb);
        self
    }
}

/// Loader reference.
pub fn load(name: &str) -> Verb {
    Verb::new(VerbKind::Load, name)
}

/// Modifier reference.
pub fn modify(name: &str) -> Verb {
    Verb::new(VerbKind::Modify, name)
}

/// Presenter reference.
pub fn present(name: &str) -> Verb {
    Verb::new(VerbKind::Present, name)
}

/// Refiner reference.
pub fn refine(name: &str) -> Verb {
    Verb::new(VerbKind::Refine, name)
}

/// Splitter reference.
pub fn split(name: &str) -> Verb {
    Verb::new(VerbKind::Split, name)
}

/// Adapter reference.
pub fn adapt(name: &str) -> Verb {
    Verb::new(VerbKind::Adapt, name)
}

/// One pipeline step: a single verb or an additive group.
#[derive(Debug, Clone)]
pub enum Step {
    /// Single verb.
    One(Verb),
    /// Additive group applied to the same artifact.
    Additive(Vec<Verb>),
}

impl From<Verb> for Step {
    fn from(verb: Verb) -> Self {
        Self::One(verb)
    }
}

impl From<Additive> for Step {
    fn from(group: Additive) -> Self {
        Self::Additive(group.verbs)
    }
}

/// What flows between pipeline steps.
#[derive(Debug, Clone)]
pub enum PipeValue {
    /// A single artifact.
    One(Artifact),
    /// An ordered set; non-reducer steps vectorize over it.
    Many(ArtifactSet),
    /// Adapter output; short-circuits the rest of the pipeline.
    Adapted(Value),
}

impl PipeValue {
    /// The single artifact, folding a set if necessary.
    pub fn into_artifact(self) -> Option<Artifact> {
        match self {
            Self::One(att) => Some(att),
            Self::Many(set) => Some(set.fold()),
            Self::Adapted(_) => None,
        }
    }

    /// Borrow the single artifact, when this is one.
    pub fn as_artifact(&self) -> Option<&Artifact> {
        match self {
            Self::One(att) => Some(att),
            _ => None,
        }
    }
}

/// Pipeline input: a locator string, an artifact, or a set.
#[derive(Debug, Clone)]
pub enum PipeInput {
    /// Locator; an artifact is constructed (DSL parsed) first.
    Locator(String),
    /// Ready-made artifact.
    One(Artifact),
    /// Ready-made set.
    Many(ArtifactSet),
}

impl From<&str> for PipeInput {
    fn from(locator: &str) -> Self {
        Self::Locator(locator.to_string())
    }
}

impl From<String> for PipeInput {
    fn from(locator: String) -> Self {
        Self::Locator(locator)
    }
}

impl From<Artifact> for PipeInput {
    fn from(artifact: Artifact) -> Self {
        Self::One(artifact)
    }
}

impl From<ArtifactSet> for PipeInput {
    fn from(set: ArtifactSet) -> Self {
        Self::Many(set)
    }
}

impl PipeInput {
    fn into_value(self) -> PipeValue {
        match self {
            Self::Locator(locator) => PipeValue::One(Artifact::new(&locator)),
            Self::One(att) => PipeValue::One(att),
            Self::Many(set) => PipeValue::Many(set),
        }
    }
}

/// A composed chain of verbs with an ordered fallback list.
///
/// Sequential steps feed each other; an adapter result short-circuits
/// and is returned verbatim. When the main chain fails, fallback
/// pipelines run against the original input in order; per spec, the
/// last branch's error is the one ultimately raised.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
    fallbacks: Vec<Pipeline>,
}

impl Pipeline {
    /// Empty pipeline (identity).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequential composition with a verb or additive group.
    pub fn then(mut self, step: impl Into<Step>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Sequential composition with a complete pipeline is fallback
    /// composition: if `self` fails, `other` runs on the original
    /// input. (An empty `self` simply becomes `other`.)
    pub fn then_pipeline(self, other: Pipeline) -> Self {
        if self.steps.is_empty() {
            return other;
        }
        self.or_else(other)
    }

    /// Add a fallback pipeline.
    pub fn or_else(mut self, fallback: Pipeline) -> Self {
        self.fallbacks.push(fallback);
        self
    }

    /// Steps of the main chain.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run the pipeline.
    pub fn run(&self, rt: &Runtime, input: impl Into<PipeInput>) -> Result<PipeValue> {
        let input = input.into();
        let mut last_error = match self.execute(rt, input.clone().into_value()) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        for fallback in &self.fallbacks {
            match fallback.execute(rt, input.clone().into_value()) {
                Ok(value) => return Ok(value),
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }

    fn execute(&self, rt: &Runtime, mut value: PipeValue) -> Result<PipeValue> {
        for step in &self.steps {
            value = apply_step(rt, value, step)?;
            if matches!(value, PipeValue::Adapted(_)) {
                return Ok(value);
            }
        }
        Ok(value)
    }
}
