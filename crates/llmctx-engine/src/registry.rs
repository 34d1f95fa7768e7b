//! Verb registries and the frozen [`Runtime`].
//!
//! Five verb registries (loaders, modifiers, presenters, refiners,
//! adapters) plus splitters and the processor registry live inside a
//! [`Runtime`], assembled once through [`RuntimeBuilder`] and read-only
//! afterwards. Registration order is meaningful: it is the only
//! tie-break during dispatch.

use crate::filter::detect_modality;
use llmctx_core::collab::{
    HeadlessBrowser, HttpClient, OcrEngine, OfficeConverter, PdfRasterizer, TokenEstimator,
};
use llmctx_core::{Artifact, ArtifactSet, LlmctxError, Payload, PayloadKind, Result};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Predicate deciding whether a loader or processor accepts an artifact.
pub type MatchFn = fn(&Artifact) -> bool;

/// A loader's product: one artifact or an expanded set.
#[derive(Debug)]
pub enum Loaded {
    /// The common case: the artifact with its payload set.
    One(Artifact),
    /// Expansion (archives): members as independent artifacts.
    Many(ArtifactSet),
}

/// Loader body. Errors propagate to the pipeline's fallback mechanism.
pub type LoaderFn = fn(&Runtime, Artifact) -> Result<Loaded>;

/// Modifier/presenter/refiner body.
pub type VerbFn = fn(&Runtime, Artifact) -> Result<Artifact>;

/// Splitter body: explodes one artifact into ordered chunks.
pub type SplitFn = fn(&Runtime, Artifact) -> Result<ArtifactSet>;

/// Adapter body: folds an artifact into provider-shaped output.
pub type AdapterFn = fn(&Runtime, &Artifact, &AdapterParams) -> Result<Value>;

/// Processor body: a complete top-level recipe.
pub type ProcessorFn = fn(&Runtime, Artifact) -> Result<crate::pipeline::PipeValue>;

/// Dispatch key of a modifier/presenter handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKey {
    /// Exact payload-kind match.
    Kind(PayloadKind),
    /// String-suffix match on the payload's runtime type name; the
    /// escape hatch for plugin payloads.
    TypeSuffix(&'static str),
}

impl TypeKey {
    fn matches(&self, payload: &Payload) -> bool {
        match self {
            Self::Kind(kind) => payload.kind() == *kind,
            Self::TypeSuffix(suffix) => payload.type_name().ends_with(suffix),
        }
    }
}

/// One `(type-key, body)` pair of a dispatched verb. A `None` key marks
/// the fallback handler invoked when nothing else matches.
pub struct Handler {
    /// Dispatch key; `None` for the fallback handler.
    pub key: Option<TypeKey>,
    /// Handler body.
    pub run: VerbFn,
}

/// Presenter modality consumed by the smart filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    /// Appends to `text`.
    Text,
    /// Appends to `images`.
    Image,
}

/// Registered loader.
pub struct LoaderEntry {
    /// Verb name.
    pub name: String,
    /// Acceptance predicate (typically path-suffix or URL-scheme).
    pub matches: MatchFn,
    /// Body.
    pub run: LoaderFn,
}

/// Registered modifier: an ordered handler list.
pub struct ModifierEntry {
    /// Verb name.
    pub name: String,
    /// Handlers in registration order; first match wins.
    pub handlers: Vec<Handler>,
}

/// Registered presenter: an ordered handler list plus a modality tag
/// for the smart filter.
pub struct PresenterEntry {
    /// Verb name.
    pub name: String,
    /// `text` or `image`, explicit or detected from the name.
    pub modality: Modality,
    /// Handlers in registration order; first match wins.
    pub handlers: Vec<Handler>,
}

impl PresenterEntry {
    /// Whether this presenter has a type-specific (non-fallback)
    /// handler for the given payload.
    pub fn handles(&self, payload: &Payload) -> bool {
        payload.is_set()
            && self
                .handlers
                .iter()
                .any(|h| h.key.as_ref().is_some_and(|k| k.matches(payload)))
    }
}

/// Registered refiner.
pub struct RefinerEntry {
    /// Verb name.
    pub name: String,
    /// Body.
    pub run: VerbFn,
}

/// Registered adapter.
pub struct AdapterEntry {
    /// Verb name.
    pub name: String,
    /// Body.
    pub run: AdapterFn,
}

/// Registered splitter.
pub struct SplitterEntry {
    /// Verb name.
    pub name: String,
    /// Body.
    pub run: SplitFn,
}

/// Registered top-level processor.
pub struct ProcessorEntry {
    /// Explicit-access name; `None` for primary (auto-selected) entries.
    pub name: Option<String>,
    /// Human-readable description.
    pub description: String,
    /// Acceptance predicate.
    pub matches: MatchFn,
    /// Body.
    pub run: ProcessorFn,
}

/// Extra parameters forwarded to an adapter invocation.
#[derive(Debug, Clone, Default)]
pub struct AdapterParams {
    /// Positional arguments in call order.
    pub positional: Vec<Value>,
    /// Named arguments.
    pub named: BTreeMap<String, Value>,
}

impl AdapterParams {
    /// Params carrying just a prompt.
    pub fn with_prompt(prompt: &str) -> Self {
        Self {
            positional: vec![Value::String(prompt.to_string())],
            named: BTreeMap::new(),
        }
    }

    /// The prompt parameter: first positional string, else `prompt`
    /// named argument.
    pub fn prompt(&self) -> Option<&str> {
        self.positional
            .first()
            .and_then(Value::as_str)
            .or_else(|| self.named.get("prompt").and_then(Value::as_str))
    }
}

/// The read-only registry set.
#[derive(Default)]
pub struct Registries {
    pub(crate) loaders: Vec<LoaderEntry>,
    pub(crate) modifiers: Vec<ModifierEntry>,
    pub(crate) presenters: Vec<PresenterEntry>,
    pub(crate) refiners: Vec<RefinerEntry>,
    pub(crate) adapters: Vec<AdapterEntry>,
    pub(crate) splitters: Vec<SplitterEntry>,
    pub(crate) primary_processors: Vec<ProcessorEntry>,
    pub(crate) named_processors: Vec<ProcessorEntry>,
}

impl Registries {
    /// Look up a loader by name.
    pub fn loader(&self, name: &str) -> Option<&LoaderEntry> {
        self.loaders.iter().find(|e| e.name == name)
    }

    /// Look up a modifier by name.
    pub fn modifier(&self, name: &str) -> Option<&ModifierEntry> {
        self.modifiers.iter().find(|e| e.name == name)
    }

    /// Look up a presenter by name.
    pub fn presenter(&self, name: &str) -> Option<&PresenterEntry> {
        self.presenters.iter().find(|e| e.name == name)
    }

    /// Look up a refiner by name.
    pub fn refiner(&self, name: &str) -> Option<&RefinerEntry> {
        self.refiners.iter().find(|e| e.name == name)
    }

    /// Look up an adapter by name.
    pub fn adapter(&self, name: &str) -> Option<&AdapterEntry> {
        self.adapters.iter().find(|e| e.name == name)
    }

    /// Look up a splitter by name.
    pub fn splitter(&self, name: &str) -> Option<&SplitterEntry> {
        self.splitters.iter().find(|e| e.name == name)
    }

    /// First primary processor whose predicate accepts the artifact.
    pub fn find_primary_processor(&self, artifact: &Artifact) -> Option<&ProcessorEntry> {
        self.primary_processors
            .iter()
            .find(|e| (e.matches)(artifact))
    }

    /// Named processor lookup (never auto-selected).
    pub fn named_processor(&self, name: &str) -> Option<&ProcessorEntry> {
        self.named_processors
            .iter()
            .find(|e| e.name.as_deref() == Some(name))
    }
}

/// Pluggable collaborator bindings.
#[derive(Default)]
pub struct Collaborators {
    pub(crate) http: Option<Box<dyn HttpClient>>,
    pub(crate) rasterizer: Option<Box<dyn PdfRasterizer>>,
    pub(crate) office: Option<Box<dyn OfficeConverter>>,
    pub(crate) browser: Option<Box<dyn HeadlessBrowser>>,
    pub(crate) ocr: Option<Box<dyn OcrEngine>>,
    pub(crate) tokens: Option<Box<dyn TokenEstimator>>,
}

/// The frozen runtime: registries plus collaborator bindings.
///
/// `Runtime` is `Send + Sync`; independent artifacts can be processed
/// in parallel against one shared runtime.
pub struct Runtime {
    registries: Registries,
    collaborators: Collaborators,
}

impl Runtime {
    /// Registry views.
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// HTTP client, or a collaborator-missing error.
    pub fn http(&self) -> Result<&dyn HttpClient> {
        self.collaborators
            .http
            .as_deref()
            .ok_or_else(|| LlmctxError::collaborator("http", "no HTTP client bound"))
    }

    /// PDF rasterizer, when bound.
    pub fn rasterizer(&self) -> Option<&dyn PdfRasterizer> {
        self.collaborators.rasterizer.as_deref()
    }

    /// Office-to-PDF converter, when bound.
    pub fn office(&self) -> Option<&dyn OfficeConverter> {
        self.collaborators.office.as_deref()
    }

    /// Headless browser, when bound.
    pub fn browser(&self) -> Option<&dyn HeadlessBrowser> {
        self.collaborators.browser.as_deref()
    }

    /// OCR engine, when bound.
    pub fn ocr(&self) -> Option<&dyn OcrEngine> {
        self.collaborators.ocr.as_deref()
    }

    /// Token estimator, when bound.
    pub fn token_estimator(&self) -> Option<&dyn TokenEstimator> {
        self.collaborators.tokens.as_deref()
    }
}

/// Builder for the frozen runtime. All registration happens here;
/// [`RuntimeBuilder::build`] freezes the registries for good.
#[derive(Default)]
pub struct RuntimeBuilder {
    registries: Registries,
    collaborators: Collaborators,
}

impl RuntimeBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader with its acceptance predicate.
    pub fn loader(mut self, name: &str, matches: MatchFn, run: LoaderFn) -> Self {
        self.registries.loaders.push(LoaderEntry {
            name: name.to_string(),
            matches,
            run,
        });
        self
    }

    /// Register a modifier handler under `name` for `key`.
    pub fn modifier(mut self, name: &str, key: Option<TypeKey>, run: VerbFn) -> Self {
        push_handler(&mut self.registries.modifiers, name, key, run);
        self
    }

    /// Register a presenter handler; modality is detected from the name
    /// unless overridden later via [`RuntimeBuilder::presenter_modality`].
    pub fn presenter(mut self, name: &str, key: Option<TypeKey>, run: VerbFn) -> Self {
        if let Some(entry) = self.registries.presenters.iter_mut().find(|e| e.name == name) {
            entry.handlers.push(Handler { key, run });
        } else {
            self.registries.presenters.push(PresenterEntry {
                name: name.to_string(),
                modality: detect_modality(name),
                handlers: vec![Handler { key, run }],
            });
        }
        self
    }

    /// Override a presenter's modality tag.
    pub fn presenter_modality(mut self, name: &str, modality: Modality) -> Self {
        if let Some(entry) = self.registries.presenters.iter_mut().find(|e| e.name == name) {
            entry.modality = modality;
        }
        self
    }

    /// Register a refiner.
    pub fn refiner(mut self, name: &str, run: VerbFn) -> Self {
        self.registries.refiners.push(RefinerEntry {
            name: name.to_string(),
            run,
        });
        self
    }

    /// Register an adapter.
    pub fn adapter(mut self, name: &str, run: AdapterFn) -> Self {
        self.registries.adapters.push(AdapterEntry {
            name: name.to_string(),
            run,
        });
        self
    }

    /// Register a splitter.
    pub fn splitter(mut self, name: &str, run: SplitFn) -> Self {
        self.registries.splitters.push(SplitterEntry {
            name: name.to_string(),
            run,
        });
        self
    }

    /// Register a primary (auto-selected) processor.
    pub fn processor(mut self, description: &str, matches: MatchFn, run: ProcessorFn) -> Self {
        self.registries.primary_processors.push(ProcessorEntry {
            name: None,
            description: description.to_string(),
            matches,
            run,
        });
        self
    }

    /// Register a named processor (explicit access only).
    pub fn named_processor(
        mut self,
        name: &str,
        description: &str,
        matches: MatchFn,
        run: ProcessorFn,
    ) -> Self {
        self.registries.named_processors.push(ProcessorEntry {
            name: Some(name.to_string()),
            description: description.to_string(),
            matches,
            run,
        });
        self
    }

    /// Bind the HTTP client.
    pub fn http(mut self, client: Box<dyn HttpClient>) -> Self {
        self.collaborators.http = Some(client);
        self
    }

    /// Bind the PDF rasterizer.
    pub fn pdf_rasterizer(mut self, rasterizer: Box<dyn PdfRasterizer>) -> Self {
        self.collaborators.rasterizer = Some(rasterizer);
        self
    }

    /// Bind the office-to-PDF converter.
    pub fn office_converter(mut self, office: Box<dyn OfficeConverter>) -> Self {
        self.collaborators.office = Some(office);
        self
    }

    /// Bind the headless browser.
    pub fn headless_browser(mut self, browser: Box<dyn HeadlessBrowser>) -> Self {
        self.collaborators.browser = Some(browser);
        self
    }

    /// Bind the OCR engine.
    pub fn ocr_engine(mut self, ocr: Box<dyn OcrEngine>) -> Self {
        self.collaborators.ocr = Some(ocr);
        self
    }

    /// Bind the token estimator.
    pub fn token_estimator(mut self, tokens: Box<dyn TokenEstimator>) -> Self {
        self.collaborators.tokens = Some(tokens);
        self
    }

    /// Freeze into a runtime.
    pub fn build(self) -> Runtime {
        Runtime {
            registries: self.registries,
            collaborators: self.collaborators,
        }
    }
}

fn push_handler(entries: &mut Vec<ModifierEntry>, name: &str, key: Option<TypeKey>, run: VerbFn) {
    if let Some(entry) = entries.iter_mut().find(|e| e.name == name) {
        entry.handlers.push(Handler { key, run });
    } else {
        entries.push(ModifierEntry {
            name: name.to_string(),
            handlers: vec![Handler { key, run }],
        });
    }
}

/// Select the first handler whose key matches the payload, falling back
/// to the `None`-keyed handler. Registration order is the tie-break.
pub(crate) fn select_handler<'a>(handlers: &'a [Handler], payload: &Payload) -> Option<&'a Handler> {
    if !payload.is_set() {
        return handlers.iter().find(|h| h.key.is_none());
    }
    handlers
        .iter()
        .find(|h| h.key.as_ref().is_some_and(|k| k.matches(payload)))
        .or_else(|| handlers.iter().find(|h| h.key.is_none()))
}

static GLOBAL_RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Install the process-wide runtime. The first installation wins; later
/// calls return the already-installed runtime (registries are frozen —
/// there is no swapping).
pub fn install_runtime(runtime: Arc<Runtime>) -> Arc<Runtime> {
    GLOBAL_RUNTIME.get_or_init(|| runtime).clone()
}

/// The process-wide runtime, when one has been installed.
pub fn installed_runtime() -> Option<Arc<Runtime>> {
    GLOBAL_RUNTIME.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_verb(_rt: &Runtime, att: Artifact) -> Result<Artifact> {
        Ok(att)
    }

    #[test]
    fn test_handler_registration_order_preserved() {
        let rt = RuntimeBuilder::new()
            .modifier("pages", Some(TypeKey::Kind(PayloadKind::Pdf)), noop_verb)
            .modifier("pages", Some(TypeKey::Kind(PayloadKind::Pptx)), noop_verb)
            .modifier("pages", None, noop_verb)
            .build();
        let entry = rt.registries().modifier("pages").unwrap();
        assert_eq!(entry.handlers.len(), 3);
        assert_eq!(
            entry.handlers[0].key,
            Some(TypeKey::Kind(PayloadKind::Pdf))
        );
        assert!(entry.handlers[2].key.is_none());
    }

    #[test]
    fn test_select_handler_exact_then_suffix_then_fallback() {
        let handlers = vec![
            Handler {
                key: Some(TypeKey::Kind(PayloadKind::Pdf)),
                run: noop_verb,
            },
            Handler {
                key: Some(TypeKey::TypeSuffix("HeifImage")),
                run: noop_verb,
            },
            Handler {
                key: None,
                run: noop_verb,
            },
        ];

        let pdf = Payload::Pdf(llmctx_core::PdfFile::default());
        assert_eq!(
            select_handler(&handlers, &pdf).unwrap().key,
            Some(TypeKey::Kind(PayloadKind::Pdf))
        );

        let opaque = Payload::Opaque {
            type_name: "plugin.HeifImage".into(),
            handle: Arc::new(()),
        };
        assert_eq!(
            select_handler(&handlers, &opaque).unwrap().key,
            Some(TypeKey::TypeSuffix("HeifImage"))
        );

        let text = Payload::Text("x".into());
        assert!(select_handler(&handlers, &text).unwrap().key.is_none());

        // Unset payload dispatches straight to the fallback handler.
        assert!(select_handler(&handlers, &Payload::None)
            .unwrap()
            .key
            .is_none());
    }

    #[test]
    fn test_missing_collaborators_error_or_none() {
        let rt = RuntimeBuilder::new().build();
        assert!(rt.http().is_err());
        assert!(rt.rasterizer().is_none());
        assert!(rt.ocr().is_none());
    }
}
