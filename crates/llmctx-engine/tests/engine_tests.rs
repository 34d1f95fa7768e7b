//! Engine behavior: tolerant loader chains, fallback pipelines,
//! additive groups, vectorization, the presenter gate and processor
//! discovery — exercised with a toy verb set.

use llmctx_core::{Artifact, ArtifactSet, LlmctxError, Payload, PayloadKind, Result};
use llmctx_engine::{
    adapt, load, present, refine, run_named, run_primary, AdapterParams, Loaded, Modality,
    PipeValue, Pipeline, Runtime, RuntimeBuilder, TypeKey,
};
use serde_json::json;

fn txt_match(att: &Artifact) -> bool {
    att.path().ends_with(".txt")
}

fn bad_match(att: &Artifact) -> bool {
    att.path().ends_with(".bad")
}

fn multi_match(att: &Artifact) -> bool {
    att.path().ends_with(".multi")
}

fn load_text(_rt: &Runtime, mut att: Artifact) -> Result<Loaded> {
    att.set_payload(Payload::Text("loaded".into()));
    Ok(Loaded::One(att))
}

fn load_marker(_rt: &Runtime, mut att: Artifact) -> Result<Loaded> {
    att.set_payload(Payload::Text("marker".into()));
    Ok(Loaded::One(att))
}

fn load_failing(_rt: &Runtime, att: Artifact) -> Result<Loaded> {
    Err(LlmctxError::load("failing", att.path(), "decoder exploded"))
}

fn load_expanding(_rt: &Runtime, att: Artifact) -> Result<Loaded> {
    let mut set = ArtifactSet::default();
    for index in 0..2 {
        let mut member = Artifact::with_commands(
            format!("{}/{index}", att.path()),
            att.commands.clone(),
        );
        member.set_payload(Payload::Text(format!("member {index}")));
        set.push(member);
    }
    Ok(Loaded::Many(set))
}

fn present_text(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    att.append_text("[text]");
    Ok(att)
}

fn present_markdown(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    att.append_text("[markdown]");
    Ok(att)
}

fn present_images(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    att.append_image("aW1n");
    Ok(att)
}

fn present_failing(_rt: &Runtime, _att: Artifact) -> Result<Artifact> {
    Err(LlmctxError::collaborator("backend", "unavailable"))
}

fn refine_stamp(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    att.set_meta("stamped", true);
    Ok(att)
}

fn refine_merge(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    att.set_meta("operation", "merge_text");
    Ok(att)
}

fn adapt_echo(_rt: &Runtime, att: &Artifact, params: &AdapterParams) -> Result<serde_json::Value> {
    Ok(json!({
        "text": att.text,
        "prompt": params.prompt().unwrap_or_default(),
    }))
}

fn suffix_opaque(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    att.append_text("[opaque]");
    Ok(att)
}

fn toy_runtime() -> Runtime {
    RuntimeBuilder::new()
        .loader("text", txt_match, load_text)
        .loader("marker", txt_match, load_marker)
        .loader("failing", bad_match, load_failing)
        .loader("expanding", multi_match, load_expanding)
        .modifier("tag", Some(TypeKey::TypeSuffix("PluginThing")), suffix_opaque)
        .presenter("text", Some(TypeKey::Kind(PayloadKind::Text)), present_text)
        .presenter("markdown", Some(TypeKey::Kind(PayloadKind::Text)), present_markdown)
        .presenter("images", Some(TypeKey::Kind(PayloadKind::Text)), present_images)
        .presenter("broken", Some(TypeKey::Kind(PayloadKind::Text)), present_failing)
        .refiner("stamp", refine_stamp)
        .refiner("merge_text", refine_merge)
        .adapter("echo", adapt_echo)
        .build()
}

#[test]
fn test_loader_chain_first_match_wins_then_noop() {
    let rt = toy_runtime();
    let pipe = Pipeline::new().then(load("text")).then(load("marker"));
    let result = pipe.run(&rt, "notes.txt").unwrap();
    let PipeValue::One(att) = result else {
        panic!("expected single artifact");
    };
    // The second loader saw a set payload and passed through.
    match &att.payload {
        Payload::Text(content) => assert_eq!(content, "loaded"),
        other => panic!("unexpected payload {other:?}"),
    }
    assert_eq!(att.trace(), ["text"]);
}

#[test]
fn test_loader_predicate_mismatch_passes_through() {
    let rt = toy_runtime();
    let result = Pipeline::new().then(load("failing")).run(&rt, "safe.txt").unwrap();
    let PipeValue::One(att) = result else {
        panic!("expected single artifact");
    };
    assert!(!att.payload.is_set());
    assert!(att.trace().is_empty());
}

#[test]
fn test_fallback_pipeline_recovers_from_loader_error() {
    let rt = toy_runtime();
    // The main chain fails on .bad; the fallback loads via text rules.
    let main = Pipeline::new().then(load("failing"));
    let fallback = Pipeline::new().then(load("text"));
    let composed = main.then_pipeline(fallback);

    let err = composed.run(&rt, "input.bad");
    // Both branches fail for .bad (the text predicate rejects it, but
    // rejection is a pass-through, not an error — so the fallback
    // "succeeds" with an unloaded artifact).
    let PipeValue::One(att) = err.unwrap() else {
        panic!("expected artifact");
    };
    assert!(!att.payload.is_set());
}

#[test]
fn test_fallback_reports_last_branch_error() {
    fn also_bad(att: &Artifact) -> bool {
        att.path().ends_with(".bad")
    }
    fn load_failing_too(_rt: &Runtime, att: Artifact) -> Result<Loaded> {
        Err(LlmctxError::load("failing_too", att.path(), "second decoder exploded"))
    }
    let rt = RuntimeBuilder::new()
        .loader("failing", also_bad, load_failing)
        .loader("failing_too", also_bad, load_failing_too)
        .build();

    let composed = Pipeline::new()
        .then(load("failing"))
        .or_else(Pipeline::new().then(load("failing_too")));
    match composed.run(&rt, "input.bad") {
        Err(LlmctxError::Load { verb, .. }) => assert_eq!(verb, "failing_too"),
        other => panic!("expected the last branch's error, got {other:?}"),
    }
}

#[test]
fn test_additive_group_appends_on_same_artifact() {
    let rt = toy_runtime();
    let pipe = Pipeline::new()
        .then(load("text"))
        .then(present("text").also(present("markdown")).also(present("images")));
    let PipeValue::One(att) = pipe.run(&rt, "notes.txt").unwrap() else {
        panic!("expected artifact");
    };
    // No format command: markdown is preferred, text steps aside.
    assert_eq!(att.text, "[markdown]");
    assert_eq!(att.images.len(), 1);
    assert_eq!(att.trace(), ["text", "markdown", "images"]);
}

#[test]
fn test_smart_filter_format_gate() {
    let rt = toy_runtime();
    let pipe = Pipeline::new()
        .then(load("text"))
        .then(present("text").also(present("markdown")).also(present("images")));
    let PipeValue::One(att) = pipe.run(&rt, "notes.txt[format:plain]").unwrap() else {
        panic!("expected artifact");
    };
    // format:plain prefers the text presenter; markdown is gated off
    // but the images presenter still runs (images defaults to true).
    assert_eq!(att.text, "[text]");
    assert_eq!(att.images.len(), 1);
}

#[test]
fn test_smart_filter_images_gate() {
    let rt = toy_runtime();
    let pipe = Pipeline::new()
        .then(load("text"))
        .then(present("markdown").also(present("images")));
    let PipeValue::One(att) = pipe.run(&rt, "notes.txt[images:false]").unwrap() else {
        panic!("expected artifact");
    };
    assert_eq!(att.text, "[markdown]");
    assert!(att.images.is_empty());
}

#[test]
fn test_presenter_failure_recorded_not_fatal() {
    let rt = toy_runtime();
    let pipe = Pipeline::new().then(load("text")).then(present("broken"));
    let PipeValue::One(att) = pipe.run(&rt, "notes.txt").unwrap() else {
        panic!("expected artifact");
    };
    assert!(att.metadata["broken_error"]
        .as_str()
        .unwrap()
        .contains("unavailable"));
    // The failed presenter does not appear in the trace.
    assert_eq!(att.trace(), ["text"]);
}

#[test]
fn test_vectorized_map_preserves_order_and_cardinality() {
    let rt = toy_runtime();
    let pipe = Pipeline::new()
        .then(load("expanding"))
        .then(present("markdown"))
        .then(refine("stamp"));
    let PipeValue::Many(set) = pipe.run(&rt, "batch.multi").unwrap() else {
        panic!("expected set");
    };
    assert_eq!(set.len(), 2);
    for (index, member) in set.iter().enumerate() {
        assert_eq!(member.path(), format!("batch.multi/{index}"));
        assert_eq!(member.text, "[markdown]");
        assert_eq!(member.metadata["stamped"].as_bool(), Some(true));
    }
}

#[test]
fn test_reducer_folds_set_to_single_artifact() {
    let rt = toy_runtime();
    let pipe = Pipeline::new()
        .then(load("expanding"))
        .then(present("markdown"))
        .then(refine("merge_text"));
    let PipeValue::One(att) = pipe.run(&rt, "batch.multi").unwrap() else {
        panic!("expected single artifact after reduction");
    };
    assert_eq!(att.text, "[markdown]\n\n[markdown]");
    assert_eq!(att.metadata["collection_size"].as_u64(), Some(2));
    assert_eq!(att.metadata["operation"].as_str(), Some("merge_text"));
}

#[test]
fn test_adapter_short_circuits_pipeline() {
    let rt = toy_runtime();
    let pipe = Pipeline::new()
        .then(load("text"))
        .then(present("markdown"))
        .then(adapt("echo").with_prompt("sum it up"))
        // Never reached: the adapter result exits the pipeline.
        .then(present("text"));
    let PipeValue::Adapted(value) = pipe.run(&rt, "notes.txt").unwrap() else {
        panic!("expected adapter output");
    };
    assert_eq!(value["text"], "[markdown]");
    assert_eq!(value["prompt"], "sum it up");
}

#[test]
fn test_adapter_folds_sets() {
    let rt = toy_runtime();
    let pipe = Pipeline::new()
        .then(load("expanding"))
        .then(present("markdown"))
        .then(adapt("echo"));
    let PipeValue::Adapted(value) = pipe.run(&rt, "batch.multi").unwrap() else {
        panic!("expected adapter output");
    };
    assert_eq!(value["text"], "[markdown]\n\n[markdown]");
}

#[test]
fn test_suffix_dispatch_reaches_opaque_payloads() {
    let rt = toy_runtime();
    let mut att = Artifact::new("custom.thing");
    att.set_payload(Payload::Opaque {
        type_name: "plugin.PluginThing".into(),
        handle: std::sync::Arc::new(7u8),
    });
    let pipe = Pipeline::new().then(llmctx_engine::modify("tag"));
    let PipeValue::One(att) = pipe.run(&rt, att).unwrap() else {
        panic!("expected artifact");
    };
    assert_eq!(att.text, "[opaque]");
}

#[test]
fn test_unknown_verb_is_an_error() {
    let rt = toy_runtime();
    match Pipeline::new().then(load("nonexistent")).run(&rt, "x.txt") {
        Err(LlmctxError::UnknownVerb(name)) => assert_eq!(name, "nonexistent"),
        other => panic!("expected UnknownVerb, got {other:?}"),
    }
}

#[test]
fn test_partial_application_sets_command() {
    let rt = toy_runtime();
    let pipe = Pipeline::new().then(load("text")).then(refine("stamp").with("42"));
    let PipeValue::One(att) = pipe.run(&rt, "notes.txt").unwrap() else {
        panic!("expected artifact");
    };
    assert_eq!(att.commands.get("stamp"), Some("42"));
}

fn always(_att: &Artifact) -> bool {
    true
}

fn proc_primary(_rt: &Runtime, mut att: Artifact) -> Result<PipeValue> {
    att.append_text("primary ran");
    Ok(PipeValue::One(att))
}

fn proc_named(_rt: &Runtime, mut att: Artifact) -> Result<PipeValue> {
    att.append_text("named ran");
    Ok(PipeValue::One(att))
}

#[test]
fn test_processor_discovery_primary_vs_named() {
    let rt = RuntimeBuilder::new()
        .named_processor("special", "explicit-only processor", always, proc_named)
        .processor("catch-all processor", always, proc_primary)
        .build();

    // Named processors are never auto-selected, even registered first.
    let result = run_primary(&rt, Artifact::new("x")).unwrap().unwrap();
    let PipeValue::One(att) = result else {
        panic!("expected artifact");
    };
    assert_eq!(att.text, "primary ran");

    let PipeValue::One(att) = run_named(&rt, "special", Artifact::new("x")).unwrap() else {
        panic!("expected artifact");
    };
    assert_eq!(att.text, "named ran");

    assert!(matches!(
        run_named(&rt, "missing", Artifact::new("x")),
        Err(LlmctxError::UnknownVerb(_))
    ));
}

#[test]
fn test_no_primary_match_returns_none() {
    fn never(_att: &Artifact) -> bool {
        false
    }
    let rt = RuntimeBuilder::new()
        .processor("never matches", never, proc_primary)
        .build();
    assert!(run_primary(&rt, Artifact::new("x")).is_none());
}

#[test]
fn test_modality_override() {
    let rt = RuntimeBuilder::new()
        .presenter("contact_sheet", Some(TypeKey::Kind(PayloadKind::Text)), present_images)
        .presenter_modality("contact_sheet", Modality::Image)
        .build();
    assert_eq!(
        rt.registries().presenter("contact_sheet").unwrap().modality,
        Modality::Image
    );
}
