//! Integration tests — loading, saving and the JSON command surface.

use meiedit::{
    apply_json, load_file, outcome_to_json, parse_mei, save_file, write_mei, Command, Document,
    EditError, EditOutcome, Editor, NodeId,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

/// Get the path to the fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn folio() -> Document {
    load_file(fixtures_dir().join("folio.mei")).expect("Failed to load folio.mei")
}

/// Full snapshot of the tree: tags, identifiers, attributes and text.
fn snapshot(doc: &Document) -> Vec<String> {
    let mut lines = Vec::new();
    collect(doc, doc.root(), 0, &mut lines);
    lines
}

fn collect(doc: &Document, key: NodeId, depth: usize, lines: &mut Vec<String>) {
    let node = doc.node(key);
    let mut line = format!("{}{}#{}", "  ".repeat(depth), node.tag(), node.id());
    for (name, value) in node.attributes() {
        line.push_str(&format!(" {name}={value}"));
    }
    if let Some(text) = node.text() {
        line.push_str(&format!(" {text:?}"));
    }
    lines.push(line);
    for &child in node.children() {
        collect(doc, child, depth + 1, lines);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Load / save
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn load_keeps_ids_text_and_namespace() {
    let doc = folio();
    assert_eq!(doc.id_of(doc.root()), "m-root");
    assert_eq!(
        doc.node(doc.root()).attribute("xmlns"),
        Some("http://www.music-encoding.org/ns/mei")
    );
    let title = doc.lookup("m-title").unwrap();
    assert_eq!(doc.node(title).text(), Some("Antiphonale, folio 12r"));
    assert_eq!(doc.node(doc.lookup("n1").unwrap()).attribute("facs"), Some("#z-n1"));
}

#[test]
fn elements_without_ids_get_generated_ones() {
    let doc = load_file(fixtures_dir().join("no_facsimile.mei")).unwrap();
    let root_id = doc.id_of(doc.root());
    assert!(root_id.starts_with("m-"), "unexpected generated id {root_id}");

    let note = doc.lookup("n1-a").unwrap();
    let nc = doc.parent(note).unwrap();
    assert!(doc.id_of(nc).starts_with("m-"));
    assert_ne!(doc.id_of(nc), root_id);
}

#[test]
fn write_then_parse_round_trips() {
    let doc = folio();
    let xml = write_mei(&doc).unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains(r#"<mei xmlns="http://www.music-encoding.org/ns/mei" xml:id="m-root""#));

    let reparsed = parse_mei(&xml).unwrap();
    assert_eq!(snapshot(&reparsed), snapshot(&doc));
}

#[test]
fn edited_document_round_trips() {
    let mut editor = Editor::new(folio());
    editor
        .insert_division(Some("n3"), "final", &meiedit::BoundingBox::new(1.0, 2.0, 3.0, 4.0))
        .unwrap();
    let doc = editor.into_document();

    let reparsed = Document::parse_mei(&doc.to_mei_string().unwrap()).unwrap();
    assert_eq!(snapshot(&reparsed), snapshot(&doc));
    reparsed.verify().unwrap();
}

#[test]
fn save_file_writes_loadable_mei() {
    let doc = folio();
    let path = std::env::temp_dir().join(format!("meiedit-save-{}.mei", std::process::id()));
    save_file(&doc, &path).unwrap();

    let loaded = load_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(snapshot(&loaded), snapshot(&doc));
}

#[test]
fn non_mei_root_is_a_parse_error() {
    let err = parse_mei("<score-partwise/>").unwrap_err();
    assert!(matches!(err, EditError::Parse(_)));

    let err = parse_mei("<mei><music></mei>").unwrap_err();
    assert!(matches!(err, EditError::Parse(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_file(fixtures_dir().join("does-not-exist.mei")).unwrap_err();
    assert!(matches!(err, EditError::Io(_)));
}

// ═══════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn apply_json_reports_created_id() {
    let mut editor = Editor::new(folio());
    let out = apply_json(
        &mut editor,
        r#"{"action":"insert_division","before_id":"n3","form":"final",
            "bbox":{"ulx":400,"uly":220,"lrx":410,"lry":340}}"#,
    )
    .unwrap();

    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    let id = value["id"].as_str().expect("outcome should carry an id");
    assert!(editor.document().lookup(id).is_ok());
    editor.document().verify().unwrap();
}

#[test]
fn apply_json_plain_success_is_null() {
    let mut editor = Editor::new(folio());
    let out = apply_json(&mut editor, r#"{"action":"delete_neume","ids":["n1"]}"#).unwrap();
    assert_eq!(out, "null");
    assert!(editor.document().lookup("n1").is_err());
}

#[test]
fn apply_json_ungroup_lists_new_ids() {
    let mut editor = Editor::new(folio());
    let out = apply_json(
        &mut editor,
        r#"{"action":"ungroup","ids":["n2"],"boxes":[[
            {"ulx":300,"uly":260,"lrx":330,"lry":300},
            {"ulx":340,"uly":240,"lrx":370,"lry":280}]]}"#,
    )
    .unwrap();

    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["nids"][0].as_array().map(Vec::len), Some(2));
}

#[test]
fn pitch_tables_use_client_field_names() {
    let cmd = Command::from_json(
        r#"{"action":"delete_clef","clefs":[
            {"id":"c2","pitchInfo":[{"id":"n6","noteInfo":{"pname":"e","oct":3}},
                                    {"id":"n2","noteInfo":[{"pname":"f","oct":3},{"pname":"a","oct":3}]}]}]}"#,
    )
    .unwrap();

    let mut editor = Editor::new(folio());
    assert_eq!(editor.apply(&cmd).unwrap(), EditOutcome::Done);

    let doc = editor.document();
    assert!(doc.lookup("c2").is_err());
    assert_eq!(doc.node(doc.lookup("n6-a").unwrap()).attribute("pname"), Some("e"));
    assert_eq!(doc.node(doc.lookup("n2-b").unwrap()).attribute("pname"), Some("a"));
}

#[test]
fn failed_command_leaves_document_unchanged() {
    let mut editor = Editor::new(folio());
    let before = snapshot(editor.document());

    let err = apply_json(&mut editor, r#"{"action":"delete_custos","ids":["cu1","nope"]}"#)
        .unwrap_err();
    assert!(matches!(err, EditError::NotFound(_)));
    assert_eq!(snapshot(editor.document()), before);

    let err = apply_json(&mut editor, r#"{"action":"rotate","ids":[]}"#).unwrap_err();
    assert!(matches!(err, EditError::Json(_)));
}

#[test]
fn outcomes_serialize_to_client_shapes() {
    assert_eq!(outcome_to_json(&EditOutcome::Done).unwrap(), "null");
    assert_eq!(
        outcome_to_json(&EditOutcome::Created { id: "m-1".into() }).unwrap(),
        r#"{"id":"m-1"}"#
    );
    assert_eq!(
        outcome_to_json(&EditOutcome::Ungrouped {
            nids: vec![vec!["a".into(), "b".into()], vec![]]
        })
        .unwrap(),
        r#"{"nids":[["a","b"],[]]}"#
    );
}
