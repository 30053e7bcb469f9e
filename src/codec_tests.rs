use super::*;
use crate::document::{Mapping, Node, Scalar, ScalarStyle, Sequence};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn load(src: &str) -> Document {
    Codec::default()
        .load(Path::new("test.yml"), src)
        .expect("document loads")
}

fn root_mut(doc: &mut Document) -> &mut Mapping {
    doc.root_mut().as_mapping_mut().expect("mapping root")
}

fn mapping_mut<'a>(mapping: &'a mut Mapping, key: &str) -> &'a mut Mapping {
    mapping
        .get_mut(key)
        .and_then(Node::as_mapping_mut)
        .expect("nested mapping")
}

fn sequence_mut<'a>(mapping: &'a mut Mapping, key: &str) -> &'a mut Sequence {
    mapping
        .get_mut(key)
        .and_then(Node::as_sequence_mut)
        .expect("nested sequence")
}

fn serialize(doc: &Document) -> String {
    Codec::default().serialize(doc)
}

#[test]
fn untouched_documents_serialize_byte_for_byte() {
    let cases = [
        "",
        "# only comments\n\n",
        "a: 1",
        "%YAML 1.2\n---\na: 1\n...\n",
        "name: CI\n\non:\n  push:\n    branches: [main]   # trunk\n\n# jobs below\njobs:\n  build:\n    runs-on: ubuntu-latest\n",
        "a:\r\n  - x\r\n  - y # c\r\n",
        "key: first\n  second\n",
        "s: |+\n  keep\n\n\nnext: >\n  folded\n  text\n\n",
        "- a\n- b: 1\n  c: 2\n- - nested\n  - more\n",
        "just a scalar\n",
        "{a: 1, b: [x, y]}\n",
        "a: 'multi\n  line'\nb: \"x\\\n  y\"\n",
        "a:   spaced   # comment\n",
        "a:\n  # lead comment\n\n  b: 1\n",
        "steps:\n- uses: actions/checkout@v4\n  with: {fetch-depth: 0}\n",
        "x: &a 1\ny: *a\n",
        "x: &x 1\ne: !!str 3\nf: !custom [a, *x]\n",
        "? complex\n: value\n",
        "base: &b\n  k: v\nmerged:\n  <<: *b\n  extra: 1\n",
        "list: &l\n  - a\nagain: *l\n",
    ];
    for src in cases {
        assert_eq!(serialize(&load(src)), src);
    }
}

#[test]
fn replaced_scalar_keeps_key_and_comment() {
    let mut doc = load("a: 1 # keep\nb: 2\n");
    root_mut(&mut doc).insert("a", Scalar::plain("3"));
    assert_eq!(serialize(&doc), "a: 3 # keep\nb: 2\n");
}

#[test]
fn appended_entry_lands_at_collection_indent() {
    let mut doc = load("on:\n  push:\n    branches: [main]\n# trailing\n");
    mapping_mut(root_mut(&mut doc), "on").insert("workflow_dispatch", Scalar::null());
    assert_eq!(
        serialize(&doc),
        "on:\n  push:\n    branches: [main]\n  workflow_dispatch:\n# trailing\n"
    );
}

#[test]
fn only_the_edited_line_changes() {
    let src = "\
name: CI
# build matrix
jobs:
  build:
    runs-on: ubuntu-latest   # pinned
    timeout-minutes: 10

    steps:
      - uses: actions/checkout@v4
";
    let mut doc = load(src);
    let build = mapping_mut(mapping_mut(root_mut(&mut doc), "jobs"), "build");
    build.insert("timeout-minutes", Scalar::int(20));
    let out = serialize(&doc);
    let changed: Vec<(&str, &str)> = src
        .lines()
        .zip(out.lines())
        .filter(|(before, after)| before != after)
        .collect();
    assert_eq!(changed, vec![("    timeout-minutes: 10", "    timeout-minutes: 20")]);
    assert_eq!(src.lines().count(), out.lines().count());
}

#[test]
fn documents_with_anchors_stay_editable() {
    let src = "defaults: &d\n  shell: bash\njobs:\n  a:\n    defaults: *d # shared\n    runs-on: x\n";
    let mut doc = load(src);
    assert_eq!(serialize(&doc), src);
    let job = mapping_mut(mapping_mut(root_mut(&mut doc), "jobs"), "a");
    job.insert("timeout-minutes", Scalar::int(5));
    assert_eq!(
        serialize(&doc),
        "defaults: &d\n  shell: bash\njobs:\n  a:\n    defaults: *d # shared\n    runs-on: x\n    timeout-minutes: 5\n"
    );
}

#[test]
fn replaced_values_keep_their_anchor_and_tag() {
    let mut doc = load("a: &x 1 # c\nb: *x\ne: !!str 3\n");
    let root = root_mut(&mut doc);
    root.insert("a", Scalar::int(2));
    root.insert("e", Scalar::single_quoted("4"));
    assert_eq!(serialize(&doc), "a: &x 2 # c\nb: *x\ne: !!str '4'\n");
}

#[test]
fn flow_parent_stays_flow_when_a_child_gains_a_mapping() {
    let mut doc = load("on: {workflow_dispatch: {}, push: {}}\n");
    mapping_mut(mapping_mut(root_mut(&mut doc), "on"), "workflow_dispatch").insert(
        "inputs",
        Mapping::new().with("force_run", Mapping::new().with("type", Scalar::plain("choice"))),
    );
    assert_eq!(
        serialize(&doc),
        "on: {workflow_dispatch: {inputs: {force_run: {type: choice}}}, push: {}}\n"
    );
}

#[test]
fn fresh_collections_follow_the_document_indentation() {
    let mut doc = load("jobs:\n    build:\n        steps:\n        - run: a\n");
    let build = mapping_mut(mapping_mut(root_mut(&mut doc), "jobs"), "build");
    build.insert("outputs", Mapping::new().with("docs_only", Scalar::plain("x")));
    build.insert("needs", Sequence::new().with(Scalar::plain("lint")));
    assert_eq!(
        serialize(&doc),
        "jobs:\n    build:\n        steps:\n        - run: a\n        outputs:\n            docs_only: x\n        needs:\n        - lint\n"
    );
}

#[test]
fn flow_sequence_edits_stay_flow() {
    let mut doc = load("needs: [build]\n");
    sequence_mut(root_mut(&mut doc), "needs").push(Scalar::plain("lint"));
    assert_eq!(serialize(&doc), "needs: [build, lint]\n");
}

#[test]
fn block_sequence_append() {
    let mut doc = load("steps:\n  - a\n  - b\nafter: 1\n");
    sequence_mut(root_mut(&mut doc), "steps").push(Scalar::plain("c"));
    assert_eq!(serialize(&doc), "steps:\n  - a\n  - b\n  - c\nafter: 1\n");
}

#[test]
fn compact_item_edits() {
    let mut doc = load("steps:\n  - name: a\n    run: x\n");
    let steps = sequence_mut(root_mut(&mut doc), "steps");
    let step = steps
        .get_mut(0)
        .and_then(Node::as_mapping_mut)
        .expect("step mapping");
    step.insert("name", Scalar::plain("b"));
    step.insert("run", Scalar::plain("y"));
    step.insert("id", Scalar::plain("one"));
    assert_eq!(
        serialize(&doc),
        "steps:\n  - name: b\n    run: y\n    id: one\n"
    );
}

#[test]
fn inserted_mapping_item_is_written_compact() {
    let mut doc = load("steps:\n  - uses: a\n");
    sequence_mut(root_mut(&mut doc), "steps").push(
        Mapping::new()
            .with("name", Scalar::plain("Build"))
            .with("run", Scalar::plain("make")),
    );
    assert_eq!(
        serialize(&doc),
        "steps:\n  - uses: a\n  - name: Build\n    run: make\n"
    );
}

#[test]
fn null_value_becomes_block_mapping() {
    let mut doc = load("on:\n  workflow_dispatch:\n  push:\n");
    mapping_mut(root_mut(&mut doc), "on").insert(
        "workflow_dispatch",
        Mapping::new().with("inputs", Mapping::new()),
    );
    assert_eq!(
        serialize(&doc),
        "on:\n  workflow_dispatch:\n    inputs: {}\n  push:\n"
    );
}

#[test]
fn replaced_scalar_can_become_a_block_scalar() {
    let mut doc = load("run: echo hi\n");
    root_mut(&mut doc).insert("run", Scalar::literal("echo a\necho b\n"));
    let out = serialize(&doc);
    assert_eq!(out, "run: |\n  echo a\n  echo b\n");
    let reloaded = load(&out);
    let run = reloaded.get("run").and_then(Node::as_scalar).expect("run");
    assert_eq!(run.text(), "echo a\necho b\n");
    assert_eq!(run.style(), ScalarStyle::Literal);
}

#[test]
fn rendered_scalars_reload_with_the_same_style() {
    let mut doc = load("a: 1\n");
    let root = root_mut(&mut doc);
    root.insert("default", Scalar::string("false"));
    root.insert("expr", Scalar::single_quoted("${{ inputs.x != 'true' }}"));
    root.insert("msg", Scalar::double_quoted("tab\there"));
    let reloaded = load(&serialize(&doc));
    for key in ["default", "expr", "msg"] {
        let before = doc.get(key).and_then(Node::as_scalar).expect("before");
        let after = reloaded.get(key).and_then(Node::as_scalar).expect("after");
        assert!(before.same_as(after), "{key}: {before:?} vs {after:?}");
    }
    assert_eq!(
        reloaded.get("default").and_then(Node::as_scalar).map(Scalar::style),
        Some(ScalarStyle::SingleQuoted)
    );
}

#[test]
fn crlf_sources_keep_crlf_for_new_lines() {
    let mut doc = load("a: 1\r\nb:\r\n  c: 2\r\n");
    mapping_mut(root_mut(&mut doc), "b").insert("d", Scalar::int(3));
    assert_eq!(serialize(&doc), "a: 1\r\nb:\r\n  c: 2\r\n  d: 3\r\n");
}

#[test]
fn fresh_documents_follow_options() {
    let doc = Document::new(
        Mapping::new().with(
            "on",
            Mapping::new().with(
                "push",
                Mapping::new().with("branches", Sequence::new().with(Scalar::plain("main"))),
            ),
        ),
    );
    assert_eq!(
        serialize(&doc),
        "on:\n  push:\n    branches:\n      - main\n"
    );

    let wide = Codec::new(CodecOptions {
        indent: 4,
        sequence_indent: 0,
        newline: Newline::Crlf,
        ..CodecOptions::default()
    });
    assert_eq!(
        wide.serialize(&doc),
        "on:\r\n    push:\r\n        branches:\r\n        - main\r\n"
    );
}

#[test]
fn parse_errors_name_the_file_and_position() {
    let err = Codec::default()
        .load(Path::new("workflows/ci.yml"), "a: 1\na: 2\n")
        .expect_err("duplicate key");
    assert_eq!(err.path, PathBuf::from("workflows/ci.yml"));
    assert_eq!((err.line, err.column), (1, 1));
    assert!(
        err.to_string().starts_with("workflows/ci.yml:1:1: duplicate entry"),
        "{err}"
    );
}

#[test]
fn newline_conversion() {
    assert_eq!(Newline::Crlf.apply("a\nb\r\n"), "a\r\nb\r\n");
    assert_eq!(Newline::Lf.apply("a\r\nb"), "a\nb");
}

#[test]
fn codec_options_from_json() {
    let options: CodecOptions =
        serde_json::from_str(r#"{"indent": 4, "newline": "crlf"}"#).expect("options parse");
    assert_eq!(options.indent, 4);
    assert_eq!(options.width, 4096);
    assert_eq!(options.newline, Newline::Crlf);
    assert!(serde_json::from_str::<CodecOptions>(r#"{"tabs": true}"#).is_err());
}
