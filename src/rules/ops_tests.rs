use super::*;

fn texts(sequence: &Sequence) -> Vec<&str> {
    sequence.iter().filter_map(Node::text).collect()
}

fn list<'a>(mapping: &'a Mapping, key: &str) -> &'a Sequence {
    mapping
        .get(key)
        .and_then(Node::as_sequence)
        .expect("list value")
}

#[test]
fn mapping_key_is_added_once_and_never_replaced() {
    let mut mapping = Mapping::new();
    let value: Node = Mapping::new().into();
    assert!(ensure_mapping_key(&mut mapping, "inputs", &value));
    assert!(!ensure_mapping_key(&mut mapping, "inputs", &value));

    let mut scalar = Mapping::new().with("inputs", Scalar::plain("x"));
    assert!(!ensure_mapping_key(&mut scalar, "inputs", &value));
    assert_eq!(scalar.get("inputs").and_then(Node::text), Some("x"));
}

#[test]
fn scalar_compares_text_and_style() {
    let wanted = Scalar::single_quoted("${{ steps.out.outputs.docs_only }}");
    let mut mapping = Mapping::new().with("docs_only", Scalar::plain("${{ steps.out.outputs.docs_only }}"));
    assert!(ensure_scalar_equals(&mut mapping, "docs_only", &wanted));
    assert!(!ensure_scalar_equals(&mut mapping, "docs_only", &wanted));

    let mut empty = Mapping::new();
    assert!(ensure_scalar_equals(&mut empty, "if", &wanted));
    assert_eq!(empty.len(), 1);
}

#[test]
fn scalar_overwrites_collections() {
    let wanted = Scalar::plain("pwsh");
    let mut mapping = Mapping::new().with("shell", Mapping::new());
    assert!(ensure_scalar_equals(&mut mapping, "shell", &wanted));
    assert_eq!(mapping.get("shell").and_then(Node::text), Some("pwsh"));
}

#[test]
fn list_is_created_for_a_missing_key() {
    let mut mapping = Mapping::new();
    assert_eq!(ensure_list_contains(&mut mapping, "needs", &Scalar::plain("build")), Some(true));
    assert_eq!(texts(list(&mapping, "needs")), vec!["build"]);
}

#[test]
fn list_append_is_idempotent() {
    let mut mapping = Mapping::new().with("needs", Sequence::new().with(Scalar::plain("build")));
    let lint = Scalar::plain("lint");
    assert_eq!(ensure_list_contains(&mut mapping, "needs", &lint), Some(true));
    assert_eq!(ensure_list_contains(&mut mapping, "needs", &lint), Some(false));
    assert_eq!(texts(list(&mapping, "needs")), vec!["build", "lint"]);
}

#[test]
fn list_membership_ignores_quoting() {
    let mut mapping = Mapping::new().with("needs", Sequence::new().with(Scalar::single_quoted("build")));
    assert_eq!(
        ensure_list_contains(&mut mapping, "needs", &Scalar::plain("build")),
        Some(false)
    );
}

#[test]
fn single_scalar_is_promoted_to_a_list() {
    let mut mapping = Mapping::new().with("needs", Scalar::plain("build"));
    assert_eq!(ensure_list_contains(&mut mapping, "needs", &Scalar::plain("build")), Some(false));
    assert_eq!(ensure_list_contains(&mut mapping, "needs", &Scalar::plain("lint")), Some(true));
    assert_eq!(texts(list(&mapping, "needs")), vec!["build", "lint"]);

    let mut null = Mapping::new().with("needs", Scalar::null());
    assert_eq!(ensure_list_contains(&mut null, "needs", &Scalar::plain("lint")), Some(true));
    assert_eq!(texts(list(&null, "needs")), vec!["lint"]);
}

#[test]
fn mapping_value_is_not_a_list() {
    let mut mapping = Mapping::new().with("needs", Mapping::new());
    assert_eq!(ensure_list_contains(&mut mapping, "needs", &Scalar::plain("x")), None);
}

#[test]
fn aliased_values_are_read_but_never_rewritten() {
    let mut doc = crate::codec::Codec::default()
        .load(std::path::Path::new("alias.yml"), "base: &b [build]\nneeds: *b\nshell: &s bash\nother: *s\n")
        .expect("document loads");
    let mapping = doc.root_mut().as_mapping_mut().expect("mapping root");
    assert_eq!(ensure_list_contains(mapping, "needs", &Scalar::plain("lint")), None);
    assert!(!ensure_scalar_equals(mapping, "other", &Scalar::plain("bash")));
    assert_eq!(mapping.get("needs").map(Node::kind), Some("alias"));
}

fn step(id: &str, uses: &str) -> Node {
    Mapping::new()
        .with("id", Scalar::plain(id))
        .with("uses", Scalar::plain(uses))
        .into()
}

fn ids(sequence: &Sequence) -> Vec<&str> {
    sequence
        .iter()
        .filter_map(|item| item.get("id").and_then(Node::text))
        .collect()
}

#[test]
fn item_is_inserted_after_its_anchor() {
    let mut steps = Sequence::new()
        .with(step("checkout", "actions/checkout@v4"))
        .with(step("g", "./pre-init-gate"))
        .with(step("tail", "./tail"));
    let out = step("out", "./out");
    let anchor = Target::id("g");
    assert!(ensure_item_after(&mut steps, &Target::id("out"), &out, Some(&anchor), false));
    assert_eq!(ids(&steps), vec!["checkout", "g", "out", "tail"]);
    assert!(!ensure_item_after(&mut steps, &Target::id("out"), &out, Some(&anchor), false));
    assert_eq!(steps.len(), 4);
}

#[test]
fn item_is_appended_without_an_anchor() {
    let mut steps = Sequence::new().with(step("checkout", "actions/checkout@v4"));
    let out = step("out", "./out");
    let missing = Target::id("nope");
    assert!(ensure_item_after(&mut steps, &Target::id("out"), &out, Some(&missing), false));
    assert_eq!(ids(&steps), vec!["checkout", "out"]);
}

#[test]
fn existing_item_is_left_alone_unless_reconciling() {
    let canonical: Node = Mapping::new()
        .with("id", Scalar::plain("out"))
        .with("shell", Scalar::plain("pwsh"))
        .with("env", Mapping::new().with("A", Scalar::plain("1")))
        .into();
    let existing = || {
        Sequence::new().with(
            Mapping::new()
                .with("id", Scalar::plain("out"))
                .with("shell", Scalar::plain("bash"))
                .with("env", Mapping::new().with("B", Scalar::plain("2"))),
        )
    };
    let target = Target::id("out");

    let mut untouched = existing();
    assert!(!ensure_item_after(&mut untouched, &target, &canonical, None, false));
    assert_eq!(untouched, existing());

    let mut reconciled = existing();
    assert!(ensure_item_after(&mut reconciled, &target, &canonical, None, true));
    let item = reconciled.get(0).expect("item");
    assert_eq!(item.get("shell").and_then(Node::text), Some("pwsh"));
    // Nested collections already present are kept as they are.
    assert_eq!(
        item.get("env").and_then(|env| env.get("B")).and_then(Node::text),
        Some("2")
    );
    assert!(!ensure_item_after(&mut reconciled, &target, &canonical, None, true));
}
