//! Declarative rule catalog.
//!
//! A catalog is a table of rule sets, each pairing a file predicate with an
//! ordered list of rules. Adding a target file or rule is a data change: the
//! built-in sets live here as values, and more can be loaded from JSON.
use crate::document::{Document, Mapping, Node, Scalar, ScalarStyle, Sequence};
use crate::locate::{NodePath, Target};
use crate::rules::{Action, Effect, Rule};
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Which files a rule set applies to.
#[derive(Debug, Clone)]
pub enum FileMatch {
    /// Exact file name (no directory).
    FileName(String),
    /// Regex over the file name.
    FilePattern(Regex),
    /// Top-level `name:` of the workflow.
    WorkflowName(String),
    /// Any of the listed predicates.
    Any(Vec<FileMatch>),
}

impl FileMatch {
    pub fn matches(&self, path: &Path, doc: &Document) -> bool {
        let file_name = path.file_name().and_then(|name| name.to_str());
        match self {
            FileMatch::FileName(name) => file_name == Some(name.as_str()),
            FileMatch::FilePattern(pattern) => file_name.is_some_and(|name| pattern.is_match(name)),
            FileMatch::WorkflowName(name) => doc.workflow_name() == Some(name.as_str()),
            FileMatch::Any(all) => all.iter().any(|predicate| predicate.matches(path, doc)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    name: String,
    applies: FileMatch,
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, applies: FileMatch, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            applies,
            rules,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn applies_to(&self, path: &Path, doc: &Document) -> bool {
        self.applies.matches(path, doc)
    }
}

/// Ordered rule sets; rules run in catalog order within each document.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    sets: Vec<RuleSet>,
}

impl Catalog {
    /// The rule sets shipped with the tool.
    pub fn builtin() -> Self {
        Self {
            sets: vec![pester_self_hosted()],
        }
    }

    pub fn push(&mut self, set: RuleSet) {
        self.sets.push(set);
    }

    pub fn sets(&self) -> &[RuleSet] {
        &self.sets
    }

    /// Run every applicable rule against `doc` and return the names of the
    /// rules that changed it. Applicability is decided before any rule runs,
    /// so a rule cannot switch a later set on or off.
    pub fn apply(&self, path: &Path, doc: &mut Document) -> Vec<String> {
        let sets: Vec<&RuleSet> = self
            .sets
            .iter()
            .filter(|set| set.applies_to(path, doc))
            .collect();
        let mut changed = Vec::new();
        for set in sets {
            for rule in &set.rules {
                let effect = rule.apply(doc.root_mut());
                match effect {
                    Effect::Changed => {
                        tracing::debug!(
                            rule = rule.name(),
                            path = %path.display(),
                            "rule changed document"
                        );
                        changed.push(rule.name().to_string());
                    }
                    _ => tracing::trace!(rule = rule.name(), ?effect, "rule left document as is"),
                }
            }
        }
        changed
    }
}

pub const PESTER_WORKFLOW_FILE: &str = "pester-selfhosted.yml";

const DOCS_ONLY_SCRIPT: &str = concat!(
    "$force = '${{ inputs.force_run }}'\n",
    "if ($force -ieq 'true') { $val = 'false' } else { $val = '${{ steps.g.outputs.docs_only || ''false'' }}' }\n",
    "\"docs_only=$val\" | Out-File -FilePath $env:GITHUB_OUTPUT -Append -Encoding utf8\n",
);

/// Force-run toggle and docs-only gate wiring for the self-hosted Pester
/// workflow.
fn pester_self_hosted() -> RuleSet {
    let dispatch = NodePath::keys("on.workflow_dispatch");
    let pre_init = NodePath::keys("jobs.pre-init");
    let steps = NodePath::keys("jobs.pre-init.steps");
    let gate = Target::id("g").and(Target::uses_suffix("pre-init-gate"));

    let force_run = Mapping::new()
        .with("description", Scalar::string("Force run (bypass docs-only gate)"))
        .with("required", Scalar::bool(false))
        .with("default", Scalar::string("false"))
        .with("type", Scalar::string("choice"))
        .with(
            "options",
            Sequence::new()
                .with(Scalar::string("true"))
                .with(Scalar::string("false")),
        );
    let out_step = Mapping::new()
        .with("name", Scalar::string("Compute docs_only (force_run aware)"))
        .with("id", Scalar::string("out"))
        .with("shell", Scalar::string("pwsh"))
        .with("run", Scalar::literal(DOCS_ONLY_SCRIPT));

    let rules = vec![
        Rule::new("force-run-input")
            .action(Action::ensure_key(dispatch.clone(), "inputs", Mapping::new()))
            .action(Action::ensure_key(
                dispatch.then(Target::key("inputs")),
                "force_run",
                force_run,
            )),
        Rule::new("docs-only-output")
            .action(Action::ensure_key(pre_init.clone(), "outputs", Mapping::new()))
            .action(Action::ensure_scalar(
                pre_init.then(Target::key("outputs")),
                "docs_only",
                Scalar::single_quoted("${{ steps.out.outputs.docs_only }}"),
            )),
        Rule::new("gate-pre-init").action(Action::ensure_scalar(
            steps.clone().then(gate.clone()),
            "if",
            Scalar::single_quoted("${{ inputs.force_run != 'true' }}"),
        )),
        Rule::new("docs-only-step")
            .requires(steps.clone().then(gate.clone()))
            .action(Action::ensure_item(steps, Target::id("out"), out_step).after(gate)),
    ];

    RuleSet::new(
        "pester-self-hosted",
        FileMatch::Any(vec![
            FileMatch::FileName(PESTER_WORKFLOW_FILE.to_string()),
            FileMatch::WorkflowName("Pester (self-hosted)".to_string()),
            FileMatch::WorkflowName("Pester (integration)".to_string()),
        ]),
        rules,
    )
}

/// A rule set as written in a JSON config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetSpec {
    pub name: String,
    #[serde(default)]
    pub file_names: Vec<String>,
    #[serde(default)]
    pub file_pattern: Option<String>,
    #[serde(default)]
    pub workflow_names: Vec<String>,
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default)]
    pub requires: Vec<PathSpec>,
    pub actions: Vec<ActionSpec>,
}

/// Either a dotted key path (`"jobs.build.steps"`) or a list of steps, each
/// a key or a target object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PathSpec {
    Dotted(String),
    Steps(Vec<StepSpec>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    Key(String),
    Find(TargetSpec),
}

/// Target fields; every field given must match.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    pub key: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub name_prefix: Option<String>,
    pub uses: Option<String>,
    pub uses_prefix: Option<String>,
    pub uses_suffix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum ActionSpec {
    EnsureKey {
        parent: PathSpec,
        key: String,
        value: Value,
    },
    EnsureScalar {
        parent: PathSpec,
        key: String,
        value: Value,
    },
    EnsureListContains {
        parent: PathSpec,
        key: String,
        value: Value,
    },
    EnsureItem {
        parent: PathSpec,
        target: TargetSpec,
        item: Value,
        #[serde(default)]
        after: Option<TargetSpec>,
        #[serde(default)]
        reconcile: bool,
    },
}

impl RuleSetSpec {
    pub fn build(&self) -> Result<RuleSet> {
        let mut applies: Vec<FileMatch> = self
            .file_names
            .iter()
            .cloned()
            .map(FileMatch::FileName)
            .collect();
        if let Some(pattern) = &self.file_pattern {
            let regex = Regex::new(pattern)
                .with_context(|| format!("compile file_pattern {pattern:?}"))?;
            applies.push(FileMatch::FilePattern(regex));
        }
        applies.extend(self.workflow_names.iter().cloned().map(FileMatch::WorkflowName));
        if applies.is_empty() {
            bail!("rule set {:?} names no files or workflows", self.name);
        }
        let rules = self
            .rules
            .iter()
            .map(|rule| rule.build().with_context(|| format!("rule {:?}", rule.name)))
            .collect::<Result<Vec<_>>>()?;
        Ok(RuleSet::new(self.name.clone(), FileMatch::Any(applies), rules))
    }
}

impl RuleSpec {
    fn build(&self) -> Result<Rule> {
        let mut rule = Rule::new(self.name.clone());
        for path in &self.requires {
            rule = rule.requires(path.build()?);
        }
        if self.actions.is_empty() {
            bail!("rule has no actions");
        }
        for action in &self.actions {
            rule = rule.action(action.build()?);
        }
        Ok(rule)
    }
}

impl PathSpec {
    fn build(&self) -> Result<NodePath> {
        match self {
            PathSpec::Dotted(path) => Ok(NodePath::keys(path)),
            PathSpec::Steps(steps) => steps.iter().try_fold(NodePath::root(), |path, step| -> Result<NodePath> {
                let target = match step {
                    StepSpec::Key(key) => Target::key(key.clone()),
                    StepSpec::Find(spec) => spec.build()?,
                };
                Ok(path.then(target))
            }),
        }
    }
}

impl TargetSpec {
    fn build(&self) -> Result<Target> {
        let fields = [
            self.key.clone().map(Target::Key),
            self.id.clone().map(Target::id),
            self.name.clone().map(Target::name),
            self.name_prefix.clone().map(Target::name_prefix),
            self.uses.clone().map(|uses| Target::field("uses", uses)),
            self.uses_prefix.clone().map(Target::uses_prefix),
            self.uses_suffix.clone().map(Target::uses_suffix),
        ];
        fields
            .into_iter()
            .flatten()
            .reduce(Target::and)
            .ok_or_else(|| anyhow!("target names no field to match"))
    }
}

impl ActionSpec {
    fn build(&self) -> Result<Action> {
        Ok(match self {
            ActionSpec::EnsureKey { parent, key, value } => {
                Action::ensure_key(parent.build()?, key.clone(), node_from_json(value)?)
            }
            ActionSpec::EnsureScalar { parent, key, value } => {
                Action::ensure_scalar(parent.build()?, key.clone(), scalar_from_json(value)?)
            }
            ActionSpec::EnsureListContains { parent, key, value } => Action::ensure_list_contains(
                parent.build()?,
                key.clone(),
                scalar_from_json(value)?,
            ),
            ActionSpec::EnsureItem {
                parent,
                target,
                item,
                after,
                reconcile,
            } => {
                let mut action =
                    Action::ensure_item(parent.build()?, target.build()?, node_from_json(item)?);
                if let Some(anchor) = after {
                    action = action.after(anchor.build()?);
                }
                if *reconcile {
                    action = action.reconciling();
                }
                action
            }
        })
    }
}

/// Canonical content from JSON. `{"value": .., "style": ..}` pins a scalar
/// style; other strings are styled so they read back as strings.
pub fn node_from_json(value: &Value) -> Result<Node> {
    Ok(match value {
        Value::Null => Node::Scalar(Scalar::null()),
        Value::Bool(flag) => Node::Scalar(Scalar::bool(*flag)),
        Value::Number(number) => Node::Scalar(Scalar::plain(number.to_string())),
        Value::String(text) => Node::Scalar(Scalar::string(text.clone())),
        Value::Array(items) => {
            let mut sequence = Sequence::new();
            for item in items {
                sequence.push(node_from_json(item)?);
            }
            Node::Sequence(sequence)
        }
        Value::Object(fields) => {
            if let Some(scalar) = styled_scalar(fields)? {
                return Ok(Node::Scalar(scalar));
            }
            let mut mapping = Mapping::new();
            for (key, field) in fields {
                mapping.insert(key.clone(), node_from_json(field)?);
            }
            Node::Mapping(mapping)
        }
    })
}

fn scalar_from_json(value: &Value) -> Result<Scalar> {
    match node_from_json(value)? {
        Node::Scalar(scalar) => Ok(scalar),
        other => bail!("expected a scalar value, found a {}", other.kind()),
    }
}

fn styled_scalar(fields: &serde_json::Map<String, Value>) -> Result<Option<Scalar>> {
    if fields.len() != 2 {
        return Ok(None);
    }
    let (Some(value), Some(style)) = (fields.get("value"), fields.get("style")) else {
        return Ok(None);
    };
    let style: ScalarStyle =
        serde_json::from_value(style.clone()).context("parse scalar style")?;
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        _ => bail!("styled scalar value must be a string, number, or bool"),
    };
    Ok(Some(Scalar::new(text, style)))
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
