//! Source rendering for the generated concept and value modules.

use crate::error::{CodegenError, CodegenErrorExt};
use crate::prefix::{PREFIX_ALGORITHM_VERSION, derive_prefix};
use crate::GenerationContext;
use fxhash::FxHashMap;
use kreg_domain::{Concept, Value, ValueSet};
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use tracing::warn;

const CONCEPT_PREFIX: &str = "CONCEPT_";
const CONCEPT_BUILTINS: &[&str] = &[
    "GENERATED_AT",
    "KERNEL_VERSION",
    "SNAPSHOT_ID",
    "PREFIX_ALGORITHM_VERSION",
    "CONCEPTS",
    "CONCEPT_CATEGORIES",
    "CONCEPT_COUNT",
];
const VALUE_BUILTINS: &[&str] = &[
    "GENERATED_AT",
    "KERNEL_VERSION",
    "SNAPSHOT_ID",
    "PREFIX_ALGORITHM_VERSION",
    "VALUE_SETS",
    "VALUE_SET_COUNT",
    "VALUE_COUNT",
];
const SET_MODULE_BUILTINS: &[&str] = &["CODE", "IDENTIFIER", "PREFIX", "VALUES"];
const VALUE_SET_PREFIX: &str = "VALUESET_";

/// Generated constant name of a concept.
#[must_use]
pub fn concept_identifier(code: &str) -> String {
    format!("{CONCEPT_PREFIX}{code}")
}

/// Generated constant name of a value set.
#[must_use]
pub fn value_set_identifier(code: &str) -> String {
    format!("{VALUE_SET_PREFIX}{code}")
}

/// Generated constant name of a value, given its set prefix.
#[must_use]
pub fn value_identifier(prefix: &str, code: &str) -> String {
    format!("{prefix}_{code}")
}

/// Module name of a value set (`ACCOUNT_TYPE` → `account_type`, `TYPE` → `type_`).
#[must_use]
pub fn module_name(code: &str) -> String {
    let name = code.to_lowercase();
    if is_keyword(&name) { format!("{name}_") } else { name }
}

fn is_keyword(name: &str) -> bool {
    const KEYWORDS: &[&str] = &[
        "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
        "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
        "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub",
        "ref", "return", "self", "static", "struct", "super", "trait", "true", "try", "type",
        "typeof", "union", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
    ];
    KEYWORDS.contains(&name)
}

/// Tracks the names declared in one generated module and which entity produced them.
struct Scope {
    module: String,
    names: FxHashMap<String, String>,
}

impl Scope {
    fn new(module: impl Into<String>, reserved: &[&str]) -> Self {
        let names =
            reserved.iter().map(|n| ((*n).to_owned(), format!("the built-in `{n}`"))).collect();
        Self { module: module.into(), names }
    }

    fn declare(&mut self, identifier: &str, owner: String) -> Result<(), CodegenError> {
        if let Some(first) = self.names.get(identifier) {
            return Err(CodegenError::IdentifierCollision {
                module: self.module.clone(),
                identifier: identifier.to_owned(),
                first: first.clone(),
                second: owner,
                context: None,
            });
        }
        self.names.insert(identifier.to_owned(), owner);
        Ok(())
    }
}

fn write_header(w: &mut String, title: &str, ctx: &GenerationContext) -> Result<(), std::fmt::Error> {
    writeln!(w, "//! {title}")?;
    writeln!(w, "//!")?;
    writeln!(w, "//! Generated by `kreg generate`. Do not edit by hand.")?;
    writeln!(w)?;
    writeln!(w, "pub const GENERATED_AT: &str = {:?};", ctx.generated_at_rfc3339())?;
    writeln!(w, "pub const KERNEL_VERSION: &str = {:?};", ctx.kernel_version)?;
    writeln!(w, "pub const SNAPSHOT_ID: &str = {:?};", ctx.snapshot_id)?;
    writeln!(w, "pub const PREFIX_ALGORITHM_VERSION: u32 = {PREFIX_ALGORITHM_VERSION};")?;
    Ok(())
}

/// Pack text made safe for a line comment: control characters become spaces and runs of
/// whitespace collapse, so nothing can end the comment early.
fn comment_text(text: &str) -> String {
    text.split(|c: char| c.is_control() || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_doc(w: &mut String, indent: &str, text: &str) -> Result<(), std::fmt::Error> {
    for line in text.split(['\n', '\r']).map(comment_text).filter(|l| !l.is_empty()) {
        writeln!(w, "{indent}/// {line}")?;
    }
    Ok(())
}

fn write_table(
    w: &mut String,
    indent: &str,
    name: &str,
    rows: &[(String, String)],
) -> Result<(), std::fmt::Error> {
    writeln!(w, "{indent}pub const {name}: &[(&str, &str)] = &[")?;
    for (key, value) in rows {
        writeln!(w, "{indent}    ({key:?}, {value:?}),")?;
    }
    writeln!(w, "{indent}];")?;
    Ok(())
}

/// Renders the concept module.
///
/// Constants are grouped under category comments (categories alphabetical, codes alphabetical
/// within a category). Grouping is cosmetic: identifiers only depend on the concept code.
pub fn generate_concepts(
    concepts: &[Concept],
    ctx: &GenerationContext,
) -> Result<String, CodegenError> {
    let mut scope = Scope::new("concepts", CONCEPT_BUILTINS);

    let mut by_category: BTreeMap<&str, Vec<&Concept>> = BTreeMap::new();
    for concept in concepts {
        scope.declare(&concept_identifier(&concept.code), format!("concept {}", concept.code))?;
        by_category.entry(concept.category.as_str()).or_default().push(concept);
    }

    let mut sorted: Vec<&Concept> = concepts.iter().collect();
    sorted.sort_by(|a, b| a.code.cmp(&b.code));

    let mut w = String::new();
    render_concepts(&mut w, ctx, &by_category, &sorted).context("rendering concepts")?;
    Ok(w)
}

fn render_concepts(
    w: &mut String,
    ctx: &GenerationContext,
    by_category: &BTreeMap<&str, Vec<&Concept>>,
    sorted: &[&Concept],
) -> Result<(), std::fmt::Error> {
    write_header(w, "Kernel concept identifiers.", ctx)?;
    writeln!(w, "pub const CONCEPT_COUNT: usize = {};", sorted.len())?;

    for (category, members) in by_category {
        let mut members = members.clone();
        members.sort_by(|a, b| a.code.cmp(&b.code));
        writeln!(w)?;
        writeln!(w, "// --- {} ---", comment_text(category))?;
        for concept in members {
            write_doc(w, "", &concept.description)?;
            writeln!(w, "pub const {}: &str = {:?};", concept_identifier(&concept.code), concept.code)?;
        }
    }

    let identifiers: Vec<(String, String)> =
        sorted.iter().map(|c| (c.code.clone(), concept_identifier(&c.code))).collect();
    let categories: Vec<(String, String)> =
        sorted.iter().map(|c| (c.code.clone(), c.category.clone())).collect();

    writeln!(w)?;
    writeln!(w, "/// Concept code to generated identifier, sorted by code.")?;
    write_table(w, "", "CONCEPTS", &identifiers)?;
    writeln!(w)?;
    writeln!(w, "/// Concept code to category, sorted by code.")?;
    write_table(w, "", "CONCEPT_CATEGORIES", &categories)?;
    Ok(())
}

/// One value set with its prefix and members, ready to render.
struct SetPlan<'a> {
    set: &'a ValueSet,
    module: String,
    prefix: String,
    values: Vec<&'a Value>,
}

/// Renders the value module: one nested module per value set.
///
/// Values keep the order they are given in (registry order: sort order, then code).
pub fn generate_values(
    value_sets: &[ValueSet],
    values: &[Value],
    ctx: &GenerationContext,
) -> Result<String, CodegenError> {
    let mut sets: Vec<&ValueSet> = value_sets.iter().collect();
    sets.sort_by(|a, b| a.code.cmp(&b.code));

    let mut top = Scope::new("values", VALUE_BUILTINS);
    let mut modules = Scope::new("values", &[]);
    let mut prefixes: FxHashMap<String, &str> = FxHashMap::default();
    let mut plans = Vec::with_capacity(sets.len());

    for set in sets {
        top.declare(&value_set_identifier(&set.code), format!("value set {}", set.code))?;
        let module = module_name(&set.code);
        modules.declare(&module, format!("value set {}", set.code))?;

        let prefix = derive_prefix(set);
        if let Some(other) = prefixes.get(&prefix) {
            warn!(
                prefix = %prefix,
                first = %other,
                second = %set.code,
                "Value sets share an identifier prefix"
            );
        } else {
            prefixes.insert(prefix.clone(), &set.code);
        }

        let mut scope = Scope::new(format!("values::{module}"), SET_MODULE_BUILTINS);
        let members: Vec<&Value> = values.iter().filter(|v| v.value_set_code == set.code).collect();
        for value in &members {
            scope.declare(&value_identifier(&prefix, &value.code), format!("value {}", value.key()))?;
        }

        plans.push(SetPlan { set, module, prefix, values: members });
    }

    let value_count: usize = plans.iter().map(|p| p.values.len()).sum();
    let mut w = String::new();
    render_values(&mut w, ctx, &plans, value_count).context("rendering values")?;
    Ok(w)
}

fn render_values(
    w: &mut String,
    ctx: &GenerationContext,
    plans: &[SetPlan<'_>],
    value_count: usize,
) -> Result<(), std::fmt::Error> {
    write_header(w, "Kernel value set and value identifiers.", ctx)?;
    writeln!(w, "pub const VALUE_SET_COUNT: usize = {};", plans.len())?;
    writeln!(w, "pub const VALUE_COUNT: usize = {value_count};")?;
    writeln!(w)?;

    for plan in plans {
        writeln!(w, "pub const {}: &str = {:?};", value_set_identifier(&plan.set.code), plan.set.code)?;
    }

    let identifiers: Vec<(String, String)> =
        plans.iter().map(|p| (p.set.code.clone(), value_set_identifier(&p.set.code))).collect();
    writeln!(w)?;
    writeln!(w, "/// Value set code to generated identifier, sorted by code.")?;
    write_table(w, "", "VALUE_SETS", &identifiers)?;

    for plan in plans {
        writeln!(w)?;
        write_doc(w, "", &plan.set.description)?;
        writeln!(w, "pub mod {} {{", plan.module)?;
        writeln!(w, "    pub const CODE: &str = {:?};", plan.set.code)?;
        writeln!(w, "    pub const IDENTIFIER: &str = {:?};", value_set_identifier(&plan.set.code))?;
        writeln!(w, "    pub const PREFIX: &str = {:?};", plan.prefix)?;
        writeln!(w)?;
        for value in &plan.values {
            write_doc(w, "    ", &value.label)?;
            let identifier = value_identifier(&plan.prefix, &value.code);
            writeln!(w, "    pub const {identifier}: &str = {:?};", value.code)?;
        }

        let rows: Vec<(String, String)> = plan
            .values
            .iter()
            .map(|v| (v.code.clone(), value_identifier(&plan.prefix, &v.code)))
            .collect();
        writeln!(w)?;
        writeln!(w, "    /// Value code to generated identifier, in registry order.")?;
        write_table(w, "    ", "VALUES", &rows)?;
        writeln!(w, "}}")?;
    }
    Ok(())
}
