//! Rust source emission for lowered programs.
//!
//! The emitted module exposes `pub fn validate(data: &Value) -> Result<(), Violation>`
//! and one private function per block. It depends on `serde_json`, `regex`,
//! `oasv-core` and `oasv-schema`, and calls
//! [`check_builtin`](crate::formats::check_builtin) for `format`.

use oasv_core::{ErrorKind, PrimitiveType, TypeSet};
use serde_json::Value;

use super::program::{Block, BlockId, Pattern, Program, Rule, Selector, Step};

const PRELUDE: &str = r#"#![allow(dead_code, unused_imports, unused_mut, unused_variables, clippy::all)]

use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use oasv_schema::checks;
use oasv_schema::formats::check_builtin;
use regex::Regex;
use serde_json::Value;

/// The first violation found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: &'static str,
    pub path: String,
    pub schema_path: &'static str,
}

#[derive(Default)]
struct Seen {
    props: HashSet<String>,
    items: BTreeSet<usize>,
    all: bool,
}

impl Seen {
    fn merge(&mut self, other: Seen) {
        self.props.extend(other.props);
        self.items.extend(other.items);
        self.all |= other.all;
    }

    fn has_item(&self, i: usize) -> bool {
        self.all || self.items.contains(&i)
    }
}

fn member(path: &str, key: &str) -> String {
    format!("{path}/{}", key.replace('~', "~0").replace('/', "~1"))
}

fn index(path: &str, i: usize) -> String {
    format!("{path}/{i}")
}

fn fail(kind: &'static str, path: &str, schema_path: &'static str) -> Violation {
    Violation { kind, path: path.to_string(), schema_path }
}

fn is_configuration(v: &Violation) -> bool {
    v.kind == "InvalidPattern"
}
"#;

/// Render `program` as a Rust module.
pub fn emit(program: &Program, name: &str, hash: &str) -> String {
    let mut emitter = Emitter::default();
    for (id, block) in program.blocks().iter().enumerate() {
        emitter.block(program, id, block);
    }
    let mut out = format!("//! Generated validator for `{name}`.\n//!\n//! Structural hash: {hash}\n\n");
    out.push_str(PRELUDE);
    out.push_str(
        "\n/// Validate `data`, stopping at the first violation.\npub fn validate(data: &Value) -> Result<(), Violation> {\n",
    );
    if program.blocks().is_empty() {
        out.push_str("    Ok(())\n}\n");
    } else {
        out.push_str("    block_0(data, \"\").map(|_| ())\n}\n");
    }
    out.push_str(&emitter.statics);
    out.push_str(&emitter.body);
    out
}

#[derive(Default)]
struct Emitter {
    body: String,
    statics: String,
    next_static: usize,
}

fn lit(s: &str) -> String {
    format!("{s:?}")
}

fn float(f: f64) -> String {
    let text = format!("{f:?}");
    if text.contains('.') || text.contains('e') {
        format!("{text}_f64")
    } else {
        format!("{text}.0_f64")
    }
}

fn invoke(id: BlockId, value: &str, at: &str) -> String {
    format!("block_{id}({value}, {at})")
}

fn type_test(ty: PrimitiveType) -> &'static str {
    match ty {
        PrimitiveType::Null => "v.is_null()",
        PrimitiveType::Boolean => "v.is_boolean()",
        PrimitiveType::String => "v.is_string()",
        PrimitiveType::Array => "v.is_array()",
        PrimitiveType::Object => "v.is_object()",
        PrimitiveType::Number => "v.is_number()",
        PrimitiveType::Integer => {
            "matches!(v, Value::Number(n) if oasv_core::schema::is_integral(n))"
        }
    }
}

fn type_condition(types: &TypeSet) -> String {
    let tests: Vec<&str> = types.members().iter().map(|t| type_test(*t)).collect();
    if tests.is_empty() {
        "true".to_string()
    } else {
        tests.join(" || ")
    }
}

impl Emitter {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.body.push_str("    ");
        }
        self.body.push_str(text);
        self.body.push('\n');
    }

    fn fail(&mut self, depth: usize, kind: ErrorKind, at: &str, schema_path: &str) {
        self.line(
            depth,
            &format!(
                "return Err(fail({}, {at}, {}));",
                lit(kind.as_str()),
                lit(schema_path)
            ),
        );
    }

    fn value_static(&mut self, value: &Value) -> String {
        let id = self.next_static;
        self.next_static += 1;
        self.statics.push_str(&format!(
            "\nfn const_{id}() -> &'static Value {{\n    static VALUE: OnceLock<Value> = OnceLock::new();\n    VALUE.get_or_init(|| serde_json::from_str({}).unwrap_or(Value::Null))\n}}\n",
            lit(&value.to_string())
        ));
        format!("const_{id}()")
    }

    fn values_static(&mut self, values: &[Value]) -> String {
        let id = self.next_static;
        self.next_static += 1;
        let text = Value::Array(values.to_vec()).to_string();
        self.statics.push_str(&format!(
            "\nfn values_{id}() -> &'static [Value] {{\n    static VALUES: OnceLock<Vec<Value>> = OnceLock::new();\n    VALUES.get_or_init(|| serde_json::from_str({}).unwrap_or_default())\n}}\n",
            lit(&text)
        ));
        format!("values_{id}()")
    }

    fn regex_static(&mut self, pattern: &Pattern) -> String {
        let id = self.next_static;
        self.next_static += 1;
        self.statics.push_str(&format!(
            "\nfn re_{id}() -> Option<&'static Regex> {{\n    static RE: OnceLock<Option<Regex>> = OnceLock::new();\n    RE.get_or_init(|| Regex::new({}).ok()).as_ref()\n}}\n",
            lit(&pattern.source)
        ));
        format!("re_{id}()")
    }

    fn selector_static(&mut self, selector: &Selector) -> String {
        let id = self.next_static;
        self.next_static += 1;
        let mut f = format!(
            "\nfn select_{id}(v: &Value) -> Option<usize> {{\n    let tag = v.get({})?.as_str()?;\n    let target = match tag {{\n",
            lit(&selector.discriminator.property_name)
        );
        for (tag, _) in &selector.discriminator.mapping {
            f.push_str(&format!(
                "        {} => {}.to_string(),\n",
                lit(tag),
                lit(&selector.discriminator.target_for(tag))
            ));
        }
        f.push_str(&format!(
            "        other => format!(\"{{}}{{other}}\", {}),\n    }};\n",
            lit(oasv_core::COMPONENT_SCHEMA_PREFIX)
        ));
        f.push_str("    match target.as_str() {\n");
        for (i, reference) in selector.branch_refs.iter().enumerate() {
            if let Some(reference) = reference {
                f.push_str(&format!("        {} => Some({i}),\n", lit(reference)));
            }
        }
        f.push_str("        _ => None,\n    }\n}\n");
        self.statics.push_str(&f);
        format!("select_{id}")
    }

    fn block(&mut self, program: &Program, id: BlockId, block: &Block) {
        self.line(0, "");
        self.line(0, &format!("// {}", block.path));
        self.line(
            0,
            &format!("fn block_{id}(v: &Value, path: &str) -> Result<Seen, Violation> {{"),
        );
        self.line(1, "let mut seen = Seen::default();");
        if block.nullable {
            self.line(1, "if v.is_null() {");
            self.line(2, "return Ok(seen);");
            self.line(1, "}");
        }
        for step in &block.steps {
            let schema_path = format!("{}/{}", block.path, step.keyword());
            self.line(1, "{");
            self.step(program, step, &schema_path);
            self.line(1, "}");
        }
        self.line(1, "Ok(seen)");
        self.line(0, "}");
    }

    fn never(program: &Program, id: BlockId) -> bool {
        program.blocks().get(id).is_some_and(|b| b.never)
    }

    fn rule_member(
        &mut self,
        depth: usize,
        rule: &Rule,
        denied: ErrorKind,
        schema_path: &str,
    ) {
        match rule {
            Rule::Allow => {}
            Rule::Deny => self.fail(depth, denied, "&member(path, key)", schema_path),
            Rule::Check(id) => {
                let call = invoke(*id, "m", "&member(path, key)");
                self.line(depth, &format!("{call}?;"));
            }
        }
    }

    fn step(&mut self, program: &Program, step: &Step, sp: &str) {
        match step {
            Step::Type(types) => {
                self.line(2, &format!("if !({}) {{", type_condition(types)));
                self.fail(3, ErrorKind::TypeMismatch, "path", sp);
                self.line(2, "}");
            }
            Step::Const(value) => {
                let c = self.value_static(value);
                self.line(2, &format!("if !checks::json_equal(v, {c}) {{"));
                self.fail(3, ErrorKind::Const, "path", sp);
                self.line(2, "}");
            }
            Step::Enum(values) => {
                let c = self.values_static(values);
                self.line(2, &format!("if !{c}.iter().any(|c| checks::json_equal(v, c)) {{"));
                self.fail(3, ErrorKind::Enum, "path", sp);
                self.line(2, "}");
            }
            Step::Format(format) => {
                self.line(2, &format!("if !check_builtin({}, v) {{", lit(format)));
                self.fail(3, ErrorKind::InvalidFormat, "path", sp);
                self.line(2, "}");
            }
            Step::MinLength(n) | Step::MaxLength(n) => {
                let (op, kind) = match step {
                    Step::MinLength(_) => ("<", ErrorKind::MinLength),
                    _ => (">", ErrorKind::MaxLength),
                };
                self.line(
                    2,
                    &format!("if v.as_str().is_some_and(|s| checks::char_length(s) {op} {n}) {{"),
                );
                self.fail(3, kind, "path", sp);
                self.line(2, "}");
            }
            Step::Pattern(pattern) => {
                let re = self.regex_static(pattern);
                self.line(2, "if let Some(s) = v.as_str() {");
                self.line(3, &format!("let Some(re) = {re} else {{"));
                self.fail(4, ErrorKind::InvalidPattern, "path", sp);
                self.line(3, "};");
                self.line(3, "if !re.is_match(s) {");
                self.fail(4, ErrorKind::PatternMismatch, "path", sp);
                self.line(3, "}");
                self.line(2, "}");
            }
            Step::Minimum { limit, exclusive } => {
                let (op, kind) = if *exclusive {
                    ("<=", ErrorKind::ExclusiveMinimum)
                } else {
                    ("<", ErrorKind::Minimum)
                };
                self.numeric(op, *limit, kind, sp);
            }
            Step::Maximum { limit, exclusive } => {
                let (op, kind) = if *exclusive {
                    (">=", ErrorKind::ExclusiveMaximum)
                } else {
                    (">", ErrorKind::Maximum)
                };
                self.numeric(op, *limit, kind, sp);
            }
            Step::ExclusiveMinimum(limit) => {
                self.numeric("<=", *limit, ErrorKind::ExclusiveMinimum, sp)
            }
            Step::ExclusiveMaximum(limit) => {
                self.numeric(">=", *limit, ErrorKind::ExclusiveMaximum, sp)
            }
            Step::MultipleOf(divisor) => {
                self.line(2, "if let Value::Number(n) = v {");
                self.line(3, &format!("if !checks::is_multiple_of(n, {}) {{", float(*divisor)));
                self.fail(4, ErrorKind::MultipleOf, "path", sp);
                self.line(3, "}");
                self.line(2, "}");
            }
            Step::MinItems(n) | Step::MaxItems(n) => {
                let (op, kind) = match step {
                    Step::MinItems(_) => ("<", ErrorKind::MinItems),
                    _ => (">", ErrorKind::MaxItems),
                };
                self.line(2, &format!("if v.as_array().is_some_and(|a| (a.len() as u64) {op} {n}) {{"));
                self.fail(3, kind, "path", sp);
                self.line(2, "}");
            }
            Step::UniqueItems => {
                self.line(2, "if v.as_array().and_then(|a| checks::find_duplicate(a)).is_some() {");
                self.fail(3, ErrorKind::UniqueItems, "path", sp);
                self.line(2, "}");
            }
            Step::PrefixItems(blocks) => {
                self.line(2, "if let Some(arr) = v.as_array() {");
                for (i, id) in blocks.iter().enumerate() {
                    self.line(3, &format!("if let Some(item) = arr.get({i}) {{"));
                    if Self::never(program, *id) {
                        self.fail(4, ErrorKind::ItemsMismatch, &format!("&index(path, {i})"), sp);
                    } else {
                        let call = invoke(*id, "item", &format!("&index(path, {i})"));
                        self.line(4, &format!("{call}?;"));
                        self.line(4, &format!("seen.items.insert({i});"));
                    }
                    self.line(3, "}");
                }
                self.line(2, "}");
            }
            Step::Items { start, block } => {
                self.line(2, "if let Some(arr) = v.as_array() {");
                if Self::never(program, *block) {
                    self.line(3, &format!("if arr.len() > {start} {{"));
                    self.fail(4, ErrorKind::ItemsMismatch, &format!("&index(path, {start})"), sp);
                    self.line(3, "}");
                } else {
                    self.line(3, &format!("for (i, item) in arr.iter().enumerate().skip({start}) {{"));
                    let call = invoke(*block, "item", "&index(path, i)");
                    self.line(4, &format!("{call}?;"));
                    self.line(3, "}");
                }
                self.line(3, "seen.all = true;");
                self.line(2, "}");
            }
            Step::Contains { block, min, max } => {
                self.line(2, "if let Some(arr) = v.as_array() {");
                self.line(3, "let mut matched = Vec::new();");
                self.line(3, "for (i, item) in arr.iter().enumerate() {");
                let call = invoke(*block, "item", "&index(path, i)");
                self.line(4, &format!("match {call} {{"));
                self.line(5, "Ok(_) => matched.push(i),");
                self.line(5, "Err(e) if is_configuration(&e) => return Err(e),");
                self.line(5, "Err(_) => {}");
                self.line(4, "}");
                self.line(3, "}");
                self.line(3, "let count = matched.len() as u64;");
                let mut cond = format!("count < {min}");
                if let Some(max) = max {
                    cond.push_str(&format!(" || count > {max}"));
                }
                self.line(3, &format!("if {cond} {{"));
                self.fail(4, ErrorKind::ContainsMatch, "path", sp);
                self.line(3, "}");
                self.line(3, "seen.items.extend(matched);");
                self.line(2, "}");
            }
            Step::MinProperties(n) | Step::MaxProperties(n) => {
                let (op, kind) = match step {
                    Step::MinProperties(_) => ("<", ErrorKind::MinProperties),
                    _ => (">", ErrorKind::MaxProperties),
                };
                self.line(2, &format!("if v.as_object().is_some_and(|m| (m.len() as u64) {op} {n}) {{"));
                self.fail(3, kind, "path", sp);
                self.line(2, "}");
            }
            Step::Required(names) => {
                self.line(2, "if let Some(map) = v.as_object() {");
                for name in names {
                    self.line(3, &format!("if !map.contains_key({}) {{", lit(name)));
                    self.fail(4, ErrorKind::Required, "path", sp);
                    self.line(3, "}");
                }
                self.line(2, "}");
            }
            Step::DependentRequired(rules) => {
                self.line(2, "if let Some(map) = v.as_object() {");
                for (trigger, names) in rules {
                    self.line(3, &format!("if map.contains_key({}) {{", lit(trigger)));
                    for name in names {
                        self.line(4, &format!("if !map.contains_key({}) {{", lit(name)));
                        self.fail(5, ErrorKind::DependentRequired, "path", sp);
                        self.line(4, "}");
                    }
                    self.line(3, "}");
                }
                self.line(2, "}");
            }
            Step::Properties(props) => {
                self.line(2, "if let Some(map) = v.as_object() {");
                for (name, id) in props {
                    self.line(3, &format!("if let Some(m) = map.get({}) {{", lit(name)));
                    let call = invoke(*id, "m", &format!("&member(path, {})", lit(name)));
                    self.line(4, &format!("{call}?;"));
                    self.line(4, &format!("seen.props.insert({}.to_string());", lit(name)));
                    self.line(3, "}");
                }
                self.line(2, "}");
            }
            Step::PatternProperties(patterns) => {
                self.line(2, "if let Some(map) = v.as_object() {");
                for (pattern, id) in patterns {
                    let re = self.regex_static(pattern);
                    self.line(3, &format!("let Some(re) = {re} else {{"));
                    self.fail(4, ErrorKind::InvalidPattern, "path", sp);
                    self.line(3, "};");
                    self.line(3, "for (key, m) in map.iter().filter(|(k, _)| re.is_match(k)) {");
                    let call = invoke(*id, "m", "&member(path, key)");
                    self.line(4, &format!("{call}?;"));
                    self.line(4, "seen.props.insert(key.clone());");
                    self.line(3, "}");
                }
                self.line(2, "}");
            }
            Step::PropertyNames(id) => {
                self.line(2, "if let Some(map) = v.as_object() {");
                self.line(3, "for key in map.keys() {");
                let call = invoke(*id, "&Value::String(key.clone())", "path");
                self.line(4, &format!("match {call} {{"));
                self.line(5, "Ok(_) => {}");
                self.line(5, "Err(e) if is_configuration(&e) => return Err(e),");
                self.line(
                    5,
                    &format!(
                        "Err(_) => return Err(fail({}, path, {})),",
                        lit(ErrorKind::PropertyName.as_str()),
                        lit(sp)
                    ),
                );
                self.line(4, "}");
                self.line(3, "}");
                self.line(2, "}");
            }
            Step::AdditionalProperties {
                declared,
                patterns,
                rule,
            } => {
                self.line(2, "if let Some(map) = v.as_object() {");
                self.line(3, "for (key, m) in map {");
                if !declared.is_empty() {
                    let names: Vec<String> = declared.iter().map(|d| lit(d)).collect();
                    self.line(4, &format!("if matches!(key.as_str(), {}) {{", names.join(" | ")));
                    self.line(5, "continue;");
                    self.line(4, "}");
                }
                for pattern in patterns {
                    let re = self.regex_static(pattern);
                    self.line(4, &format!("let Some(re) = {re} else {{"));
                    self.fail(5, ErrorKind::InvalidPattern, "path", sp);
                    self.line(4, "};");
                    self.line(4, "if re.is_match(key) {");
                    self.line(5, "continue;");
                    self.line(4, "}");
                }
                self.rule_member(4, rule, ErrorKind::AdditionalProperty, sp);
                self.line(4, "seen.props.insert(key.clone());");
                self.line(3, "}");
                self.line(2, "}");
            }
            Step::Discriminator(selector) => {
                let select = self.selector_static(selector);
                let property = lit(&selector.discriminator.property_name);
                self.line(2, "if let Some(map) = v.as_object() {");
                self.line(3, &format!("if !map.get({property}).is_some_and(Value::is_string) {{"));
                self.fail(4, ErrorKind::Discriminator, "path", sp);
                self.line(3, "}");
                if !selector.branch_refs.is_empty() {
                    self.line(3, &format!("if {select}(v).is_none() {{"));
                    self.fail(4, ErrorKind::Discriminator, "path", sp);
                    self.line(3, "}");
                }
                self.line(2, "}");
            }
            Step::AllOf(branches) => {
                for id in branches {
                    let call = invoke(*id, "v", "path");
                    self.line(2, &format!("seen.merge({call}?);"));
                }
            }
            Step::AnyOf { branches, selector } | Step::OneOf { branches, selector } => {
                let one = matches!(step, Step::OneOf { .. });
                // A selected branch ends this step only; later steps still run.
                if let Some(selector) = selector {
                    let select = self.selector_static(selector);
                    self.line(2, "'step: {");
                    self.line(2, &format!("let selected = {select}(v);"));
                    for (i, id) in branches.iter().enumerate() {
                        self.line(2, &format!("if selected == Some({i}) {{"));
                        let call = invoke(*id, "v", "path");
                        self.line(3, &format!("seen.merge({call}?);"));
                        self.line(3, "break 'step;");
                        self.line(2, "}");
                    }
                }
                self.line(2, "let mut passing: Vec<Seen> = Vec::new();");
                for id in branches {
                    if !one {
                        self.line(2, "if passing.is_empty() {");
                    } else {
                        self.line(2, "{");
                    }
                    let call = invoke(*id, "v", "path");
                    self.line(3, &format!("match {call} {{"));
                    self.line(4, "Ok(claims) => passing.push(claims),");
                    self.line(4, "Err(e) if is_configuration(&e) => return Err(e),");
                    self.line(4, "Err(_) => {}");
                    self.line(3, "}");
                    self.line(2, "}");
                }
                let (cond, kind) = if one {
                    ("passing.len() != 1", ErrorKind::OneOf)
                } else {
                    ("passing.is_empty()", ErrorKind::AnyOf)
                };
                self.line(2, &format!("if {cond} {{"));
                self.fail(3, kind, "path", sp);
                self.line(2, "}");
                self.line(2, "for claims in passing {");
                self.line(3, "seen.merge(claims);");
                self.line(2, "}");
                if selector.is_some() {
                    self.line(2, "}");
                }
            }
            Step::Not(id) => {
                let call = invoke(*id, "v", "path");
                self.line(2, &format!("match {call} {{"));
                self.line(
                    3,
                    &format!(
                        "Ok(_) => return Err(fail({}, path, {})),",
                        lit(ErrorKind::Not.as_str()),
                        lit(sp)
                    ),
                );
                self.line(3, "Err(e) if is_configuration(&e) => return Err(e),");
                self.line(3, "Err(_) => {}");
                self.line(2, "}");
            }
            Step::If {
                condition,
                then,
                otherwise,
            } => {
                let call = invoke(*condition, "v", "path");
                self.line(2, &format!("match {call} {{"));
                self.line(3, "Ok(claims) => {");
                self.line(4, "seen.merge(claims);");
                if let Some(id) = then {
                    let call = invoke(*id, "v", "path");
                    self.line(4, &format!("seen.merge({call}?);"));
                }
                self.line(3, "}");
                self.line(3, "Err(e) if is_configuration(&e) => return Err(e),");
                self.line(3, "Err(_) => {");
                if let Some(id) = otherwise {
                    let call = invoke(*id, "v", "path");
                    self.line(4, &format!("seen.merge({call}?);"));
                }
                self.line(3, "}");
                self.line(2, "}");
            }
            Step::DependentSchemas(rules) => {
                self.line(2, "if let Some(map) = v.as_object() {");
                for (trigger, id) in rules {
                    self.line(3, &format!("if map.contains_key({}) {{", lit(trigger)));
                    let call = invoke(*id, "v", "path");
                    self.line(4, &format!("seen.merge({call}?);"));
                    self.line(3, "}");
                }
                self.line(2, "}");
            }
            Step::UnevaluatedProperties(rule) => {
                self.line(2, "if let Some(map) = v.as_object() {");
                self.line(3, "let leftover: Vec<(&String, &Value)> =");
                self.line(4, "map.iter().filter(|(k, _)| !seen.props.contains(k.as_str())).collect();");
                self.line(3, "for (key, m) in leftover {");
                self.rule_member(4, rule, ErrorKind::UnevaluatedProperty, sp);
                self.line(4, "seen.props.insert(key.clone());");
                self.line(3, "}");
                self.line(2, "}");
            }
            Step::UnevaluatedItems(rule) => {
                self.line(2, "if let Some(arr) = v.as_array() {");
                self.line(3, "for (i, item) in arr.iter().enumerate() {");
                self.line(4, "if seen.has_item(i) {");
                self.line(5, "continue;");
                self.line(4, "}");
                match rule {
                    Rule::Allow => {}
                    Rule::Deny => self.fail(4, ErrorKind::UnevaluatedItem, "&index(path, i)", sp),
                    Rule::Check(id) => {
                        let call = invoke(*id, "item", "&index(path, i)");
                        self.line(4, &format!("{call}?;"));
                    }
                }
                self.line(4, "seen.items.insert(i);");
                self.line(3, "}");
                self.line(2, "}");
            }
        }
    }

    fn numeric(&mut self, op: &str, limit: f64, kind: ErrorKind, sp: &str) {
        self.line(
            2,
            &format!("if v.as_f64().is_some_and(|x| x {op} {}) {{", float(limit)),
        );
        self.fail(3, kind, "path", sp);
        self.line(2, "}");
    }
}
