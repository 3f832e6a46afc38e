//! Compiles components of the store fixture and writes the emitted validators
//! to `$OUT_DIR/generated.rs`, one module per unit plus a dispatch function.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use oasv_core::{OpenApiDocument, SchemaNode, COMPONENT_SCHEMA_PREFIX};
use oasv_schema::compile_with_ref_resolution;

/// (module, component) pairs compiled into the crate.
const UNITS: &[(&str, &str)] = &[
    ("account", "Account"),
    ("order", "Order"),
    ("pet", "Pet"),
    ("guarded_pet", "GuardedPet"),
    ("tagged", "Tagged"),
];

fn main() -> Result<()> {
    let manifest = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let fixture = manifest.join("../oasv-schema/tests/fixtures/store.yaml");
    println!("cargo:rerun-if-changed={}", fixture.display());
    println!("cargo:rerun-if-changed=build.rs");

    let text = std::fs::read_to_string(&fixture)
        .with_context(|| format!("failed to read {}", fixture.display()))?;
    let document = OpenApiDocument::from_yaml_str(&text).context("failed to parse store fixture")?;

    let mut out = String::new();
    let mut arms = String::new();
    for (module, component) in UNITS {
        let root = SchemaNode::reference(format!("{COMPONENT_SCHEMA_PREFIX}{component}"));
        let unit = compile_with_ref_resolution(&root, component, &document)
            .with_context(|| format!("failed to compile {component}"))?;
        writeln!(out, "pub mod {module} {{\n{}\n}}\n", unit.source())?;
        writeln!(
            arms,
            "        {component:?} => Some({module}::validate(data).map_err(|v| (v.kind, v.path))),"
        )?;
    }

    let names: Vec<String> = UNITS.iter().map(|(_, c)| format!("{c:?}")).collect();
    writeln!(out, "/// Components with an emitted validator.")?;
    writeln!(out, "pub const COMPONENTS: &[&str] = &[{}];\n", names.join(", "))?;
    writeln!(out, "/// Run the emitted validator for `component`: `None` when none was emitted,")?;
    writeln!(out, "/// otherwise the first violation's kind and data path.")?;
    writeln!(
        out,
        "pub fn validate(component: &str, data: &serde_json::Value) -> Option<Result<(), (&'static str, String)>> {{"
    )?;
    writeln!(out, "    match component {{")?;
    out.push_str(&arms);
    writeln!(out, "        _ => None,\n    }}\n}}")?;

    let target = PathBuf::from(std::env::var("OUT_DIR")?).join("generated.rs");
    std::fs::write(&target, out).with_context(|| format!("failed to write {}", target.display()))?;
    Ok(())
}
