//! # oasv-generated: Emitted Validators
//!
//! The build script compiles components of the store fixture with
//! `compile_with_ref_resolution` and includes the emitted source here, one
//! module per component. Each module exposes
//! `validate(&Value) -> Result<(), Violation>`; [`validate`] dispatches by
//! component name.
//!
//! ## Crate Policy
//!
//! - Not published. It exists so emitted source is built by rustc and run
//!   against the interpreter in `tests/`.
//! - Nothing here is written by hand except this file and `build.rs`.

include!(concat!(env!("OUT_DIR"), "/generated.rs"));
