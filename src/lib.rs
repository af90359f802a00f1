//! js2c: natives macro preprocessor and C++ source embedder
//!
//! Reads a definitions file of constants and macros, expands them in each
//! JavaScript module, rejects forbidden constructs, and writes the modules
//! into a C++ file as one `char` array indexed by a `std::string` table.
//!
//! The macro language itself lives in `macro-core`; this crate adds file
//! handling, configuration and emission.

pub mod config;
pub mod emit;
pub mod pipeline;
pub mod sources;

pub use config::{ForbiddenRule, Js2cConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE};
pub use emit::{CppEmitter, EmitError};
pub use pipeline::{build, BuildOptions, BuildReport, ExpandedModule, Pipeline};
pub use sources::{module_id, read_definitions, read_module, SourceSet};
