//! Per-module processing and the full build
//!
//! Each module goes through the same steps:
//!
//! ```text
//! source text → expand constants → expand macros → validate → [strip comments]
//! ```
//!
//! A build runs every module through the pipeline, optionally dumps the
//! expanded text next to the output, and writes the C++ file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use macro_core::{strip_comments, Definitions, Expander, Validator};
use tracing::{debug, info};

use crate::config::Js2cConfig;
use crate::emit::CppEmitter;
use crate::sources::{module_id, read_module, SourceSet};

/// One module after expansion, ready to embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedModule {
    pub id: String,
    pub text: String,
}

/// Expansion, validation and optional comment stripping for modules
pub struct Pipeline<'d> {
    expander: Expander<'d>,
    validator: Validator,
    strip_comments: bool,
}

impl<'d> Pipeline<'d> {
    pub fn new(definitions: &'d Definitions, config: &Js2cConfig) -> Result<Self> {
        Ok(Self {
            expander: Expander::new(definitions).with_substitution(config.param_substitution),
            validator: config.validator()?,
            strip_comments: config.strip_comments,
        })
    }

    /// Run one module's text through the pipeline; `file` names it in errors
    pub fn process(&self, text: &str, file: &str) -> macro_core::Result<String> {
        let expanded = self.expander.expand(text)?;
        self.validator.validate(&expanded, file)?;

        let output = if self.strip_comments {
            strip_comments(&expanded)
        } else {
            expanded
        };

        debug!("{}: {} bytes -> {} bytes", file, text.len(), output.len());
        Ok(output)
    }

    /// Read and process one module file
    pub fn process_file(&self, path: &Path) -> Result<ExpandedModule> {
        let id = module_id(path)?;
        let source = read_module(path)?;
        let text = self
            .process(&source, &path.display().to_string())
            .with_context(|| format!("Failed to process module: {}", path.display()))?;
        Ok(ExpandedModule { id, text })
    }
}

/// What `build` should do
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub output: PathBuf,
    pub sources: Vec<PathBuf>,
    /// Overrides picking the definitions file out of `sources`
    pub macros: Option<PathBuf>,
    /// Also write each expanded module to `js/` next to the output
    pub debug: bool,
}

/// Result of a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub modules: Vec<String>,
    pub bytes: usize,
    pub debug_dir: Option<PathBuf>,
}

/// Expand every module and write the C++ source file
pub fn build(options: &BuildOptions, config: &Js2cConfig) -> Result<BuildReport> {
    let set = SourceSet::partition(
        &options.sources,
        &config.macros_file_name,
        options.macros.as_deref(),
    );
    let definitions = set.definitions()?;
    let pipeline = Pipeline::new(&definitions, config)?;

    let modules = set
        .modules
        .iter()
        .map(|path| pipeline.process_file(path))
        .collect::<Result<Vec<_>>>()?;

    let debug_dir = if options.debug {
        let dir = debug_dir_for(&options.output);
        write_debug_modules(&dir, &modules)?;
        Some(dir)
    } else {
        None
    };

    let emitter = CppEmitter::new(&config.namespace, &config.array_name);
    let rendered = emitter.render(&modules)?;
    std::fs::write(&options.output, &rendered)
        .with_context(|| format!("Failed to write output: {}", options.output.display()))?;

    let bytes = modules.iter().map(|m| m.text.len()).sum();
    info!(
        "Wrote {} module(s), {} bytes of source, to {}",
        modules.len(),
        bytes,
        options.output.display()
    );

    Ok(BuildReport {
        modules: modules.into_iter().map(|m| m.id).collect(),
        bytes,
        debug_dir,
    })
}

/// `js/` beside the output file
pub fn debug_dir_for(output: &Path) -> PathBuf {
    output
        .parent()
        .map(|parent| parent.join("js"))
        .unwrap_or_else(|| PathBuf::from("js"))
}

/// Write each expanded module under `dir`, creating it if needed
pub fn write_debug_modules(dir: &Path, modules: &[ExpandedModule]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create debug directory: {}", dir.display()))?;

    for module in modules {
        let path = dir.join(&module.id);
        std::fs::write(&path, &module.text)
            .with_context(|| format!("Failed to write debug module: {}", path.display()))?;
    }

    debug!("Dumped {} expanded module(s) to {}", modules.len(), dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use macro_core::{parse_definitions_source, MacroError, ParamSubstitution};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_process_expands_then_validates() {
        let definitions =
            parse_definitions_source("const kLimit = 8;\nmacro IS_NULL(x) = (x === null);")
                .unwrap();
        let pipeline = Pipeline::new(&definitions, &Js2cConfig::default()).unwrap();

        let out = pipeline
            .process("if (IS_NULL(v)) return kLimit;", "a.js")
            .unwrap();
        assert_eq!(out, "if ((v === null)) return 8;");
    }

    #[test]
    fn test_validation_sees_expanded_text() {
        let definitions = parse_definitions_source("macro RUN(code) = eval(code);").unwrap();
        let pipeline = Pipeline::new(&definitions, &Js2cConfig::default()).unwrap();

        let err = pipeline.process("RUN('1')", "run.js").unwrap_err();
        assert_eq!(
            err,
            MacroError::Validation {
                file: "run.js".to_string(),
                message: "Eval disallowed in natives".to_string(),
            }
        );
    }

    #[test]
    fn test_strip_comments_and_token_mode() {
        let definitions = parse_definitions_source("macro GET(a) = data.a;").unwrap();
        let config = Js2cConfig {
            strip_comments: true,
            param_substitution: ParamSubstitution::Token,
            ..Js2cConfig::default()
        };
        let pipeline = Pipeline::new(&definitions, &config).unwrap();

        let out = pipeline.process("// getter\nx = GET(k);   \n", "a.js").unwrap();
        assert_eq!(out, "\nx = data.k;\n");
    }

    #[test]
    fn test_debug_dir_is_beside_output() {
        assert_eq!(
            debug_dir_for(Path::new("out/gen/natives.cc")),
            PathBuf::from("out/gen/js")
        );
    }
}
