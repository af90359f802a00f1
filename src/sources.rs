//! Input files: the definitions file and the module sources

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use macro_core::{definition_lines, parse_definitions, Definitions};
use tracing::{debug, info, warn};

/// Inputs split into the definitions file and the modules to embed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    pub macros: Option<PathBuf>,
    /// Modules in command-line order
    pub modules: Vec<PathBuf>,
}

impl SourceSet {
    /// Pick out the definitions file by name
    ///
    /// An explicit `macros` path wins over name matching; in that case every
    /// other input is a module, whatever its name.
    pub fn partition(
        sources: &[PathBuf],
        macros_file_name: &str,
        explicit_macros: Option<&Path>,
    ) -> Self {
        if let Some(macros) = explicit_macros {
            return Self {
                macros: Some(macros.to_path_buf()),
                modules: sources
                    .iter()
                    .filter(|s| s.as_path() != macros)
                    .cloned()
                    .collect(),
            };
        }

        let mut set = Self::default();
        for source in sources {
            let is_macros = source
                .file_name()
                .is_some_and(|name| name == macros_file_name);
            if !is_macros {
                set.modules.push(source.clone());
                continue;
            }
            if let Some(previous) = set.macros.replace(source.clone()) {
                warn!(
                    "Multiple definitions files given; {} replaces {}",
                    source.display(),
                    previous.display()
                );
            }
        }
        set
    }

    /// Definitions from the macros file, or empty tables when there is none
    pub fn definitions(&self) -> Result<Definitions> {
        match &self.macros {
            Some(path) => read_definitions(path),
            None => {
                debug!("No definitions file; modules are embedded unexpanded");
                Ok(Definitions::new())
            }
        }
    }
}

/// Read and parse a definitions file
pub fn read_definitions(path: &Path) -> Result<Definitions> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read definitions file: {}", path.display()))?;

    let definitions = parse_definitions(&definition_lines(&source))
        .with_context(|| format!("Failed to parse definitions file: {}", path.display()))?;

    info!(
        "Loaded {} constants and {} macros from {}",
        definitions.constants().len(),
        definitions.macros().len(),
        path.display()
    );
    Ok(definitions)
}

/// Read one module's source text
pub fn read_module(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read module: {}", path.display()))
}

/// Module id: the file name without its directory
pub fn module_id(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Module path has no usable file name: {}", path.display()))
}
