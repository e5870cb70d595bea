use serde::Deserialize;
use std::path::Path;

/// Knobs for the type checker, read from the `[typecheck]` table of a
/// project file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypeckOptions {
    /// Hypothesis count above which an overloading warning is issued.
    pub warn_threshold: usize,
    /// Hypothesis count above which goals are no longer checked.
    pub error_threshold: usize,
    /// Report ambiguity once per predicate rather than only when a single
    /// clause is ambiguous on its own.
    pub whole_pred_ambiguity: bool,
    /// Worker threads for module-level checking; `None` means one per
    /// available core.
    pub workers: Option<usize>,
}

impl Default for TypeckOptions {
    fn default() -> Self {
        TypeckOptions {
            warn_threshold: 50,
            error_threshold: 3000,
            whole_pred_ambiguity: true,
            workers: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    typecheck: TypeckOptions,
}

impl TypeckOptions {
    /// Read options from a TOML file.
    pub fn from_file(path: &Path) -> Result<TypeckOptions, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
    }

    /// Parse options from TOML text. Keys outside `[typecheck]` are ignored.
    pub fn from_toml_str(content: &str) -> Result<TypeckOptions, String> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))?;
        file.typecheck.validate()?;
        Ok(file.typecheck)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.error_threshold < self.warn_threshold {
            return Err(format!(
                "error_threshold ({}) must not be below warn_threshold ({})",
                self.error_threshold, self.warn_threshold
            ));
        }
        if self.workers == Some(0) {
            return Err("workers must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
