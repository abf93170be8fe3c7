//! Strategy configuration — loading and validation of rule declarations.
//!
//! The configuration file is a JSON document naming, for each strategy,
//! a rule class from the factory registry, an optional display alias, an
//! active flag, and a numeric parameter bag. Three shapes are accepted:
//! a single declaration object, an array of declarations, or an object
//! wrapping the array under a `selectors` key.
//!
//! All validation is front-loaded: unknown rule classes, bad parameters,
//! an empty declaration list, or a list with no active strategy are
//! fatal before any scan work begins.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::select::{create_selector, FactoryError, Params, Selector};

/// One strategy declaration as written in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyDecl {
    /// Rule-class identifier resolved by the selector factory.
    pub class: String,

    /// Display alias; defaults to the class name.
    #[serde(default)]
    pub alias: Option<String>,

    /// Inactive declarations are parsed but skipped.
    #[serde(default = "default_true")]
    pub activate: bool,

    /// Numeric parameter bag handed to the factory.
    #[serde(default)]
    pub params: Params,
}

fn default_true() -> bool {
    true
}

impl StrategyDecl {
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.class)
    }
}

// The original config format grew organically; keep accepting all three
// shapes rather than breaking existing files.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    Wrapped { selectors: Vec<StrategyDecl> },
    Many(Vec<StrategyDecl>),
    One(StrategyDecl),
}

impl ConfigFile {
    fn into_decls(self) -> Vec<StrategyDecl> {
        match self {
            ConfigFile::Wrapped { selectors } => selectors,
            ConfigFile::Many(decls) => decls,
            ConfigFile::One(decl) => vec![decl],
        }
    }
}

/// A validated, instantiated strategy ready for the scan.
#[derive(Debug)]
pub struct ActiveStrategy {
    pub alias: String,
    pub selector: Box<dyn Selector>,
}

/// Configuration errors. All fatal: the process reports and exits before
/// any scan work.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config file declares no strategies")]
    Empty,

    #[error("config file declares no active strategies")]
    NoneActive,

    #[error("strategy '{alias}': {source}")]
    Selector {
        alias: String,
        #[source]
        source: FactoryError,
    },

    #[error("duplicate strategy alias '{0}'")]
    DuplicateAlias(String),

    #[error("strategy alias '{0}' contains '+', which is reserved as the multi-match join delimiter")]
    AliasContainsDelimiter(String),
}

/// Parse declarations from a JSON string.
pub fn parse_strategies(json: &str) -> Result<Vec<StrategyDecl>, serde_json::Error> {
    serde_json::from_str::<ConfigFile>(json).map(ConfigFile::into_decls)
}

/// Load, validate, and instantiate the active strategies from a file.
pub fn load_strategies(path: &Path) -> Result<Vec<ActiveStrategy>, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let decls = parse_strategies(&json).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    build_strategies(decls)
}

/// Validate declarations and instantiate each active selector.
pub fn build_strategies(decls: Vec<StrategyDecl>) -> Result<Vec<ActiveStrategy>, ConfigError> {
    if decls.is_empty() {
        return Err(ConfigError::Empty);
    }

    let mut active = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for decl in decls.iter().filter(|d| d.activate) {
        let alias = decl.alias().to_string();
        // '+' joins aliases in the denormalized match label; allowing it
        // inside an alias would make that label ambiguous.
        if alias.contains('+') {
            return Err(ConfigError::AliasContainsDelimiter(alias));
        }
        if !seen.insert(alias.clone()) {
            return Err(ConfigError::DuplicateAlias(alias));
        }
        let selector =
            create_selector(&decl.class, &decl.params).map_err(|source| ConfigError::Selector {
                alias: alias.clone(),
                source,
            })?;
        active.push(ActiveStrategy { alias, selector });
    }

    if active.is_empty() {
        return Err(ConfigError::NoneActive);
    }
    Ok(active)
}
