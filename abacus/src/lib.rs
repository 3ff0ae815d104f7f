//! Abacus - Extensible Expression Calculator
//!
//! Evaluates arithmetic expressions over `f64`. Builtin operators come from
//! `abacus-std`; further operators and functions are loaded from native
//! extension modules found in a directory.

mod ast;
mod config;
mod eval;
mod parser;
mod token;

pub use ast::Expr;
pub use config::{CalculatorConfig, ConfigError, ENV_EXTENSION_DIR, ENV_NORMALIZE_NEGATIVE_ZERO};
pub use eval::Evaluator;
pub use parser::{parse, MAX_NESTING_DEPTH, MAX_TREE_HEIGHT};
pub use token::{tokenize, Token, SYMBOLS};

use abacus_core::{normalize_zero, CalcError, CalcResult};
use abacus_plugin::{
    ExtensionDiscovery, ExtensionInfo, ModuleLoader, OperationRegistry, ScanReport,
};
use std::path::Path;

/// Main calculator engine
///
/// Owns its registry and the extension modules registered into it. Separate
/// instances share nothing.
#[derive(Debug)]
pub struct Calculator {
    config: CalculatorConfig,
    registry: OperationRegistry,
    discovery: ExtensionDiscovery,
}

impl Calculator {
    /// Builtins only, default configuration.
    pub fn new() -> Self {
        Self::with_config(CalculatorConfig::default())
    }

    pub fn with_config(config: CalculatorConfig) -> Self {
        let mut registry = OperationRegistry::new();
        if let Err(e) = abacus_std::register_builtins(&mut registry) {
            tracing::error!(error = %e, "failed to register builtin operations");
        }
        Self {
            config,
            registry,
            discovery: ExtensionDiscovery::new(),
        }
    }

    pub fn with_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.load_extensions_from(loader);
        self
    }

    /// Load future extension modules through `loader`. Modules loaded so far
    /// are unloaded first.
    pub fn load_extensions_from(&mut self, loader: impl ModuleLoader + 'static) {
        self.discovery.shutdown(&mut self.registry);
        self.discovery = ExtensionDiscovery::with_loader(loader);
    }

    /// Scan the configured extension directory. A missing directory is not
    /// an error; there is simply nothing to load.
    pub fn initialize(&mut self) -> CalcResult<ScanReport> {
        let dir = self.config.extension_dir.clone();
        if !dir.is_dir() {
            tracing::info!(directory = %dir.display(), "extension directory not found, builtins only");
            return Ok(ScanReport::default());
        }
        self.scan(&dir)
    }

    /// Scan `directory` for extension modules not loaded yet.
    pub fn scan(&mut self, directory: &Path) -> CalcResult<ScanReport> {
        let report = self.discovery.scan(directory, &mut self.registry)?;
        tracing::info!(
            loaded = report.loaded.len(),
            shadowed = report.shadowed.len(),
            failed = report.failed.len(),
            "extension scan complete"
        );
        Ok(report)
    }

    /// Reload extension modules that changed on disk.
    pub fn refresh(&mut self) -> ScanReport {
        self.discovery.refresh(&mut self.registry)
    }

    /// Unregister and deactivate every extension module.
    pub fn shutdown(&mut self) {
        self.discovery.shutdown(&mut self.registry);
    }

    /// Evaluate `expression`.
    pub fn calculate(&self, expression: &str) -> CalcResult<f64> {
        let expr = self.parse(expression)?;
        let value = Evaluator::new().evaluate(&expr)?;
        if self.config.normalize_negative_zero {
            Ok(normalize_zero(value))
        } else {
            Ok(value)
        }
    }

    /// Tokenize and parse `expression` without evaluating it.
    pub fn parse(&self, expression: &str) -> CalcResult<Expr> {
        if expression.trim().is_empty() {
            return Err(CalcError::EmptyExpression);
        }
        let tokens = tokenize(expression, &self.registry)?;
        parse(&tokens, &self.registry)
    }

    pub fn tokenize(&self, expression: &str) -> CalcResult<Vec<Token>> {
        tokenize(expression, &self.registry)
    }

    /// Every registered operation name, sorted.
    pub fn list_operations(&self) -> Vec<String> {
        let mut names = self.registry.list_names();
        names.dedup();
        names
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.registry.exists(name)
    }

    /// Registered names resembling `name`, best first.
    pub fn suggestions(&self, name: &str) -> Vec<String> {
        self.registry.similar_names(name)
    }

    /// Loaded extension modules, including shadowed ones.
    pub fn extensions(&self) -> Vec<ExtensionInfo> {
        self.discovery.loaded()
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Calculator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
