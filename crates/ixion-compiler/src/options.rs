//! Compiler configuration.

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Constant-folding rules. Each flag gates one rule; an empty set compiles
    /// every program to equivalent, only longer, code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OptimizationFlags: u8 {
        /// Fold arithmetic and bitwise operators over constant operands.
        const CONSTANT_ARITHMETIC = 1 << 0;
        /// Fold constant operands of string concatenation into the recipe.
        const CONSTANT_STRING_CONCAT = 1 << 1;
        /// Fold unary minus over a constant operand.
        const CONSTANT_UNARY = 1 << 2;
    }
}

/// An optimization name that no flag answers to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown optimization '{0}'")]
pub struct UnknownOptimization(pub String);

impl OptimizationFlags {
    const NAMES: [(&'static str, OptimizationFlags); 3] = [
        ("constant.arithmetic", OptimizationFlags::CONSTANT_ARITHMETIC),
        ("constant.string.concat", OptimizationFlags::CONSTANT_STRING_CONCAT),
        ("constant.unary", OptimizationFlags::CONSTANT_UNARY),
    ];

    /// Parse dotted flag names. Names not listed stay disabled.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, UnknownOptimization> {
        let mut flags = OptimizationFlags::empty();
        for name in names {
            let flag = Self::NAMES
                .iter()
                .find(|(n, _)| *n == name.trim())
                .map(|(_, flag)| *flag)
                .ok_or_else(|| UnknownOptimization(name.to_string()))?;
            flags |= flag;
        }
        Ok(flags)
    }

    /// Dotted names of the enabled flags.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(_, flag)| self.contains(*flag))
            .map(|(name, _)| name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    pub optimizations: OptimizationFlags,
    /// Emit a line marker whenever the source line changes.
    pub emit_line_numbers: bool,
    /// Package prefix in internal form (`com/example`), if any.
    pub package: Option<String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            optimizations: OptimizationFlags::empty(),
            emit_line_numbers: true,
            package: None,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_optimizations(mut self, optimizations: OptimizationFlags) -> Self {
        self.optimizations = optimizations;
        self
    }

    pub fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.emit_line_numbers = enabled;
        self
    }

    /// Accepts dotted or internal form.
    pub fn with_package(mut self, package: &str) -> Self {
        let package = package.replace('.', "/");
        self.package = (!package.is_empty()).then_some(package);
        self
    }

    pub fn optimizes(&self, flag: OptimizationFlags) -> bool {
        self.optimizations.contains(flag)
    }

    /// Qualify a class name with the package.
    pub fn qualify(&self, name: &str) -> String {
        match &self.package {
            Some(package) => format!("{package}/{name}"),
            None => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_names() {
        let flags = OptimizationFlags::from_names(["constant.arithmetic", "constant.unary"]).unwrap();
        assert!(flags.contains(OptimizationFlags::CONSTANT_ARITHMETIC));
        assert!(!flags.contains(OptimizationFlags::CONSTANT_STRING_CONCAT));
        assert_eq!(flags.names().collect::<Vec<_>>(), vec!["constant.arithmetic", "constant.unary"]);
    }

    #[test]
    fn unknown_flag_is_an_error() {
        let err = OptimizationFlags::from_names(["constant.loops"]).unwrap_err();
        assert_eq!(err.to_string(), "unknown optimization 'constant.loops'");
    }

    #[test]
    fn defaults() {
        let options = CompilerOptions::default();
        assert!(options.optimizations.is_empty());
        assert!(options.emit_line_numbers);
        assert_eq!(options.qualify("mainixc"), "mainixc");
    }

    #[test]
    fn package_qualification() {
        let options = CompilerOptions::new().with_package("com.example");
        assert_eq!(options.qualify("mainixc"), "com/example/mainixc");
    }
}
