//! Program driver.
//!
//! [`Compiler::compile_program`] runs both passes over a set of units:
//!
//! 1. Every unit is preprocessed against the host universe layered under
//!    the names of all declared classes, so signatures may mention classes
//!    of any unit.
//! 2. Pending types are inferred unit by unit, in program order.
//! 3. The [`ProgramTable`] is assembled: a registry of every declared class
//!    and unit class, and the exports of every unit. It is read-only from
//!    here on.
//! 4. Units are compiled in parallel, each with its own emission state.
//!
//! One error aborts its unit; the other units still compile and every
//! diagnostic is returned in [`ProgramOutput::errors`].

use std::slice;

use ixion_ast::CompilationUnit;
use ixion_core::{CompilationError, Span};
use ixion_registry::{HostClassDescriptor, HostRegistry, HostTypeResolver, LayeredResolver};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::debug;

use crate::bytecode::CompiledUnit;
use crate::context::CompilationEnv;
use crate::options::CompilerOptions;
use crate::passes::symbols::unit_scope;
use crate::passes::{
    CompilationPass, PreprocessPass, UnitExports, UnitSymbols, declared_classes, infer_pending, unit_class_name,
};
use crate::type_resolver::TypeResolver;

type Result<T> = std::result::Result<T, CompilationError>;

/// An error attributed to the unit it aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{unit}: {error}")]
pub struct UnitError {
    pub unit: String,
    #[source]
    pub error: CompilationError,
}

impl UnitError {
    pub fn new(unit: &str, error: CompilationError) -> Self {
        Self {
            unit: unit.to_string(),
            error,
        }
    }
}

/// Result of compiling a program.
#[derive(Debug, Default)]
pub struct ProgramOutput {
    /// Units that compiled, in input order.
    pub units: Vec<CompiledUnit>,
    /// One error per failed unit.
    pub errors: Vec<UnitError>,
}

impl ProgramOutput {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn unit(&self, name: &str) -> Option<&CompiledUnit> {
        self.units.iter().find(|u| u.name == name)
    }
}

// ============================================================================
// Program table
// ============================================================================

/// Declarations shared by every unit of a program.
pub struct ProgramTable {
    registry: HostRegistry,
    exports: FxHashMap<String, UnitExports>,
}

impl ProgramTable {
    pub fn assemble<'s>(symbols: impl IntoIterator<Item = &'s UnitSymbols>) -> Self {
        let mut registry = HostRegistry::new();
        let mut exports = FxHashMap::default();
        for unit in symbols {
            register_unit(&mut registry, unit);
            exports.insert(unit.name.clone(), unit.exports());
        }
        Self { registry, exports }
    }

    /// Declared classes and unit classes.
    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    pub fn exports(&self, unit: &str) -> Option<&UnitExports> {
        self.exports.get(unit)
    }

    /// Exports of the units `symbols` imports. Units that failed to
    /// preprocess are skipped.
    pub fn imports_of(&self, symbols: &UnitSymbols) -> Vec<&UnitExports> {
        symbols
            .imports
            .iter()
            .filter_map(|import| self.exports(&import.name))
            .collect()
    }
}

fn register_unit(registry: &mut HostRegistry, unit: &UnitSymbols) {
    registry.register(unit.unit_descriptor());
    for class in unit.classes.iter().chain(&unit.interfaces) {
        registry.register(class.descriptor());
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles units against a host universe.
pub struct Compiler<'h> {
    host: &'h dyn HostTypeResolver,
    options: CompilerOptions,
}

impl<'h> Compiler<'h> {
    pub fn new(host: &'h dyn HostTypeResolver, options: CompilerOptions) -> Self {
        Self { host, options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile a single unit, returning its first error.
    pub fn compile_unit(&self, unit: &CompilationUnit<'_>) -> Result<CompiledUnit> {
        let mut output = self.compile_program(slice::from_ref(unit));
        if let Some(error) = output.errors.pop() {
            return Err(error.error);
        }
        output
            .units
            .pop()
            .ok_or_else(|| CompilationError::internal("unit produced no output", Span::default()))
    }

    /// Compile every unit of a program.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile_program(&self, units: &[CompilationUnit<'_>]) -> ProgramOutput {
        debug!(units = units.len(), "compiling program");
        let mut errors = Vec::new();

        let mut symbols = self.preprocess(units, &mut errors);
        self.infer(units, &mut symbols, &mut errors);
        let table = ProgramTable::assemble(symbols.iter().flatten());

        let results: Vec<std::result::Result<CompiledUnit, UnitError>> = units
            .par_iter()
            .zip(symbols.par_iter())
            .filter_map(|(unit, symbols)| {
                let symbols = symbols.as_ref()?;
                Some(
                    self.compile_with(&table, unit, symbols)
                        .map_err(|error| UnitError::new(unit.name, error)),
                )
            })
            .collect();

        let mut output = ProgramOutput {
            units: Vec::with_capacity(results.len()),
            errors,
        };
        for result in results {
            match result {
                Ok(unit) => output.units.push(unit),
                Err(error) => output.errors.push(error),
            }
        }
        debug!(
            compiled = output.units.len(),
            failed = output.errors.len(),
            "compiled program"
        );
        output
    }

    /// Pass 1a over every unit. Failed units are `None`.
    fn preprocess(&self, units: &[CompilationUnit<'_>], errors: &mut Vec<UnitError>) -> Vec<Option<UnitSymbols>> {
        let unit_names: FxHashSet<String> = units.iter().map(|u| u.name.to_string()).collect();
        let shell = self.shell_registry(units);
        let resolver = LayeredResolver::new(&shell, self.host);

        units
            .iter()
            .map(|unit| match PreprocessPass::new(&resolver, &self.options, &unit_names).run(unit) {
                Ok(symbols) => Some(symbols),
                Err(error) => {
                    errors.push(UnitError::new(unit.name, error));
                    None
                }
            })
            .collect()
    }

    /// Every declared class by name and kind only, enough to resolve
    /// signatures.
    fn shell_registry(&self, units: &[CompilationUnit<'_>]) -> HostRegistry {
        let mut shell = HostRegistry::new();
        for unit in units {
            shell.register(HostClassDescriptor::class(&unit_class_name(unit.name, &self.options)));
            for declared in declared_classes(unit, &self.options) {
                shell.register(if declared.is_interface {
                    HostClassDescriptor::interface(&declared.internal_name)
                } else {
                    HostClassDescriptor::class(&declared.internal_name)
                });
            }
        }
        shell
    }

    /// Pass 1b, one unit at a time so later units see earlier inferences.
    fn infer(&self, units: &[CompilationUnit<'_>], symbols: &mut [Option<UnitSymbols>], errors: &mut Vec<UnitError>) {
        for index in 0..units.len() {
            let Some(mut current) = symbols[index].clone() else {
                continue;
            };
            let result = {
                let table = ProgramTable::assemble(symbols.iter().flatten());
                let resolver = LayeredResolver::new(table.registry(), self.host);
                let imports = table.imports_of(&current);
                infer_pending(&mut current, &units[index], &resolver, &self.options, &imports)
            };
            match result {
                Ok(()) => symbols[index] = Some(current),
                Err(error) => {
                    errors.push(UnitError::new(units[index].name, error));
                    symbols[index] = None;
                }
            }
        }
    }

    /// Pass 2 for one unit.
    fn compile_with(&self, table: &ProgramTable, unit: &CompilationUnit<'_>, symbols: &UnitSymbols) -> Result<CompiledUnit> {
        let resolver = LayeredResolver::new(table.registry(), self.host);
        let imports = table.imports_of(symbols);
        let root = unit_scope(symbols, &imports, &resolver)?;
        let env = CompilationEnv {
            resolver: &resolver,
            options: &self.options,
            types: TypeResolver::new(&resolver, symbols.aliases.clone()),
            unit_class: symbols.unit_class.clone(),
            source_file: symbols.source_file.clone(),
        };
        CompilationPass::new(&env, symbols, &root).run(unit)
    }
}
