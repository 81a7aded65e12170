//! Schist monomorphization core.
//!
//! A whole-program `Program -> Program` transformation that lowers the typed
//! IR of an ML-style source language to a shape a C-like backend can emit:
//! every type constructor, function and global ends up with zero type
//! parameters, anonymous tuples become named records, and structural
//! equality operators become calls to generated, type-specialized
//! predicates, all in an order compatible with forward declarations.
//!
//! Three passes run in sequence: function/global monomorphization (which
//! creates the concrete type applications), data-type monomorphization
//! (which resolves them), and equality generation (which dispatches on the
//! resulting monomorphic type map).

use std::collections::HashSet;

pub mod datatypes;
pub mod equalities;
pub mod errors;
pub mod functions;
pub mod ir;
pub mod subst;

pub use errors::{MonoError, Warning};
pub use ir::{Decl, Expr, File, Lid, Program, Type};

/// Build configuration the core reads.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Files marked for exclusion; specializations generated inside them
    /// raise [`Warning::DropDeclaration`].
    pub drop_files: HashSet<String>,
}

/// Runs the three passes and collects their warnings.
pub struct Monomorphizer {
    config: Config,
    warnings: Vec<Warning>,
}

impl Monomorphizer {
    pub fn new(config: Config) -> Self {
        Monomorphizer {
            config,
            warnings: Vec::new(),
        }
    }

    /// Transform `program` into its fully monomorphic form. On error, no
    /// partial output is returned.
    pub fn run(&mut self, program: Program) -> Result<Program, MonoError> {
        let (program, warnings) = functions::FunctionMonomorphizer::new(&self.config).run(program)?;
        self.warnings.extend(warnings);
        let (program, warnings) = datatypes::DataTypeMonomorphizer::new().run(program)?;
        self.warnings.extend(warnings);
        equalities::EqualityGenerator::new().run(program)
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Convenience entry point with the default configuration.
pub fn monomorphize(program: Program) -> Result<Program, MonoError> {
    Monomorphizer::new(Config::default()).run(program)
}
