//! Fatal errors and user-visible warnings.
//!
//! Fatal errors are internal invariant violations: the input IR (or this
//! crate) broke a contract, and the whole compilation stops with no partial
//! output. Warnings accumulate on the pass and surface through
//! [`crate::Monomorphizer::warnings`]; the offending construct is left
//! unchanged and compilation continues.

use thiserror::Error;

use crate::ir::Lid;

#[derive(Error, Debug)]
pub enum MonoError {
    #[error("internal: {lid} applied to {found} type arguments, expected {expected}")]
    ArityMismatch {
        lid: Lid,
        expected: usize,
        found: usize,
    },
    #[error("internal: polymorphic comparison operator under a type application")]
    EqualityUnderTypeApp,
    #[error("internal: equality generation reached a compiled body for {0}")]
    UnexpectedEqualityBody(Lid),
    #[error("internal: monomorphization of {0} is still pending at end of program")]
    PendingMonomorphizations(Lid),
    #[error("internal: anonymous field in {0} during equality generation")]
    AnonymousField(Lid),
}

/// A user-visible warning, tagged with the file it was raised in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    #[error("{file}: {lid} is not fully type-applied")]
    NotFullyApplied { file: String, lid: Lid },
    #[error("{file}: {lid} was generated in a file marked for exclusion and will be dropped")]
    DropDeclaration { file: String, lid: Lid },
    #[error("{file}: unrecognized head of type application: {lid}")]
    UnknownTypeHead { file: String, lid: Lid },
}
