//! Name resolution for Java method references.
//!
//! The resolver works on a [`nova_types::TypeEnv`] and receives the surrounding expected type
//! from an [`ExpectedTypeProvider`]; parsing and full type checking live elsewhere.

pub mod method_ref;

pub use method_ref::{
    Cancelled, ExpectedTypeProvider, MemberRef, MethodRefCandidate, MethodRefConfig,
    MethodRefError, MethodRefResolution, MethodRefResolver, MethodRefSite, Qualifier, RefName,
    RenameError, ResolveCx, ResolvedMethodRef, SiteId,
};
