use nova_types::{sam_signature, SamSignature, Type, TypeEnv};

/// The functional interface a method reference is converted to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionalTarget {
    pub interface: Type,
    /// The interface's abstract method with the interface's type arguments applied.
    pub signature: SamSignature,
}

impl FunctionalTarget {
    /// `None` when `interface` is not a functional interface; such a type imposes no constraint.
    pub fn from_type(env: &dyn TypeEnv, interface: Type) -> Option<Self> {
        let signature = sam_signature(env, &interface)?;
        Some(Self {
            interface,
            signature,
        })
    }

    pub fn params(&self) -> &[Type] {
        &self.signature.params
    }

    pub fn return_type(&self) -> &Type {
        &self.signature.return_type
    }

    pub fn arity(&self) -> usize {
        self.signature.params.len()
    }
}
