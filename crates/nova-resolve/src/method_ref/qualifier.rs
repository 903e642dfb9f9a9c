use nova_types::{resolve_class_in_type, ClassId, Substitution, Type, TypeEnv};

use super::site::Qualifier;

/// The class a method reference searches, as determined from its qualifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Qualified {
    pub class: ClassId,
    /// Type arguments of `class` (empty for raw or non-generic qualifiers).
    pub substitution: Substitution,
    /// Set only when a bare name that was parsed as an expression turned out to name a type.
    pub begins_with_reference_type: bool,
    /// The qualifier is an array-typed expression; members resolve against `Object`.
    pub array_qualifier: bool,
    /// The qualifier denotes a type rather than a value, so an unbound receiver is possible.
    pub denotes_type: bool,
}

/// Classify the qualifier of a method reference.
///
/// Returns `None` when the qualifier does not resolve to a class.
pub fn classify(env: &dyn TypeEnv, qualifier: &Qualifier) -> Option<Qualified> {
    match qualifier {
        Qualifier::Expr { ty } => classify_value(env, ty),
        Qualifier::Name { ty, as_type, .. } => {
            if let Some(qualified) = classify_value(env, ty) {
                return Some(qualified);
            }
            let resolved = resolve_class_in_type(env, as_type.as_ref()?)?;
            Some(Qualified {
                class: resolved.class,
                substitution: resolved.substitution,
                begins_with_reference_type: true,
                array_qualifier: false,
                denotes_type: true,
            })
        }
        Qualifier::Type(ty) => {
            let resolved = resolve_class_in_type(env, ty)?;
            Some(Qualified {
                class: resolved.class,
                substitution: resolved.substitution,
                begins_with_reference_type: false,
                array_qualifier: false,
                denotes_type: true,
            })
        }
    }
}

fn classify_value(env: &dyn TypeEnv, ty: &Type) -> Option<Qualified> {
    if matches!(ty, Type::Array(_)) {
        return Some(Qualified {
            class: env.well_known().object,
            substitution: Substitution::new(),
            begins_with_reference_type: false,
            array_qualifier: true,
            denotes_type: false,
        });
    }

    let resolved = resolve_class_in_type(env, ty)?;
    Some(Qualified {
        class: resolved.class,
        substitution: resolved.substitution,
        begins_with_reference_type: false,
        array_qualifier: false,
        denotes_type: false,
    })
}
