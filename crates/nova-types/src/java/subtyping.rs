//! Subtyping and assignment compatibility (JLS 4.10, 5.2), best-effort.
//!
//! Error recovery types (`Unknown`/`Error`) are compatible with everything so a single
//! unresolved type does not cascade into spurious mismatches.

use crate::{
    instantiate_as_supertype, ClassId, ClassType, PrimitiveType, Substitution, Type, TypeEnv,
    WildcardBound,
};

/// Bound on recursion through type variable bounds and wildcard containment.
const MAX_DEPTH: u32 = 32;

/// Replace an unresolved `Named` spelling by the corresponding class type when the class is known.
pub fn canonicalize_named(env: &dyn TypeEnv, ty: &Type) -> Type {
    match ty {
        Type::Named(name) => match env.lookup_class(name) {
            Some(id) => Type::class(id, vec![]),
            None => ty.clone(),
        },
        other => other.clone(),
    }
}

/// `sub <: sup`.
pub fn is_subtype(env: &dyn TypeEnv, sub: &Type, sup: &Type) -> bool {
    is_subtype_at(env, sub, sup, 0)
}

fn is_subtype_at(env: &dyn TypeEnv, sub: &Type, sup: &Type, depth: u32) -> bool {
    if depth > MAX_DEPTH {
        return false;
    }
    if sub == sup || sub.is_errorish() || sup.is_errorish() {
        return true;
    }

    let sub = canonicalize_named(env, sub);
    let sup = canonicalize_named(env, sup);
    if sub == sup {
        return true;
    }

    match (&sub, &sup) {
        (Type::Void, _) | (_, Type::Void) => false,
        (Type::Primitive(_), _) | (_, Type::Primitive(_)) => false,
        (Type::Null, _) => sup.is_reference(),
        (_, Type::Null) => false,
        // Split the supertype first so `A & B <: B & A` holds.
        (_, Type::Intersection(parts)) => parts
            .iter()
            .all(|part| is_subtype_at(env, &sub, part, depth + 1)),
        (Type::Intersection(parts), _) => parts
            .iter()
            .any(|part| is_subtype_at(env, part, &sup, depth + 1)),
        (Type::TypeVar(id), _) => {
            if is_object(env, &sup) {
                return true;
            }
            let Some(tp) = env.type_param(*id) else {
                return false;
            };
            tp.upper_bounds
                .iter()
                .any(|bound| is_subtype_at(env, bound, &sup, depth + 1))
        }
        (_, Type::TypeVar(id)) => env
            .type_param(*id)
            .and_then(|tp| tp.lower_bound.as_ref())
            .is_some_and(|lower| is_subtype_at(env, &sub, lower, depth + 1)),
        (Type::Array(sub_elem), Type::Array(sup_elem)) => {
            match (sub_elem.as_ref(), sup_elem.as_ref()) {
                (Type::Primitive(a), Type::Primitive(b)) => a == b,
                (Type::Primitive(_), _) | (_, Type::Primitive(_)) => false,
                (a, b) => is_subtype_at(env, a, b, depth + 1),
            }
        }
        (Type::Array(_), Type::Class(ClassType { def, .. })) => {
            let wk = env.well_known();
            *def == wk.object || *def == wk.cloneable || *def == wk.serializable
        }
        (Type::Class(_), Type::Class(ClassType { def, args })) => {
            if is_object(env, &sup) {
                return true;
            }
            let Some(Type::Class(ClassType {
                args: sub_args, ..
            })) = instantiate_as_supertype(env, &sub, *def)
            else {
                return false;
            };
            // Raw types on either side are compatible through unchecked conversion.
            if args.is_empty() || sub_args.is_empty() || sub_args.len() != args.len() {
                return true;
            }
            sub_args
                .iter()
                .zip(args)
                .all(|(arg, formal)| contains(env, arg, formal, depth + 1))
        }
        (Type::Wildcard(bound), _) => match bound {
            WildcardBound::Extends(upper) => is_subtype_at(env, upper, &sup, depth + 1),
            WildcardBound::Unbounded | WildcardBound::Super(_) => is_object(env, &sup),
        },
        _ => false,
    }
}

/// Type argument containment (JLS 4.5.1): does `formal` contain `arg`?
fn contains(env: &dyn TypeEnv, arg: &Type, formal: &Type, depth: u32) -> bool {
    if arg.is_errorish() || formal.is_errorish() {
        return true;
    }
    match formal {
        Type::Wildcard(WildcardBound::Unbounded) => true,
        Type::Wildcard(WildcardBound::Extends(upper)) => {
            let arg_upper = match arg {
                Type::Wildcard(WildcardBound::Extends(b)) => b.as_ref().clone(),
                Type::Wildcard(_) => Type::class(env.well_known().object, vec![]),
                other => other.clone(),
            };
            is_subtype_at(env, &arg_upper, upper, depth)
        }
        Type::Wildcard(WildcardBound::Super(lower)) => match arg {
            Type::Wildcard(WildcardBound::Super(b)) => is_subtype_at(env, lower, b, depth),
            Type::Wildcard(_) => false,
            other => is_subtype_at(env, lower, other, depth),
        },
        _ => canonicalize_named(env, arg) == canonicalize_named(env, formal),
    }
}

fn is_object(env: &dyn TypeEnv, ty: &Type) -> bool {
    matches!(ty, Type::Class(ClassType { def, .. }) if *def == env.well_known().object)
}

/// Widening primitive conversion (JLS 5.1.2), including identity.
fn is_primitive_widening(from: PrimitiveType, to: PrimitiveType) -> bool {
    use PrimitiveType::*;
    if from == to {
        return true;
    }
    matches!(
        (from, to),
        (Byte, Short | Int | Long | Float | Double)
            | (Short, Int | Long | Float | Double)
            | (Char, Int | Long | Float | Double)
            | (Int, Long | Float | Double)
            | (Long, Float | Double)
            | (Float, Double)
    )
}

/// The wrapper class type of a primitive, if the environment knows it.
pub fn box_primitive(env: &dyn TypeEnv, prim: PrimitiveType) -> Option<Type> {
    env.lookup_class(prim.box_class_name())
        .map(|id| Type::class(id, vec![]))
}

/// The primitive a wrapper class unboxes to.
pub fn unbox_class(env: &dyn TypeEnv, ty: &Type) -> Option<PrimitiveType> {
    let Type::Class(ClassType { def, .. }) = canonicalize_named(env, ty) else {
        return None;
    };
    PrimitiveType::ALL
        .into_iter()
        .find(|prim| env.lookup_class(prim.box_class_name()) == Some(def))
}

/// Assignment compatibility of a value of type `from` to a variable of type `to`.
///
/// Covers identity, widening primitive and reference conversions, boxing followed by widening
/// reference conversion, and unboxing followed by widening primitive conversion.
pub fn is_assignable(env: &dyn TypeEnv, to: &Type, from: &Type) -> bool {
    if to.is_errorish() || from.is_errorish() {
        return true;
    }
    match (to, from) {
        (Type::Void, Type::Void) => true,
        (Type::Void, _) | (_, Type::Void) => false,
        (Type::Primitive(to), Type::Primitive(from)) => is_primitive_widening(*from, *to),
        (_, Type::Primitive(from)) => match box_primitive(env, *from) {
            Some(boxed) => is_subtype(env, &boxed, to),
            None => false,
        },
        (Type::Primitive(to), _) => match unbox_class(env, from) {
            Some(unboxed) => is_primitive_widening(unboxed, *to),
            None => false,
        },
        _ => is_subtype(env, from, to),
    }
}

/// Widen wildcards to their bounds: `List<? extends Number>` becomes `List<Number>`.
///
/// This is bound widening only; no capture variables are introduced.
pub fn eliminate_wildcards(env: &dyn TypeEnv, ty: &Type) -> Type {
    match ty {
        Type::Wildcard(bound) => wildcard_bound(env, bound),
        Type::Class(ClassType { def, args }) => Type::class(
            *def,
            args.iter()
                .map(|arg| match arg {
                    Type::Wildcard(bound) => wildcard_bound(env, bound),
                    other => other.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn wildcard_bound(env: &dyn TypeEnv, bound: &WildcardBound) -> Type {
    match bound {
        WildcardBound::Unbounded => Type::class(env.well_known().object, vec![]),
        WildcardBound::Extends(b) | WildcardBound::Super(b) => b.as_ref().clone(),
    }
}

/// A type resolved to its class together with the substitution of the class's type parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassResolution {
    pub class: ClassId,
    pub substitution: Substitution,
}

/// Resolve `ty` to a class and substitution (`List<String>` -> `List`, `{E := String}`).
///
/// Type variables resolve through their first class bound. Arrays, primitives and recovery types
/// do not resolve.
pub fn resolve_class_in_type(env: &dyn TypeEnv, ty: &Type) -> Option<ClassResolution> {
    fn inner(env: &dyn TypeEnv, ty: &Type, depth: u32) -> Option<ClassResolution> {
        if depth > MAX_DEPTH {
            return None;
        }
        match canonicalize_named(env, ty) {
            Type::Class(ClassType { def, args }) => {
                let class_def = env.class(def)?;
                Some(ClassResolution {
                    class: def,
                    substitution: Substitution::for_class(class_def, &args),
                })
            }
            Type::TypeVar(id) => env
                .type_param(id)?
                .upper_bounds
                .iter()
                .find_map(|bound| inner(env, bound, depth + 1)),
            Type::Intersection(parts) => {
                parts.iter().find_map(|part| inner(env, part, depth + 1))
            }
            _ => None,
        }
    }

    inner(env, ty, 0)
}
