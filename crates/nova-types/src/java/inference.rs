//! Best-effort type argument inference for generic methods and constructors.
//!
//! This is not JLS 18. The engine unifies declared types against actual types structurally,
//! boxing primitives when they meet a type variable and widening conflicting bindings to a
//! common supertype. That is enough for IDE-style recovery of method reference and call sites.

use crate::{
    box_primitive, canonicalize_named, instantiate_as_supertype, is_subtype, ClassType,
    Substitution, Type, TypeEnv, TypeVarId, WildcardBound,
};

const MAX_DEPTH: u32 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    /// `actual <: formal` (an argument flowing into a parameter).
    ActualToFormal,
    /// `formal <: actual` (a declared return type flowing into an expected type).
    FormalToActual,
}

struct Inference<'a> {
    env: &'a dyn TypeEnv,
    type_params: &'a [TypeVarId],
    /// Bindings fixed before inference started; never overwritten.
    fixed: &'a Substitution,
    out: Substitution,
}

impl<'a> Inference<'a> {
    fn new(env: &'a dyn TypeEnv, type_params: &'a [TypeVarId], fixed: &'a Substitution) -> Self {
        Self {
            env,
            type_params,
            fixed,
            out: Substitution::new(),
        }
    }

    fn is_inference_var(&self, id: TypeVarId) -> bool {
        self.type_params.contains(&id) && !self.fixed.contains(id)
    }

    fn unify(&mut self, formal: &Type, actual: &Type, direction: Direction, depth: u32) {
        if depth > MAX_DEPTH || actual.is_errorish() {
            return;
        }

        match formal {
            Type::TypeVar(id) if self.is_inference_var(*id) => self.bind(*id, actual),
            Type::Wildcard(WildcardBound::Extends(bound))
            | Type::Wildcard(WildcardBound::Super(bound)) => {
                self.unify(bound, actual, direction, depth + 1)
            }
            Type::Array(formal_elem) => {
                let Type::Array(actual_elem) = actual else {
                    return;
                };
                // `T[]` never binds `T` to a primitive (`int[]` is not `Integer[]`).
                if actual_elem.is_primitive() {
                    return;
                }
                self.unify(formal_elem, actual_elem, direction, depth + 1);
            }
            Type::Class(ClassType { def, args }) if !args.is_empty() => {
                let actual = match actual {
                    Type::Primitive(prim) => match box_primitive(self.env, *prim) {
                        Some(boxed) => boxed,
                        None => return,
                    },
                    Type::Wildcard(WildcardBound::Extends(bound))
                    | Type::Wildcard(WildcardBound::Super(bound)) => (**bound).clone(),
                    other => canonicalize_named(self.env, other),
                };

                let (formal_args, actual_args) = match direction {
                    Direction::ActualToFormal => {
                        let Some(Type::Class(ClassType { args: actual_args, .. })) =
                            instantiate_as_supertype(self.env, &actual, *def)
                        else {
                            return;
                        };
                        (args.clone(), actual_args)
                    }
                    Direction::FormalToActual => {
                        let Type::Class(ClassType {
                            def: actual_def,
                            args: actual_args,
                        }) = &actual
                        else {
                            return;
                        };
                        let Some(Type::Class(ClassType { args: formal_args, .. })) =
                            instantiate_as_supertype(self.env, formal, *actual_def)
                        else {
                            return;
                        };
                        (formal_args, actual_args.clone())
                    }
                };

                // Raw on either side: nothing to learn.
                if formal_args.len() != actual_args.len() {
                    return;
                }

                for (formal_arg, actual_arg) in formal_args.iter().zip(&actual_args) {
                    let actual_arg = match actual_arg {
                        Type::Wildcard(WildcardBound::Unbounded) => continue,
                        Type::Wildcard(WildcardBound::Extends(bound))
                        | Type::Wildcard(WildcardBound::Super(bound)) => bound.as_ref(),
                        other => other,
                    };
                    self.unify(formal_arg, actual_arg, direction, depth + 1);
                }
            }
            _ => {}
        }
    }

    fn bind(&mut self, id: TypeVarId, actual: &Type) {
        let candidate = match actual {
            Type::Null | Type::Void | Type::Wildcard(WildcardBound::Unbounded) => return,
            Type::Primitive(prim) => match box_primitive(self.env, *prim) {
                Some(boxed) => boxed,
                None => return,
            },
            other => canonicalize_named(self.env, other),
        };

        let merged = match self.out.get(id) {
            None => candidate,
            Some(existing) if *existing == candidate => return,
            Some(existing) => {
                if is_subtype(self.env, existing, &candidate) {
                    candidate
                } else if is_subtype(self.env, &candidate, existing) {
                    return;
                } else {
                    Type::class(self.env.well_known().object, vec![])
                }
            }
        };
        self.out.put(id, merged);
    }
}

/// Infer `type_params` from declared parameter types (`formals`) and the types flowing into them
/// (`actuals`).
///
/// Positions beyond the shorter of the two lists are ignored. Type parameters that cannot be
/// inferred are left unmapped.
pub fn infer_type_arguments(
    env: &dyn TypeEnv,
    type_params: &[TypeVarId],
    formals: &[Type],
    actuals: &[Type],
) -> Substitution {
    if type_params.is_empty() {
        return Substitution::new();
    }

    let fixed = Substitution::new();
    let mut inference = Inference::new(env, type_params, &fixed);
    for (formal, actual) in formals.iter().zip(actuals) {
        inference.unify(formal, actual, Direction::ActualToFormal, 0);
    }
    inference.out
}

/// Refine `subst` with bindings learned from the declared return type flowing into the
/// `expected` type.
///
/// Only type parameters that `subst` leaves unmapped are inferred; a `void` or unknown
/// expectation leaves `subst` untouched.
pub fn infer_from_return_type(
    env: &dyn TypeEnv,
    type_params: &[TypeVarId],
    declared_return: &Type,
    expected: Option<&Type>,
    subst: Substitution,
) -> Substitution {
    let Some(expected) = expected else {
        return subst;
    };
    if type_params.is_empty()
        || matches!(declared_return, Type::Void)
        || matches!(expected, Type::Void)
        || expected.is_errorish()
    {
        return subst;
    }

    let declared_return = subst.apply(declared_return);
    let learned = {
        let mut inference = Inference::new(env, type_params, &subst);
        inference.unify(&declared_return, expected, Direction::FormalToActual, 0);
        inference.out
    };
    learned.merge_under(&subst)
}
