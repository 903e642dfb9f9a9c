//! Method-reference-specific applicability and the conflict resolution between candidates.
//!
//! Every candidate is tested in two ways. The *direct* reading passes the functional interface's
//! parameters straight to the candidate (`Integer::parseInt` as `Function<String, Integer>`). The
//! *receiver* reading, only possible when the qualifier names a type, treats the first parameter
//! as the receiver of an instance method (`String::length` as `Function<String, Integer>`).

use nova_types::{
    eliminate_wildcards, infer_type_arguments, is_assignable, most_specific, ApplicabilityLevel,
    ClassId, OverloadCandidate, Substitution, Type, TypeEnv, TypeVarId,
};

use super::candidates::{is_receiver_type, MethodRefCandidate};
use super::target::FunctionalTarget;

/// Picks the most specific of several applicable candidates.
pub trait MostSpecific: Send + Sync {
    /// Index of the single most specific candidate, or `None` if there is no unique winner.
    fn pick(
        &self,
        env: &dyn TypeEnv,
        candidates: &[OverloadCandidate],
        level: ApplicabilityLevel,
    ) -> Option<usize>;
}

/// [`MostSpecific`] following JLS 15.12.2.5.
#[derive(Clone, Copy, Debug, Default)]
pub struct JavaMostSpecific;

impl MostSpecific for JavaMostSpecific {
    fn pick(
        &self,
        env: &dyn TypeEnv,
        candidates: &[OverloadCandidate],
        level: ApplicabilityLevel,
    ) -> Option<usize> {
        most_specific(env, candidates, level)
    }
}

/// Outcome of conflict resolution, as indices into the raw candidate list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Conflict {
    Empty,
    Unique(usize),
    /// The narrowed set, in walk order.
    Ambiguous(Vec<usize>),
}

impl Conflict {
    /// Without a functional interface target nothing can be filtered.
    pub(crate) fn unfiltered(len: usize) -> Self {
        match len {
            0 => Conflict::Empty,
            1 => Conflict::Unique(0),
            _ => Conflict::Ambiguous((0..len).collect()),
        }
    }
}

pub(crate) struct ConflictInput<'a> {
    pub owning: ClassId,
    pub owning_subst: &'a Substitution,
    pub target: &'a FunctionalTarget,
    pub begins_with_reference_type: bool,
    pub qualifier_denotes_type: bool,
}

pub(crate) fn resolve_conflicts(
    env: &dyn TypeEnv,
    input: &ConflictInput<'_>,
    candidates: &[MethodRefCandidate],
    picker: &dyn MostSpecific,
) -> Conflict {
    let Some(owning_def) = env.class(input.owning) else {
        return Conflict::Empty;
    };
    let target_params = input.target.params();
    let has_receiver = input.qualifier_denotes_type
        && !target_params.is_empty()
        && is_receiver_type(env, &target_params[0], input.owning, input.owning_subst);
    // A constructor of a top-level or static nested class needs no enclosing instance.
    let constructor_without_outer = owning_def.outer.is_none() || owning_def.is_static;

    let mut direct: Vec<usize> = Vec::new();
    let mut receiver: Vec<usize> = Vec::new();
    let mut declared_params: Vec<Vec<Type>> = Vec::with_capacity(candidates.len());

    for (idx, candidate) in candidates.iter().enumerate() {
        let Some(sig) = candidate.member.signature(env) else {
            declared_params.push(Vec::new());
            continue;
        };
        let subst = input.owning_subst.clone().put_all(&candidate.substitution);
        let params: Vec<Type> = sig.params.iter().map(|param| subst.apply(param)).collect();
        let args: Vec<Type> = target_params
            .iter()
            .map(|arg| subst.apply(&eliminate_wildcards(env, arg)))
            .collect();

        let is_constructor = candidate.member.is_constructor();
        let valid_constructor = is_constructor && constructor_without_outer;
        let static_or_valid_constructor = candidate.is_static || valid_constructor;

        // Type parameters still free in `params`: the member's own, plus the class's for
        // constructors of a raw or diamond-like instantiation.
        let mut free: Vec<TypeVarId> = sig.type_params.to_vec();
        if is_constructor {
            free.extend(
                owning_def
                    .type_params
                    .iter()
                    .copied()
                    .filter(|tp| !subst.contains(*tp)),
            );
        }

        let (p, t) = (params.len(), args.len());
        let arity_matches = t == p || (candidate.is_varargs && t + 1 >= p);
        let static_ok = !input.begins_with_reference_type
            || static_or_valid_constructor
            || (is_constructor && candidate.static_scope_correct);
        if arity_matches && static_ok {
            let params = instantiate(env, &free, &params, &args, candidate.is_varargs);
            let correct = args.iter().enumerate().all(|(i, arg)| {
                if candidate.is_varargs && p > 0 && i + 1 >= p {
                    accepts(env, &params[p - 1], arg, true)
                } else {
                    accepts(env, &params[i], arg, false)
                }
            });
            if correct {
                direct.push(idx);
            }
        }

        if has_receiver && t == p + 1 && !static_or_valid_constructor {
            let rest = &args[1..];
            let params = instantiate(env, &free, &params, rest, candidate.is_varargs);
            let correct = params.iter().zip(rest).enumerate().all(|(i, (param, arg))| {
                accepts(env, param, arg, candidate.is_varargs && i + 1 == p)
            });
            if correct {
                receiver.push(idx);
            }
        }

        declared_params.push(params);
    }

    tracing::trace!(
        direct = direct.len(),
        receiver = receiver.len(),
        raw = candidates.len(),
        "method reference buckets"
    );

    match (direct.as_slice(), receiver.as_slice()) {
        ([], []) => return Conflict::Empty,
        ([only], []) | ([], [only]) => return Conflict::Unique(*only),
        _ => {}
    }

    let narrowed: Vec<usize> = (0..candidates.len())
        .filter(|idx| direct.contains(idx) || receiver.contains(idx))
        .collect();
    let level = if narrowed.iter().any(|&idx| candidates[idx].is_varargs) {
        ApplicabilityLevel::Varargs
    } else {
        ApplicabilityLevel::FixedArity
    };
    let overloads: Vec<OverloadCandidate> = narrowed
        .iter()
        .map(|&idx| OverloadCandidate {
            params: declared_params[idx].clone(),
            is_varargs: candidates[idx].is_varargs,
            is_abstract: candidates[idx]
                .member
                .signature(env)
                .is_some_and(|sig| sig.is_abstract),
        })
        .collect();

    match picker.pick(env, &overloads, level) {
        Some(winner) if winner < narrowed.len() => Conflict::Unique(narrowed[winner]),
        _ => Conflict::Ambiguous(narrowed),
    }
}

/// Is an argument of type `arg` acceptable for `param`? With `absorb`, a variable-arity `param`
/// also accepts its component type.
fn accepts(env: &dyn TypeEnv, param: &Type, arg: &Type, absorb: bool) -> bool {
    is_assignable(env, param, arg)
        || (absorb
            && param
                .array_component()
                .is_some_and(|component| is_assignable(env, component, arg)))
}

/// Replace free type parameters in `params` by what the arguments imply.
fn instantiate(
    env: &dyn TypeEnv,
    free: &[TypeVarId],
    params: &[Type],
    args: &[Type],
    is_varargs: bool,
) -> Vec<Type> {
    if free.is_empty() || params.is_empty() {
        return params.to_vec();
    }

    let last = params.len() - 1;
    let formals: Vec<Type> = (0..args.len())
        .map(|i| {
            let expanded = is_varargs && i >= last && args.len() != params.len();
            match params.get(i.min(last)) {
                Some(param) if expanded => param.array_component().unwrap_or(param).clone(),
                Some(param) => param.clone(),
                None => Type::Unknown,
            }
        })
        .collect();

    let inferred = infer_type_arguments(env, free, &formals, args);
    params.iter().map(|param| inferred.apply(param)).collect()
}
