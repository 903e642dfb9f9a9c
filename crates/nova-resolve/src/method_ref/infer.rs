//! Type-argument inference for the member a method reference resolved to.

use nova_types::{
    eliminate_wildcards, format_type, infer_from_return_type, infer_type_arguments,
    resolve_class_in_type, Substitution, Type, TypeEnv, TypeVarId,
};

use super::candidates::{MemberRef, MethodRefCandidate};
use super::site::SiteId;
use super::target::FunctionalTarget;

/// The member a method reference denotes, with its type arguments inferred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedMethodRef {
    pub candidate: MethodRefCandidate,
    /// Final substitution: the qualifier's type arguments plus everything inferred from the
    /// functional interface.
    pub substitution: Substitution,
    /// Declared parameter types with `substitution` applied.
    pub params: Vec<Type>,
    /// Declared return type with `substitution` applied; constructors yield their class type.
    pub return_type: Type,
}

impl ResolvedMethodRef {
    pub fn member(&self) -> MemberRef {
        self.candidate.member
    }
}

pub(crate) struct InferInput<'a> {
    pub site: SiteId,
    pub owning_subst: &'a Substitution,
    pub target: Option<&'a FunctionalTarget>,
    pub log_degenerate: bool,
}

pub(crate) fn resolve_candidate(
    env: &dyn TypeEnv,
    candidate: MethodRefCandidate,
    input: &InferInput<'_>,
) -> ResolvedMethodRef {
    let base = input.owning_subst.clone().put_all(&candidate.substitution);
    let substitution = match input.target {
        _ if matches!(candidate.member, MemberRef::ImplicitConstructor { .. }) => {
            candidate.substitution.clone()
        }
        None => Substitution::new(),
        Some(target) => infer_substitution(env, &candidate, &base, target, input),
    };

    let view = base.put_all(&substitution);
    let params: Vec<Type> = candidate
        .member
        .signature(env)
        .map(|sig| sig.params.iter().map(|param| view.apply(param)).collect())
        .unwrap_or_default();
    let return_type = candidate
        .member
        .return_type(env)
        .map(|ty| view.apply(&ty))
        .unwrap_or(Type::Unknown);

    ResolvedMethodRef {
        candidate,
        substitution,
        params,
        return_type,
    }
}

fn infer_substitution(
    env: &dyn TypeEnv,
    candidate: &MethodRefCandidate,
    base: &Substitution,
    target: &FunctionalTarget,
    input: &InferInput<'_>,
) -> Substitution {
    let member = candidate.member;
    let Some(sig) = member.signature(env) else {
        return Substitution::new();
    };
    let Some(declaring) = env.class(member.class()) else {
        return Substitution::new();
    };

    let params: Vec<Type> = if base.is_raw_for(&declaring.type_params) {
        sig.params.to_vec()
    } else {
        sig.params.iter().map(|param| base.apply(param)).collect()
    };
    let args: Vec<Type> = target
        .params()
        .iter()
        .map(|arg| eliminate_wildcards(env, arg))
        .collect();

    if params.len() != args.len() {
        // Unbound receivers and varargs absorption both land here: only the class of the
        // first type in the longer list contributes type arguments.
        let longer = if params.len() > args.len() {
            &params
        } else {
            &args
        };
        let degenerate = longer
            .first()
            .and_then(|first| resolve_class_in_type(env, first))
            .map(|resolved| resolved.substitution)
            .unwrap_or_default();
        if input.log_degenerate {
            let first = longer
                .first()
                .map(|ty| format_type(env, ty))
                .unwrap_or_default();
            tracing::warn!(
                site = ?input.site,
                params = params.len(),
                target_params = args.len(),
                %first,
                "arity mismatch; inferring from the first parameter type only"
            );
        }
        return degenerate;
    }

    let mut inferred =
        infer_type_arguments(env, sig.type_params, &params, &args).merge_under(base);
    if member.is_constructor() {
        let class_inferred = infer_type_arguments(env, &declaring.type_params, &params, &args);
        inferred = inferred.put_all(&class_inferred);
    }

    let mut return_params: Vec<TypeVarId> = sig.type_params.to_vec();
    if member.is_constructor() {
        return_params.extend(declaring.type_params.iter().copied());
    }
    let Some(declared_return) = member.return_type(env) else {
        return inferred;
    };
    let declared_return = inferred.apply(&declared_return);
    infer_from_return_type(
        env,
        &return_params,
        &declared_return,
        Some(target.return_type()),
        inferred,
    )
}
