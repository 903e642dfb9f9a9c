use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::{
    canonicalize_named, is_subtype, ClassId, ClassKind, ClassType, PrimitiveType, Substitution,
    Type, TypeEnv, TypeVarId,
};

/// Return `ty` viewed as `target` by walking the supertype graph and applying type argument
/// substitution along the way.
///
/// This is a best-effort helper used for IDE-style type recovery. It never panics: missing class
/// metadata simply returns `None`.
///
/// Example: `ArrayList<String>` instantiated as `List` returns `List<String>`.
pub fn instantiate_as_supertype(env: &dyn TypeEnv, ty: &Type, target: ClassId) -> Option<Type> {
    fn inner(
        env: &dyn TypeEnv,
        ty: &Type,
        target: ClassId,
        seen_type_vars: &mut HashSet<TypeVarId>,
    ) -> Option<Type> {
        match ty {
            Type::Array(_) => {
                let wk = env.well_known();
                if target == wk.object || target == wk.cloneable || target == wk.serializable {
                    return Some(Type::class(target, vec![]));
                }
                return None;
            }
            Type::Intersection(parts) => {
                // If several parts can be viewed as `target` they must agree; otherwise the
                // instantiation is ambiguous and we refuse to pick one.
                let mut out: Option<Type> = None;
                for part in parts {
                    let Some(found) = inner(env, part, target, seen_type_vars) else {
                        continue;
                    };
                    out = match out {
                        None => Some(found),
                        Some(existing) => Some(merge_instantiated_supertypes(env, existing, found)?),
                    };
                }
                return out;
            }
            Type::TypeVar(id) => {
                if !seen_type_vars.insert(*id) {
                    return None;
                }

                let mut out: Option<Type> = None;
                if let Some(tp) = env.type_param(*id) {
                    for bound in &tp.upper_bounds {
                        let Some(found) = inner(env, bound, target, seen_type_vars) else {
                            continue;
                        };
                        out = match out {
                            None => Some(found),
                            Some(existing) => {
                                match merge_instantiated_supertypes(env, existing, found) {
                                    Some(merged) => Some(merged),
                                    None => {
                                        // Ensure recursion guard is cleared before returning.
                                        seen_type_vars.remove(id);
                                        return None;
                                    }
                                }
                            }
                        };
                    }
                }

                seen_type_vars.remove(id);
                return out;
            }
            _ => {}
        }

        let Type::Class(ClassType { def, args }) = canonicalize_named(env, ty) else {
            return None;
        };

        let mut queue: VecDeque<Type> = VecDeque::new();
        let mut seen: HashSet<(ClassId, Vec<Type>)> = HashSet::new();
        queue.push_back(Type::class(def, args));

        while let Some(current) = queue.pop_front() {
            let Type::Class(ClassType { def, args }) = current.clone() else {
                continue;
            };
            if !seen.insert((def, args.clone())) {
                continue;
            }

            if def == target {
                return Some(current);
            }

            let Some(class_def) = env.class(def) else {
                continue;
            };

            // A raw instantiation (`List` rather than `List<String>`) has raw supertypes.
            let raw = args.is_empty() && !class_def.type_params.is_empty();
            let subst = Substitution::for_class(class_def, &args);
            let view = |ty: &Type| -> Option<Type> {
                let ty = canonicalize_named(env, &subst.apply(ty));
                match ty {
                    Type::Class(ClassType { def, .. }) if raw => Some(Type::class(def, vec![])),
                    Type::Class(_) => Some(ty),
                    _ => None,
                }
            };

            if let Some(sc) = class_def.super_class.as_ref().and_then(view) {
                queue.push_back(sc);
            }
            for iface in class_def.interfaces.iter().filter_map(view) {
                queue.push_back(iface);
            }

            // In Java, every interface implicitly has `Object` as a supertype (JLS 4.10.2).
            if class_def.kind == ClassKind::Interface {
                queue.push_back(Type::class(env.well_known().object, vec![]));
            }
        }

        None
    }

    let mut seen_type_vars = HashSet::new();
    inner(env, ty, target, &mut seen_type_vars)
}

fn merge_instantiated_supertypes(env: &dyn TypeEnv, a: Type, b: Type) -> Option<Type> {
    if a == b {
        return Some(a);
    }

    let a_score = placeholder_score(&a);
    let b_score = placeholder_score(&b);
    if a_score != b_score {
        return Some(if a_score < b_score { a } else { b });
    }

    match (is_subtype(env, &a, &b), is_subtype(env, &b, &a)) {
        (true, _) => Some(a),
        (false, true) => Some(b),
        (false, false) => None,
    }
}

fn placeholder_score(ty: &Type) -> usize {
    match ty {
        Type::Unknown | Type::Error => 1,
        Type::Array(elem) => placeholder_score(elem),
        Type::Class(ClassType { args, .. }) => args.iter().map(placeholder_score).sum(),
        Type::Wildcard(crate::WildcardBound::Extends(upper))
        | Type::Wildcard(crate::WildcardBound::Super(upper)) => placeholder_score(upper),
        Type::Intersection(parts) => parts.iter().map(placeholder_score).sum(),
        _ => 0,
    }
}

/// The signature of a functional interface's single abstract method, with the interface's type
/// arguments applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamSignature {
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
}

/// Best-effort extraction of a functional interface's single-abstract-method (SAM) signature.
///
/// Applies type argument substitution so `Function<String, Integer>` yields `(String) -> Integer`.
/// Returns `None` if `ty` is not (obviously) a functional interface.
pub fn sam_signature(env: &dyn TypeEnv, ty: &Type) -> Option<SamSignature> {
    fn inner(
        env: &dyn TypeEnv,
        ty: &Type,
        seen_type_vars: &mut HashSet<TypeVarId>,
    ) -> Option<SamSignature> {
        match ty {
            Type::TypeVar(id) => {
                if !seen_type_vars.insert(*id) {
                    return None;
                }
                let sig = env.type_param(*id).and_then(|tp| {
                    let mut sig: Option<SamSignature> = None;
                    for bound in &tp.upper_bounds {
                        let Some(bound_sig) = inner(env, bound, seen_type_vars) else {
                            continue;
                        };
                        match &sig {
                            None => sig = Some(bound_sig),
                            Some(existing) if *existing == bound_sig => {}
                            Some(_) => return None,
                        }
                    }
                    sig
                });
                seen_type_vars.remove(id);
                return sig;
            }
            Type::Intersection(parts) => {
                // An intersection is functional if all functional components share the same SAM.
                let mut sig: Option<SamSignature> = None;
                for part in parts {
                    let Some(part_sig) = inner(env, part, seen_type_vars) else {
                        continue;
                    };
                    match &sig {
                        None => sig = Some(part_sig),
                        Some(existing) if *existing == part_sig => {}
                        Some(_) => return None,
                    }
                }
                return sig;
            }
            _ => {}
        }

        let Type::Class(ClassType { def, args }) = canonicalize_named(env, ty) else {
            return None;
        };

        let root_def = env.class(def)?;
        if root_def.kind != ClassKind::Interface {
            return None;
        }

        // Walk the interface inheritance graph, collecting abstract instance methods and applying
        // type argument substitution along the way.
        let mut queue: VecDeque<Type> = VecDeque::new();
        let mut seen: HashSet<(ClassId, Vec<Type>)> = HashSet::new();
        queue.push_back(Type::class(def, args));

        // (name, parameter types) -> return type. Sorted so the result is order independent.
        let mut candidates: BTreeMap<(String, Vec<Type>), Type> = BTreeMap::new();

        while let Some(current) = queue.pop_front() {
            let Type::Class(ClassType { def, args }) = current else {
                continue;
            };
            if !seen.insert((def, args.clone())) {
                continue;
            }

            let Some(class_def) = env.class(def) else {
                continue;
            };
            if class_def.kind != ClassKind::Interface {
                continue;
            }

            // Raw or malformed instantiations leave type variables unsubstituted.
            let subst = Substitution::for_class(class_def, &args);

            for m in &class_def.methods {
                if m.is_static || !m.is_abstract {
                    continue;
                }

                let params: Vec<Type> = m
                    .params
                    .iter()
                    .map(|p| canonicalize_named(env, &subst.apply(p)))
                    .collect();
                let return_type = canonicalize_named(env, &subst.apply(&m.return_type));

                if is_object_method(env, &m.name, &params, &return_type) {
                    continue;
                }

                let key = (m.name.clone(), params);
                match candidates.get(&key) {
                    Some(existing) => {
                        let merged = merge_return_types(env, existing.clone(), return_type)?;
                        candidates.insert(key, merged);
                    }
                    None => {
                        candidates.insert(key, return_type);
                    }
                }
            }

            for iface in &class_def.interfaces {
                let iface = canonicalize_named(env, &subst.apply(iface));
                if matches!(iface, Type::Class(_)) {
                    queue.push_back(iface);
                }
            }
        }

        if candidates.len() != 1 {
            return None;
        }
        let ((name, params), return_type) = candidates.into_iter().next()?;
        Some(SamSignature {
            name,
            params,
            return_type,
        })
    }

    let mut seen_type_vars = HashSet::new();
    inner(env, ty, &mut seen_type_vars)
}

fn merge_return_types(env: &dyn TypeEnv, a: Type, b: Type) -> Option<Type> {
    if a == b {
        return Some(a);
    }

    // Prefer non-errorish types when possible.
    if a.is_errorish() {
        return Some(b);
    }
    if b.is_errorish() {
        return Some(a);
    }

    // Return-type-substitutable overrides: keep the more specific return type.
    match (is_subtype(env, &a, &b), is_subtype(env, &b, &a)) {
        (true, _) => Some(a),
        (false, true) => Some(b),
        (false, false) => None,
    }
}

fn is_object_method(env: &dyn TypeEnv, name: &str, params: &[Type], return_type: &Type) -> bool {
    match name {
        "equals" => {
            if params.len() != 1 {
                return false;
            }
            let object = Type::class(env.well_known().object, vec![]);
            params[0] == object && *return_type == Type::Primitive(PrimitiveType::Boolean)
        }
        "hashCode" => params.is_empty() && *return_type == Type::Primitive(PrimitiveType::Int),
        "toString" => {
            if !params.is_empty() {
                return false;
            }
            let string = Type::class(env.well_known().string, vec![]);
            *return_type == string
        }
        _ => false,
    }
}
