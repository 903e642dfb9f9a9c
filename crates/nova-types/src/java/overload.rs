use crate::{is_assignable, is_subtype, Type, TypeEnv};

/// The phase of overload resolution a candidate set was found applicable in (JLS 15.12.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApplicabilityLevel {
    /// Strict/loose invocation without variable-arity expansion.
    FixedArity,
    /// Variable-arity invocation: trailing `T...` parameters are expanded to `T`.
    Varargs,
}

/// The parts of a method or constructor signature the most-specific check looks at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverloadCandidate {
    pub params: Vec<Type>,
    pub is_varargs: bool,
    pub is_abstract: bool,
}

impl OverloadCandidate {
    fn param_at(&self, idx: usize, level: ApplicabilityLevel) -> Option<&Type> {
        let last = self.params.len().checked_sub(1)?;
        if level == ApplicabilityLevel::Varargs && self.is_varargs && idx >= last {
            let vararg = &self.params[last];
            return Some(vararg.array_component().unwrap_or(vararg));
        }
        self.params.get(idx)
    }

    fn arity_at(&self, level: ApplicabilityLevel) -> usize {
        match level {
            ApplicabilityLevel::Varargs if self.is_varargs => self.params.len().saturating_sub(1),
            _ => self.params.len(),
        }
    }
}

/// Pick the single most specific candidate (JLS 15.12.2.5).
///
/// Returns `None` when no candidate is strictly more specific than all others. If several
/// candidates have equivalent signatures, a unique non-abstract one is preferred (an
/// implementation beats the interface declaration it overrides).
pub fn most_specific(
    env: &dyn TypeEnv,
    candidates: &[OverloadCandidate],
    level: ApplicabilityLevel,
) -> Option<usize> {
    match candidates.len() {
        0 => return None,
        1 => return Some(0),
        _ => {}
    }

    let maximal: Vec<usize> = (0..candidates.len())
        .filter(|&i| {
            (0..candidates.len())
                .filter(|&j| j != i)
                .all(|j| is_more_specific(env, &candidates[i], &candidates[j], level))
        })
        .collect();

    match maximal.as_slice() {
        [] => None,
        [only] => Some(*only),
        several => {
            let mut concrete = several
                .iter()
                .copied()
                .filter(|&i| !candidates[i].is_abstract);
            match (concrete.next(), concrete.next()) {
                (Some(only), None) => Some(only),
                _ => None,
            }
        }
    }
}

fn is_more_specific(
    env: &dyn TypeEnv,
    m1: &OverloadCandidate,
    m2: &OverloadCandidate,
    level: ApplicabilityLevel,
) -> bool {
    let len = match level {
        ApplicabilityLevel::FixedArity => {
            if m1.params.len() != m2.params.len() {
                return false;
            }
            m1.params.len()
        }
        ApplicabilityLevel::Varargs => {
            let len = m1.params.len().max(m2.params.len());
            // A fixed-arity candidate cannot stand in for more arguments than it declares.
            if len > m1.arity_at(level) && !m1.is_varargs
                || len > m2.arity_at(level) && !m2.is_varargs
            {
                return false;
            }
            len
        }
    };

    (0..len).all(|idx| match (m1.param_at(idx, level), m2.param_at(idx, level)) {
        (Some(s), Some(t)) => is_param_more_specific(env, s, t),
        _ => false,
    })
}

fn is_param_more_specific(env: &dyn TypeEnv, s: &Type, t: &Type) -> bool {
    if s.is_errorish() || t.is_errorish() {
        return true;
    }
    if s.is_primitive() && t.is_primitive() {
        // Primitive widening is subtyping among primitives (JLS 4.10.1).
        return is_assignable(env, t, s);
    }
    is_subtype(env, s, t)
}
