//! Declaration scope walking: enumerating the members a method reference may denote.

use std::cell::Cell;
use std::collections::{HashSet, VecDeque};

use nova_types::{
    canonicalize_named, instantiate_as_supertype, ClassDef, ClassId, ClassKind, ClassType,
    Substitution, Type, TypeEnv, Visibility, WildcardBound,
};
use tokio_util::sync::CancellationToken;

use super::candidates::{MemberRef, MethodRefCandidate};
use super::error::Cancelled;

/// Returned by a [`CandidateSink`] to continue or abort the walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    Stop,
}

/// Receives the candidates a [`DeclarationWalker`] finds, in walk order.
pub trait CandidateSink {
    fn visit(&mut self, candidate: MethodRefCandidate) -> WalkControl;
}

impl<F> CandidateSink for F
where
    F: FnMut(MethodRefCandidate) -> WalkControl,
{
    fn visit(&mut self, candidate: MethodRefCandidate) -> WalkControl {
        self(candidate)
    }
}

/// Events that change how the remaining declarations are reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkEvent {
    /// The reference sits in a static context: non-static members found from now on are
    /// reported with `static_scope_correct = false`.
    StartStatic,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkState {
    static_only: bool,
}

impl WalkState {
    pub fn handle_event(&mut self, event: WalkEvent) {
        match event {
            WalkEvent::StartStatic => self.static_only = true,
        }
    }

    pub fn is_static_only(&self) -> bool {
        self.static_only
    }
}

/// Which members to report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberFilter<'a> {
    /// Required member name; constructors are named after their class. `None` matches all.
    pub name: Option<&'a str>,
    /// Report constructors instead of methods.
    pub constructors: bool,
}

impl<'a> MemberFilter<'a> {
    pub fn methods(name: &'a str) -> Self {
        Self {
            name: Some(name),
            constructors: false,
        }
    }

    pub fn constructors(class_name: &'a str) -> Self {
        Self {
            name: Some(class_name),
            constructors: true,
        }
    }

    pub fn all_methods() -> Self {
        Self {
            name: None,
            constructors: false,
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.name.map_or(true, |expected| expected == name)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct WalkRequest<'a> {
    /// The class to search (members of its supertypes are included).
    pub class: ClassId,
    /// Type arguments of `class`.
    pub substitution: &'a Substitution,
    pub filter: MemberFilter<'a>,
    /// The class the reference appears in; `None` if unknown.
    pub place: Option<ClassId>,
    /// The qualifying class for protected access checks. `None` disables access restriction.
    pub access_class: Option<ClassId>,
}

/// Cooperative cancellation, polled once per visited declaration.
pub struct Checkpoint<'a> {
    token: &'a CancellationToken,
    every: u32,
    visited: Cell<u32>,
}

impl<'a> Checkpoint<'a> {
    pub fn new(token: &'a CancellationToken, every: u32) -> Self {
        Self {
            token,
            every: every.max(1),
            visited: Cell::new(0),
        }
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        let visited = self.visited.get();
        self.visited.set(visited.wrapping_add(1));
        if visited % self.every == 0 && self.token.is_cancelled() {
            return Err(Cancelled);
        }
        Ok(())
    }
}

/// Enumerates the members of a class hierarchy.
pub trait DeclarationWalker: Send + Sync {
    fn walk(
        &self,
        env: &dyn TypeEnv,
        request: &WalkRequest<'_>,
        state: &mut WalkState,
        sink: &mut dyn CandidateSink,
        checkpoint: &Checkpoint<'_>,
    ) -> Result<(), Cancelled>;
}

/// Walks a class, then its superclass chain and superinterfaces breadth-first, applying type
/// argument substitution along the way.
///
/// Constructors are never inherited; a class without explicit constructors reports its implicit
/// default constructor. Methods overridden by an already reported method are skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClassMemberWalker;

impl DeclarationWalker for ClassMemberWalker {
    fn walk(
        &self,
        env: &dyn TypeEnv,
        request: &WalkRequest<'_>,
        state: &mut WalkState,
        sink: &mut dyn CandidateSink,
        checkpoint: &Checkpoint<'_>,
    ) -> Result<(), Cancelled> {
        let Some(def) = env.class(request.class) else {
            return Ok(());
        };
        if request.filter.constructors {
            walk_constructors(env, request, def, state, sink, checkpoint)
        } else {
            walk_methods(env, request, state, sink, checkpoint)
        }
    }
}

fn walk_constructors(
    env: &dyn TypeEnv,
    request: &WalkRequest<'_>,
    def: &ClassDef,
    state: &WalkState,
    sink: &mut dyn CandidateSink,
    checkpoint: &Checkpoint<'_>,
) -> Result<(), Cancelled> {
    if !request.filter.matches(def.simple_name()) {
        return Ok(());
    }

    let static_scope_correct = !(state.is_static_only() && def.requires_outer_instance());

    for (index, ctor) in def.constructors.iter().enumerate() {
        checkpoint.check()?;
        let candidate = MethodRefCandidate {
            member: MemberRef::Constructor {
                class: request.class,
                index,
            },
            substitution: request.substitution.clone(),
            is_static: false,
            is_accessible: is_accessible(env, request, request.class, ctor.visibility, false),
            is_varargs: ctor.is_varargs,
            static_scope_correct,
        };
        if sink.visit(candidate) == WalkControl::Stop {
            return Ok(());
        }
    }

    if def.constructors.is_empty() && def.kind == ClassKind::Class && !def.is_abstract {
        checkpoint.check()?;
        sink.visit(MethodRefCandidate {
            member: MemberRef::ImplicitConstructor {
                class: request.class,
            },
            substitution: request.substitution.clone(),
            is_static: false,
            is_accessible: true,
            is_varargs: false,
            static_scope_correct,
        });
    }
    Ok(())
}

fn walk_methods(
    env: &dyn TypeEnv,
    request: &WalkRequest<'_>,
    state: &WalkState,
    sink: &mut dyn CandidateSink,
    checkpoint: &Checkpoint<'_>,
) -> Result<(), Cancelled> {
    let mut queue: VecDeque<(ClassId, Substitution)> = VecDeque::new();
    let mut seen_classes: HashSet<ClassId> = HashSet::new();
    // (name, erased parameter types) of every method reported so far.
    let mut seen_signatures: HashSet<(String, Vec<Type>)> = HashSet::new();
    queue.push_back((request.class, request.substitution.clone()));

    while let Some((class, subst)) = queue.pop_front() {
        if !seen_classes.insert(class) {
            continue;
        }
        let Some(def) = env.class(class) else {
            continue;
        };

        for (index, method) in def.methods.iter().enumerate() {
            checkpoint.check()?;
            if !request.filter.matches(&method.name) {
                continue;
            }

            let erased: Vec<Type> = method
                .params
                .iter()
                .map(|param| erase(env, &subst.apply(param), 0))
                .collect();
            if !seen_signatures.insert((method.name.clone(), erased)) {
                continue;
            }

            let candidate = MethodRefCandidate {
                member: MemberRef::Method { class, index },
                substitution: subst.clone(),
                is_static: method.is_static,
                is_accessible: is_accessible(
                    env,
                    request,
                    class,
                    method.visibility,
                    method.is_static,
                ),
                is_varargs: method.is_varargs,
                static_scope_correct: !state.is_static_only() || method.is_static,
            };
            if sink.visit(candidate) == WalkControl::Stop {
                return Ok(());
            }
        }

        let raw = subst.is_raw_for(&def.type_params);
        let supertypes = def.super_class.iter().chain(&def.interfaces);
        for super_ty in supertypes {
            let super_ty = canonicalize_named(env, &subst.apply(super_ty));
            let Type::Class(ClassType { def: super_id, args }) = super_ty else {
                continue;
            };
            let super_subst = match env.class(super_id) {
                Some(super_def) if !raw => Substitution::for_class(super_def, &args),
                _ => Substitution::new(),
            };
            queue.push_back((super_id, super_subst));
        }
        if def.kind == ClassKind::Interface {
            queue.push_back((env.well_known().object, Substitution::new()));
        }
    }

    Ok(())
}

/// Type erasure (JLS 4.6), used to detect overriding.
fn erase(env: &dyn TypeEnv, ty: &Type, depth: u32) -> Type {
    const MAX_DEPTH: u32 = 16;
    let object = || Type::class(env.well_known().object, vec![]);
    if depth > MAX_DEPTH {
        return object();
    }
    match canonicalize_named(env, ty) {
        Type::Class(ClassType { def, .. }) => Type::class(def, vec![]),
        Type::Array(elem) => Type::array(erase(env, &elem, depth + 1)),
        Type::TypeVar(id) => env
            .type_param(id)
            .and_then(|tp| tp.upper_bounds.first())
            .map(|bound| erase(env, bound, depth + 1))
            .unwrap_or_else(object),
        Type::Wildcard(WildcardBound::Extends(bound)) => erase(env, &bound, depth + 1),
        Type::Wildcard(_) => object(),
        Type::Intersection(parts) => parts
            .first()
            .map(|first| erase(env, first, depth + 1))
            .unwrap_or_else(object),
        other => other,
    }
}

fn is_accessible(
    env: &dyn TypeEnv,
    request: &WalkRequest<'_>,
    declaring: ClassId,
    visibility: Visibility,
    is_static: bool,
) -> bool {
    let (Some(place), Some(access_class)) = (request.place, request.access_class) else {
        return true;
    };

    match visibility {
        Visibility::Public => true,
        Visibility::Private => top_level(env, place) == top_level(env, declaring),
        Visibility::Package => same_package(env, place, declaring),
        Visibility::Protected => {
            if same_package(env, place, declaring) {
                return true;
            }
            // JLS 6.6.2: from a subclass body, and for instance members only through a qualifier
            // of that subclass.
            outer_chain(env, place).any(|class| {
                inherits(env, class, declaring) && (is_static || inherits(env, access_class, class))
            })
        }
    }
}

fn outer_chain(env: &dyn TypeEnv, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
    std::iter::successors(Some(class), move |id| env.class(*id).and_then(|def| def.outer))
        .take(64)
}

fn top_level(env: &dyn TypeEnv, class: ClassId) -> ClassId {
    outer_chain(env, class).last().unwrap_or(class)
}

fn same_package(env: &dyn TypeEnv, a: ClassId, b: ClassId) -> bool {
    match (env.class(a), env.class(b)) {
        (Some(a), Some(b)) => a.package() == b.package(),
        _ => false,
    }
}

fn inherits(env: &dyn TypeEnv, sub: ClassId, sup: ClassId) -> bool {
    sub == sup || instantiate_as_supertype(env, &Type::class(sub, vec![]), sup).is_some()
}
