use nova_types::{
    eliminate_wildcards, instantiate_as_supertype, resolve_class_in_type, ClassId, ClassKind,
    ClassType, ConstructorDef, MethodDef, Substitution, Type, TypeEnv, TypeVarId,
};
use tokio_util::sync::CancellationToken;

use super::error::MethodRefError;
use super::qualifier::Qualified;
use super::site::{EnclosingItem, MethodRefSite, RefName};
use super::target::FunctionalTarget;
use super::walker::{
    Checkpoint, DeclarationWalker, MemberFilter, WalkControl, WalkEvent, WalkRequest, WalkState,
};

/// A method or constructor declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberRef {
    Method { class: ClassId, index: usize },
    Constructor { class: ClassId, index: usize },
    /// The default constructor of a class that declares none.
    ImplicitConstructor { class: ClassId },
}

/// Declared shape of a [`MemberRef`].
#[derive(Clone, Copy, Debug)]
pub struct MemberSignature<'e> {
    pub type_params: &'e [TypeVarId],
    pub params: &'e [Type],
    pub is_abstract: bool,
}

impl MemberRef {
    /// The declaring class.
    pub fn class(self) -> ClassId {
        match self {
            MemberRef::Method { class, .. }
            | MemberRef::Constructor { class, .. }
            | MemberRef::ImplicitConstructor { class } => class,
        }
    }

    pub fn is_constructor(self) -> bool {
        !matches!(self, MemberRef::Method { .. })
    }

    pub fn method(self, env: &dyn TypeEnv) -> Option<&MethodDef> {
        match self {
            MemberRef::Method { class, index } => env.class(class)?.methods.get(index),
            _ => None,
        }
    }

    pub fn constructor(self, env: &dyn TypeEnv) -> Option<&ConstructorDef> {
        match self {
            MemberRef::Constructor { class, index } => env.class(class)?.constructors.get(index),
            _ => None,
        }
    }

    /// Method name, or the simple class name for constructors.
    pub fn name(self, env: &dyn TypeEnv) -> Option<&str> {
        match self {
            MemberRef::Method { .. } => self.method(env).map(|m| m.name.as_str()),
            MemberRef::Constructor { class, .. } | MemberRef::ImplicitConstructor { class } => {
                env.class(class).map(|def| def.simple_name())
            }
        }
    }

    pub fn signature(self, env: &dyn TypeEnv) -> Option<MemberSignature<'_>> {
        match self {
            MemberRef::Method { .. } => {
                let method = self.method(env)?;
                Some(MemberSignature {
                    type_params: &method.type_params,
                    params: &method.params,
                    is_abstract: method.is_abstract,
                })
            }
            MemberRef::Constructor { .. } => {
                let ctor = self.constructor(env)?;
                Some(MemberSignature {
                    type_params: &ctor.type_params,
                    params: &ctor.params,
                    is_abstract: false,
                })
            }
            MemberRef::ImplicitConstructor { class } => {
                env.class(class)?;
                Some(MemberSignature {
                    type_params: &[],
                    params: &[],
                    is_abstract: false,
                })
            }
        }
    }

    /// Declared return type; constructors return their class type (`ArrayList<E>`).
    pub fn return_type(self, env: &dyn TypeEnv) -> Option<Type> {
        match self {
            MemberRef::Method { .. } => self.method(env).map(|m| m.return_type.clone()),
            MemberRef::Constructor { class, .. } | MemberRef::ImplicitConstructor { class } => {
                env.class(class).map(|def| def.self_type(class))
            }
        }
    }
}

/// A member found by the declaration walk, with the metadata applicability checks need.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodRefCandidate {
    pub member: MemberRef,
    /// Type arguments of the declaring class as seen from the qualifier.
    pub substitution: Substitution,
    pub is_static: bool,
    pub is_accessible: bool,
    pub is_varargs: bool,
    /// `false` for instance members found while the walk was restricted to static members.
    pub static_scope_correct: bool,
}

/// The raw candidate set of a site.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub candidates: Vec<MethodRefCandidate>,
    /// The implicit constructor rule already decided the outcome; no conflict resolution.
    pub settled: bool,
}

pub(crate) struct CollectRequest<'a> {
    pub site: &'a MethodRefSite,
    pub qualified: &'a Qualified,
    /// Owning substitution, refined from the target for constructor references.
    pub substitution: &'a Substitution,
    pub target: Option<&'a FunctionalTarget>,
    pub cancel: &'a CancellationToken,
    pub checkpoint_interval: u32,
}

pub(crate) fn collect(
    env: &dyn TypeEnv,
    walker: &dyn DeclarationWalker,
    request: &CollectRequest<'_>,
) -> Result<Collected, MethodRefError> {
    let owning = request.qualified.class;
    let Some(def) = env.class(owning) else {
        return Err(MethodRefError::InvalidState {
            site: request.site.id(),
            reason: format!("owning class {owning:?} is missing from the environment"),
        });
    };
    let is_constructor = request.site.is_constructor();

    if let Some(target) = request.target.filter(|_| is_constructor) {
        if def.constructors.is_empty() && def.kind != ClassKind::Enum && !def.is_abstract {
            let has_receiver = target.arity() == 1
                && is_receiver_type(env, &target.params()[0], owning, request.substitution);
            let needs_outer = def.requires_outer_instance();
            let implicit = match def.outer {
                // `Inner::new` as a `Supplier` needs `Outer.this` in scope.
                Some(outer) if needs_outer && target.arity() == 0 => {
                    outer_instance_in_scope(env, request.site, outer)?
                }
                _ => target.arity() == 0 || (has_receiver && needs_outer),
            };
            let candidates = if implicit {
                vec![MethodRefCandidate {
                    member: MemberRef::ImplicitConstructor { class: owning },
                    substitution: request.substitution.clone(),
                    is_static: false,
                    is_accessible: true,
                    is_varargs: false,
                    static_scope_correct: true,
                }]
            } else {
                Vec::new()
            };
            return Ok(Collected {
                candidates,
                settled: true,
            });
        }
    }

    let filter = match request.site.name() {
        _ if is_constructor => MemberFilter::constructors(def.simple_name()),
        RefName::Ident(name) => MemberFilter::methods(name),
        RefName::New | RefName::Missing => return Ok(Collected::default()),
    };

    let mut state = WalkState::default();
    if request.qualified.begins_with_reference_type && starts_static(env, request.site, owning)? {
        state.handle_event(WalkEvent::StartStatic);
    }

    let walk = WalkRequest {
        class: owning,
        substitution: request.substitution,
        filter,
        place: request.site.enclosing_class(),
        access_class: (!request.qualified.array_qualifier).then_some(owning),
    };
    let checkpoint = Checkpoint::new(request.cancel, request.checkpoint_interval);
    let mut candidates = Vec::new();
    let mut sink = |candidate: MethodRefCandidate| {
        candidates.push(candidate);
        WalkControl::Continue
    };
    walker.walk(env, &walk, &mut state, &mut sink, &checkpoint)?;

    Ok(Collected {
        candidates,
        settled: false,
    })
}

/// Does a type-named reference to `owning` sit in a static context relative to that class?
fn starts_static(
    env: &dyn TypeEnv,
    site: &MethodRefSite,
    owning: ClassId,
) -> Result<bool, MethodRefError> {
    let invalid = |class: ClassId| MethodRefError::InvalidState {
        site: site.id(),
        reason: format!("enclosing class {class:?} is missing from the environment"),
    };

    let def = env.class(owning).ok_or_else(|| invalid(owning))?;
    if def.outer.is_some() && def.is_static {
        return Ok(false);
    }

    let anchor = def.outer.unwrap_or(owning);
    let stop_at = site.is_inside(anchor).then_some(anchor);

    for item in site.enclosing() {
        match *item {
            EnclosingItem::Class(class) if Some(class) == stop_at => return Ok(false),
            EnclosingItem::Class(class) => {
                if env.class(class).ok_or_else(|| invalid(class))?.is_static {
                    return Ok(true);
                }
            }
            EnclosingItem::Member { is_static } => {
                if is_static {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

/// Is an instance of `outer` available as an implicit enclosing instance at `site`?
fn outer_instance_in_scope(
    env: &dyn TypeEnv,
    site: &MethodRefSite,
    outer: ClassId,
) -> Result<bool, MethodRefError> {
    if !site.is_inside(outer) {
        return Ok(false);
    }
    for item in site.enclosing() {
        match *item {
            EnclosingItem::Class(class) if class == outer => return Ok(true),
            EnclosingItem::Class(class) => {
                let def = env.class(class).ok_or_else(|| MethodRefError::InvalidState {
                    site: site.id(),
                    reason: format!("enclosing class {class:?} is missing from the environment"),
                })?;
                if def.is_static {
                    return Ok(false);
                }
            }
            EnclosingItem::Member { is_static: true } => return Ok(false),
            EnclosingItem::Member { is_static: false } => {}
        }
    }
    Ok(false)
}

/// Could a value of type `ty` be the receiver of an unbound reference to a member of `owning`?
///
/// `ty`'s class must be, or inherit from, `owning` or one of its enclosing classes; when both
/// sides carry type arguments for `owning` they must agree.
pub(crate) fn is_receiver_type(
    env: &dyn TypeEnv,
    ty: &Type,
    owning: ClassId,
    owning_subst: &Substitution,
) -> bool {
    let ty = eliminate_wildcards(env, ty);
    if resolve_class_in_type(env, &ty).is_none() {
        return false;
    }

    let mut class = Some(owning);
    for _ in 0..64 {
        let Some(current) = class else {
            break;
        };
        if let Some(view) = instantiate_as_supertype(env, &ty, current) {
            if current != owning || owning_subst.is_empty() {
                return true;
            }
            let Type::Class(ClassType { args, .. }) = view else {
                return true;
            };
            return match env.class(owning) {
                Some(owning_def) if !args.is_empty() => {
                    Substitution::for_class(owning_def, &args) == *owning_subst
                }
                _ => true,
            };
        }
        class = env.class(current).and_then(|def| def.outer);
    }
    false
}
