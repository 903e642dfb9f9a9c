//! Resolution of Java method reference expressions (`Type::method`, `expr::method`,
//! `Type::new`).
//!
//! A resolution runs in stages:
//!
//! 1. [`classify`] the qualifier into the class whose members are searched,
//! 2. obtain the functional interface target from a registered provisional type or the
//!    [`ExpectedTypeProvider`],
//! 3. collect candidates with a [`DeclarationWalker`],
//! 4. filter them by method-reference applicability and pick the most specific one,
//! 5. infer the chosen member's type arguments.
//!
//! Results are cached per site and version in a [`MethodRefCache`]. Expected-type providers
//! may resolve other method references (or the one being resolved) through the [`ResolveCx`]
//! they are handed; such nested requests never deadlock on the site being derived.

mod cache;
mod candidates;
mod config;
mod conflict;
mod error;
mod guard;
mod infer;
mod qualifier;
mod site;
mod target;
mod walker;

use std::collections::HashMap;
use std::sync::Arc;

use nova_types::{infer_from_return_type, Substitution, Type, TypeEnv};
use tokio_util::sync::CancellationToken;

pub use cache::MethodRefCache;
pub use candidates::{MemberRef, MemberSignature, MethodRefCandidate};
pub use config::MethodRefConfig;
pub use conflict::{JavaMostSpecific, MostSpecific};
pub use error::{Cancelled, MethodRefError, RenameError};
pub use guard::ResolveCx;
pub use infer::ResolvedMethodRef;
pub use qualifier::{classify, Qualified};
pub use site::{EnclosingItem, MethodRefSite, Qualifier, RefName, SiteId};
pub use target::FunctionalTarget;
pub use walker::{
    CandidateSink, Checkpoint, ClassMemberWalker, DeclarationWalker, MemberFilter, WalkControl,
    WalkEvent, WalkRequest, WalkState,
};

use cache::{ComputeMode, Computed};
use candidates::{collect, CollectRequest};
use conflict::{resolve_conflicts, Conflict, ConflictInput};
use infer::{resolve_candidate, InferInput};

/// Outcome of resolving a method reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MethodRefResolution {
    /// Nothing applicable (or the reference is incomplete or unresolvable).
    Empty,
    Unique(ResolvedMethodRef),
    /// Several applicable members, none more specific than the others.
    Ambiguous(Vec<MethodRefCandidate>),
}

impl MethodRefResolution {
    pub fn is_empty(&self) -> bool {
        matches!(self, MethodRefResolution::Empty)
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, MethodRefResolution::Ambiguous(_))
    }

    pub fn unique(&self) -> Option<&ResolvedMethodRef> {
        match self {
            MethodRefResolution::Unique(resolved) => Some(resolved),
            _ => None,
        }
    }

    /// Every member this resolution refers to.
    pub fn members(&self) -> Vec<MemberRef> {
        match self {
            MethodRefResolution::Empty => Vec::new(),
            MethodRefResolution::Unique(resolved) => vec![resolved.member()],
            MethodRefResolution::Ambiguous(candidates) => {
                candidates.iter().map(|c| c.member).collect()
            }
        }
    }
}

/// Supplies the functional interface type a method reference is converted to.
///
/// This is the surrounding type checker's business: an assignment target, a parameter of the
/// invoked method, a cast. `cx` may be used to resolve other method references, including `site`
/// itself; a nested request for `site` resolves without a target.
pub trait ExpectedTypeProvider: Send + Sync {
    fn expected_type(&self, site: &MethodRefSite, cx: &ResolveCx<'_>) -> Option<Type>;
}

/// Fixed expected types per site.
impl ExpectedTypeProvider for HashMap<SiteId, Type> {
    fn expected_type(&self, site: &MethodRefSite, _cx: &ResolveCx<'_>) -> Option<Type> {
        self.get(&site.id()).cloned()
    }
}

/// No site has an expected type.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoExpectedType;

impl ExpectedTypeProvider for NoExpectedType {
    fn expected_type(&self, _site: &MethodRefSite, _cx: &ResolveCx<'_>) -> Option<Type> {
        None
    }
}

enum TargetSource {
    Registered(Type),
    Derive,
    Absent,
}

/// Resolves method references and caches the results.
pub struct MethodRefResolver {
    config: MethodRefConfig,
    provider: Box<dyn ExpectedTypeProvider>,
    walker: Box<dyn DeclarationWalker>,
    most_specific: Box<dyn MostSpecific>,
    cache: MethodRefCache,
}

impl MethodRefResolver {
    pub fn new(provider: impl ExpectedTypeProvider + 'static) -> Self {
        Self {
            config: MethodRefConfig::default(),
            provider: Box::new(provider),
            walker: Box::new(ClassMemberWalker),
            most_specific: Box::new(JavaMostSpecific),
            cache: MethodRefCache::new(),
        }
    }

    /// A resolver for code without any surrounding type information.
    pub fn without_provider() -> Self {
        Self::new(NoExpectedType)
    }

    #[must_use]
    pub fn with_config(mut self, config: MethodRefConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_walker(mut self, walker: impl DeclarationWalker + 'static) -> Self {
        self.walker = Box::new(walker);
        self
    }

    #[must_use]
    pub fn with_most_specific(mut self, most_specific: impl MostSpecific + 'static) -> Self {
        self.most_specific = Box::new(most_specific);
        self
    }

    pub fn config(&self) -> &MethodRefConfig {
        &self.config
    }

    pub fn cache(&self) -> &MethodRefCache {
        &self.cache
    }

    /// Resolve `site`.
    ///
    /// Repeated calls for an unchanged site return the same `Arc`. `allow_incomplete` only
    /// selects a separate cache entry.
    pub fn resolve(
        &self,
        env: &dyn TypeEnv,
        site: &MethodRefSite,
        allow_incomplete: bool,
    ) -> Result<Arc<MethodRefResolution>, Cancelled> {
        self.resolve_with_cancel(env, site, allow_incomplete, &CancellationToken::new())
    }

    pub fn resolve_with_cancel(
        &self,
        env: &dyn TypeEnv,
        site: &MethodRefSite,
        allow_incomplete: bool,
        cancel: &CancellationToken,
    ) -> Result<Arc<MethodRefResolution>, Cancelled> {
        let cx = ResolveCx::new(self, env, allow_incomplete, cancel);
        self.resolve_in(&cx, site)
    }

    pub(crate) fn resolve_in(
        &self,
        cx: &ResolveCx<'_>,
        site: &MethodRefSite,
    ) -> Result<Arc<MethodRefResolution>, Cancelled> {
        let id = site.id();
        let _span = tracing::debug_span!(
            "query",
            name = "method_ref",
            site = ?id,
            version = site.version(),
            allow_incomplete = cx.allow_incomplete()
        )
        .entered();

        if cx.cancel().is_cancelled() {
            return Err(Cancelled);
        }

        if let Some(ty) = cx.registered_target(id) {
            cx.note_cycle_break(id);
            return self.compute(cx, site, TargetSource::Registered(ty)).map(Arc::new);
        }
        if cx.is_deriving(id) {
            tracing::debug!(site = ?id, "expected type depends on itself; resolving untargeted");
            cx.note_cycle_break(id);
            return self.compute(cx, site, TargetSource::Absent).map(Arc::new);
        }
        if !self.config.cache_enabled {
            return self.compute(cx, site, TargetSource::Derive).map(Arc::new);
        }

        let may_block = !cx.is_nested();
        self.cache.get_or_compute(
            id,
            site.version(),
            cx.allow_incomplete(),
            may_block,
            |mode| {
                let source = match mode {
                    ComputeMode::Publish | ComputeMode::Stale | ComputeMode::Contended => {
                        TargetSource::Derive
                    }
                    ComputeMode::Reentrant => {
                        cx.note_cycle_break(id);
                        TargetSource::Absent
                    }
                };
                let mark = cx.cycle_mark();
                let value = self.compute(cx, site, source)?;
                let cacheable = cx.settle_cycle_breaks(mark, id);
                if !cacheable {
                    tracing::debug!(site = ?id, "resolution depends on a broken cycle; not caching");
                }
                Ok(Computed { value, cacheable })
            },
        )
    }

    fn compute(
        &self,
        cx: &ResolveCx<'_>,
        site: &MethodRefSite,
        source: TargetSource,
    ) -> Result<MethodRefResolution, Cancelled> {
        match self.compute_inner(cx, site, source) {
            Ok(resolution) => Ok(resolution),
            Err(MethodRefError::Cancelled(cancelled)) => Err(cancelled),
            Err(err @ MethodRefError::InvalidState { .. }) => {
                tracing::error!(%err, "method reference resolution failed");
                Ok(MethodRefResolution::Empty)
            }
        }
    }

    fn compute_inner(
        &self,
        cx: &ResolveCx<'_>,
        site: &MethodRefSite,
        source: TargetSource,
    ) -> Result<MethodRefResolution, MethodRefError> {
        if !site.is_attached() {
            return Err(MethodRefError::InvalidState {
                site: site.id(),
                reason: "site is detached from its tree".to_string(),
            });
        }

        let env = cx.env();
        let Some(qualified) = classify(env, site.qualifier()) else {
            return Ok(MethodRefResolution::Empty);
        };
        if matches!(site.name(), RefName::Missing) {
            return Ok(MethodRefResolution::Empty);
        }

        let interface = match source {
            TargetSource::Registered(ty) => Some(ty),
            TargetSource::Absent => None,
            TargetSource::Derive => {
                let _deriving = cx.enter_deriving(site.id());
                self.provider.expected_type(site, cx)
            }
        };
        if cx.cancel().is_cancelled() {
            return Err(Cancelled.into());
        }
        let target = interface.and_then(|ty| FunctionalTarget::from_type(env, ty));

        let mut owning_subst = qualified.substitution.clone();
        if let (true, Some(target)) = (site.is_constructor(), target.as_ref()) {
            owning_subst = refine_from_constructed_type(env, &qualified, target);
        }

        let collected = collect(
            env,
            self.walker.as_ref(),
            &CollectRequest {
                site,
                qualified: &qualified,
                substitution: &owning_subst,
                target: target.as_ref(),
                cancel: cx.cancel(),
                checkpoint_interval: self.config.checkpoint_interval(),
            },
        )?;
        let candidates = collected.candidates;

        let conflict = match target.as_ref() {
            _ if collected.settled => Conflict::unfiltered(candidates.len()),
            None => Conflict::unfiltered(candidates.len()),
            Some(target) => resolve_conflicts(
                env,
                &ConflictInput {
                    owning: qualified.class,
                    owning_subst: &owning_subst,
                    target,
                    begins_with_reference_type: qualified.begins_with_reference_type,
                    qualifier_denotes_type: qualified.denotes_type,
                },
                &candidates,
                self.most_specific.as_ref(),
            ),
        };

        let resolution = match conflict {
            Conflict::Empty => MethodRefResolution::Empty,
            Conflict::Ambiguous(indices) => MethodRefResolution::Ambiguous(
                indices.into_iter().map(|idx| candidates[idx].clone()).collect(),
            ),
            Conflict::Unique(idx) => MethodRefResolution::Unique(resolve_candidate(
                env,
                candidates[idx].clone(),
                &InferInput {
                    site: site.id(),
                    owning_subst: &owning_subst,
                    target: target.as_ref(),
                    log_degenerate: self.config.log_degenerate_inference,
                },
            )),
        };
        tracing::debug!(
            site = ?site.id(),
            candidates = candidates.len(),
            outcome = outcome_name(&resolution),
            "resolved method reference"
        );
        Ok(resolution)
    }

    /// Every method visible on the qualifier's class regardless of name, for completion.
    pub fn variants(
        &self,
        env: &dyn TypeEnv,
        site: &MethodRefSite,
    ) -> Result<Vec<MethodRefCandidate>, Cancelled> {
        self.variants_with_cancel(env, site, &CancellationToken::new())
    }

    pub fn variants_with_cancel(
        &self,
        env: &dyn TypeEnv,
        site: &MethodRefSite,
        cancel: &CancellationToken,
    ) -> Result<Vec<MethodRefCandidate>, Cancelled> {
        let Some(qualified) = classify(env, site.qualifier()) else {
            return Ok(Vec::new());
        };

        let checkpoint = Checkpoint::new(cancel, self.config.checkpoint_interval());
        let request = WalkRequest {
            class: qualified.class,
            substitution: &qualified.substitution,
            filter: MemberFilter::all_methods(),
            place: site.enclosing_class(),
            access_class: (!qualified.array_qualifier).then_some(qualified.class),
        };
        let mut out = Vec::new();
        let mut sink = |candidate: MethodRefCandidate| {
            if candidate.is_accessible {
                out.push(candidate);
            }
            WalkControl::Continue
        };
        self.walker.walk(
            env,
            &request,
            &mut WalkState::default(),
            &mut sink,
            &checkpoint,
        )?;
        Ok(out)
    }

    /// Does `site` resolve (uniquely) to `member`?
    pub fn is_reference_to(
        &self,
        env: &dyn TypeEnv,
        site: &MethodRefSite,
        member: MemberRef,
    ) -> Result<bool, Cancelled> {
        let resolution = self.resolve(env, site, false)?;
        Ok(resolution
            .unique()
            .is_some_and(|resolved| resolved.member() == member))
    }
}

impl std::fmt::Debug for MethodRefResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRefResolver")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// `ArrayList::new` as `Supplier<List<String>>` instantiates `ArrayList<String>`.
fn refine_from_constructed_type(
    env: &dyn TypeEnv,
    qualified: &Qualified,
    target: &FunctionalTarget,
) -> Substitution {
    let Some(def) = env.class(qualified.class) else {
        return qualified.substitution.clone();
    };
    let base = if qualified.substitution.is_raw_for(&def.type_params) {
        Substitution::new()
    } else {
        qualified.substitution.clone()
    };
    infer_from_return_type(
        env,
        &def.type_params,
        &def.self_type(qualified.class),
        Some(target.return_type()),
        base,
    )
}

fn outcome_name(resolution: &MethodRefResolution) -> &'static str {
    match resolution {
        MethodRefResolution::Empty => "empty",
        MethodRefResolution::Unique(_) => "unique",
        MethodRefResolution::Ambiguous(_) => "ambiguous",
    }
}
