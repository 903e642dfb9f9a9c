use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use nova_types::{Type, TypeEnv};
use tokio_util::sync::CancellationToken;

use super::error::Cancelled;
use super::site::{MethodRefSite, SiteId};
use super::{MethodRefResolution, MethodRefResolver};

/// Context of one top-level resolution request.
///
/// Expected-type providers receive it so they can resolve other sites (or the same one) while
/// deriving a type. It tracks provisional target types registered through
/// [`ResolveCx::with_target`] and the sites whose expected type is currently being derived;
/// requests for either kind of site bypass the cache.
///
/// Resolving such a site breaks a cycle, and everything computed on top of that break depends on
/// the order in which the request reached its sites. The context records each break so the
/// affected results stay out of the cache; a break at a site no longer taints anything once that
/// site's own computation has finished.
pub struct ResolveCx<'a> {
    resolver: &'a MethodRefResolver,
    env: &'a dyn TypeEnv,
    allow_incomplete: bool,
    cancel: &'a CancellationToken,
    registered: RefCell<HashMap<SiteId, Type>>,
    deriving: RefCell<HashSet<SiteId>>,
    cycle_breaks: RefCell<Vec<SiteId>>,
}

impl<'a> ResolveCx<'a> {
    pub(crate) fn new(
        resolver: &'a MethodRefResolver,
        env: &'a dyn TypeEnv,
        allow_incomplete: bool,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            resolver,
            env,
            allow_incomplete,
            cancel,
            registered: RefCell::default(),
            deriving: RefCell::default(),
            cycle_breaks: RefCell::default(),
        }
    }

    pub fn env(&self) -> &'a dyn TypeEnv {
        self.env
    }

    pub fn allow_incomplete(&self) -> bool {
        self.allow_incomplete
    }

    pub fn cancel(&self) -> &'a CancellationToken {
        self.cancel
    }

    /// Resolve `site` within this request.
    pub fn resolve(&self, site: &MethodRefSite) -> Result<Arc<MethodRefResolution>, Cancelled> {
        self.resolver.resolve_in(self, site)
    }

    /// Run `f` with `ty` registered as the functional interface type of `site`.
    ///
    /// Resolutions of `site` inside `f` use `ty` and are not cached. The previous registration,
    /// if any, is restored when `f` returns or unwinds.
    pub fn with_target<R>(&self, site: SiteId, ty: Type, f: impl FnOnce(&Self) -> R) -> R {
        let previous = self.registered.borrow_mut().insert(site, ty);
        let _restore = Registration {
            cx: self,
            site,
            previous,
        };
        f(self)
    }

    /// The provisional target registered for `site`.
    pub fn registered_target(&self, site: SiteId) -> Option<Type> {
        self.registered.borrow().get(&site).cloned()
    }

    /// Is the expected type of `site` being derived right now?
    pub fn is_deriving(&self, site: SiteId) -> bool {
        self.deriving.borrow().contains(&site)
    }

    /// Is any expected type being derived, i.e. does this request already hold a site?
    pub(crate) fn is_nested(&self) -> bool {
        !self.deriving.borrow().is_empty()
    }

    /// Record that a resolution of `site` used a provisional or missing target because `site`
    /// is in progress further up this request.
    pub(crate) fn note_cycle_break(&self, site: SiteId) {
        self.cycle_breaks.borrow_mut().push(site);
    }

    pub(crate) fn cycle_mark(&self) -> usize {
        self.cycle_breaks.borrow().len()
    }

    /// Close the computation of `site` started at `mark`.
    ///
    /// Breaks at `site` itself are resolved; any other break recorded since `mark` is left for
    /// the enclosing computations. Returns whether the result is independent of the request.
    pub(crate) fn settle_cycle_breaks(&self, mark: usize, site: SiteId) -> bool {
        let mut breaks = self.cycle_breaks.borrow_mut();
        let len = breaks.len();
        let mut since = breaks.split_off(mark.min(len));
        since.retain(|broken| *broken != site);
        let independent = since.is_empty();
        breaks.extend(since);
        independent
    }

    /// Mark `site` as deriving its expected type until the guard drops.
    pub(crate) fn enter_deriving(&self, site: SiteId) -> DerivingGuard<'_, 'a> {
        let fresh = self.deriving.borrow_mut().insert(site);
        DerivingGuard {
            cx: self,
            site,
            fresh,
        }
    }
}

struct Registration<'c, 'a> {
    cx: &'c ResolveCx<'a>,
    site: SiteId,
    previous: Option<Type>,
}

impl Drop for Registration<'_, '_> {
    fn drop(&mut self) {
        let mut registered = self.cx.registered.borrow_mut();
        match self.previous.take() {
            Some(ty) => {
                registered.insert(self.site, ty);
            }
            None => {
                registered.remove(&self.site);
            }
        }
    }
}

pub(crate) struct DerivingGuard<'c, 'a> {
    cx: &'c ResolveCx<'a>,
    site: SiteId,
    fresh: bool,
}

impl Drop for DerivingGuard<'_, '_> {
    fn drop(&mut self) {
        if self.fresh {
            self.cx.deriving.borrow_mut().remove(&self.site);
        }
    }
}
