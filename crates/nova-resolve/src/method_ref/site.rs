use nova_types::{ClassId, Type};

use super::error::RenameError;

/// Stable identity of a method reference expression.
///
/// Ids survive reparses of unrelated regions; together with [`MethodRefSite::version`] they key
/// the resolution cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(u32);

impl SiteId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

/// The part of a method reference before `::`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Qualifier {
    /// An explicit type: `List<String>::size`, `int[]::clone`.
    Type(Type),
    /// A value expression with its static type: `foo()::bar`, `this::run`.
    Expr { ty: Type },
    /// A bare name parsed as an expression (`Foo::bar`).
    ///
    /// `ty` is the static type when the name resolves to a variable (`Type::Unknown` otherwise);
    /// `as_type` is the type the same name denotes when read as a type name.
    Name {
        name: String,
        ty: Type,
        as_type: Option<Type>,
    },
}

/// The part of a method reference after `::`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefName {
    Ident(String),
    /// The `new` keyword of a constructor reference.
    New,
    /// Incomplete code (`Foo::`).
    Missing,
}

impl RefName {
    /// Pseudo identifiers that can never be renamed.
    fn is_keyword(&self) -> bool {
        match self {
            RefName::Ident(name) => name == "this" || name == "super",
            RefName::New => true,
            RefName::Missing => false,
        }
    }
}

/// A lexically enclosing declaration of a site, innermost first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnclosingItem {
    /// A class body; whether the class is static comes from its declaration.
    Class(ClassId),
    /// A method, field initializer or initializer block.
    Member { is_static: bool },
}

/// A method reference expression as seen by the resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodRefSite {
    id: SiteId,
    version: u64,
    qualifier: Qualifier,
    name: RefName,
    enclosing: Vec<EnclosingItem>,
    attached: bool,
}

impl MethodRefSite {
    pub fn new(id: SiteId, qualifier: Qualifier, name: RefName) -> Self {
        Self {
            id,
            version: 0,
            qualifier,
            name,
            enclosing: Vec::new(),
            attached: true,
        }
    }

    /// Set the enclosing declarations (innermost first).
    pub fn with_enclosing(mut self, enclosing: Vec<EnclosingItem>) -> Self {
        self.enclosing = enclosing;
        self
    }

    pub fn id(&self) -> SiteId {
        self.id
    }

    /// Structural version. Any edit of the site's subtree or of its expected-type context must
    /// bump it.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    pub fn name(&self) -> &RefName {
        &self.name
    }

    pub fn enclosing(&self) -> &[EnclosingItem] {
        &self.enclosing
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_constructor(&self) -> bool {
        self.name == RefName::New
    }

    /// The innermost enclosing class; the place member access is checked from.
    pub fn enclosing_class(&self) -> Option<ClassId> {
        self.enclosing.iter().find_map(|item| match item {
            EnclosingItem::Class(id) => Some(*id),
            EnclosingItem::Member { .. } => None,
        })
    }

    /// Is `class` one of the classes lexically containing this site?
    pub fn is_inside(&self, class: ClassId) -> bool {
        self.enclosing.contains(&EnclosingItem::Class(class))
    }

    /// Record a change in the site's context (e.g. the expected type of its parent changed).
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn set_qualifier(&mut self, qualifier: Qualifier) {
        self.qualifier = qualifier;
        self.bump_version();
    }

    pub fn set_name(&mut self, name: RefName) {
        self.name = name;
        self.bump_version();
    }

    /// The site was removed from its tree. Further resolution requests report an invalid state.
    pub fn detach(&mut self) {
        self.attached = false;
        self.bump_version();
    }

    /// Rename the referenced member.
    ///
    /// Returns whether the site changed: `this`, `super` and `new` are never renamed, and renaming
    /// to the current name is a no-op.
    pub fn rename(&mut self, new_name: &str) -> Result<bool, RenameError> {
        if self.name == RefName::Missing {
            return Err(RenameError::MissingName);
        }
        if self.name.is_keyword() {
            return Ok(false);
        }
        if matches!(&self.name, RefName::Ident(current) if current == new_name) {
            return Ok(false);
        }
        if !is_java_identifier(new_name) {
            return Err(RenameError::InvalidIdentifier(new_name.to_string()));
        }

        self.set_name(RefName::Ident(new_name.to_string()));
        Ok(true)
    }
}

fn is_java_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (unicode_ident::is_xid_start(first) || first == '_' || first == '$')
        && chars.all(|c| unicode_ident::is_xid_continue(c) || c == '$')
}
