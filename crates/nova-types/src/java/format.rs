use std::fmt;

use crate::{ClassType, Type, TypeEnv, WildcardBound};

/// Render `ty` in Java source syntax using simple class names (`List<String>`, `int[]`).
///
/// Intended for log output and diagnostics; unknown classes render as `<id>`.
pub fn format_type(env: &dyn TypeEnv, ty: &Type) -> String {
    TypeDisplay { env, ty }.to_string()
}

struct TypeDisplay<'a> {
    env: &'a dyn TypeEnv,
    ty: &'a Type,
}

impl TypeDisplay<'_> {
    fn nested<'b>(&'b self, ty: &'b Type) -> TypeDisplay<'b> {
        TypeDisplay { env: self.env, ty }
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Type::Void => f.write_str("void"),
            Type::Primitive(prim) => f.write_str(prim.name()),
            Type::Class(ClassType { def, args }) => {
                match self.env.class(*def) {
                    Some(class_def) => f.write_str(class_def.simple_name())?,
                    None => write!(f, "<{}>", def.to_raw())?,
                }
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (idx, arg) in args.iter().enumerate() {
                        if idx > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", self.nested(arg))?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Type::Array(elem) => write!(f, "{}[]", self.nested(elem)),
            Type::TypeVar(id) => match self.env.type_param(*id) {
                Some(tp) => f.write_str(&tp.name),
                None => write!(f, "T#{}", id.to_raw()),
            },
            Type::Wildcard(WildcardBound::Unbounded) => f.write_str("?"),
            Type::Wildcard(WildcardBound::Extends(bound)) => {
                write!(f, "? extends {}", self.nested(bound))
            }
            Type::Wildcard(WildcardBound::Super(bound)) => {
                write!(f, "? super {}", self.nested(bound))
            }
            Type::Intersection(parts) => {
                for (idx, part) in parts.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" & ")?;
                    }
                    write!(f, "{}", self.nested(part))?;
                }
                Ok(())
            }
            Type::Named(name) => f.write_str(name),
            Type::Null => f.write_str("null"),
            Type::Unknown => f.write_str("<unknown>"),
            Type::Error => f.write_str("<error>"),
        }
    }
}
