use std::collections::HashMap;

use crate::{
    ClassDef, ClassId, ClassKind, ConstructorDef, MethodDef, PrimitiveType, Type, TypeEnv,
    TypeParamDef, TypeVarId, Visibility, WellKnownTypes,
};

/// In-memory [`TypeEnv`].
///
/// Classes are addressed by dense [`ClassId`]s; adding a class whose binary name already exists
/// replaces the previous definition in place so ids stay stable across re-indexing.
#[derive(Debug, Clone)]
pub struct TypeStore {
    classes: Vec<ClassDef>,
    type_params: Vec<TypeParamDef>,
    by_name: HashMap<String, ClassId>,
    well_known: WellKnownTypes,
}

impl TypeStore {
    pub fn add_class(&mut self, def: ClassDef) -> ClassId {
        if let Some(id) = self.by_name.get(&def.name).copied() {
            self.classes[id.to_raw() as usize] = def;
            return id;
        }
        let id = ClassId::from_raw(self.classes.len() as u32);
        self.by_name.insert(def.name.clone(), id);
        self.classes.push(def);
        id
    }

    pub fn add_type_param(
        &mut self,
        name: impl Into<String>,
        upper_bounds: Vec<Type>,
    ) -> TypeVarId {
        let id = TypeVarId::from_raw(self.type_params.len() as u32);
        self.type_params.push(TypeParamDef {
            name: name.into(),
            upper_bounds,
            lower_bound: None,
        });
        id
    }

    pub fn class_mut(&mut self, id: ClassId) -> Option<&mut ClassDef> {
        self.classes.get_mut(id.to_raw() as usize)
    }

    pub fn type_param_mut(&mut self, id: TypeVarId) -> Option<&mut TypeParamDef> {
        self.type_params.get_mut(id.to_raw() as usize)
    }

    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// A store pre-populated with the handful of JDK types Nova's tests rely on.
    pub fn with_minimal_jdk() -> Self {
        let mut store = TypeStore {
            classes: Vec::new(),
            type_params: Vec::new(),
            by_name: HashMap::new(),
            well_known: WellKnownTypes {
                object: ClassId::from_raw(0),
                string: ClassId::from_raw(0),
                integer: ClassId::from_raw(0),
                cloneable: ClassId::from_raw(0),
                serializable: ClassId::from_raw(0),
            },
        };
        MinimalJdk::populate(&mut store);
        store
    }
}

impl TypeEnv for TypeStore {
    fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id.to_raw() as usize)
    }

    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef> {
        self.type_params.get(id.to_raw() as usize)
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.class_id(name)
    }

    fn well_known(&self) -> &WellKnownTypes {
        &self.well_known
    }
}

struct MinimalJdk;

impl MinimalJdk {
    fn populate(store: &mut TypeStore) {
        let object = store.add_class(class("java.lang.Object", ClassKind::Class, None));
        let object_ty = Type::class(object, vec![]);

        let cloneable = store.add_class(class(
            "java.lang.Cloneable",
            ClassKind::Interface,
            Some(&object_ty),
        ));
        let serializable = store.add_class(class(
            "java.io.Serializable",
            ClassKind::Interface,
            Some(&object_ty),
        ));

        // Placeholder so `String`'s members can refer to it; filled in below.
        let string = store.add_class(class(
            "java.lang.String",
            ClassKind::Class,
            Some(&object_ty),
        ));
        let string_ty = Type::class(string, vec![]);

        {
            let def = store.class_mut(object).expect("Object was just added");
            def.constructors.push(ctor(vec![]));
            def.methods.extend([
                method("equals", vec![object_ty.clone()], Type::boolean()),
                method("hashCode", vec![], Type::int()),
                method("toString", vec![], string_ty.clone()),
            ]);
        }

        let comparable_t = store.add_type_param("T", vec![object_ty.clone()]);
        let comparable = store.add_class(ClassDef {
            type_params: vec![comparable_t],
            methods: vec![abstract_method(
                "compareTo",
                vec![Type::TypeVar(comparable_t)],
                Type::int(),
            )],
            ..class("java.lang.Comparable", ClassKind::Interface, Some(&object_ty))
        });

        let char_sequence = store.add_class(ClassDef {
            methods: vec![abstract_method("length", vec![], Type::int())],
            ..class("java.lang.CharSequence", ClassKind::Interface, Some(&object_ty))
        });

        store.add_class(ClassDef {
            interfaces: vec![
                Type::class(char_sequence, vec![]),
                Type::class(comparable, vec![string_ty.clone()]),
                Type::class(serializable, vec![]),
            ],
            constructors: vec![ctor(vec![]), ctor(vec![string_ty.clone()])],
            methods: vec![
                method("length", vec![], Type::int()),
                method("isEmpty", vec![], Type::boolean()),
                method("compareTo", vec![string_ty.clone()], Type::int()),
                method("concat", vec![string_ty.clone()], string_ty.clone()),
                method("toUpperCase", vec![], string_ty.clone()),
                static_method("valueOf", vec![Type::int()], string_ty.clone()),
                static_method("valueOf", vec![object_ty.clone()], string_ty.clone()),
            ],
            ..class("java.lang.String", ClassKind::Class, Some(&object_ty))
        });

        let number = store.add_class(ClassDef {
            is_abstract: true,
            constructors: vec![ctor(vec![])],
            methods: vec![abstract_method("intValue", vec![], Type::int())],
            ..class("java.lang.Number", ClassKind::Class, Some(&object_ty))
        });
        let number_ty = Type::class(number, vec![]);

        // Wrapper classes. Only `Integer` carries members; the rest exist for boxing.
        let mut integer = None;
        for prim in PrimitiveType::ALL {
            let super_ty = match prim {
                PrimitiveType::Boolean | PrimitiveType::Char => &object_ty,
                _ => &number_ty,
            };
            let id = store.add_class(class(
                prim.box_class_name(),
                ClassKind::Class,
                Some(super_ty),
            ));
            if prim == PrimitiveType::Int {
                integer = Some(id);
            }
        }
        let integer = integer.expect("Integer is one of the wrapper classes");
        let integer_ty = Type::class(integer, vec![]);
        {
            let def = store.class_mut(integer).expect("Integer was just added");
            def.interfaces = vec![Type::class(comparable, vec![integer_ty.clone()])];
            def.constructors = vec![ctor(vec![Type::int()])];
            def.methods = vec![
                method("intValue", vec![], Type::int()),
                method("compareTo", vec![integer_ty.clone()], Type::int()),
                static_method("parseInt", vec![string_ty.clone()], Type::int()),
                static_method("valueOf", vec![Type::int()], integer_ty.clone()),
                static_method("toString", vec![Type::int()], string_ty.clone()),
                static_method("sum", vec![Type::int(), Type::int()], Type::int()),
            ];
        }

        store.add_class(ClassDef {
            methods: vec![abstract_method("run", vec![], Type::Void)],
            ..class("java.lang.Runnable", ClassKind::Interface, Some(&object_ty))
        });

        Self::populate_functions(store, &object_ty);
        Self::populate_collections(store, &object_ty);

        store.well_known = WellKnownTypes {
            object,
            string,
            integer,
            cloneable,
            serializable,
        };
    }

    fn populate_functions(store: &mut TypeStore, object_ty: &Type) {
        let t = store.add_type_param("T", vec![object_ty.clone()]);
        let r = store.add_type_param("R", vec![object_ty.clone()]);
        let function = store.add_class(ClassDef {
            type_params: vec![t, r],
            methods: vec![abstract_method(
                "apply",
                vec![Type::TypeVar(t)],
                Type::TypeVar(r),
            )],
            ..class("java.util.function.Function", ClassKind::Interface, Some(object_ty))
        });

        let t = store.add_type_param("T", vec![object_ty.clone()]);
        store.add_class(ClassDef {
            type_params: vec![t],
            interfaces: vec![Type::class(function, vec![Type::TypeVar(t), Type::TypeVar(t)])],
            ..class("java.util.function.UnaryOperator", ClassKind::Interface, Some(object_ty))
        });

        let t = store.add_type_param("T", vec![object_ty.clone()]);
        let u = store.add_type_param("U", vec![object_ty.clone()]);
        let r = store.add_type_param("R", vec![object_ty.clone()]);
        store.add_class(ClassDef {
            type_params: vec![t, u, r],
            methods: vec![abstract_method(
                "apply",
                vec![Type::TypeVar(t), Type::TypeVar(u)],
                Type::TypeVar(r),
            )],
            ..class("java.util.function.BiFunction", ClassKind::Interface, Some(object_ty))
        });

        let t = store.add_type_param("T", vec![object_ty.clone()]);
        store.add_class(ClassDef {
            type_params: vec![t],
            methods: vec![abstract_method("get", vec![], Type::TypeVar(t))],
            ..class("java.util.function.Supplier", ClassKind::Interface, Some(object_ty))
        });

        let t = store.add_type_param("T", vec![object_ty.clone()]);
        store.add_class(ClassDef {
            type_params: vec![t],
            methods: vec![abstract_method("accept", vec![Type::TypeVar(t)], Type::Void)],
            ..class("java.util.function.Consumer", ClassKind::Interface, Some(object_ty))
        });

        let t = store.add_type_param("T", vec![object_ty.clone()]);
        store.add_class(ClassDef {
            type_params: vec![t],
            methods: vec![abstract_method("test", vec![Type::TypeVar(t)], Type::boolean())],
            ..class("java.util.function.Predicate", ClassKind::Interface, Some(object_ty))
        });

        store.add_class(ClassDef {
            methods: vec![abstract_method(
                "applyAsInt",
                vec![Type::int(), Type::int()],
                Type::int(),
            )],
            ..class("java.util.function.IntBinaryOperator", ClassKind::Interface, Some(object_ty))
        });
    }

    fn populate_collections(store: &mut TypeStore, object_ty: &Type) {
        let e = store.add_type_param("E", vec![object_ty.clone()]);
        let collection = store.add_class(ClassDef {
            type_params: vec![e],
            methods: vec![
                abstract_method("size", vec![], Type::int()),
                abstract_method("isEmpty", vec![], Type::boolean()),
                abstract_method("add", vec![Type::TypeVar(e)], Type::boolean()),
            ],
            ..class("java.util.Collection", ClassKind::Interface, Some(object_ty))
        });

        let e = store.add_type_param("E", vec![object_ty.clone()]);
        let list = store.add_class(ClassDef {
            type_params: vec![e],
            interfaces: vec![Type::class(collection, vec![Type::TypeVar(e)])],
            methods: vec![abstract_method("get", vec![Type::int()], Type::TypeVar(e))],
            ..class("java.util.List", ClassKind::Interface, Some(object_ty))
        });

        let e = store.add_type_param("E", vec![object_ty.clone()]);
        store.add_class(ClassDef {
            type_params: vec![e],
            interfaces: vec![Type::class(list, vec![Type::TypeVar(e)])],
            constructors: vec![ctor(vec![]), ctor(vec![Type::int()])],
            methods: vec![
                method("size", vec![], Type::int()),
                method("isEmpty", vec![], Type::boolean()),
                method("add", vec![Type::TypeVar(e)], Type::boolean()),
                method("get", vec![Type::int()], Type::TypeVar(e)),
            ],
            ..class("java.util.ArrayList", ClassKind::Class, Some(object_ty))
        });
    }
}

fn class(name: &str, kind: ClassKind, super_class: Option<&Type>) -> ClassDef {
    ClassDef {
        name: name.to_string(),
        kind,
        type_params: vec![],
        super_class: super_class.cloned(),
        interfaces: vec![],
        constructors: vec![],
        methods: vec![],
        outer: None,
        is_static: false,
        is_abstract: kind == ClassKind::Interface,
    }
}

fn ctor(params: Vec<Type>) -> ConstructorDef {
    ConstructorDef {
        type_params: vec![],
        params,
        is_varargs: false,
        visibility: Visibility::Public,
    }
}

fn method(name: &str, params: Vec<Type>, return_type: Type) -> MethodDef {
    MethodDef {
        name: name.to_string(),
        type_params: vec![],
        params,
        return_type,
        is_static: false,
        is_varargs: false,
        is_abstract: false,
        visibility: Visibility::Public,
    }
}

fn static_method(name: &str, params: Vec<Type>, return_type: Type) -> MethodDef {
    MethodDef {
        is_static: true,
        ..method(name, params, return_type)
    }
}

fn abstract_method(name: &str, params: Vec<Type>, return_type: Type) -> MethodDef {
    MethodDef {
        is_abstract: true,
        ..method(name, params, return_type)
    }
}
