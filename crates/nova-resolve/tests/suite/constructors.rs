use nova_resolve::method_ref::{EnclosingItem, MemberRef, MethodRefSite, Qualifier, RefName, SiteId};
use nova_resolve::{MethodRefResolution, MethodRefResolver};
use nova_types::{ClassDef, ClassId, ClassKind, Type, TypeEnv, TypeStore};

use pretty_assertions::assert_eq;

use super::support::{class_def, ctor, integer, jdk, new_site, string, targets, unique};

fn outer_and_inner(env: &mut TypeStore) -> (ClassId, ClassId) {
    let outer = class_def("com.example.Outer", ClassKind::Class, env);
    let outer = env.add_class(outer);
    let inner = ClassDef {
        outer: Some(outer),
        ..class_def("com.example.Outer$Inner", ClassKind::Class, env)
    };
    let inner = env.add_class(inner);
    (outer, inner)
}

#[test]
fn class_without_constructors_gets_implicit_one() {
    let mut env = TypeStore::with_minimal_jdk();
    let foo = class_def("com.example.Foo", ClassKind::Class, &env);
    let foo = env.add_class(foo);
    let foo_ty = Type::class(foo, vec![]);

    let site = new_site(1, foo_ty.clone());
    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(&env, "java.util.function.Supplier", vec![foo_ty.clone()]),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    let resolved = unique(&resolution);
    assert_eq!(resolved.member(), MemberRef::ImplicitConstructor { class: foo });
    assert_eq!(resolved.return_type, foo_ty);

    // The implicit constructor takes no arguments.
    let site = new_site(2, Type::class(foo, vec![]));
    let resolver = MethodRefResolver::new(targets([(
        2,
        jdk(&env, "java.util.function.Function", vec![string(&env), Type::class(foo, vec![])]),
    )]));
    assert!(resolver.resolve(&env, &site, false).unwrap().is_empty());
}

#[test]
fn untargeted_constructor_reference_still_resolves() {
    let mut env = TypeStore::with_minimal_jdk();
    let foo = class_def("com.example.Foo", ClassKind::Class, &env);
    let foo = env.add_class(foo);

    let resolver = MethodRefResolver::without_provider();
    let resolution = resolver
        .resolve(&env, &new_site(1, Type::class(foo, vec![])), false)
        .unwrap();
    assert_eq!(
        unique(&resolution).member(),
        MemberRef::ImplicitConstructor { class: foo }
    );
}

#[test]
fn abstract_classes_and_interfaces_have_no_implicit_constructor() {
    let mut env = TypeStore::with_minimal_jdk();
    let shape = ClassDef {
        is_abstract: true,
        ..class_def("com.example.Shape", ClassKind::Class, &env)
    };
    let shape = env.add_class(shape);
    let shape_ty = Type::class(shape, vec![]);

    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(&env, "java.util.function.Supplier", vec![shape_ty.clone()]),
    )]));
    assert!(resolver
        .resolve(&env, &new_site(1, shape_ty), false)
        .unwrap()
        .is_empty());
}

#[test]
fn inner_class_constructor_takes_outer_instance_as_receiver() {
    let mut env = TypeStore::with_minimal_jdk();
    let (outer, inner) = outer_and_inner(&mut env);
    let inner_ty = Type::class(inner, vec![]);

    let resolver = MethodRefResolver::new(targets([
        (
            1,
            jdk(
                &env,
                "java.util.function.Function",
                vec![Type::class(outer, vec![]), inner_ty.clone()],
            ),
        ),
        (2, jdk(&env, "java.util.function.Supplier", vec![inner_ty.clone()])),
    ]));

    let with_receiver = resolver
        .resolve(&env, &new_site(1, inner_ty.clone()), false)
        .unwrap();
    assert_eq!(
        unique(&with_receiver).member(),
        MemberRef::ImplicitConstructor { class: inner }
    );

    // No enclosing `Outer` instance anywhere.
    let without_receiver = resolver
        .resolve(&env, &new_site(2, inner_ty), false)
        .unwrap();
    assert_eq!(*without_receiver, MethodRefResolution::Empty);
}

#[test]
fn inner_class_constructor_uses_enclosing_instance_in_scope() {
    let mut env = TypeStore::with_minimal_jdk();
    let (outer, inner) = outer_and_inner(&mut env);
    let inner_ty = Type::class(inner, vec![]);
    let resolver = MethodRefResolver::new(targets([
        (1, jdk(&env, "java.util.function.Supplier", vec![inner_ty.clone()])),
        (2, jdk(&env, "java.util.function.Supplier", vec![inner_ty.clone()])),
    ]));

    let in_instance_method = new_site(1, inner_ty.clone()).with_enclosing(vec![
        EnclosingItem::Member { is_static: false },
        EnclosingItem::Class(outer),
    ]);
    assert!(!resolver
        .resolve(&env, &in_instance_method, false)
        .unwrap()
        .is_empty());

    let in_static_method = new_site(2, inner_ty).with_enclosing(vec![
        EnclosingItem::Member { is_static: true },
        EnclosingItem::Class(outer),
    ]);
    assert!(resolver
        .resolve(&env, &in_static_method, false)
        .unwrap()
        .is_empty());
}

#[test]
fn explicit_constructors_are_matched_by_arity_and_type() {
    let mut env = TypeStore::with_minimal_jdk();
    let point = ClassDef {
        constructors: vec![ctor(vec![]), ctor(vec![Type::int()]), ctor(vec![string(&env)])],
        ..class_def("com.example.Point", ClassKind::Class, &env)
    };
    let point = env.add_class(point);
    let point_ty = Type::class(point, vec![]);

    let resolver = MethodRefResolver::new(targets([
        (
            1,
            jdk(&env, "java.util.function.Function", vec![integer(&env), point_ty.clone()]),
        ),
        (
            2,
            jdk(&env, "java.util.function.Function", vec![string(&env), point_ty.clone()]),
        ),
        (3, jdk(&env, "java.util.function.Supplier", vec![point_ty.clone()])),
    ]));

    let expect = |site: u32, index: usize| {
        let resolution = resolver
            .resolve(&env, &new_site(site, point_ty.clone()), false)
            .unwrap();
        assert_eq!(
            unique(&resolution).member(),
            MemberRef::Constructor { class: point, index },
            "site {site}"
        );
    };
    expect(1, 1);
    expect(2, 2);
    expect(3, 0);
}

#[test]
fn raw_constructor_reference_infers_class_type_from_target() {
    let env = TypeStore::with_minimal_jdk();
    let array_list = env.class_id("java.util.ArrayList").unwrap();
    let e = env.class(array_list).unwrap().type_params[0];

    // `Supplier<List<String>> s = ArrayList::new;`
    let site = new_site(1, Type::class(array_list, vec![]));
    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(
            &env,
            "java.util.function.Supplier",
            vec![jdk(&env, "java.util.List", vec![string(&env)])],
        ),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    let resolved = unique(&resolution);
    assert_eq!(
        resolved.member(),
        MemberRef::Constructor {
            class: array_list,
            index: 0
        }
    );
    assert_eq!(resolved.substitution.get(e), Some(&string(&env)));
    assert_eq!(
        resolved.return_type,
        Type::class(array_list, vec![string(&env)])
    );
}

#[test]
fn bare_inner_class_name_checks_the_static_context() {
    let mut env = TypeStore::with_minimal_jdk();
    let outer = class_def("com.example.Outer", ClassKind::Class, &env);
    let outer = env.add_class(outer);
    let inner = ClassDef {
        outer: Some(outer),
        constructors: vec![ctor(vec![string(&env)])],
        ..class_def("com.example.Outer$Inner", ClassKind::Class, &env)
    };
    let inner = env.add_class(inner);
    let other = class_def("com.example.Other", ClassKind::Class, &env);
    let other = env.add_class(other);
    let inner_ty = Type::class(inner, vec![]);

    // `Inner::new` written as a bare name, read as a type because no variable is called `Inner`.
    let site = |id: u32, enclosing: Vec<EnclosingItem>| {
        MethodRefSite::new(
            SiteId::from_raw(id),
            Qualifier::Name {
                name: "Inner".to_string(),
                ty: Type::Unknown,
                as_type: Some(inner_ty.clone()),
            },
            RefName::New,
        )
        .with_enclosing(enclosing)
    };
    let function = jdk(
        &env,
        "java.util.function.Function",
        vec![string(&env), inner_ty.clone()],
    );
    let resolver = MethodRefResolver::new(targets((1..=4).map(|id| (id, function.clone()))));

    let in_instance_method = resolver
        .resolve(
            &env,
            &site(1, vec![EnclosingItem::Member { is_static: false }, EnclosingItem::Class(outer)]),
            false,
        )
        .unwrap();
    assert_eq!(
        unique(&in_instance_method).member(),
        MemberRef::Constructor { class: inner, index: 0 }
    );

    let in_static_method = resolver
        .resolve(
            &env,
            &site(2, vec![EnclosingItem::Member { is_static: true }, EnclosingItem::Class(outer)]),
            false,
        )
        .unwrap();
    assert_eq!(*in_static_method, MethodRefResolution::Empty);

    // Outside `Outer` the walk goes up to the file root.
    let elsewhere_instance = resolver
        .resolve(
            &env,
            &site(3, vec![EnclosingItem::Member { is_static: false }, EnclosingItem::Class(other)]),
            false,
        )
        .unwrap();
    assert!(!elsewhere_instance.is_empty());

    let elsewhere_static = resolver
        .resolve(
            &env,
            &site(4, vec![EnclosingItem::Member { is_static: true }, EnclosingItem::Class(other)]),
            false,
        )
        .unwrap();
    assert_eq!(*elsewhere_static, MethodRefResolution::Empty);
}
