use nova_resolve::method_ref::{
    CandidateSink, Checkpoint, DeclarationWalker, MethodRefSite, Qualifier, RefName, SiteId,
    WalkRequest, WalkState,
};
use nova_resolve::{Cancelled, MethodRefResolution, MethodRefResolver};
use nova_types::{ClassDef, ClassKind, MethodDef, Type, TypeEnv, TypeStore};
use tokio_util::sync::CancellationToken;

use pretty_assertions::assert_eq;

use super::support::{
    class_def, expr_site, integer, jdk, member_names, method, object, static_method, string,
    targets, type_site, unique,
};

#[test]
fn unbound_reference_takes_first_parameter_as_receiver() {
    let env = TypeStore::with_minimal_jdk();
    let site = type_site(1, string(&env), "length");
    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(&env, "java.util.function.Function", vec![string(&env), integer(&env)]),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    let resolved = unique(&resolution);
    assert_eq!(resolved.member().class(), env.well_known().string);
    assert_eq!(resolved.member().name(&env), Some("length"));
    assert!(resolved.params.is_empty());
    assert_eq!(resolved.return_type, Type::int());
}

#[test]
fn unbound_reference_infers_only_from_the_receiver_class() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let list_e = env.class(list).unwrap().type_params[0];
    let array_list = env.class_id("java.util.ArrayList").unwrap();
    let array_list_e = env.class(array_list).unwrap().type_params[0];
    let array_list_string = jdk(&env, "java.util.ArrayList", vec![string(&env)]);

    // `List::get` as `BiFunction<ArrayList<String>, Integer, String>`: the arity differs, so only
    // `ArrayList<String>` contributes, and `List`'s own `E` stays unbound.
    let site = type_site(1, Type::class(list, vec![]), "get");
    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(
            &env,
            "java.util.function.BiFunction",
            vec![array_list_string.clone(), integer(&env), string(&env)],
        ),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    let resolved = unique(&resolution);
    assert_eq!(resolved.member().class(), list);
    assert_eq!(resolved.substitution.get(array_list_e), Some(&string(&env)));
    assert_eq!(resolved.substitution.get(list_e), None);
    assert_eq!(resolved.params, vec![Type::int()]);
    assert_eq!(resolved.return_type, Type::TypeVar(list_e));

    // `List::size` as `Function<ArrayList<String>, Integer>`.
    let site = type_site(2, Type::class(list, vec![]), "size");
    let resolver = MethodRefResolver::new(targets([(
        2,
        jdk(
            &env,
            "java.util.function.Function",
            vec![array_list_string, integer(&env)],
        ),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    let resolved = unique(&resolution);
    assert_eq!(resolved.member().name(&env), Some("size"));
    assert_eq!(
        resolved.substitution.iter().collect::<Vec<_>>(),
        vec![(array_list_e, &string(&env))]
    );
    assert_eq!(resolved.return_type, Type::int());
}

#[test]
fn bound_expression_never_uses_receiver_parameter() {
    let env = TypeStore::with_minimal_jdk();
    let bi_function = jdk(
        &env,
        "java.util.function.BiFunction",
        vec![string(&env), string(&env), string(&env)],
    );
    let resolver = MethodRefResolver::new(targets([(1, bi_function.clone()), (2, bi_function)]));

    // `"a"::concat` would need a receiver slot the bound receiver already fills.
    let bound = expr_site(1, string(&env), "concat");
    assert_eq!(
        *resolver.resolve(&env, &bound, false).unwrap(),
        MethodRefResolution::Empty
    );

    // `String::concat` takes the receiver from the first parameter.
    let unbound = type_site(2, string(&env), "concat");
    let resolution = resolver.resolve(&env, &unbound, false).unwrap();
    assert_eq!(unique(&resolution).member().name(&env), Some("concat"));
}

#[test]
fn bound_expression_matches_parameters_directly() {
    let env = TypeStore::with_minimal_jdk();
    let site = expr_site(1, string(&env), "concat");
    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(&env, "java.util.function.UnaryOperator", vec![string(&env)]),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    assert_eq!(unique(&resolution).params, vec![string(&env)]);
}

#[test]
fn static_method_matches_directly() {
    let env = TypeStore::with_minimal_jdk();
    let site = type_site(1, integer(&env), "parseInt");
    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(&env, "java.util.function.Function", vec![string(&env), integer(&env)]),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    let resolved = unique(&resolution);
    assert!(resolved.candidate.is_static);
    assert_eq!(resolved.member().name(&env), Some("parseInt"));
}

#[test]
fn inapplicable_overloads_are_filtered_out() {
    let env = TypeStore::with_minimal_jdk();
    // `valueOf(int)` cannot take a `String`; `valueOf(Object)` can.
    let site = type_site(1, string(&env), "valueOf");
    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(&env, "java.util.function.Function", vec![string(&env), string(&env)]),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    assert_eq!(unique(&resolution).params, vec![object(&env)]);
}

#[test]
fn varargs_absorbs_trailing_target_parameters() {
    let mut env = TypeStore::with_minimal_jdk();
    let util = ClassDef {
        methods: vec![MethodDef {
            is_varargs: true,
            ..static_method("sum", vec![Type::array(Type::int())], Type::int())
        }],
        ..class_def("com.example.Util", ClassKind::Class, &env)
    };
    let util = env.add_class(util);
    let tri = ClassDef {
        methods: vec![MethodDef {
            is_abstract: true,
            ..method("apply", vec![Type::int(), Type::int(), Type::int()], Type::int())
        }],
        ..class_def("com.example.IntTriFunction", ClassKind::Interface, &env)
    };
    let tri = env.add_class(tri);

    let site = type_site(1, Type::class(util, vec![]), "sum");
    let resolver = MethodRefResolver::new(targets([(1, Type::class(tri, vec![]))]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    let resolved = unique(&resolution);
    assert!(resolved.candidate.is_varargs);
    assert_eq!(resolved.member().class(), util);
}

#[test]
fn equally_specific_candidates_are_ambiguous() {
    let mut env = TypeStore::with_minimal_jdk();
    let def = ClassDef {
        methods: vec![
            static_method("m", vec![string(&env), object(&env)], Type::Void),
            static_method("m", vec![object(&env), string(&env)], Type::Void),
            static_method("m", vec![Type::int(), Type::int()], Type::Void),
        ],
        ..class_def("com.example.Pair", ClassKind::Class, &env)
    };
    let pair = env.add_class(def);

    let site = type_site(1, Type::class(pair, vec![]), "m");
    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(
            &env,
            "java.util.function.BiFunction",
            vec![string(&env), string(&env), object(&env)],
        ),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    let MethodRefResolution::Ambiguous(candidates) = &*resolution else {
        panic!("expected an ambiguous resolution, got {resolution:?}");
    };
    // Narrowed to the applicable pair; `m(int, int)` is gone.
    assert_eq!(candidates.len(), 2);
    assert_eq!(
        member_names(&env, &resolution),
        vec![(pair, "m".to_string()), (pair, "m".to_string())]
    );
}

#[test]
fn more_specific_candidate_wins() {
    let mut env = TypeStore::with_minimal_jdk();
    let def = ClassDef {
        methods: vec![
            static_method("m", vec![object(&env)], object(&env)),
            static_method("m", vec![string(&env)], object(&env)),
        ],
        ..class_def("com.example.Overloads", ClassKind::Class, &env)
    };
    let overloads = env.add_class(def);

    let site = type_site(1, Type::class(overloads, vec![]), "m");
    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(&env, "java.util.function.Function", vec![string(&env), object(&env)]),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    assert_eq!(unique(&resolution).params, vec![string(&env)]);
}

#[test]
fn without_target_all_candidates_remain() {
    let env = TypeStore::with_minimal_jdk();
    let resolver = MethodRefResolver::without_provider();

    let overloaded = type_site(1, string(&env), "valueOf");
    let resolution = resolver.resolve(&env, &overloaded, false).unwrap();
    assert!(resolution.is_ambiguous());
    assert_eq!(resolution.members().len(), 2);

    // `CharSequence.length` is overridden by `String.length`.
    let single = type_site(2, string(&env), "length");
    let resolution = resolver.resolve(&env, &single, false).unwrap();
    let resolved = unique(&resolution);
    assert_eq!(resolved.member().class(), env.well_known().string);
    assert!(resolved.substitution.is_empty());
}

#[test]
fn array_qualifier_resolves_against_object() {
    let env = TypeStore::with_minimal_jdk();
    let site = expr_site(1, Type::array(Type::int()), "toString");
    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(&env, "java.util.function.Supplier", vec![string(&env)]),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    assert_eq!(unique(&resolution).member().class(), env.well_known().object);
}

#[test]
fn bare_type_name_requires_static_members() {
    let mut env = TypeStore::with_minimal_jdk();
    let def = ClassDef {
        methods: vec![method("bar", vec![string(&env)], string(&env))],
        ..class_def("com.example.Foo", ClassKind::Class, &env)
    };
    let foo = env.add_class(def);
    let function = jdk(&env, "java.util.function.Function", vec![string(&env), string(&env)]);

    let site = MethodRefSite::new(
        SiteId::from_raw(1),
        Qualifier::Name {
            name: "Foo".to_string(),
            ty: Type::Unknown,
            as_type: Some(Type::class(foo, vec![])),
        },
        RefName::Ident("bar".to_string()),
    );
    let resolver = MethodRefResolver::new(targets([(1, function)]));
    assert!(resolver.resolve(&env, &site, false).unwrap().is_empty());
}

#[test]
fn incomplete_or_unresolvable_references_are_empty() {
    let env = TypeStore::with_minimal_jdk();
    let resolver = MethodRefResolver::without_provider();

    let missing_name = MethodRefSite::new(
        SiteId::from_raw(1),
        Qualifier::Type(string(&env)),
        RefName::Missing,
    );
    assert!(resolver.resolve(&env, &missing_name, false).unwrap().is_empty());

    let unknown = type_site(2, Type::Named("com.example.Missing".to_string()), "run");
    assert!(resolver.resolve(&env, &unknown, true).unwrap().is_empty());

    let no_such_method = type_site(3, string(&env), "frobnicate");
    assert!(resolver.resolve(&env, &no_such_method, false).unwrap().is_empty());
}

#[test]
fn variants_list_every_visible_method() {
    let env = TypeStore::with_minimal_jdk();
    let resolver = MethodRefResolver::without_provider();
    let site = type_site(1, jdk(&env, "java.util.List", vec![string(&env)]), "");

    let names: Vec<String> = resolver
        .variants(&env, &site)
        .unwrap()
        .into_iter()
        .filter_map(|candidate| candidate.member.name(&env).map(str::to_string))
        .collect();
    for expected in ["get", "size", "add", "toString", "hashCode"] {
        assert!(
            names.iter().any(|name| name == expected),
            "{expected} missing from {names:?}"
        );
    }
}

#[test]
fn variants_report_an_aborted_walk() {
    struct Aborting;

    impl DeclarationWalker for Aborting {
        fn walk(
            &self,
            _env: &dyn TypeEnv,
            _request: &WalkRequest<'_>,
            _state: &mut WalkState,
            _sink: &mut dyn CandidateSink,
            _checkpoint: &Checkpoint<'_>,
        ) -> Result<(), Cancelled> {
            Err(Cancelled)
        }
    }

    let env = TypeStore::with_minimal_jdk();
    let site = type_site(1, string(&env), "");

    let aborting = MethodRefResolver::without_provider().with_walker(Aborting);
    assert_eq!(aborting.variants(&env, &site), Err(Cancelled));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let resolver = MethodRefResolver::without_provider();
    assert_eq!(
        resolver.variants_with_cancel(&env, &site, &cancel),
        Err(Cancelled)
    );
    assert!(!resolver.variants(&env, &site).unwrap().is_empty());
}
