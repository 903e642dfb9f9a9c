use nova_resolve::{MethodRefConfig, MethodRefResolver};
use nova_types::{ClassDef, ClassId, ClassKind, MethodDef, Type, TypeStore, TypeVarId};

use pretty_assertions::assert_eq;

use super::support::{class_def, integer, jdk, object, static_method, string, targets, type_site, unique};

/// `class Util { static <T> T make(); static <T> List<T> singleton(T); static <T> T first(T...); }`
fn util(env: &mut TypeStore) -> (ClassId, TypeVarId, TypeVarId, TypeVarId) {
    let list = env.class_id("java.util.List").unwrap();
    let object = object(env);
    let make_t = env.add_type_param("T", vec![object.clone()]);
    let singleton_t = env.add_type_param("T", vec![object.clone()]);
    let first_t = env.add_type_param("T", vec![object]);
    let def = ClassDef {
        methods: vec![
            MethodDef {
                type_params: vec![make_t],
                ..static_method("make", vec![], Type::TypeVar(make_t))
            },
            MethodDef {
                type_params: vec![singleton_t],
                ..static_method(
                    "singleton",
                    vec![Type::TypeVar(singleton_t)],
                    Type::class(list, vec![Type::TypeVar(singleton_t)]),
                )
            },
            MethodDef {
                type_params: vec![first_t],
                is_varargs: true,
                ..static_method(
                    "first",
                    vec![Type::array(Type::TypeVar(first_t))],
                    Type::TypeVar(first_t),
                )
            },
        ],
        ..class_def("com.example.Util", ClassKind::Class, env)
    };
    (env.add_class(def), make_t, singleton_t, first_t)
}

#[test]
fn return_only_type_parameter_is_inferred_from_target_return() {
    let mut env = TypeStore::with_minimal_jdk();
    let (util, make_t, _, _) = util(&mut env);

    let site = type_site(1, Type::class(util, vec![]), "make");
    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(&env, "java.util.function.Supplier", vec![string(&env)]),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    let resolved = unique(&resolution);
    assert_eq!(resolved.substitution.get(make_t), Some(&string(&env)));
    assert_eq!(resolved.return_type, string(&env));
}

#[test]
fn parameter_inference_drives_return_type() {
    let mut env = TypeStore::with_minimal_jdk();
    let (util, _, singleton_t, _) = util(&mut env);

    let site = type_site(1, Type::class(util, vec![]), "singleton");
    let resolver = MethodRefResolver::new(targets([(
        1,
        jdk(
            &env,
            "java.util.function.Function",
            vec![integer(&env), jdk(&env, "java.util.Collection", vec![integer(&env)])],
        ),
    )]));

    let resolution = resolver.resolve(&env, &site, false).unwrap();
    let resolved = unique(&resolution);
    assert_eq!(resolved.substitution.get(singleton_t), Some(&integer(&env)));
    assert_eq!(resolved.params, vec![integer(&env)]);
    assert_eq!(
        resolved.return_type,
        jdk(&env, "java.util.List", vec![integer(&env)])
    );
}

#[test]
fn varargs_arity_mismatch_falls_back_to_degenerate_inference() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();

    let mut env = TypeStore::with_minimal_jdk();
    let (util, _, _, first_t) = util(&mut env);

    // `Util::first` as `BiFunction<String, String, Object>` absorbs both arguments.
    let site = type_site(1, Type::class(util, vec![]), "first");
    let target = jdk(
        &env,
        "java.util.function.BiFunction",
        vec![string(&env), string(&env), object(&env)],
    );
    for log_degenerate_inference in [true, false] {
        let resolver = MethodRefResolver::new(targets([(1, target.clone())])).with_config(
            MethodRefConfig {
                log_degenerate_inference,
                ..MethodRefConfig::default()
            },
        );

        let resolution = resolver.resolve(&env, &site, false).unwrap();
        let resolved = unique(&resolution);
        assert!(resolved.candidate.is_varargs);
        // Only the first target parameter's class substitution is used; `String` has no type
        // parameters, so nothing is bound.
        assert_eq!(resolved.substitution.get(first_t), None);
    }
}
