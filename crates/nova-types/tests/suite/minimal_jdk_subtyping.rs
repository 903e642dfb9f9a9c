use nova_types::{instantiate_as_supertype, is_assignable, is_subtype, Type, TypeEnv, TypeStore};

use pretty_assertions::assert_eq;

#[test]
fn minimal_jdk_interfaces_are_subtypes_of_object() {
    let env = TypeStore::with_minimal_jdk();

    let object = Type::class(env.well_known().object, vec![]);

    let list = env
        .class_id("java.util.List")
        .expect("List must exist in minimal JDK");
    let string = env.well_known().string;
    let list_string = Type::class(list, vec![Type::class(string, vec![])]);
    assert!(is_subtype(&env, &list_string, &object));

    let cloneable = Type::class(env.well_known().cloneable, vec![]);
    assert!(is_subtype(&env, &cloneable, &object));
}

#[test]
fn intersection_subtyping_is_order_independent() {
    let env = TypeStore::with_minimal_jdk();

    let cloneable = Type::class(env.well_known().cloneable, vec![]);
    let serializable = Type::class(env.well_known().serializable, vec![]);

    let ab = Type::Intersection(vec![cloneable.clone(), serializable.clone()]);
    let ba = Type::Intersection(vec![serializable.clone(), cloneable.clone()]);

    // `A & B` should be equivalent to `B & A` for subtyping purposes.
    assert!(is_subtype(&env, &ab, &ba));
    assert!(is_subtype(&env, &ba, &ab));

    // And it should be a subtype of each component.
    assert!(is_subtype(&env, &ab, &cloneable));
    assert!(is_subtype(&env, &ab, &serializable));

    // But neither component alone is a subtype of the full intersection.
    assert!(!is_subtype(&env, &cloneable, &ab));
    assert!(!is_subtype(&env, &serializable, &ab));
}

#[test]
fn parameterized_types_are_invariant_in_their_arguments() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let array_list = env.class_id("java.util.ArrayList").unwrap();
    let string = Type::class(env.well_known().string, vec![]);
    let object = Type::class(env.well_known().object, vec![]);

    let array_list_string = Type::class(array_list, vec![string.clone()]);
    assert!(is_subtype(
        &env,
        &array_list_string,
        &Type::class(list, vec![string.clone()])
    ));
    assert!(!is_subtype(
        &env,
        &array_list_string,
        &Type::class(list, vec![object])
    ));

    // Raw types convert in both directions (unchecked).
    assert!(is_subtype(&env, &Type::class(array_list, vec![]), &Type::class(list, vec![string])));
}

#[test]
fn string_is_comparable_of_string() {
    let env = TypeStore::with_minimal_jdk();
    let comparable = env.class_id("java.lang.Comparable").unwrap();
    let string = Type::class(env.well_known().string, vec![]);

    assert_eq!(
        instantiate_as_supertype(&env, &string, comparable),
        Some(Type::class(comparable, vec![string.clone()]))
    );
    assert!(is_assignable(
        &env,
        &Type::class(comparable, vec![string.clone()]),
        &string
    ));
}

#[test]
fn arrays_view_as_cloneable_and_serializable() {
    let env = TypeStore::with_minimal_jdk();
    let wk = *env.well_known();
    let int_array = Type::array(Type::int());

    for target in [wk.object, wk.cloneable, wk.serializable] {
        assert_eq!(
            instantiate_as_supertype(&env, &int_array, target),
            Some(Type::class(target, vec![]))
        );
    }
    assert_eq!(instantiate_as_supertype(&env, &int_array, wk.string), None);
}
