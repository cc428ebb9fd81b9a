use ferrous_bridge::{
    AnyArc, Component, DiError, GenericDefinition, Kernel, KeyedRegistrationIndex, Lifetime, Resolver,
    ScopedServiceProvider, ServiceCollection, ServiceKey, ServiceType,
};
use std::sync::Arc;

#[derive(Debug)]
struct Store(&'static str);

fn keyed_and_plain() -> ScopedServiceProvider {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(Store("plain"));
    sc.add_keyed_singleton("k1", Store("keyed"));
    sc.build()
}

#[test]
fn test_keyed_registration_invisible_to_unkeyed_lookup() {
    let sp = keyed_and_plain();

    assert_eq!(sp.get_required::<Store>().unwrap().0, "plain");
    let all = sp.get_all::<Store>().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].0, "plain");
}

#[test]
fn test_keyed_lookup_finds_only_its_key() {
    let sp = keyed_and_plain();

    assert_eq!(sp.get_required_keyed::<Store>("k1").unwrap().0, "keyed");
    assert!(sp.get_keyed::<Store>("k2").unwrap().is_none());
    assert!(matches!(
        sp.get_required_keyed::<Store>("k2"),
        Err(DiError::NotRegistered(_))
    ));
}

#[test]
fn test_null_key_is_the_unkeyed_path() {
    let sp = keyed_and_plain();
    let ty = ServiceType::of::<Store>();

    let via_keyed = sp.get_keyed_service(&ty, None).unwrap().unwrap();
    let via_plain = sp.get_service(&ty).unwrap().unwrap();
    assert!(Arc::ptr_eq(&via_keyed, &via_plain));

    let missing = ServiceType::of::<u64>();
    assert!(sp.get_keyed_service(&missing, None).unwrap().is_none());
    assert_eq!(
        sp.get_required_keyed_service(&missing, None).unwrap_err(),
        sp.get_required_service(&missing).unwrap_err()
    );
}

#[test]
fn test_keyed_only_service_is_not_resolvable_unkeyed() {
    let mut sc = ServiceCollection::new();
    sc.add_keyed_singleton("only", Store("keyed"));
    let sp = sc.build();

    assert!(sp.get::<Store>().unwrap().is_none());
    assert!(sp.get_all::<Store>().unwrap().is_empty());
    assert!(sp.get_keyed::<Store>("only").unwrap().is_some());
}

#[test]
fn test_integer_and_string_keys_are_distinct() {
    let mut sc = ServiceCollection::new();
    sc.add_keyed_singleton(1i64, Store("one"));
    sc.add_keyed_singleton("1", Store("string one"));
    let sp = sc.build();

    assert_eq!(sp.get_required_keyed::<Store>(1i64).unwrap().0, "one");
    assert_eq!(sp.get_required_keyed::<Store>("1").unwrap().0, "string one");
}

#[test]
fn test_keyed_factory_sees_its_key() {
    let mut sc = ServiceCollection::new();
    for name in ["east", "west"] {
        sc.add_keyed_factory(name, Lifetime::Scoped, |ctx| {
            ctx.service_key().map(ServiceKey::to_string).unwrap_or_default()
        });
    }
    let sp = sc.build();

    assert_eq!(*sp.get_required_keyed::<String>("west").unwrap(), "west");
    assert_eq!(*sp.get_required_keyed::<String>("east").unwrap(), "east");
}

#[test]
fn test_duplicate_key_last_registration_wins() {
    let mut sc = ServiceCollection::new();
    sc.add_keyed_singleton("k", Store("first"));
    sc.add_keyed_singleton("k", Store("second"));
    let sp = sc.build();

    assert_eq!(sp.get_required_keyed::<Store>("k").unwrap().0, "second");
    assert_eq!(sp.get_keyed_all::<Store>("k").unwrap().len(), 2);
}

#[test]
fn test_keyed_collection_collects_matching_entries() {
    let mut sc = ServiceCollection::new();
    sc.add_keyed_singleton("red", Store("r1"));
    sc.add_keyed_singleton("blue", Store("b1"));
    sc.add_keyed_singleton("red", Store("r2"));
    sc.add_singleton(Store("plain"));
    let sp = sc.build();

    let reds: Vec<&str> = sp.get_keyed_all::<Store>("red").unwrap().iter().map(|s| s.0).collect();
    assert_eq!(reds, vec!["r1", "r2"]);
    assert!(sp.get_keyed_all::<Store>("green").unwrap().is_empty());
}

#[test]
fn test_keyed_collection_skips_incompatible_open_generics() {
    const QUEUE: GenericDefinition = GenericDefinition::new("Queue", 1);
    let u8_queue = QUEUE.close([ServiceType::of::<u8>()]);

    let kernel = Kernel::new();
    kernel
        .register(
            Component::for_generic(QUEUE)
                .keyed("jobs")
                .constraint(|args| args[0] == ServiceType::of::<u16>())
                .factory(|_, _| Ok(Arc::new(Store("u16 queue")) as AnyArc)),
        )
        .unwrap();
    kernel
        .register(
            Component::for_generic(QUEUE)
                .keyed("jobs")
                .lifetime(Lifetime::Transient)
                .factory(|_, _| Ok(Arc::new(Store("any queue")) as AnyArc)),
        )
        .unwrap();
    let sp = ScopedServiceProvider::new(Arc::new(kernel));

    let key = ServiceKey::from("jobs");
    let list = sp
        .get_required_keyed_service(&ServiceType::collection_of(u8_queue), Some(&key))
        .unwrap();
    let list = list.downcast::<ferrous_bridge::ServiceList>().unwrap();
    let labels: Vec<&str> = list.downcast::<Store>().unwrap().iter().map(|s| s.0).collect();
    assert_eq!(labels, vec!["any queue"]);
}

#[test]
fn test_is_keyed_service_ignores_type() {
    let sp = keyed_and_plain();
    let k1 = ServiceKey::from("k1");

    assert!(sp.is_keyed_service(&ServiceType::of::<Store>(), Some(&k1)));
    assert!(sp.is_keyed_service(&ServiceType::of::<u64>(), Some(&k1)));
    assert!(!sp.is_keyed_service(&ServiceType::of::<Store>(), Some(&ServiceKey::from("nope"))));
    assert!(sp.is_keyed_service(&ServiceType::of::<Store>(), None));
    assert!(!sp.is_keyed_service(&ServiceType::of::<u64>(), None));
}

#[test]
fn test_key_membership_sees_later_registrations() {
    let kernel = Kernel::new();
    kernel
        .register(Component::for_service::<u8>().keyed("a").instance(1u8))
        .unwrap();
    let sp = ScopedServiceProvider::new(Arc::new(kernel.clone()));
    let b = ServiceKey::from("b");

    assert!(sp.is_keyed_service(&ServiceType::of::<u8>(), Some(&ServiceKey::from("a"))));
    assert!(!sp.is_keyed_service(&ServiceType::of::<u16>(), Some(&b)));

    kernel
        .register(Component::for_service::<u16>().keyed("b").instance(2u16))
        .unwrap();

    assert_eq!(*sp.get_required_keyed::<u16>("b").unwrap(), 2);
    assert!(sp.is_keyed_service(&ServiceType::of::<u16>(), Some(&b)));
}

#[test]
fn test_index_is_shared_per_registry() {
    let kernel = Kernel::new();
    kernel
        .register(Component::for_service::<Store>().keyed(3i64).instance(Store("three")))
        .unwrap();

    let first = KeyedRegistrationIndex::get_instance(&kernel);
    let second = KeyedRegistrationIndex::get_instance(&kernel);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.has_key(&kernel, &ServiceKey::from(3i64)));

    let wrapped = Arc::new(kernel.clone());
    assert!(Arc::ptr_eq(&first, &KeyedRegistrationIndex::get_instance(&wrapped)));

    let other = Kernel::new();
    let third = KeyedRegistrationIndex::get_instance(&other);
    assert!(!Arc::ptr_eq(&first, &third));
    assert!(!third.has_key(&other, &ServiceKey::from(3i64)));
}
