use ferrous_bridge::{Component, DiError, Kernel, Resolver, ScopedServiceProvider, ServiceCollection};
use std::sync::Arc;

#[test]
fn test_self_circular_dependency() {
    struct SelfReferencing;

    let mut sc = ServiceCollection::new();
    sc.add_transient_factory::<SelfReferencing, _>(|r| {
        let _ = r.get::<SelfReferencing>();
        SelfReferencing
    });

    let sp = sc.build();
    match sp.get::<SelfReferencing>() {
        Err(DiError::Circular(path)) => {
            assert_eq!(path.len(), 2);
            assert!(path[0].contains("SelfReferencing"));
            assert!(path[1].contains("SelfReferencing"));
        }
        _ => panic!("Expected Circular error"),
    }
}

#[test]
fn test_two_level_circular_with_named_components() {
    struct A;
    struct B;

    let kernel = Kernel::new();
    kernel
        .register(Component::for_service::<A>().named("a").try_factory(|ctx| {
            ctx.get_required::<B>()?;
            Ok(A)
        }))
        .unwrap();
    kernel
        .register(Component::for_service::<B>().named("b").try_factory(|ctx| {
            ctx.get_required::<A>()?;
            Ok(B)
        }))
        .unwrap();
    let sp = ScopedServiceProvider::new(Arc::new(kernel));

    assert_eq!(
        sp.get_required::<A>().err(),
        Some(DiError::Circular(vec!["a".into(), "b".into(), "a".into()]))
    );
}

#[test]
fn test_resolution_recovers_after_cycle() {
    struct Loop;
    struct Fine(u8);

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Loop, _>(|r| {
        let _ = r.get::<Loop>();
        Loop
    });
    sc.add_transient_factory(|_| Fine(3));
    let sp = sc.build();

    assert!(matches!(sp.get::<Loop>(), Err(DiError::Circular(_))));
    assert_eq!(sp.get_required::<Fine>().unwrap().0, 3);
    assert!(matches!(sp.get::<Loop>(), Err(DiError::Circular(_))));
}

#[test]
fn test_diamond_is_not_a_cycle() {
    struct Leaf;
    struct Left(Arc<Leaf>);
    struct Right(Arc<Leaf>);
    struct Top(Arc<Left>, Arc<Right>);

    let mut sc = ServiceCollection::new();
    sc.add_singleton(Leaf);
    sc.add_transient_factory(|r| Left(r.get_required::<Leaf>().unwrap()));
    sc.add_scoped_factory(|r| Right(r.get_required::<Leaf>().unwrap()));
    sc.add_transient_factory(|r| Top(r.get_required::<Left>().unwrap(), r.get_required::<Right>().unwrap()));
    let sp = sc.build();

    let top = sp.get_required::<Top>().unwrap();
    assert!(Arc::ptr_eq(&top.0 .0, &top.1 .0));
}
