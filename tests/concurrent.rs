/// Concurrent access tests
///
/// Many threads resolving through one provider must agree on singletons,
/// build each scoped instance once per scope, and never observe another
/// thread's forced scope.
use crossbeam_utils::thread;
use ferrous_bridge::{Resolver, ScopeStore, ServiceCollection, ServiceKey, ServiceType};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

const THREADS: usize = 8;

struct Expensive(usize);

#[test]
#[serial]
fn test_singleton_is_built_once_under_contention() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory(move |_| Expensive(counter.fetch_add(1, Ordering::SeqCst)));
    let sp = sc.build();
    let barrier = Barrier::new(THREADS);

    let resolved: Vec<Arc<Expensive>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    sp.get_required::<Expensive>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    for instance in &resolved {
        assert!(Arc::ptr_eq(instance, &resolved[0]));
    }
    // Losers of the race may build, but only the winner is ever handed out
    assert!(builds.load(Ordering::SeqCst) >= 1);
}

#[test]
#[serial]
fn test_each_thread_scope_is_isolated() {
    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory(|ctx| ctx.scope().id());
    let sp = sc.build();

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                let scope = sp.create_scope();
                for _ in 0..50 {
                    let id = scope.get_required::<u64>().unwrap();
                    assert_eq!(*id, scope.scope().id());
                }
                let outside = sp.get_required::<u64>().unwrap();
                assert_eq!(*outside, sp.scope().id());
            });
        }
    })
    .unwrap();
}

#[test]
#[serial]
fn test_forced_scopes_do_not_cross_threads() {
    let sp = ServiceCollection::new().build();
    let root = sp.scope().clone();

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                let mine = root.create_child();
                let _guard = ScopeStore::force_scope(&mine);
                for _ in 0..100 {
                    assert!(ScopeStore::current(&root).ptr_eq(&mine));
                    std::thread::yield_now();
                }
            });
        }
    })
    .unwrap();

    assert!(ScopeStore::current(&root).ptr_eq(&root));
}

#[test]
#[serial]
fn test_keyed_index_first_use_race() {
    let mut sc = ServiceCollection::new();
    for key in 0..16i64 {
        sc.add_keyed_singleton(key, key as usize);
    }
    let sp = sc.build();
    let barrier = Barrier::new(THREADS);

    thread::scope(|s| {
        for t in 0..THREADS {
            let sp = &sp;
            let barrier = &barrier;
            s.spawn(move |_| {
                barrier.wait();
                let key = ServiceKey::from((t % 16) as i64);
                assert!(sp.is_keyed_service(&ServiceType::of::<usize>(), Some(&key)));
                assert_eq!(*sp.get_required_keyed::<usize>(key).unwrap(), t % 16);
            });
        }
    })
    .unwrap();
}
