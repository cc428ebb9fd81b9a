/// Ambient scope propagation across threads, tasks and await points.
use ferrous_bridge::{
    AnyArc, Component, ComponentRegistry, Kernel, Lifetime, Resolver, ScopeStore, ScopedServiceProvider, ServiceType,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

struct Session(usize);

fn scoped_kernel() -> Kernel {
    let counter = Arc::new(AtomicUsize::new(0));
    let kernel = Kernel::new();
    kernel
        .register(
            Component::for_service::<Session>()
                .lifetime(Lifetime::Scoped)
                .factory(move |_| Session(counter.fetch_add(1, Ordering::SeqCst))),
        )
        .unwrap();
    kernel
}

fn session(instance: AnyArc) -> Arc<Session> {
    instance.downcast::<Session>().unwrap()
}

#[test]
fn test_forced_scope_drives_native_resolution() {
    let kernel = scoped_kernel();
    let ty = ServiceType::of::<Session>();
    let root = kernel.resolve(&ty).unwrap();

    let request = kernel.root_scope().create_child();
    let inside = {
        let _guard = ScopeStore::force_scope(&request);
        kernel.resolve(&ty).unwrap()
    };

    assert!(!Arc::ptr_eq(&root, &inside));
    assert!(Arc::ptr_eq(&root, &kernel.resolve(&ty).unwrap()));
}

#[test]
fn test_new_thread_does_not_inherit_forced_scope() {
    let kernel = scoped_kernel();
    let ty = ServiceType::of::<Session>();
    let outside = session(kernel.resolve(&ty).unwrap());

    let request = kernel.root_scope().create_child();
    let _guard = ScopeStore::force_scope(&request);
    let inside = session(kernel.resolve(&ty).unwrap());

    let worker = kernel.clone();
    let from_thread = thread::spawn(move || session(worker.resolve(&ServiceType::of::<Session>()).unwrap()))
        .join()
        .unwrap();

    assert!(Arc::ptr_eq(&outside, &from_thread));
    assert!(!Arc::ptr_eq(&inside, &from_thread));
}

#[test]
fn test_provider_binds_to_scope_ambient_at_creation() {
    let kernel = scoped_kernel();
    let registry: Arc<dyn ComponentRegistry> = Arc::new(kernel.clone());
    let root_provider = ScopedServiceProvider::new(registry.clone());

    let request = kernel.root_scope().create_child();
    let request_provider = {
        let _guard = ScopeStore::force_scope(&request);
        ScopedServiceProvider::new(registry)
    };

    assert!(request_provider.scope().ptr_eq(&request));
    let a = request_provider.get_required::<Session>().unwrap();
    let b = root_provider.get_required::<Session>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &request_provider.get_required::<Session>().unwrap()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scope_survives_await_inside_flow() {
    let kernel = scoped_kernel();
    let root = kernel.root_scope();
    let request = root.create_child();

    let expected = request.clone();
    let seen = ScopeStore::flow_in(request.clone(), async move {
        for _ in 0..8 {
            tokio::task::yield_now().await;
            assert!(ScopeStore::current(&root).ptr_eq(&expected));
        }
        ScopeStore::current(&root)
    })
    .await;

    assert!(seen.ptr_eq(&request));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spawned_task_resolves_outside_scope() {
    let kernel = scoped_kernel();
    let ty = ServiceType::of::<Session>();
    let outside = session(kernel.resolve(&ty).unwrap());

    let request = kernel.root_scope().create_child();
    let spawned = ScopeStore::flow_in(request, {
        let kernel = kernel.clone();
        async move {
            let inside = session(kernel.resolve(&ServiceType::of::<Session>()).unwrap());
            let background = tokio::spawn({
                let kernel = kernel.clone();
                async move { session(kernel.resolve(&ServiceType::of::<Session>()).unwrap()) }
            })
            .await
            .unwrap();
            (inside, background)
        }
    })
    .await;

    let (inside, background) = spawned;
    assert!(!Arc::ptr_eq(&inside, &outside));
    assert!(Arc::ptr_eq(&background, &outside));
}

#[tokio::test]
async fn test_concurrent_flows_do_not_leak() {
    let kernel = scoped_kernel();
    let root = kernel.root_scope();
    let left = root.create_child();
    let right = root.create_child();

    let run = |scope: ferrous_bridge::Scope| {
        let root = root.clone();
        ScopeStore::flow_in(scope.clone(), async move {
            for _ in 0..4 {
                tokio::task::yield_now().await;
                assert!(ScopeStore::current(&root).ptr_eq(&scope));
            }
        })
    };

    tokio::join!(run(left), run(right));
    assert!(ScopeStore::current(&root).ptr_eq(&root));
}
