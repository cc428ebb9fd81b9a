use ferrous_bridge::{Dispose, Lifetime, Resolver, ServiceCollection};
use std::sync::{Arc, Mutex};

struct Tracker {
    name: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Dispose for Tracker {
    fn dispose(&self) {
        self.log.lock().unwrap().push(self.name);
    }
}

fn tracked(sc: &mut ServiceCollection, lifetime: Lifetime, name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) {
    let log = log.clone();
    sc.add_keyed_factory(name, lifetime, move |ctx| {
        ctx.register_disposer(Arc::new(Tracker { name, log: log.clone() }));
        name
    });
}

#[test]
fn test_scope_disposal_runs_hooks_in_reverse() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut sc = ServiceCollection::new();
    tracked(&mut sc, Lifetime::Scoped, "first", &log);
    tracked(&mut sc, Lifetime::Transient, "second", &log);
    let sp = sc.build();

    let scope = sp.create_scope();
    scope.get_required_keyed::<&'static str>("first").unwrap();
    scope.get_required_keyed::<&'static str>("second").unwrap();
    assert!(log.lock().unwrap().is_empty());

    scope.dispose();
    assert_eq!(*log.lock().unwrap(), vec!["second", "first"]);

    scope.dispose();
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn test_singletons_are_disposed_with_the_root() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut sc = ServiceCollection::new();
    tracked(&mut sc, Lifetime::Singleton, "single", &log);
    tracked(&mut sc, Lifetime::Scoped, "scoped", &log);
    let sp = sc.build();

    let scope = sp.create_scope();
    scope.get_required_keyed::<&'static str>("single").unwrap();
    scope.get_required_keyed::<&'static str>("scoped").unwrap();

    scope.dispose();
    assert_eq!(*log.lock().unwrap(), vec!["scoped"]);

    sp.dispose();
    assert_eq!(*log.lock().unwrap(), vec!["scoped", "single"]);
    assert!(sp.scope().is_disposed());
}

#[test]
fn test_disposer_registered_on_disposed_scope_runs_immediately() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sp = ServiceCollection::new().build();
    let scope = sp.create_scope();
    scope.dispose();

    scope.register_disposer(Arc::new(Tracker { name: "late", log: log.clone() }));
    assert_eq!(*log.lock().unwrap(), vec!["late"]);
}
