mod common;

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::Duration,
};

use common::{init_tracing, key_of};
use wrapp_di::{
    Arguments, Constructible, Container, ContainerBuilder, Descriptor, DynError, OnConflict,
    ResolveError,
};

static POOLS_BUILT: AtomicUsize = AtomicUsize::new(0);

struct Pool;
impl Constructible for Pool {
    fn descriptors() -> Vec<Descriptor> {
        vec![]
    }

    fn construct(_: Arguments) -> Result<Self, DynError> {
        POOLS_BUILT.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        Ok(Pool)
    }
}

struct Exploding;
impl Constructible for Exploding {
    fn descriptors() -> Vec<Descriptor> {
        vec![]
    }

    fn construct(_: Arguments) -> Result<Self, DynError> {
        panic!("constructor exploded");
    }
}

#[test]
fn containers_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Container>();
}

#[test]
fn concurrent_lookups_build_once() {
    init_tracing();
    let mut builder = ContainerBuilder::new();
    builder.bind_constructible::<Pool>(OnConflict::Fail).unwrap();
    let container = builder.build();

    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));
    let pools: Vec<Arc<Pool>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..num_threads)
            .map(|_| {
                let barrier = barrier.clone();
                let container = container.clone();
                scope.spawn(move || {
                    barrier.wait();
                    container.require::<Pool>(key_of::<Pool>()).unwrap()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(POOLS_BUILT.load(Ordering::SeqCst), 1);
    assert!(pools.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[test]
fn panicking_constructor_leaves_an_aborted_slot() {
    let mut builder = ContainerBuilder::new();
    builder.bind_constructible::<Exploding>(OnConflict::Fail).unwrap();
    let container = builder.build();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        container.resolve_dependency(key_of::<Exploding>())
    }));
    assert!(outcome.is_err());

    let error = container.resolve_dependency(key_of::<Exploding>()).unwrap_err();
    assert!(matches!(error, ResolveError::Aborted { .. }));
}
