use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Barrier,
};
use std::thread;

use aspectscope::{pointcut::BuildObserver, prelude::*};
use rayon::prelude::*;

const THREADS: usize = 16;

fn counting_observer() -> (BuildObserver, Arc<AtomicUsize>) {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let observer: BuildObserver = Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (observer, builds)
}

#[test]
fn concurrent_first_use_builds_once() -> Result<()> {
    let registry = Arc::new(TypeRegistry::new());
    let service = TypeBuilder::class("app.Service").build(&registry)?;
    let set_name = MethodBuilder::new(service, "setName")
        .param(Builtin::String.token())
        .build(&registry)?;
    let (observer, builds) = counting_observer();

    let pointcut = Arc::new(
        ExpressionPointcut::new(registry, AspectConfig::default())
            .with_expression("execution(* set*(..)) && args(name)")
            .with_observer(observer),
    );
    pointcut.set_parameters(&["name".to_string()], &[Builtin::String.token()])?;

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|index| {
            let pointcut = pointcut.clone();
            let barrier = barrier.clone();
            thread::spawn(move || -> Result<bool> {
                barrier.wait();
                let argument = Value::from(format!("caller-{index}"));
                let mut context = CallContext::new();
                pointcut.matches_at_runtime(set_name, service, &[argument], &mut context)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().expect("matcher thread panicked")?);
    }
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(pointcut.cached_shadow_matches(), 1);
    Ok(())
}

#[test]
fn parallel_matching_across_methods() -> Result<()> {
    let registry = Arc::new(TypeRegistry::new());
    let service = TypeBuilder::class("app.Service").build(&registry)?;
    let methods = (0..64)
        .map(|index| {
            let name = if index % 2 == 0 {
                format!("set{index}")
            } else {
                format!("get{index}")
            };
            MethodBuilder::new(service, &name).build(&registry)
        })
        .collect::<Result<Vec<_>>>()?;
    let (observer, builds) = counting_observer();

    let pointcut = ExpressionPointcut::new(registry, AspectConfig::default())
        .with_expression("execution(* set*(..))")
        .with_observer(observer);

    let matched = (0..8)
        .into_par_iter()
        .flat_map_iter(|_| methods.iter())
        .map(|method| pointcut.method_matches_statically(*method, service, false))
        .collect::<Result<Vec<bool>>>()?;

    assert_eq!(matched.iter().filter(|matched| **matched).count(), 8 * 32);
    assert_eq!(builds.load(Ordering::SeqCst), methods.len());
    assert_eq!(pointcut.cached_shadow_matches(), methods.len());
    Ok(())
}

#[test]
fn expression_change_during_matching_stays_consistent() -> Result<()> {
    let registry = Arc::new(TypeRegistry::new());
    let service = TypeBuilder::class("app.Service").build(&registry)?;
    let run = MethodBuilder::new(service, "run").build(&registry)?;
    let pointcut = Arc::new(
        ExpressionPointcut::new(registry, AspectConfig::default()).with_expression("execution(* run())"),
    );

    thread::scope(|scope| {
        let reader = scope.spawn(|| -> Result<()> {
            for _ in 0..200 {
                pointcut.method_matches_statically(run, service, false)?;
            }
            Ok(())
        });
        for round in 0..50 {
            let expression = if round % 2 == 0 {
                "execution(* stop())"
            } else {
                "execution(* run())"
            };
            pointcut.set_expression(expression);
        }
        reader.join().expect("reader thread panicked")
    })?;

    pointcut.set_expression("execution(* run())");
    assert!(pointcut.method_matches_statically(run, service, false)?);
    Ok(())
}
