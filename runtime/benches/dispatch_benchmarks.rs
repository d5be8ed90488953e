//! Dispatch Benchmarks
//!
//! Measures the synchronous dispatch path and effect scheduling:
//! - Reducer execution in isolation
//! - Store dispatch throughput (reduce + publish)
//! - Scheduling cost of the restart idiom (cancel + keyed launch)
//! - Fan-out through a delegating store
//!
//! Run with: `cargo bench`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use statefx_core::error::ReduceError;
use statefx_core::reducer::{Context, ExpandContext, Reducer};
use statefx_runtime::{DelegatingStore, ReducerDelegateExt, Store, StoreConfig};
use std::time::Duration;
use tokio::runtime::Runtime;

#[derive(Clone, Debug, Default)]
struct BenchState {
    counter: i64,
    query: String,
}

#[derive(Clone, Debug)]
enum BenchAction {
    Increment,
    SetValue(i64),
    Search(String),
}

#[derive(Debug)]
struct BenchEnv;

#[derive(Clone)]
struct BenchReducer;

impl Reducer for BenchReducer {
    type State = BenchState;
    type Action = BenchAction;
    type Environment = BenchEnv;

    fn reduce(
        &self,
        state: &BenchState,
        action: BenchAction,
        ctx: &mut Context<'_, BenchEnv, BenchAction>,
    ) -> Result<BenchState, ReduceError> {
        match action {
            BenchAction::Increment => Ok(BenchState {
                counter: state.counter + 1,
                query: state.query.clone(),
            }),
            BenchAction::SetValue(value) => Ok(BenchState {
                counter: value,
                query: state.query.clone(),
            }),
            BenchAction::Search(query) => {
                ctx.cancel_effect("search");
                ctx.effect_with_id("search", |_| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                });
                Ok(BenchState {
                    counter: state.counter,
                    query,
                })
            },
        }
    }
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

fn store(runtime: &Runtime) -> Store<BenchState, BenchAction, BenchEnv> {
    let config = StoreConfig::default().with_runtime(runtime.handle().clone());
    Store::with_config(BenchState::default(), BenchReducer, BenchEnv, config).expect("Failed to build store")
}

/// Benchmark reducer execution in isolation (no Store overhead)
fn benchmark_reducer_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("reducer");
    group.throughput(Throughput::Elements(1));

    let state = BenchState::default();

    group.bench_function("increment", |b| {
        b.iter(|| {
            let mut ctx = Context::new(&BenchEnv);
            BenchReducer.reduce(&state, black_box(BenchAction::Increment), &mut ctx)
        });
    });

    group.bench_function("set_value", |b| {
        b.iter(|| {
            let mut ctx = Context::new(&BenchEnv);
            BenchReducer.reduce(&state, black_box(BenchAction::SetValue(42)), &mut ctx)
        });
    });

    group.finish();
}

/// Benchmark Store throughput (actions/sec)
fn benchmark_store_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_dispatch");
    group.throughput(Throughput::Elements(1));

    let runtime = runtime();

    group.bench_function("dispatch", |b| {
        let store = store(&runtime);
        b.iter(|| store.dispatch(black_box(BenchAction::Increment)));
    });

    group.bench_function("dispatch_and_read_state", |b| {
        let store = store(&runtime);
        b.iter(|| {
            let _ = store.dispatch(black_box(BenchAction::Increment));
            store.read(|s| s.counter)
        });
    });

    group.finish();
}

/// Benchmark scheduling of the restart idiom: cancel, then launch by id
fn benchmark_restart_idiom(c: &mut Criterion) {
    let mut group = c.benchmark_group("effects");
    group.throughput(Throughput::Elements(1));

    let runtime = runtime();

    group.bench_function("cancel_and_launch", |b| {
        let store = store(&runtime);
        b.iter(|| store.dispatch(black_box(BenchAction::Search("rust".to_string()))));
    });

    group.finish();
}

/// Benchmark fan-out through a delegating store
fn benchmark_delegating_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("delegating");
    group.throughput(Throughput::Elements(4));

    let runtime = runtime();
    let _guard = runtime.enter();

    group.bench_function("fan_out_4", |b| {
        let delegates = (0..4)
            .map(|_| {
                ReducerDelegateExt::delegate(
                    BenchReducer,
                    BenchState::default(),
                    BenchEnv,
                    |action: &i64| Some(BenchAction::SetValue(*action)),
                    |_ctx: &mut ExpandContext<'_, (), i64>, parent: &i64, child: &BenchState| parent + child.counter,
                )
                .expect("Failed to build delegate")
            })
            .collect();
        let composite = DelegatingStore::new(0_i64, (), delegates).expect("Failed to build composite");

        b.iter(|| composite.dispatch(black_box(1)));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_reducer_execution,
    benchmark_store_dispatch,
    benchmark_restart_idiom,
    benchmark_delegating_fan_out,
);
criterion_main!(benches);
