use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use fairqueue::{Scheduler, SchedulerConfig};

const CLASSES: [(&str, f64); 3] = [("gold", 4.0), ("silver", 2.0), ("bronze", 1.0)];

async fn scheduler() -> Scheduler {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    for (id, weight) in CLASSES {
        scheduler.register_class(id, weight).await.unwrap();
    }
    scheduler
}

fn bench_admission(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("admission");

    // Dispatcher not started, so each request sits queued until cancelled
    group.bench_function("submit_cancel", |b| {
        let scheduler = rt.block_on(scheduler());
        b.iter(|| {
            rt.block_on(async {
                let completion = scheduler.submit(black_box("silver"), 100).await.unwrap();
                scheduler.cancel(completion.request_id()).await.unwrap();
                black_box(completion);
            })
        });
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("dispatch");

    group.bench_function("drain_backlog_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                let scheduler = scheduler().await;
                let mut completions = Vec::with_capacity(1000);
                for i in 0..1000u64 {
                    let (class, _) = CLASSES[(i % 3) as usize];
                    completions.push(scheduler.submit(class, 1 + i % 500).await.unwrap());
                }

                scheduler.start().await.unwrap();
                for completion in completions {
                    black_box(completion.wait().await.unwrap());
                }
                scheduler.stop().await.unwrap();
            })
        });
    });

    group.bench_function("submit_and_wait", |b| {
        let scheduler = rt.block_on(async {
            let scheduler = scheduler().await;
            scheduler.start().await.unwrap();
            scheduler
        });
        b.iter(|| {
            rt.block_on(async {
                let completion = scheduler.submit("gold", 100).await.unwrap();
                black_box(completion.wait().await.unwrap());
            })
        });
        rt.block_on(scheduler.stop()).unwrap();
    });

    group.finish();
}

criterion_group!(benches, bench_admission, bench_dispatch);
criterion_main!(benches);
