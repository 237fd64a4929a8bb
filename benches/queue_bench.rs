use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clinic_pipeline::{
    Dequeued, Patient, PatientQueue, ShutdownSignal, Specialty, SpecialtyTable, StatsAggregator,
};

fn bench_patient_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("patient_queue");

    group.bench_function("enqueue_dequeue", |b| {
        let queue = PatientQueue::new(Specialty::Surgery);
        let shutdown = ShutdownSignal::new();
        let mut id = 0u64;

        b.iter(|| {
            id += 1;
            queue
                .enqueue(black_box(Patient::new(id, Specialty::Surgery)))
                .unwrap();
            black_box(queue.dequeue_blocking(&shutdown, None));
        });
    });

    group.bench_function("dequeue_empty_with_deadline", |b| {
        let queue = PatientQueue::new(Specialty::Cardiology);
        let shutdown = ShutdownSignal::new();

        b.iter(|| {
            let deadline = Instant::now() + Duration::from_micros(1);
            match queue.dequeue_blocking(&shutdown, Some(deadline)) {
                Dequeued::TimedOut => {}
                other => panic!("unexpected {other:?}"),
            }
        });
    });

    group.bench_function("cross_thread_handoff", |b| {
        let queue = Arc::new(PatientQueue::new(Specialty::Paediatrics));
        let shutdown = ShutdownSignal::new();
        let consumer = {
            let queue = queue.clone();
            let shutdown = shutdown.clone();
            std::thread::spawn(move || {
                let mut seen = 0u64;
                while let Dequeued::Patient(patient) = queue.dequeue_blocking(&shutdown, None) {
                    seen += black_box(patient.id) & 1;
                }
                seen
            })
        };

        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            queue.enqueue(Patient::new(id, Specialty::Paediatrics)).unwrap();
        });

        shutdown.trigger();
        black_box(consumer.join().unwrap());
    });
}

fn bench_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing");

    group.bench_function("route_by_specialty", |b| {
        let queues = SpecialtyTable::from_fn(PatientQueue::new);
        let shutdown = ShutdownSignal::new();
        let mut id = 0u64;

        b.iter(|| {
            id += 1;
            let specialty = Specialty::ALL[(id % 3) as usize];
            queues[specialty].enqueue(Patient::new(id, specialty)).unwrap();
            black_box(queues[specialty].dequeue_blocking(&shutdown, None));
        });
    });

    group.bench_function("record_outcomes", |b| {
        let stats = StatsAggregator::new();

        b.iter(|| {
            stats.record_arrival();
            stats.record_success();
            black_box(stats.success_rate());
        });
    });
}

criterion_group!(benches, bench_patient_queue, bench_routing);
criterion_main!(benches);
