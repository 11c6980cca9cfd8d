#[path = "../tests/common/mod.rs"]
mod common;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kmu2_core::Event;
use kmu2_select::sink::DiagnosticsSink;
use kmu2_select::{CutFlow, HistogramBook, SelectionConfig, SelectionPipeline};

fn sample_events() -> Vec<Event> {
    (0..1_000)
        .map(|i| {
            let mut event = common::kmu2_event();
            event.burst_id = i / 100;
            // every fourth event drifts out of time in the LKr
            if i % 4 == 0 {
                event.lkr[0].time += 250.0;
            }
            event
        })
        .collect()
}

fn bench_pipeline(c: &mut Criterion) {
    let pipeline = SelectionPipeline::new(SelectionConfig::kmu2()).expect("pipeline");
    let events = sample_events();

    c.bench_function("kmu2_selection_1k", |b| {
        b.iter(|| {
            let accepted = events
                .iter()
                .filter(|event| pipeline.run(black_box(event)).accepted)
                .count();
            black_box(accepted)
        });
    });

    c.bench_function("kmu2_selection_with_sinks_1k", |b| {
        b.iter(|| {
            let mut flow = CutFlow::new(&pipeline.stage_ids());
            let mut book = HistogramBook::standard(false);
            for event in &events {
                let outcome = pipeline.run(event);
                flow.record(&outcome);
                book.record(&outcome);
            }
            black_box((flow.accepted, book.histograms.len()))
        });
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
