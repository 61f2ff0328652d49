use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};
use optical_v2v::communication::channel::OpticalChannel;
use optical_v2v::communication::codec::Signal;
use optical_v2v::communication::messages::VehicleId;
use optical_v2v::config::DeliveryMode;

fn bench_fan_out_transmit(c: &mut Criterion) {
    let listener_counts = [2, 8, 32];
    let sender = VehicleId::from("CarA");
    let signal = Signal::from_samples(vec![0.5; 8 * 64]);

    let mut group = c.benchmark_group("fan_out_transmit");

    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    for &count in &listener_counts {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            // A fresh channel per batch keeps the inboxes from growing without bound.
            b.iter_batched(
                || {
                    let channel = OpticalChannel::new(DeliveryMode::FanOut);
                    let taps: Vec<_> = (0..count)
                        .map(|i| channel.attach(&VehicleId::new(format!("Car{}", i))))
                        .collect();
                    (channel, taps)
                },
                |(channel, taps)| {
                    channel.transmit(&sender, signal.clone());
                    black_box(channel.delivered());
                    black_box(taps);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fan_out_transmit);
criterion_main!(benches);
