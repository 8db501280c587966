use std::time::Duration;

use loops::gradient::Color;
use loops::lemniscate::lemniscate_point;
use loops::loops::{LemniscateRings, Loop, LoopClock, LoopConfig};
use loops::palette::{Palette, FLORIANDELOOIJ_2};
use loops::render_job::RenderMetadata;

fn seeded(seed: u64) -> LemniscateRings {
    LemniscateRings::new(LoopConfig {
        seed: Some(seed),
        ..LoopConfig::default()
    })
    .unwrap()
}

fn buffer_bits(l: &LemniscateRings) -> Vec<u32> {
    l.instances()
        .attributes()
        .iter()
        .flat_map(|attr| attr.values.iter().map(|v| v.to_bits()))
        .collect()
}

#[test]
fn default_loop_has_2000_instances() {
    let l = seeded(1);
    assert_eq!(l.instances().count(), 2000);
    assert_eq!(l.instances().positions.values.len(), 2000 * 3);
    assert_eq!(l.instances().quaternions.values.len(), 2000 * 4);
    assert_eq!(l.instances().scales.values.len(), 2000 * 3);
    assert_eq!(l.instances().colors.values.len(), 2000 * 4);
}

#[test]
fn buffers_repeat_bitwise_every_loop() {
    let mut l = seeded(7);
    let duration = l.loop_duration();

    for base_ms in [0u64, 17, 1250, 2999] {
        let base = Duration::from_millis(base_ms);
        l.draw(base);
        let first = buffer_bits(&l);
        for k in [1u32, 2, 10] {
            l.draw(base + duration * k);
            assert_eq!(first, buffer_bits(&l), "mismatch at {:?} + {}x loop", base, k);
        }
    }
}

#[test]
fn loop_boundary_matches_start() {
    let mut l = seeded(3);
    l.draw(Duration::ZERO);
    let start = buffer_bits(&l);
    l.draw(Duration::from_secs(3));
    assert_eq!(start, buffer_bits(&l));
}

#[test]
fn frames_cover_one_loop_without_duplicating_the_first() {
    let clock = LoopClock::from_secs_f64(3.0);
    let times: Vec<f32> = (0..180)
        .map(|i| clock.normalized_time(LoopClock::frame_time(i, 60.0)))
        .collect();
    assert_eq!(times[0], 0.0);
    assert!(times.windows(2).all(|w| w[0] < w[1]));
    assert!(*times.last().unwrap() < 1.0);
    assert_eq!(clock.normalized_time(LoopClock::frame_time(180, 60.0)), 0.0);
}

#[test]
fn every_frame_keeps_invariants() {
    let mut l = seeded(11);
    let palette = Palette::from_hex(&FLORIANDELOOIJ_2).unwrap();
    let (lo, hi) = channel_bounds(palette.gradient().stops());

    for frame in 0..24u64 {
        l.draw(LoopClock::frame_time(frame * 7, 60.0));
        let inst = l.instances();

        for q in inst.quaternions.values.chunks(4) {
            let n = q.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((n - 1.0).abs() < 1e-4, "non-unit quaternion {:?}", q);
        }
        assert!(inst.scales.values.iter().all(|&s| s >= 0.0));
        assert!(inst.positions.values.iter().all(|v| v.is_finite()));
        for rgba in inst.colors.values.chunks(4) {
            for c in 0..3 {
                assert!(rgba[c] >= lo[c] - 1e-6 && rgba[c] <= hi[c] + 1e-6);
            }
            assert_eq!(rgba[3], 1.0);
        }
    }
}

fn channel_bounds(stops: &[Color]) -> ([f32; 3], [f32; 3]) {
    let mut lo = [f32::MAX; 3];
    let mut hi = [f32::MIN; 3];
    for stop in stops {
        for (c, v) in stop.to_array().into_iter().enumerate() {
            lo[c] = lo[c].min(v);
            hi[c] = hi[c].max(v);
        }
    }
    (lo, hi)
}

#[test]
fn head_instance_sits_on_curve_offset_by_base_radius() {
    let mut l = seeded(5);
    l.draw(Duration::ZERO);
    let offset = l.phase_offsets()[0];
    let p = lemniscate_point(offset);
    let got = l.instances().positions.get(l.instance_index(0, 0));
    assert!((got[0] - (p.x + 0.05)).abs() < 1e-5);
    assert!((got[1] - p.y).abs() < 1e-5);
    assert!((got[2] - 0.05).abs() < 1e-5);
}

#[test]
fn same_seed_same_fingerprint() {
    let mut a = seeded(99);
    let mut b = seeded(99);
    a.update(0.0);
    b.update(0.0);
    assert_eq!(
        RenderMetadata::fingerprint_instances(a.instances()),
        RenderMetadata::fingerprint_instances(b.instances())
    );

    let mut c = seeded(100);
    c.update(0.0);
    assert_ne!(
        RenderMetadata::fingerprint_instances(a.instances()),
        RenderMetadata::fingerprint_instances(c.instances())
    );
}
