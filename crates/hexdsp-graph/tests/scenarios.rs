//! End-to-end scenarios driving the graph the way a host callback would.

use std::sync::Arc;

use hexdsp_core::HexBlep;
use hexdsp_graph::units::{
    ApdhsrParams, ApdhsrUnit, GainUnit, HexwaveParams, HexwaveUnit, NoiseUnit, OutputUnit,
    PhasorUnit, RampUnit, SquareUnit, TriangleUnit,
};
use hexdsp_graph::{Graph, GraphConfig};

fn run_stereo(graph: &mut Graph, time: u64, frames: usize) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.0f32; frames];
    let mut right = vec![0.0f32; frames];
    {
        let mut outputs = [&mut left[..], &mut right[..]];
        graph.run(time, &[], &mut outputs);
    }
    (left, right)
}

#[test]
fn phasor_block_fills_the_host_buffer() {
    let mut graph = Graph::new(GraphConfig {
        sample_rate: 10,
        max_block_frames: 32,
        ..Default::default()
    });

    let phasor = graph.add_unit(PhasorUnit::new(1.0)).unwrap();
    let output = graph.add_unit(OutputUnit).unwrap();
    graph.connect(phasor, output, 0).unwrap();
    graph.reschedule().unwrap();

    let mut out = vec![0.0f32; 20];
    graph.run(0, &[], &mut [&mut out[..]]);

    let expected = [
        0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.0, //
        0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.0,
    ];
    for (i, (&got, &want)) in out.iter().zip(expected.iter()).enumerate() {
        assert!((got - want).abs() < 0.01, "sample {i}: {got} vs {want}");
    }
}

#[test]
fn host_buffers_longer_than_a_block_are_split_seamlessly() {
    // max_block_frames 8 forces the runner through three sub-blocks for a
    // 20-frame host buffer; the phasor's phase must carry across them.
    let mut graph = Graph::new(GraphConfig {
        sample_rate: 10,
        max_block_frames: 8,
        ..Default::default()
    });

    let phasor = graph.add_unit(PhasorUnit::new(1.0)).unwrap();
    let output = graph.add_unit(OutputUnit).unwrap();
    graph.connect(phasor, output, 0).unwrap();
    graph.reschedule().unwrap();

    let mut out = vec![0.0f32; 20];
    graph.run(0, &[], &mut [&mut out[..]]);

    let expected = [
        0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.0, //
        0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.0,
    ];
    for (i, (&got, &want)) in out.iter().zip(expected.iter()).enumerate() {
        assert!((got - want).abs() < 0.01, "sample {i}: {got} vs {want}");
    }
}

#[test]
fn one_phasor_feeds_both_stereo_channels() {
    let mut graph = Graph::new(GraphConfig {
        sample_rate: 10,
        max_block_frames: 32,
        ..Default::default()
    });

    let phasor = graph.add_unit(PhasorUnit::new(1.0)).unwrap();
    let output = graph.add_unit(OutputUnit).unwrap();
    graph.connect(phasor, output, 0).unwrap();
    graph.connect(phasor, output, 1).unwrap();
    graph.reschedule().unwrap();

    let (left, right) = run_stereo(&mut graph, 0, 20);

    let expected = [
        0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.0, //
        0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.0,
    ];
    for i in 0..20 {
        assert!((left[i] - expected[i]).abs() < 0.01, "left {i}");
        assert!((right[i] - expected[i]).abs() < 0.01, "right {i}");
    }
}

#[test]
fn fan_in_sums_on_the_shared_bus() {
    let mut graph = Graph::new(GraphConfig {
        sample_rate: 10,
        max_block_frames: 32,
        ..Default::default()
    });

    // Two constant generators into the same sink channel mix additively.
    let a = graph.add_unit(RampUnit::new(0.25, 0.25, 0)).unwrap();
    let b = graph.add_unit(RampUnit::new(0.5, 0.5, 0)).unwrap();
    let output = graph.add_unit(OutputUnit).unwrap();
    graph.connect(a, output, 0).unwrap();
    graph.connect(b, output, 0).unwrap();
    graph.reschedule().unwrap();

    let mut out = vec![0.0f32; 8];
    graph.run(0, &[], &mut [&mut out[..]]);

    assert!(out.iter().all(|&s| (s - 0.75).abs() < 1e-6));
}

#[test]
fn gain_scales_the_chain() {
    let mut graph = Graph::new(GraphConfig {
        sample_rate: 10,
        max_block_frames: 32,
        ..Default::default()
    });

    let source = graph.add_unit(RampUnit::new(1.0, 1.0, 0)).unwrap();
    let gain = graph.add_unit(GainUnit::new(0.25)).unwrap();
    let output = graph.add_unit(OutputUnit).unwrap();
    graph.connect(source, gain, 0).unwrap();
    graph.connect(gain, output, 0).unwrap();
    graph.reschedule().unwrap();

    let mut out = vec![0.0f32; 8];
    graph.run(0, &[], &mut [&mut out[..]]);

    assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
}

#[test]
fn envelope_shapes_a_constant_source() {
    let mut graph = Graph::new(GraphConfig {
        sample_rate: 10,
        max_block_frames: 32,
        ..Default::default()
    });

    let source = graph.add_unit(RampUnit::new(1.0, 1.0, 0)).unwrap();
    let env = graph
        .add_unit(ApdhsrUnit::new(ApdhsrParams {
            attack: 2,
            peak: 1.0,
            decay: 2,
            hold: 2,
            sustain: 0.5,
            release: 2,
        }))
        .unwrap();
    let output = graph.add_unit(OutputUnit).unwrap();
    graph.connect(source, env, 0).unwrap();
    graph.connect(env, output, 0).unwrap();
    graph.reschedule().unwrap();

    graph
        .unit_mut(env)
        .unwrap()
        .downcast_mut::<ApdhsrUnit>()
        .unwrap()
        .start(0);

    let mut out = vec![0.0f32; 10];
    graph.run(0, &[], &mut [&mut out[..]]);

    let expected = [0.0, 0.5, 1.0, 0.75, 0.5, 0.5, 0.5, 0.25, 0.0, 0.0];
    for (i, (&got, &want)) in out.iter().zip(expected.iter()).enumerate() {
        assert!((got - want).abs() < 0.01, "sample {i}: {got} vs {want}");
    }
}

#[test]
fn noise_first_sample_is_positive_one() {
    let mut graph = Graph::new(GraphConfig {
        sample_rate: 44100,
        max_block_frames: 32,
        ..Default::default()
    });

    let noise = graph.add_unit(NoiseUnit::new(0x0001, 440.0)).unwrap();
    let output = graph.add_unit(OutputUnit).unwrap();
    graph.connect(noise, output, 0).unwrap();
    graph.reschedule().unwrap();

    let mut out = vec![0.0f32; 4];
    graph.run(0, &[], &mut [&mut out[..]]);

    assert_eq!(out[0], 1.0);
}

#[test]
fn empty_graph_writes_exact_zeros() {
    let mut graph = Graph::new(GraphConfig::default());
    graph.reschedule().unwrap();

    let mut left = vec![0.7f32; 16];
    let mut right = vec![-0.7f32; 16];
    {
        let mut outputs = [&mut left[..], &mut right[..]];
        graph.run(0, &[], &mut outputs);
    }

    assert!(left.iter().all(|&s| s == 0.0));
    assert!(right.iter().all(|&s| s == 0.0));
}

#[test]
fn stale_schedules_emit_silence_until_rescheduled() {
    let mut graph = Graph::new(GraphConfig {
        sample_rate: 10,
        max_block_frames: 32,
        ..Default::default()
    });

    let source = graph.add_unit(RampUnit::new(1.0, 1.0, 0)).unwrap();
    let output = graph.add_unit(OutputUnit).unwrap();
    graph.connect(source, output, 0).unwrap();
    graph.reschedule().unwrap();

    let mut out = vec![0.0f32; 4];
    graph.run(0, &[], &mut [&mut out[..]]);
    assert!(out.iter().all(|&s| s == 1.0));

    // Any mutation makes the schedule stale; run must fall back to silence
    // rather than execute it.
    let gain = graph.add_unit(GainUnit::new(1.0)).unwrap();
    let _ = gain;
    out.fill(0.5);
    graph.run(4, &[], &mut [&mut out[..]]);
    assert!(out.iter().all(|&s| s == 0.0));

    graph.reschedule().unwrap();
    graph.run(8, &[], &mut [&mut out[..]]);
    assert!(out.iter().all(|&s| s == 1.0));
}

#[test]
fn parameters_change_between_callbacks() {
    let mut graph = Graph::new(GraphConfig {
        sample_rate: 10,
        max_block_frames: 32,
        ..Default::default()
    });

    let source = graph.add_unit(RampUnit::new(1.0, 1.0, 0)).unwrap();
    let gain = graph.add_unit(GainUnit::new(1.0)).unwrap();
    let output = graph.add_unit(OutputUnit).unwrap();
    graph.connect(source, gain, 0).unwrap();
    graph.connect(gain, output, 0).unwrap();
    graph.reschedule().unwrap();

    let mut out = vec![0.0f32; 4];
    graph.run(0, &[], &mut [&mut out[..]]);
    assert!(out.iter().all(|&s| (s - 1.0).abs() < 1e-6));

    // Setters go through the unit pointer; no reschedule required.
    graph
        .unit_mut(gain)
        .unwrap()
        .downcast_mut::<GainUnit>()
        .unwrap()
        .set_level(0.5);

    graph.run(4, &[], &mut [&mut out[..]]);
    assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
}

#[test]
fn output_is_invariant_to_host_buffer_slicing() {
    // The whole oscillator bank mixed into one channel, rendered once as a
    // single 240-frame buffer and once as fifteen 16-frame callbacks. The
    // streams must match exactly: unit state, hexwave correction carry, and
    // `time` all advance per sample, not per callback.
    let build = || {
        let mut graph = Graph::new(GraphConfig {
            sample_rate: 48000,
            max_block_frames: 64,
            ..Default::default()
        });

        let square = graph.add_unit(SquareUnit::new(330.0, 0.5)).unwrap();
        let triangle = graph.add_unit(TriangleUnit::new(221.0)).unwrap();
        let noise = graph.add_unit(NoiseUnit::new(0x7A7A, 1200.0)).unwrap();
        let hexwave = graph
            .add_unit(HexwaveUnit::new(
                97.0,
                HexwaveParams::default(),
                Arc::new(HexBlep::new(16, 8)),
            ))
            .unwrap();
        let output = graph.add_unit(OutputUnit).unwrap();

        graph.connect(square, output, 0).unwrap();
        graph.connect(triangle, output, 0).unwrap();
        graph.connect(noise, output, 0).unwrap();
        graph.connect(hexwave, output, 0).unwrap();
        graph.reschedule().unwrap();
        graph
    };

    let mut whole_graph = build();
    let mut whole = vec![0.0f32; 240];
    whole_graph.run(0, &[], &mut [&mut whole[..]]);

    let mut sliced_graph = build();
    let mut sliced = vec![0.0f32; 240];
    let mut time = 0u64;
    for chunk in sliced.chunks_mut(16) {
        let len = chunk.len() as u64;
        sliced_graph.run(time, &[], &mut [&mut chunk[..]]);
        time += len;
    }

    for (i, (&a, &b)) in whole.iter().zip(sliced.iter()).enumerate() {
        assert_eq!(a, b, "sample {i} diverged between buffer slicings");
    }
}

#[test]
fn interleaved_output_matches_the_planar_runner() {
    let build = || {
        let mut graph = Graph::new(GraphConfig {
            sample_rate: 10,
            max_block_frames: 8,
            ..Default::default()
        });
        let phasor = graph.add_unit(PhasorUnit::new(1.0)).unwrap();
        let ramp = graph.add_unit(RampUnit::new(0.25, 0.25, 0)).unwrap();
        let output = graph.add_unit(OutputUnit).unwrap();
        graph.connect(phasor, output, 0).unwrap();
        graph.connect(ramp, output, 1).unwrap();
        graph.reschedule().unwrap();
        graph
    };

    let mut planar_graph = build();
    let (left, right) = run_stereo(&mut planar_graph, 0, 20);

    let mut interleaved_graph = build();
    let mut interleaved = vec![0.0f32; 40];
    interleaved_graph.run_interleaved(0, &[], &mut interleaved, 0, 2);

    for i in 0..20 {
        assert!((interleaved[2 * i] - left[i]).abs() < 1e-6, "left {i}");
        assert!((interleaved[2 * i + 1] - right[i]).abs() < 1e-6, "right {i}");
    }
}

#[test]
fn interleaved_mono_and_quad_take_the_generic_path() {
    let mut graph = Graph::new(GraphConfig {
        sample_rate: 10,
        max_block_frames: 16,
        ..Default::default()
    });
    let ramp = graph.add_unit(RampUnit::new(0.5, 0.5, 0)).unwrap();
    let output = graph.add_unit(OutputUnit).unwrap();
    graph.connect(ramp, output, 0).unwrap();
    graph.connect(ramp, output, 3).unwrap();
    graph.reschedule().unwrap();

    let mut interleaved = vec![9.0f32; 32];
    graph.run_interleaved(0, &[], &mut interleaved, 0, 4);

    for frame in interleaved.chunks_exact(4) {
        assert!((frame[0] - 0.5).abs() < 1e-6);
        assert_eq!(frame[1], 0.0);
        assert_eq!(frame[2], 0.0);
        assert!((frame[3] - 0.5).abs() < 1e-6);
    }
}

#[test]
fn multiple_sinks_mix_into_the_same_host_channels() {
    let mut graph = Graph::new(GraphConfig {
        sample_rate: 10,
        max_block_frames: 32,
        ..Default::default()
    });

    let a = graph.add_unit(RampUnit::new(0.25, 0.25, 0)).unwrap();
    let b = graph.add_unit(RampUnit::new(0.5, 0.5, 0)).unwrap();
    let sink_a = graph.add_unit(OutputUnit).unwrap();
    let sink_b = graph.add_unit(OutputUnit).unwrap();
    graph.connect(a, sink_a, 0).unwrap();
    graph.connect(b, sink_b, 0).unwrap();
    graph.reschedule().unwrap();

    // Both sinks accumulate into the host buffer, so their streams sum.
    let mut out = vec![0.0f32; 8];
    graph.run(0, &[], &mut [&mut out[..]]);
    assert!(out.iter().all(|&s| (s - 0.75).abs() < 1e-6));
}

#[test]
fn sink_capacity_is_enforced_at_add_time() {
    let mut graph = Graph::new(GraphConfig {
        sink_capacity: 2,
        ..Default::default()
    });

    graph.add_unit(OutputUnit).unwrap();
    graph.add_unit(OutputUnit).unwrap();
    assert!(graph.add_unit(OutputUnit).is_err());

    // Non-sink units are unaffected by the sink limit.
    graph.add_unit(PhasorUnit::new(1.0)).unwrap();
}

#[test]
fn removing_a_unit_reroutes_after_reschedule() {
    let mut graph = Graph::new(GraphConfig {
        sample_rate: 10,
        max_block_frames: 32,
        ..Default::default()
    });

    let source = graph.add_unit(RampUnit::new(1.0, 1.0, 0)).unwrap();
    let gain = graph.add_unit(GainUnit::new(0.5)).unwrap();
    let output = graph.add_unit(OutputUnit).unwrap();
    graph.connect(source, gain, 0).unwrap();
    graph.connect(gain, output, 0).unwrap();
    graph.reschedule().unwrap();

    graph.remove_unit(gain).unwrap();
    graph.reschedule().unwrap();

    // The source no longer reaches the sink; output is silent.
    let mut out = vec![0.0f32; 4];
    graph.run(0, &[], &mut [&mut out[..]]);
    assert!(out.iter().all(|&s| s == 0.0));

    // Reconnect directly and the signal flows again.
    graph.connect(source, output, 0).unwrap();
    graph.reschedule().unwrap();
    graph.run(4, &[], &mut [&mut out[..]]);
    assert!(out.iter().all(|&s| s == 1.0));
}
