use hexdsp_core::{Unit, UnitInfo};

/// The terminal sink: accumulates its mixed input buses into the
/// host-provided output channels, channel for channel.
pub struct OutputUnit;

impl Unit for OutputUnit {
    fn debug_name(&self) -> &'static str {
        "output"
    }

    fn info(&self) -> UnitInfo {
        UnitInfo {
            num_max_inputs: 16,
            num_max_outputs: 0,
            is_sink: true,
        }
    }

    fn run(&mut self, _time: u64, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        for (out, input) in outputs.iter_mut().zip(inputs.iter()) {
            for i in 0..out.len() {
                out[i] += input[i];
            }
        }
    }
}

impl From<OutputUnit> for Box<dyn Unit> {
    fn from(unit: OutputUnit) -> Self {
        Box::new(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_each_channel_additively() {
        let mut output = OutputUnit;

        let left = vec![0.1f32, 0.2, 0.3];
        let right = vec![-0.1f32, -0.2, -0.3];
        let mut host_l = vec![1.0f32; 3];
        let mut host_r = vec![1.0f32; 3];
        {
            let inputs = [&left[..], &right[..]];
            let mut outputs = [&mut host_l[..], &mut host_r[..]];
            output.run(0, &inputs, &mut outputs);
        }

        for i in 0..3 {
            assert!((host_l[i] - (1.0 + left[i])).abs() < 1e-6);
            assert!((host_r[i] - (1.0 + right[i])).abs() < 1e-6);
        }
    }

    #[test]
    fn extra_host_channels_are_left_alone() {
        let mut output = OutputUnit;

        let mono = vec![0.5f32; 2];
        let mut host_l = vec![0.0f32; 2];
        let mut host_r = vec![0.0f32; 2];
        {
            let inputs = [&mono[..]];
            let mut outputs = [&mut host_l[..], &mut host_r[..]];
            output.run(0, &inputs, &mut outputs);
        }

        assert!(host_l.iter().all(|&s| (s - 0.5).abs() < 1e-6));
        assert!(host_r.iter().all(|&s| s == 0.0));
    }
}
