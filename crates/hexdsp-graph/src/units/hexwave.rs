use std::sync::Arc;

use hexdsp_core::{HexBlep, Unit, UnitInfo};

/// Shape parameters for the six-segment waveform.
///
/// One period is six line segments derived from these four controls. The
/// defaults describe a sawtooth; `reflect` mirrors the second half in time
/// instead of rotating it, `peak_time` pushes the peak later into the half
/// period, `half_height` sets the level at the half-period point, and
/// `zero_wait` inserts a flat zero segment at the start of each half.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexwaveParams {
    pub reflect: bool,
    pub peak_time: f32,
    pub half_height: f32,
    pub zero_wait: f32,
}

impl Default for HexwaveParams {
    fn default() -> Self {
        Self {
            reflect: true,
            peak_time: 0.0,
            half_height: 0.0,
            zero_wait: 0.0,
        }
    }
}

fn sanitize(p: HexwaveParams) -> HexwaveParams {
    HexwaveParams {
        reflect: p.reflect,
        peak_time: p.peak_time.clamp(0.0, 1.0),
        half_height: p.half_height,
        zero_wait: p.zero_wait.clamp(0.0, 1.0),
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Vertex {
    t: f32,
    v: f32,
    s: f32,
}

/// Derive the nine (time, value, slope) vertices describing one period.
/// Zero-length segments mark value discontinuities and keep a slope of 0.
fn derive_vertices(p: &HexwaveParams) -> [Vertex; 9] {
    let mut v = [Vertex::default(); 9];

    v[1].t = p.zero_wait * 0.5;
    v[2].t = 0.5 * p.peak_time + v[1].t * (1.0 - p.peak_time);
    v[2].v = 1.0;
    v[3].t = 0.5;
    v[3].v = p.half_height;

    if p.reflect {
        for j in 4..=7 {
            v[j].t = 1.0 - v[7 - j].t;
            v[j].v = -v[7 - j].v;
        }
    } else {
        for j in 4..=7 {
            v[j].t = 0.5 + v[j - 4].t;
            v[j].v = -v[j - 4].v;
        }
    }
    v[8].t = 1.0;

    for j in 0..8 {
        if v[j + 1].t > v[j].t {
            v[j].s = (v[j + 1].v - v[j].v) / (v[j + 1].t - v[j].t);
        }
    }

    v
}

/// The last segment whose start time is at or before `t`, skipping over
/// zero-length segments.
fn segment_at(verts: &[Vertex; 9], t: f32) -> usize {
    let mut j = 0;
    while j < 7 && t >= verts[j + 1].t {
        j += 1;
    }
    j
}

/// An oscillator whose single period is six line segments, bandlimited with
/// the shared [`HexBlep`] table.
///
/// Every segment transition accumulates a `blep` for its value jump (only
/// zero-length segments have one) and a `blamp` for its slope change; a
/// frequency change injects one extra `blamp` at the block head. Because the
/// correction windows extend `width` samples past a transition, generation
/// runs through an oversized temp buffer whose tail seeds the next block,
/// and the output is delayed by half the table width.
///
/// Pending shape changes are applied at the period wrap only, so a mid-cycle
/// parameter update never creates an unsmoothed discontinuity.
pub struct HexwaveUnit {
    frequency: f32,
    sample_rate: f32,
    current: HexwaveParams,
    pending: Option<HexwaveParams>,
    t: f32,
    prev_dt: f32,
    carry: Vec<f32>,
    temp: Vec<f32>,
    blep: Arc<HexBlep>,
}

impl HexwaveUnit {
    pub fn new(frequency: f32, params: HexwaveParams, blep: Arc<HexBlep>) -> Self {
        Self {
            frequency,
            sample_rate: 0.0,
            current: sanitize(params),
            pending: None,
            t: 0.0,
            prev_dt: 0.0,
            carry: Vec::new(),
            temp: Vec::new(),
            blep,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn parameters(&self) -> HexwaveParams {
        self.current
    }

    /// Queue a shape change. It takes effect at the next period boundary;
    /// an oscillator that has not produced anything yet switches
    /// immediately.
    pub fn set_parameters(&mut self, params: HexwaveParams) {
        let params = sanitize(params);
        if self.prev_dt == 0.0 && self.t == 0.0 {
            self.current = params;
        } else {
            self.pending = Some(params);
        }
    }
}

impl Unit for HexwaveUnit {
    fn debug_name(&self) -> &'static str {
        "hexwave"
    }

    fn info(&self) -> UnitInfo {
        UnitInfo {
            num_max_inputs: 0,
            num_max_outputs: 16,
            is_sink: false,
        }
    }

    fn prepare(&mut self, sample_rate: u32, max_block_frames: usize) {
        self.sample_rate = sample_rate as f32;
        let w = self.blep.width();
        self.carry = vec![0.0; w];
        self.temp = vec![0.0; max_block_frames + w];
    }

    fn run(&mut self, _time: u64, _inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let Some(frames) = outputs.first().map(|o| o.len()) else {
            return;
        };
        let w = self.blep.width();
        let half = w / 2;
        if self.sample_rate == 0.0 || self.temp.len() < frames + w {
            return;
        }

        let temp = &mut self.temp[..frames + w];
        temp.fill(0.0);
        temp[..w].copy_from_slice(&self.carry);

        let dt = (self.frequency / self.sample_rate).abs();
        let mut verts = derive_vertices(&self.current);
        let mut j = segment_at(&verts, self.t);

        // The per-sample slope changed with the frequency; one blamp at the
        // block head patches the corner.
        if dt != self.prev_dt {
            self.blep
                .blamp(&mut temp[0..w], 0.0, (dt - self.prev_dt) * verts[j].s);
            self.prev_dt = dt;
        }

        for n in 0..frames {
            let mut t_new = self.t + dt;

            // Cross every vertex that falls within this step. Each crossing
            // accumulates a blep for the value jump (zero-length segments)
            // and a blamp for the slope change, placed at the sub-sample
            // position of the crossing.
            loop {
                let next = j + 1;
                if t_new < verts[next].t {
                    break;
                }

                let end_v = verts[j].v + verts[j].s * (verts[next].t - verts[j].t);
                let old_s = verts[j].s;

                if next == 8 {
                    // Period boundary: this is where queued shape changes
                    // land.
                    t_new -= 1.0;
                    if let Some(params) = self.pending.take() {
                        self.current = params;
                    }
                    verts = derive_vertices(&self.current);
                    j = 0;
                } else {
                    j = next;
                }

                let frac = if dt > 0.0 {
                    (t_new - verts[j].t) / dt
                } else {
                    0.0
                };

                let dv = verts[j].v - end_v;
                if dv != 0.0 {
                    self.blep.blep(&mut temp[n..n + w], frac, dv);
                }
                let ds = (verts[j].s - old_s) * dt;
                if ds != 0.0 {
                    self.blep.blamp(&mut temp[n..n + w], frac, ds);
                }
            }

            temp[n + half] += verts[j].v + verts[j].s * (t_new - verts[j].t);
            self.t = t_new;
        }

        for out in outputs.iter_mut() {
            for i in 0..frames {
                out[i] += temp[i];
            }
        }
        self.carry.copy_from_slice(&temp[frames..frames + w]);
    }
}

impl From<HexwaveUnit> for Box<dyn Unit> {
    fn from(unit: HexwaveUnit) -> Self {
        Box::new(unit)
    }
}
