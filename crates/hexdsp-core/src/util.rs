//! Conversion helpers shared by the unit library and the block runner:
//! decibel/amplitude mapping and planar/interleaved channel shuffling.

/// Returns the raw amplitude from the given decibel value.
#[inline]
pub fn db_to_amp(db: f32) -> f32 {
    10.0f32.powf(0.05 * db)
}

/// Returns the decibel value from the raw amplitude.
#[inline]
pub fn amp_to_db(amp: f32) -> f32 {
    20.0 * amp.log(10.0)
}

/// Returns the raw amplitude from the given decibel value, treating
/// anything at or below `-100.0` dB as negative-infinity gain.
#[inline]
pub fn db_to_amp_clamped_neg_100_db(db: f32) -> f32 {
    if db <= -100.0 {
        0.0
    } else {
        db_to_amp(db)
    }
}

/// Returns the decibel value from the raw amplitude, clamping amplitudes at
/// or below `0.00001` to the `-100.0` dB floor.
#[inline]
pub fn amp_to_db_clamped_neg_100_db(amp: f32) -> f32 {
    if amp <= 0.00001 {
        -100.0
    } else {
        amp_to_db(amp)
    }
}

/// De-interleave audio channels.
///
/// Channel `i` of `interleaved` is copied into the i-th slice yielded by
/// `channels`. Extra channel slices (beyond `num_interleaved_channels`) are
/// zeroed; extra interleaved channels with no destination slice are dropped.
pub fn deinterleave<'a>(
    mut channels: impl Iterator<Item = &'a mut [f32]>,
    interleaved: &[f32],
    num_interleaved_channels: usize,
) {
    let mut i = 0;

    for _ in 0..num_interleaved_channels {
        let Some(ch) = channels.next() else {
            return;
        };

        for (output, input) in ch.iter_mut().zip(
            interleaved
                .iter()
                .skip(i)
                .step_by(num_interleaved_channels),
        ) {
            *output = *input;
        }

        i += 1;
    }

    for ch in channels {
        ch.fill(0.0);
    }
}

/// Interleave audio channels.
///
/// The i-th slice yielded by `channels` becomes channel `i` of
/// `interleaved`. Channels with no source slice are zeroed.
pub fn interleave<'a>(
    mut channels: impl Iterator<Item = &'a [f32]>,
    interleaved: &mut [f32],
    num_interleaved_channels: usize,
) {
    interleaved.fill(0.0);

    for ch_i in 0..num_interleaved_channels {
        let Some(ch) = channels.next() else {
            return;
        };

        for (output, input) in interleaved
            .iter_mut()
            .skip(ch_i)
            .step_by(num_interleaved_channels)
            .zip(ch.iter())
        {
            *output = *input;
        }
    }
}

/// Optimized interleaving for stereo audio channels.
pub fn interleave_stereo(in_l: &[f32], in_r: &[f32], interleaved: &mut [f32]) {
    let frames = interleaved.len() / 2;
    let in_l = &in_l[0..frames];
    let in_r = &in_r[0..frames];

    for (out, (l, r)) in interleaved
        .chunks_exact_mut(2)
        .zip(in_l.iter().zip(in_r.iter()))
    {
        out[0] = *l;
        out[1] = *r;
    }
}

/// Optimized de-interleaving for stereo audio channels.
pub fn deinterleave_stereo(out_l: &mut [f32], out_r: &mut [f32], interleaved: &[f32]) {
    let frames = interleaved.len() / 2;
    let out_l = &mut out_l[0..frames];
    let out_r = &mut out_r[0..frames];

    for (input, (l, r)) in interleaved
        .chunks_exact(2)
        .zip(out_l.iter_mut().zip(out_r.iter_mut()))
    {
        *l = input[0];
        *r = input[1];
    }
}
