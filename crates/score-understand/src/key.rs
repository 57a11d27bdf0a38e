use score_model::NoteEvent;

use crate::types::{Key, KeyDetection, KeyMode, KeyProfile};

/// Krumhansl-Kessler major key profile (probe-tone ratings).
const KK_MAJOR: [f64; 12] = [6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88];

/// Krumhansl-Kessler minor key profile.
const KK_MINOR: [f64; 12] = [6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17];

/// Aarden-Essen major profile (folk-song corpus frequencies).
const AE_MAJOR: [f64; 12] = [
    17.7661, 0.145624, 14.9265, 0.160186, 19.8049, 11.3587, 0.291248, 22.062, 0.145624, 8.15494,
    0.232998, 4.95122,
];

/// Aarden-Essen minor profile.
const AE_MINOR: [f64; 12] = [
    18.2648, 0.737619, 14.0499, 16.8599, 0.702494, 14.4362, 0.702494, 18.6161, 4.56621, 1.93186,
    7.37619, 1.75623,
];

/// Correlations closer than this count as ties.
const TIE_EPSILON: f64 = 1e-9;

impl KeyProfile {
    fn weights(&self, mode: KeyMode) -> &'static [f64; 12] {
        match (self, mode) {
            (KeyProfile::KrumhanslKessler, KeyMode::Major) => &KK_MAJOR,
            (KeyProfile::KrumhanslKessler, KeyMode::Minor) => &KK_MINOR,
            (KeyProfile::AardenEssen, KeyMode::Major) => &AE_MAJOR,
            (KeyProfile::AardenEssen, KeyMode::Minor) => &AE_MINOR,
        }
    }
}

/// Estimate the key of a note set with the Krumhansl-Schmuckler algorithm.
///
/// Builds a duration-weighted pitch-class histogram and correlates it
/// against the major and minor profiles rotated to all 12 tonics. On an
/// exact tie major beats minor, and the lower tonic wins within a mode.
/// An empty or silent note set yields C major with zero confidence.
pub fn estimate_key(notes: &[NoteEvent], profile: KeyProfile) -> KeyDetection {
    let mut histogram = [0.0_f64; 12];
    for note in notes {
        if note.duration > 0.0 {
            histogram[(note.pitch_class % 12) as usize] += note.duration;
        }
    }

    let total: f64 = histogram.iter().sum();
    if total <= 0.0 {
        return KeyDetection::indeterminate();
    }
    for h in &mut histogram {
        *h /= total;
    }

    let mut best = Key::major(0);
    let mut best_corr = f64::NEG_INFINITY;

    for tonic in 0..12u8 {
        // Rotate so the candidate tonic sits at index 0
        let mut rotated = [0.0; 12];
        for (i, slot) in rotated.iter_mut().enumerate() {
            *slot = histogram[(i + tonic as usize) % 12];
        }

        for mode in [KeyMode::Major, KeyMode::Minor] {
            let candidate = Key::new(tonic, mode);
            let corr = pearson(&rotated, profile.weights(mode));
            if outranks(candidate, corr, best, best_corr) {
                best_corr = corr;
                best = candidate;
            }
        }
    }

    if best_corr <= 0.0 {
        return KeyDetection::indeterminate();
    }

    KeyDetection {
        key: best,
        confidence: (best_corr * 10000.0).round() / 10000.0,
    }
}

/// Whether `candidate` replaces the current best key.
///
/// Correlations within [`TIE_EPSILON`] tie; ties go to major over minor,
/// then to the lower tonic.
fn outranks(candidate: Key, corr: f64, best: Key, best_corr: f64) -> bool {
    if (corr - best_corr).abs() > TIE_EPSILON {
        return corr > best_corr;
    }
    match (candidate.mode, best.mode) {
        (KeyMode::Major, KeyMode::Minor) => true,
        (KeyMode::Minor, KeyMode::Major) => false,
        _ => candidate.tonic < best.tonic,
    }
}

/// Pearson correlation coefficient between two 12-element arrays.
fn pearson(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let x_mean: f64 = x.iter().sum::<f64>() / 12.0;
    let y_mean: f64 = y.iter().sum::<f64>() / 12.0;

    let mut num = 0.0;
    let mut x_sq = 0.0;
    let mut y_sq = 0.0;

    for i in 0..12 {
        let xd = x[i] - x_mean;
        let yd = y[i] - y_mean;
        num += xd * yd;
        x_sq += xd * xd;
        y_sq += yd * yd;
    }

    let denom = (x_sq * y_sq).sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    num / denom
}
