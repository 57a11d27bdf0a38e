use crate::error::DerivationFailure;
use crate::types::ChordQuality;

/// A chord template: quality plus its interval set above the root as a
/// 12-bit mask.
pub struct ChordTemplate {
    pub quality: ChordQuality,
    pub intervals: u16, // bit i set means interval i is in the template
    pub size: usize,
    /// Intervals above the root in stacking order: root, third, fifth, seventh.
    pub members: &'static [u8],
}

impl ChordTemplate {
    const fn new(quality: ChordQuality, members: &'static [u8]) -> Self {
        let mut mask = 0u16;
        let mut i = 0;
        while i < members.len() {
            mask |= 1 << members[i];
            i += 1;
        }
        Self {
            quality,
            intervals: mask,
            size: members.len(),
            members,
        }
    }

    pub fn for_quality(quality: ChordQuality) -> &'static ChordTemplate {
        TEMPLATES
            .iter()
            .find(|template| template.quality == quality)
            .unwrap_or(&TEMPLATES[TRIAD_START])
    }
}

const TRIAD_START: usize = 6;

/// Recognized chord templates: sevenths, triads, suspended, add9, power.
pub static TEMPLATES: &[ChordTemplate] = &[
    ChordTemplate::new(ChordQuality::Dominant7, &[0, 4, 7, 10]),
    ChordTemplate::new(ChordQuality::Major7, &[0, 4, 7, 11]),
    ChordTemplate::new(ChordQuality::Minor7, &[0, 3, 7, 10]),
    ChordTemplate::new(ChordQuality::MinorMajor7, &[0, 3, 7, 11]),
    ChordTemplate::new(ChordQuality::Diminished7, &[0, 3, 6, 9]),
    ChordTemplate::new(ChordQuality::HalfDiminished7, &[0, 3, 6, 10]),
    // Triads
    ChordTemplate::new(ChordQuality::Major, &[0, 4, 7]),
    ChordTemplate::new(ChordQuality::Minor, &[0, 3, 7]),
    ChordTemplate::new(ChordQuality::Diminished, &[0, 3, 6]),
    ChordTemplate::new(ChordQuality::Augmented, &[0, 4, 8]),
    ChordTemplate::new(ChordQuality::Suspended4, &[0, 5, 7]),
    ChordTemplate::new(ChordQuality::Suspended2, &[0, 2, 7]),
    ChordTemplate::new(ChordQuality::Add9, &[0, 2, 4, 7]),
    // Dyad
    ChordTemplate::new(ChordQuality::Power, &[0, 7]),
];

/// Root and quality inferred for a pitch-class set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordIdentity {
    pub root: u8,
    pub quality: ChordQuality,
}

/// 12-bit pitch-class mask of a set of pitch classes.
pub fn pitch_class_mask(pitch_classes: &[u8]) -> u16 {
    pitch_classes
        .iter()
        .fold(0u16, |mask, &pc| mask | 1 << (pc % 12))
}

/// Convert a set of pitch classes to an interval bitmask relative to a root.
fn to_interval_mask(pitch_classes: &[u8], root: u8) -> u16 {
    let mut mask = 0u16;
    for &pc in pitch_classes {
        let interval = (pc % 12 + 12 - root) % 12;
        mask |= 1 << interval;
    }
    mask
}

/// Identify the chord formed by a pitch-class set.
///
/// Exact template matches win, preferring the bass as root when a set is
/// symmetric. Larger sets that contain a tertian template are named after
/// that core chord. Two-note sets go through the scoring matcher. Anything
/// else has no template.
pub fn identify_chord(pitch_classes: &[u8], bass: u8) -> Result<ChordIdentity, DerivationFailure> {
    let mask = pitch_class_mask(pitch_classes);
    let distinct = mask.count_ones() as usize;
    if distinct == 0 {
        return Err(DerivationFailure::EmptySonority);
    }
    let bass = bass % 12;

    let exact = candidates(pitch_classes, |template, intervals| {
        intervals == template.intervals
    });
    if let Some(identity) = prefer_bass(&exact, bass) {
        return Ok(identity);
    }

    if distinct > 3 {
        let supersets = candidates(pitch_classes, |template, intervals| {
            template.quality.is_tertian() && intervals & template.intervals == template.intervals
        });
        if let Some(largest) = supersets.iter().map(|(size, _)| *size).max() {
            let best: Vec<_> = supersets
                .into_iter()
                .filter(|(size, _)| *size == largest)
                .collect();
            if let Some(identity) = prefer_bass(&best, bass) {
                return Ok(identity);
            }
        }
    }

    if distinct == 2 {
        if let Some((root, quality, _)) = match_chord(pitch_classes, Some(bass)) {
            return Ok(ChordIdentity { root, quality });
        }
    }

    Err(DerivationFailure::NoTemplate)
}

fn candidates(
    pitch_classes: &[u8],
    accepts: impl Fn(&ChordTemplate, u16) -> bool,
) -> Vec<(usize, ChordIdentity)> {
    let mut found = Vec::new();
    for template in TEMPLATES {
        for root in 0..12u8 {
            if !pitch_classes.iter().any(|&pc| pc % 12 == root) {
                continue;
            }
            let intervals = to_interval_mask(pitch_classes, root);
            if accepts(template, intervals) {
                found.push((
                    template.size,
                    ChordIdentity {
                        root,
                        quality: template.quality,
                    },
                ));
            }
        }
    }
    found
}

fn prefer_bass(found: &[(usize, ChordIdentity)], bass: u8) -> Option<ChordIdentity> {
    found
        .iter()
        .find(|(_, identity)| identity.root == bass)
        .or_else(|| found.first())
        .map(|(_, identity)| *identity)
}

/// Score a set of pitch classes against all templates and roots.
///
/// Returns `(root, quality, confidence)` for the best-covered template or
/// `None` below the acceptance threshold. `bass_hint` biases root selection
/// when ambiguous.
pub fn match_chord(pitch_classes: &[u8], bass_hint: Option<u8>) -> Option<(u8, ChordQuality, f64)> {
    if pitch_classes.len() < 2 {
        return None;
    }

    let mut best_root: u8 = 0;
    let mut best_score = 0.0_f64;
    let mut best_quality = ChordQuality::Major;

    for root in 0..12u8 {
        let intervals = to_interval_mask(pitch_classes, root);

        for template in TEMPLATES {
            let matched = (intervals & template.intervals).count_ones() as usize;
            if matched < template.size.min(2) {
                continue;
            }

            // Fraction of template present, penalizing extra notes
            let extra = (intervals & !template.intervals).count_ones();
            let mut score = matched as f64 / template.size as f64 - extra as f64 * 0.1;

            if let Some(bass) = bass_hint {
                if bass % 12 == root {
                    score += 0.15;
                }
            }

            if intervals & template.intervals == template.intervals {
                score += 0.1;
            }

            if score > best_score {
                best_score = score;
                best_root = root;
                best_quality = template.quality;
            }
        }
    }

    if best_score > 0.4 {
        Some((best_root, best_quality, best_score.min(1.0)))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identify(pcs: &[u8], bass: u8) -> ChordIdentity {
        identify_chord(pcs, bass).expect("chord")
    }

    #[test]
    fn c_major_triad() {
        let id = identify(&[0, 4, 7], 0);
        assert_eq!(id, ChordIdentity { root: 0, quality: ChordQuality::Major });
    }

    #[test]
    fn inverted_triad_keeps_root() {
        let id = identify(&[4, 7, 0], 4);
        assert_eq!(id.root, 0);
        assert_eq!(id.quality, ChordQuality::Major);
    }

    #[test]
    fn g_dominant_7th() {
        let id = identify(&[7, 11, 2, 5], 7);
        assert_eq!(id, ChordIdentity { root: 7, quality: ChordQuality::Dominant7 });
    }

    #[test]
    fn sixth_chord_reads_as_minor_seventh() {
        // C E G A is A minor seventh in first inversion
        let id = identify(&[0, 4, 7, 9], 0);
        assert_eq!(id, ChordIdentity { root: 9, quality: ChordQuality::Minor7 });
    }

    #[test]
    fn symmetric_sets_prefer_bass_root() {
        let id = identify(&[0, 3, 6, 9], 6);
        assert_eq!(id, ChordIdentity { root: 6, quality: ChordQuality::Diminished7 });
        let id = identify(&[0, 4, 8], 8);
        assert_eq!(id.root, 8);
        assert_eq!(id.quality, ChordQuality::Augmented);
    }

    #[test]
    fn superset_names_core_chord() {
        // C E G B D: major seventh with added ninth
        let id = identify(&[0, 4, 7, 11, 2], 0);
        assert_eq!(id, ChordIdentity { root: 0, quality: ChordQuality::Major7 });
    }

    #[test]
    fn two_notes_use_scoring_matcher() {
        let id = identify(&[0, 7], 0);
        assert_eq!(id.quality, ChordQuality::Power);
        let id = identify(&[0, 4], 0);
        assert_eq!(id, ChordIdentity { root: 0, quality: ChordQuality::Major });
    }

    #[test]
    fn cluster_has_no_template() {
        assert_eq!(identify_chord(&[0, 1, 2], 0), Err(DerivationFailure::NoTemplate));
        assert_eq!(identify_chord(&[0], 0), Err(DerivationFailure::NoTemplate));
        assert_eq!(identify_chord(&[], 0), Err(DerivationFailure::EmptySonority));
    }

    #[test]
    fn bass_hint_disambiguates() {
        let (root, _, _) = match_chord(&[0, 4, 7], Some(0)).unwrap();
        assert_eq!(root, 0, "bass on C should favor C as root");
    }

    #[test]
    fn single_note_no_match() {
        assert!(match_chord(&[0], None).is_none());
    }
}
