use crate::chord_templates::{ChordIdentity, ChordTemplate};
use crate::error::DerivationFailure;
use crate::types::{ChordQuality, Key, KeyMode};

/// Scale-degree numeral for each semitone above a major tonic.
const MAJOR_DEGREES: [(&str, &str); 12] = [
    ("", "I"),
    ("b", "II"),
    ("", "II"),
    ("b", "III"),
    ("", "III"),
    ("", "IV"),
    ("#", "IV"),
    ("", "V"),
    ("b", "VI"),
    ("", "VI"),
    ("b", "VII"),
    ("", "VII"),
];

/// Minor keys read the sixth and seventh degrees from both scale forms.
const MINOR_DEGREES: [(&str, &str); 12] = [
    ("", "I"),
    ("b", "II"),
    ("", "II"),
    ("", "III"),
    ("#", "III"),
    ("", "IV"),
    ("#", "IV"),
    ("", "V"),
    ("", "VI"),
    ("", "VI"),
    ("", "VII"),
    ("", "VII"),
];

/// Roman-numeral figure of a chord in a key, e.g. `V7`, `ii6`, `viio`.
///
/// Power chords and lone pitches carry no function.
pub fn roman_numeral(identity: &ChordIdentity, bass: u8, key: &Key) -> Result<String, DerivationFailure> {
    if identity.quality == ChordQuality::Power {
        return Err(DerivationFailure::NoRomanNumeral);
    }

    let degree = ((identity.root + 12 - key.tonic) % 12) as usize;
    let (prefix, numeral) = match key.mode {
        KeyMode::Major => MAJOR_DEGREES[degree],
        KeyMode::Minor => MINOR_DEGREES[degree],
    };
    let numeral = if identity.quality.has_minor_third() {
        numeral.to_lowercase()
    } else {
        numeral.to_string()
    };

    let mark = match identity.quality {
        ChordQuality::Diminished | ChordQuality::Diminished7 => "o",
        ChordQuality::HalfDiminished7 => "ø",
        ChordQuality::Augmented => "+",
        _ => "",
    };

    let figure = inversion_figure(identity, bass);
    let suffix = match identity.quality {
        ChordQuality::Suspended4 => "sus4",
        ChordQuality::Suspended2 => "sus2",
        ChordQuality::Add9 => "add9",
        _ => "",
    };

    Ok(format!("{prefix}{numeral}{mark}{figure}{suffix}"))
}

/// Figured-bass inversion symbol from the chord member in the bass.
fn inversion_figure(identity: &ChordIdentity, bass: u8) -> &'static str {
    let template = ChordTemplate::for_quality(identity.quality);
    let bass_interval = (bass % 12 + 12 - identity.root) % 12;
    let position = template
        .members
        .iter()
        .position(|&member| member == bass_interval)
        .unwrap_or(0);

    if identity.quality.is_seventh() {
        ["7", "65", "43", "42"][position.min(3)]
    } else if identity.quality.is_tertian() {
        ["", "6", "64"][position.min(2)]
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rn(root: u8, quality: ChordQuality, bass: u8, key: Key) -> String {
        roman_numeral(&ChordIdentity { root, quality }, bass, &key).unwrap()
    }

    #[test]
    fn diatonic_triads_in_major() {
        let c = Key::major(0);
        assert_eq!(rn(0, ChordQuality::Major, 0, c), "I");
        assert_eq!(rn(2, ChordQuality::Minor, 2, c), "ii");
        assert_eq!(rn(7, ChordQuality::Major, 7, c), "V");
        assert_eq!(rn(11, ChordQuality::Diminished, 11, c), "viio");
    }

    #[test]
    fn inversions_get_figures() {
        let c = Key::major(0);
        assert_eq!(rn(0, ChordQuality::Major, 4, c), "I6");
        assert_eq!(rn(0, ChordQuality::Major, 7, c), "I64");
        assert_eq!(rn(7, ChordQuality::Dominant7, 7, c), "V7");
        assert_eq!(rn(7, ChordQuality::Dominant7, 11, c), "V65");
        assert_eq!(rn(7, ChordQuality::Dominant7, 2, c), "V43");
        assert_eq!(rn(7, ChordQuality::Dominant7, 5, c), "V42");
    }

    #[test]
    fn chromatic_roots_get_accidentals() {
        let c = Key::major(0);
        assert_eq!(rn(10, ChordQuality::Major, 10, c), "bVII");
        assert_eq!(rn(8, ChordQuality::Major, 8, c), "bVI");
        assert_eq!(rn(6, ChordQuality::Diminished7, 6, c), "#ivo7");
    }

    #[test]
    fn minor_key_numerals() {
        let a = Key::minor(9);
        assert_eq!(rn(9, ChordQuality::Minor, 9, a), "i");
        assert_eq!(rn(4, ChordQuality::Major, 4, a), "V");
        assert_eq!(rn(0, ChordQuality::Major, 0, a), "III");
        assert_eq!(rn(11, ChordQuality::HalfDiminished7, 11, a), "iiø7");
        assert_eq!(rn(5, ChordQuality::Augmented, 5, a), "VI+");
    }

    #[test]
    fn suspended_and_added_tones() {
        let c = Key::major(0);
        assert_eq!(rn(7, ChordQuality::Suspended4, 7, c), "Vsus4");
        assert_eq!(rn(0, ChordQuality::Add9, 0, c), "Iadd9");
    }

    #[test]
    fn power_chord_has_no_function() {
        let result = roman_numeral(
            &ChordIdentity { root: 0, quality: ChordQuality::Power },
            0,
            &Key::major(0),
        );
        assert_eq!(result, Err(DerivationFailure::NoRomanNumeral));
    }
}
