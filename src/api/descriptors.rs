//! Audio analysis descriptor names.
//!
//! A static table of every descriptor the analysis endpoint understands,
//! keyed by category and name. Wire names are `category.name`.

use std::fmt;

/// Descriptor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorCategory {
    /// Spectral and loudness features.
    LowLevel,
    /// Tempo, beats, and onsets.
    Rhythm,
    /// Key, chords, and pitch-class profiles.
    Tonal,
    /// Envelope and timbre features of short effects.
    Sfx,
}

impl DescriptorCategory {
    /// Prefix used in wire names.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::LowLevel => "lowlevel",
            Self::Rhythm => "rhythm",
            Self::Tonal => "tonal",
            Self::Sfx => "sfx",
        }
    }
}

/// One analysis descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor {
    category: DescriptorCategory,
    name: &'static str,
    wire: &'static str,
}

impl Descriptor {
    /// Family this descriptor belongs to.
    #[must_use]
    pub const fn category(self) -> DescriptorCategory {
        self.category
    }

    /// Bare name, e.g. `spectral_centroid`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }

    /// Wire name, e.g. `lowlevel.spectral_centroid`.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        self.wire
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire)
    }
}

macro_rules! descriptor_table {
    ($($category:ident => $prefix:literal [$($name:ident),* $(,)?]);* $(;)?) => {
        &[$($(
            Descriptor {
                category: DescriptorCategory::$category,
                name: stringify!($name),
                wire: concat!($prefix, ".", stringify!($name)),
            },
        )*)*]
    };
}

static DESCRIPTORS: &[Descriptor] = descriptor_table! {
    LowLevel => "lowlevel" [
        spectral_complexity, silence_rate_20dB, erb_bands, average_loudness, spectral_rms,
        spectral_kurtosis, barkbands_kurtosis, scvalleys, spectral_spread, pitch, dissonance,
        spectral_energyband_high, gfcc, spectral_flux, silence_rate_30dB, spectral_contrast,
        spectral_energyband_middle_high, barkbands_spread, spectral_centroid, pitch_salience,
        silence_rate_60dB, spectral_entropy, spectral_rolloff, barkbands, spectral_energyband_low,
        barkbands_skewness, pitch_instantaneous_confidence, spectral_energyband_middle_low,
        spectral_strongpeak, startFrame, spectral_decrease, stopFrame, mfcc, spectral_energy,
        spectral_flatness_db, frequency_bands, zerocrossingrate, spectral_skewness, hfc,
        spectral_crest,
    ];
    Rhythm => "rhythm" [
        first_peak_bpm, onset_times, beats_count, beats_loudness, first_peak_spread,
        second_peak_weight, bpm, bpm_intervals, onset_count, second_peak_spread,
        beats_loudness_band_ratio, second_peak_bpm, onset_rate, beats_position,
        first_peak_weight,
    ];
    Tonal => "tonal" [
        hpcp_entropy, chords_scale, chords_number_rate, key_strength, chords_progression,
        key_scale, chords_strength, key_key, chords_changes_rate, chords_count, hpcp_crest,
        chords_histogram, chords_key, tuning_frequency, hpcp_peak_count, hpcp,
    ];
    Sfx => "sfx" [
        temporal_decrease, inharmonicity, pitch_min_to_total, tc_to_total, der_av_after_max,
        pitch_max_to_total, temporal_spread, temporal_kurtosis, logattacktime,
        temporal_centroid, tristimulus, max_der_before_max, strongdecay, pitch_centroid,
        duration, temporal_skewness, effective_duration, max_to_total,
        oddtoevenharmonicenergyratio, pitch_after_max_to_before_max_energy_ratio,
    ];
};

/// Every known descriptor, grouped by category.
#[must_use]
pub fn all() -> &'static [Descriptor] {
    DESCRIPTORS
}

/// Descriptors of one category.
pub fn in_category(category: DescriptorCategory) -> impl Iterator<Item = Descriptor> {
    DESCRIPTORS
        .iter()
        .copied()
        .filter(move |descriptor| descriptor.category == category)
}

/// Looks up a descriptor by its category and bare name.
#[must_use]
pub fn find(category: DescriptorCategory, name: &str) -> Option<Descriptor> {
    in_category(category).find(|descriptor| descriptor.name == name)
}

/// Looks up a descriptor by wire name, e.g. `rhythm.bpm`.
#[must_use]
pub fn lookup(wire_name: &str) -> Option<Descriptor> {
    DESCRIPTORS
        .iter()
        .copied()
        .find(|descriptor| descriptor.wire == wire_name)
}

/// Joins descriptors into the comma-separated form the analysis endpoint takes.
#[must_use]
pub fn join_wire_names(descriptors: &[Descriptor]) -> String {
    descriptors
        .iter()
        .map(|descriptor| descriptor.wire)
        .collect::<Vec<_>>()
        .join(",")
}
