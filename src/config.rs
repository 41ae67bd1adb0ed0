//! Configuration for building a predictor.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use serde::{ Deserialize, Serialize };

use crate::error::ConfigError;
use crate::history::MAX_HISTORY_BITS;
use crate::predictor::*;

/// The available prediction policies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictorKind {
    /// The single-issue Rocket front-end.
    #[default]
    Rocket,

    /// A superscalar front-end trained with full commit bundles.
    Superscalar,
}
impl PredictorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rocket => "rocket",
            Self::Superscalar => "superscalar",
        }
    }
}
impl fmt::Display for PredictorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for PredictorKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rocket" => Ok(Self::Rocket),
            "superscalar" | "ss" | "ssv1" => Ok(Self::Superscalar),
            _ => Err(format!(
                "unknown predictor '{}' (expected 'rocket' or 'superscalar')", s
            )),
        }
    }
}

/// Parameters used to build a [Predictor].
///
/// The BHT is not sized directly: it always has twice as many entries as
/// the BTB, with `log2(BHT entries)`-bit counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictorConfig {
    /// Which policy to use
    pub kind: PredictorKind,

    /// Processor fetch width (instructions per cycle)
    pub fetch_width: usize,

    /// Number of BTB entries
    pub btb_entries: usize,

    /// Number of RAS entries
    pub ras_entries: usize,

    /// Bits of global history folded into the BHT index (zero disables)
    pub history_bits: usize,
}
impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            kind: PredictorKind::Rocket,
            fetch_width: 1,
            btb_entries: 64,
            ras_entries: 2,
            history_bits: 0,
        }
    }
}

impl PredictorConfig {
    /// Largest supported BTB, limited by the width of the BHT counters.
    pub const MAX_BTB_ENTRIES: usize = 1 << (SaturatingCounterConfig::MAX_BITS - 1);

    /// Widest supported fetch bundle (in instructions).
    pub const MAX_FETCH_WIDTH: usize = 64;

    /// Parse a (possibly partial) JSON configuration. Missing fields take
    /// their default values.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::Load(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Load(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&s)
    }

    pub fn bht_entries(&self) -> usize { 2 * self.btb_entries }

    pub fn bht_counter_bits(&self) -> u32 { self.bht_entries().ilog2() }

    /// Check that a predictor can be built from this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fetch_width.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                what: "fetch width", value: self.fetch_width,
            });
        }
        if self.fetch_width > Self::MAX_FETCH_WIDTH {
            return Err(ConfigError::TooLarge {
                what: "fetch width",
                value: self.fetch_width,
                max: Self::MAX_FETCH_WIDTH,
            });
        }
        if self.kind == PredictorKind::Rocket && self.fetch_width != 1 {
            return Err(ConfigError::UnsupportedWidth {
                predictor: "rocket", width: self.fetch_width,
            });
        }
        if !self.btb_entries.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                what: "BTB entry count", value: self.btb_entries,
            });
        }
        if self.btb_entries > Self::MAX_BTB_ENTRIES {
            return Err(ConfigError::TooLarge {
                what: "BTB entry count",
                value: self.btb_entries,
                max: Self::MAX_BTB_ENTRIES,
            });
        }
        if self.ras_entries == 0 {
            return Err(ConfigError::EmptyRas);
        }
        if self.history_bits > MAX_HISTORY_BITS {
            return Err(ConfigError::HistoryTooLong(self.history_bits));
        }
        Ok(())
    }

    /// Build the configured [Predictor].
    pub fn build(&self) -> Result<Predictor, ConfigError> {
        self.validate()?;
        let p: Predictor = match self.kind {
            PredictorKind::Rocket => Box::new(RocketPredictor::with_history(
                self.btb_entries, self.ras_entries, self.history_bits,
            )),
            PredictorKind::Superscalar => Box::new(
                SuperscalarPredictor::with_history(self.fetch_width,
                    self.btb_entries, self.ras_entries, self.history_bits)
            ),
        };
        Ok(p)
    }
}
