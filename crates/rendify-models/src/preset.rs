//! Encode presets and encoder intensity profiles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Preset applied when a request names an unknown preset or none at all.
pub const DEFAULT_PRESET: &str = "mp4-720p";

/// Resolved encode parameters for a named preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetSpec {
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
    /// Constant Rate Factor (quality, lower is better)
    pub crf: u8,
}

/// Parameters of [`DEFAULT_PRESET`].
const DEFAULT_SPEC: PresetSpec = PresetSpec { width: 1280, height: 720, crf: 23 };

const PRESET_SPECS: &[(&str, PresetSpec)] = &[
    ("mp4-1080p", PresetSpec { width: 1920, height: 1080, crf: 23 }),
    ("mp4-720p", DEFAULT_SPEC),
    ("mp4-480p", PresetSpec { width: 854, height: 480, crf: 24 }),
    ("mp4-360p", PresetSpec { width: 640, height: 360, crf: 25 }),
];

/// Resolve a preset name to encode parameters.
///
/// Unknown names fall back to [`DEFAULT_PRESET`] so that an encode can always
/// proceed with a deterministic parameter set. Pure lookup, no side effects.
pub fn resolve_preset(name: &str) -> PresetSpec {
    PRESET_SPECS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, spec)| *spec)
        .unwrap_or(DEFAULT_SPEC)
}

/// Encoder effort/quality tradeoff, independent of resolution.
///
/// Selects an x264 speed preset only; it has no bearing on the output beyond
/// the speed-vs-quality tradeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    #[default]
    High,
    Max,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "low",
            Intensity::Medium => "medium",
            Intensity::High => "high",
            Intensity::Max => "max",
        }
    }

    /// Codec arguments for this effort level.
    pub fn encoder_args(&self) -> Vec<String> {
        let args: &[&str] = match self {
            Intensity::Low => &["-c:v", "libx264", "-preset", "faster", "-threads", "0"],
            Intensity::Medium => &["-c:v", "libx264", "-preset", "slow", "-threads", "0"],
            Intensity::High => &["-c:v", "libx264", "-preset", "veryslow", "-threads", "0"],
            Intensity::Max => &[
                "-c:v",
                "libx264",
                "-preset",
                "placebo",
                "-tune",
                "film",
                "-threads",
                "0",
                "-x264-params",
                "me=tesa:subme=10:merange=64:ref=6:rc-lookahead=60",
            ],
        };
        args.iter().map(|s| s.to_string()).collect()
    }
}

impl FromStr for Intensity {
    type Err = std::convert::Infallible;

    /// Unknown values fall back to [`Intensity::High`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "low" => Intensity::Low,
            "medium" => Intensity::Medium,
            "max" => Intensity::Max,
            _ => Intensity::High,
        })
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_presets() {
        assert_eq!(
            resolve_preset("mp4-720p"),
            PresetSpec { width: 1280, height: 720, crf: 23 }
        );
        assert_eq!(
            resolve_preset("mp4-480p"),
            PresetSpec { width: 854, height: 480, crf: 24 }
        );
        assert_eq!(resolve_preset("mp4-1080p").height, 1080);
        assert_eq!(resolve_preset("mp4-360p").crf, 25);
    }

    #[test]
    fn test_unknown_preset_falls_back() {
        assert_eq!(resolve_preset("unknown-preset"), resolve_preset(DEFAULT_PRESET));
        assert_eq!(resolve_preset(""), resolve_preset("mp4-720p"));
    }

    #[test]
    fn test_intensity_parse_fallback() {
        assert_eq!("low".parse::<Intensity>().unwrap(), Intensity::Low);
        assert_eq!("MAX".parse::<Intensity>().unwrap(), Intensity::Max);
        assert_eq!("turbo".parse::<Intensity>().unwrap(), Intensity::High);
        assert_eq!("".parse::<Intensity>().unwrap(), Intensity::High);
    }

    #[test]
    fn test_intensity_args() {
        let high = Intensity::High.encoder_args();
        assert!(high.contains(&"veryslow".to_string()));

        let max = Intensity::Max.encoder_args();
        assert!(max.contains(&"placebo".to_string()));
        assert!(max.iter().any(|a| a.contains("me=tesa")));
    }
}
