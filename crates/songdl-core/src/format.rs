//! Supported output audio formats.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Audio container the converter is asked to produce.
///
/// Parsing is case-sensitive and only accepts the lowercase extension, the
/// same spelling that ends up in the artifact's filename.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    M4a,
    Flac,
    Wav,
}

impl AudioFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Flac => "flac",
            AudioFormat::Wav => "wav",
        }
    }

    /// `true` when `filename` ends in `.<ext>` for this format.
    pub fn matches_filename(self, filename: &str) -> bool {
        filename
            .strip_suffix(self.extension())
            .is_some_and(|stem| stem.ends_with('.'))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn parses_lowercase_names_only() {
        assert_eq!(AudioFormat::from_str("flac").unwrap(), AudioFormat::Flac);
        assert!(AudioFormat::from_str("FLAC").is_err());
        assert!(AudioFormat::from_str("ogg").is_err());
        assert!(AudioFormat::from_str("").is_err());
    }

    #[test]
    fn display_matches_extension() {
        for format in AudioFormat::iter() {
            assert_eq!(format.to_string(), format.extension());
        }
    }

    #[test]
    fn default_is_mp3() {
        assert_eq!(AudioFormat::default(), AudioFormat::Mp3);
    }

    #[test]
    fn filename_matching_requires_the_dot() {
        assert!(AudioFormat::Mp3.matches_filename("song_1.mp3"));
        assert!(!AudioFormat::Mp3.matches_filename("song_1mp3"));
        assert!(!AudioFormat::Mp3.matches_filename("song_1.mp3.part"));
        assert!(!AudioFormat::M4a.matches_filename("song_1.mp3"));
    }

    #[test]
    fn as_ref_is_lowercase() {
        assert_eq!(AudioFormat::M4a.as_ref(), "m4a");
    }
}
