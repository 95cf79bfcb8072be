use std::time::Duration;

use crate::error::SettingsError;

pub const MIN_RATE: f32 = 0.5;
pub const MAX_RATE: f32 = 2.0;
pub const DEFAULT_RATE: f32 = 1.0;
pub const DEFAULT_PAUSE_AFTER_QUESTION: Duration = Duration::from_millis(1000);
/// The pause after an answer is this many times the pause after a question.
pub const DEFAULT_PAUSE_FACTOR: f32 = 1.5;
pub const DEFAULT_BREAK_THRESHOLD_SECS: u32 = 600;
pub const DEFAULT_BREAK_DURATION_SECS: u32 = 300;
pub const DEFAULT_LANG: &str = "en-US";

/// Clamp a speech rate into the supported range.
#[must_use]
pub fn clamp_rate(rate: f32) -> f32 {
    if rate.is_nan() {
        return DEFAULT_RATE;
    }
    rate.clamp(MIN_RATE, MAX_RATE)
}

/// Validated pacing and timer configuration for a session.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackSettings {
    pause_after_question: Duration,
    pause_factor: f32,
    break_threshold_secs: u32,
    break_duration_secs: u32,
    speech_rate: f32,
    lang: String,
}

#[derive(Clone, Debug, Default)]
pub struct PlaybackSettingsDraft {
    pub pause_after_question: Option<Duration>,
    pub pause_factor: Option<f32>,
    pub break_threshold_secs: Option<u32>,
    pub break_duration_secs: Option<u32>,
    pub speech_rate: Option<f32>,
    pub lang: Option<String>,
}

impl PlaybackSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft, filling unset fields with defaults.
    ///
    /// A rate outside `MIN_RATE..=MAX_RATE` is clamped rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` for a non-positive rate, a negative pause
    /// factor, a zero break duration/threshold or a blank language tag.
    pub fn validate(self) -> Result<PlaybackSettings, SettingsError> {
        let speech_rate = self.speech_rate.unwrap_or(DEFAULT_RATE);
        if !speech_rate.is_finite() || speech_rate <= 0.0 {
            return Err(SettingsError::InvalidRate(speech_rate));
        }

        let pause_factor = self.pause_factor.unwrap_or(DEFAULT_PAUSE_FACTOR);
        if !pause_factor.is_finite() || pause_factor < 0.0 {
            return Err(SettingsError::InvalidPauseFactor(pause_factor));
        }

        let break_threshold_secs = self
            .break_threshold_secs
            .unwrap_or(DEFAULT_BREAK_THRESHOLD_SECS);
        if break_threshold_secs == 0 {
            return Err(SettingsError::ZeroDuration {
                field: "break_threshold_secs",
            });
        }

        let break_duration_secs = self
            .break_duration_secs
            .unwrap_or(DEFAULT_BREAK_DURATION_SECS);
        if break_duration_secs == 0 {
            return Err(SettingsError::ZeroDuration {
                field: "break_duration_secs",
            });
        }

        let lang = self
            .lang
            .map(|val| val.trim().to_string())
            .unwrap_or_else(|| DEFAULT_LANG.to_string());
        if lang.is_empty() {
            return Err(SettingsError::EmptyLanguage);
        }

        Ok(PlaybackSettings {
            pause_after_question: self
                .pause_after_question
                .unwrap_or(DEFAULT_PAUSE_AFTER_QUESTION),
            pause_factor,
            break_threshold_secs,
            break_duration_secs,
            speech_rate: clamp_rate(speech_rate),
            lang,
        })
    }
}

impl PlaybackSettings {
    #[must_use]
    pub fn pause_after_question(&self) -> Duration {
        self.pause_after_question
    }

    /// Pause between an answer and the next question.
    #[must_use]
    pub fn pause_after_answer(&self) -> Duration {
        self.pause_after_question.mul_f32(self.pause_factor)
    }

    #[must_use]
    pub fn break_threshold_secs(&self) -> u32 {
        self.break_threshold_secs
    }

    #[must_use]
    pub fn break_duration_secs(&self) -> u32 {
        self.break_duration_secs
    }

    #[must_use]
    pub fn speech_rate(&self) -> f32 {
        self.speech_rate
    }

    #[must_use]
    pub fn lang(&self) -> &str {
        &self.lang
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            pause_after_question: DEFAULT_PAUSE_AFTER_QUESTION,
            pause_factor: DEFAULT_PAUSE_FACTOR,
            break_threshold_secs: DEFAULT_BREAK_THRESHOLD_SECS,
            break_duration_secs: DEFAULT_BREAK_DURATION_SECS,
            speech_rate: DEFAULT_RATE,
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pacing() {
        let settings = PlaybackSettingsDraft::new().validate().unwrap();
        assert_eq!(settings, PlaybackSettings::default());
        assert_eq!(settings.pause_after_question(), Duration::from_millis(1000));
        assert_eq!(settings.pause_after_answer(), Duration::from_millis(1500));
        assert_eq!(settings.break_threshold_secs(), 600);
        assert_eq!(settings.break_duration_secs(), 300);
        assert_eq!(settings.lang(), "en-US");
    }

    #[test]
    fn rate_is_clamped_into_range() {
        let settings = PlaybackSettingsDraft {
            speech_rate: Some(3.5),
            ..PlaybackSettingsDraft::default()
        }
        .validate()
        .unwrap();
        assert!((settings.speech_rate() - MAX_RATE).abs() < f32::EPSILON);
        assert!((clamp_rate(0.1) - MIN_RATE).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_non_positive_rate_and_zero_durations() {
        let err = PlaybackSettingsDraft {
            speech_rate: Some(0.0),
            ..PlaybackSettingsDraft::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidRate(_)));

        let err = PlaybackSettingsDraft {
            break_duration_secs: Some(0),
            ..PlaybackSettingsDraft::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err,
            SettingsError::ZeroDuration {
                field: "break_duration_secs"
            }
        );
    }

    #[test]
    fn blank_lang_is_rejected() {
        let err = PlaybackSettingsDraft {
            lang: Some("  ".into()),
            ..PlaybackSettingsDraft::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, SettingsError::EmptyLanguage);
    }
}
