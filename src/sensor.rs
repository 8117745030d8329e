use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::{
    convert::TryFrom,
    fmt::{self, Display},
    str::FromStr,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub(crate) enum Error {
    #[error("Invalid sensor status `{0}`, expected one of active, warning, critical, offline")]
    InvalidStatus(String),

    #[error("Sensor id can't be empty")]
    EmptyId,

    #[error("Invalid smoke level, must be between 0% and 100%, received {0}")]
    SmokeLevelOutOfRange(f64),

    #[error("Received temperature lower than absolute zero: {0}")]
    TemperatureOutOfRange(f64),

    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(&'static str),
}

impl warp::reject::Reject for Error {}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub(crate) struct SensorId(String);

impl TryFrom<String> for SensorId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            Err(Error::EmptyId)
        } else {
            Ok(Self(value))
        }
    }
}

impl TryFrom<&str> for SensorId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl From<SensorId> for String {
    fn from(id: SensorId) -> Self {
        id.0
    }
}

impl Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health classification of a sensor. Adding a variant forces every match
/// below to be revisited.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub(crate) enum SensorStatus {
    Active,
    Warning,
    Critical,
    Offline,
}

impl SensorStatus {
    pub const ALL: [SensorStatus; 4] = [
        SensorStatus::Active,
        SensorStatus::Warning,
        SensorStatus::Critical,
        SensorStatus::Offline,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SensorStatus::Active => "active",
            SensorStatus::Warning => "warning",
            SensorStatus::Critical => "critical",
            SensorStatus::Offline => "offline",
        }
    }

    pub fn color(self) -> ColorToken {
        match self {
            SensorStatus::Active => ColorToken::Green,
            SensorStatus::Warning => ColorToken::Yellow,
            SensorStatus::Critical => ColorToken::Red,
            SensorStatus::Offline => ColorToken::Gray,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SensorStatus::Active => "Normal",
            SensorStatus::Warning => "Warning",
            SensorStatus::Critical => "Critical",
            SensorStatus::Offline => "Offline",
        }
    }

    pub fn badge_variant(self) -> BadgeVariant {
        match self {
            SensorStatus::Active => BadgeVariant::Default,
            SensorStatus::Warning | SensorStatus::Critical | SensorStatus::Offline => {
                BadgeVariant::Destructive
            }
        }
    }

    /// Severity rank among the reporting states, offline has none.
    pub fn severity(self) -> Option<u8> {
        match self {
            SensorStatus::Active => Some(0),
            SensorStatus::Warning => Some(1),
            SensorStatus::Critical => Some(2),
            SensorStatus::Offline => None,
        }
    }

    /// Next status after a fresh report classified as `measured`.
    /// Escalation is immediate, de-escalation goes one level per report.
    pub fn after_report(self, measured: SensorStatus) -> SensorStatus {
        match (self.severity(), measured.severity()) {
            (Some(current), Some(target)) if target + 1 < current => SensorStatus::Warning,
            _ => measured,
        }
    }
}

impl FromStr for SensorStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidStatus(s.to_owned()))
    }
}

impl TryFrom<String> for SensorStatus {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label for a status that hasn't been parsed yet, unrecognized text is "Unknown".
pub(crate) fn label_for(raw: &str) -> &'static str {
    raw.parse::<SensorStatus>()
        .map(SensorStatus::label)
        .unwrap_or("Unknown")
}

/// Color for a status that hasn't been parsed yet. Unlike the label there is
/// no fallback color, a misclassified sensor must not be painted gray.
pub(crate) fn color_for(raw: &str) -> Result<ColorToken, Error> {
    raw.parse::<SensorStatus>().map(SensorStatus::color)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ColorToken {
    Green,
    Yellow,
    Red,
    Gray,
}

impl ColorToken {
    pub fn css_class(self) -> &'static str {
        match self {
            ColorToken::Green => "bg-green-500",
            ColorToken::Yellow => "bg-yellow-500",
            ColorToken::Red => "bg-red-500",
            ColorToken::Gray => "bg-gray-500",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum BadgeVariant {
    Default,
    Destructive,
}

impl BadgeVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            BadgeVariant::Default => "default",
            BadgeVariant::Destructive => "destructive",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub(crate) struct Celsius(f64);

impl Celsius {
    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Celsius {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value < -273.15 {
            Err(Error::TemperatureOutOfRange(value))
        } else {
            Ok(Self(value))
        }
    }
}

impl From<Celsius> for f64 {
    fn from(value: Celsius) -> Self {
        value.0
    }
}

impl Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°C", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub(crate) struct SmokeLevel(f64);

impl SmokeLevel {
    pub fn percent(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for SmokeLevel {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if (0.0..=100.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::SmokeLevelOutOfRange(value))
        }
    }
}

impl From<SmokeLevel> for f64 {
    fn from(value: SmokeLevel) -> Self {
        value.0
    }
}

impl Display for SmokeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum LastCheck {
    Described(String),
    At(Timestamp),
}

impl LastCheck {
    pub fn describe(&self, now: &Timestamp) -> String {
        match self {
            LastCheck::Described(text) => text.clone(),
            LastCheck::At(at) => {
                let secs = now.elapsed_since(*at).as_secs();
                if secs < 60 {
                    format!("{} sec ago", secs)
                } else if secs < 60 * 60 {
                    format!("{} min ago", secs / 60)
                } else {
                    format!("{} h ago", secs / (60 * 60))
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SensorReading {
    pub(crate) id: SensorId,
    pub(crate) name: String,
    pub(crate) location: String,
    pub(crate) status: SensorStatus,
    pub(crate) temperature: Celsius,
    pub(crate) smoke_level: SmokeLevel,
    pub(crate) last_check: LastCheck,
}

/// A fresh measurement reported by a sensor.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Measurement {
    pub(crate) temperature: Celsius,
    pub(crate) smoke_level: SmokeLevel,
}

impl Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Temperature: {}, smoke: {}",
            self.temperature, self.smoke_level
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SensorReport {
    pub(crate) id: SensorId,
    pub(crate) measurement: Measurement,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Thresholds {
    warning_smoke: SmokeLevel,
    critical_smoke: SmokeLevel,
    warning_temperature: Celsius,
    critical_temperature: Celsius,
}

impl Thresholds {
    pub fn new(
        warning_smoke: SmokeLevel,
        critical_smoke: SmokeLevel,
        warning_temperature: Celsius,
        critical_temperature: Celsius,
    ) -> Result<Self, Error> {
        if warning_smoke >= critical_smoke {
            return Err(Error::InvalidThresholds(
                "warning smoke level must be below critical smoke level",
            ));
        }
        if warning_temperature >= critical_temperature {
            return Err(Error::InvalidThresholds(
                "warning temperature must be below critical temperature",
            ));
        }
        Ok(Self {
            warning_smoke,
            critical_smoke,
            warning_temperature,
            critical_temperature,
        })
    }

    pub fn classify(&self, measurement: &Measurement) -> SensorStatus {
        if measurement.smoke_level >= self.critical_smoke
            || measurement.temperature >= self.critical_temperature
        {
            SensorStatus::Critical
        } else if measurement.smoke_level >= self.warning_smoke
            || measurement.temperature >= self.warning_temperature
        {
            SensorStatus::Warning
        } else {
            SensorStatus::Active
        }
    }
}

impl Thresholds {
    pub const DEFAULT_WARNING_SMOKE: f64 = 10.0;
    pub const DEFAULT_CRITICAL_SMOKE: f64 = 30.0;
    pub const DEFAULT_WARNING_TEMPERATURE: f64 = 27.0;
    pub const DEFAULT_CRITICAL_TEMPERATURE: f64 = 50.0;
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning_smoke: SmokeLevel(Self::DEFAULT_WARNING_SMOKE),
            critical_smoke: SmokeLevel(Self::DEFAULT_CRITICAL_SMOKE),
            warning_temperature: Celsius(Self::DEFAULT_WARNING_TEMPERATURE),
            critical_temperature: Celsius(Self::DEFAULT_CRITICAL_TEMPERATURE),
        }
    }
}
