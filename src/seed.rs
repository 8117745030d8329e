use crate::sensor::{Celsius, LastCheck, SensorId, SensorReading, SensorStatus, SmokeLevel};
use eyre::Context;
use std::{convert::TryFrom, fs, path::Path};

struct SeedEntry {
    id: &'static str,
    name: &'static str,
    location: &'static str,
    status: SensorStatus,
    temperature: f64,
    smoke_level: f64,
    last_check: &'static str,
}

const DEFAULT_SEED: [SeedEntry; 4] = [
    SeedEntry {
        id: "S001",
        name: "Smoke detector #1",
        location: "Floor 1 - Lobby",
        status: SensorStatus::Active,
        temperature: 22.0,
        smoke_level: 2.0,
        last_check: "2 min ago",
    },
    SeedEntry {
        id: "S002",
        name: "Smoke detector #2",
        location: "Floor 2 - Office",
        status: SensorStatus::Active,
        temperature: 23.0,
        smoke_level: 1.0,
        last_check: "1 min ago",
    },
    SeedEntry {
        id: "S003",
        name: "Smoke detector #3",
        location: "Floor 3 - Storage",
        status: SensorStatus::Warning,
        temperature: 28.0,
        smoke_level: 15.0,
        last_check: "30 sec ago",
    },
    SeedEntry {
        id: "S004",
        name: "Smoke detector #4",
        location: "Basement - Utility room",
        status: SensorStatus::Active,
        temperature: 19.0,
        smoke_level: 3.0,
        last_check: "3 min ago",
    },
];

/// The four sensors the dashboard starts with when no seed file is configured.
pub(crate) fn default_readings() -> Vec<SensorReading> {
    DEFAULT_SEED
        .iter()
        .map(|entry| SensorReading {
            id: SensorId::try_from(entry.id).expect("seed ids are not empty"),
            name: entry.name.to_owned(),
            location: entry.location.to_owned(),
            status: entry.status,
            temperature: Celsius::try_from(entry.temperature)
                .expect("seed temperatures are above absolute zero"),
            smoke_level: SmokeLevel::try_from(entry.smoke_level)
                .expect("seed smoke levels are percentages"),
            last_check: LastCheck::Described(entry.last_check.to_owned()),
        })
        .collect()
}

pub(crate) fn from_json(json: &str) -> Result<Vec<SensorReading>, serde_json::Error> {
    serde_json::from_str(json)
}

pub(crate) fn load(path: &Path) -> Result<Vec<SensorReading>, eyre::Error> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Could not read seed file {}", path.display()))?;
    from_json(&json).with_context(|| format!("Invalid seed file {}", path.display()))
}
