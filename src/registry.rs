use crate::{
    sensor::{LastCheck, Measurement, SensorId, SensorReading, SensorStatus, Thresholds},
    timestamp::Timestamp,
};
use serde::Serialize;
use std::{collections::HashMap, time::Duration};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub(crate) enum Error {
    #[error("Sensor {0} is already registered")]
    DuplicateId(SensorId),

    #[error("Unknown sensor {0}")]
    UnknownSensor(SensorId),
}

impl warp::reject::Reject for Error {}

/// Number of readings per status.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusCounts {
    pub(crate) active: usize,
    pub(crate) warning: usize,
    pub(crate) critical: usize,
    pub(crate) offline: usize,
}

impl StatusCounts {
    pub fn get(&self, status: SensorStatus) -> usize {
        match status {
            SensorStatus::Active => self.active,
            SensorStatus::Warning => self.warning,
            SensorStatus::Critical => self.critical,
            SensorStatus::Offline => self.offline,
        }
    }

    pub fn total(&self) -> usize {
        self.active + self.warning + self.critical + self.offline
    }

    fn slot(&mut self, status: SensorStatus) -> &mut usize {
        match status {
            SensorStatus::Active => &mut self.active,
            SensorStatus::Warning => &mut self.warning,
            SensorStatus::Critical => &mut self.critical,
            SensorStatus::Offline => &mut self.offline,
        }
    }

    fn add(&mut self, status: SensorStatus) {
        *self.slot(status) += 1;
    }

    fn shift(&mut self, from: SensorStatus, to: SensorStatus) {
        if from != to {
            *self.slot(from) -= 1;
            *self.slot(to) += 1;
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct Transition {
    pub(crate) from: SensorStatus,
    pub(crate) to: SensorStatus,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }

    /// Going offline counts as an escalation, and so does coming back from
    /// offline in anything worse than active.
    pub fn is_escalation(&self) -> bool {
        match (self.from.severity(), self.to.severity()) {
            (_, None) => self.from != self.to,
            (None, Some(to)) => to > 0,
            (Some(from), Some(to)) => to > from,
        }
    }
}

/// What the dashboard renders: every reading in insertion order plus the counts.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Snapshot {
    pub(crate) sensors: Vec<SensorReading>,
    pub(crate) active_count: usize,
    pub(crate) warning_count: usize,
    pub(crate) critical_count: usize,
    pub(crate) offline_count: usize,
}

#[derive(Debug)]
struct Entry {
    reading: SensorReading,
    last_seen: Timestamp,
}

/// Owns every sensor reading. The count table is updated on each write so
/// reading the aggregates never rescans the readings.
#[derive(Debug)]
pub(crate) struct SensorRegistry {
    entries: Vec<Entry>,
    index: HashMap<SensorId, usize>,
    counts: StatusCounts,
}

impl SensorRegistry {
    /// Builds a registry from `seed`, every seeded sensor counts as seen at `now`.
    pub fn new(
        seed: impl IntoIterator<Item = SensorReading>,
        now: Timestamp,
    ) -> Result<Self, Error> {
        let mut registry = Self {
            entries: Vec::new(),
            index: HashMap::new(),
            counts: StatusCounts::default(),
        };
        for reading in seed {
            registry.insert(reading, now)?;
        }
        Ok(registry)
    }

    /// Rejects a reading whose id is already registered, leaving the registry untouched.
    pub fn insert(&mut self, reading: SensorReading, now: Timestamp) -> Result<(), Error> {
        if self.index.contains_key(&reading.id) {
            return Err(Error::DuplicateId(reading.id));
        }
        self.index.insert(reading.id.clone(), self.entries.len());
        self.counts.add(reading.status);
        self.entries.push(Entry {
            reading,
            last_seen: now,
        });
        Ok(())
    }

    pub fn list(&self) -> impl ExactSizeIterator<Item = &SensorReading> {
        self.entries.iter().map(|entry| &entry.reading)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, id: &SensorId) -> Option<&SensorReading> {
        self.index.get(id).map(|&i| &self.entries[i].reading)
    }

    pub fn count_by_status(&self, status: SensorStatus) -> usize {
        self.counts.get(status)
    }

    pub fn count_by_raw_status(&self, raw: &str) -> usize {
        raw.parse()
            .map(|status| self.count_by_status(status))
            .unwrap_or(0)
    }

    pub fn counts(&self) -> StatusCounts {
        self.counts
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            sensors: self.list().cloned().collect(),
            active_count: self.counts.active,
            warning_count: self.counts.warning,
            critical_count: self.counts.critical,
            offline_count: self.counts.offline,
        }
    }

    /// Applies a fresh measurement from sensor `id`.
    pub fn report(
        &mut self,
        id: &SensorId,
        measurement: Measurement,
        now: Timestamp,
        thresholds: &Thresholds,
    ) -> Result<Transition, Error> {
        let &i = self
            .index
            .get(id)
            .ok_or_else(|| Error::UnknownSensor(id.clone()))?;
        let entry = &mut self.entries[i];
        let from = entry.reading.status;
        let to = from.after_report(thresholds.classify(&measurement));

        entry.reading.status = to;
        entry.reading.temperature = measurement.temperature;
        entry.reading.smoke_level = measurement.smoke_level;
        entry.reading.last_check = LastCheck::At(now);
        entry.last_seen = now;
        self.counts.shift(from, to);

        Ok(Transition { from, to })
    }

    /// Marks every sensor that has been silent for longer than `timeout` as offline.
    pub fn mark_stale(&mut self, now: Timestamp, timeout: Duration) -> Vec<SensorId> {
        let mut gone = Vec::new();
        for entry in &mut self.entries {
            if entry.reading.status != SensorStatus::Offline
                && now.elapsed_since(entry.last_seen) > timeout
            {
                self.counts
                    .shift(entry.reading.status, SensorStatus::Offline);
                entry.reading.status = SensorStatus::Offline;
                gone.push(entry.reading.id.clone());
            }
        }
        gone
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        seed,
        sensor::{Celsius, SmokeLevel},
    };
    use std::convert::TryFrom;

    const T0: Timestamp = Timestamp::from_secs(1_000_000);

    fn seeded() -> SensorRegistry {
        SensorRegistry::new(seed::default_readings(), T0).unwrap()
    }

    fn id(s: &str) -> SensorId {
        SensorId::try_from(s).unwrap()
    }

    fn measurement(temperature: f64, smoke: f64) -> Measurement {
        Measurement {
            temperature: Celsius::try_from(temperature).unwrap(),
            smoke_level: SmokeLevel::try_from(smoke).unwrap(),
        }
    }

    fn assert_counts_consistent(registry: &SensorRegistry) {
        let sum: usize = SensorStatus::ALL
            .iter()
            .map(|&status| registry.count_by_status(status))
            .sum();
        assert_eq!(sum, registry.list().len());
        for &status in SensorStatus::ALL.iter() {
            let scanned = registry.list().filter(|r| r.status == status).count();
            assert_eq!(registry.count_by_status(status), scanned);
        }
    }

    #[test]
    fn seed_counts() {
        let registry = seeded();
        assert_eq!(registry.count_by_status(SensorStatus::Active), 3);
        assert_eq!(registry.count_by_status(SensorStatus::Warning), 1);
        assert_eq!(registry.count_by_status(SensorStatus::Critical), 0);
        assert_eq!(registry.count_by_status(SensorStatus::Offline), 0);
        assert_eq!(registry.counts().total(), 4);
        assert_counts_consistent(&registry);
    }

    #[test]
    fn list_keeps_insertion_order() {
        let registry = seeded();
        let ids: Vec<_> = registry.list().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["S001", "S002", "S003", "S004"]);
    }

    #[test]
    fn reads_are_idempotent() {
        let registry = seeded();
        let first: Vec<_> = registry.list().cloned().collect();
        let second: Vec<_> = registry.list().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(registry.snapshot(), registry.snapshot());
        assert_eq!(
            registry.count_by_status(SensorStatus::Active),
            registry.count_by_status(SensorStatus::Active)
        );
    }

    #[test]
    fn raw_status_counts() {
        let registry = seeded();
        assert_eq!(registry.count_by_raw_status("active"), 3);
        assert_eq!(registry.count_by_raw_status("burning"), 0);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut registry = seeded();
        let mut dup = registry.get(&id("S002")).unwrap().clone();
        dup.status = SensorStatus::Critical;
        assert_eq!(
            registry.insert(dup, T0),
            Err(Error::DuplicateId(id("S002")))
        );
        assert_eq!(registry.len(), 4);
        assert_eq!(
            registry.get(&id("S002")).unwrap().status,
            SensorStatus::Active
        );
        assert_eq!(registry.count_by_status(SensorStatus::Critical), 0);

        let mut readings = seed::default_readings();
        readings.push(readings[0].clone());
        assert!(SensorRegistry::new(readings, T0).is_err());
    }

    #[test]
    fn smoke_level_boundaries() {
        let mut registry = seeded();
        let thresholds = Thresholds::default();
        let t = registry
            .report(&id("S001"), measurement(20.0, 0.0), T0, &thresholds)
            .unwrap();
        assert_eq!(t.to, SensorStatus::Active);
        let t = registry
            .report(&id("S001"), measurement(20.0, 100.0), T0, &thresholds)
            .unwrap();
        assert_eq!(t.to, SensorStatus::Critical);
        assert_eq!(
            registry.get(&id("S001")).unwrap().smoke_level.percent(),
            100.0
        );
    }

    #[test]
    fn report_updates_reading_and_counts() {
        let mut registry = seeded();
        let thresholds = Thresholds::default();
        let now = Timestamp::from_secs(1_000_060);

        let transition = registry
            .report(&id("S002"), measurement(60.0, 40.0), now, &thresholds)
            .unwrap();
        assert_eq!(
            transition,
            Transition {
                from: SensorStatus::Active,
                to: SensorStatus::Critical
            }
        );
        assert!(transition.is_escalation());

        let reading = registry.get(&id("S002")).unwrap();
        assert_eq!(reading.temperature.get(), 60.0);
        assert_eq!(reading.last_check, LastCheck::At(now));
        assert_eq!(registry.count_by_status(SensorStatus::Critical), 1);
        assert_eq!(registry.count_by_status(SensorStatus::Active), 2);
        assert_counts_consistent(&registry);
    }

    #[test]
    fn deescalation_steps_down() {
        let mut registry = seeded();
        let thresholds = Thresholds::default();
        let s = id("S001");
        registry
            .report(&s, measurement(20.0, 50.0), T0, &thresholds)
            .unwrap();
        let t = registry
            .report(&s, measurement(20.0, 1.0), T0, &thresholds)
            .unwrap();
        assert_eq!(t.to, SensorStatus::Warning);
        assert!(!t.is_escalation());
        let t = registry
            .report(&s, measurement(20.0, 1.0), T0, &thresholds)
            .unwrap();
        assert_eq!(t.to, SensorStatus::Active);
        let t = registry
            .report(&s, measurement(20.0, 1.0), T0, &thresholds)
            .unwrap();
        assert!(!t.is_change());
        assert_counts_consistent(&registry);
    }

    #[test]
    fn escalation_by_severity() {
        use SensorStatus::*;
        let t = |from, to| Transition { from, to };
        assert!(t(Offline, Critical).is_escalation());
        assert!(t(Offline, Warning).is_escalation());
        assert!(!t(Offline, Active).is_escalation());
        assert!(t(Active, Offline).is_escalation());
        assert!(t(Critical, Offline).is_escalation());
        assert!(!t(Offline, Offline).is_escalation());
        assert!(t(Active, Warning).is_escalation());
        assert!(!t(Critical, Warning).is_escalation());
        assert!(!t(Warning, Warning).is_escalation());
    }

    #[test]
    fn unknown_sensor_report() {
        let mut registry = seeded();
        assert_eq!(
            registry.report(
                &id("S999"),
                measurement(20.0, 1.0),
                T0,
                &Thresholds::default()
            ),
            Err(Error::UnknownSensor(id("S999")))
        );
    }

    #[test]
    fn stale_sensors_go_offline_until_next_report() {
        let mut registry = seeded();
        let thresholds = Thresholds::default();
        let timeout = Duration::from_secs(300);

        let later = Timestamp::from_secs(1_000_200);
        registry
            .report(&id("S003"), measurement(22.0, 2.0), later, &thresholds)
            .unwrap();

        assert!(registry
            .mark_stale(Timestamp::from_secs(1_000_300), timeout)
            .is_empty());

        let gone = registry.mark_stale(Timestamp::from_secs(1_000_301), timeout);
        assert_eq!(gone, vec![id("S001"), id("S002"), id("S004")]);
        assert_eq!(registry.count_by_status(SensorStatus::Offline), 3);
        assert_counts_consistent(&registry);

        // already offline sensors aren't reported twice
        assert_eq!(
            registry.mark_stale(Timestamp::from_secs(1_000_501), timeout),
            vec![id("S003")]
        );

        let t = registry
            .report(
                &id("S001"),
                measurement(22.0, 12.0),
                Timestamp::from_secs(1_000_600),
                &thresholds,
            )
            .unwrap();
        assert_eq!(
            t,
            Transition {
                from: SensorStatus::Offline,
                to: SensorStatus::Warning
            }
        );
        assert_counts_consistent(&registry);
    }

    #[test]
    fn snapshot_carries_counts() {
        let snapshot = seeded().snapshot();
        assert_eq!(snapshot.sensors.len(), 4);
        assert_eq!(snapshot.active_count, 3);
        assert_eq!(snapshot.warning_count, 1);
        assert_eq!(snapshot.critical_count, 0);
        assert_eq!(snapshot.offline_count, 0);
    }
}
