use crate::sensor::{Celsius, Measurement, SensorId, SensorReport, SmokeLevel};
use futures_util::stream::Stream;
use rand::Rng;
use std::{convert::TryFrom, future::Future, time::Duration};

/// Chance that a simulated sensor skips a round.
const MISSED_REPORT_PROBABILITY: f64 = 0.02;

struct FluctuatingSensor {
    temperature: f64,
    smoke_level: f64,
}

impl FluctuatingSensor {
    fn starting_at(measurement: Measurement) -> Self {
        Self {
            temperature: measurement.temperature.get(),
            smoke_level: measurement.smoke_level.percent(),
        }
    }
}

fn clamp<T>(n: T, lo: T, hi: T) -> T
where
    T: PartialOrd + Copy,
{
    if n < lo {
        lo
    } else if n > hi {
        hi
    } else {
        n
    }
}

impl Iterator for FluctuatingSensor {
    type Item = Measurement;

    fn next(&mut self) -> Option<Self::Item> {
        let mut rng = rand::thread_rng();
        self.temperature = clamp(self.temperature + rng.gen_range(-0.5, 0.5), 15.0, 60.0);
        self.smoke_level = clamp(self.smoke_level + rng.gen_range(-2.0, 2.0), 0.0, 100.0);
        Some(Measurement {
            temperature: Celsius::try_from(self.temperature).ok()?,
            smoke_level: SmokeLevel::try_from(self.smoke_level).ok()?,
        })
    }
}

fn misses_report() -> bool {
    rand::thread_rng().gen_bool(MISSED_REPORT_PROBABILITY)
}

/// Simulates every sensor in `sensors`, starting from its current measurement.
pub(crate) fn dummy_feed(
    sensors: Vec<(SensorId, Measurement)>,
    period: Duration,
) -> (
    impl Future<Output = ()>,
    impl Stream<Item = SensorReport> + Send,
) {
    let (tx, rx) = flume::bounded(sensors.len().max(1));
    let dummy_task = async move {
        let mut simulated: Vec<_> = sensors
            .into_iter()
            .map(|(id, measurement)| (id, FluctuatingSensor::starting_at(measurement)))
            .collect();

        loop {
            for (id, sensor) in simulated.iter_mut() {
                if misses_report() {
                    continue;
                }
                let measurement = match sensor.next() {
                    Some(measurement) => measurement,
                    None => continue,
                };
                let report = SensorReport {
                    id: id.clone(),
                    measurement,
                };
                if tx.send_async(report).await.is_err() {
                    return;
                }
            }
            tokio::time::sleep(period).await;
        }
    };

    (dummy_task, rx.into_stream())
}

#[cfg(test)]
mod test {
    use super::*;
    use futures_util::StreamExt;

    fn start() -> Measurement {
        Measurement {
            temperature: Celsius::try_from(22.0).unwrap(),
            smoke_level: SmokeLevel::try_from(99.5).unwrap(),
        }
    }

    #[test]
    fn clamping() {
        assert_eq!(clamp(5, 0, 3), 3);
        assert_eq!(clamp(-1.0, 0.0, 100.0), 0.0);
        assert_eq!(clamp(42.0, 0.0, 100.0), 42.0);
    }

    #[test]
    fn fluctuation_stays_in_range() {
        let sensor = FluctuatingSensor::starting_at(start());
        for measurement in sensor.take(500) {
            assert!((15.0..=60.0).contains(&measurement.temperature.get()));
            assert!((0.0..=100.0).contains(&measurement.smoke_level.percent()));
        }
    }

    #[tokio::test]
    async fn feed_reports_known_sensors() {
        let id = SensorId::try_from("S001").unwrap();
        let (task, stream) = dummy_feed(vec![(id.clone(), start())], Duration::from_millis(1));
        let task = tokio::spawn(task);
        let reports: Vec<_> = stream.take(3).collect().await;
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|report| report.id == id));
        task.abort();
    }
}
