use crate::{sensor::SensorReport, timestamp::Timestamp, Context};
use tokio_stream::{Stream, StreamExt};

/// The only writer of the registry. Applies reports as they arrive and
/// periodically marks silent sensors offline.
pub(crate) async fn update(ctx: Context, reports: impl Stream<Item = SensorReport>) {
    tokio::pin!(reports);
    let mut interval = tokio::time::interval(ctx.config.sweep_interval);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                sweep(&ctx, Timestamp::now()).await;
            }
            report = reports.next() => {
                match report {
                    Some(report) => apply(&ctx, report, Timestamp::now()).await,
                    None => break,
                }
            }
        }
    }
    tracing::info!("Report stream closed, stopping updates");
}

async fn sweep(ctx: &Context, now: Timestamp) {
    let gone = ctx
        .sensors
        .write()
        .await
        .mark_stale(now, ctx.config.offline_timeout);
    for id in gone {
        tracing::warn!(
            "Sensor {} went offline, no report for {:?}",
            id,
            ctx.config.offline_timeout
        );
    }
}

async fn apply(ctx: &Context, report: SensorReport, now: Timestamp) {
    let result = ctx.sensors.write().await.report(
        &report.id,
        report.measurement,
        now,
        &ctx.config.thresholds,
    );
    match result {
        Ok(transition) if transition.is_change() && transition.is_escalation() => {
            tracing::warn!(
                "Sensor {} changed from {} to {} ({})",
                report.id,
                transition.from,
                transition.to,
                report.measurement
            );
        }
        Ok(transition) if transition.is_change() => {
            tracing::info!(
                "Sensor {} changed from {} to {} ({})",
                report.id,
                transition.from,
                transition.to,
                report.measurement
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!("Dropped report: {}", e);
        }
    }
}
