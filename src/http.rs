mod templates;

use crate::{
    registry,
    sensor::{self, SensorId},
    timestamp::Timestamp,
    Context,
};
use askama::Template;
use std::{convert::Infallible, convert::TryFrom, future::Future, net::SocketAddr};
use warp::{http::StatusCode, Filter, Reply};

pub(crate) fn serve(
    ctx: Context,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = ()>), warp::Error> {
    warp::serve(routes(ctx)).try_bind_with_graceful_shutdown(addr, shutdown)
}

fn routes(ctx: Context) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let ctx = warp::any().map(move || ctx.clone());

    let home = warp::get()
        .and(warp::path::end())
        .and(ctx.clone())
        .and_then(show_sensors);

    let get_state = warp::get()
        .and(warp::path!("api" / "state"))
        .and(ctx.clone())
        .and_then(get_state);

    let get_sensor = warp::get()
        .and(warp::path!("api" / "sensors" / String))
        .and(ctx.clone())
        .and_then(get_sensor);

    let get_status = warp::get()
        .and(warp::path!("api" / "statuses" / String))
        .and(ctx)
        .and_then(get_status);

    home.or(get_state)
        .or(get_sensor)
        .or(get_status)
        .recover(handle_rejection)
}

fn render(template: &impl Template) -> warp::reply::Response {
    match template.render() {
        Ok(body) => warp::reply::html(body).into_response(),
        Err(e) => {
            tracing::error!("Failed rendering template: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn show_sensors(ctx: Context) -> Result<impl Reply, Infallible> {
    let snapshot = ctx.sensors.read().await.snapshot();
    Ok(render(&templates::Home::new(&snapshot, Timestamp::now())))
}

async fn get_state(ctx: Context) -> Result<impl Reply, Infallible> {
    let snapshot = ctx.sensors.read().await.snapshot();
    Ok(warp::reply::json(&snapshot))
}

async fn get_sensor(id: String, ctx: Context) -> Result<impl Reply, warp::Rejection> {
    let id = SensorId::try_from(id).map_err(|_| warp::reject::not_found())?;
    let sensors = ctx.sensors.read().await;
    let reading = sensors
        .get(&id)
        .ok_or_else(|| registry::Error::UnknownSensor(id.clone()))?;
    Ok(warp::reply::json(reading))
}

async fn get_status(raw: String, ctx: Context) -> Result<impl Reply, warp::Rejection> {
    #[derive(serde::Serialize)]
    struct ReplyEntry {
        label: &'static str,
        color: sensor::ColorToken,
        count: usize,
        total: usize,
    }

    let color = sensor::color_for(&raw)?;
    let sensors = ctx.sensors.read().await;
    Ok(warp::reply::json(&ReplyEntry {
        label: sensor::label_for(&raw),
        color,
        count: sensors.count_by_raw_status(&raw),
        total: sensors.counts().total(),
    }))
}

async fn handle_rejection(err: warp::Rejection) -> Result<impl Reply, Infallible> {
    let code = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if let Some(e) = err.find::<registry::Error>() {
        match e {
            registry::Error::UnknownSensor(_) => StatusCode::NOT_FOUND,
            registry::Error::DuplicateId(_) => StatusCode::CONFLICT,
        }
    } else if err.find::<sensor::Error>().is_some() {
        StatusCode::BAD_REQUEST
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        StatusCode::METHOD_NOT_ALLOWED
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok(warp::reply::with_status(
        render(&templates::Error::new(code)),
        code,
    ))
}
