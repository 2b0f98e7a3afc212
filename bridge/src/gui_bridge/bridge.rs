use crate::gui_bridge::state::BridgeState;
use anyhow::Context;
use cyclonecore::prelude::Mode;
use cyclonecore::wire::{
    routes, CreateTyphoonRequest, CreateTyphoonResponse, DeleteTyphoonResponse,
    HistoricalRunRequest, NowcastRunRequest, PathResponse, UploadRequest,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

#[derive(Debug, Deserialize)]
struct DetectionQuery {
    max: Option<usize>,
}

const DEFAULT_MAX_DETECTIONS: usize = 5000;

fn with_state(
    state: Arc<BridgeState>,
) -> impl Filter<Extract = (Arc<BridgeState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn segment(mode: Mode) -> &'static str {
    match mode {
        Mode::Historical => routes::HISTORICAL,
        Mode::Nowcast => routes::NOWCAST,
    }
}

fn failure(status: StatusCode, message: String) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status)
        .into_response()
}

/// Data routes of one dashboard mode, all under `/{mode}/`.
fn data_routes(
    mode: Mode,
    state: Arc<BridgeState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let base = warp::path(segment(mode)).and(warp::get());

    let dashboard = base
        .clone()
        .and(warp::path(routes::DASHBOARD_DATA))
        .and(warp::path::end())
        .and(with_state(state.clone()))
        .map(move |state: Arc<BridgeState>| {
            warp::reply::json(&state.repository(mode).dashboard())
        });

    let dashboard_by_year = base
        .clone()
        .and(warp::path(routes::DASHBOARD_DATA))
        .and(warp::path::param::<i32>())
        .and(warp::path::end())
        .and(with_state(state.clone()))
        .map(move |year: i32, state: Arc<BridgeState>| {
            warp::reply::json(&state.repository(mode).dashboard_by_year(year))
        });

    let years = base
        .clone()
        .and(warp::path(routes::AVAILABLE_YEARS))
        .and(warp::path::end())
        .and(with_state(state.clone()))
        .map(move |state: Arc<BridgeState>| {
            warp::reply::json(&state.repository(mode).available_years())
        });

    let typhoon = base
        .clone()
        .and(warp::path(routes::TYPHOON))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(with_state(state.clone()))
        .map(move |id: String, state: Arc<BridgeState>| {
            warp::reply::json(&state.repository(mode).typhoon(&id))
        });

    let dates = base
        .clone()
        .and(warp::path(routes::TYPHOON))
        .and(warp::path::param::<String>())
        .and(warp::path(routes::TYPHOON_DATES))
        .and(warp::path::end())
        .and(with_state(state.clone()))
        .map(move |id: String, state: Arc<BridgeState>| {
            warp::reply::json(&state.repository(mode).typhoon_dates(&id))
        });

    let detections = base
        .and(warp::path(routes::BOAT_DETECTIONS))
        .and(warp::path::param::<i32>())
        .and(warp::path::end())
        .and(warp::query::<DetectionQuery>())
        .and(with_state(state))
        .map(|year: i32, query: DetectionQuery, state: Arc<BridgeState>| {
            let max = query.max.unwrap_or(DEFAULT_MAX_DETECTIONS);
            match state.detections().load(year, max) {
                Ok(collection) => warp::reply::json(&collection).into_response(),
                Err(err) => {
                    log::error!("boat detections for {}: {:#}", year, err);
                    failure(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err))
                }
            }
        });

    dashboard
        .or(dashboard_by_year)
        .or(years)
        .or(typhoon)
        .or(dates)
        .or(detections)
}

/// Status and cancel routes shared by both analyses.
fn job_routes(
    mode: Mode,
    state: Arc<BridgeState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let status = warp::path(segment(mode))
        .and(warp::path(routes::STATUS))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(move |state: Arc<BridgeState>| async move {
            Ok::<_, Rejection>(warp::reply::json(&state.runner(mode).status().await))
        });

    let cancel = warp::path(segment(mode))
        .and(warp::path(routes::CANCEL))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state))
        .and_then(move |state: Arc<BridgeState>| async move {
            Ok::<_, Rejection>(warp::reply::json(&state.runner(mode).cancel().await))
        });

    status.or(cancel)
}

fn run_routes(
    state: Arc<BridgeState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let historical = warp::path(routes::HISTORICAL)
        .and(warp::path(routes::RUN))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(
            |request: HistoricalRunRequest, state: Arc<BridgeState>| async move {
                let response = match state.historical_plan(&request) {
                    Ok(plan) => state.runner(Mode::Historical).start(plan).await,
                    Err(rejected) => rejected,
                };
                Ok::<_, Rejection>(warp::reply::json(&response))
            },
        );

    let nowcast = warp::path(routes::NOWCAST)
        .and(warp::path(routes::RUN))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(
            |request: NowcastRunRequest, state: Arc<BridgeState>| async move {
                let response = match state.nowcast_plan(&request) {
                    Ok(plan) => state.runner(Mode::Nowcast).start(plan).await,
                    Err(rejected) => rejected,
                };
                Ok::<_, Rejection>(warp::reply::json(&response))
            },
        );

    historical.or(nowcast)
}

/// Adding and removing stored nowcast storms.
fn catalog_routes(
    state: Arc<BridgeState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let create = warp::path(routes::NOWCAST)
        .and(warp::path(routes::CREATE_TYPHOON))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .map(|request: CreateTyphoonRequest, state: Arc<BridgeState>| {
            warp::reply::json(&CreateTyphoonResponse {
                uuid: state.create_typhoon(&request),
            })
        });

    let delete = warp::path(routes::NOWCAST)
        .and(warp::path(routes::TYPHOON))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_state(state))
        .map(|id: String, state: Arc<BridgeState>| {
            warp::reply::json(&DeleteTyphoonResponse {
                success: state.delete_typhoon(&id),
            })
        });

    create.or(delete)
}

fn file_routes(
    state: Arc<BridgeState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let upload = warp::path(routes::UPLOAD_TRACK)
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .map(|upload: UploadRequest, state: Arc<BridgeState>| {
            match state.store_upload(&upload) {
                Ok(path) => warp::reply::json(&PathResponse {
                    path: Some(path.display().to_string()),
                })
                .into_response(),
                Err(err) => {
                    log::error!("upload {}: {:#}", upload.filename, err);
                    failure(StatusCode::BAD_REQUEST, format!("{:#}", err))
                }
            }
        });

    let save = warp::path(routes::SAVE_TRACK)
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state))
        .map(|track: Value, state: Arc<BridgeState>| match state.store_track(&track) {
            Ok(path) => warp::reply::json(&PathResponse {
                path: path.map(|path| path.display().to_string()),
            })
            .into_response(),
            Err(err) => {
                log::error!("save track: {:#}", err);
                failure(StatusCode::BAD_REQUEST, format!("{:#}", err))
            }
        });

    upload.or(save)
}

/// Every bridge call, laid out as in [`cyclonecore::wire::routes`].
pub fn routes(
    state: Arc<BridgeState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    data_routes(Mode::Historical, state.clone())
        .or(data_routes(Mode::Nowcast, state.clone()))
        .or(job_routes(Mode::Historical, state.clone()))
        .or(job_routes(Mode::Nowcast, state.clone()))
        .or(run_routes(state.clone()))
        .or(catalog_routes(state.clone()))
        .or(file_routes(state))
        .with(warp::log("bridge"))
}

/// Serves the bridge on `addr` until `shutdown` resolves.
pub async fn serve(
    state: Arc<BridgeState>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .with_context(|| format!("binding bridge to {}", addr))?;
    log::info!("bridge listening on http://{}", bound);
    server.await;
    Ok(())
}
