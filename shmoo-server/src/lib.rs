use serde::Deserialize;
use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};

use crate::session_manager::{SessionError, SessionManager};
use shmoo_core::{
    GenerationError, PointGenerator, RECENT_ACTIVITY_LIMIT, history_entries, summarize,
};
use shmoo_types::{
    ApiError, GenerationResponse, OnChainPointsResponse, PointsResponse, ShmooPoint,
    StatsResponse,
};

pub mod config;
pub mod network;
pub mod rpc_client;
pub mod session_manager;

const MAX_POINTS_PAGE: usize = 100;

#[derive(Deserialize)]
struct PointsQuery {
    limit: Option<usize>,
}

pub fn create_routes(
    session_manager: Arc<SessionManager>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let sessions = warp::any().map({
        let session_manager = session_manager.clone();
        move || session_manager.clone()
    });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let network = warp::path("network")
        .and(warp::get())
        .and(sessions.clone())
        .map(|sessions: Arc<SessionManager>| warp::reply::json(&sessions.network_info()));

    let stats = warp::path!("users" / String / "stats")
        .and(warp::get())
        .and(sessions.clone())
        .and_then(handle_stats_request);

    let points = warp::path!("users" / String / "points")
        .and(warp::get())
        .and(warp::query::<PointsQuery>())
        .and(sessions.clone())
        .and_then(handle_points_request);

    let on_chain_points = warp::path!("users" / String / "onchain" / "points")
        .and(warp::get())
        .and(sessions.clone())
        .and_then(handle_on_chain_points_request);

    let transaction = warp::path!("users" / String / "transaction")
        .and(warp::get())
        .and(sessions.clone())
        .and_then(handle_transaction_request);

    let generate = warp::path!("users" / String / "points")
        .and(warp::post())
        .and(sessions.clone())
        .and_then(handle_generate_request);

    let retry = warp::path!("users" / String / "transaction" / "retry")
        .and(warp::post())
        .and(sessions.clone())
        .and_then(handle_retry_request);

    let dismiss = warp::path!("users" / String / "transaction" / "dismiss")
        .and(warp::post())
        .and(sessions.clone())
        .and_then(handle_dismiss_request);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    health
        .or(network)
        .or(stats)
        .or(points)
        .or(on_chain_points)
        .or(transaction)
        .or(generate)
        .or(retry)
        .or(dismiss)
        .with(cors)
        .with(warp::log("shmoo_clicker"))
}

fn error_reply(message: impl Into<String>, status: StatusCode) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(&ApiError::new(message)), status)
}

fn session_error_reply(err: SessionError) -> WithStatus<Json> {
    match err {
        SessionError::InvalidAddress(_) => error_reply(err.to_string(), StatusCode::BAD_REQUEST),
        SessionError::Storage(_) => {
            tracing::error!("{:#}", err);
            error_reply("Failed to load user data", StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn handle_stats_request(
    address: String,
    sessions: Arc<SessionManager>,
) -> Result<WithStatus<Json>, warp::Rejection> {
    let session = match sessions.session(&address).await {
        Ok(session) => session,
        Err(err) => return Ok(session_error_reply(err)),
    };

    let stats = session.stats().await;
    let response = StatsResponse {
        address: session.wallet().address.clone().unwrap_or_default(),
        stats,
        summary: summarize(&stats, sessions.now_millis()),
        on_chain_count: session.on_chain_point_count().await,
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&response),
        StatusCode::OK,
    ))
}

async fn handle_points_request(
    address: String,
    query: PointsQuery,
    sessions: Arc<SessionManager>,
) -> Result<WithStatus<Json>, warp::Rejection> {
    let session = match sessions.session(&address).await {
        Ok(session) => session,
        Err(err) => return Ok(session_error_reply(err)),
    };

    let limit = query
        .limit
        .unwrap_or(RECENT_ACTIVITY_LIMIT)
        .min(MAX_POINTS_PAGE);
    let total = session.point_count().await;
    let response = PointsResponse {
        address: session.wallet().address.clone().unwrap_or_default(),
        points: history_entries(session.recent_points(limit).await, total, &chrono::Local),
        total: total as u64,
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&response),
        StatusCode::OK,
    ))
}

async fn handle_on_chain_points_request(
    address: String,
    sessions: Arc<SessionManager>,
) -> Result<WithStatus<Json>, warp::Rejection> {
    let session = match sessions.session(&address).await {
        Ok(session) => session,
        Err(err) => return Ok(session_error_reply(err)),
    };

    let response = OnChainPointsResponse {
        address: session.wallet().address.clone().unwrap_or_default(),
        points: session.on_chain_points().await,
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&response),
        StatusCode::OK,
    ))
}

async fn handle_transaction_request(
    address: String,
    sessions: Arc<SessionManager>,
) -> Result<WithStatus<Json>, warp::Rejection> {
    match sessions.session(&address).await {
        Ok(session) => Ok(warp::reply::with_status(
            warp::reply::json(&session.snapshot()),
            StatusCode::OK,
        )),
        Err(err) => Ok(session_error_reply(err)),
    }
}

async fn handle_generate_request(
    address: String,
    sessions: Arc<SessionManager>,
) -> Result<WithStatus<Json>, warp::Rejection> {
    let session = match sessions.session(&address).await {
        Ok(session) => session,
        Err(err) => return Ok(session_error_reply(err)),
    };

    let result = session.generate().await;
    Ok(generation_reply(&session, result).await)
}

async fn handle_retry_request(
    address: String,
    sessions: Arc<SessionManager>,
) -> Result<WithStatus<Json>, warp::Rejection> {
    let session = match sessions.session(&address).await {
        Ok(session) => session,
        Err(err) => return Ok(session_error_reply(err)),
    };

    let result = session.retry().await;
    Ok(generation_reply(&session, result).await)
}

async fn handle_dismiss_request(
    address: String,
    sessions: Arc<SessionManager>,
) -> Result<WithStatus<Json>, warp::Rejection> {
    let session = match sessions.session(&address).await {
        Ok(session) => session,
        Err(err) => return Ok(session_error_reply(err)),
    };

    // Dismissing when nothing failed leaves the status as it is
    session.dismiss();
    Ok(warp::reply::with_status(
        warp::reply::json(&session.snapshot()),
        StatusCode::OK,
    ))
}

async fn generation_reply(
    session: &PointGenerator,
    result: Result<ShmooPoint, GenerationError>,
) -> WithStatus<Json> {
    match result {
        Ok(point) => {
            let transaction = session.snapshot();
            let explorer_link = session
                .network_info()
                .explorer_url
                .and_then(|url| transaction.explorer_link(&url));
            let response = GenerationResponse {
                point,
                stats: session.stats().await,
                transaction,
                explorer_link,
            };
            warp::reply::with_status(warp::reply::json(&response), StatusCode::OK)
        }
        Err(err @ (GenerationError::AlreadyGenerating | GenerationError::InvalidState { .. })) => {
            error_reply(err.to_string(), StatusCode::CONFLICT)
        }
        Err(GenerationError::WalletNotConnected) => {
            error_reply("Wallet not connected", StatusCode::BAD_REQUEST)
        }
        Err(_) => warp::reply::with_status(
            warp::reply::json(&session.snapshot()),
            StatusCode::BAD_GATEWAY,
        ),
    }
}
