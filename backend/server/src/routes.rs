use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::IntoResponse,
};
use bank::{
    ledger::available_balance,
    models::Transaction,
    ranking::get_rank,
};
use serde::Serialize;
use tracing::warn;

use crate::{
    database::{ContestListing, fetch_contests},
    error::AppError,
    state::State,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub name: String,
    pub points: i64,
    pub rank: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub email: String,
    pub wallet_balance: i64,
    pub available_balance: i64,
    pub transactions: Vec<Transaction>,
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Never fails: when the tables cannot be read the bundled contests are served.
pub async fn contests_handler(AxumState(state): AxumState<Arc<State>>) -> Json<Vec<ContestListing>> {
    Json(listings(&state).await)
}

pub async fn contest_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(id): Path<String>,
) -> Result<Json<ContestListing>, AppError> {
    listings(&state)
        .await
        .into_iter()
        .find(|contest| contest.id == id)
        .map(Json)
        .ok_or(AppError::ContestNotFound)
}

pub async fn leaderboard_handler(AxumState(state): AxumState<Arc<State>>) -> Json<Vec<Standing>> {
    let service = state.service.lock().await;

    let standings = service
        .standings()
        .into_iter()
        .map(|user| Standing {
            name: user.name.clone(),
            points: user.points,
            rank: get_rank(user.points),
        })
        .collect();

    Json(standings)
}

pub async fn wallet_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(email): Path<String>,
) -> Result<Json<Wallet>, AppError> {
    let service = state.service.lock().await;
    let user = service.user(&email)?;

    Ok(Json(Wallet {
        email: user.email.clone(),
        wallet_balance: user.wallet_balance,
        available_balance: available_balance(user),
        transactions: user.transactions.clone(),
    }))
}

async fn listings(state: &State) -> Vec<ContestListing> {
    match fetch_contests(&state.pool).await {
        Ok(contests) => contests,
        Err(e) => {
            warn!("Serving bundled contests: {e}");
            state.fallback_contests.clone()
        }
    }
}
