//! Drink catalog handlers.
//!
//! Mutations run inside one repository transaction. The handler commits when
//! the operation succeeded and rolls back otherwise, before any response is
//! built.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Json, Path, State,
    },
    response::IntoResponse,
};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{CreateDrinkRequest, DeleteResponse, DrinksResponse, UpdateDrinkRequest};
use crate::middleware::AuthClaims;
use crate::models::{Drink, DrinkPatch, LongDrink, ShortDrink};
use crate::services::{DrinkTransaction, RepoError};
use crate::AppState;

const CREATE_FAILED_MESSAGE: &str = "unprocessable or entry may already exist";

/// GET /drinks
pub async fn list_drinks(
    State(state): State<AppState>,
) -> Result<Json<DrinksResponse<Vec<ShortDrink>>>, AppError> {
    let drinks = catalog(&state).await?;
    Ok(Json(DrinksResponse::ok(
        drinks.iter().map(Drink::short).collect(),
    )))
}

/// GET /drinks-detail
pub async fn list_drinks_detail(
    State(state): State<AppState>,
) -> Result<Json<DrinksResponse<Vec<LongDrink>>>, AppError> {
    let drinks = catalog(&state).await?;
    Ok(Json(DrinksResponse::ok(
        drinks.iter().map(Drink::long).collect(),
    )))
}

/// POST /drinks
pub async fn create_drink(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    body: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<LongDrink>>, AppError> {
    let Json(req) = body.map_err(rejected_body)?;
    req.validate()?;

    let new_drink = req.into_new_drink().ok_or_else(|| {
        tracing::debug!("Create request missing title or recipe");
        AppError::unprocessable()
    })?;

    let mut tx = state.repo.begin().await?;
    let outcome = tx.create(&new_drink).await;
    settle(tx, outcome).await.map_err(|e| match e {
        RepoError::ConstraintViolation(reason) => {
            tracing::info!(title = %new_drink.title, reason = %reason, "Drink rejected");
            AppError::Unprocessable(CREATE_FAILED_MESSAGE.to_string())
        }
        other => mutation_failed("create", other),
    })?;

    let drink = state
        .repo
        .find_by_title(&new_drink.title)
        .await?
        .ok_or_else(AppError::not_found)?;

    tracing::info!(
        drink_id = drink.id,
        subject = claims.sub.as_deref().unwrap_or("unknown"),
        "Drink created"
    );

    Ok(Json(DrinksResponse::ok(drink.long())))
}

/// PATCH /drinks/:id
pub async fn update_drink(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<Vec<LongDrink>>>, AppError> {
    let Path(id) = id.map_err(|_| AppError::not_found())?;

    let existing = state
        .repo
        .find_by_id(id)
        .await?
        .ok_or_else(AppError::not_found)?;

    let Json(req) = body.map_err(rejected_body)?;
    req.validate()?;

    let patch = DrinkPatch::from(req);
    if patch.is_empty() {
        return Ok(Json(DrinksResponse::ok(vec![existing.long()])));
    }

    let mut tx = state.repo.begin().await?;
    let outcome = tx.update(id, &patch).await;
    let drink = settle(tx, outcome)
        .await
        .map_err(|e| mutation_failed("update", e))?;

    tracing::info!(
        drink_id = id,
        subject = claims.sub.as_deref().unwrap_or("unknown"),
        "Drink updated"
    );

    Ok(Json(DrinksResponse::ok(vec![drink.long()])))
}

/// DELETE /drinks/:id
pub async fn delete_drink(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let Path(id) = id.map_err(|_| AppError::not_found())?;

    state
        .repo
        .find_by_id(id)
        .await?
        .ok_or_else(AppError::not_found)?;

    let mut tx = state.repo.begin().await?;
    let outcome = tx.delete(id).await;
    settle(tx, outcome)
        .await
        .map_err(|e| mutation_failed("delete", e))?;

    tracing::info!(
        drink_id = id,
        subject = claims.sub.as_deref().unwrap_or("unknown"),
        "Drink deleted"
    );

    Ok(Json(DeleteResponse::ok(id)))
}

/// Unknown routes.
pub async fn not_found() -> impl IntoResponse {
    AppError::not_found()
}

/// Known route, unsupported method.
pub async fn method_not_allowed() -> impl IntoResponse {
    AppError::MethodNotAllowed
}

async fn catalog(state: &AppState) -> Result<Vec<Drink>, AppError> {
    let drinks = state.repo.list_all().await?;
    if drinks.is_empty() && state.config.catalog.empty_is_not_found {
        return Err(AppError::not_found());
    }
    Ok(drinks)
}

/// Commits on `Ok`, rolls back on `Err`.
async fn settle<T>(
    tx: Box<dyn DrinkTransaction>,
    outcome: Result<T, RepoError>,
) -> Result<T, RepoError> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

/// A row that vanished mid-request is a 404; any other failed write is 422.
fn mutation_failed(operation: &'static str, err: RepoError) -> AppError {
    match err {
        RepoError::NotFound => AppError::not_found(),
        RepoError::ConstraintViolation(reason) => {
            tracing::info!(operation, reason = %reason, "Drink write rejected");
            AppError::unprocessable()
        }
        other => {
            tracing::error!(operation, error = %other, "Drink write failed");
            AppError::unprocessable()
        }
    }
}

fn rejected_body(rejection: JsonRejection) -> AppError {
    tracing::debug!(error = %rejection, "Request body rejected");
    AppError::unprocessable()
}
