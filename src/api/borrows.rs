//! Borrow request endpoints (borrower side and admin transitions)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::borrow::{BorrowHistoryEntry, BorrowRequest, PendingRequest},
};

use super::AuthenticatedUser;

/// Create borrow request body
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBorrowRequestBody {
    /// Book to borrow
    pub book_id: i32,
    /// Loan duration in days (1-30); defaults to 14
    #[validate(range(min = 1, max = 30, message = "Requested duration must be between 1 and 30 days"))]
    pub requested_duration: Option<i64>,
}

/// Response for lifecycle transitions
#[derive(Serialize, ToSchema)]
pub struct BorrowActionResponse {
    /// Status message
    pub message: String,
    /// Request after the transition
    pub request: BorrowRequest,
}

/// Submit a new borrow request
#[utoipa::path(
    post,
    path = "/borrow/requests",
    tag = "borrow",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequestBody,
    responses(
        (status = 201, description = "Request created", body = BorrowRequest),
        (status = 400, description = "Invalid duration"),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Book unavailable or duplicate active request")
    )
)]
pub async fn create_borrow_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(body): Json<CreateBorrowRequestBody>,
) -> AppResult<(StatusCode, Json<BorrowRequest>)> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let request = state
        .services
        .borrows
        .create_request(claims.user_id, body.book_id, body.requested_duration)
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

/// The calling borrower's request history
#[utoipa::path(
    get,
    path = "/borrow/history",
    tag = "borrow",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Borrow history, newest first", body = Vec<BorrowHistoryEntry>)
    )
)]
pub async fn get_borrow_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowHistoryEntry>>> {
    let history = state.services.borrows.history(claims.user_id).await?;
    Ok(Json(history))
}

/// List pending borrow requests
#[utoipa::path(
    get,
    path = "/admin/requests/pending",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending requests", body = Vec<PendingRequest>),
        (status = 403, description = "Administrator role required")
    )
)]
pub async fn list_pending_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<PendingRequest>>> {
    claims.require_admin()?;

    let pending = state.services.borrows.pending_requests().await?;
    Ok(Json(pending))
}

/// Approve a pending request
#[utoipa::path(
    post,
    path = "/admin/requests/{id}/approve",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request approved", body = BorrowActionResponse),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Not pending, or no copies left")
    )
)]
pub async fn approve_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowActionResponse>> {
    claims.require_admin()?;

    let request = state.services.borrows.approve(id, claims.user_id).await?;
    Ok(Json(BorrowActionResponse {
        message: "Borrow request approved".to_string(),
        request,
    }))
}

/// Decline a pending request
#[utoipa::path(
    post,
    path = "/admin/requests/{id}/decline",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request declined", body = BorrowActionResponse),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Request is not pending")
    )
)]
pub async fn decline_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowActionResponse>> {
    claims.require_admin()?;

    let request = state.services.borrows.decline(id, claims.user_id).await?;
    Ok(Json(BorrowActionResponse {
        message: "Borrow request declined".to_string(),
        request,
    }))
}

/// Mark an approved loan as returned
#[utoipa::path(
    post,
    path = "/admin/requests/{id}/return",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Loan returned", body = BorrowActionResponse),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Loan is not approved")
    )
)]
pub async fn return_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowActionResponse>> {
    claims.require_admin()?;

    let request = state.services.borrows.return_loan(id).await?;
    Ok(Json(BorrowActionResponse {
        message: "Book returned".to_string(),
        request,
    }))
}

/// Renew an approved loan
#[utoipa::path(
    post,
    path = "/admin/requests/{id}/renew",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Loan renewed", body = BorrowActionResponse),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Renewal limit reached or loan not approved")
    )
)]
pub async fn renew_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowActionResponse>> {
    claims.require_admin()?;

    let request = state.services.borrows.renew(id).await?;
    Ok(Json(BorrowActionResponse {
        message: format!("Loan renewed ({} renewals)", request.renewal_count),
        request,
    }))
}

/// Flag an approved loan as lost
#[utoipa::path(
    post,
    path = "/admin/requests/{id}/lost",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Loan flagged lost", body = BorrowActionResponse),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Loan is not approved")
    )
)]
pub async fn flag_lost(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowActionResponse>> {
    claims.require_admin()?;

    let request = state.services.borrows.mark_lost(id).await?;
    Ok(Json(BorrowActionResponse {
        message: "Book flagged as lost".to_string(),
        request,
    }))
}

/// Flag an approved loan as damaged
#[utoipa::path(
    post,
    path = "/admin/requests/{id}/damaged",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Loan flagged damaged", body = BorrowActionResponse),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Loan is not approved")
    )
)]
pub async fn flag_damaged(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowActionResponse>> {
    claims.require_admin()?;

    let request = state.services.borrows.mark_damaged(id).await?;
    Ok(Json(BorrowActionResponse {
        message: "Book flagged as damaged".to_string(),
        request,
    }))
}

/// Send a due-date reminder for an approved loan
#[utoipa::path(
    post,
    path = "/admin/requests/{id}/remind",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Reminder sent", body = BorrowActionResponse),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Loan is not approved")
    )
)]
pub async fn send_reminder(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowActionResponse>> {
    claims.require_admin()?;

    let request = state.services.borrows.send_reminder(id).await?;
    Ok(Json(BorrowActionResponse {
        message: "Due-date reminder sent".to_string(),
        request,
    }))
}
