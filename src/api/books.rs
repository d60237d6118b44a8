//! Catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::{AppError, AppResult},
    lang::Lang,
    models::book::{Book, BookDetails, CreateBook, UpdateBook},
    services::descriptions::BookLookup,
};

use super::AuthenticatedUser;

/// Query parameters for the book details lookup
#[derive(Debug, Deserialize, IntoParams)]
pub struct BookDetailsQuery {
    /// Catalog ID; takes precedence over title lookup
    pub book_id: Option<i32>,
    /// Title for fuzzy lookup when the ID is unknown
    pub title: Option<String>,
    /// Optional author filter for the title lookup
    pub author: Option<String>,
    /// Display language preference (en or ar)
    pub lang: Option<String>,
}

/// Get book details with completed bilingual descriptions
#[utoipa::path(
    get,
    path = "/books/details",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookDetailsQuery),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 400, description = "Neither book_id nor title supplied"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_details(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<BookDetailsQuery>,
) -> AppResult<Json<BookDetails>> {
    let lang = Lang::from_code(query.lang.as_deref().unwrap_or("en"));

    let lookup = if let Some(book_id) = query.book_id {
        BookLookup::Id(book_id)
    } else if let Some(title) = query.title {
        BookLookup::TitleAuthor {
            title,
            author: query.author,
        }
    } else {
        return Err(AppError::Validation(
            "Title is required for book lookup".to_string(),
        ));
    };

    let details = state.services.descriptions.get_book_details(lookup, lang).await?;
    Ok(Json(details))
}

/// Get a raw catalog record
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Catalog record", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Create a catalog entry
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(body): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_admin()?;

    if body.title.trim().is_empty() || body.author.trim().is_empty() {
        return Err(AppError::Validation(
            "Title and author are required".to_string(),
        ));
    }
    if body.book_count < 1 {
        return Err(AppError::Validation(
            "Book count must be at least 1".to_string(),
        ));
    }

    let book = state.services.catalog.create_book(&body).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Edit a catalog entry
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    claims.require_admin()?;

    if matches!(body.book_count, Some(count) if count < 1) {
        return Err(AppError::Validation(
            "Book count must be at least 1".to_string(),
        ));
    }

    let book = state.services.catalog.update_book(id, &body).await?;
    Ok(Json(book))
}

/// Delete a catalog entry. Refused while active requests reference it.
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book has active borrow requests")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
