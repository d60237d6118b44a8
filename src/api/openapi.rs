//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, borrows, health, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Maktaba API",
        version = "1.0.0",
        description = "University Library Borrowing & Bilingual Catalog REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::get_book_details,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Borrow requests
        borrows::create_borrow_request,
        borrows::get_borrow_history,
        // Admin
        borrows::list_pending_requests,
        borrows::approve_request,
        borrows::decline_request,
        borrows::return_request,
        borrows::renew_request,
        borrows::flag_lost,
        borrows::flag_damaged,
        borrows::send_reminder,
        stats::get_dashboard_stats,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::BookLanguage,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Borrow requests
            crate::models::borrow::BorrowRequest,
            crate::models::borrow::BorrowStatus,
            crate::models::borrow::BorrowHistoryEntry,
            crate::models::borrow::PendingRequest,
            borrows::CreateBorrowRequestBody,
            borrows::BorrowActionResponse,
            // Stats
            crate::services::stats::DashboardStats,
            crate::services::stats::RequestStatusCounts,
            crate::services::stats::CategoryCount,
            crate::services::translation::TranslationStatsSnapshot,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog and bilingual book details"),
        (name = "borrow", description = "Borrower request lifecycle"),
        (name = "admin", description = "Request management and statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
