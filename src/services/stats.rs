//! Admin dashboard statistics service.
//!
//! All rollups are computed on demand from the store; nothing is cached.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::borrow::BorrowStatus,
    repository::Repository,
    services::translation::{TranslationGateway, TranslationStatsSnapshot},
};

/// Request counts per lifecycle status, zero-filled.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct RequestStatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub declined: i64,
    pub returned: i64,
    pub lost: i64,
    pub damaged: i64,
}

impl RequestStatusCounts {
    fn set(&mut self, status: BorrowStatus, count: i64) {
        match status {
            BorrowStatus::Pending => self.pending = count,
            BorrowStatus::Approved => self.approved = count,
            BorrowStatus::Declined => self.declined = count,
            BorrowStatus::Returned => self.returned = count,
            BorrowStatus::Lost => self.lost = count,
            BorrowStatus::Damaged => self.damaged = count,
        }
    }
}

/// One category histogram row.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Admin dashboard payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_books: i64,
    pub available_copies: i64,
    pub active_loans: i64,
    pub requests_by_status: RequestStatusCounts,
    pub total_users: i64,
    pub categories: Vec<CategoryCount>,
    pub translation: TranslationStatsSnapshot,
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
    gateway: TranslationGateway,
}

impl StatsService {
    pub fn new(repository: Repository, gateway: TranslationGateway) -> Self {
        Self { repository, gateway }
    }

    /// Compute the dashboard rollups.
    pub async fn dashboard(&self) -> AppResult<DashboardStats> {
        let total_books = self.repository.books.count().await?;
        let available_copies = self.repository.books.total_available_copies().await?;
        let active_loans = self.repository.borrows.count_active().await?;
        let total_users = self.repository.users.count().await?;

        let mut requests_by_status = RequestStatusCounts::default();
        for (status, count) in self.repository.borrows.counts_by_status().await? {
            if let Some(status) = BorrowStatus::parse(&status) {
                requests_by_status.set(status, count);
            }
        }

        let categories = self
            .repository
            .books
            .category_histogram()
            .await?
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();

        Ok(DashboardStats {
            total_books,
            available_copies,
            active_loans,
            requests_by_status,
            total_users,
            categories,
            translation: self.gateway.stats().snapshot(),
        })
    }
}
