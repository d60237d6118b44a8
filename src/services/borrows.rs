//! Borrow request lifecycle service

use crate::{
    error::{AppError, AppResult},
    models::borrow::{
        validate_duration, BorrowHistoryEntry, BorrowRequest, BorrowStatus, PendingRequest,
        DEFAULT_LOAN_DAYS,
    },
    repository::Repository,
    services::email::EmailService,
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
    email: EmailService,
}

impl BorrowsService {
    pub fn new(repository: Repository, email: EmailService) -> Self {
        Self { repository, email }
    }

    /// Create a new request in `pending` state for the calling borrower.
    pub async fn create_request(
        &self,
        user_id: i32,
        book_id: i32,
        requested_duration: Option<i64>,
    ) -> AppResult<BorrowRequest> {
        let duration = validate_duration(requested_duration.unwrap_or(DEFAULT_LOAN_DAYS))
            .map_err(AppError::Validation)?;

        // Verify the borrower exists before touching the book row.
        self.repository.users.get_by_id(user_id).await?;
        self.repository.borrows.create(user_id, book_id, duration).await
    }

    /// A borrower's request history, newest first.
    pub async fn history(&self, user_id: i32) -> AppResult<Vec<BorrowHistoryEntry>> {
        self.repository.borrows.user_history(user_id).await
    }

    /// Pending requests awaiting an admin decision.
    pub async fn pending_requests(&self) -> AppResult<Vec<PendingRequest>> {
        self.repository.borrows.pending_requests().await
    }

    pub async fn approve(&self, id: i32, admin_id: i32) -> AppResult<BorrowRequest> {
        self.repository.borrows.approve(id, admin_id).await
    }

    pub async fn decline(&self, id: i32, admin_id: i32) -> AppResult<BorrowRequest> {
        self.repository.borrows.decline(id, admin_id).await
    }

    pub async fn return_loan(&self, id: i32) -> AppResult<BorrowRequest> {
        self.repository.borrows.return_loan(id).await
    }

    pub async fn renew(&self, id: i32) -> AppResult<BorrowRequest> {
        self.repository.borrows.renew(id).await
    }

    pub async fn mark_lost(&self, id: i32) -> AppResult<BorrowRequest> {
        self.repository.borrows.mark_lost(id).await
    }

    pub async fn mark_damaged(&self, id: i32) -> AppResult<BorrowRequest> {
        self.repository.borrows.mark_damaged(id).await
    }

    /// Send a due-date reminder for an approved loan. Side effect only; the
    /// request state is untouched.
    pub async fn send_reminder(&self, id: i32) -> AppResult<BorrowRequest> {
        let (request, user_name, user_email, book_title) =
            self.repository.borrows.reminder_info(id).await?;

        if request.status != BorrowStatus::Approved {
            return Err(AppError::BusinessRule(
                "Reminders can only be sent for approved loans".to_string(),
            ));
        }
        let due_date = request.due_date.ok_or_else(|| {
            AppError::Internal(format!("Approved request {} has no due date", request.id))
        })?;

        self.email
            .send_due_reminder(&user_email, &user_name, &book_title, due_date)
            .await?;

        tracing::info!("Reminder sent for borrow request {}", request.id);
        Ok(request)
    }
}
