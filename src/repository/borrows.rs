//! Borrow requests repository.
//!
//! Every lifecycle transition runs in a transaction with `FOR UPDATE` row
//! locks: creation and approval lock the book row and validate availability
//! inside the lock, so two requests for the last copy serialize instead of
//! both passing the check.

use chrono::{Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::borrow::{
        BorrowHistoryEntry, BorrowRequest, BorrowStatus, PendingRequest, MAX_RENEWALS,
    },
};

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

fn request_from_row(row: &PgRow) -> AppResult<BorrowRequest> {
    let status: String = row.get("status");
    let status = BorrowStatus::parse(&status)
        .ok_or_else(|| AppError::Internal(format!("Unknown borrow status '{}'", status)))?;
    Ok(BorrowRequest {
        id: row.get("id"),
        user_id: row.get("user_id"),
        book_id: row.get("book_id"),
        status,
        request_date: row.get("request_date"),
        requested_duration: row.get("requested_duration"),
        due_date: row.get("due_date"),
        return_date: row.get("return_date"),
        renewal_count: row.get("renewal_count"),
        approved_by: row.get("approved_by"),
    })
}

/// Count approved, unreturned loans for a book inside the current
/// transaction.
async fn active_loans_for_book(tx: &mut Transaction<'_, Postgres>, book_id: i32) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM borrow_requests \
         WHERE book_id = $1 AND status = 'approved' AND return_date IS NULL",
    )
    .bind(book_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count)
}

/// Lock the book row and return its copy count.
async fn lock_book(tx: &mut Transaction<'_, Postgres>, book_id: i32) -> AppResult<i32> {
    sqlx::query_scalar::<_, i32>("SELECT book_count FROM books WHERE id = $1 FOR UPDATE")
        .bind(book_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
}

/// Lock a borrow request row for a status transition.
async fn lock_request(tx: &mut Transaction<'_, Postgres>, id: i32) -> AppResult<BorrowRequest> {
    let row = sqlx::query("SELECT * FROM borrow_requests WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))?;
    request_from_row(&row)
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a borrow request by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowRequest> {
        let row = sqlx::query("SELECT * FROM borrow_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))?;
        request_from_row(&row)
    }

    /// Create a new request in `pending` state.
    ///
    /// Availability and the per-user duplicate guard are checked under the
    /// book row lock.
    pub async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        requested_duration: i16,
    ) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let book_count = lock_book(&mut tx, book_id).await?;
        let active = active_loans_for_book(&mut tx, book_id).await?;
        if i64::from(book_count) - active <= 0 {
            return Err(AppError::BusinessRule(
                "Book is not available for borrowing".to_string(),
            ));
        }

        let duplicate: bool = sqlx::query_scalar(
            "SELECT EXISTS(\
                 SELECT 1 FROM borrow_requests \
                 WHERE user_id = $1 AND book_id = $2 AND status IN ('pending', 'approved') \
                   AND return_date IS NULL)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(AppError::BusinessRule(
                "You already have an active request for this book".to_string(),
            ));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO borrow_requests (user_id, book_id, status, request_date, requested_duration)
            VALUES ($1, $2, 'pending', $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(Utc::now())
        .bind(requested_duration)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        request_from_row(&row)
    }

    /// `pending -> approved`: availability is re-validated under the book
    /// lock, atomically with the status write.
    pub async fn approve(&self, id: i32, admin_id: i32) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut tx, id).await?;
        if request.status != BorrowStatus::Pending {
            return Err(AppError::BusinessRule(
                "Only pending requests can be approved".to_string(),
            ));
        }

        let book_count = lock_book(&mut tx, request.book_id).await?;
        let active = active_loans_for_book(&mut tx, request.book_id).await?;
        if i64::from(book_count) - active <= 0 {
            return Err(AppError::BusinessRule(
                "No copies available; the request cannot be approved".to_string(),
            ));
        }

        let due_date = Utc::now() + Duration::days(i64::from(request.requested_duration));
        let row = sqlx::query(
            "UPDATE borrow_requests SET status = 'approved', approved_by = $2, due_date = $3 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(admin_id)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        request_from_row(&row)
    }

    /// `pending -> declined`. No due date is set.
    pub async fn decline(&self, id: i32, admin_id: i32) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut tx, id).await?;
        if request.status != BorrowStatus::Pending {
            return Err(AppError::BusinessRule(
                "Only pending requests can be declined".to_string(),
            ));
        }

        let row = sqlx::query(
            "UPDATE borrow_requests SET status = 'declined', approved_by = $2 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        request_from_row(&row)
    }

    /// `approved -> returned`: stamps the return date, which releases the
    /// copy for the availability computation.
    pub async fn return_loan(&self, id: i32) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut tx, id).await?;
        if request.status != BorrowStatus::Approved {
            return Err(AppError::BusinessRule(
                "Only approved loans can be returned".to_string(),
            ));
        }

        let row = sqlx::query(
            "UPDATE borrow_requests SET status = 'returned', return_date = $2 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        request_from_row(&row)
    }

    /// Renewal: self-transition on `approved`. The due date is recomputed
    /// from now over the original requested duration, not extended from the
    /// old due date.
    pub async fn renew(&self, id: i32) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut tx, id).await?;
        if request.status != BorrowStatus::Approved || request.return_date.is_some() {
            return Err(AppError::BusinessRule(
                "Only approved loans can be renewed".to_string(),
            ));
        }
        if request.renewal_count >= MAX_RENEWALS {
            return Err(AppError::BusinessRule(format!(
                "Maximum number of renewals reached ({}/{})",
                request.renewal_count, MAX_RENEWALS
            )));
        }

        let due_date = Utc::now() + Duration::days(i64::from(request.requested_duration));
        let row = sqlx::query(
            "UPDATE borrow_requests SET renewal_count = renewal_count + 1, due_date = $2 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        request_from_row(&row)
    }

    /// `approved -> lost`. Due and return dates stay as they were; the loan
    /// simply leaves active accounting.
    pub async fn mark_lost(&self, id: i32) -> AppResult<BorrowRequest> {
        self.flag(id, BorrowStatus::Lost).await
    }

    /// `approved -> damaged`.
    pub async fn mark_damaged(&self, id: i32) -> AppResult<BorrowRequest> {
        self.flag(id, BorrowStatus::Damaged).await
    }

    async fn flag(&self, id: i32, status: BorrowStatus) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut tx, id).await?;
        if !request.status.can_transition_to(status) {
            return Err(AppError::BusinessRule(format!(
                "Only approved loans can be flagged {}",
                status.as_str()
            )));
        }

        let row = sqlx::query(
            "UPDATE borrow_requests SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        request_from_row(&row)
    }

    /// A borrower's full request history, newest first.
    pub async fn user_history(&self, user_id: i32) -> AppResult<Vec<BorrowHistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT r.*, b.title AS book_title, b.author AS book_author
            FROM borrow_requests r
            JOIN books b ON b.id = r.book_id
            WHERE r.user_id = $1
            ORDER BY r.request_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        let mut result = Vec::with_capacity(rows.len());
        for row in &rows {
            let request = request_from_row(row)?;
            result.push(BorrowHistoryEntry {
                is_overdue: request.is_overdue(now),
                days_remaining: request.days_remaining(now),
                book_title: row.get("book_title"),
                book_author: row.get("book_author"),
                request,
            });
        }
        Ok(result)
    }

    /// Pending requests for the admin dashboard, newest first.
    pub async fn pending_requests(&self) -> AppResult<Vec<PendingRequest>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.user_id, r.book_id, r.request_date, r.requested_duration,
                   u.name AS user_name, u.email AS user_email,
                   b.title AS book_title, b.author AS book_author
            FROM borrow_requests r
            JOIN users u ON u.id = r.user_id
            JOIN books b ON b.id = r.book_id
            WHERE r.status = 'pending'
            ORDER BY r.request_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PendingRequest {
                id: row.get("id"),
                user_id: row.get("user_id"),
                user_name: row.get("user_name"),
                user_email: row.get("user_email"),
                book_id: row.get("book_id"),
                book_title: row.get("book_title"),
                book_author: row.get("book_author"),
                request_date: row.get("request_date"),
                requested_duration: row.get("requested_duration"),
            })
            .collect())
    }

    /// Request counts grouped by status (absent statuses are zero-filled by
    /// the stats service).
    pub async fn counts_by_status(&self) -> AppResult<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM borrow_requests GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| (row.get("status"), row.get("count")))
            .collect())
    }

    /// Approved, unreturned loans across the whole collection.
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_requests \
             WHERE status = 'approved' AND return_date IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Request plus borrower and book fields needed for a due-date reminder.
    pub async fn reminder_info(&self, id: i32) -> AppResult<(BorrowRequest, String, String, String)> {
        let row = sqlx::query(
            r#"
            SELECT r.*, u.name AS user_name, u.email AS user_email, b.title AS book_title
            FROM borrow_requests r
            JOIN users u ON u.id = r.user_id
            JOIN books b ON b.id = r.book_id
            WHERE r.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))?;

        let request = request_from_row(&row)?;
        Ok((
            request,
            row.get("user_name"),
            row.get("user_email"),
            row.get("book_title"),
        ))
    }
}
