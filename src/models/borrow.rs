//! Borrow request model and lifecycle rules.
//!
//! A borrow request moves `pending -> {approved, declined}` and
//! `approved -> {returned, lost, damaged}`; renewal is a self-transition on
//! `approved` that only touches the due date and renewal count. The
//! transition predicates live here so the rules are checkable without a
//! database; the repository enforces the same rules inside transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Default loan duration in days when the borrower does not specify one.
pub const DEFAULT_LOAN_DAYS: i64 = 14;
/// Inclusive bounds for the requested loan duration.
pub const MIN_LOAN_DAYS: i64 = 1;
pub const MAX_LOAN_DAYS: i64 = 30;
/// A loan can be renewed at most this many times.
pub const MAX_RENEWALS: i16 = 3;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Borrow request lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Pending,
    Approved,
    Declined,
    Returned,
    Lost,
    Damaged,
}

impl BorrowStatus {
    pub const ALL: [BorrowStatus; 6] = [
        BorrowStatus::Pending,
        BorrowStatus::Approved,
        BorrowStatus::Declined,
        BorrowStatus::Returned,
        BorrowStatus::Lost,
        BorrowStatus::Damaged,
    ];

    /// Database/text representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Pending => "pending",
            BorrowStatus::Approved => "approved",
            BorrowStatus::Declined => "declined",
            BorrowStatus::Returned => "returned",
            BorrowStatus::Lost => "lost",
            BorrowStatus::Damaged => "damaged",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BorrowStatus::Pending),
            "approved" => Some(BorrowStatus::Approved),
            "declined" => Some(BorrowStatus::Declined),
            "returned" => Some(BorrowStatus::Returned),
            "lost" => Some(BorrowStatus::Lost),
            "damaged" => Some(BorrowStatus::Damaged),
            _ => None,
        }
    }

    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BorrowStatus::Declined
                | BorrowStatus::Returned
                | BorrowStatus::Lost
                | BorrowStatus::Damaged
        )
    }

    /// Whether the state machine defines `self -> next`.
    pub fn can_transition_to(self, next: BorrowStatus) -> bool {
        matches!(
            (self, next),
            (BorrowStatus::Pending, BorrowStatus::Approved)
                | (BorrowStatus::Pending, BorrowStatus::Declined)
                | (BorrowStatus::Approved, BorrowStatus::Returned)
                | (BorrowStatus::Approved, BorrowStatus::Lost)
                | (BorrowStatus::Approved, BorrowStatus::Damaged)
        )
    }
}

/// Validate a requested loan duration in days.
pub fn validate_duration(days: i64) -> Result<i16, String> {
    if !(MIN_LOAN_DAYS..=MAX_LOAN_DAYS).contains(&days) {
        return Err(format!(
            "Requested duration must be between {} and {} days",
            MIN_LOAN_DAYS, MAX_LOAN_DAYS
        ));
    }
    Ok(days as i16)
}

/// A borrower's request against a single book, from creation to terminal
/// disposition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowRequest {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub status: BorrowStatus,
    pub request_date: DateTime<Utc>,
    pub requested_duration: i16,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub renewal_count: i16,
    pub approved_by: Option<i32>,
}

impl BorrowRequest {
    /// An approved, unreturned loan past its due date.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == BorrowStatus::Approved
            && self.return_date.is_none()
            && self.due_date.map(|due| due < now).unwrap_or(false)
    }

    /// Days until the due date (ceiling), negative when overdue. Defined
    /// only for active approved loans.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.status != BorrowStatus::Approved || self.return_date.is_some() {
            return None;
        }
        let due = self.due_date?;
        // Ceiling division toward positive infinity; stable equivalent of
        // `i64::div_ceil` (SECONDS_PER_DAY is always positive).
        let secs = (due - now).num_seconds();
        let days = secs / SECONDS_PER_DAY;
        let rem = secs % SECONDS_PER_DAY;
        Some(if rem > 0 { days + 1 } else { days })
    }

    /// Whether another renewal is allowed.
    pub fn can_renew(&self) -> bool {
        self.status == BorrowStatus::Approved
            && self.return_date.is_none()
            && self.renewal_count < MAX_RENEWALS
    }
}

/// Borrow request joined with its book, as shown in a borrower's history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowHistoryEntry {
    #[serde(flatten)]
    pub request: BorrowRequest,
    pub book_title: String,
    pub book_author: String,
    pub is_overdue: bool,
    pub days_remaining: Option<i64>,
}

/// Pending request as listed on the admin dashboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingRequest {
    pub id: i32,
    pub user_id: i32,
    pub user_name: String,
    pub user_email: String,
    pub book_id: i32,
    pub book_title: String,
    pub book_author: String,
    pub request_date: DateTime<Utc>,
    pub requested_duration: i16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(status: BorrowStatus) -> BorrowRequest {
        BorrowRequest {
            id: 1,
            user_id: 10,
            book_id: 20,
            status,
            request_date: Utc::now(),
            requested_duration: 14,
            due_date: None,
            return_date: None,
            renewal_count: 0,
            approved_by: None,
        }
    }

    #[test]
    fn test_transitions_from_pending() {
        let pending = BorrowStatus::Pending;
        assert!(pending.can_transition_to(BorrowStatus::Approved));
        assert!(pending.can_transition_to(BorrowStatus::Declined));
        assert!(!pending.can_transition_to(BorrowStatus::Returned));
        assert!(!pending.can_transition_to(BorrowStatus::Lost));
        assert!(!pending.can_transition_to(BorrowStatus::Damaged));
        assert!(!pending.can_transition_to(BorrowStatus::Pending));
    }

    #[test]
    fn test_transitions_from_approved() {
        let approved = BorrowStatus::Approved;
        assert!(approved.can_transition_to(BorrowStatus::Returned));
        assert!(approved.can_transition_to(BorrowStatus::Lost));
        assert!(approved.can_transition_to(BorrowStatus::Damaged));
        assert!(!approved.can_transition_to(BorrowStatus::Pending));
        assert!(!approved.can_transition_to(BorrowStatus::Declined));
    }

    #[test]
    fn test_terminal_states_admit_nothing() {
        for terminal in [
            BorrowStatus::Declined,
            BorrowStatus::Returned,
            BorrowStatus::Lost,
            BorrowStatus::Damaged,
        ] {
            assert!(terminal.is_terminal());
            for next in BorrowStatus::ALL {
                assert!(
                    !terminal.can_transition_to(next),
                    "{:?} -> {:?} must be rejected",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in BorrowStatus::ALL {
            assert_eq!(BorrowStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BorrowStatus::parse("on-hold"), None);
    }

    #[test]
    fn test_duration_bounds() {
        assert!(validate_duration(0).is_err());
        assert!(validate_duration(31).is_err());
        assert_eq!(validate_duration(1), Ok(1));
        assert_eq!(validate_duration(30), Ok(30));
        assert_eq!(validate_duration(DEFAULT_LOAN_DAYS), Ok(14));
    }

    #[test]
    fn test_days_remaining_ceils() {
        let approved_at = Utc::now();
        let mut req = request(BorrowStatus::Approved);
        req.due_date = Some(approved_at + Duration::days(14));

        // Ten days in: four full days left.
        let now = approved_at + Duration::days(10);
        assert_eq!(req.days_remaining(now), Some(4));

        // Half a day before the due date still counts as one day.
        let now = approved_at + Duration::days(13) + Duration::hours(12);
        assert_eq!(req.days_remaining(now), Some(1));
    }

    #[test]
    fn test_days_remaining_undefined_outside_active_loan() {
        let now = Utc::now();
        assert_eq!(request(BorrowStatus::Pending).days_remaining(now), None);

        let mut returned = request(BorrowStatus::Returned);
        returned.due_date = Some(now + Duration::days(3));
        returned.return_date = Some(now);
        assert_eq!(returned.days_remaining(now), None);
    }

    #[test]
    fn test_overdue() {
        let now = Utc::now();
        let mut req = request(BorrowStatus::Approved);
        req.due_date = Some(now - Duration::days(1));
        assert!(req.is_overdue(now));

        req.return_date = Some(now);
        assert!(!req.is_overdue(now));

        let mut pending = request(BorrowStatus::Pending);
        pending.due_date = Some(now - Duration::days(1));
        assert!(!pending.is_overdue(now));
    }

    #[test]
    fn test_renewal_bound() {
        let mut req = request(BorrowStatus::Approved);
        assert!(req.can_renew());
        req.renewal_count = MAX_RENEWALS;
        assert!(!req.can_renew());

        let pending = request(BorrowStatus::Pending);
        assert!(!pending.can_renew());
    }
}
