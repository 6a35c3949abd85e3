//! Borrow (loan) model and the derived read models

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{book::Book, id::ObjectId, user::User};

/// Loans open for longer than this are overdue
pub const OVERDUE_AFTER_DAYS: i64 = 21;

pub fn overdue_threshold() -> Duration {
    Duration::days(OVERDUE_AFTER_DAYS)
}

/// Loan record. Open while `returned_at` is `None`; closes once and stays closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Borrow {
    #[schema(value_type = String)]
    pub id: ObjectId,
    #[schema(value_type = String)]
    pub client_id: ObjectId,
    #[schema(value_type = String)]
    pub book_id: ObjectId,
    pub borrowed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
}

impl Borrow {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }

    /// Open and borrowed more than [`OVERDUE_AFTER_DAYS`] before `now`
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && now - self.borrowed_at > overdue_threshold()
    }

    /// Whole days past the threshold, never negative
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        ((now - self.borrowed_at).num_days() - OVERDUE_AFTER_DAYS).max(0)
    }
}

/// Data for a new open loan
#[derive(Debug, Clone)]
pub struct NewBorrow {
    pub client_id: ObjectId,
    pub book_id: ObjectId,
    pub borrowed_at: DateTime<Utc>,
}

impl NewBorrow {
    pub fn into_borrow(self, id: ObjectId) -> Borrow {
        Borrow {
            id,
            client_id: self.client_id,
            book_id: self.book_id,
            borrowed_at: self.borrowed_at,
            returned_at: None,
        }
    }
}

/// Borrow request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BorrowBookRequest {
    pub user_id: String,
    pub book_id: String,
}

/// Number of distinct readers who borrowed on a calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowStat {
    /// YYYY-MM-DD
    pub date: NaiveDate,
    pub unique_readers: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Ok,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowHistoryItem {
    #[schema(value_type = String)]
    pub borrow_id: ObjectId,
    #[schema(value_type = String)]
    pub book_id: ObjectId,
    pub title: String,
    pub author: String,
    pub borrowed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
}

impl BorrowHistoryItem {
    pub fn new(borrow: &Borrow, book: &Book, now: DateTime<Utc>) -> Self {
        let status = if borrow.is_overdue(now) {
            BorrowStatus::Overdue
        } else {
            BorrowStatus::Ok
        };
        Self {
            borrow_id: borrow.id,
            book_id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            borrowed_at: borrow.borrowed_at,
            returned_at: borrow.returned_at,
            status,
        }
    }
}

/// A reader's loans, overdue ones first
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowHistory {
    #[schema(value_type = String)]
    pub user_id: ObjectId,
    pub full_name: String,
    pub phone: String,
    pub history: Vec<BorrowHistoryItem>,
}

/// Order history items: every overdue item, then every other item, each
/// group ascending by `borrowed_at` and stable for equal timestamps.
pub fn order_history(items: Vec<BorrowHistoryItem>) -> Vec<BorrowHistoryItem> {
    let (mut overdue, mut ok): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| item.status == BorrowStatus::Overdue);

    overdue.sort_by_key(|item| item.borrowed_at);
    ok.sort_by_key(|item| item.borrowed_at);

    overdue.extend(ok);
    overdue
}

/// One overdue loan, annotated with the reader's overdue total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverdueReportItem {
    #[schema(value_type = String)]
    pub user_id: ObjectId,
    pub full_name: String,
    pub phone: String,
    #[schema(value_type = String)]
    pub book_id: ObjectId,
    pub title: String,
    pub author: String,
    pub borrowed_at: DateTime<Utc>,
    pub days_overdue: i64,
    /// Overdue loans held by the same reader
    pub total_overdue: usize,
}

impl OverdueReportItem {
    pub fn new(
        borrow: &Borrow,
        user: &User,
        book: &Book,
        now: DateTime<Utc>,
        total_overdue: usize,
    ) -> Self {
        Self {
            user_id: user.id,
            full_name: user.full_name.clone(),
            phone: user.phone.clone(),
            book_id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            borrowed_at: borrow.borrowed_at,
            days_overdue: borrow.days_overdue(now),
            total_overdue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn borrow_aged(age: Duration, returned: bool) -> Borrow {
        let borrowed_at = now() - age;
        Borrow {
            id: ObjectId::new(),
            client_id: ObjectId::new(),
            book_id: ObjectId::new(),
            borrowed_at,
            returned_at: returned.then(|| borrowed_at + Duration::days(1)),
        }
    }

    #[rstest]
    #[case::fresh(Duration::days(1), false, false)]
    #[case::exactly_threshold(Duration::days(21), false, false)]
    #[case::one_second_past(Duration::days(21) + Duration::seconds(1), false, true)]
    #[case::long_overdue(Duration::days(90), false, true)]
    #[case::returned_late(Duration::days(90), true, false)]
    fn test_overdue_classification(
        #[case] age: Duration,
        #[case] returned: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(borrow_aged(age, returned).is_overdue(now()), expected);
    }

    #[rstest]
    #[case(Duration::days(30), 9)]
    #[case(Duration::days(21) + Duration::hours(23), 0)]
    #[case(Duration::days(22) + Duration::hours(23), 1)]
    #[case(Duration::days(3), 0)]
    fn test_days_overdue_is_floored_and_clamped(#[case] age: Duration, #[case] expected: i64) {
        assert_eq!(borrow_aged(age, false).days_overdue(now()), expected);
    }

    fn item(status: BorrowStatus, day: u32, title: &str) -> BorrowHistoryItem {
        BorrowHistoryItem {
            borrow_id: ObjectId::new(),
            book_id: ObjectId::new(),
            title: title.into(),
            author: "A".into(),
            borrowed_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            returned_at: None,
            status,
        }
    }

    #[test]
    fn test_history_puts_overdue_first_then_sorts_each_group() {
        let ordered = order_history(vec![
            item(BorrowStatus::Ok, 3, "ok-3"),
            item(BorrowStatus::Overdue, 5, "late-5"),
            item(BorrowStatus::Ok, 1, "ok-1"),
            item(BorrowStatus::Overdue, 2, "late-2"),
        ]);

        let titles: Vec<_> = ordered.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["late-2", "late-5", "ok-1", "ok-3"]);
    }

    #[test]
    fn test_history_sort_is_stable_for_equal_dates() {
        let ordered = order_history(vec![
            item(BorrowStatus::Ok, 4, "first"),
            item(BorrowStatus::Ok, 4, "second"),
            item(BorrowStatus::Ok, 4, "third"),
        ]);

        let titles: Vec<_> = ordered.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn test_stat_date_serializes_as_calendar_day() {
        let stat = BorrowStat {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            unique_readers: 2,
        };
        let json = serde_json::to_value(stat).unwrap();
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["uniqueReaders"], 2);
    }

    #[test]
    fn test_open_loan_omits_returned_at() {
        let json = serde_json::to_value(borrow_aged(Duration::days(1), false)).unwrap();
        assert!(json.get("returnedAt").is_none());
        assert!(json["clientId"].is_string());
    }
}
