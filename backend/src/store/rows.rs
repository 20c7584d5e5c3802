use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Budget, Category, CategoryGroup, Friend, GroupMember, Participant, Profile, Reminder,
    Transaction,
};

// Database row types. Enumerations and amounts are converted on the way out.

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub default_group_id: Option<Uuid>,
    pub default_category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CategoryGroupRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct GroupMemberRow {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[sqlx(rename = "type")]
    pub category_type: String,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ParticipantRow {
    pub id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    pub transaction_type: String,
    pub amount: BigDecimal,
    pub note: Option<String>,
    pub transaction_date: NaiveDate,
    pub category_id: Option<Uuid>,
    pub category_group_id: Option<Uuid>,
    pub paid_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BudgetRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub period: String,
    pub start_date: NaiveDate,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReminderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub amount: Option<BigDecimal>,
    pub due_date: NaiveDate,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct FriendRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub friend_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

fn to_amount(value: &BigDecimal) -> Result<f64, StoreError> {
    value
        .to_f64()
        .ok_or_else(|| StoreError::Corrupt(format!("amount {value} is not representable")))
}

// Rounded to the cent through the text form, not truncated from the binary value.
pub fn from_amount(value: f64) -> Result<BigDecimal, StoreError> {
    if !value.is_finite() {
        return Err(StoreError::Corrupt(format!("amount {value} is not a finite number")));
    }
    BigDecimal::from_str(&format!("{value:.2}"))
        .map_err(|e| StoreError::Corrupt(format!("amount {value}: {e}")))
}

fn parse_text<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T, StoreError> {
    value.parse().map_err(StoreError::Corrupt)
}

// Conversion helpers

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
            default_group_id: row.default_group_id,
            default_category_id: row.default_category_id,
            created_at: row.created_at,
        }
    }
}

impl From<CategoryGroupRow> for CategoryGroup {
    fn from(row: CategoryGroupRow) -> Self {
        CategoryGroup {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Participant {
            id: row.id,
            created_by: row.created_by,
            name: row.name,
            email: row.email,
            group_id: row.group_id,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<GroupMemberRow> for GroupMember {
    type Error = StoreError;

    fn try_from(row: GroupMemberRow) -> Result<Self, Self::Error> {
        Ok(GroupMember {
            id: row.id,
            group_id: row.group_id,
            user_id: row.user_id,
            role: parse_text(&row.role)?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<CategoryRow> for Category {
    type Error = StoreError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(Category {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            category_type: parse_text(&row.category_type)?,
            group_id: row.group_id,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            user_id: row.user_id,
            transaction_type: parse_text(&row.transaction_type)?,
            amount: to_amount(&row.amount)?,
            note: row.note,
            transaction_date: row.transaction_date,
            category_id: row.category_id,
            category_group_id: row.category_group_id,
            paid_by: row.paid_by,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<BudgetRow> for Budget {
    type Error = StoreError;

    fn try_from(row: BudgetRow) -> Result<Self, Self::Error> {
        Ok(Budget {
            id: row.id,
            user_id: row.user_id,
            amount: to_amount(&row.amount)?,
            period: parse_text(&row.period)?,
            start_date: row.start_date,
            category_id: row.category_id,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = StoreError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        Ok(Reminder {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            amount: row.amount.as_ref().map(to_amount).transpose()?,
            due_date: row.due_date,
            is_completed: row.is_completed,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<FriendRow> for Friend {
    type Error = StoreError;

    fn try_from(row: FriendRow) -> Result<Self, Self::Error> {
        Ok(Friend {
            id: row.id,
            user_id: row.user_id,
            friend_id: row.friend_id,
            status: parse_text(&row.status)?,
            created_at: row.created_at,
        })
    }
}

/// Converts a batch of rows, failing on the first corrupt one.
pub fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::models::{FriendStatus, TransactionType};

    #[test]
    fn transaction_rows_convert_amounts_and_types() {
        let row = TransactionRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            transaction_type: "expense".into(),
            amount: BigDecimal::from_str("42.50").unwrap(),
            note: None,
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            category_id: None,
            category_group_id: None,
            paid_by: None,
            created_at: Utc::now(),
        };
        let tx = Transaction::try_from(row).unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Expense);
        assert_eq!(tx.amount, 42.5);
    }

    #[test]
    fn unknown_enum_text_is_reported_as_corrupt() {
        let row = FriendRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            friend_id: Uuid::new_v4(),
            status: "deleted".into(),
            created_at: Utc::now(),
        };
        assert!(matches!(Friend::try_from(row), Err(StoreError::Corrupt(_))));

        let ok = FriendRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            friend_id: Uuid::new_v4(),
            status: "accepted".into(),
            created_at: Utc::now(),
        };
        assert_eq!(Friend::try_from(ok).unwrap().status, FriendStatus::Accepted);
    }

    #[test]
    fn amounts_are_stored_with_two_decimals() {
        assert_eq!(from_amount(12.5).unwrap().to_string(), "12.50");
        assert!(from_amount(f64::NAN).is_err());
        assert!(from_amount(f64::INFINITY).is_err());
    }

    #[test]
    fn cent_amounts_round_instead_of_truncating() {
        for (value, stored) in [(0.29, "0.29"), (1.15, "1.15"), (19.99, "19.99"), (0.57, "0.57"), (0.004, "0.00")] {
            assert_eq!(from_amount(value).unwrap().to_string(), stored, "{value}");
        }
        let back = to_amount(&from_amount(19.99).unwrap()).unwrap();
        assert_eq!(back, 19.99);
    }
}
