use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::payer::ResolvedPayer;

// Enumerations stored as text columns

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[field(value = "income")]
    Income,
    #[field(value = "expense")]
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Pending,
    Accepted,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Member,
    Admin,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!("unknown {} value '{}'", stringify!($ty), other)),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(TransactionType { Income => "income", Expense => "expense" });
text_enum!(BudgetPeriod { Weekly => "weekly", Monthly => "monthly" });
text_enum!(FriendStatus { Pending => "pending", Accepted => "accepted", Blocked => "blocked" });
text_enum!(MemberRole { Member => "member", Admin => "admin" });

// Entities

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub default_group_id: Option<Uuid>,
    pub default_category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(id: Uuid, email: Option<String>) -> Self {
        Profile {
            id,
            email,
            full_name: None,
            avatar_url: None,
            default_group_id: None,
            default_category_id: None,
            created_at: Utc::now(),
        }
    }

    /// Full name when set, otherwise the email address.
    pub fn display_name(&self) -> String {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or(self.email.as_deref())
            .unwrap_or("Unknown")
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// An unregistered payer, scoped to a category group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub note: Option<String>,
    pub transaction_date: NaiveDate,
    pub category_id: Option<Uuid>,
    pub category_group_id: Option<Uuid>,
    /// Either the owner, a participant, or another registered user. Resolved at read time.
    pub paid_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    /// `None` applies the budget to every expense category.
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub amount: Option<f64>,
    pub due_date: NaiveDate,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Directed friendship edge from `user_id` (requester) to `friend_id` (addressee).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friend {
    pub id: Uuid,
    pub user_id: Uuid,
    pub friend_id: Uuid,
    pub status: FriendStatus,
    pub created_at: DateTime<Utc>,
}

impl Friend {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.friend_id == user_id
    }

    pub fn other_party(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user_id == user_id {
            Some(self.friend_id)
        } else if self.friend_id == user_id {
            Some(self.user_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub category_name: Option<String>,
    pub payer: ResolvedPayer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendView {
    pub edge_id: Uuid,
    pub status: FriendStatus,
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendsOverview {
    pub friends: Vec<FriendView>,
    pub incoming: Vec<FriendView>,
    pub outgoing: Vec<FriendView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMemberView {
    #[serde(flatten)]
    pub member: GroupMember,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderView {
    #[serde(flatten)]
    pub reminder: Reminder,
    pub overdue: bool,
}

// Request DTOs

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub default_group_id: Option<Uuid>,
    pub default_category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryGroupRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddGroupMemberRequest {
    pub email: String,
    pub role: Option<MemberRole>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: MemberRole,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: String,
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantRequest {
    pub name: String,
    pub email: Option<String>,
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRequest {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub note: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub category_group_id: Option<Uuid>,
    /// Defaults to the acting user when absent.
    pub paid_by: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BudgetRequest {
    pub amount: f64,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderRequest {
    pub title: String,
    pub amount: Option<f64>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct FriendRequestBody {
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_round_trip_through_their_column_values() {
        assert_eq!("expense".parse::<TransactionType>(), Ok(TransactionType::Expense));
        assert_eq!(BudgetPeriod::Monthly.as_str(), "monthly");
        assert_eq!(FriendStatus::Blocked.to_string(), "blocked");
        assert!("owner".parse::<MemberRole>().is_err());
    }

    #[test]
    fn display_name_prefers_full_name_then_email() {
        let mut profile = Profile::new(Uuid::new_v4(), Some("ana@example.com".into()));
        assert_eq!(profile.display_name(), "ana@example.com");

        profile.full_name = Some("  ".into());
        assert_eq!(profile.display_name(), "ana@example.com");

        profile.full_name = Some("Ana Lima".into());
        assert_eq!(profile.display_name(), "Ana Lima");
    }

    #[test]
    fn friend_edge_reports_the_other_party() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let edge = Friend {
            id: Uuid::new_v4(),
            user_id: a,
            friend_id: b,
            status: FriendStatus::Pending,
            created_at: Utc::now(),
        };
        assert_eq!(edge.other_party(a), Some(b));
        assert_eq!(edge.other_party(b), Some(a));
        assert_eq!(edge.other_party(Uuid::new_v4()), None);
    }
}
