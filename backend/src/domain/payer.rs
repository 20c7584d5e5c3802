// paid_by is an untyped id, checked against self, participants, then friends.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Participant, Profile};

pub const SELF_LABEL: &str = "Myself";
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum PayerRef {
    Myself,
    Participant(Uuid),
    Friend(Uuid),
}

impl PayerRef {
    pub fn stored_id(&self, acting_user_id: Uuid) -> Uuid {
        match *self {
            PayerRef::Myself => acting_user_id,
            PayerRef::Participant(id) | PayerRef::Friend(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPayer {
    pub display_name: String,
    pub is_self: bool,
    pub is_participant: bool,
    pub avatar_url: Option<String>,
    pub reference: Option<PayerRef>,
}

impl ResolvedPayer {
    fn unknown() -> Self {
        ResolvedPayer {
            display_name: UNKNOWN_LABEL.to_string(),
            is_self: false,
            is_participant: false,
            avatar_url: None,
            reference: None,
        }
    }
}

pub fn classify(
    paid_by: Option<Uuid>,
    acting_user_id: Uuid,
    participants: &[Participant],
    friends: &[Profile],
) -> Option<PayerRef> {
    let id = paid_by?;
    if id == acting_user_id {
        Some(PayerRef::Myself)
    } else if participants.iter().any(|p| p.id == id) {
        Some(PayerRef::Participant(id))
    } else if friends.iter().any(|f| f.id == id) {
        Some(PayerRef::Friend(id))
    } else {
        None
    }
}

pub fn resolve_payer(
    paid_by: Option<Uuid>,
    acting_user_id: Uuid,
    participants: &[Participant],
    friends: &[Profile],
) -> ResolvedPayer {
    match classify(paid_by, acting_user_id, participants, friends) {
        None => ResolvedPayer::unknown(),
        Some(PayerRef::Myself) => ResolvedPayer {
            display_name: SELF_LABEL.to_string(),
            is_self: true,
            is_participant: false,
            avatar_url: None,
            reference: Some(PayerRef::Myself),
        },
        Some(reference @ PayerRef::Participant(id)) => participants
            .iter()
            .find(|p| p.id == id)
            .map(|p| ResolvedPayer {
                display_name: p.name.clone(),
                is_self: false,
                is_participant: true,
                avatar_url: None,
                reference: Some(reference),
            })
            .unwrap_or_else(ResolvedPayer::unknown),
        Some(reference @ PayerRef::Friend(id)) => friends
            .iter()
            .find(|f| f.id == id)
            .map(|f| ResolvedPayer {
                display_name: f.display_name(),
                is_self: false,
                is_participant: false,
                avatar_url: f.avatar_url.clone(),
                reference: Some(reference),
            })
            .unwrap_or_else(ResolvedPayer::unknown),
    }
}
