use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payer::{PayerRef, SELF_LABEL};
use crate::models::{Participant, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayerSource {
    Myself,
    Participant,
    GroupMember,
    Friend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayerOption {
    pub reference: PayerRef,
    pub label: String,
    pub avatar_url: Option<String>,
    pub source: PayerSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayerSelection {
    pub options: Vec<PayerOption>,
    pub selected: PayerRef,
}

pub fn participant_in_scope(participant: &Participant, group_id: Option<Uuid>) -> bool {
    match group_id {
        None => true,
        Some(group) => participant.group_id == Some(group),
    }
}

pub fn participants_in_scope(
    participants: &[Participant],
    group_id: Option<Uuid>,
) -> Vec<&Participant> {
    participants
        .iter()
        .filter(|p| participant_in_scope(p, group_id))
        .collect()
}

// Self, scoped participants, group members, friends. Each user at most once.
pub fn payer_options(
    acting_user_id: Uuid,
    group_id: Option<Uuid>,
    participants: &[Participant],
    group_members: &[Profile],
    friends: &[Profile],
) -> Vec<PayerOption> {
    let mut options = vec![PayerOption {
        reference: PayerRef::Myself,
        label: SELF_LABEL.to_string(),
        avatar_url: None,
        source: PayerSource::Myself,
    }];

    options.extend(
        participants_in_scope(participants, group_id)
            .into_iter()
            .map(|p| PayerOption {
                reference: PayerRef::Participant(p.id),
                label: p.name.clone(),
                avatar_url: None,
                source: PayerSource::Participant,
            }),
    );

    let mut seen: HashSet<Uuid> = HashSet::from([acting_user_id]);
    let registered = group_members
        .iter()
        .map(|profile| (profile, PayerSource::GroupMember))
        .chain(friends.iter().map(|profile| (profile, PayerSource::Friend)));
    for (profile, source) in registered {
        if seen.insert(profile.id) {
            options.push(PayerOption {
                reference: PayerRef::Friend(profile.id),
                label: profile.display_name(),
                avatar_url: profile.avatar_url.clone(),
                source,
            });
        }
    }

    options
}

pub fn reconcile_payer(
    current: PayerRef,
    group_id: Option<Uuid>,
    participants: &[Participant],
) -> PayerRef {
    match current {
        PayerRef::Participant(id) => {
            let still_valid = participants
                .iter()
                .any(|p| p.id == id && participant_in_scope(p, group_id));
            if still_valid { current } else { PayerRef::Myself }
        }
        other => other,
    }
}

pub fn payer_selection(
    acting_user_id: Uuid,
    group_id: Option<Uuid>,
    current: Option<PayerRef>,
    participants: &[Participant],
    group_members: &[Profile],
    friends: &[Profile],
) -> PayerSelection {
    let options = payer_options(acting_user_id, group_id, participants, group_members, friends);
    let mut selected = reconcile_payer(current.unwrap_or(PayerRef::Myself), group_id, participants);
    // A member of the previous group is not offered once the group changes.
    if !options.iter().any(|o| o.reference == selected) {
        selected = PayerRef::Myself;
    }
    PayerSelection { options, selected }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn participant(name: &str, group_id: Option<Uuid>) -> Participant {
        Participant {
            id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            name: name.into(),
            email: None,
            group_id,
            created_at: Utc::now(),
        }
    }

    fn profile(name: &str) -> Profile {
        let mut profile = Profile::new(Uuid::new_v4(), Some(format!("{name}@example.com")));
        profile.full_name = Some(name.into());
        profile
    }

    #[test]
    fn group_selection_filters_participants_only() {
        let me = Uuid::new_v4();
        let (business, personal) = (Uuid::new_v4(), Uuid::new_v4());
        let participants = vec![
            participant("Accountant", Some(business)),
            participant("Sister", Some(personal)),
            participant("Neighbour", None),
        ];
        let members = vec![profile("colleague")];
        let friends = vec![profile("buddy")];

        let options = payer_options(me, Some(business), &participants, &members, &friends);
        let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, ["Myself", "Accountant", "colleague", "buddy"]);

        let all = payer_options(me, None, &participants, &members, &friends);
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn members_who_are_also_friends_are_listed_once() {
        let me = Uuid::new_v4();
        let both = profile("pat");
        let options = payer_options(me, None, &[], &[both.clone()], &[both.clone()]);
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].source, PayerSource::GroupMember);
    }

    #[test]
    fn the_acting_user_is_not_duplicated_from_membership() {
        let mut me = profile("me");
        me.id = Uuid::new_v4();
        let options = payer_options(me.id, None, &[], &[me.clone()], &[]);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].reference, PayerRef::Myself);
    }

    #[test]
    fn switching_group_resets_an_out_of_scope_participant_to_myself() {
        let (business, personal) = (Uuid::new_v4(), Uuid::new_v4());
        let accountant = participant("Accountant", Some(business));
        let participants = vec![accountant.clone()];
        let current = PayerRef::Participant(accountant.id);

        assert_eq!(reconcile_payer(current, Some(business), &participants), current);
        assert_eq!(reconcile_payer(current, None, &participants), current);
        assert_eq!(
            reconcile_payer(current, Some(personal), &participants),
            PayerRef::Myself
        );
    }

    #[test]
    fn friends_and_unknown_participants_reconcile_predictably() {
        let group = Some(Uuid::new_v4());
        let friend = PayerRef::Friend(Uuid::new_v4());
        assert_eq!(reconcile_payer(friend, group, &[]), friend);
        assert_eq!(
            reconcile_payer(PayerRef::Participant(Uuid::new_v4()), None, &[]),
            PayerRef::Myself
        );
    }

    #[test]
    fn selection_never_points_outside_the_offered_options() {
        let me = Uuid::new_v4();
        let (flat, trip) = (Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        let flatmate = profile("flatmate");
        let current = Some(PayerRef::Friend(flatmate.id));

        let in_flat = payer_selection(me, flat, current, &[], &[flatmate.clone()], &[]);
        assert_eq!(in_flat.selected, PayerRef::Friend(flatmate.id));

        let in_trip = payer_selection(me, trip, current, &[], &[], &[]);
        assert_eq!(in_trip.selected, PayerRef::Myself);

        let as_friend = payer_selection(me, trip, current, &[], &[], &[flatmate.clone()]);
        assert_eq!(as_friend.selected, PayerRef::Friend(flatmate.id));
    }

    #[test]
    fn selection_defaults_to_myself() {
        let me = Uuid::new_v4();
        let selection = payer_selection(me, None, None, &[], &[], &[]);
        assert_eq!(selection.selected, PayerRef::Myself);
        assert_eq!(selection.options.len(), 1);
    }
}
