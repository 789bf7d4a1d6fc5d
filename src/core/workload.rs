use crate::domain::model::{Assignee, BacklogItem, TeamMember, TeamMemberWorkload};
use std::collections::HashMap;

const UNKNOWN_MEMBER_NAME: &str = "Unknown member";
const DEFAULT_ROLE: &str = "developer";

fn roster_match<'a>(assignee: &Assignee, roster: &'a [TeamMember]) -> Option<&'a TeamMember> {
    let by_id = assignee
        .id
        .as_deref()
        .and_then(|id| roster.iter().find(|member| member.id.as_deref() == Some(id)));

    by_id.or_else(|| {
        assignee.email.as_deref().and_then(|email| {
            roster.iter().find(|member| {
                member
                    .email
                    .as_deref()
                    .is_some_and(|candidate| candidate.eq_ignore_ascii_case(email))
            })
        })
    })
}

fn new_workload(key: String, assignee: &Assignee, roster: &[TeamMember]) -> TeamMemberWorkload {
    let member = roster_match(assignee, roster);
    let email = assignee
        .email
        .clone()
        .or_else(|| member.and_then(|m| m.email.clone()));
    let name = assignee
        .name
        .clone()
        .or_else(|| member.and_then(|m| m.name.clone()))
        .or_else(|| email.clone())
        .unwrap_or_else(|| UNKNOWN_MEMBER_NAME.to_string());
    let role = assignee
        .role
        .clone()
        .or_else(|| member.and_then(|m| m.role.clone()))
        .unwrap_or_else(|| DEFAULT_ROLE.to_string());

    TeamMemberWorkload {
        id: key,
        name,
        email,
        role,
        planned_points: 0.0,
        completed_points: 0.0,
        items: Vec::new(),
    }
}

/// Groups assigned items per member in encounter order.
///
/// Unassigned items are skipped here; they still count towards the sprint
/// totals computed by the aggregator. `roster` fills in name, email and role
/// when an item only references the member by id or email.
pub fn derive_workload(items: &[BacklogItem], roster: &[TeamMember]) -> Vec<TeamMemberWorkload> {
    let mut workloads: Vec<TeamMemberWorkload> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let Some(assignee) = item.assigned_to.as_ref() else {
            continue;
        };
        let key = assignee.group_key();

        let position = match index.get(&key) {
            Some(position) => *position,
            None => {
                workloads.push(new_workload(key.clone(), assignee, roster));
                index.insert(key, workloads.len() - 1);
                workloads.len() - 1
            }
        };

        let workload = &mut workloads[position];
        workload.planned_points += item.story_points;
        if item.status.is_completed() {
            workload.completed_points += item.story_points;
        }
        workload.items.push(item.clone());
    }

    workloads
}
