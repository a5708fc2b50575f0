//! Membership reconciliation between tasks, users and groups
//!
//! Three links exist: task–group, task–user and user–group. Each side keeps
//! its own id list; every change goes through a "set the full desired
//! membership" operation which rewrites the owner's list and patches the
//! reciprocal list on every affected record of the opposite kind.

use std::fmt;

use crate::collection::Collection;
use crate::ids::{EntityKind, EntityRef, Identified, RecordId};
use crate::models::{Item, Person, Team};
use crate::store::TaskStore;

type ListMut<T> = fn(&mut T) -> &mut Vec<RecordId>;
type ListRef<T> = fn(&T) -> &[RecordId];

/// What a reconciliation changed on the owner's list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    /// Ids that were newly added
    pub added: Vec<RecordId>,
    /// Ids that were present before and are gone now
    pub removed: Vec<RecordId>,
}

impl MembershipDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A broken link found by [`TaskStore::consistency_report`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkIssue {
    /// `from` lists `to`, but `to` does not list `from` back
    OneSided { from: EntityRef, to: EntityRef },
    /// `from` lists an id with no record behind it
    Dangling { from: EntityRef, to: EntityRef },
}

impl fmt::Display for LinkIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkIssue::OneSided { from, to } => {
                write!(f, "{} lists {}, but not the other way round", from, to)
            }
            LinkIssue::Dangling { from, to } => write!(f, "{} lists missing {}", from, to),
        }
    }
}

/// Keeps first occurrences of ids that resolve in `targets`
fn normalize<T: Identified>(desired: &[RecordId], targets: &Collection<T>) -> Vec<RecordId> {
    let mut ids = Vec::with_capacity(desired.len());
    for id in desired {
        if !ids.contains(id) && targets.contains(*id) {
            ids.push(*id);
        }
    }
    ids
}

/// Replaces the owner's list with `desired` and patches both sides.
///
/// Returns `None` when the owner does not exist.
fn reconcile<O: Identified, T: Identified>(
    owner_id: RecordId,
    desired: &[RecordId],
    owners: &mut Collection<O>,
    owner_list: ListMut<O>,
    targets: &mut Collection<T>,
    target_list: ListMut<T>,
) -> Option<MembershipDelta> {
    let desired = normalize(desired, targets);
    let owner = owners.get_mut(owner_id)?;
    let previous = std::mem::replace(owner_list(owner), desired.clone());

    let added: Vec<RecordId> = desired
        .iter()
        .filter(|id| !previous.contains(id))
        .copied()
        .collect();
    let removed: Vec<RecordId> = previous
        .iter()
        .filter(|id| !desired.contains(id))
        .copied()
        .collect();

    // Every desired target gets the reciprocal, which also heals links that
    // were one-sided before this call.
    for id in &desired {
        if let Some(target) = targets.get_mut(*id) {
            let list = target_list(target);
            if !list.contains(&owner_id) {
                list.push(owner_id);
            }
        }
    }
    for id in &removed {
        if let Some(target) = targets.get_mut(*id) {
            target_list(target).retain(|other| *other != owner_id);
        }
    }

    Some(MembershipDelta { added, removed })
}

/// Strips `owner_id` from the given list on every record of `targets`
fn detach_everywhere<T>(
    owner_id: RecordId,
    targets: &mut Collection<T>,
    target_list: ListMut<T>,
) -> usize
where
    T: Identified,
{
    let mut touched = 0;
    for target in targets.iter_mut() {
        let list = target_list(target);
        let before = list.len();
        list.retain(|id| *id != owner_id);
        if list.len() != before {
            touched += 1;
        }
    }
    touched
}

fn check_side<A: Identified, B: Identified>(
    a_kind: EntityKind,
    a: &Collection<A>,
    a_list: ListRef<A>,
    b_kind: EntityKind,
    b: &Collection<B>,
    b_list: ListRef<B>,
    issues: &mut Vec<LinkIssue>,
) {
    for record in a {
        let from = EntityRef::new(a_kind, record.id());
        for id in a_list(record) {
            let to = EntityRef::new(b_kind, *id);
            match b.get(*id) {
                None => issues.push(LinkIssue::Dangling { from, to }),
                Some(other) if !b_list(other).contains(&record.id()) => {
                    issues.push(LinkIssue::OneSided { from, to })
                }
                Some(_) => {}
            }
        }
    }
}

/// Drops dangling and repeated ids from `a`'s lists and adds missing
/// reciprocals on `b`. Returns the number of fixes.
fn repair_side<A: Identified, B: Identified>(
    a: &mut Collection<A>,
    a_list: ListMut<A>,
    b: &mut Collection<B>,
    b_list: ListMut<B>,
) -> usize {
    let mut fixes = 0;
    for record in a.iter_mut() {
        let owner_id = record.id();
        let list = a_list(record);
        let before = list.len();
        let mut kept: Vec<RecordId> = Vec::with_capacity(before);
        for id in list.iter() {
            if !kept.contains(id) && b.contains(*id) {
                kept.push(*id);
            }
        }
        fixes += before - kept.len();
        *list = kept;

        for id in list.iter() {
            if let Some(other) = b.get_mut(*id) {
                let reciprocal = b_list(other);
                if !reciprocal.contains(&owner_id) {
                    reciprocal.push(owner_id);
                    fixes += 1;
                }
            }
        }
    }
    fixes
}

impl TaskStore {
    /// Sets the groups a task belongs to
    pub fn set_item_teams(
        &mut self,
        item_id: RecordId,
        team_ids: &[RecordId],
    ) -> Option<MembershipDelta> {
        reconcile(
            item_id,
            team_ids,
            &mut self.items,
            Item::team_ids_mut,
            &mut self.teams,
            Team::item_ids_mut,
        )
    }

    /// Sets the users a task is assigned to
    pub fn set_item_people(
        &mut self,
        item_id: RecordId,
        person_ids: &[RecordId],
    ) -> Option<MembershipDelta> {
        reconcile(
            item_id,
            person_ids,
            &mut self.items,
            Item::person_ids_mut,
            &mut self.people,
            Person::item_ids_mut,
        )
    }

    /// Sets the groups a user belongs to
    pub fn set_person_teams(
        &mut self,
        person_id: RecordId,
        team_ids: &[RecordId],
    ) -> Option<MembershipDelta> {
        reconcile(
            person_id,
            team_ids,
            &mut self.people,
            Person::team_ids_mut,
            &mut self.teams,
            Team::person_ids_mut,
        )
    }

    /// Sets the tasks assigned to a user
    pub fn set_person_items(
        &mut self,
        person_id: RecordId,
        item_ids: &[RecordId],
    ) -> Option<MembershipDelta> {
        reconcile(
            person_id,
            item_ids,
            &mut self.people,
            Person::item_ids_mut,
            &mut self.items,
            Item::person_ids_mut,
        )
    }

    /// Sets the members of a group
    pub fn set_team_people(
        &mut self,
        team_id: RecordId,
        person_ids: &[RecordId],
    ) -> Option<MembershipDelta> {
        reconcile(
            team_id,
            person_ids,
            &mut self.teams,
            Team::person_ids_mut,
            &mut self.people,
            Person::team_ids_mut,
        )
    }

    /// Sets the tasks assigned to a group
    pub fn set_team_items(
        &mut self,
        team_id: RecordId,
        item_ids: &[RecordId],
    ) -> Option<MembershipDelta> {
        reconcile(
            team_id,
            item_ids,
            &mut self.teams,
            Team::item_ids_mut,
            &mut self.items,
            Item::team_ids_mut,
        )
    }

    /// Removes every reference to a task from users and groups
    pub(crate) fn detach_item(&mut self, item_id: RecordId) {
        self.set_item_teams(item_id, &[]);
        self.set_item_people(item_id, &[]);
        detach_everywhere(item_id, &mut self.teams, Team::item_ids_mut);
        detach_everywhere(item_id, &mut self.people, Person::item_ids_mut);
    }

    pub(crate) fn detach_person(&mut self, person_id: RecordId) {
        self.set_person_teams(person_id, &[]);
        self.set_person_items(person_id, &[]);
        detach_everywhere(person_id, &mut self.teams, Team::person_ids_mut);
        detach_everywhere(person_id, &mut self.items, Item::person_ids_mut);
    }

    pub(crate) fn detach_team(&mut self, team_id: RecordId) {
        self.set_team_people(team_id, &[]);
        self.set_team_items(team_id, &[]);
        detach_everywhere(team_id, &mut self.people, Person::team_ids_mut);
        detach_everywhere(team_id, &mut self.items, Item::team_ids_mut);
    }

    /// Lists one-sided and dangling links without changing anything
    pub fn consistency_report(&self) -> Vec<LinkIssue> {
        use EntityKind::{Item as I, Person as P, Team as T};

        let (items, teams, people) = (&self.items, &self.teams, &self.people);
        let mut issues = Vec::new();
        check_side(I, items, Item::team_ids, T, teams, Team::item_ids, &mut issues);
        check_side(T, teams, Team::item_ids, I, items, Item::team_ids, &mut issues);
        check_side(I, items, Item::person_ids, P, people, Person::item_ids, &mut issues);
        check_side(P, people, Person::item_ids, I, items, Item::person_ids, &mut issues);
        check_side(P, people, Person::team_ids, T, teams, Team::person_ids, &mut issues);
        check_side(T, teams, Team::person_ids, P, people, Person::team_ids, &mut issues);
        issues
    }

    /// Makes every link symmetric and drops dangling ids.
    ///
    /// A one-sided link is completed rather than removed. Returns the number
    /// of list entries added or removed.
    pub fn repair_links(&mut self) -> usize {
        let TaskStore {
            items,
            people,
            teams,
            ..
        } = self;
        let mut fixes = 0;
        fixes += repair_side(items, Item::team_ids_mut, teams, Team::item_ids_mut);
        fixes += repair_side(teams, Team::item_ids_mut, items, Item::team_ids_mut);
        fixes += repair_side(items, Item::person_ids_mut, people, Person::item_ids_mut);
        fixes += repair_side(people, Person::item_ids_mut, items, Item::person_ids_mut);
        fixes += repair_side(people, Person::team_ids_mut, teams, Team::person_ids_mut);
        fixes += repair_side(teams, Team::person_ids_mut, people, Person::team_ids_mut);
        if fixes > 0 {
            log::warn!("Repaired {} relationship entries", fixes);
        }
        fixes
    }
}
