//! The in-memory row list behind the setlist search builder.
//!
//! A `RowList` is an ordered sequence of criteria separated by conjunction
//! rows. The list owns its structure: callers add and remove criteria, and
//! conjunctions only ever appear or disappear through
//! [`RowList::reconcile_conjunctions`]. The view layer renders the list; it
//! never stores row data of its own.

use std::fmt;
use std::mem;

use thiserror::Error;
use tracing::debug;

use crate::models::{Choice, Operator, Position, Song};

/// Stable identity of a criterion row. Assigned from a counter that only moves
/// forward, so a removed row's id is never handed out again.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0)
    }
}

/// Identity of a conjunction row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ConjunctionId(pub usize);

/// Which song field of a criterion a picker is bound to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FieldRole {
    Song1,
    Song2,
}

/// Direct key for a song field: row identity plus field role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub row: RowId,
    pub role: FieldRole,
}

impl FieldKey {
    pub fn new(row: RowId, role: FieldRole) -> Self {
        Self { row, role }
    }

    pub fn song1(row: RowId) -> Self {
        Self::new(row, FieldRole::Song1)
    }

    pub fn song2(row: RowId) -> Self {
        Self::new(row, FieldRole::Song2)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.role {
            FieldRole::Song1 => "song1",
            FieldRole::Song2 => "song2",
        };
        write!(f, "{} {role}", self.row)
    }
}

/// Visibility state of the second song field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Pairing {
    /// Second song hidden.
    Single,
    /// Second song visible; only reachable through `Position::FollowedBy`.
    Paired,
}

/// One search condition: a song, optionally followed by a second song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionRow {
    pub id: RowId,
    pub song1: Option<Song>,
    pub choice: Choice,
    pub position: Position,
    /// Retained while hidden so toggling back to `FollowedBy` shows the
    /// previous pick. Only meaningful while the row is paired.
    pub song2: Option<Song>,
}

impl CriterionRow {
    fn new(id: RowId) -> Self {
        Self {
            id,
            song1: None,
            choice: Choice::default(),
            position: Position::default(),
            song2: None,
        }
    }

    pub fn pairing(&self) -> Pairing {
        if self.position.is_paired() {
            Pairing::Paired
        } else {
            Pairing::Single
        }
    }

    pub fn song2_visible(&self) -> bool {
        self.pairing() == Pairing::Paired
    }

    /// The second song as the form sees it: absent unless the row is paired.
    pub fn effective_song2(&self) -> Option<&Song> {
        if self.song2_visible() {
            self.song2.as_ref()
        } else {
            None
        }
    }

    pub fn song(&self, role: FieldRole) -> Option<&Song> {
        match role {
            FieldRole::Song1 => self.song1.as_ref(),
            FieldRole::Song2 => self.song2.as_ref(),
        }
    }

    pub(crate) fn song_mut(&mut self, role: FieldRole) -> &mut Option<Song> {
        match role {
            FieldRole::Song1 => &mut self.song1,
            FieldRole::Song2 => &mut self.song2,
        }
    }
}

/// Separator between two criteria. `label` is a rendered copy of the list's
/// shared operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConjunctionRow {
    pub id: ConjunctionId,
    pub label: Operator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Criterion(CriterionRow),
    Conjunction(ConjunctionRow),
}

impl Entry {
    pub fn as_criterion(&self) -> Option<&CriterionRow> {
        match self {
            Entry::Criterion(row) => Some(row),
            Entry::Conjunction(_) => None,
        }
    }

    pub fn is_conjunction(&self) -> bool {
        matches!(self, Entry::Conjunction(_))
    }
}

/// Structural rule a row list broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("row list starts with a conjunction")]
    LeadingConjunction,
    #[error("row list ends with a conjunction")]
    TrailingConjunction,
    #[error("no conjunction between entries {0} and {1}")]
    MissingConjunction(usize, usize),
    #[error("consecutive conjunctions at entries {0} and {1}")]
    DoubledConjunction(usize, usize),
    #[error("conjunction at entry {index} shows {found} instead of {expected}")]
    StaleLabel {
        index: usize,
        found: Operator,
        expected: Operator,
    },
}

/// Ordered criteria and conjunctions for one search under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowList {
    entries: Vec<Entry>,
    operator: Operator,
    next_row: usize,
    next_conjunction: usize,
}

impl Default for RowList {
    fn default() -> Self {
        Self::empty()
    }
}

impl RowList {
    /// A list with no rows at all.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            operator: Operator::default(),
            next_row: 0,
            next_conjunction: 0,
        }
    }

    /// The state a fresh search form starts in: one default criterion.
    pub fn new() -> Self {
        let mut list = Self::empty();
        list.add_row();
        list
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Number of criteria. Derived from the entries so it cannot drift.
    pub fn total_forms(&self) -> usize {
        self.criteria().count()
    }

    pub fn conjunction_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_conjunction()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn criteria(&self) -> impl Iterator<Item = &CriterionRow> {
        self.entries.iter().filter_map(Entry::as_criterion)
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.criteria().map(|row| row.id).collect()
    }

    pub fn get(&self, id: RowId) -> Option<&CriterionRow> {
        self.criteria().find(|row| row.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: RowId) -> Option<&mut CriterionRow> {
        self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Criterion(row) if row.id == id => Some(row),
            _ => None,
        })
    }

    /// Append a default criterion and restore the conjunction invariants.
    pub fn add_row(&mut self) -> RowId {
        let id = RowId(self.next_row);
        self.next_row += 1;
        self.entries.push(Entry::Criterion(CriterionRow::new(id)));
        self.reconcile_conjunctions();
        id
    }

    /// Remove a criterion. Returns `false` without touching the list when it
    /// is already empty or the id no longer exists.
    pub fn remove_row(&mut self, id: RowId) -> bool {
        if self.total_forms() == 0 {
            return false;
        }
        let Some(index) = self
            .entries
            .iter()
            .position(|entry| matches!(entry, Entry::Criterion(row) if row.id == id))
        else {
            return false;
        };
        self.entries.remove(index);
        self.reconcile_conjunctions();
        true
    }

    /// Change the shared operator and re-render every conjunction label.
    pub fn set_operator(&mut self, operator: Operator) {
        self.operator = operator;
        self.render_labels();
    }

    /// Restore the structural invariants:
    ///
    /// * no conjunction leads or trails the list,
    /// * a run of conjunctions between two criteria collapses to its earliest
    ///   member,
    /// * two adjacent criteria get a fresh conjunction between them,
    /// * every label shows the shared operator.
    ///
    /// Running it on a list that already satisfies these rules changes
    /// nothing.
    pub fn reconcile_conjunctions(&mut self) {
        let entries = mem::take(&mut self.entries);
        let mut rebuilt = Vec::with_capacity(entries.len());
        let mut pending: Option<ConjunctionRow> = None;
        let mut seen_criterion = false;
        let mut dropped = 0usize;
        let mut inserted = 0usize;

        for entry in entries {
            match entry {
                Entry::Conjunction(conjunction) => {
                    if seen_criterion && pending.is_none() {
                        pending = Some(conjunction);
                    } else {
                        dropped += 1;
                    }
                }
                Entry::Criterion(row) => {
                    if seen_criterion {
                        let conjunction = match pending.take() {
                            Some(existing) => existing,
                            None => {
                                inserted += 1;
                                self.next_conjunction_row()
                            }
                        };
                        rebuilt.push(Entry::Conjunction(conjunction));
                    }
                    rebuilt.push(Entry::Criterion(row));
                    seen_criterion = true;
                }
            }
        }
        if pending.is_some() {
            dropped += 1;
        }

        self.entries = rebuilt;
        self.render_labels();

        if dropped > 0 || inserted > 0 {
            debug!(
                dropped,
                inserted,
                criteria = self.total_forms(),
                "reconciled conjunction rows"
            );
        }
    }

    /// Check the structural invariants, reporting the first violation.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if matches!(self.entries.first(), Some(Entry::Conjunction(_))) {
            return Err(InvariantViolation::LeadingConjunction);
        }
        if matches!(self.entries.last(), Some(Entry::Conjunction(_))) {
            return Err(InvariantViolation::TrailingConjunction);
        }
        for (index, pair) in self.entries.windows(2).enumerate() {
            match (&pair[0], &pair[1]) {
                (Entry::Criterion(_), Entry::Criterion(_)) => {
                    return Err(InvariantViolation::MissingConjunction(index, index + 1));
                }
                (Entry::Conjunction(_), Entry::Conjunction(_)) => {
                    return Err(InvariantViolation::DoubledConjunction(index, index + 1));
                }
                _ => {}
            }
        }
        for (index, entry) in self.entries.iter().enumerate() {
            if let Entry::Conjunction(conjunction) = entry {
                if conjunction.label != self.operator {
                    return Err(InvariantViolation::StaleLabel {
                        index,
                        found: conjunction.label,
                        expected: self.operator,
                    });
                }
            }
        }
        Ok(())
    }

    fn next_conjunction_row(&mut self) -> ConjunctionRow {
        let id = ConjunctionId(self.next_conjunction);
        self.next_conjunction += 1;
        ConjunctionRow {
            id,
            label: self.operator,
        }
    }

    fn render_labels(&mut self) {
        let operator = self.operator;
        for entry in &mut self.entries {
            if let Entry::Conjunction(conjunction) = entry {
                conjunction.label = operator;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conjunction_ids(list: &RowList) -> Vec<usize> {
        list.entries()
            .iter()
            .filter_map(|entry| match entry {
                Entry::Conjunction(c) => Some(c.id.0),
                Entry::Criterion(_) => None,
            })
            .collect()
    }

    fn assert_structure(list: &RowList) {
        list.check_invariants().unwrap();
        assert_eq!(
            list.conjunction_count(),
            list.total_forms().saturating_sub(1)
        );
    }

    /// Small deterministic generator so the random-walk test is reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            self.0 >> 33
        }
    }

    #[test]
    fn new_list_has_one_criterion_and_no_conjunctions() {
        let list = RowList::new();
        assert_eq!(list.total_forms(), 1);
        assert_eq!(list.conjunction_count(), 0);
        assert_structure(&list);
        let row = list.criteria().next().unwrap();
        assert_eq!(row.id, RowId(0));
        assert_eq!(row.position, Position::Anywhere);
        assert_eq!(row.choice, Choice::Is);
        assert!(!row.song2_visible());
    }

    #[test]
    fn adding_two_rows_inserts_two_conjunctions() {
        let mut list = RowList::new();
        list.add_row();
        list.add_row();
        assert_eq!(list.total_forms(), 3);
        assert_eq!(list.conjunction_count(), 2);
        assert_structure(&list);
        assert!(matches!(list.entries()[1], Entry::Conjunction(_)));
        assert!(matches!(list.entries()[3], Entry::Conjunction(_)));
    }

    #[test]
    fn appended_ids_follow_the_row_count() {
        let mut list = RowList::new();
        assert_eq!(list.add_row(), RowId(1));
        assert_eq!(list.add_row(), RowId(2));
        assert_eq!(list.row_ids(), vec![RowId(0), RowId(1), RowId(2)]);
    }

    #[test]
    fn ids_are_never_reused_after_removal() {
        let mut list = RowList::new();
        let second = list.add_row();
        assert!(list.remove_row(second));
        let third = list.add_row();
        assert_eq!(third, RowId(2));
    }

    #[test]
    fn removing_the_middle_row_leaves_one_conjunction() {
        let mut list = RowList::new();
        list.add_row();
        list.add_row();
        let ids = list.row_ids();
        assert!(list.remove_row(ids[1]));
        assert_eq!(list.total_forms(), 2);
        assert_eq!(list.conjunction_count(), 1);
        assert_eq!(list.row_ids(), vec![ids[0], ids[2]]);
        assert_structure(&list);
    }

    #[test]
    fn removing_the_last_row_drops_the_trailing_conjunction() {
        let mut list = RowList::new();
        let last = list.add_row();
        assert!(list.remove_row(last));
        assert_eq!(list.entries().len(), 1);
        assert_structure(&list);
    }

    #[test]
    fn removing_the_first_row_drops_the_leading_conjunction() {
        let mut list = RowList::new();
        list.add_row();
        assert!(list.remove_row(RowId(0)));
        assert_eq!(list.row_ids(), vec![RowId(1)]);
        assert_eq!(list.conjunction_count(), 0);
        assert_structure(&list);
    }

    #[test]
    fn removing_the_only_row_empties_the_list_and_then_no_ops() {
        let mut list = RowList::new();
        assert!(list.remove_row(RowId(0)));
        assert_eq!(list.total_forms(), 0);
        assert_eq!(list.conjunction_count(), 0);
        assert!(list.is_empty());

        let before = list.clone();
        assert!(!list.remove_row(RowId(0)));
        assert_eq!(list, before);
    }

    #[test]
    fn stale_ids_are_ignored() {
        let mut list = RowList::new();
        list.add_row();
        let before = list.clone();
        assert!(!list.remove_row(RowId(42)));
        assert_eq!(list, before);
    }

    #[test]
    fn adding_to_an_empty_list_starts_again_without_conjunctions() {
        let mut list = RowList::empty();
        let id = list.add_row();
        assert_eq!(id, RowId(0));
        assert_eq!(list.entries().len(), 1);
        assert_structure(&list);
    }

    #[test]
    fn reconcile_collapses_a_run_keeping_the_earliest() {
        let mut list = RowList::new();
        list.add_row();
        // Force two extra conjunctions after the existing one.
        let extra_a = list.next_conjunction_row();
        let extra_b = list.next_conjunction_row();
        list.entries.insert(2, Entry::Conjunction(extra_a));
        list.entries.insert(3, Entry::Conjunction(extra_b));
        assert_eq!(conjunction_ids(&list), vec![0, 1, 2]);
        assert!(matches!(
            list.check_invariants(),
            Err(InvariantViolation::DoubledConjunction(1, 2))
        ));

        list.reconcile_conjunctions();
        assert_eq!(conjunction_ids(&list), vec![0]);
        assert_structure(&list);
    }

    #[test]
    fn reconcile_strips_leading_and_trailing_runs() {
        let mut list = RowList::new();
        let lead = list.next_conjunction_row();
        let trail_a = list.next_conjunction_row();
        let trail_b = list.next_conjunction_row();
        list.entries.insert(0, Entry::Conjunction(lead));
        list.entries.push(Entry::Conjunction(trail_a));
        list.entries.push(Entry::Conjunction(trail_b));
        assert_eq!(
            list.check_invariants(),
            Err(InvariantViolation::LeadingConjunction)
        );

        list.reconcile_conjunctions();
        assert_eq!(list.entries().len(), 1);
        assert_structure(&list);
    }

    #[test]
    fn reconcile_fills_missing_separators_with_the_current_operator() {
        let mut list = RowList::new();
        list.set_operator(Operator::Or);
        list.entries.push(Entry::Criterion(CriterionRow::new(RowId(7))));
        list.entries.push(Entry::Criterion(CriterionRow::new(RowId(8))));
        assert_eq!(
            list.check_invariants(),
            Err(InvariantViolation::MissingConjunction(0, 1))
        );

        list.reconcile_conjunctions();
        assert_eq!(list.conjunction_count(), 2);
        assert!(list.entries().iter().all(|entry| match entry {
            Entry::Conjunction(c) => c.label == Operator::Or,
            Entry::Criterion(_) => true,
        }));
        assert_structure(&list);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut list = RowList::new();
        list.add_row();
        list.add_row();
        let first = list.clone();
        list.reconcile_conjunctions();
        assert_eq!(list, first);
        list.reconcile_conjunctions();
        assert_eq!(list, first);
    }

    #[test]
    fn reconcile_rerenders_stale_labels() {
        let mut list = RowList::new();
        list.add_row();
        list.operator = Operator::Or;
        assert!(matches!(
            list.check_invariants(),
            Err(InvariantViolation::StaleLabel { index: 1, .. })
        ));
        list.reconcile_conjunctions();
        assert_structure(&list);
    }

    #[test]
    fn operator_change_is_broadcast() {
        let mut list = RowList::new();
        list.add_row();
        list.add_row();
        list.set_operator(Operator::Or);
        let labels: Vec<_> = list
            .entries()
            .iter()
            .filter_map(|entry| match entry {
                Entry::Conjunction(c) => Some(c.label),
                Entry::Criterion(_) => None,
            })
            .collect();
        assert_eq!(labels, vec![Operator::Or, Operator::Or]);

        // New separators pick up the current operator too.
        list.add_row();
        assert_structure(&list);
    }

    #[test]
    fn random_add_remove_sequences_keep_invariants() {
        let mut rng = Lcg(0x5eed);
        let mut list = RowList::new();
        for _ in 0..2_000 {
            let ids = list.row_ids();
            if ids.is_empty() || rng.next() % 5 < 2 {
                list.add_row();
            } else {
                let victim = ids[(rng.next() as usize) % ids.len()];
                assert!(list.remove_row(victim));
            }
            if rng.next() % 17 == 0 {
                list.set_operator(list.operator().toggled());
            }
            assert_structure(&list);
            assert_eq!(list.total_forms(), list.row_ids().len());
        }
    }

    #[test]
    fn song2_visibility_follows_position() {
        let mut row = CriterionRow::new(RowId(0));
        for position in Position::ALL {
            row.position = position;
            assert_eq!(row.song2_visible(), position == Position::FollowedBy);
        }
    }

    #[test]
    fn hidden_song2_is_not_effective() {
        let mut row = CriterionRow::new(RowId(0));
        row.song2 = Some(Song {
            id: 3,
            name: "Jungleland".to_string(),
            num_plays: 10,
        });
        assert!(row.effective_song2().is_none());
        row.position = Position::FollowedBy;
        assert_eq!(row.effective_song2().map(|s| s.id), Some(3));
    }
}
