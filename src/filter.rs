use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::experience::{parse_experience_years, ExperienceRangeTable};
use crate::models::{FieldMap, Record};
use crate::normalize::{contains_normalized, initials, normalize};

/// The active filter selections for one view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub search: String,
    pub location: String,
    pub job_types: BTreeSet<String>,
    pub shifts: BTreeSet<String>,
    pub role_categories: BTreeSet<String>,
    pub experience_labels: BTreeSet<String>,
    pub visa_statuses: BTreeSet<String>,
    /// Minimum pay; 0 disables the filter.
    pub pay_rate: f64,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        Predicate::ALL.iter().all(|p| !p.is_active(self))
    }

    pub fn active_predicates(&self) -> impl Iterator<Item = Predicate> + '_ {
        Predicate::ALL.into_iter().filter(move |p| p.is_active(self))
    }

    /// One line per active filter, e.g. `shifts: Day, Night`.
    pub fn summary(&self) -> Vec<String> {
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(", ");
        self.active_predicates()
            .map(|p| match p {
                Predicate::Keyword => format!("search: {}", self.search.trim()),
                Predicate::Location => format!("location: {}", self.location.trim()),
                Predicate::JobType => format!("job types: {}", join(&self.job_types)),
                Predicate::Shift => format!("shifts: {}", join(&self.shifts)),
                Predicate::RoleCategory => format!("roles: {}", join(&self.role_categories)),
                Predicate::Visa => format!("visa: {}", join(&self.visa_statuses)),
                Predicate::Experience => format!("experience: {}", join(&self.experience_labels)),
                Predicate::PayFloor => format!("pay from: ${}", self.pay_rate),
            })
            .collect()
    }

    /// Flip membership of `value` in a selection set. Returns the new membership.
    pub fn toggle(set: &mut BTreeSet<String>, value: &str) -> bool {
        if set.remove(value) {
            false
        } else {
            set.insert(value.to_string());
            true
        }
    }
}

/// One filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Keyword,
    Location,
    JobType,
    Shift,
    RoleCategory,
    Visa,
    Experience,
    PayFloor,
}

impl Predicate {
    pub const ALL: [Predicate; 8] = [
        Predicate::Keyword,
        Predicate::Location,
        Predicate::JobType,
        Predicate::Shift,
        Predicate::RoleCategory,
        Predicate::Visa,
        Predicate::Experience,
        Predicate::PayFloor,
    ];

    /// Inactive predicates are skipped, i.e. match everything.
    pub fn is_active(&self, state: &FilterState) -> bool {
        match self {
            Predicate::Keyword => !normalize(Some(&state.search)).is_empty(),
            Predicate::Location => !normalize(Some(&state.location)).is_empty(),
            Predicate::JobType => !state.job_types.is_empty(),
            Predicate::Shift => !state.shifts.is_empty(),
            Predicate::RoleCategory => !state.role_categories.is_empty(),
            Predicate::Visa => !state.visa_statuses.is_empty(),
            Predicate::Experience => !state.experience_labels.is_empty(),
            Predicate::PayFloor => state.pay_rate > 0.0,
        }
    }

    /// Evaluate against one record. An absent field never satisfies an active predicate.
    pub fn matches(
        &self,
        record: &Record,
        state: &FilterState,
        fields: &FieldMap,
        table: &ExperienceRangeTable,
    ) -> bool {
        match self {
            Predicate::Keyword => keyword_matches(record, &state.search, fields),
            Predicate::Location => record
                .text(fields.location)
                .is_some_and(|loc| contains_normalized(&loc, &state.location)),
            Predicate::JobType => record
                .list(fields.job_types)
                .is_some_and(|types| any_contains(&types, &state.job_types)),
            Predicate::Shift => record
                .list(fields.shifts)
                .is_some_and(|shifts| any_contains(&shifts, &state.shifts)),
            Predicate::RoleCategory => record.text(fields.role).is_some_and(|role| {
                state
                    .role_categories
                    .iter()
                    .any(|wanted| contains_normalized(&role, wanted))
            }),
            Predicate::Visa => record.text(fields.residency).is_some_and(|status| {
                state
                    .visa_statuses
                    .iter()
                    .any(|wanted| contains_normalized(&status, wanted))
            }),
            Predicate::Experience => record
                .text(fields.experience)
                .map(|label| parse_experience_years(&label))
                .is_some_and(|years| table.matches_any(years, &state.experience_labels)),
            Predicate::PayFloor => record
                .number(fields.pay)
                .is_some_and(|pay| pay >= state.pay_rate),
        }
    }
}

fn keyword_matches(record: &Record, search: &str, fields: &FieldMap) -> bool {
    let needle = normalize(Some(search));
    let texts = record.texts(fields.keyword);
    if texts.is_empty() {
        return false;
    }
    let haystack = normalize(Some(&texts.join(" ")));
    haystack.contains(&needle)
        || (needle.chars().count() >= 2 && texts.iter().any(|t| initials(t).contains(&needle)))
}

/// Any record entry contains any selected label.
fn any_contains(entries: &[String], selected: &BTreeSet<String>) -> bool {
    entries
        .iter()
        .any(|entry| selected.iter().any(|label| contains_normalized(entry, label)))
}

/// Conjunctive filter over a view's full record list.
#[derive(Debug, Clone)]
pub struct FilterPipeline {
    fields: &'static FieldMap,
    table: ExperienceRangeTable,
}

impl FilterPipeline {
    pub fn new(fields: &'static FieldMap, table: ExperienceRangeTable) -> Self {
        Self { fields, table }
    }

    pub fn matches(&self, record: &Record, state: &FilterState) -> bool {
        state
            .active_predicates()
            .all(|p| p.matches(record, state, self.fields, &self.table))
    }

    /// Filter `records`, keeping their order. Always pass the original list.
    pub fn apply(&self, records: &[Record], state: &FilterState) -> Vec<Record> {
        records
            .iter()
            .filter(|r| self.matches(r, state))
            .cloned()
            .collect()
    }
}
