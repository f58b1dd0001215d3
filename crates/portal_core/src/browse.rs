use std::collections::{BTreeMap, BTreeSet};

pub type ItemId = String;

/// A job row as fetched through the gateway. Client-side immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: ItemId,
    pub title: String,
    pub company: String,
    pub location: String,
    pub employment_type: String,
    pub salary_min: Option<u32>,
    pub skills_text: String,
    pub posted_days_ago: u32,
}

/// Conjunction of independent filter predicates over the job collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub text: String,
    pub location: String,
    pub employment_type: Option<String>,
    pub min_salary: Option<u32>,
    pub posted_within_days: Option<u32>,
}

impl FilterState {
    pub fn matches(&self, job: &Job) -> bool {
        let text = self.text.trim().to_lowercase();
        if !text.is_empty() {
            let haystack = format!(
                "{} {} {}",
                job.title.to_lowercase(),
                job.company.to_lowercase(),
                job.skills_text.to_lowercase()
            );
            if !haystack.contains(&text) {
                return false;
            }
        }
        let location = self.location.trim().to_lowercase();
        if !location.is_empty() && !job.location.to_lowercase().contains(&location) {
            return false;
        }
        if let Some(wanted) = &self.employment_type {
            if !job.employment_type.eq_ignore_ascii_case(wanted) {
                return false;
            }
        }
        if let Some(threshold) = self.min_salary {
            match job.salary_min {
                Some(salary) if salary >= threshold => {}
                _ => return false,
            }
        }
        if let Some(window) = self.posted_within_days {
            if job.posted_days_ago > window {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MembershipSet {
    Saved,
    Applied,
}

/// One optimistic membership flip awaiting its remote call.
///
/// `previous` is the state to restore on failure. A second toggle arriving
/// while the call is in flight flips the optimistic state again and sets
/// `pending`; the follow-up remote call is issued once the first resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MembershipTxn {
    previous: bool,
    desired: bool,
    pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BrowserState {
    jobs: Vec<Job>,
    filters: FilterState,
    filtered: Vec<ItemId>,
    selected: Option<ItemId>,
    saved: BTreeSet<ItemId>,
    applied: BTreeSet<ItemId>,
    viewer_skills: Vec<String>,
    in_flight: BTreeMap<(MembershipSet, ItemId), MembershipTxn>,
}

/// Outcome of a toggle request, telling the update loop whether a remote
/// mutation must be issued now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Issue { desired: bool },
    Queued,
    Ignored,
}

impl BrowserState {
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn filtered(&self) -> &[ItemId] {
        &self.filtered
    }

    pub fn selected(&self) -> Option<&ItemId> {
        self.selected.as_ref()
    }

    pub fn viewer_skills(&self) -> &[String] {
        &self.viewer_skills
    }

    pub fn is_member(&self, set: MembershipSet, id: &str) -> bool {
        self.id_set(set).contains(id)
    }

    pub fn set_jobs(&mut self, jobs: Vec<Job>) {
        self.jobs = jobs;
        self.apply_filters();
    }

    pub fn set_viewer_context(&mut self, saved: Vec<ItemId>, applied: Vec<ItemId>, skills: Vec<String>) {
        self.saved = saved.into_iter().collect();
        self.applied = applied.into_iter().collect();
        self.viewer_skills = skills;
    }

    pub fn update_filters(&mut self, f: impl FnOnce(&mut FilterState)) {
        f(&mut self.filters);
        self.apply_filters();
    }

    /// Recomputes the filtered view and repairs the selection.
    ///
    /// Invariant: a surviving selection is preserved; otherwise selection
    /// moves to the first filtered item, or clears when nothing matches.
    /// Idempotent for unchanged `(jobs, filters)`.
    pub fn apply_filters(&mut self) {
        self.filtered = self
            .jobs
            .iter()
            .filter(|job| self.filters.matches(job))
            .map(|job| job.id.clone())
            .collect();

        let survives = self
            .selected
            .as_ref()
            .is_some_and(|id| self.filtered.contains(id));
        if !survives {
            self.selected = self.filtered.first().cloned();
        }
    }

    /// Explicit selection from the list; ignored for items outside the
    /// current filtered view.
    pub fn select(&mut self, id: &str) -> bool {
        if self.filtered.iter().any(|f| f == id) {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Optimistically flips membership and reports what to do remotely.
    pub fn toggle_membership(&mut self, set: MembershipSet, id: &str) -> ToggleOutcome {
        if !self.jobs.iter().any(|job| job.id == id) {
            return ToggleOutcome::Ignored;
        }
        let key = (set, id.to_string());
        if let Some(txn) = self.in_flight.get_mut(&key) {
            if txn.pending {
                // Already one follow-up queued; further clicks are dropped.
                return ToggleOutcome::Ignored;
            }
            txn.pending = true;
            self.flip(set, id);
            return ToggleOutcome::Queued;
        }
        let previous = self.id_set(set).contains(id);
        self.flip(set, id);
        self.in_flight.insert(
            key,
            MembershipTxn {
                previous,
                desired: !previous,
                pending: false,
            },
        );
        ToggleOutcome::Issue { desired: !previous }
    }

    /// Commits or rolls back the transaction for `(set, id)`. Returns the
    /// desired state of a queued follow-up mutation, if one must be issued.
    pub fn resolve_membership(
        &mut self,
        set: MembershipSet,
        id: &str,
        succeeded: bool,
    ) -> Option<bool> {
        let key = (set, id.to_string());
        let txn = self.in_flight.remove(&key)?;
        if !succeeded {
            // Revert to the pre-transaction state; a queued follow-up is
            // dropped with it.
            self.set_membership(set, id, txn.previous);
            return None;
        }
        if txn.pending {
            let desired = !txn.desired;
            self.in_flight.insert(
                key,
                MembershipTxn {
                    previous: txn.desired,
                    desired,
                    pending: false,
                },
            );
            return Some(desired);
        }
        None
    }

    /// Superficial skill match: the share of viewer skills appearing as
    /// substrings of the job's skills text.
    pub fn skill_match_percent(&self, job: &Job) -> u8 {
        if self.viewer_skills.is_empty() {
            return 0;
        }
        let haystack = job.skills_text.to_lowercase();
        let hits = self
            .viewer_skills
            .iter()
            .filter(|skill| {
                let needle = skill.trim().to_lowercase();
                !needle.is_empty() && haystack.contains(&needle)
            })
            .count();
        ((hits * 100) / self.viewer_skills.len()) as u8
    }

    fn id_set(&self, set: MembershipSet) -> &BTreeSet<ItemId> {
        match set {
            MembershipSet::Saved => &self.saved,
            MembershipSet::Applied => &self.applied,
        }
    }

    fn flip(&mut self, set: MembershipSet, id: &str) {
        let current = self.id_set(set).contains(id);
        self.set_membership(set, id, !current);
    }

    fn set_membership(&mut self, set: MembershipSet, id: &str, member: bool) {
        let ids = match set {
            MembershipSet::Saved => &mut self.saved,
            MembershipSet::Applied => &mut self.applied,
        };
        if member {
            ids.insert(id.to_string());
        } else {
            ids.remove(id);
        }
    }
}
