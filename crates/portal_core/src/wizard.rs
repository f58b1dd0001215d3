use std::collections::BTreeMap;

use crate::RemoteFailure;

/// Maximum number of non-terminal job postings one owner may hold.
pub const MAX_OPEN_JOBS: u32 = 3;

/// Ceiling for image uploads, checked before any upload attempt.
pub const IMAGE_MAX_BYTES: u64 = 2 * 1024 * 1024;

/// Minimum character length for the profile bio.
pub const BIO_MIN_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardKind {
    JobPosting,
    ProfileCompletion,
}

impl WizardKind {
    pub fn step_count(self) -> u8 {
        match self {
            WizardKind::JobPosting => 3,
            WizardKind::ProfileCompletion => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DraftField {
    Title,
    EmploymentType,
    Description,
    ExternalLink,
    FullName,
    Phone,
    Role,
    Location,
    Skills,
    Bio,
    Photo,
}

impl DraftField {
    pub fn as_str(self) -> &'static str {
        match self {
            DraftField::Title => "title",
            DraftField::EmploymentType => "employment_type",
            DraftField::Description => "description",
            DraftField::ExternalLink => "external_link",
            DraftField::FullName => "full_name",
            DraftField::Phone => "phone",
            DraftField::Role => "role",
            DraftField::Location => "location",
            DraftField::Skills => "skills",
            DraftField::Bio => "bio",
            DraftField::Photo => "photo",
        }
    }
}

/// In-memory, not-yet-committed record backing a wizard.
///
/// Held only for the lifetime of the active wizard; discarded on navigation
/// without submit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Draft {
    pub title: String,
    pub employment_type: String,
    pub description: String,
    pub external_link: String,
    pub full_name: String,
    pub phone: String,
    pub role: String,
    pub location: String,
    pub skills: Vec<String>,
    pub bio: String,
    pub photo_url: Option<String>,
}

impl Draft {
    pub fn set_field(&mut self, field: DraftField, value: String) {
        match field {
            DraftField::Title => self.title = value,
            DraftField::EmploymentType => self.employment_type = value,
            DraftField::Description => self.description = value,
            DraftField::ExternalLink => self.external_link = value,
            DraftField::FullName => self.full_name = value,
            DraftField::Phone => self.phone = value,
            DraftField::Role => self.role = value,
            DraftField::Location => self.location = value,
            DraftField::Bio => self.bio = value,
            // Skills and the photo URL are edited through dedicated messages.
            DraftField::Skills | DraftField::Photo => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    kind: WizardKind,
    step: u8,
    draft: Draft,
    errors: BTreeMap<DraftField, String>,
    submitting: bool,
    completed: bool,
    job_limit_reached: bool,
    last_submit_failure: Option<RemoteFailure>,
}

impl WizardState {
    pub fn new(kind: WizardKind, prefill: Option<Draft>) -> Self {
        Self {
            kind,
            step: 1,
            draft: prefill.unwrap_or_default(),
            errors: BTreeMap::new(),
            submitting: false,
            completed: false,
            job_limit_reached: false,
            last_submit_failure: None,
        }
    }

    pub fn kind(&self) -> WizardKind {
        self.kind
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn step_count(&self) -> u8 {
        self.kind.step_count()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn errors(&self) -> &BTreeMap<DraftField, String> {
        &self.errors
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn job_limit_reached(&self) -> bool {
        self.job_limit_reached
    }

    pub fn last_submit_failure(&self) -> Option<&RemoteFailure> {
        self.last_submit_failure.as_ref()
    }

    /// Applies the mount-time quota snapshot. Counted once at mount; the
    /// submit path only re-checks this cached flag.
    pub fn apply_open_job_count(&mut self, open_count: u32) {
        if self.kind == WizardKind::JobPosting {
            self.job_limit_reached = open_count >= MAX_OPEN_JOBS;
        }
    }

    /// Validates the active step and moves forward on success.
    ///
    /// On failure the field-keyed error map is populated and the step does
    /// not change. A frozen job wizard (quota reached) never advances.
    pub fn advance(&mut self) -> bool {
        if self.completed || self.submitting || self.job_limit_reached {
            return false;
        }
        match validate_step(self.kind, self.step, &self.draft) {
            Ok(()) => {
                self.errors.clear();
                self.step = (self.step + 1).min(self.step_count());
                true
            }
            Err(errors) => {
                self.errors = errors;
                false
            }
        }
    }

    /// Moves back one step, floored at 1. Never validated.
    pub fn retreat(&mut self) {
        if self.step > 1 {
            self.step -= 1;
        }
    }

    /// Checks whether submission may start: terminal step, validated, not
    /// already submitting, quota not exceeded.
    pub fn begin_submit(&mut self) -> bool {
        if self.completed || self.submitting || self.job_limit_reached {
            return false;
        }
        if self.step != self.step_count() {
            return false;
        }
        match validate_step(self.kind, self.step, &self.draft) {
            Ok(()) => {
                self.errors.clear();
                self.submitting = true;
                self.last_submit_failure = None;
                true
            }
            Err(errors) => {
                self.errors = errors;
                false
            }
        }
    }

    pub fn resolve_submit(&mut self, result: Result<(), RemoteFailure>) {
        if !self.submitting {
            return;
        }
        self.submitting = false;
        match result {
            Ok(()) => self.completed = true,
            Err(failure) => self.last_submit_failure = Some(failure),
        }
    }

    /// Records a freshly uploaded photo URL on the draft.
    pub fn apply_photo_url(&mut self, url: String) {
        self.errors.remove(&DraftField::Photo);
        self.draft.photo_url = Some(url);
    }

    pub fn reject_photo(&mut self, reason: String) {
        self.errors.insert(DraftField::Photo, reason);
    }
}

/// Checks whether an image may be uploaded at all.
pub fn photo_within_limit(size_bytes: u64) -> bool {
    size_bytes <= IMAGE_MAX_BYTES
}

fn validate_step(
    kind: WizardKind,
    step: u8,
    draft: &Draft,
) -> Result<(), BTreeMap<DraftField, String>> {
    let mut errors = BTreeMap::new();
    match (kind, step) {
        (WizardKind::JobPosting, 1) => {
            require(&mut errors, DraftField::Title, &draft.title);
            require(&mut errors, DraftField::EmploymentType, &draft.employment_type);
        }
        (WizardKind::JobPosting, 2) => {
            require(&mut errors, DraftField::Description, &draft.description);
        }
        (WizardKind::JobPosting, 3) => {
            // The external link is optional, but when present it must be an
            // absolute URL with a scheme.
            let link = draft.external_link.trim();
            if !link.is_empty() && url::Url::parse(link).is_err() {
                errors.insert(
                    DraftField::ExternalLink,
                    "must be an absolute URL".to_string(),
                );
            }
        }
        (WizardKind::ProfileCompletion, 1) => {
            require(&mut errors, DraftField::FullName, &draft.full_name);
            require(&mut errors, DraftField::Phone, &draft.phone);
        }
        (WizardKind::ProfileCompletion, 2) => {
            require(&mut errors, DraftField::Role, &draft.role);
            require(&mut errors, DraftField::Location, &draft.location);
            if draft.skills.iter().all(|s| s.trim().is_empty()) {
                errors.insert(DraftField::Skills, "add at least one skill".to_string());
            }
        }
        (WizardKind::ProfileCompletion, 3) => {
            if draft.bio.trim().chars().count() < BIO_MIN_CHARS {
                errors.insert(
                    DraftField::Bio,
                    format!("bio must be at least {BIO_MIN_CHARS} characters"),
                );
            }
        }
        _ => {}
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn require(errors: &mut BTreeMap<DraftField, String>, field: DraftField, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field, "required".to_string());
    }
}
