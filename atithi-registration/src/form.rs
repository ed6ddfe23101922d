use atithi_core::document::DocumentRef;
use atithi_core::model::IdType;
use atithi_core::repository::ScratchStore;
use atithi_shared::Masked;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Addresses one guest's document list: the primary guest or an
/// additional-guest slot by stable index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestSlot {
    Primary,
    Additional(usize),
}

impl GuestSlot {
    /// Accepts "primary" or a zero-based additional-guest index.
    pub fn parse(value: &str) -> Option<Self> {
        if value == "primary" {
            return Some(GuestSlot::Primary);
        }
        value.parse::<usize>().ok().map(GuestSlot::Additional)
    }
}

impl fmt::Display for GuestSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuestSlot::Primary => write!(f, "primary"),
            GuestSlot::Additional(i) => write!(f, "additional[{}]", i),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GuestSetError {
    #[error("no guest at slot {0}")]
    NoSuchSlot(GuestSlot),

    #[error("no document at index {index} for slot {slot}")]
    NoSuchDocument { slot: GuestSlot, index: usize },
}

/// Draft state for one additional guest. Blank on creation; grows documents
/// as uploads land.
#[derive(Debug, Clone, Serialize)]
pub struct GuestDraft {
    pub name: String,
    pub nationality: String,
    pub id_type: Option<IdType>,
    pub id_number: Masked<String>,
    pub documents: Vec<DocumentRef>,
}

impl Default for GuestDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            nationality: String::new(),
            id_type: None,
            id_number: Masked(String::new()),
            documents: Vec::new(),
        }
    }
}

impl GuestDraft {
    pub fn is_blank(&self) -> bool {
        self.name.is_empty()
            && self.nationality.is_empty()
            && self.id_type.is_none()
            && self.id_number.0.is_empty()
            && self.documents.is_empty()
    }
}

/// Submission lifecycle of a form instance. Terminal states re-enter Idle
/// once the guest acts again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionPhase {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

/// Partial update to the primary guest's fields. The guest count is absent on
/// purpose: it only changes through `RegistrationForm::resize`.
#[derive(Debug, Default, Deserialize)]
pub struct PrimaryPatch {
    pub name: Option<String>,
    pub contact_number: Option<String>,
    pub nationality: Option<String>,
    pub id_type: Option<IdType>,
    pub id_number: Option<String>,
    pub checkin_date: Option<NaiveDate>,
    pub checkout_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GuestPatch {
    pub name: Option<String>,
    pub nationality: Option<String>,
    pub id_type: Option<IdType>,
    pub id_number: Option<String>,
}

/// In-memory state of one registration in progress. Owned exclusively by its
/// session; all mutation funnels through these methods.
#[derive(Debug, Serialize)]
pub struct RegistrationForm {
    pub name: String,
    pub number_of_guests: Option<i64>,
    pub contact_number: Masked<String>,
    pub nationality: String,
    pub id_type: Option<IdType>,
    pub id_number: Masked<String>,
    pub checkin_date: Option<NaiveDate>,
    pub checkout_date: Option<NaiveDate>,
    pub documents: Vec<DocumentRef>,
    pub additional_guests: Vec<GuestDraft>,
    pub phase: SubmissionPhase,
    #[serde(skip)]
    epoch: u64,
    #[serde(skip)]
    next_seq: u64,
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            number_of_guests: None,
            contact_number: Masked(String::new()),
            nationality: String::new(),
            id_type: None,
            id_number: Masked(String::new()),
            checkin_date: None,
            checkout_date: None,
            documents: Vec::new(),
            additional_guests: Vec::new(),
            phase: SubmissionPhase::Idle,
            epoch: 0,
            next_seq: 0,
        }
    }

    /// Lifecycle instance marker. In-flight upload completions carry the
    /// epoch they were dispatched under and are discarded if it has moved on.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Hands out `count` consecutive sequence numbers for a dispatch batch.
    pub fn reserve_seqs(&mut self, count: usize) -> u64 {
        let base = self.next_seq;
        self.next_seq += count as u64;
        base
    }

    pub fn apply(&mut self, patch: PrimaryPatch) {
        self.phase = SubmissionPhase::Idle;
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.contact_number {
            self.contact_number = Masked(v);
        }
        if let Some(v) = patch.nationality {
            self.nationality = v;
        }
        if let Some(v) = patch.id_type {
            self.id_type = Some(v);
        }
        if let Some(v) = patch.id_number {
            self.id_number = Masked(v);
        }
        if let Some(v) = patch.checkin_date {
            self.checkin_date = Some(v);
        }
        if let Some(v) = patch.checkout_date {
            self.checkout_date = Some(v);
        }
    }

    pub fn apply_guest(&mut self, index: usize, patch: GuestPatch) -> Result<(), GuestSetError> {
        self.phase = SubmissionPhase::Idle;
        let draft = self
            .additional_guests
            .get_mut(index)
            .ok_or(GuestSetError::NoSuchSlot(GuestSlot::Additional(index)))?;
        if let Some(v) = patch.name {
            draft.name = v;
        }
        if let Some(v) = patch.nationality {
            draft.nationality = v;
        }
        if let Some(v) = patch.id_type {
            draft.id_type = Some(v);
        }
        if let Some(v) = patch.id_number {
            draft.id_number = Masked(v);
        }
        Ok(())
    }

    /// Re-derives the additional-guest list from the declared guest count.
    /// Growing appends blank drafts; shrinking truncates from the tail and
    /// releases any scratch documents the removed drafts still hold. The
    /// caller has already range-checked `new_count` at field level.
    pub fn resize(&mut self, new_count: i64, scratch: &dyn ScratchStore) {
        self.phase = SubmissionPhase::Idle;
        self.number_of_guests = Some(new_count);
        let target = (new_count - 1).max(0) as usize;
        while self.additional_guests.len() < target {
            self.additional_guests.push(GuestDraft::default());
        }
        while self.additional_guests.len() > target {
            if let Some(removed) = self.additional_guests.pop() {
                release_refs(&removed.documents, scratch);
            }
        }
    }

    fn documents_mut(&mut self, slot: GuestSlot) -> Result<&mut Vec<DocumentRef>, GuestSetError> {
        match slot {
            GuestSlot::Primary => Ok(&mut self.documents),
            GuestSlot::Additional(i) => self
                .additional_guests
                .get_mut(i)
                .map(|g| &mut g.documents)
                .ok_or(GuestSetError::NoSuchSlot(slot)),
        }
    }

    pub fn documents(&self, slot: GuestSlot) -> Result<&[DocumentRef], GuestSetError> {
        match slot {
            GuestSlot::Primary => Ok(&self.documents),
            GuestSlot::Additional(i) => self
                .additional_guests
                .get(i)
                .map(|g| g.documents.as_slice())
                .ok_or(GuestSetError::NoSuchSlot(slot)),
        }
    }

    /// Inserts in sequence order so the list reflects dispatch order even
    /// when completions arrive shuffled.
    pub fn attach_document(&mut self, slot: GuestSlot, doc: DocumentRef) -> Result<(), GuestSetError> {
        let list = self.documents_mut(slot)?;
        let at = list.partition_point(|d| d.seq <= doc.seq);
        list.insert(at, doc);
        Ok(())
    }

    /// Removes by index; an unreleased scratch reference is released here.
    pub fn remove_document(
        &mut self,
        slot: GuestSlot,
        index: usize,
        scratch: &dyn ScratchStore,
    ) -> Result<DocumentRef, GuestSetError> {
        let list = self.documents_mut(slot)?;
        if index >= list.len() {
            return Err(GuestSetError::NoSuchDocument { slot, index });
        }
        let removed = list.remove(index);
        if let Some(key) = removed.scratch_key {
            scratch.release(key);
        }
        Ok(removed)
    }

    /// Frees every scratch-backed document across all guests.
    pub fn release_all_documents(&self, scratch: &dyn ScratchStore) {
        release_refs(&self.documents, scratch);
        for guest in &self.additional_guests {
            release_refs(&guest.documents, scratch);
        }
    }

    /// Returns the form to its pristine initial state and advances the epoch
    /// so stale upload completions are discarded.
    pub fn reset(&mut self, scratch: &dyn ScratchStore) {
        self.release_all_documents(scratch);
        let epoch = self.epoch + 1;
        *self = Self::new();
        self.epoch = epoch;
    }

    pub fn is_pristine(&self) -> bool {
        self.name.is_empty()
            && self.number_of_guests.is_none()
            && self.contact_number.0.is_empty()
            && self.nationality.is_empty()
            && self.id_type.is_none()
            && self.id_number.0.is_empty()
            && self.checkin_date.is_none()
            && self.checkout_date.is_none()
            && self.documents.is_empty()
            && self.additional_guests.is_empty()
            && self.phase == SubmissionPhase::Idle
    }
}

impl Default for RegistrationForm {
    fn default() -> Self {
        Self::new()
    }
}

fn release_refs(refs: &[DocumentRef], scratch: &dyn ScratchStore) {
    for doc in refs {
        if let Some(key) = doc.scratch_key {
            scratch.release(key);
        }
    }
}
