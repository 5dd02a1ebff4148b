// 📝 Inventory Form - the controller every surface drives
//
// LoggedOut → SelectingReferences → EnteringQuantities → ReadyToSubmit → Submitted
//                      └──────────────→ FullyInventoried (nothing left to count)
//
// Each call re-reads the store; nothing is cached across calls except the
// user's own selection. The duplicate re-check before append narrows the race
// between sessions but cannot close it: two sessions that read the store
// before either appends can still both record the same reference.

use crate::auth::{AuthGate, Session};
use crate::catalog::{Catalog, CatalogEntry};
use crate::error::FormError;
use crate::export::ExportFormat;
use crate::record::InventoryRecord;
use crate::store::RecordStore;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    LoggedOut,
    SelectingReferences,
    EnteringQuantities,
    ReadyToSubmit,
    Submitted,
    FullyInventoried,
}

/// One selected reference and the quantity typed for it (defaults to 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    /// Records actually written
    pub appended: Vec<InventoryRecord>,
    /// References dropped because another session recorded them first
    pub skipped: Vec<String>,
}

pub struct InventoryForm {
    catalog: Arc<Catalog>,
    store: Arc<dyn RecordStore>,
    session: Session,
    state: FormState,
    /// `None` until a store read succeeds for this session
    available: Option<Vec<CatalogEntry>>,
    selection: Vec<Selection>,
}

impl InventoryForm {
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            catalog,
            store,
            session: Session::default(),
            state: FormState::LoggedOut,
            available: None,
            selection: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    /// Available references as of the last store read
    pub fn available(&self) -> &[CatalogEntry] {
        self.available.as_deref().unwrap_or_default()
    }

    pub fn selection(&self) -> &[Selection] {
        &self.selection
    }

    /// Only true once a store read has shown nothing left to count
    pub fn is_fully_inventoried(&self) -> bool {
        self.session.is_authenticated() && self.available.as_ref().is_some_and(|a| a.is_empty())
    }

    fn require_session(&self) -> Result<(), FormError> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(FormError::NotSignedIn)
        }
    }

    // ========================================================================
    // SESSION
    // ========================================================================

    /// Authenticate, then load availability. A rejected sign-in changes nothing.
    pub fn sign_in(&mut self, gate: &AuthGate, identity: &str, passphrase: &str) -> Result<FormState, FormError> {
        let session = gate.authenticate(identity, passphrase)?;
        self.session = session;
        self.state = FormState::SelectingReferences;
        self.refresh()
    }

    pub fn sign_out(&mut self) {
        self.session = Session::default();
        self.state = FormState::LoggedOut;
        self.available = None;
        self.selection.clear();
    }

    /// Re-read the store and recompute availability.
    /// Selections that were recorded elsewhere in the meantime are dropped.
    pub fn refresh(&mut self) -> Result<FormState, FormError> {
        self.require_session()?;

        let records = self.store.load_all()?;
        let available = self.catalog.available(&records);

        let still_open: HashSet<&str> = available.iter().map(|e| e.reference.as_str()).collect();
        self.selection.retain(|s| still_open.contains(s.entry.reference.as_str()));

        self.state = if available.is_empty() {
            FormState::FullyInventoried
        } else if self.selection.is_empty() {
            match self.state {
                FormState::Submitted => FormState::Submitted,
                _ => FormState::SelectingReferences,
            }
        } else {
            match self.state {
                FormState::ReadyToSubmit => FormState::ReadyToSubmit,
                _ => FormState::EnteringQuantities,
            }
        };

        tracing::debug!(
            identity = %self.session.identity,
            available = available.len(),
            state = ?self.state,
            "form refreshed"
        );
        self.available = Some(available);
        Ok(self.state)
    }

    // ========================================================================
    // SELECTION & QUANTITIES
    // ========================================================================

    /// Replace the selection. Order follows the catalog; quantities already
    /// typed for references that stay selected are kept. An empty selection is
    /// allowed and simply blocks submission. Availability is read first if no
    /// store read has succeeded yet.
    pub fn select<S: AsRef<str>>(&mut self, references: &[S]) -> Result<FormState, FormError> {
        self.require_session()?;
        if self.available.is_none() {
            self.refresh()?;
        }
        let available = self.available.as_deref().unwrap_or_default();
        if available.is_empty() {
            return Err(FormError::FullyInventoried);
        }

        let wanted: HashSet<&str> = references.iter().map(|r| r.as_ref()).collect();
        for reference in &wanted {
            if !available.iter().any(|e| e.reference == *reference) {
                return Err(FormError::Unavailable(reference.to_string()));
            }
        }

        let previous = std::mem::take(&mut self.selection);
        let selection = available
            .iter()
            .filter(|e| wanted.contains(e.reference.as_str()))
            .map(|entry| Selection {
                entry: entry.clone(),
                quantity: previous
                    .iter()
                    .find(|s| s.entry.reference == entry.reference)
                    .map(|s| s.quantity)
                    .unwrap_or(0),
            })
            .collect();
        self.selection = selection;

        self.state = if self.selection.is_empty() {
            FormState::SelectingReferences
        } else {
            FormState::EnteringQuantities
        };
        Ok(self.state)
    }

    /// Add or remove a single reference from the selection
    pub fn toggle(&mut self, reference: &str) -> Result<FormState, FormError> {
        let mut references: Vec<String> =
            self.selection.iter().map(|s| s.entry.reference.clone()).collect();

        if let Some(pos) = references.iter().position(|r| r == reference) {
            references.remove(pos);
        } else {
            references.push(reference.to_string());
        }

        self.select(&references)
    }

    pub fn set_quantity(&mut self, reference: &str, quantity: u32) -> Result<(), FormError> {
        self.require_session()?;

        let selection = self
            .selection
            .iter_mut()
            .find(|s| s.entry.reference == reference)
            .ok_or_else(|| FormError::NotSelected(reference.to_string()))?;
        selection.quantity = quantity;

        if self.state == FormState::ReadyToSubmit {
            self.state = FormState::EnteringQuantities;
        }
        Ok(())
    }

    /// One record per selected reference, stamped with the session identity
    pub fn pending_records(&self) -> Result<Vec<InventoryRecord>, FormError> {
        self.require_session()?;

        self.selection
            .iter()
            .map(|s| {
                InventoryRecord::new(
                    self.session.identity.as_str(),
                    s.entry.reference.as_str(),
                    s.entry.description.as_str(),
                    s.quantity,
                )
                .map_err(FormError::from)
            })
            .collect()
    }

    /// Summary of what a submit would write
    pub fn review(&mut self) -> Result<Vec<InventoryRecord>, FormError> {
        if self.selection.is_empty() {
            return Err(FormError::EmptySelection);
        }
        let records = self.pending_records()?;
        self.state = FormState::ReadyToSubmit;
        Ok(records)
    }

    // ========================================================================
    // SUBMISSION
    // ========================================================================

    /// Write the pending records that nobody recorded yet.
    ///
    /// On a store failure the selection is kept and the state does not move.
    pub fn submit(&mut self) -> Result<SubmitOutcome, FormError> {
        self.require_session()?;
        if self.selection.is_empty() {
            return Err(FormError::EmptySelection);
        }

        let pending = self.pending_records()?;

        let mut records = self.store.load_all()?;
        let existing: HashSet<&str> = records.iter().map(|r| r.reference.as_str()).collect();

        let (fresh, stale): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|r| !existing.contains(r.reference.as_str()));
        let skipped: Vec<String> = stale.into_iter().map(|r| r.reference).collect();

        if !skipped.is_empty() {
            tracing::warn!(
                identity = %self.session.identity,
                skipped = ?skipped,
                "references already recorded by another session"
            );
        }

        if !fresh.is_empty() {
            self.store.append(&fresh)?;
        }

        tracing::info!(
            identity = %self.session.identity,
            backend = self.store.backend(),
            appended = fresh.len(),
            "inventory submitted"
        );

        records.extend(fresh.iter().cloned());
        let available = self.catalog.available(&records);
        self.selection.clear();
        self.state = if available.is_empty() {
            FormState::FullyInventoried
        } else {
            FormState::Submitted
        };
        self.available = Some(available);

        Ok(SubmitOutcome {
            appended: fresh,
            skipped,
        })
    }

    // ========================================================================
    // READ-ONLY VIEWS
    // ========================================================================

    pub fn records(&self) -> Result<Vec<InventoryRecord>, FormError> {
        self.require_session()?;
        Ok(self.store.load_all()?)
    }

    /// Full snapshot of the store, or `None` while nothing has been recorded.
    pub fn export(&self, format: ExportFormat) -> Result<Option<Vec<u8>>, FormError> {
        let records = self.records()?;
        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some(format.encode(&records)?))
    }
}
