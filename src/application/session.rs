use super::controller::{ConfirmationPrompt, CycleOutcome, ReconciliationController, UserDecision};
use crate::domain::expense::CommittedRecord;
use crate::domain::lifecycle::{LifecycleState, LifecycleWatcher};
use crate::domain::payment::{PaymentIntentBuilder, manual_expense};
use crate::domain::ports::TagSource;
use crate::domain::scan::{AdmittedScan, ScanEvent, ScanGate};
use crate::domain::tags::{TagCatalog, TagError};
use crate::error::{ReconcileError, Result};
use chrono::{DateTime, Utc};

/// An input from the host: scanner, form, lifecycle notifier or user tap.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Scan(ScanEvent),
    Rescan,
    Proceed {
        amount: String,
        tag: Option<String>,
        note: String,
    },
    Lifecycle(LifecycleState),
    Decide {
        decision: UserDecision,
        at: DateTime<Utc>,
    },
    Cancel,
    Close,
    /// Expense typed into the manual-entry form, dated `at`.
    Manual {
        amount: String,
        tag: Option<String>,
        note: String,
        at: DateTime<Utc>,
    },
    AddTag(String),
    RenameTag {
        from: String,
        to: String,
    },
    RemoveTag(String),
}

/// Something the screen should show in response to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Scanned(String),
    HandedOff,
    Prompt(ConfirmationPrompt),
    Finished(CycleOutcome),
    ManualRecorded(CommittedRecord),
    TagsChanged(Vec<String>),
}

/// One visit to the scan-to-pay screen.
///
/// Wires the scan gate, the intent builder, the lifecycle watcher and the
/// controller together, and keeps the "scanned" latch: once a scan is
/// admitted, further scans are ignored until [`ScanSession::rescan`].
pub struct ScanSession {
    gate: ScanGate,
    builder: PaymentIntentBuilder,
    watcher: LifecycleWatcher,
    controller: ReconciliationController,
    tags: TagCatalog,
    scanned: Option<AdmittedScan>,
}

impl ScanSession {
    /// Enters the screen: the controller subscribes to the watcher here and
    /// unsubscribes in [`ScanSession::close`] (or on drop).
    pub fn new(
        gate: ScanGate,
        mut watcher: LifecycleWatcher,
        mut controller: ReconciliationController,
        tags: TagCatalog,
    ) -> Self {
        controller.attach(&mut watcher);
        Self {
            gate,
            builder: PaymentIntentBuilder::new(),
            watcher,
            controller,
            tags,
            scanned: None,
        }
    }

    pub fn controller(&self) -> &ReconciliationController {
        &self.controller
    }

    pub fn watcher(&self) -> &LifecycleWatcher {
        &self.watcher
    }

    pub fn scanned(&self) -> Option<&AdmittedScan> {
        self.scanned.as_ref()
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.tags()
    }

    pub fn catalog(&self) -> &TagCatalog {
        &self.tags
    }

    /// Returns the admitted scan, or `None` when the read was dropped or the
    /// latch is set. Safe to call repeatedly with the same event.
    pub fn on_scan(&mut self, event: &ScanEvent) -> Option<&AdmittedScan> {
        if self.scanned.is_some() {
            tracing::trace!("scan ignored, already scanned");
            return None;
        }
        let admitted = self.gate.admit(event).admitted()?;
        self.scanned = Some(admitted);
        self.scanned.as_ref()
    }

    /// Re-enables scanning. Refused while a payment is pending.
    pub fn rescan(&mut self) -> Result<()> {
        if self.controller.pending().is_some() {
            return Err(ReconcileError::AlreadyPending);
        }
        self.scanned = None;
        Ok(())
    }

    /// Validates the details form and hands the payment off.
    ///
    /// A tag is only considered selected when the catalog offers it.
    pub async fn proceed(&mut self, amount: &str, tag: Option<&str>, note: &str) -> Result<()> {
        let payload = self
            .scanned
            .as_ref()
            .map(|scan| scan.payload.clone())
            .ok_or(ReconcileError::NoScannedPayload)?;

        let tag = self.offered(tag);
        let intent = self.builder.build(&payload, amount, tag, note)?;
        self.controller.submit(intent).await
    }

    /// Records an expense from the manual-entry form. This is also where the
    /// user goes after a confirmed payment failed to save.
    pub async fn add_manual(
        &mut self,
        amount: &str,
        tag: Option<&str>,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<CommittedRecord> {
        let tag = self.offered(tag);
        let expense = manual_expense(amount, tag, note, now)?;
        self.controller.record_manual(expense).await
    }

    fn offered<'a>(&self, tag: Option<&'a str>) -> Option<&'a str> {
        tag.filter(|tag| self.tags.contains(tag.trim()))
    }

    pub fn add_tag(&mut self, name: &str) -> Result<()> {
        self.tags.add_custom(name)?;
        Ok(())
    }

    /// Renames the custom tag called `from`. Predefined tags cannot be renamed.
    pub fn rename_tag(&mut self, from: &str, to: &str) -> Result<()> {
        let index = self.custom_index(from)?;
        self.tags.rename_custom(index, to)?;
        Ok(())
    }

    pub fn remove_tag(&mut self, name: &str) -> Result<()> {
        let index = self.custom_index(name)?;
        self.tags.remove_custom(index)?;
        Ok(())
    }

    fn custom_index(&self, name: &str) -> std::result::Result<usize, TagError> {
        let name = name.trim();
        self.tags
            .custom()
            .iter()
            .position(|t| t == name)
            .ok_or_else(|| TagError::Unknown(name.to_string()))
    }

    /// Feeds one host visibility change; returns the prompt if it raised one.
    pub fn on_lifecycle(&mut self, state: LifecycleState) -> Option<ConfirmationPrompt> {
        self.watcher.transition(state);
        self.controller.pump()
    }

    /// Applies the user's answer. A committed cycle clears the latch so the
    /// next payment can be scanned.
    pub async fn decide(
        &mut self,
        decision: UserDecision,
        now: DateTime<Utc>,
    ) -> Result<CycleOutcome> {
        let outcome = self.controller.resolve(decision, now).await?;
        if matches!(outcome, CycleOutcome::Committed(_)) {
            self.scanned = None;
        }
        Ok(outcome)
    }

    pub fn cancel(&mut self) -> Option<CycleOutcome> {
        self.controller.cancel()
    }

    /// Leaves the screen.
    pub fn close(&mut self) -> Option<CycleOutcome> {
        self.scanned = None;
        self.controller.teardown()
    }

    pub async fn apply(&mut self, event: SessionEvent) -> Result<Option<Notice>> {
        let notice = match event {
            SessionEvent::Scan(scan) => self
                .on_scan(&scan)
                .map(|admitted| Notice::Scanned(admitted.payload.clone())),
            SessionEvent::Rescan => {
                self.rescan()?;
                None
            }
            SessionEvent::Proceed { amount, tag, note } => {
                self.proceed(&amount, tag.as_deref(), &note).await?;
                Some(Notice::HandedOff)
            }
            SessionEvent::Lifecycle(state) => self.on_lifecycle(state).map(Notice::Prompt),
            SessionEvent::Decide { decision, at } => {
                Some(Notice::Finished(self.decide(decision, at).await?))
            }
            SessionEvent::Cancel => self.cancel().map(Notice::Finished),
            SessionEvent::Close => self.close().map(Notice::Finished),
            SessionEvent::Manual {
                amount,
                tag,
                note,
                at,
            } => Some(Notice::ManualRecorded(
                self.add_manual(&amount, tag.as_deref(), &note, at).await?,
            )),
            SessionEvent::AddTag(name) => {
                self.add_tag(&name)?;
                Some(Notice::TagsChanged(self.tags()))
            }
            SessionEvent::RenameTag { from, to } => {
                self.rename_tag(&from, &to)?;
                Some(Notice::TagsChanged(self.tags()))
            }
            SessionEvent::RemoveTag(name) => {
                self.remove_tag(&name)?;
                Some(Notice::TagsChanged(self.tags()))
            }
        };
        Ok(notice)
    }
}
