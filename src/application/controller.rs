use crate::domain::expense::{CommittedRecord, NewExpense};
use crate::domain::lifecycle::{
    Delivery, ForegroundReturned, LifecycleWatcher, Subscription, SubscriptionId,
};
use crate::domain::payment::{Amount, PaymentIntent, PendingPayment};
use crate::domain::ports::{ExpenseStoreBox, HandoffError, HandoffLauncherBox};
use crate::error::{ReconcileError, Result};
use chrono::{DateTime, Utc};
use std::fmt;

/// Where the controller is in a handoff cycle.
///
/// `Committed` and `Discarded` are passed through within a single call; the
/// controller always comes to rest in one of the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingHandoff,
    AwaitingUserConfirmation,
    Committed,
    Discarded,
}

#[derive(Debug)]
enum State {
    Idle,
    /// Armed: the next foreground edge raises the confirmation prompt.
    AwaitingHandoff(PendingPayment),
    AwaitingUserConfirmation(PendingPayment),
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Idle => Phase::Idle,
            State::AwaitingHandoff(_) => Phase::AwaitingHandoff,
            State::AwaitingUserConfirmation(_) => Phase::AwaitingUserConfirmation,
        }
    }
}

/// The user's answer to "Did the payment succeed?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDecision {
    Confirmed,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    Declined,
    Cancelled,
    TornDown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Committed(CommittedRecord),
    Discarded(DiscardReason),
}

/// What the user is shown once they come back from the payment app.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationPrompt {
    pub amount: Amount,
    pub tag: String,
    pub note: String,
}

impl ConfirmationPrompt {
    pub const TITLE: &'static str = "Confirm Payment";
    pub const QUESTION: &'static str = "Did the payment succeed?";

    fn for_payment(payment: &PendingPayment) -> Self {
        Self {
            amount: payment.amount,
            tag: payment.tag.clone(),
            note: payment.note.clone(),
        }
    }
}

impl fmt::Display for ConfirmationPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (amount {}, tag {}",
            Self::TITLE,
            Self::QUESTION,
            self.amount,
            self.tag
        )?;
        if !self.note.is_empty() {
            write!(f, ", note {}", self.note)?;
        }
        write!(f, ")")
    }
}

/// Orchestrates one scan-to-payment cycle at a time.
///
/// Owns the pending payment from submission until it is either written through
/// the [`ExpenseStore`](crate::domain::ports::ExpenseStore) after an explicit
/// confirmation or discarded. Every operation takes `&mut self`, so checking
/// and changing the armed state never straddles another caller, and writes for
/// one controller are strictly sequential.
pub struct ReconciliationController {
    launcher: HandoffLauncherBox,
    store: ExpenseStoreBox,
    state: State,
    subscription: Option<Subscription>,
    last_terminal: Option<Phase>,
}

impl ReconciliationController {
    pub fn new(launcher: HandoffLauncherBox, store: ExpenseStoreBox) -> Self {
        Self {
            launcher,
            store,
            state: State::Idle,
            subscription: None,
            last_terminal: None,
        }
    }

    /// Subscribes to foreground edges, replacing any earlier subscription.
    pub fn attach(&mut self, watcher: &mut LifecycleWatcher) {
        if let Some(mut previous) = self.subscription.take() {
            previous.cancel();
        }
        self.subscription = Some(watcher.subscribe());
    }

    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.subscription.as_ref().map(Subscription::id)
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_live)
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, State::AwaitingHandoff(_))
    }

    pub fn pending(&self) -> Option<&PendingPayment> {
        match &self.state {
            State::Idle => None,
            State::AwaitingHandoff(payment) | State::AwaitingUserConfirmation(payment) => {
                Some(payment)
            }
        }
    }

    /// `Committed` or `Discarded` for the most recently finished cycle.
    pub fn last_terminal(&self) -> Option<Phase> {
        self.last_terminal
    }

    /// Hands a validated payment to the external payment app.
    ///
    /// The controller is armed right before the launch. When the app cannot be
    /// reached the attempt is discarded without ever arming. Refused with
    /// [`ReconcileError::Detached`] after teardown or before [`Self::attach`].
    pub async fn submit(&mut self, intent: PaymentIntent) -> Result<()> {
        if !matches!(self.state, State::Idle) {
            tracing::warn!(phase = ?self.phase(), "submission rejected, payment already pending");
            return Err(ReconcileError::AlreadyPending);
        }
        // Without a subscription no foreground edge could ever prompt for it.
        if !self.is_attached() {
            tracing::warn!("submission rejected, not attached to a lifecycle watcher");
            return Err(ReconcileError::Detached);
        }

        let PaymentIntent {
            payment,
            handoff_uri,
        } = intent;

        if !self.launcher.can_handle(&handoff_uri).await {
            tracing::warn!(uri = %handoff_uri, "no payment app can handle the handoff");
            self.finish(Phase::Discarded);
            return Err(HandoffError::Unreachable(handoff_uri).into());
        }

        // Edges raised before arming belong to no cycle.
        self.discard_queued();
        self.state = State::AwaitingHandoff(payment);
        tracing::debug!(uri = %handoff_uri, "armed, launching payment app");

        if let Err(e) = self.launcher.launch(&handoff_uri).await {
            tracing::warn!(uri = %handoff_uri, "payment app launch failed: {}", e);
            self.state = State::Idle;
            self.finish(Phase::Discarded);
            return Err(e.into());
        }
        Ok(())
    }

    /// Routes one delivery from the lifecycle subscription.
    ///
    /// Deliveries for a cancelled or replaced subscription are dropped, as are
    /// edges that arrive while the controller is not armed.
    pub fn deliver(&mut self, delivery: Delivery) -> Option<ConfirmationPrompt> {
        let current = self
            .subscription
            .as_ref()
            .filter(|s| s.is_live())
            .map(Subscription::id);
        if current != Some(delivery.subscription) {
            tracing::debug!(dwell = delivery.edge.dwell, "dropping stale foreground edge");
            return None;
        }
        self.on_foreground_returned(delivery.edge)
    }

    /// Drains deliveries already queued on the subscription.
    pub fn pump(&mut self) -> Option<ConfirmationPrompt> {
        let mut prompt = None;
        while let Some(delivery) = self.subscription.as_mut().and_then(Subscription::try_next) {
            if let Some(raised) = self.deliver(delivery) {
                prompt.get_or_insert(raised);
            }
        }
        prompt
    }

    fn discard_queued(&mut self) {
        while let Some(delivery) = self.subscription.as_mut().and_then(Subscription::try_next) {
            tracing::trace!(dwell = delivery.edge.dwell, "discarding edge raised while idle");
        }
    }

    /// Waits until a foreground edge raises the confirmation prompt. Returns
    /// `None` once the subscription is gone.
    pub async fn wait_for_prompt(&mut self) -> Option<ConfirmationPrompt> {
        loop {
            let delivery = self.subscription.as_mut()?.next().await?;
            if let Some(prompt) = self.deliver(delivery) {
                return Some(prompt);
            }
        }
    }

    fn on_foreground_returned(&mut self, edge: ForegroundReturned) -> Option<ConfirmationPrompt> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::AwaitingHandoff(payment) => {
                tracing::debug!(dwell = edge.dwell, "back from payment app, asking for confirmation");
                let prompt = ConfirmationPrompt::for_payment(&payment);
                self.state = State::AwaitingUserConfirmation(payment);
                Some(prompt)
            }
            other => {
                tracing::trace!(phase = ?other.phase(), dwell = edge.dwell, "ignoring foreground edge");
                self.state = other;
                None
            }
        }
    }

    /// Applies the user's answer. Only a confirmation writes a record, and at
    /// most once: the pending payment leaves the controller before the write.
    pub async fn resolve(
        &mut self,
        decision: UserDecision,
        now: DateTime<Utc>,
    ) -> Result<CycleOutcome> {
        let payment = match std::mem::replace(&mut self.state, State::Idle) {
            State::AwaitingUserConfirmation(payment) => payment,
            other => {
                self.state = other;
                return Err(ReconcileError::NoConfirmationPending);
            }
        };

        match decision {
            UserDecision::Declined => {
                tracing::debug!("payment declined by user, discarding");
                self.finish(Phase::Discarded);
                Ok(CycleOutcome::Discarded(DiscardReason::Declined))
            }
            UserDecision::Confirmed => {
                let expense = NewExpense {
                    amount: payment.amount.value(),
                    note: payment.note,
                    tag: payment.tag,
                    date: now,
                };
                match self.store.insert(expense.clone()).await {
                    Ok(id) => {
                        tracing::info!(record_id = %id, "payment recorded");
                        self.finish(Phase::Committed);
                        Ok(CycleOutcome::Committed(CommittedRecord::from_new(id, expense)))
                    }
                    Err(e) => {
                        tracing::error!("confirmed payment was not saved: {}", e);
                        self.finish(Phase::Discarded);
                        Err(ReconcileError::PersistenceFailed(e))
                    }
                }
            }
        }
    }

    /// Writes an expense entered by hand. Unrelated to the handoff cycle, so
    /// it neither needs nor touches a pending payment.
    pub async fn record_manual(&mut self, expense: NewExpense) -> Result<CommittedRecord> {
        let id = self.store.insert(expense.clone()).await.map_err(|e| {
            tracing::error!("manual expense was not saved: {}", e);
            ReconcileError::Storage(e)
        })?;
        tracing::info!(record_id = %id, "manual expense recorded");
        Ok(CommittedRecord::from_new(id, expense))
    }

    /// Disarms without prompting or writing.
    pub fn cancel(&mut self) -> Option<CycleOutcome> {
        self.disarm(DiscardReason::Cancelled)
    }

    /// Screen teardown: disarms and releases the lifecycle subscription, so a
    /// late foreground edge can no longer raise a prompt.
    pub fn teardown(&mut self) -> Option<CycleOutcome> {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.disarm(DiscardReason::TornDown)
    }

    fn disarm(&mut self, reason: DiscardReason) -> Option<CycleOutcome> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => None,
            _ => {
                tracing::debug!(?reason, "pending payment discarded");
                self.finish(Phase::Discarded);
                Some(CycleOutcome::Discarded(reason))
            }
        }
    }

    fn finish(&mut self, terminal: Phase) {
        tracing::debug!(?terminal, "cycle finished, back to idle");
        self.last_terminal = Some(terminal);
    }
}
