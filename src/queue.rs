use std::collections::VecDeque;

use crate::plan::ProposedTransaction;

/// Identifies which plan a submission belongs to.
pub type PlanId = u64;

/// A head transaction handed out for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub plan_id: PlanId,
    pub label: String,
    pub transaction: ProposedTransaction,
}

/// Result of recording a submission outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The head was popped and the next one is eligible.
    Advanced,
    /// The head stays and the queue is stalled until resumed or replaced.
    Stalled,
    /// The submission belonged to a plan that has since been replaced.
    Superseded,
}

/// Strictly sequential transaction queue.
///
/// At most one submission is outstanding at any time, including across plan
/// replacement: a new plan's head waits until the old submission resolves.
#[derive(Debug, Default)]
pub struct TransactionQueue {
    pending: VecDeque<ProposedTransaction>,
    processed: usize,
    total: usize,
    plan_id: PlanId,
    in_flight: bool,
    stalled: bool,
}

impl TransactionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole queue with a fresh plan.
    pub fn replace(&mut self, plan: Vec<ProposedTransaction>) -> PlanId {
        self.plan_id += 1;
        self.total = plan.len();
        self.pending = plan.into();
        self.processed = 0;
        self.stalled = false;
        self.plan_id
    }

    /// Hands out the head for submission when nothing is outstanding.
    pub fn begin_next(&mut self) -> Option<Submission> {
        if self.in_flight || self.stalled {
            return None;
        }
        let label = self.progress_label()?;
        let transaction = self.pending.front()?.clone();
        self.in_flight = true;
        Some(Submission {
            plan_id: self.plan_id,
            label,
            transaction,
        })
    }

    /// Records the outcome of the outstanding submission.
    pub fn resolve(&mut self, plan_id: PlanId, succeeded: bool) -> Resolution {
        self.in_flight = false;
        if plan_id != self.plan_id {
            return Resolution::Superseded;
        }
        if succeeded {
            self.pending.pop_front();
            self.processed += 1;
            Resolution::Advanced
        } else {
            self.stalled = true;
            Resolution::Stalled
        }
    }

    /// Clears a stall so the failing head is submitted again.
    pub fn resume(&mut self) -> bool {
        if !self.stalled || self.in_flight || self.pending.is_empty() {
            return false;
        }
        self.stalled = false;
        true
    }

    /// `"<function> <processed>/<total>"` for the current head.
    pub fn progress_label(&self) -> Option<String> {
        let head = self.pending.front()?;
        Some(format!("{} {}/{}", head.function_name, self.processed, self.total))
    }

    pub fn pending(&self) -> impl Iterator<Item = &ProposedTransaction> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }
}

#[cfg(test)]
mod tests {
    use super::{Resolution, TransactionQueue};
    use crate::plan::ProposedTransaction;

    fn tx(function_name: &str) -> ProposedTransaction {
        ProposedTransaction {
            to: "0x00000000000000000000000000000000000000bb".to_string(),
            function_name: function_name.to_string(),
            argument_list: Vec::new(),
            value: "0".to_string(),
            input_data: "0x".to_string(),
        }
    }

    #[test]
    fn hands_out_one_head_at_a_time() {
        let mut queue = TransactionQueue::new();
        let plan = queue.replace(vec![tx("approve"), tx("swap"), tx("stake")]);

        let first = queue.begin_next().expect("head available");
        assert_eq!(first.label, "approve 0/3");
        assert!(queue.begin_next().is_none());

        assert_eq!(queue.resolve(plan, true), Resolution::Advanced);
        let second = queue.begin_next().expect("next head");
        assert_eq!(second.label, "swap 1/3");
        assert_eq!(second.transaction.function_name, "swap");
    }

    #[test]
    fn failure_stalls_until_resumed() {
        let mut queue = TransactionQueue::new();
        let plan = queue.replace(vec![tx("approve"), tx("swap")]);

        queue.begin_next();
        assert_eq!(queue.resolve(plan, false), Resolution::Stalled);
        assert!(queue.is_stalled());
        assert!(queue.begin_next().is_none());
        assert_eq!(queue.len(), 2);

        assert!(queue.resume());
        let retried = queue.begin_next().expect("head resubmitted");
        assert_eq!(retried.label, "approve 0/2");
    }

    #[test]
    fn replacement_waits_for_outstanding_submission() {
        let mut queue = TransactionQueue::new();
        let old = queue.replace(vec![tx("approve")]);
        queue.begin_next();

        let new = queue.replace(vec![tx("deposit"), tx("borrow")]);
        assert!(queue.begin_next().is_none());

        assert_eq!(queue.resolve(old, true), Resolution::Superseded);
        assert_eq!(queue.len(), 2);
        let head = queue.begin_next().expect("new head");
        assert_eq!(head.plan_id, new);
        assert_eq!(head.label, "deposit 0/2");
    }

    #[test]
    fn resume_without_stall_is_a_no_op() {
        let mut queue = TransactionQueue::new();
        assert!(!queue.resume());
        queue.replace(vec![tx("approve")]);
        assert!(!queue.resume());
    }
}
