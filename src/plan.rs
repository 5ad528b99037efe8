use forge_api::StepEvent;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Opening of a JSON array of objects; marks the start of a plan payload.
pub const PLAN_PREFIX: &str = "[{";

/// One proposed on-chain call, in the backend's serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedTransaction {
    pub to: String,
    #[serde(rename = "function")]
    pub function_name: String,
    #[serde(rename = "arguments", default)]
    pub argument_list: Vec<String>,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "input_data", default)]
    pub input_data: String,
}

#[derive(Debug)]
struct Candidate {
    title: String,
    text: String,
}

/// Reassembles a transaction plan from streamed step fragments.
///
/// A fragment of a recognized step that begins with `[{` opens a candidate;
/// later fragments of the same step extend it. The candidate is re-parsed
/// after every fragment and the first successful parse is returned.
#[derive(Debug)]
pub struct PlanAssembler {
    titles: Vec<String>,
    candidate: Option<Candidate>,
}

impl PlanAssembler {
    pub fn new(titles: Vec<String>) -> Self {
        Self {
            titles,
            candidate: None,
        }
    }

    pub fn is_plan_title(&self, title: &str) -> bool {
        self.titles.iter().any(|known| known == title)
    }

    pub fn is_assembling(&self) -> bool {
        self.candidate.is_some()
    }

    /// Feeds one folded event. Returns a plan once one parses.
    pub fn observe(&mut self, event: &StepEvent) -> Option<Vec<ProposedTransaction>> {
        let StepEvent::Step { title, output } = event else {
            return None;
        };

        let extends = self
            .candidate
            .as_ref()
            .is_some_and(|candidate| candidate.title == *title);

        if extends {
            if let Some(candidate) = self.candidate.as_mut() {
                candidate.text.push_str(output);
            }
        } else {
            self.discard("step changed");
            if !self.is_plan_title(title) || !output.trim_start().starts_with(PLAN_PREFIX) {
                return None;
            }
            self.candidate = Some(Candidate {
                title: title.clone(),
                text: output.clone(),
            });
        }

        let candidate = self.candidate.as_ref()?;
        match serde_json::from_str::<Vec<ProposedTransaction>>(candidate.text.trim()) {
            Ok(plan) => {
                debug!(title = %candidate.title, transactions = plan.len(), "transaction plan parsed");
                self.candidate = None;
                Some(plan)
            }
            Err(error) => {
                debug!(title = %candidate.title, %error, "transaction plan incomplete");
                None
            }
        }
    }

    /// Drops any unparsed candidate.
    pub fn reset(&mut self) {
        self.discard("stream replaced");
    }

    fn discard(&mut self, reason: &str) {
        if let Some(candidate) = self.candidate.take() {
            warn!(
                title = %candidate.title,
                bytes = candidate.text.len(),
                reason,
                "discarding unparsed transaction plan"
            );
        }
    }
}
