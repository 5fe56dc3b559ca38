//! Decision engine
//!
//! An ordered chain of decisions evaluated once per cycle against a single
//! snapshot. A decision whose condition holds runs its action; if it is final
//! the rest of the chain is skipped. Errors are logged with the rule name and
//! the snapshot, then returned to the caller untouched.

use tracing::{debug, error, info};

use crate::error::Result;
use crate::exchange::Exchange;
use crate::execution::OrderExecutor;
use crate::history::HistoryStore;
use crate::rules::RuleParams;
use crate::snapshot::Data;
use crate::store::BandStore;

/// Collaborators a decision may read or mutate during a cycle
pub struct Context<'a> {
    pub exchange: &'a dyn Exchange,
    pub bands: &'a mut dyn BandStore,
    pub history: &'a HistoryStore,
    pub executor: &'a OrderExecutor,
    pub params: &'a RuleParams,
}

pub type Condition = Box<dyn Fn(&Data, &mut Context<'_>) -> Result<bool>>;
pub type Action = Box<dyn Fn(&Data, &mut Context<'_>) -> Result<()>>;

pub struct Decision {
    name: String,
    condition: Condition,
    action: Action,
    is_final: bool,
    triggered: bool,
}

impl Decision {
    pub fn new<C, A>(name: impl Into<String>, condition: C, action: A, is_final: bool) -> Self
    where
        C: Fn(&Data, &mut Context<'_>) -> Result<bool> + 'static,
        A: Fn(&Data, &mut Context<'_>) -> Result<()> + 'static,
    {
        Decision {
            name: name.into(),
            condition: Box::new(condition),
            action: Box::new(action),
            is_final,
            triggered: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Whether the condition held on the last evaluation
    pub fn triggered(&self) -> bool {
        self.triggered
    }

    /// Evaluate the condition and, when it holds, run the action
    pub fn execute(&mut self, data: &Data, ctx: &mut Context<'_>) -> Result<bool> {
        self.triggered = false;
        self.triggered = (self.condition)(data, ctx)?;

        if self.triggered {
            info!(rule = %self.name, "Decision triggered");
            (self.action)(data, ctx)?;
        } else {
            debug!(rule = %self.name, "Decision not triggered");
        }
        Ok(self.triggered)
    }
}

impl std::fmt::Debug for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decision")
            .field("name", &self.name)
            .field("is_final", &self.is_final)
            .field("triggered", &self.triggered)
            .finish()
    }
}

/// What happened during one pass over the chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Decisions whose condition held, in evaluation order
    pub matched: Vec<String>,
    /// The final decision that stopped the chain, if any
    pub halted_by: Option<String>,
}

#[derive(Debug, Default)]
pub struct DecisionEngine {
    decisions: Vec<Decision>,
}

impl DecisionEngine {
    pub fn new(decisions: Vec<Decision>) -> Self {
        DecisionEngine { decisions }
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// Run one cycle
    pub fn run(&mut self, data: &Data, ctx: &mut Context<'_>) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        for decision in self.decisions.iter_mut() {
            let matched = decision.execute(data, ctx).map_err(|e| {
                error!(rule = %decision.name(), "Decision failed: {} | {}", e, data);
                e
            })?;

            if !matched {
                continue;
            }
            report.matched.push(decision.name().to_string());

            if decision.is_final() {
                info!(rule = %decision.name(), "Final decision reached, skipping the rest");
                report.halted_by = Some(decision.name().to_string());
                break;
            }
        }

        Ok(report)
    }
}
