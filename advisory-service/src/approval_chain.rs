use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{fetch_rows, Direction, TableQuery, TableReader};

pub const PAYMENT_STATUS_TABLE: &str = "payment_status_definitions";

/// Catalog entry for a payment request status, maintained by admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusDefinition {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub display_order: i32,
    #[serde(default)]
    pub is_terminal: bool,
    #[serde(default)]
    pub requires_signature: bool,
    #[serde(default)]
    pub signature_type: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// The part of a status definition a caller needs to advance a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextStep {
    pub code: String,
    pub name: String,
    pub requires_signature: bool,
    pub signature_type: Option<String>,
    pub color: Option<String>,
}

impl From<&PaymentStatusDefinition> for NextStep {
    fn from(status: &PaymentStatusDefinition) -> Self {
        Self {
            code: status.code.clone(),
            name: status.name.clone(),
            requires_signature: status.requires_signature,
            signature_type: status.signature_type.clone(),
            color: status.color.clone(),
        }
    }
}

/// Status catalog in `display_order` order. Terminal statuses stay in the
/// list but never count as a step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalChain {
    statuses: Vec<PaymentStatusDefinition>,
}

impl ApprovalChain {
    pub fn new(mut statuses: Vec<PaymentStatusDefinition>) -> Self {
        statuses.sort_by_key(|status| status.display_order);
        Self { statuses }
    }

    pub fn statuses(&self) -> &[PaymentStatusDefinition] {
        &self.statuses
    }

    pub fn status_by_code(&self, code: &str) -> Option<&PaymentStatusDefinition> {
        self.statuses.iter().find(|status| status.code == code)
    }

    /// First non-terminal status after `current_code`. An unknown code and
    /// the end of the chain both give `None`.
    pub fn next_step(&self, current_code: &str) -> Option<NextStep> {
        let index = self
            .statuses
            .iter()
            .position(|status| status.code == current_code)?;
        self.statuses[index + 1..]
            .iter()
            .find(|status| !status.is_terminal)
            .map(NextStep::from)
    }

    pub fn is_terminal(&self, code: &str) -> bool {
        self.status_by_code(code)
            .map(|status| status.is_terminal)
            .unwrap_or(false)
    }

    /// Position among non-terminal statuses, or -1.
    pub fn current_step_index(&self, code: &str) -> i32 {
        self.steps()
            .position(|status| status.code == code)
            .map(|index| index as i32)
            .unwrap_or(-1)
    }

    pub fn total_steps(&self) -> usize {
        self.steps().count()
    }

    fn steps(&self) -> impl Iterator<Item = &PaymentStatusDefinition> {
        self.statuses.iter().filter(|status| !status.is_terminal)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalChainSnapshot {
    pub statuses: Vec<PaymentStatusDefinition>,
    pub total_steps: usize,
    pub is_loading: bool,
    pub error: Option<String>,
}

struct ChainState {
    chain: Arc<ApprovalChain>,
    /// A fetch has completed, successfully or not.
    attempted: bool,
    /// A fetch has succeeded; until then every read retries.
    loaded: bool,
    error: Option<String>,
}

impl ChainState {
    fn snapshot(&self) -> ApprovalChainSnapshot {
        ApprovalChainSnapshot {
            statuses: self.chain.statuses().to_vec(),
            total_steps: self.chain.total_steps(),
            is_loading: !self.attempted,
            error: self.error.clone(),
        }
    }
}

/// Active status catalog, read from the backend on first use and kept for
/// the lifetime of the cache. A failed reload keeps the previous catalog; a
/// failed first load is retried by the next read.
pub struct ApprovalChainCache {
    reader: Arc<dyn TableReader>,
    state: RwLock<ChainState>,
}

impl ApprovalChainCache {
    pub fn new(reader: Arc<dyn TableReader>) -> Self {
        Self {
            reader,
            state: RwLock::new(ChainState {
                chain: Arc::new(ApprovalChain::default()),
                attempted: false,
                loaded: false,
                error: None,
            }),
        }
    }

    pub fn query() -> TableQuery {
        TableQuery::new(PAYMENT_STATUS_TABLE)
            .eq("is_active", true)
            .order_by("display_order", Direction::Asc)
    }

    /// The cached chain, loading it first if no fetch has succeeded yet.
    pub async fn chain(&self) -> Arc<ApprovalChain> {
        self.ensure_loaded().await;
        self.state.read().await.chain.clone()
    }

    pub async fn snapshot(&self) -> ApprovalChainSnapshot {
        self.ensure_loaded().await;
        self.state.read().await.snapshot()
    }

    /// Current state without triggering a load.
    pub async fn peek(&self) -> ApprovalChainSnapshot {
        self.state.read().await.snapshot()
    }

    /// Refetch and replace the catalog wholesale.
    pub async fn refresh(&self) -> ApprovalChainSnapshot {
        let mut state = self.state.write().await;
        self.load_into(&mut state).await;
        state.snapshot()
    }

    async fn ensure_loaded(&self) {
        if self.state.read().await.loaded {
            return;
        }
        let mut state = self.state.write().await;
        if state.loaded {
            return;
        }
        self.load_into(&mut state).await;
    }

    async fn load_into(&self, state: &mut ChainState) {
        match fetch_rows::<PaymentStatusDefinition>(self.reader.as_ref(), &Self::query()).await {
            Ok(statuses) => {
                info!(count = statuses.len(), "loaded payment status catalog");
                state.chain = Arc::new(ApprovalChain::new(statuses));
                state.error = None;
                state.loaded = true;
            }
            Err(err) => {
                warn!(error = %err, "failed to load payment status catalog, keeping previous");
                state.error = Some(err.to_string());
            }
        }
        state.attempted = true;
    }
}
