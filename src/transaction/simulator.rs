//! Transaction simulation before signing.
//!
//! Dry-runs an unsigned transaction through `simulateTransaction` to catch
//! failures before anything irreversible happens. The transaction is borrowed,
//! so it stays unsigned and can be simulated again or submitted afterwards.

use std::sync::Arc;

use crate::rpc::types::describe_chain_error;
use crate::rpc::{ChainRpc, RpcResult};
use crate::transaction::types::UnsignedTransaction;

/// Outcome of a dry run. Network failures are reported separately as `RpcError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationOutcome {
    Ok {
        logs: Vec<String>,
        units_consumed: Option<u64>,
    },
    Failed {
        error: String,
        logs: Vec<String>,
    },
}

impl SimulationOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, SimulationOutcome::Ok { .. })
    }

    pub fn logs(&self) -> &[String] {
        match self {
            SimulationOutcome::Ok { logs, .. } | SimulationOutcome::Failed { logs, .. } => logs,
        }
    }
}

/// Dry-runs transactions against the active endpoint.
#[derive(Clone)]
pub struct TransactionSimulator {
    rpc: Arc<dyn ChainRpc>,
}

impl TransactionSimulator {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self { rpc }
    }

    pub async fn simulate(&self, unsigned: &UnsignedTransaction) -> RpcResult<SimulationOutcome> {
        let result = self.rpc.simulate_transaction(&unsigned.to_wire_base64()).await?;
        let logs = result.logs.unwrap_or_default();

        let outcome = match result.err {
            Some(err) => SimulationOutcome::Failed {
                error: describe_chain_error(&err),
                logs,
            },
            None => SimulationOutcome::Ok {
                logs,
                units_consumed: result.units_consumed,
            },
        };

        tracing::debug!(
            ok = outcome.is_ok(),
            log_lines = outcome.logs().len(),
            "Simulation finished"
        );
        Ok(outcome)
    }
}
