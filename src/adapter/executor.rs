//! The order-executor boundary: the only place in this crate where a
//! `TradeSignal` turns into an actual (or simulated) exchange order.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use crate::core::errors::ExecutorError;
use crate::core::types::TradeSignal;

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub order_id: Option<String>,
    pub filled_quantity: Decimal,
    pub average_price: Decimal,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn filled(order_id: impl Into<String>, quantity: Decimal, average_price: Decimal) -> Self {
        Self {
            success: true,
            order_id: Some(order_id.into()),
            filled_quantity: quantity,
            average_price,
            error: None,
        }
    }
}

/// Collaborator contract a host implements to actually place orders. The core
/// never calls an exchange directly; it only emits `TradeSignal`s for
/// something implementing this trait to carry out.
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    async fn execute(&self, signal: &TradeSignal, quantity: Decimal) -> Result<ExecutionResult, ExecutorError>;
}

/// Always-succeeds, no-network executor for the CLI and tests: fills every
/// order at the signal's own price with no slippage or rejection.
pub struct PaperExecutor;

#[async_trait]
impl OrderExecutor for PaperExecutor {
    async fn execute(&self, signal: &TradeSignal, quantity: Decimal) -> Result<ExecutionResult, ExecutorError> {
        let order_id = uuid::Uuid::new_v4().to_string();
        info!(symbol = %signal.symbol, %quantity, price = %signal.price, "paper fill");
        Ok(ExecutionResult::filled(order_id, quantity, signal.price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SignalKind;

    #[tokio::test]
    async fn paper_executor_always_fills() {
        let executor = PaperExecutor;
        let signal = TradeSignal::new("BTCUSDT", SignalKind::Buy, rust_decimal_macros::dec!(100), "test").unwrap();
        let result = executor.execute(&signal, rust_decimal_macros::dec!(1)).await.unwrap();
        assert!(result.success);
        assert_eq!(result.average_price, rust_decimal_macros::dec!(100));
    }
}
