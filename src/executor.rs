//! Sequential transaction execution: submit, wait for inclusion, resolve the
//! containing block. Each step reports its outcome through the caller's
//! update callback before the next begins, so a result panel can render
//! progressively. No step is retried; the first failure aborts the sequence
//! and propagates, and no update fires after it.

use std::time::Duration;

use crate::chain::base::{ChainClient, Signer, UnsignedTransaction};
use crate::errors::ChatResult;
use crate::models::params::{Coin, ParameterValue, Params};

/// Explicit timing policy for confirmation. The network collaborator's own
/// defaults are never relied on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub confirmation_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            confirmation_timeout: Duration::from_secs(60),
        }
    }
}

/// Execute one transaction end to end.
///
/// Updates arrive in order: pending (hash), terminal status with gas totals,
/// then the resolved block height. Gas is reported in base units of the
/// native coin as `gas_used * gas_unit_price`.
pub async fn execute<F>(
    client: &dyn ChainClient,
    signer: &Signer,
    txn: &UnsignedTransaction,
    config: &ExecutorConfig,
    mut on_update: F,
) -> ChatResult<()>
where
    F: FnMut(Params),
{
    let submission = client.sign_and_submit(signer, txn).await?;
    tracing::debug!(hash = %submission.hash, "submitted, awaiting inclusion");

    let mut update = Params::new();
    update.insert("transaction", ParameterValue::hash(&submission.hash));
    update.insert("status", ParameterValue::text("Pending"));
    on_update(update);

    let confirmation = client
        .wait_for_inclusion(&submission.hash, config.confirmation_timeout)
        .await?;
    let status = if confirmation.success {
        "Success"
    } else {
        "Failed"
    };
    tracing::debug!(hash = %submission.hash, status, "transaction confirmed");

    let gas = u128::from(confirmation.gas_used) * u128::from(submission.gas_unit_price);
    let mut update = Params::new();
    update.insert("status", ParameterValue::text(status));
    update.insert("gas", ParameterValue::coin(Coin::native(), gas));
    update.insert(
        "gasUnitPrice",
        ParameterValue::coin(Coin::native(), u128::from(submission.gas_unit_price)),
    );
    update.insert("block", ParameterValue::text("Loading..."));
    on_update(update);

    let block = client.get_block_by_version(confirmation.version).await?;
    tracing::debug!(hash = %submission.hash, height = block.block_height, "block resolved");

    let mut update = Params::new();
    update.insert("block", ParameterValue::block(block.block_height));
    on_update(update);

    Ok(())
}
