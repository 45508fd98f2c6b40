//! Balance, allowance and approval checks on the source network.

use alloy_primitives::{Address, TxHash, U256};
use std::sync::Arc;
use tracing::{debug, info, Instrument};

use crate::chain::NetworkConfig;
use crate::config::ConfirmationConfig;
use crate::error::{Result, TransferError};
use crate::spans;
use crate::submission::{wait_for_confirmation, SubmissionQueue};
use crate::traits::{ChainClient, Clock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceCheck {
    pub has_balance: bool,
    pub has_allowance: bool,
    pub balance: U256,
    pub allowance: U256,
}

#[derive(Debug)]
pub struct TokenOps<C> {
    clock: C,
    queue: Arc<SubmissionQueue>,
    confirmation: ConfirmationConfig,
}

impl<C: Clock> TokenOps<C> {
    pub fn new(clock: C, queue: Arc<SubmissionQueue>, confirmation: ConfirmationConfig) -> Self {
        Self {
            clock,
            queue,
            confirmation,
        }
    }

    /// Reads the owner's token balance and the burn contract's allowance.
    pub async fn check_balance_and_allowance(
        &self,
        client: &dyn ChainClient,
        network: &NetworkConfig,
        owner: Address,
        amount: U256,
    ) -> Result<BalanceCheck> {
        let balance = client.balance_of(network.token_contract, owner).await?;
        let allowance = client
            .allowance(network.token_contract, owner, network.burn_contract)
            .await?;

        let check = BalanceCheck {
            has_balance: balance >= amount,
            has_allowance: allowance >= amount,
            balance,
            allowance,
        };

        debug!(
            owner = %owner,
            balance = %balance,
            allowance = %allowance,
            amount = %amount,
            event = "balance_and_allowance_checked"
        );

        Ok(check)
    }

    /// Approves the burn contract for `amount` unless the current allowance
    /// already covers it.
    ///
    /// Returns `None` when no transaction was needed. After the approval is
    /// mined the allowance is read back; if it still falls short the result
    /// is [`TransferError::ApprovalNotEffective`].
    pub async fn approve(
        &self,
        client: &dyn ChainClient,
        network: &NetworkConfig,
        amount: U256,
    ) -> Result<Option<TxHash>> {
        let owner = client.sender();
        let _slot = self.queue.acquire(network.network_id, owner).await;
        self.approve_in_slot(client, network, amount)
            .instrument(spans::approve(network.network_id, owner, network.burn_contract, amount))
            .await
    }

    /// Re-reads balance and allowance right before a burn and tops the
    /// allowance up if another transfer from the same account consumed it.
    ///
    /// The caller must hold the account's [`SubmissionQueue`] slot for the
    /// whole check-then-burn so no other burn or approval interleaves. A
    /// balance that no longer covers `amount` is
    /// [`TransferError::InsufficientFunds`].
    pub async fn ensure_spendable(
        &self,
        client: &dyn ChainClient,
        network: &NetworkConfig,
        amount: U256,
    ) -> Result<Option<TxHash>> {
        let owner = client.sender();
        let check = self
            .check_balance_and_allowance(client, network, owner, amount)
            .await?;

        if !check.has_balance {
            return Err(TransferError::InsufficientFunds {
                balance: check.balance,
                required: amount,
            });
        }
        if check.has_allowance {
            return Ok(None);
        }

        info!(
            owner = %owner,
            allowance = %check.allowance,
            amount = %amount,
            event = "allowance_consumed_before_burn"
        );
        self.approve_in_slot(client, network, amount)
            .instrument(spans::approve(network.network_id, owner, network.burn_contract, amount))
            .await
    }

    async fn approve_in_slot(
        &self,
        client: &dyn ChainClient,
        network: &NetworkConfig,
        amount: U256,
    ) -> Result<Option<TxHash>> {
        let owner = client.sender();
        let spender = network.burn_contract;

        let current = client
            .allowance(network.token_contract, owner, spender)
            .await?;
        if current >= amount {
            debug!(allowance = %current, event = "approval_not_needed");
            return Ok(None);
        }

        let tx_hash = client
            .submit_approve(network.token_contract, spender, amount)
            .await?;
        info!(tx_hash = %tx_hash, event = "approval_submitted");

        wait_for_confirmation(
            client,
            &self.clock,
            network.network_id,
            tx_hash,
            &self.confirmation,
        )
        .await?;

        let observed = client
            .allowance(network.token_contract, owner, spender)
            .await?;
        if observed < amount {
            return Err(TransferError::ApprovalNotEffective {
                expected: amount,
                observed,
            });
        }

        info!(tx_hash = %tx_hash, allowance = %observed, event = "approval_confirmed");
        Ok(Some(tx_hash))
    }
}
