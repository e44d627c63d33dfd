/*!
 * Credit accounting.
 *
 * The orchestrator settles billed characters against an account through
 * the [`CreditLedger`] trait; the shipped implementation stores balances
 * in the accounts table.
 */

use anyhow::Result;
use async_trait::async_trait;

use crate::database::Repository;
use crate::database::models::AccountRecord;

/// Atomic per-account credit operations
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Remove credits; fails without mutating when the balance is short
    async fn debit(&self, account_id: &str, amount: i64) -> Result<()>;

    /// Add credits
    async fn credit(&self, account_id: &str, amount: i64) -> Result<()>;

    /// Current balance, None for unknown accounts
    async fn balance(&self, account_id: &str) -> Result<Option<i64>>;
}

/// Ledger backed by the accounts table
#[derive(Clone)]
pub struct SqliteLedger {
    repository: Repository,
}

impl SqliteLedger {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create an account with an opening balance
    pub async fn open_account(&self, account_id: &str, balance: i64) -> Result<()> {
        self.repository
            .create_account(&AccountRecord::new(account_id, balance))
            .await
    }
}

#[async_trait]
impl CreditLedger for SqliteLedger {
    async fn debit(&self, account_id: &str, amount: i64) -> Result<()> {
        self.repository.debit_account(account_id, amount).await
    }

    async fn credit(&self, account_id: &str, amount: i64) -> Result<()> {
        self.repository.credit_account(account_id, amount).await
    }

    async fn balance(&self, account_id: &str) -> Result<Option<i64>> {
        self.repository.get_account_balance(account_id).await
    }
}
