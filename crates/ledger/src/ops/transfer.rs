use tracing::info;
use uuid::Uuid;

use super::{Ledger, log_failure, with_unit};
use crate::{
    AtomicUnit, Coins, LedgerError, LedgerResult, LedgerStore, Transaction, TransactionStore,
    WalletStore,
};

impl<S: LedgerStore> Ledger<S> {
    /// Move `amount` coins from one wallet to another.
    ///
    /// Writes the transfer record, debits the sender only if its balance
    /// covers the amount, credits the receiver and commits. On any error
    /// nothing is persisted.
    pub async fn transfer(
        &self,
        sender: Uuid,
        receiver: Uuid,
        amount: Coins,
    ) -> LedgerResult<Transaction> {
        let amount = amount.ensure_transferable()?;
        if sender == receiver {
            return Err(LedgerError::InvalidAmount(
                "cannot transfer coins to the same wallet".to_string(),
            ));
        }

        match self.run_transfer(sender, receiver, amount).await {
            Ok(record) => {
                info!(
                    transaction_id = record.id,
                    %sender,
                    %receiver,
                    amount = amount.amount(),
                    "transfer committed"
                );
                Ok(record)
            }
            Err(err) => {
                log_failure("transfer", &err);
                Err(err)
            }
        }
    }

    async fn run_transfer(
        &self,
        sender: Uuid,
        receiver: Uuid,
        amount: Coins,
    ) -> LedgerResult<Transaction> {
        with_unit!(self, |unit| {
            let record = unit.append_transaction(sender, receiver, amount).await?;
            unit.debit_if_sufficient(sender, amount).await?;
            unit.credit(receiver, amount).await?;
            Ok(record)
        })
    }
}
