//! Account creation and lookup

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::codegen::CodeGenerator;
use super::models::{Account, AccountDetails, NewAccount};
use super::validation::{AccountNumber, SortCode, ValidationError, validate_name};
use crate::store::{AccountStore, StoreError, TransactionLog, collect_by_source};

/// Generation attempts before giving up on a free (sort code, number) pair
pub const MAX_CODE_ATTEMPTS: u32 = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No free account identity after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },
}

pub struct AccountService {
    store: Arc<dyn AccountStore>,
    transactions: Arc<dyn TransactionLog>,
    codes: CodeGenerator,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>, transactions: Arc<dyn TransactionLog>) -> Self {
        Self {
            store,
            transactions,
            codes: CodeGenerator::new(),
        }
    }

    /// Open an account with a generated identity and zero balance.
    pub async fn create_account(
        &self,
        bank_name: &str,
        owner_name: &str,
    ) -> Result<Account, AccountError> {
        let bank_name = validate_name("bank_name", bank_name)?;
        let owner_name = validate_name("owner_name", owner_name)?;

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let new_account = NewAccount {
                sort_code: self.codes.generate_sort_code(),
                account_number: self.codes.generate_account_number(),
                bank_name: bank_name.clone(),
                owner_name: owner_name.clone(),
            };

            match self.store.insert(new_account).await {
                Ok(account) => {
                    info!(
                        account_id = %account.id,
                        identity = %account.identity(),
                        "Account created"
                    );
                    return Ok(account);
                }
                Err(StoreError::DuplicateIdentity(identity)) => {
                    debug!(attempt, identity = %identity, "Generated identity taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(attempts = MAX_CODE_ATTEMPTS, "Account identity generation exhausted");
        Err(AccountError::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    /// Account plus its outgoing transactions, oldest first.
    pub async fn get_account(
        &self,
        sort_code: &str,
        account_number: &str,
    ) -> Result<Option<AccountDetails>, AccountError> {
        let sort_code = SortCode::new(sort_code)?;
        let account_number = AccountNumber::new(account_number)?;

        let Some(account) = self
            .store
            .find_by_identity(sort_code.as_str(), account_number.as_str())
            .await?
        else {
            return Ok(None);
        };

        let transactions = collect_by_source(self.transactions.as_ref(), account.id).await?;
        Ok(Some(AccountDetails {
            account,
            transactions,
        }))
    }

    /// Lookup without a sort code; ambiguous numbers are an error.
    pub async fn get_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, AccountError> {
        let account_number = AccountNumber::new(account_number)?;
        Ok(self
            .store
            .find_by_account_number(account_number.as_str())
            .await?)
    }
}
