//! Balance movements outside generation: diamond exchange, purchases and
//! administrator grants.

use kcommon::UserId;
use kledger::{Cost, Currency, LedgerErrorKind};
use ksession::ConversationState;

use crate::engine::{Engine, Turn};
use crate::error::EngineError;
use crate::hooks::CreditSource;
use crate::types::{AccountView, Outbound, Problem, Sender};

impl Engine {
    /// Converts credits to the number of diamonds typed by the user.
    pub(crate) async fn exchange(&self, turn: Turn, text: &str) -> Result<Vec<Outbound>, EngineError> {
        let diamonds = match text.trim().parse::<u32>() {
            Ok(diamonds) if diamonds > 0 => diamonds,
            _ => {
                return Ok(turn.finish([Problem::InvalidAmount {
                    message: format!("'{}' is not a positive whole number", text.trim()),
                }
                .into()]));
            }
        };

        let user = turn.user();
        let exchanged = self
            .accounts
            .mutate(user, Some(&turn.account), |ledger, account| {
                ledger
                    .exchange_for_diamonds(account, diamonds)
                    .map_err(|err| match err.kind {
                        LedgerErrorKind::InsufficientFunds => Problem::InsufficientFunds {
                            required: Cost::credits(
                                diamonds.saturating_mul(ledger.policy().diamond_exchange_rate),
                            ),
                            available: account.total_credits(),
                        },
                        LedgerErrorKind::InvalidAmount => Problem::InvalidAmount {
                            message: err.message,
                        },
                    })
            })
            .await?;

        let (account, cost) = match exchanged {
            Ok(exchanged) => exchanged,
            Err(problem) => return Ok(turn.finish([problem.into()])),
        };

        self.sessions.transition_if(
            user,
            |state| matches!(state, ConversationState::AwaitingExchangeAmount),
            ConversationState::Idle,
        )?;
        self.hooks
            .on_credit(user, diamonds, Currency::Diamonds, CreditSource::Exchange);

        Ok(turn.finish([Outbound::Exchanged {
            diamonds,
            cost,
            account: AccountView::from(&account),
        }]))
    }

    /// Answers a payment pre-check: only catalog packages may be bought.
    pub fn acknowledge_pre_checkout(&self, package_id: &str) -> bool {
        self.catalog.package(package_id).is_some()
    }

    /// Credits a completed purchase to the buyer as paid credits.
    pub async fn handle_successful_payment(
        &self,
        sender: &Sender,
        package_id: &str,
    ) -> Result<Vec<Outbound>, EngineError> {
        let Some(package) = self.catalog.package(package_id) else {
            return Ok(vec![Problem::UnknownSelection.into()]);
        };
        let amount = package.credits_amount;

        let touched = self
            .accounts
            .touch(sender, None, self.clock.now())
            .await?;
        let account = self
            .accounts
            .update(sender.id, Some(&touched.account), |ledger, account| {
                ledger.credit(account, amount, Currency::Credits);
            })
            .await?;
        self.hooks
            .on_credit(sender.id, amount, Currency::Credits, CreditSource::Payment);

        Ok(vec![Outbound::Credited {
            amount,
            currency: Currency::Credits,
            account: AccountView::from(&account),
        }])
    }

    /// Grants paid credits to an existing account on behalf of an administrator.
    pub async fn admin_add_credits(
        &self,
        actor: UserId,
        target: UserId,
        amount: u32,
    ) -> Result<Vec<Outbound>, EngineError> {
        if !self.policy.is_admin(actor) {
            return Ok(vec![Problem::NotAuthorized.into()]);
        }
        if amount == 0 {
            return Ok(vec![Problem::InvalidAmount {
                message: "amount must be greater than zero".to_string(),
            }
            .into()]);
        }

        let account = match self
            .accounts
            .update(target, None, |ledger, account| {
                ledger.credit(account, amount, Currency::Credits);
            })
            .await
        {
            Ok(account) => account,
            Err(err) if err.is_not_found() => return Ok(vec![Problem::UnknownUser(target).into()]),
            Err(err) => return Err(err),
        };
        self.hooks
            .on_credit(target, amount, Currency::Credits, CreditSource::Admin);

        Ok(vec![Outbound::Credited {
            amount,
            currency: Currency::Credits,
            account: AccountView::from(&account),
        }])
    }

    /// Stored account for `user`, if one exists.
    pub async fn account(&self, user: UserId) -> Result<Option<AccountView>, EngineError> {
        Ok(self.accounts.find(user).await?.as_ref().map(AccountView::from))
    }
}
