//! Generation dispatcher: preflight, bounded provider call, then settlement.
//!
//! A submission moves `PreflightChecked -> Dispatched -> Settled | Failed`. The
//! provider is called once; a failure or timeout leaves every balance untouched.
//! On success the cost is drawn, the usage counter incremented and the account
//! persisted before any referral bonus is evaluated and media is handed back.

use std::sync::Arc;
use std::time::Duration;

use kcommon::UserId;
use kledger::{Cost, Currency, ReferralBonus, UserAccount};
use kprovider::{CompletionRequest, GenerationProvider, GenerationRequest, MediaUrl, ProviderError};
use tokio::time::Instant;

use crate::accounts::AccountBook;
use crate::error::EngineError;
use crate::hooks::{CreditSource, DispatchPhase, EngineHooks};
use crate::types::Problem;

/// Everything settlement needs, captured when the submission was assembled.
#[derive(Debug, Clone)]
pub(crate) struct Submission {
    pub user: UserId,
    pub model_id: String,
    pub provider_ref: String,
    pub request: GenerationRequest,
    pub cost: Cost,
}

#[derive(Debug, Clone)]
pub(crate) struct CompletionJob {
    pub user: UserId,
    pub label: String,
    pub request: CompletionRequest,
    pub cost: Cost,
}

#[derive(Debug, Clone)]
pub(crate) struct Settlement<T> {
    pub output: T,
    pub account: UserAccount,
    pub referral: Option<ReferralBonus>,
}

#[derive(Debug, Clone)]
pub(crate) enum DispatchOutcome<T> {
    Settled(Settlement<T>),
    /// The provider succeeded but the balance no longer covered the cost.
    Withheld { required: Cost, available: u64 },
    Failed(ProviderError),
}

pub(crate) struct Dispatcher {
    provider: Arc<dyn GenerationProvider>,
    accounts: Arc<AccountBook>,
    hooks: Arc<dyn EngineHooks>,
    generation_timeout: Duration,
    completion_timeout: Duration,
}

impl Dispatcher {
    pub(crate) fn new(
        provider: Arc<dyn GenerationProvider>,
        accounts: Arc<AccountBook>,
        hooks: Arc<dyn EngineHooks>,
        generation_timeout: Duration,
        completion_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            accounts,
            hooks,
            generation_timeout,
            completion_timeout,
        }
    }

    /// Affordability check made before any provider call.
    pub(crate) fn preflight(
        &self,
        account: &UserAccount,
        label: &str,
        cost: Cost,
    ) -> Result<(), Problem> {
        if self.accounts.ledger().can_cover(account, cost) {
            self.hooks
                .on_phase(account.id, label, DispatchPhase::PreflightChecked);
            return Ok(());
        }

        let available = account.balance(cost.currency);
        self.hooks
            .on_preflight_rejected(account.id, label, cost, available);
        Err(Problem::InsufficientFunds {
            required: cost,
            available,
        })
    }

    /// Runs a media submission. `account` is the submitter's record as loaded for
    /// this event and stands in if the store has none.
    pub(crate) async fn dispatch_generation(
        &self,
        account: &UserAccount,
        submission: Submission,
    ) -> Result<DispatchOutcome<Vec<MediaUrl>>, EngineError> {
        let Submission {
            user,
            model_id,
            provider_ref,
            request,
            cost,
        } = submission;

        self.hooks.on_phase(user, &model_id, DispatchPhase::Dispatched);
        let started = Instant::now();
        let result = tokio::time::timeout(
            self.generation_timeout,
            self.provider.submit(&provider_ref, request),
        )
        .await
        .unwrap_or_else(|_| Err(timed_out(self.generation_timeout)))
        .and_then(|urls| {
            if urls.is_empty() {
                Err(ProviderError::empty_output("provider returned no media"))
            } else {
                Ok(urls)
            }
        });

        match result {
            Ok(urls) => {
                self.hooks
                    .on_dispatch_success(user, &model_id, urls.len(), started.elapsed());
                self.settle(account, &model_id, cost, true, urls).await
            }
            Err(error) => Ok(self.fail(user, &model_id, error, started.elapsed())),
        }
    }

    /// Runs a text or vision completion under the same ledger rules. Completions
    /// draw credits but do not count as generated images.
    pub(crate) async fn dispatch_completion(
        &self,
        account: &UserAccount,
        job: CompletionJob,
    ) -> Result<DispatchOutcome<String>, EngineError> {
        let CompletionJob {
            user,
            label,
            request,
            cost,
        } = job;

        self.hooks.on_phase(user, &label, DispatchPhase::Dispatched);
        let started = Instant::now();
        let result = tokio::time::timeout(self.completion_timeout, self.provider.complete(request))
            .await
            .unwrap_or_else(|_| Err(timed_out(self.completion_timeout)))
            .and_then(|text| {
                if text.trim().is_empty() {
                    Err(ProviderError::empty_output("provider returned no text"))
                } else {
                    Ok(text)
                }
            });

        match result {
            Ok(text) => {
                self.hooks
                    .on_dispatch_success(user, &label, 1, started.elapsed());
                self.settle(account, &label, cost, false, text).await
            }
            Err(error) => Ok(self.fail(user, &label, error, started.elapsed())),
        }
    }

    fn fail<T>(
        &self,
        user: UserId,
        label: &str,
        error: ProviderError,
        elapsed: Duration,
    ) -> DispatchOutcome<T> {
        self.hooks.on_dispatch_failure(user, label, &error, elapsed);
        self.hooks.on_phase(user, label, DispatchPhase::Failed);
        DispatchOutcome::Failed(error)
    }

    async fn settle<T>(
        &self,
        account: &UserAccount,
        label: &str,
        cost: Cost,
        counts_generation: bool,
        output: T,
    ) -> Result<DispatchOutcome<T>, EngineError> {
        let settled = self
            .accounts
            .mutate(account.id, Some(account), |ledger, stored| {
                let available = stored.balance(cost.currency);
                ledger.charge(stored, cost).map_err(|_| available)?;
                Ok(if counts_generation {
                    ledger.record_generation(stored)
                } else {
                    None
                })
            })
            .await?;

        let (account, due) = match settled {
            Ok(settled) => settled,
            Err(available) => {
                self.hooks
                    .on_settlement_withheld(account.id, label, cost, available);
                self.hooks.on_phase(account.id, label, DispatchPhase::Failed);
                return Ok(DispatchOutcome::Withheld {
                    required: cost,
                    available,
                });
            }
        };

        self.hooks.on_settled(account.id, label, cost);
        self.hooks.on_phase(account.id, label, DispatchPhase::Settled);

        let referral = match due {
            Some(bonus) => self.pay_referral(bonus).await?,
            None => None,
        };

        Ok(DispatchOutcome::Settled(Settlement {
            output,
            account,
            referral,
        }))
    }

    /// Credits the referrer. A referrer without an account forfeits the bonus.
    async fn pay_referral(
        &self,
        bonus: ReferralBonus,
    ) -> Result<Option<ReferralBonus>, EngineError> {
        let paid = self
            .accounts
            .mutate(bonus.referrer, None, |ledger, referrer| {
                ledger.apply_referral_bonus(referrer, &bonus);
                Ok::<_, std::convert::Infallible>(())
            })
            .await;

        match paid {
            Ok(_) => {
                self.hooks.on_referral_bonus(&bonus);
                self.hooks.on_credit(
                    bonus.referrer,
                    bonus.amount,
                    Currency::Credits,
                    CreditSource::Referral,
                );
                Ok(Some(bonus))
            }
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn timed_out(limit: Duration) -> ProviderError {
    ProviderError::timeout(format!("no result within {}s", limit.as_secs()))
}
