//! Chain negotiation for EVM wallets
//!
//! Wallets acknowledge a switch request even when the user closes the popup
//! without switching, so a resolved request proves nothing. The negotiator
//! polls the provider's reported chain id until it reaches the target or the
//! window closes.

use polywallet_provider::ChainProvider;
use polywallet_resilience::{await_condition, PollConfig, PollOutcome};
use polywallet_traits::{ChainType, WalletError, WalletResult};
use tracing::{debug, warn};

use crate::chain::{ChainId, ChainRules};

/// Where a negotiation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Nothing inspected yet
    Unchecked,
    /// Reading the current chain
    Checking,
    /// The wallet is already on an accepted chain
    OnTargetChain,
    /// Switch requested, waiting for the chain to change
    Switching,
    /// The wallet is on the requested family
    Confirmed,
    /// The user declined or the switch request failed
    Rejected,
    /// The chain never changed within the window
    TimedOut,
}

/// Result of one negotiation, produced fresh per `enable` / `change_currency`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// No switch was needed
    AlreadyOnChain,
    /// The wallet moved to the target chain
    Switched,
    /// The user declined the switch request
    UserRejected,
    /// The switch was acknowledged but the chain never changed
    TimedOut,
    /// No provider, or the family has no EVM chain
    ProviderMissing,
    /// The switch request failed for another reason
    Failed(String),
}

impl NegotiationOutcome {
    /// Checks if the wallet ended on the requested family
    pub fn is_confirmed(&self) -> bool {
        matches!(self, NegotiationOutcome::AlreadyOnChain | NegotiationOutcome::Switched)
    }

    /// Maps the outcome to the status the host sees.
    ///
    /// A switch that never lands counts as a declined login.
    pub fn into_result(self, rules: &ChainRules) -> WalletResult<()> {
        match self {
            NegotiationOutcome::AlreadyOnChain | NegotiationOutcome::Switched => Ok(()),
            NegotiationOutcome::UserRejected | NegotiationOutcome::TimedOut => {
                Err(WalletError::UserRejectedLogin)
            }
            NegotiationOutcome::ProviderMissing => Err(WalletError::NotFound),
            NegotiationOutcome::Failed(_) => Err(rules.switch_error),
        }
    }
}

fn current_chain(provider: &dyn ChainProvider) -> Option<ChainId> {
    provider.chain_id().and_then(|raw| ChainId::parse(&raw).ok())
}

/// Moves a wallet onto a chain family
#[derive(Debug)]
pub struct ChainNegotiator<'a> {
    rules: &'a ChainRules,
    poll: PollConfig,
    state: NegotiationState,
}

impl<'a> ChainNegotiator<'a> {
    /// Negotiates under `rules`, confirming switches on `poll`
    pub fn new(rules: &'a ChainRules, poll: PollConfig) -> Self {
        Self {
            rules,
            poll,
            state: NegotiationState::Unchecked,
        }
    }

    /// Current state
    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Runs the negotiation to completion
    pub async fn negotiate(
        &mut self,
        provider: Option<&dyn ChainProvider>,
        family: ChainType,
    ) -> NegotiationOutcome {
        self.state = NegotiationState::Checking;

        let (Some(provider), Some(target)) = (provider, self.rules.target(family)) else {
            self.state = NegotiationState::Rejected;
            return NegotiationOutcome::ProviderMissing;
        };

        let current = current_chain(provider);
        if current.is_some_and(|id| self.rules.accepts(family, id)) {
            self.state = NegotiationState::OnTargetChain;
            debug!(chain = ?current, %family, "already on accepted chain");
            self.state = NegotiationState::Confirmed;
            return NegotiationOutcome::AlreadyOnChain;
        }

        let Some((method, params)) = self.rules.switch_request(family) else {
            self.state = NegotiationState::Rejected;
            return NegotiationOutcome::Failed(format!("no switch request for {target}"));
        };

        self.state = NegotiationState::Switching;
        debug!(from = ?current, to = %target, method, "requesting chain switch");
        if let Err(e) = provider.request(method, params).await {
            self.state = NegotiationState::Rejected;
            if e.is_user_rejection() {
                debug!("user declined chain switch");
                return NegotiationOutcome::UserRejected;
            }
            warn!(error = %e, "chain switch request failed");
            return NegotiationOutcome::Failed(e.to_string());
        }

        let outcome = await_condition(self.poll, || async {
            current_chain(provider) == Some(target)
        })
        .await;

        match outcome {
            PollOutcome::Confirmed { attempt } => {
                debug!(to = %target, attempt, "chain switch confirmed");
                self.state = NegotiationState::Confirmed;
                NegotiationOutcome::Switched
            }
            PollOutcome::TimedOut => {
                warn!(to = %target, "chain switch acknowledged but never applied");
                self.state = NegotiationState::TimedOut;
                NegotiationOutcome::TimedOut
            }
        }
    }
}
