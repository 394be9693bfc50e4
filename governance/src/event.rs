//! Events emitted by committed governance operations.

use crate::proposal::ProposalStatus;
use dao_types::{Address, Choice, GovernanceParams, ProposalId, Timestamp, TokenAmount, VotingMode, Wei};
use serde::{Deserialize, Serialize};

/// Governance-level events that indexers can subscribe to via the [`EventBus`].
///
/// Events are only delivered after the operation that produced them has
/// committed; a failed operation emits nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaoEvent {
    ProposalCreated {
        id: ProposalId,
        creator: Address,
    },
    Voted {
        id: ProposalId,
        voter: Address,
        choice: Choice,
        voting_power: u128,
    },
    ProposalFinalized {
        id: ProposalId,
        status: ProposalStatus,
    },
    VoteStaked {
        holder: Address,
        id: ProposalId,
        amount: TokenAmount,
        unlock_at: Timestamp,
    },
    VoteUnstaked {
        holder: Address,
        id: ProposalId,
        amount: TokenAmount,
    },
    ProposalStaked {
        holder: Address,
        id: ProposalId,
        amount: TokenAmount,
        unlock_at: Timestamp,
    },
    ProposalUnstaked {
        holder: Address,
        id: ProposalId,
        amount: TokenAmount,
    },
    VoteDelegated {
        id: ProposalId,
        from: Address,
        to: Address,
        amount: TokenAmount,
    },
    VoteDelegationRevoked {
        id: ProposalId,
        from: Address,
        to: Address,
    },
    PanicTriggered,
    TranquilityRestored,
    ParamsUpdated(GovernanceParams),
    VotingModeToggled(VotingMode),
    OwnerChanged {
        previous: Address,
        new: Address,
    },
    PanicWalletSet(Address),
    StakingChanged(Address),
    DelegationContractChanged(Address),
    TokenContractChanged(Address),
    TokensPurchased {
        buyer: Address,
        wei: Wei,
        tokens: TokenAmount,
    },
    TokensMinted(TokenAmount),
}

pub type Listener = Box<dyn Fn(&DaoEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners run inline on the committing thread while the writer lock is
/// held; keep handlers fast.
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &DaoEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    #[test]
    fn test_emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&DaoEvent::PanicTriggered);
        assert_eq!(counter.load(Ordering::SeqCst), 11);
        assert_eq!(bus.listener_count(), 2);
    }

    #[test]
    fn test_emit_with_no_listeners_is_noop() {
        let bus = EventBus::default();
        bus.emit(&DaoEvent::TranquilityRestored);
    }

    #[test]
    fn test_listener_receives_payload() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        let sink = Arc::clone(&seen);
        bus.subscribe(Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
        }));

        let event = DaoEvent::ProposalCreated {
            id: 7,
            creator: Address::from_low_u64(3),
        };
        bus.emit(&event);
        assert_eq!(*seen.lock().unwrap(), vec![event]);
    }
}
