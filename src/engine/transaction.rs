//! Per-operation transactional boundary.
//!
//! Staging writes go to copy-on-write scratch positions; external calls and
//! events are queued. Nothing touches committed state until every check has
//! passed. Commit writes the books first, then runs the queued calls, with
//! collateral pulls last. If one of them fails, the calls already made are
//! compensated in reverse and the saved positions are put back, so the
//! operation leaves no trace.
//!
//! A compensation can fail too. The call it should have undone then stays in
//! effect, so its movement is posted back onto the restored books and the
//! error says the rollback was incomplete.

use std::collections::BTreeMap;

use tracing::{debug, error, warn};

use super::core::Engine;
use super::results::EngineError;
use crate::account::{AccountError, AccountingState, UserPosition};
use crate::custody::CollateralCustody;
use crate::events::{
    CollateralDepositedEvent, CollateralRedeemedEvent, EventPayload, StableAssetBurnedEvent, StableAssetMintedEvent,
};
use crate::ledger::{StableAssetLedger, TransferError};
use crate::types::{AssetId, Quantity, Usd, UserId};

/// External side effect, run after the books are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Interaction {
    PullCollateral {
        asset: AssetId,
        from: UserId,
        amount: Quantity,
    },
    // `owner` is the position debited, `to` the wallet credited
    PushCollateral {
        asset: AssetId,
        owner: UserId,
        to: UserId,
        amount: Quantity,
    },
    Mint {
        to: UserId,
        amount: Usd,
    },
    // `from` pays the tokens, `on_behalf_of` has the debt
    Burn {
        from: UserId,
        on_behalf_of: UserId,
        amount: Usd,
    },
}

impl Interaction {
    /// The call that undoes this one.
    fn compensation(&self) -> Interaction {
        match *self {
            Interaction::PullCollateral { asset, from, amount } => Interaction::PushCollateral {
                asset,
                owner: from,
                to: from,
                amount,
            },
            Interaction::PushCollateral { asset, to, amount, .. } => Interaction::PullCollateral { asset, from: to, amount },
            Interaction::Mint { to, amount } => Interaction::Burn {
                from: to,
                on_behalf_of: to,
                amount,
            },
            Interaction::Burn { from, amount, .. } => Interaction::Mint { to: from, amount },
        }
    }

    fn is_pull(&self) -> bool {
        matches!(self, Interaction::PullCollateral { .. })
    }

    /// Apply this call's movement to the books and describe it as an event.
    fn post(&self, accounting: &mut AccountingState) -> Result<EventPayload, AccountError> {
        match *self {
            Interaction::PullCollateral { asset, from, amount } => {
                let mut position = accounting.position(from);
                position.credit_collateral(asset, amount)?;
                accounting.store(from, position);
                Ok(EventPayload::CollateralDeposited(CollateralDepositedEvent {
                    user: from,
                    asset,
                    amount,
                }))
            }
            Interaction::PushCollateral { asset, owner, to, amount } => {
                let mut position = accounting.position(owner);
                position.debit_collateral(asset, amount)?;
                accounting.store(owner, position);
                Ok(EventPayload::CollateralRedeemed(CollateralRedeemedEvent {
                    redeemed_from: owner,
                    redeemed_to: to,
                    asset,
                    amount,
                }))
            }
            Interaction::Mint { to, amount } => {
                let mut position = accounting.position(to);
                position.add_debt(amount)?;
                accounting.store(to, position);
                Ok(EventPayload::StableAssetMinted(StableAssetMintedEvent { user: to, amount }))
            }
            Interaction::Burn {
                from,
                on_behalf_of,
                amount,
            } => {
                let mut position = accounting.position(on_behalf_of);
                position.repay_debt(amount)?;
                accounting.store(on_behalf_of, position);
                Ok(EventPayload::StableAssetBurned(StableAssetBurnedEvent {
                    on_behalf_of,
                    payer: from,
                    amount,
                }))
            }
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct Transaction {
    staged: BTreeMap<UserId, UserPosition>,
    interactions: Vec<Interaction>,
    events: Vec<EventPayload>,
}

impl Transaction {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Current view of `user`: staged if touched in this transaction, committed otherwise.
    pub(super) fn position(&self, accounting: &AccountingState, user: UserId) -> UserPosition {
        match self.staged.get(&user) {
            Some(position) => position.clone(),
            None => accounting.position(user),
        }
    }

    pub(super) fn position_mut(&mut self, accounting: &AccountingState, user: UserId) -> &mut UserPosition {
        self.staged.entry(user).or_insert_with(|| accounting.position(user))
    }

    pub(super) fn interact(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    pub(super) fn emit(&mut self, payload: EventPayload) {
        self.events.push(payload);
    }
}

impl<L: StableAssetLedger, C: CollateralCustody> Engine<L, C> {
    /// Stage with `stage`, then commit. Any error leaves the engine untouched.
    pub(super) fn execute_transaction<T, F>(&mut self, operation: &'static str, stage: F) -> Result<T, EngineError>
    where
        F: FnOnce(&Self, &mut Transaction) -> Result<T, EngineError>,
    {
        let mut tx = Transaction::new();
        let result = stage(self, &mut tx).and_then(|value| self.commit(tx).map(|()| value));
        if let Err(err) = &result {
            warn!(operation, error = %err, "operation rejected");
        }
        result
    }

    fn commit(&mut self, tx: Transaction) -> Result<(), EngineError> {
        let Transaction {
            staged,
            mut interactions,
            events,
        } = tx;

        // a pull's compensation is a push the depositor may refuse
        interactions.sort_by_key(Interaction::is_pull);

        let mut saved = Vec::with_capacity(staged.len());
        for (user, position) in staged {
            let previous = self.accounting.store(user, position);
            saved.push((user, previous));
        }

        let mut executed: Vec<&Interaction> = Vec::with_capacity(interactions.len());
        for interaction in &interactions {
            if let Err(err) = self.perform(interaction) {
                warn!(?interaction, error = %err, "interaction failed, rolling back");
                let stuck = self.unwind(&executed);
                for (user, previous) in saved.into_iter().rev() {
                    self.accounting.restore(user, previous);
                }
                return match stuck.first() {
                    None => Err(EngineError::TransferFailed(err)),
                    Some((_, compensation)) => {
                        let compensation = compensation.clone();
                        self.settle(&stuck);
                        Err(EngineError::CompensationFailed {
                            cause: err,
                            compensation,
                        })
                    }
                };
            }
            executed.push(interaction);
        }

        for payload in events {
            let event = self.events.record(self.current_time, payload);
            debug!(id = event.id.0, payload = ?event.payload, "event");
        }

        Ok(())
    }

    /// Compensate `executed` in reverse. Returns the calls that could not be undone.
    fn unwind(&mut self, executed: &[&Interaction]) -> Vec<(Interaction, TransferError)> {
        let mut stuck = Vec::new();
        for interaction in executed.iter().rev() {
            let compensation = interaction.compensation();
            if let Err(err) = self.perform(&compensation) {
                error!(?compensation, error = %err, "compensation failed");
                stuck.push((**interaction, err));
            }
        }
        stuck
    }

    /// Post calls that stayed in effect onto the books so they match custody and the ledger.
    fn settle(&mut self, stuck: &[(Interaction, TransferError)]) {
        for (interaction, _) in stuck.iter().rev() {
            match interaction.post(&mut self.accounting) {
                Ok(payload) => {
                    let event = self.events.record(self.current_time, payload);
                    debug!(id = event.id.0, payload = ?event.payload, "event");
                }
                Err(err) => error!(?interaction, error = %err, "could not post stranded transfer"),
            }
        }
    }

    fn perform(&mut self, interaction: &Interaction) -> Result<(), TransferError> {
        let minter = self.config.engine_account;
        match *interaction {
            Interaction::PullCollateral { asset, from, amount } => self.custody.pull(asset, from, amount),
            Interaction::PushCollateral { asset, to, amount, .. } => self.custody.push(asset, to, amount),
            Interaction::Mint { to, amount } => self.stable.mint(minter, to, amount),
            Interaction::Burn { from, amount, .. } => self.stable.burn_from(minter, from, amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::math::WAD;
    use crate::price_feed::{MockPriceFeed, SharedOracle};
    use crate::registry::CollateralAsset;
    use std::sync::Arc;

    const WETH: AssetId = AssetId(1);
    const USER: UserId = UserId(1);

    fn engine() -> Engine {
        let eth: SharedOracle = Arc::new(MockPriceFeed::new("ETH / USD", 2000 * 10u128.pow(8), 8));
        Engine::deploy(EngineConfig::default(), vec![CollateralAsset::weth()], vec![eth]).unwrap()
    }

    #[test]
    fn compensation_reverses_direction() {
        let pull = Interaction::PullCollateral {
            asset: AssetId(1),
            from: UserId(2),
            amount: Quantity::new(5),
        };
        assert_eq!(
            pull.compensation(),
            Interaction::PushCollateral {
                asset: AssetId(1),
                owner: UserId(2),
                to: UserId(2),
                amount: Quantity::new(5),
            }
        );
        assert_eq!(pull.compensation().compensation(), pull);

        let mint = Interaction::Mint {
            to: UserId(3),
            amount: Usd::new(7),
        };
        assert_eq!(
            mint.compensation(),
            Interaction::Burn {
                from: UserId(3),
                on_behalf_of: UserId(3),
                amount: Usd::new(7),
            }
        );
        assert_eq!(mint.compensation().compensation(), mint);
    }

    #[test]
    fn staged_reads_shadow_committed() {
        let accounting = AccountingState::new();
        let mut tx = Transaction::new();

        tx.position_mut(&accounting, UserId(1))
            .credit_collateral(AssetId(1), Quantity::new(10))
            .unwrap();

        assert_eq!(tx.position(&accounting, UserId(1)).collateral_of(AssetId(1)), Quantity::new(10));
        assert_eq!(accounting.collateral_balance(UserId(1), AssetId(1)), Quantity::ZERO);
    }

    #[test]
    fn pulls_run_after_other_calls() {
        let mut engine = engine();
        engine.custody_mut().fund(WETH, USER, Quantity::new(10 * WAD));
        engine.custody_mut().block_recipient(USER);
        let engine_account = engine.config().engine_account;
        engine
            .stable_ledger_mut()
            .set_minter(engine_account, UserId(99))
            .unwrap();

        // queued pull first; the mint still runs first and fails before anything moved
        let mut tx = Transaction::new();
        tx.position_mut(&engine.accounting, USER)
            .credit_collateral(WETH, Quantity::new(10 * WAD))
            .unwrap();
        tx.interact(Interaction::PullCollateral {
            asset: WETH,
            from: USER,
            amount: Quantity::new(10 * WAD),
        });
        tx.interact(Interaction::Mint {
            to: USER,
            amount: Usd::new(100 * WAD),
        });

        let err = engine.commit(tx).unwrap_err();
        assert!(matches!(err, EngineError::TransferFailed(TransferError::NotMinter { .. })));
        assert_eq!(engine.custody().balance_of(WETH, USER), Quantity::new(10 * WAD));
        assert_eq!(engine.custody().held(WETH), Quantity::ZERO);
        assert_eq!(engine.collateral_balance_of(USER, WETH), Quantity::ZERO);
    }

    #[test]
    fn failed_compensation_is_reported_and_posted() {
        let mut engine = engine();
        engine.custody_mut().fund(WETH, USER, Quantity::new(10 * WAD));
        engine.custody_mut().block_recipient(USER);

        // second pull overdraws the wallet, and the refund of the first is refused
        let mut tx = Transaction::new();
        tx.position_mut(&engine.accounting, USER)
            .credit_collateral(WETH, Quantity::new(25 * WAD))
            .unwrap();
        tx.interact(Interaction::PullCollateral {
            asset: WETH,
            from: USER,
            amount: Quantity::new(5 * WAD),
        });
        tx.interact(Interaction::PullCollateral {
            asset: WETH,
            from: USER,
            amount: Quantity::new(20 * WAD),
        });
        tx.emit(EventPayload::CollateralDeposited(CollateralDepositedEvent {
            user: USER,
            asset: WETH,
            amount: Quantity::new(25 * WAD),
        }));

        let err = engine.commit(tx).unwrap_err();
        assert!(matches!(
            err,
            EngineError::CompensationFailed {
                cause: TransferError::InsufficientBalance { .. },
                compensation: TransferError::Rejected { .. },
            }
        ));

        assert_eq!(engine.custody().balance_of(WETH, USER), Quantity::new(5 * WAD));
        assert_eq!(engine.custody().held(WETH), Quantity::new(5 * WAD));
        assert_eq!(engine.collateral_balance_of(USER, WETH), Quantity::new(5 * WAD));
        assert_eq!(engine.accounting().total_collateral(WETH), engine.custody().held(WETH));

        let events = engine.recent_events(10);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].payload,
            EventPayload::CollateralDeposited(CollateralDepositedEvent {
                user: USER,
                asset: WETH,
                amount: Quantity::new(5 * WAD),
            })
        );
    }
}
