//! Solvency invariant tests.
//!
//! These tests verify critical invariants that must hold for the stable asset
//! to remain fully backed under all conditions.

use proptest::prelude::*;
use stable_core::*;
use std::sync::Arc;

const WETH: AssetId = AssetId(1);
const WBTC: AssetId = AssetId(2);

fn feed_answer(price: u128) -> u128 {
    price * 10u128.pow(8)
}

fn setup() -> (Engine, Arc<MockPriceFeed>) {
    let eth = MockPriceFeed::new("ETH / USD", feed_answer(2000), 8).shared();
    let btc = MockPriceFeed::new("BTC / USD", feed_answer(1000), 8).shared();
    let eth_feed: SharedOracle = eth.clone();
    let btc_feed: SharedOracle = btc;
    let engine = Engine::deploy(
        EngineConfig::default(),
        vec![CollateralAsset::weth(), CollateralAsset::wbtc()],
        vec![eth_feed, btc_feed],
    )
    .unwrap();
    (engine, eth)
}

/// Stable supply equals outstanding debt, and custody holds exactly the
/// collateral the books say it does.
fn assert_backed(engine: &Engine) {
    assert_eq!(engine.stable_ledger().total_supply(), engine.accounting().total_debt());
    for asset in [WETH, WBTC] {
        assert_eq!(engine.custody().held(asset), engine.accounting().total_collateral(asset));
    }
}

#[derive(Debug, Clone)]
enum Op {
    Deposit { user: u64, asset: u32, amount: u128 },
    Mint { user: u64, amount: u128 },
    Redeem { user: u64, asset: u32, amount: u128 },
    Burn { user: u64, amount: u128 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let user = 1u64..=4;
    let asset = 1u32..=2;
    prop_oneof![
        (user.clone(), asset.clone(), 1u128..=5 * WAD).prop_map(|(user, asset, amount)| Op::Deposit {
            user,
            asset,
            amount
        }),
        (user.clone(), 1u128..=5_000 * WAD).prop_map(|(user, amount)| Op::Mint { user, amount }),
        (user.clone(), asset, 1u128..=5 * WAD).prop_map(|(user, asset, amount)| Op::Redeem {
            user,
            asset,
            amount
        }),
        (user, 1u128..=5_000 * WAD).prop_map(|(user, amount)| Op::Burn { user, amount }),
    ]
}

fn apply(engine: &mut Engine, op: &Op) -> Result<(), EngineError> {
    match *op {
        Op::Deposit { user, asset, amount } => engine.deposit_collateral(UserId(user), AssetId(asset), Quantity::new(amount)),
        Op::Mint { user, amount } => engine.mint_stable_asset(UserId(user), Usd::new(amount)),
        Op::Redeem { user, asset, amount } => engine.redeem_collateral(UserId(user), AssetId(asset), Quantity::new(amount)),
        Op::Burn { user, amount } => engine.burn_stable_asset(UserId(user), Usd::new(amount)),
    }
}

proptest! {
    /// Any sequence of position operations keeps supply == debt and custody == books,
    /// and no accepted operation leaves a position below the minimum health factor.
    #[test]
    fn books_stay_backed(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let (mut engine, _) = setup();
        for user in 1..=4u64 {
            engine.custody_mut().fund(WETH, UserId(user), Quantity::new(100 * WAD));
            engine.custody_mut().fund(WBTC, UserId(user), Quantity::new(100 * WAD));
        }

        for op in &ops {
            let events_before = engine.events().count();
            let result = apply(&mut engine, op);
            assert_backed(&engine);

            match result {
                Ok(()) => {
                    prop_assert!(engine.events().count() > events_before);
                    for user in 1..=4u64 {
                        prop_assert!(engine.health_factor(UserId(user)).unwrap() >= engine.min_health_factor());
                    }
                }
                Err(_) => prop_assert_eq!(engine.events().count(), events_before),
            }
        }
    }

    /// Rejected operations leave every balance exactly where it was.
    #[test]
    fn rejection_changes_nothing(op in op_strategy()) {
        let (mut engine, _) = setup();
        let user = UserId(1);
        engine.custody_mut().fund(WETH, user, Quantity::new(WAD));
        engine.deposit_collateral_and_mint(user, WETH, Quantity::new(WAD), Usd::new(500 * WAD)).unwrap();

        let position_before = engine.position(user);
        let supply_before = engine.stable_ledger().total_supply();
        let held_before = engine.custody().held(WETH);

        if apply(&mut engine, &op).is_err() {
            prop_assert_eq!(engine.position(user), position_before);
            prop_assert_eq!(engine.stable_ledger().total_supply(), supply_before);
            prop_assert_eq!(engine.custody().held(WETH), held_before);
        }
    }
}

mod atomicity {
    use super::*;

    #[test]
    fn deposit_without_wallet_funds_rolls_back() {
        let (mut engine, _) = setup();
        let user = UserId(1);

        let err = engine.deposit_collateral(user, WETH, Quantity::new(WAD)).unwrap_err();
        assert!(matches!(err, EngineError::TransferFailed(TransferError::InsufficientBalance { .. })));
        assert_eq!(engine.collateral_balance_of(user, WETH), Quantity::ZERO);
        assert_eq!(engine.events().count(), 0);
    }

    #[test]
    fn composite_rolls_back_earlier_transfers() {
        let (mut engine, _) = setup();
        let user = UserId(1);
        engine.custody_mut().fund(WETH, user, Quantity::new(10 * WAD));

        // hand the mint capability away so the mint leg fails
        let engine_account = engine.config().engine_account;
        engine
            .stable_ledger_mut()
            .set_minter(engine_account, UserId(999))
            .unwrap();

        let err = engine
            .deposit_collateral_and_mint(user, WETH, Quantity::new(10 * WAD), Usd::new(100 * WAD))
            .unwrap_err();
        assert!(matches!(err, EngineError::TransferFailed(TransferError::NotMinter { .. })));

        assert_eq!(engine.custody().balance_of(WETH, user), Quantity::new(10 * WAD));
        assert_eq!(engine.custody().held(WETH), Quantity::ZERO);
        assert_eq!(engine.position(user), UserPosition::default());
        assert_eq!(engine.events().count(), 0);
    }

    #[test]
    fn failed_mint_never_takes_collateral_from_refusing_wallet() {
        let (mut engine, _) = setup();
        let user = UserId(1);
        engine.custody_mut().fund(WETH, user, Quantity::new(10 * WAD));
        let engine_account = engine.config().engine_account;
        engine
            .stable_ledger_mut()
            .set_minter(engine_account, UserId(999))
            .unwrap();
        // a refund of pulled collateral would bounce
        engine.custody_mut().block_recipient(user);

        let err = engine
            .deposit_collateral_and_mint(user, WETH, Quantity::new(10 * WAD), Usd::new(100 * WAD))
            .unwrap_err();
        assert!(matches!(err, EngineError::TransferFailed(TransferError::NotMinter { .. })));

        assert_eq!(engine.custody().balance_of(WETH, user), Quantity::new(10 * WAD));
        assert_eq!(engine.custody().held(WETH), Quantity::ZERO);
        assert_eq!(engine.collateral_balance_of(user, WETH), Quantity::ZERO);
        assert_eq!(engine.stable_ledger().total_supply(), Usd::ZERO);
        assert_backed(&engine);
    }

    #[test]
    fn blocked_recipient_rolls_back_redeem() {
        let (mut engine, _) = setup();
        let user = UserId(1);
        engine.custody_mut().fund(WETH, user, Quantity::new(10 * WAD));
        engine.deposit_collateral(user, WETH, Quantity::new(10 * WAD)).unwrap();

        engine.custody_mut().block_recipient(user);
        let err = engine.redeem_collateral(user, WETH, Quantity::new(WAD)).unwrap_err();
        assert!(matches!(err, EngineError::TransferFailed(TransferError::Rejected { .. })));
        assert_eq!(engine.collateral_balance_of(user, WETH), Quantity::new(10 * WAD));

        engine.custody_mut().unblock_recipient(user);
        engine.redeem_collateral(user, WETH, Quantity::new(WAD)).unwrap();
        assert_eq!(engine.collateral_balance_of(user, WETH), Quantity::new(9 * WAD));
        assert_backed(&engine);
    }

    #[test]
    fn burn_without_tokens_rolls_back() {
        let (mut engine, _) = setup();
        let user = UserId(1);
        engine.custody_mut().fund(WETH, user, Quantity::new(10 * WAD));
        engine
            .deposit_collateral_and_mint(user, WETH, Quantity::new(10 * WAD), Usd::new(100 * WAD))
            .unwrap();
        engine
            .stable_ledger_mut()
            .transfer(user, UserId(2), Usd::new(60 * WAD))
            .unwrap();

        let err = engine.burn_stable_asset(user, Usd::new(100 * WAD)).unwrap_err();
        assert!(matches!(err, EngineError::TransferFailed(_)));
        assert_eq!(engine.position(user).debt_minted, Usd::new(100 * WAD));
        assert_backed(&engine);
    }
}

mod liquidation_solvency {
    use super::*;

    #[test]
    fn healthy_target_is_untouched() {
        let (mut engine, _) = setup();
        let user = UserId(1);
        let liquidator = UserId(2);
        engine.custody_mut().fund(WETH, user, Quantity::new(10 * WAD));
        engine
            .deposit_collateral_and_mint(user, WETH, Quantity::new(10 * WAD), Usd::new(100 * WAD))
            .unwrap();
        let events_before = engine.events().count();

        let err = engine.liquidate(liquidator, user, WETH, Usd::new(100 * WAD)).unwrap_err();
        assert_eq!(err, EngineError::HealthFactorOk(HealthFactor::new(100 * WAD)));
        assert_eq!(engine.position(user).debt_minted, Usd::new(100 * WAD));
        assert_eq!(engine.events().count(), events_before);
    }

    #[test]
    fn zero_cover_rejected() {
        let (mut engine, _) = setup();
        let err = engine.liquidate(UserId(2), UserId(1), WETH, Usd::ZERO).unwrap_err();
        assert_eq!(err, EngineError::ZeroAmount);
    }

    #[test]
    fn cover_beyond_debt_rejected() {
        let (mut engine, eth) = setup();
        let user = UserId(1);
        let liquidator = UserId(2);
        engine.custody_mut().fund(WETH, user, Quantity::new(10 * WAD));
        engine.custody_mut().fund(WBTC, liquidator, Quantity::new(100 * WAD));
        engine
            .deposit_collateral_and_mint(user, WETH, Quantity::new(10 * WAD), Usd::new(100 * WAD))
            .unwrap();
        engine
            .deposit_collateral_and_mint(liquidator, WBTC, Quantity::new(100 * WAD), Usd::new(1_000 * WAD))
            .unwrap();
        eth.update_answer(feed_answer(18));

        let err = engine.liquidate(liquidator, user, WETH, Usd::new(101 * WAD)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientDebt { .. }));
        assert_backed(&engine);
    }

    #[test]
    fn unhealthy_liquidator_rejected() {
        let (mut engine, eth) = setup();
        let user = UserId(1);
        let liquidator = UserId(2);
        engine.custody_mut().fund(WETH, user, Quantity::new(10 * WAD));
        engine.custody_mut().fund(WETH, liquidator, Quantity::new(WAD));
        engine
            .deposit_collateral_and_mint(user, WETH, Quantity::new(10 * WAD), Usd::new(100 * WAD))
            .unwrap();
        engine
            .deposit_collateral_and_mint(liquidator, WETH, Quantity::new(WAD), Usd::new(100 * WAD))
            .unwrap();

        // both positions go underwater together
        eth.update_answer(feed_answer(18));
        let err = engine.liquidate(liquidator, user, WETH, Usd::new(100 * WAD)).unwrap_err();
        assert!(matches!(err, EngineError::HealthFactorBroken(_)));
        assert_eq!(engine.position(user).debt_minted, Usd::new(100 * WAD));
        assert_eq!(engine.custody().balance_of(WETH, liquidator), Quantity::ZERO);
        assert_backed(&engine);
    }

    #[test]
    fn partial_cover_must_improve() {
        let (mut engine, eth) = setup();
        let user = UserId(1);
        let liquidator = UserId(2);
        engine.custody_mut().fund(WETH, user, Quantity::new(10 * WAD));
        engine.custody_mut().fund(WBTC, liquidator, Quantity::new(100 * WAD));
        engine
            .deposit_collateral_and_mint(user, WETH, Quantity::new(10 * WAD), Usd::new(100 * WAD))
            .unwrap();
        engine
            .deposit_collateral_and_mint(liquidator, WBTC, Quantity::new(100 * WAD), Usd::new(1_000 * WAD))
            .unwrap();

        // $10 ETH: hf 0.5. seizing 110% of the cover only drags it lower
        eth.update_answer(feed_answer(10));
        let err = engine.liquidate(liquidator, user, WETH, Usd::new(50 * WAD)).unwrap_err();
        assert!(matches!(err, EngineError::HealthFactorNotImproved { .. }));

        // $18 ETH: hf 0.9. covering half improves it
        eth.update_answer(feed_answer(18));
        let result = engine.liquidate(liquidator, user, WETH, Usd::new(50 * WAD)).unwrap();
        assert!(result.health_factor_after > result.health_factor_before);
        assert_backed(&engine);
    }
}
