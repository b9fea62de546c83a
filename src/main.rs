//! Stable-asset engine simulation.
//!
//! Walks the engine lifecycle: collateral deposits, minting, a price crash,
//! liquidation, repayment and redemption, and a multi-user crash sweep.

use rust_decimal_macros::dec;
use stable_core::*;
use std::sync::Arc;

const WETH: AssetId = AssetId(1);
const WBTC: AssetId = AssetId(2);
const FEED_DECIMALS: u32 = 8;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "stable_core=info".into()),
        )
        .init();

    println!("Stable-Asset Engine Simulation");
    println!("WETH / WBTC collateral, 200% collateralization, 10% liquidation bonus\n");

    scenario_1_deposit_and_mint();
    scenario_2_price_crash();
    scenario_3_liquidation();
    scenario_4_redeem_for_burn();
    scenario_5_multi_user_crash();

    println!("\nAll simulations completed successfully.");
}

/// Fresh engine with ETH at $2000 and BTC at $1000. returns the ETH feed so
/// scenarios can move the price.
fn setup() -> (Engine, Arc<MockPriceFeed>) {
    let eth = MockPriceFeed::from_decimal("ETH / USD", dec!(2000), FEED_DECIMALS)
        .unwrap()
        .shared();
    let btc = MockPriceFeed::from_decimal("BTC / USD", dec!(1000), FEED_DECIMALS)
        .unwrap()
        .shared();
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

fn eth(amount: rust_decimal::Decimal) -> Quantity {
    Quantity::from_decimal(amount, WAD_DECIMALS).unwrap()
}

fn usd(amount: rust_decimal::Decimal) -> Usd {
    Usd::from_decimal(amount).unwrap()
}

fn show_position(engine: &Engine, label: &str, user: UserId) {
    let info = engine.account_information(user).unwrap();
    println!(
        "  {}: collateral {}, debt {}, health factor {}",
        label,
        info.collateral_value_usd,
        info.debt_minted,
        engine.health_factor(user).unwrap()
    );
}

fn scenario_1_deposit_and_mint() {
    println!("Scenario 1: Deposit and Mint\n");

    let (mut engine, _) = setup();
    let alice = UserId(1);
    engine.custody_mut().fund(WETH, alice, eth(dec!(10)));
    engine.custody_mut().fund(WBTC, alice, eth(dec!(5)));

    engine.deposit_collateral(alice, WETH, eth(dec!(10))).unwrap();
    engine.deposit_collateral(alice, WBTC, eth(dec!(5))).unwrap();
    println!("  Alice deposits 10 WETH and 5 WBTC");

    engine.mint_stable_asset(alice, usd(dec!(5000))).unwrap();
    println!("  Alice mints $5,000");
    show_position(&engine, "Alice", alice);

    let max_extra = usd(dec!(7500));
    match engine.mint_stable_asset(alice, max_extra.checked_add(usd(dec!(1))).unwrap()) {
        Ok(()) => println!("  unexpected: over-mint accepted"),
        Err(e) => println!("  Minting another $7,501 rejected: {}", e),
    }
    engine.mint_stable_asset(alice, max_extra).unwrap();
    println!("  Minting exactly $7,500 more brings the position to the floor");
    show_position(&engine, "Alice", alice);
    println!("  Stable supply: {}\n", engine.stable_ledger().total_supply());
}

fn scenario_2_price_crash() {
    println!("Scenario 2: Price Crash\n");

    let (mut engine, eth_feed) = setup();
    let bob = UserId(2);
    engine.custody_mut().fund(WETH, bob, eth(dec!(10)));
    engine
        .deposit_collateral_and_mint(bob, WETH, eth(dec!(10)), usd(dec!(100)))
        .unwrap();
    show_position(&engine, "Bob @ $2000", bob);

    for price in [dec!(200), dec!(20), dec!(18)] {
        eth_feed.update_decimal(price);
        let status = engine.status(bob).unwrap();
        println!(
            "  ETH @ ${}: health factor {}, liquidatable {}",
            price,
            status.health_factor(),
            status.is_liquidatable()
        );
    }
    println!();
}

fn scenario_3_liquidation() {
    println!("Scenario 3: Liquidation\n");

    let (mut engine, eth_feed) = setup();
    let user = UserId(1);
    let liquidator = UserId(2);
    engine.custody_mut().fund(WETH, user, eth(dec!(10)));
    engine.custody_mut().fund(WETH, liquidator, eth(dec!(20)));

    engine
        .deposit_collateral_and_mint(user, WETH, eth(dec!(10)), usd(dec!(100)))
        .unwrap();
    engine
        .deposit_collateral_and_mint(liquidator, WETH, eth(dec!(20)), usd(dec!(100)))
        .unwrap();

    eth_feed.update_decimal(dec!(18));
    println!("  ETH crashes to $18");
    show_position(&engine, "User", user);

    let quote = quote_liquidation(&engine.valuation(), WETH, usd(dec!(100)), &engine.config().risk).unwrap();
    println!(
        "  Quote for $100: seize {} + bonus {} = {} wei",
        quote.collateral_seized, quote.bonus, quote.total_seized
    );

    let result = engine.liquidate(liquidator, user, WETH, usd(dec!(100))).unwrap();
    println!(
        "  Liquidated: health factor {} -> {}",
        result.health_factor_before, result.health_factor_after
    );
    println!(
        "  Liquidator WETH wallet: {}",
        engine
            .custody()
            .balance_of(WETH, liquidator)
            .to_decimal(WAD_DECIMALS)
            .unwrap_or_default()
    );
    show_position(&engine, "User", user);
    show_position(&engine, "Liquidator", liquidator);
    println!();
}

fn scenario_4_redeem_for_burn() {
    println!("Scenario 4: Redeem for Burn\n");

    let (mut engine, _) = setup();
    let carol = UserId(3);
    engine.custody_mut().fund(WETH, carol, eth(dec!(10)));
    engine
        .deposit_collateral_and_mint(carol, WETH, eth(dec!(10)), usd(dec!(100)))
        .unwrap();

    match engine.redeem_collateral(carol, WETH, eth(dec!(10))) {
        Ok(()) => println!("  unexpected: redeem with open debt accepted"),
        Err(e) => println!("  Redeeming everything with debt open: {}", e),
    }

    engine
        .redeem_collateral_for_stable(carol, WETH, eth(dec!(10)), usd(dec!(100)))
        .unwrap();
    println!("  Burn $100 and redeem 10 WETH in one step");
    show_position(&engine, "Carol", carol);
    println!(
        "  Carol WETH wallet: {}, stable balance: {}\n",
        engine
            .custody()
            .balance_of(WETH, carol)
            .to_decimal(WAD_DECIMALS)
            .unwrap_or_default(),
        engine.stable_ledger().balance_of(carol)
    );
}

fn scenario_5_multi_user_crash() {
    println!("Scenario 5: Multi-User Crash\n");

    let (mut engine, eth_feed) = setup();
    let keeper = UserId(100);
    engine.custody_mut().fund(WBTC, keeper, eth(dec!(1000)));
    engine
        .deposit_collateral_and_mint(keeper, WBTC, eth(dec!(1000)), usd(dec!(50000)))
        .unwrap();

    // 1 WETH each, increasingly aggressive debt
    for i in 1..=10u64 {
        let user = UserId(i);
        engine.custody_mut().fund(WETH, user, eth(dec!(1)));
        let debt = usd(rust_decimal::Decimal::from(i * 90));
        engine.deposit_collateral_and_mint(user, WETH, eth(dec!(1)), debt).unwrap();
    }
    println!("  10 users with 1 WETH each, debt $90..$900");

    eth_feed.update_decimal(dec!(1000));
    let underwater = engine.liquidatable_users();
    println!("  ETH drops to $1000: {} positions liquidatable", underwater.len());

    let mut liquidated = 0;
    for (user, _) in underwater {
        let debt = engine.position(user).debt_minted;
        match engine.liquidate(keeper, user, WETH, debt) {
            Ok(result) => {
                liquidated += 1;
                println!(
                    "    {}: covered {}, health factor {} -> {}",
                    user, result.debt_covered, result.health_factor_before, result.health_factor_after
                );
            }
            Err(e) => println!("    {}: {}", user, e),
        }
    }

    println!("  Liquidated {} positions", liquidated);
    show_position(&engine, "Keeper", keeper);
    println!("  Stable supply: {}", engine.stable_ledger().total_supply());
}
