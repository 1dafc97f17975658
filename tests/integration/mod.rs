//! End-to-end tests of the scan loop against the paper gateway.
//!
//! Nothing here touches the network: markets are seeded into the simulator.

use std::sync::Arc;
use std::time::Duration;

use polymarket_spread_arb::bot::{ArbitrageBot, CycleOutcome, StatsSnapshot};
use polymarket_spread_arb::config::Config;
use polymarket_spread_arb::market::{Market, MarketGateway, Outcome, PaperTradingClient, SimulatedFaults};
use polymarket_spread_arb::trading::{JsonlTradeLog, OrderStatus, TradeLog};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::watch;

fn paper_config() -> Config {
    Config {
        paper_trading: true,
        ..Config::default()
    }
}

fn paper_gateway(balance: Decimal, markets: Vec<Market>) -> Arc<PaperTradingClient> {
    Arc::new(PaperTradingClient::new(balance).with_markets(markets))
}

fn assert_close(actual: Decimal, expected: Decimal) {
    assert!(
        (actual - expected).abs() < dec!(0.000001),
        "expected {} got {}",
        expected,
        actual
    );
}

#[tokio::test]
async fn paper_cycle_executes_hedged_pair() {
    let paper = paper_gateway(
        dec!(10000),
        vec![Market::new("m1", "Will it rain tomorrow?", dec!(0.50), dec!(0.44))],
    );
    let mut bot = ArbitrageBot::new(paper.clone(), &paper_config());

    let outcome = bot.run_cycle().await.unwrap();

    let CycleOutcome::Scanned { opportunities, trade } = outcome else {
        panic!("expected a scan");
    };
    assert_eq!(opportunities, 1);

    let record = trade.expect("trade executed");
    assert_eq!(record.market_id, "m1");
    assert_eq!(record.position_size, dec!(1000));
    assert_eq!(record.profit_margin, dec!(0.0412));
    assert_eq!(record.expected_profit, dec!(41.2));
    assert_eq!(record.yes_order_id, "paper_order_1");
    assert_eq!(record.no_order_id, "paper_order_2");

    let stats = bot.statistics();
    assert_eq!(stats.scans, 1);
    assert_eq!(stats.trades_executed, 1);
    assert_eq!(stats.total_expected_profit, dec!(41.2));
    assert_eq!(bot.trade_history().len(), 1);

    // 1000 / 0.94 shares per leg at 0.51 and 0.4488 limit prices
    assert_close(paper.balance(), dec!(8980));

    let positions = paper.market_positions("m1");
    assert!(positions.is_hedged());
    assert_eq!(positions.yes_shares, record.shares);
}

#[tokio::test]
async fn paper_resolution_pays_out_hedged_pair() {
    let paper = paper_gateway(
        dec!(10000),
        vec![Market::new("m1", "q", dec!(0.50), dec!(0.44))],
    );
    let mut bot = ArbitrageBot::new(paper.clone(), &paper_config());
    bot.run_cycle().await.unwrap();

    let settlement = paper
        .simulate_market_resolution("m1", Outcome::No)
        .expect("positions to settle");

    assert_close(settlement.cost, dec!(1020));
    assert!(settlement.profit > Decimal::ZERO);
    assert!(paper.positions().is_empty());

    let stats = paper.statistics();
    assert_eq!(stats.completed_trades, 1);
    assert!(stats.current_balance > dec!(10000));
}

#[tokio::test]
async fn pair_above_cost_limit_is_not_traded() {
    // 0.98 + 2% fees = 0.9996, above the 0.99 limit
    let paper = paper_gateway(
        dec!(10000),
        vec![Market::new("m1", "q", dec!(0.52), dec!(0.46))],
    );
    let mut bot = ArbitrageBot::new(paper.clone(), &paper_config());

    let outcome = bot.run_cycle().await.unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Scanned {
            opportunities: 0,
            trade: None
        }
    );
    assert!(paper.orders().is_empty());
    assert_eq!(paper.balance(), dec!(10000));
}

#[tokio::test]
async fn rejected_leg_is_compensated() {
    let paper = paper_gateway(
        dec!(10000),
        vec![Market::new("m1", "q", dec!(0.50), dec!(0.44))],
    );
    paper.set_faults(SimulatedFaults {
        reject_orders_for: Some(Outcome::No),
        ..SimulatedFaults::default()
    });
    let mut bot = ArbitrageBot::new(paper.clone(), &paper_config());

    let outcome = bot.run_cycle().await.unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Scanned {
            opportunities: 1,
            trade: None
        }
    );
    assert_eq!(bot.statistics().trades_executed, 0);
    assert!(bot.trade_history().is_empty());

    let orders = paper.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].outcome, Outcome::Yes);
    assert_eq!(orders[0].status, OrderStatus::Canceled);
    assert_eq!(paper.balance(), dec!(10000));
}

#[tokio::test]
async fn balance_below_minimum_ticket_skips_trade() {
    let paper = paper_gateway(dec!(50), vec![Market::new("m1", "q", dec!(0.50), dec!(0.44))]);
    let mut bot = ArbitrageBot::new(paper.clone(), &paper_config());

    let outcome = bot.run_cycle().await.unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Scanned {
            opportunities: 1,
            trade: None
        }
    );
    assert_eq!(bot.statistics().opportunities_found, 1);
    assert!(paper.orders().is_empty());
    assert_eq!(paper.balance(), dec!(50));
}

#[tokio::test]
async fn executed_trades_are_appended_to_trade_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trades.jsonl");

    let paper = paper_gateway(
        dec!(10000),
        vec![Market::new("m1", "q", dec!(0.50), dec!(0.44))],
    );
    let log = Arc::new(JsonlTradeLog::open(&path).await.unwrap());
    let mut bot = ArbitrageBot::new(paper.clone(), &paper_config()).with_trade_log(log.clone());

    bot.run_cycle().await.unwrap();

    let records = JsonlTradeLog::read_records(&path).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0], bot.trade_history()[0]);

    // a reopened log refuses the same order pair
    let reopened = JsonlTradeLog::open(&path).await.unwrap();
    assert!(!reopened.append(&records[0]).await.unwrap());
    assert_eq!(JsonlTradeLog::read_records(&path).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_loop_and_publishes_final_snapshot() {
    let paper = paper_gateway(
        dec!(10000),
        vec![Market::new("m1", "q", dec!(0.50), dec!(0.44))],
    );
    let (stats_tx, stats_rx) = watch::channel(StatsSnapshot::initial(true));
    let mut bot = ArbitrageBot::new(paper.clone(), &paper_config()).with_stats_publisher(stats_tx);
    let (tx, rx) = watch::channel(false);

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        tx.send(true).ok();
        tx
    });

    let snapshot = bot.run(rx).await;
    let _tx = stopper.await.unwrap();

    assert!(!snapshot.running);
    assert!(snapshot.scans >= 2);
    assert!(snapshot.trades_executed >= 1);
    assert_eq!(*stats_rx.borrow(), snapshot);

    let paper_stats = snapshot.paper.expect("paper statistics");
    assert_eq!(paper_stats.current_balance, paper.balance());
    assert_eq!(paper.name(), "paper");
}
