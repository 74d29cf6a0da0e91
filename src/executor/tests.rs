//! Unit tests for order placement

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::testing::ScriptedExchange;
    use rust_decimal_macros::dec;

    fn setup(price: Decimal) -> (Arc<ScriptedExchange>, Executor) {
        let exchange = Arc::new(ScriptedExchange::new(price));
        let executor = Executor::new(exchange.clone(), dec!(0.01));
        (exchange, executor)
    }

    #[tokio::test]
    async fn test_open_sizes_by_stake() {
        let (exchange, executor) = setup(dec!(100));
        let entry = executor.open("BTC/USDT", Side::Buy, dec!(50)).await.unwrap();

        assert_eq!(entry.amount, dec!(0.5));
        assert_eq!(entry.avg_price, dec!(100));
        assert_eq!(entry.side, Side::Buy);
        assert!(entry.order_id.is_some());

        let orders = exchange.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Buy);
        assert_eq!(orders[0].quantity, dec!(0.5));
        assert!(!orders[0].reduce_only);
    }

    #[tokio::test]
    async fn test_open_truncates_to_step() {
        let (exchange, executor) = setup(dec!(30));
        let entry = executor.open("BTC/USDT", Side::Sell, dec!(50)).await.unwrap();
        // 50 / 30 = 1.6666...
        assert_eq!(entry.amount, dec!(1.666));
        assert_eq!(exchange.orders()[0].quantity, dec!(1.666));
    }

    #[tokio::test]
    async fn test_open_rejects_stake_below_min_qty() {
        let (exchange, executor) = setup(dec!(64123.45));
        let err = executor.open("BTC/USDT", Side::Sell, dec!(50)).await.unwrap_err();
        assert!(matches!(err, BotError::Execution(_)));
        assert!(exchange.orders().is_empty());
    }

    #[tokio::test]
    async fn test_open_falls_back_when_fill_unreported() {
        let (exchange, executor) = setup(dec!(200));
        exchange.report_fills(false);

        let entry = executor.open("BTC/USDT", Side::Buy, dec!(50)).await.unwrap();
        assert_eq!(entry.amount, dec!(0.25));
        assert_eq!(entry.avg_price, dec!(200));
    }

    #[tokio::test]
    async fn test_open_propagates_rejection() {
        let (exchange, executor) = setup(dec!(100));
        exchange.reject_orders(true);

        let err = executor.open("BTC/USDT", Side::Buy, dec!(50)).await.unwrap_err();
        assert!(matches!(err, BotError::Exchange { code: -2019, .. }));
    }

    #[tokio::test]
    async fn test_close_is_reduce_only_opposite_side() {
        let (exchange, executor) = setup(dec!(100));
        executor.close("BTC/USDT", Side::Sell, dec!(0.5)).await.unwrap();

        let orders = exchange.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Buy);
        assert_eq!(orders[0].quantity, dec!(0.5));
        assert!(orders[0].reduce_only);
    }

    #[tokio::test]
    async fn test_tick_size_fallback() {
        let (exchange, executor) = setup(dec!(100));
        assert_eq!(executor.tick_size("BTC/USDT").await, dec!(0.01));

        exchange.clear_market_info();
        let executor = Executor::new(exchange.clone(), dec!(0.05));
        assert_eq!(executor.tick_size("BTC/USDT").await, dec!(0.05));
    }
}
