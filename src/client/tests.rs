//! Unit tests for exchange clients

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::testing::ScriptedExchange;
    use crate::types::{OrderRequest, Side};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const DOC_SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";

    #[test]
    fn test_sign_matches_reference_vector() {
        let signer = RequestSigner::new("key", DOC_SECRET, 5000).unwrap();
        let payload = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            signer.sign(payload).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_signed_query_layout() {
        let signer = RequestSigner::new("key", DOC_SECRET, 5000).unwrap();
        let params = [
            ("symbol", "LTCBTC".to_string()),
            ("side", "BUY".to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", "GTC".to_string()),
            ("quantity", "1".to_string()),
            ("price", "0.1".to_string()),
        ];

        let query = signer.signed_query(&params, 1499827319559).unwrap();
        assert_eq!(
            query,
            "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559\
             &signature=c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_signer_requires_credentials() {
        assert!(RequestSigner::new("", "secret", 5000).is_err());
        assert!(RequestSigner::new("key", "", 5000).is_err());
    }

    #[test]
    fn test_signer_debug_masks_key() {
        let signer = RequestSigner::new("abcdefghijklmnop", "secret", 5000).unwrap();
        let debug = format!("{:?}", signer);
        assert!(debug.contains("abcd***mnop"));
        assert!(!debug.contains("secret"));
    }

    #[tokio::test]
    async fn test_paper_fills_at_ticker_price() {
        let market = Arc::new(ScriptedExchange::new(dec!(101.5)));
        let paper = PaperExchange::new(market.clone());

        let fill = paper
            .create_market_order(&OrderRequest {
                symbol: "BTC/USDT".into(),
                side: Side::Buy,
                quantity: dec!(0.5),
                reduce_only: false,
            })
            .await
            .unwrap();

        assert_eq!(fill.filled, dec!(0.5));
        assert_eq!(fill.average, dec!(101.5));
        assert!(fill.order_id.is_some());
        assert_eq!(paper.position("BTC/USDT"), dec!(0.5));
        // simulated, never forwarded
        assert!(market.orders().is_empty());
    }

    #[tokio::test]
    async fn test_paper_reduce_only_caps_at_position() {
        let market = Arc::new(ScriptedExchange::new(dec!(100)));
        let paper = PaperExchange::new(market);

        paper
            .create_market_order(&OrderRequest {
                symbol: "BTC/USDT".into(),
                side: Side::Sell,
                quantity: dec!(0.3),
                reduce_only: false,
            })
            .await
            .unwrap();

        let close = paper
            .create_market_order(&OrderRequest {
                symbol: "BTC/USDT".into(),
                side: Side::Buy,
                quantity: dec!(1),
                reduce_only: true,
            })
            .await
            .unwrap();

        assert_eq!(close.filled, dec!(0.3));
        assert_eq!(paper.position("BTC/USDT"), dec!(0));
        assert_eq!(paper.fills().len(), 2);
    }

    #[tokio::test]
    async fn test_paper_leverage_is_local() {
        let market = Arc::new(ScriptedExchange::new(dec!(100)));
        let paper = PaperExchange::new(market.clone());
        paper.set_leverage("BTC/USDT", 5).await.unwrap();
        assert_eq!(market.leverage_calls(), 0);
    }
}
