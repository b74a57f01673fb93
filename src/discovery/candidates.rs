//! Candidate trading pairs derived from account balances.

use std::collections::{BTreeSet, HashSet};

/// Quote assets tried for every balance, most common first.
pub const QUOTE_ASSETS: &[&str] = &["USDT", "BUSD", "BTC", "ETH", "BNB", "USDC"];

/// Pairs every asset with every quote asset.
///
/// All `{asset}USDT` pairs come first, then the remaining quotes in
/// [`QUOTE_ASSETS`] order. An asset is never paired with itself. The output
/// is deduplicated (first occurrence wins) and skips anything in `known`.
pub fn generate_candidates(assets: &[String], known: &BTreeSet<String>) -> Vec<String> {
    let (primary, others) = (QUOTE_ASSETS[0], &QUOTE_ASSETS[1..]);

    let usdt_pairs = assets
        .iter()
        .filter(move |asset| asset.as_str() != primary)
        .map(move |asset| format!("{}{}", asset, primary));

    let other_pairs = assets.iter().flat_map(|asset| {
        others
            .iter()
            .filter(move |quote| asset.as_str() != **quote)
            .map(move |quote| format!("{}{}", asset, quote))
    });

    let mut seen = HashSet::new();
    usdt_pairs
        .chain(other_pairs)
        .filter(|symbol| !known.contains(symbol))
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_non_quote_assets_get_all_six_quotes() {
        let candidates = generate_candidates(&assets(&["SOL", "ADA"]), &BTreeSet::new());

        assert_eq!(candidates.len(), 12);
        assert_eq!(&candidates[..2], &["SOLUSDT", "ADAUSDT"]);
        assert_eq!(
            &candidates[2..7],
            &["SOLBUSD", "SOLBTC", "SOLETH", "SOLBNB", "SOLUSDC"]
        );
    }

    #[test]
    fn test_quote_assets_are_not_paired_with_themselves() {
        let candidates = generate_candidates(&assets(&["ETH", "BNB"]), &BTreeSet::new());

        assert_eq!(
            candidates,
            vec![
                "ETHUSDT", "BNBUSDT", "ETHBUSD", "ETHBTC", "ETHBNB", "ETHUSDC", "BNBBUSD",
                "BNBBTC", "BNBETH", "BNBUSDC",
            ]
        );
    }

    #[test]
    fn test_usdt_balance_only_pairs_with_other_quotes() {
        let candidates = generate_candidates(&assets(&["USDT"]), &BTreeSet::new());
        assert_eq!(
            candidates,
            vec!["USDTBUSD", "USDTBTC", "USDTETH", "USDTBNB", "USDTUSDC"]
        );
    }

    #[test]
    fn test_duplicates_and_known_symbols_are_removed() {
        let known: BTreeSet<String> = ["SOLUSDT".to_string()].into_iter().collect();
        let candidates = generate_candidates(&assets(&["SOL", "SOL"]), &known);

        assert_eq!(candidates.len(), 5);
        assert!(!candidates.contains(&"SOLUSDT".to_string()));

        let unique: HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
    }

    #[test]
    fn test_no_assets_no_candidates() {
        assert!(generate_candidates(&[], &BTreeSet::new()).is_empty());
    }
}
