//! Token Merger - Duplicate Reconciliation Across Sources
//!
//! The same logical asset may appear once per upstream source under a
//! shared address. Reconciliation keeps the freshest price, the highest
//! liquidity, the summed volume, and the union of source labels, while
//! passthrough attributes are overwritten in input order.

use std::collections::HashMap;

use tracing::debug;

use super::token::Token;

/// Merge duplicate tokens (by address) from multiple sources into
/// exactly one record per unique address.
///
/// Input order is preserved twice over: the output keeps first-seen
/// address order, and passthrough attributes are overwritten by the
/// most recently merged record, so the result is deterministic for a
/// given input sequence.
pub fn merge_tokens(tokens: Vec<Token>) -> Vec<Token> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(tokens.len());
    let mut merged: Vec<Token> = Vec::with_capacity(tokens.len());

    for token in tokens {
        match index.get(&token.address) {
            None => {
                index.insert(token.address.clone(), merged.len());
                merged.push(token);
            }
            Some(&slot) => {
                let existing = &mut merged[slot];
                debug!(
                    address = %token.address,
                    existing_sources = ?existing.sources,
                    incoming_sources = ?token.sources,
                    "Merging duplicate token with combined volume"
                );

                // Latest price wins; the existing record wins ties.
                if token.updated_at > existing.updated_at {
                    existing.price = token.price;
                }
                existing.updated_at = existing.updated_at.max(token.updated_at);
                existing.liquidity = existing.liquidity.max(token.liquidity);
                existing.volume += token.volume;

                for label in token.sources {
                    if !existing.sources.contains(&label) {
                        existing.sources.push(label);
                    }
                }

                // Passthrough attributes: incoming record overwrites.
                for (key, value) in token.extra {
                    existing.extra.insert(key, value);
                }
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(address: &str, price: f64, liquidity: f64, volume: f64, updated_at: i64) -> Token {
        Token {
            price,
            liquidity,
            volume,
            updated_at,
            ..Token::new(address)
        }
    }

    #[test]
    fn test_unique_single_source_set_is_a_noop() {
        let input = vec![
            token("a", 1.0, 10.0, 100.0, 1),
            token("b", 2.0, 20.0, 200.0, 2),
        ];
        let merged = merge_tokens(input.clone());
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].address, "a");
        assert_eq!(merged[1].address, "b");
        assert!((merged[0].volume - 100.0).abs() < f64::EPSILON);
        assert!((merged[1].price - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_duplicate_reconciliation_rules() {
        // t1 < t2: merged price comes from the fresher record,
        // liquidity is the max, volume the sum, updated_at the max.
        let older = token("mint1", 1.0, 500.0, 100.0, 1_000);
        let newer = token("mint1", 2.5, 300.0, 50.0, 2_000);

        let merged = merge_tokens(vec![older, newer]);
        assert_eq!(merged.len(), 1);
        let t = &merged[0];
        assert!((t.price - 2.5).abs() < f64::EPSILON);
        assert!((t.liquidity - 500.0).abs() < f64::EPSILON);
        assert!((t.volume - 150.0).abs() < f64::EPSILON);
        assert_eq!(t.updated_at, 2_000);
    }

    #[test]
    fn test_existing_price_wins_on_updated_at_tie() {
        let first = token("mint1", 1.0, 0.0, 0.0, 1_000);
        let second = token("mint1", 9.0, 0.0, 0.0, 1_000);

        let merged = merge_tokens(vec![first, second]);
        assert!((merged[0].price - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sources_union_in_first_seen_order() {
        let mut a = token("mint1", 1.0, 0.0, 0.0, 1);
        a.sources = vec!["DexScreener".to_string()];
        let mut b = token("mint1", 1.0, 0.0, 0.0, 2);
        b.sources = vec!["GeckoTerminal".to_string()];
        let mut c = token("mint1", 1.0, 0.0, 0.0, 3);
        c.sources = vec!["DexScreener".to_string()];

        let merged = merge_tokens(vec![a, b, c]);
        assert_eq!(merged[0].sources, vec!["DexScreener", "GeckoTerminal"]);
    }

    #[test]
    fn test_passthrough_attributes_overwritten_in_input_order() {
        let mut a = token("mint1", 1.0, 0.0, 0.0, 1);
        a.extra.insert("name".to_string(), json!("Old Name"));
        a.extra.insert("decimals".to_string(), json!(9));
        let mut b = token("mint1", 1.0, 0.0, 0.0, 2);
        b.extra.insert("name".to_string(), json!("New Name"));

        let merged = merge_tokens(vec![a, b]);
        let extra = &merged[0].extra;
        assert_eq!(extra.get("name"), Some(&json!("New Name")));
        // Untouched attributes from the first record survive.
        assert_eq!(extra.get("decimals"), Some(&json!(9)));
    }

    #[test]
    fn test_output_preserves_first_seen_address_order() {
        let merged = merge_tokens(vec![
            token("c", 1.0, 0.0, 0.0, 1),
            token("a", 1.0, 0.0, 0.0, 1),
            token("c", 1.0, 0.0, 0.0, 2),
            token("b", 1.0, 0.0, 0.0, 1),
        ]);
        let order: Vec<&str> = merged.iter().map(|t| t.address.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }
}
