//! Label-selector construction: deterministic regardless of insertion order.

use std::collections::BTreeMap;

/// Builds a canonical `k1=v1,k2=v2` selector string with keys sorted
/// lexicographically. `BTreeMap` already iterates in key order, so any caller that
/// builds one from an unordered map gets the same string back every time.
pub fn build_label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_labels_yield_empty_selector() {
        assert_eq!(build_label_selector(&BTreeMap::new()), "");
    }

    #[test]
    fn sorts_keys_lexicographically() {
        let mut labels = BTreeMap::new();
        labels.insert("zeta".to_string(), "1".to_string());
        labels.insert("alpha".to_string(), "2".to_string());
        assert_eq!(build_label_selector(&labels), "alpha=2,zeta=1");
    }

    #[test]
    fn same_map_any_insertion_order_yields_same_string() {
        let mut a = BTreeMap::new();
        a.insert("app".to_string(), "x".to_string());
        a.insert("tier".to_string(), "front".to_string());

        let mut b = BTreeMap::new();
        b.insert("tier".to_string(), "front".to_string());
        b.insert("app".to_string(), "x".to_string());

        assert_eq!(build_label_selector(&a), build_label_selector(&b));
    }
}
