//! Static and dynamic provider list merging.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use super::ProviderConfig;

/// Merge static configs with dynamically registered ones.
///
/// Entries are keyed by name: a later entry replaces an earlier one in the
/// earlier one's position, so duplicate static names collapse to the last one
/// and dynamic entries override static ones. New names append in order.
pub fn merge_provider_configs(
    static_configs: &[ProviderConfig],
    dynamic_configs: &[ProviderConfig],
) -> Vec<ProviderConfig> {
    if dynamic_configs.is_empty() {
        return static_configs.to_vec();
    }
    if static_configs.is_empty() {
        return dynamic_configs.to_vec();
    }

    let mut merged: Vec<ProviderConfig> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for config in static_configs.iter().chain(dynamic_configs) {
        match positions.get(config.name.as_str()) {
            Some(&index) => merged[index] = config.clone(),
            None => {
                positions.insert(config.name.as_str(), merged.len());
                merged.push(config.clone());
            }
        }
    }
    merged
}

/// Stable digest of a provider list, used to detect configuration changes.
pub fn config_fingerprint(configs: &[ProviderConfig]) -> String {
    let encoded = serde_json::to_vec(configs).unwrap_or_default();
    format!("{:x}", Sha256::digest(&encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(configs: &[ProviderConfig]) -> Vec<&str> {
        configs.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn dynamic_entry_overrides_static_by_name() {
        let merged = merge_provider_configs(
            &[ProviderConfig::stream("a", "http://x")],
            &[ProviderConfig::stream("a", "http://y")],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].url.as_deref(), Some("http://y"));
    }

    #[test]
    fn override_keeps_position_and_new_names_append() {
        let merged = merge_provider_configs(
            &[
                ProviderConfig::stream("a", "http://a"),
                ProviderConfig::stream("b", "http://b"),
            ],
            &[
                ProviderConfig::stream("c", "http://c"),
                ProviderConfig::stream("a", "http://a2"),
            ],
        );
        assert_eq!(names(&merged), vec!["a", "b", "c"]);
        assert_eq!(merged[0].url.as_deref(), Some("http://a2"));
    }

    #[test]
    fn duplicate_static_names_collapse_to_the_last_entry() {
        let merged = merge_provider_configs(
            &[
                ProviderConfig::stream("a", "http://x"),
                ProviderConfig::stream("a", "http://y"),
            ],
            &[ProviderConfig::stream("b", "http://b")],
        );
        let pairs: Vec<(&str, Option<&str>)> = merged
            .iter()
            .map(|c| (c.name.as_str(), c.url.as_deref()))
            .collect();
        assert_eq!(
            pairs,
            vec![("a", Some("http://y")), ("b", Some("http://b"))]
        );
    }

    #[test]
    fn empty_side_returns_other_unchanged() {
        let only_static = vec![ProviderConfig::stream("a", "http://a")];
        assert_eq!(merge_provider_configs(&only_static, &[]), only_static);
        assert_eq!(merge_provider_configs(&[], &only_static), only_static);
        assert!(merge_provider_configs(&[], &[]).is_empty());
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let first = vec![ProviderConfig::stream("a", "http://a")];
        let second = vec![ProviderConfig::stream("a", "http://b")];
        assert_eq!(config_fingerprint(&first), config_fingerprint(&first.clone()));
        assert_ne!(config_fingerprint(&first), config_fingerprint(&second));
        assert_eq!(config_fingerprint(&first).len(), 64);
    }
}
