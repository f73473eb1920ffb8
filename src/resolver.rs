use crate::models::{ActivityQuery, ActivityRecord};
use crate::registry::ProviderRegistry;
use tracing::warn;

/// Looks up the provider for a query's chain/network pair and normalizes the
/// answer. Every failure path ends in a `found: false` record carrying a
/// message; nothing escapes to the caller.
pub struct ActivityResolver {
    registry: ProviderRegistry,
}

impl ActivityResolver {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub async fn resolve(&self, query: &ActivityQuery) -> ActivityRecord {
        let Some(provider) = self.registry.get(query.chain, query.network) else {
            return ActivityRecord::not_found(
                query,
                format!(
                    "Unsupported chain or network: {}/{}",
                    query.chain, query.network
                ),
            );
        };

        match provider.fetch_last_activity(&query.address).await {
            Ok(activity) => ActivityRecord::from_activity(query, activity),
            Err(e) => {
                warn!(
                    "{} activity lookup failed for {}/{}: {}",
                    provider.kind(),
                    query.chain,
                    query.network,
                    e
                );
                ActivityRecord::not_found(query, e.to_string())
            }
        }
    }
}

/// Break a second count into days/hours/minutes/seconds, emitting only the
/// non-zero components ("0s" for zero).
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if mins > 0 {
        parts.push(format!("{}m", mins));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{}s", secs));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::format_duration;

    #[test]
    fn zero_seconds() {
        assert_eq!(format_duration(0), "0s");
    }

    #[test]
    fn minutes_and_seconds() {
        assert_eq!(format_duration(61), "1m 1s");
    }

    #[test]
    fn hours_minutes_seconds() {
        assert_eq!(format_duration(3661), "1h 1m 1s");
    }

    #[test]
    fn full_breakdown() {
        assert_eq!(format_duration(90061), "1d 1h 1m 1s");
    }

    #[test]
    fn zero_components_are_skipped() {
        assert_eq!(format_duration(86400), "1d");
        assert_eq!(format_duration(3600), "1h");
        assert_eq!(format_duration(86461), "1d 1m 1s");
    }
}
