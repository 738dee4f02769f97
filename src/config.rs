use std::env;
use std::time::Duration;

use crate::refresh::RefreshPolicy;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_VARIANT: &str = "mega645";
const DEFAULT_DRAW_SIZE: usize = 6;

/// Display metadata for one game variant. The key is what goes on the wire;
/// nothing outside rendering looks at the other fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSpec {
    pub key: String,
    pub label: String,
    /// Number of balls drawn per period, bonus ball included.
    pub draw_size: usize,
    /// Balls before this index are main numbers, the rest are bonus balls.
    pub main_count: usize,
}

impl VariantSpec {
    pub fn fallback(key: &str) -> Self {
        Self {
            key: key.to_string(),
            label: key.to_string(),
            draw_size: DEFAULT_DRAW_SIZE,
            main_count: DEFAULT_DRAW_SIZE,
        }
    }

    pub fn has_bonus(&self) -> bool {
        self.main_count < self.draw_size
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCatalog {
    variants: Vec<VariantSpec>,
}

impl Default for VariantCatalog {
    fn default() -> Self {
        Self {
            variants: vec![
                VariantSpec {
                    key: "mega645".to_string(),
                    label: "Mega 6/45".to_string(),
                    draw_size: 6,
                    main_count: 6,
                },
                VariantSpec {
                    key: "power655".to_string(),
                    label: "Power 6/55".to_string(),
                    draw_size: 7,
                    main_count: 6,
                },
            ],
        }
    }
}

impl VariantCatalog {
    pub fn new(variants: Vec<VariantSpec>) -> Self {
        if variants.is_empty() {
            return Self::default();
        }
        Self { variants }
    }

    pub fn spec(&self, key: &str) -> VariantSpec {
        self.variants
            .iter()
            .find(|v| v.key == key)
            .cloned()
            .unwrap_or_else(|| VariantSpec::fallback(key))
    }

    pub fn keys(&self) -> Vec<&str> {
        self.variants.iter().map(|v| v.key.as_str()).collect()
    }

    /// Key following `key` in catalog order, wrapping around. Unknown keys
    /// jump to the first entry.
    pub fn next_key(&self, key: &str) -> String {
        let pos = self.variants.iter().position(|v| v.key == key);
        let next = match pos {
            Some(idx) => (idx + 1) % self.variants.len(),
            None => 0,
        };
        self.variants[next].key.clone()
    }
}

/// Parses `key:label:draw_size[:main_count]` entries separated by commas.
/// Malformed entries are skipped.
pub fn parse_variants(raw: &str) -> Vec<VariantSpec> {
    raw.split(',')
        .filter_map(|item| {
            let parts: Vec<&str> = item.split(':').map(str::trim).collect();
            if parts.len() < 3 || parts[0].is_empty() {
                return None;
            }
            let draw_size = parts[2].parse::<usize>().ok().filter(|n| *n > 0)?;
            let main_count = parts
                .get(3)
                .and_then(|val| val.parse::<usize>().ok())
                .unwrap_or(draw_size)
                .min(draw_size);
            let label = if parts[1].is_empty() { parts[0] } else { parts[1] };
            Some(VariantSpec {
                key: parts[0].to_string(),
                label: label.to_string(),
                draw_size,
                main_count,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub api_token: Option<String>,
    pub default_variant: String,
    pub variants: VariantCatalog,
    pub http_timeout: Duration,
    pub fetch_parallelism: usize,
    pub refresh: RefreshPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_token: None,
            default_variant: DEFAULT_VARIANT.to_string(),
            variants: VariantCatalog::default(),
            http_timeout: Duration::from_secs(10),
            fetch_parallelism: 5,
            refresh: RefreshPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = RefreshPolicy::default();
        let api_base = non_empty_env("LOTTO_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let variants = non_empty_env("LOTTO_VARIANTS")
            .map(|raw| VariantCatalog::new(parse_variants(&raw)))
            .unwrap_or_default();
        let default_variant =
            non_empty_env("LOTTO_DEFAULT_VARIANT").unwrap_or_else(|| DEFAULT_VARIANT.to_string());

        let refresh = RefreshPolicy {
            initial_delay: Duration::from_millis(
                parse_env("REFRESH_INITIAL_DELAY_MS")
                    .unwrap_or(defaults.initial_delay.as_millis() as u64)
                    .clamp(100, 60_000),
            ),
            max_delay: Duration::from_millis(
                parse_env("REFRESH_MAX_DELAY_MS")
                    .unwrap_or(defaults.max_delay.as_millis() as u64)
                    .clamp(100, 300_000),
            ),
            factor: parse_env("REFRESH_BACKOFF_FACTOR")
                .unwrap_or(defaults.factor)
                .clamp(1.0, 10.0),
            max_attempts: parse_env("REFRESH_MAX_ATTEMPTS")
                .unwrap_or(defaults.max_attempts)
                .clamp(1, 50),
            jitter: parse_env("REFRESH_JITTER")
                .unwrap_or(defaults.jitter)
                .clamp(0.0, 0.5),
        };

        Self {
            api_base,
            api_token: non_empty_env("LOTTO_API_TOKEN"),
            default_variant,
            variants,
            http_timeout: Duration::from_secs(
                parse_env("HTTP_TIMEOUT_SECS").unwrap_or(10).clamp(1, 120),
            ),
            fetch_parallelism: parse_env("FETCH_PARALLELISM").unwrap_or(5).clamp(2, 32),
            refresh,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_variants_skips_malformed_entries() {
        let parsed = parse_variants("keno:Keno:20, bad, power655:Power 6/55:7:6, x::0");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].key, "keno");
        assert_eq!(parsed[0].main_count, 20);
        assert_eq!(parsed[1].label, "Power 6/55");
        assert!(parsed[1].has_bonus());
    }

    #[test]
    fn next_key_wraps_and_recovers_from_unknown() {
        let catalog = VariantCatalog::default();
        assert_eq!(catalog.keys(), vec!["mega645", "power655"]);
        assert_eq!(catalog.next_key("mega645"), "power655");
        assert_eq!(catalog.next_key("power655"), "mega645");
        assert_eq!(catalog.next_key("lotto535"), "mega645");
    }

    #[test]
    fn unknown_variant_falls_back_to_key_label() {
        let spec = VariantCatalog::default().spec("lotto535");
        assert_eq!(spec.label, "lotto535");
        assert_eq!(spec.draw_size, 6);
        assert!(!spec.has_bonus());
    }
}
