//! The ordered catalog of flipper-usage detection rules.
//!
//! Rules are static configuration: compiled once, evaluated in registration
//! order for every analysis call so results are reproducible for identical
//! input. A rule either just signals "flag infrastructure present" or
//! extracts a flag name from an explicit capture group, optionally mapped
//! through an alias table.

use lazy_static::lazy_static;
use phf::phf_map;
use regex::Regex;

use super::RuleCategory;

/// Stream-name tokens that map 1:1 to canonical flag identifiers.
///
/// These are the shared, predefined flipper streams; the camelCase binding
/// names do not match their snake_case flag names, so the mapping is a
/// lookup table rather than a convention.
static STREAM_FLAGS: phf::Map<&'static str, &'static str> = phf_map! {
    "zuoraMaintenance" => "zuora_maintenance",
    "fullstory" => "allow_fullstory_tracking",
    "newInvoicing" => "new_invoicing_flow",
    "selfServeCheckout" => "self_serve_checkout",
    "usageBilling" => "usage_billing_v2",
    "paymentRetries" => "smart_payment_retries",
};

/// Flag names that appear as bare string literals, without any call around
/// them (e.g. stored in a variable and passed along later).
const KNOWN_FLAG_LITERALS: &str = "zuora_maintenance|allow_fullstory_tracking|new_invoicing_flow|self_serve_checkout|usage_billing_v2|smart_payment_retries";

/// A named pattern with its extraction policy.
pub struct DetectionRule {
    pub category: RuleCategory,
    pub description: &'static str,
    pub pattern: Regex,
    /// Whether this rule yields a flag name.
    pub extracts_flag: bool,
    /// Capture group holding the raw flag token. Explicit rather than an
    /// implied "group 1" so pattern edits cannot silently shift extraction.
    pub capture_group: usize,
    /// Raw token -> canonical flag identifier. Tokens not in the map are
    /// used as-is.
    pub aliases: Option<&'static phf::Map<&'static str, &'static str>>,
}

impl DetectionRule {
    fn marker(category: RuleCategory, description: &'static str, pattern: &str) -> Self {
        Self {
            category,
            description,
            pattern: Regex::new(pattern).unwrap(),
            extracts_flag: false,
            capture_group: 0,
            aliases: None,
        }
    }

    fn extracting(
        category: RuleCategory,
        description: &'static str,
        pattern: &str,
        capture_group: usize,
    ) -> Self {
        Self {
            category,
            description,
            pattern: Regex::new(pattern).unwrap(),
            extracts_flag: true,
            capture_group,
            aliases: None,
        }
    }

    fn with_aliases(mut self, aliases: &'static phf::Map<&'static str, &'static str>) -> Self {
        self.aliases = Some(aliases);
        self
    }

    /// Resolve a raw captured token to its canonical flag identifier.
    pub fn resolve<'a>(&self, raw: &'a str) -> &'a str {
        match self.aliases {
            Some(map) => map.get(raw).copied().unwrap_or(raw),
            None => raw,
        }
    }
}

lazy_static! {
    static ref RULES: Vec<DetectionRule> = build_rules();
}

/// The ordered, immutable rule registry.
pub fn rules() -> &'static [DetectionRule] {
    &RULES
}

fn build_rules() -> Vec<DetectionRule> {
    let rules = vec![
        DetectionRule::marker(
            RuleCategory::ImportReference,
            "flipper module import",
            r#"import\s+\{[^}]*Flipper[A-Za-z]*[^}]*\}\s+from\s+['"][^'"]+['"]"#,
        ),
        DetectionRule::marker(
            RuleCategory::DependencyInjection,
            "FlipperService constructor injection",
            r"(?:private|protected|public)\s+(?:readonly\s+)?[A-Za-z_][A-Za-z0-9_]*\s*:\s*FlipperService",
        ),
        DetectionRule::extracting(
            RuleCategory::DirectCall,
            "flipperEnabled() call",
            r#"\.flipperEnabled\(\s*['"`]([^'"`]+)['"`]"#,
            1,
        ),
        DetectionRule::extracting(
            RuleCategory::DirectCall,
            "eagerlyEnabled() call",
            r#"\.eagerlyEnabled\(\s*['"`]([^'"`]+)['"`]"#,
            1,
        ),
        DetectionRule::extracting(
            RuleCategory::StreamDeclaration,
            "flipper stream declaration",
            r"([A-Za-z_][A-Za-z0-9_]*)\$(?:\s*:\s*Observable<[^>]+>)?\s*=\s*this\.flipperService\.flipperStream\(",
            1,
        ),
        DetectionRule::extracting(
            RuleCategory::StreamCheck,
            "flipper check inside a stream transform",
            r#"(?:map|filter|switchMap|mergeMap|tap)\(\s*\(?[A-Za-z_][A-Za-z0-9_]*\)?\s*=>\s*[^)]*\.flipperEnabled\(\s*['"`]([^'"`]+)['"`]"#,
            1,
        ),
        DetectionRule::extracting(
            RuleCategory::PredefinedStream,
            "predefined flipper stream usage",
            r"\b(zuoraMaintenance|fullstory|newInvoicing|selfServeCheckout|usageBilling|paymentRetries)\$",
            1,
        )
        .with_aliases(&STREAM_FLAGS),
        DetectionRule::marker(
            RuleCategory::ConfigurationCall,
            "flipper set loading call",
            r"\.(?:loadFlippers|preloadFlippers)\(",
        ),
        DetectionRule::extracting(
            RuleCategory::StringLiteral,
            "known flag name as a string literal",
            &format!(r#"['"`]({KNOWN_FLAG_LITERALS})['"`]"#),
            1,
        ),
        DetectionRule::extracting(
            RuleCategory::ConditionalCheck,
            "flipper check inside an if condition",
            r#"if\s*\([^)]*\.(?:flipperEnabled|eagerlyEnabled)\(\s*['"`]([^'"`]+)['"`]"#,
            1,
        ),
        DetectionRule::extracting(
            RuleCategory::TemplateConditional,
            "flipper check inside a template conditional",
            r#"\*ngIf\s*=\s*"[^"]*(?:flipperEnabled|eagerlyEnabled)\(\s*'([^']+)'"#,
            1,
        ),
    ];

    // An extracting rule whose group index does not exist in its pattern
    // would silently yield no flags; fail loudly at construction instead.
    for rule in &rules {
        if rule.extracts_flag {
            assert!(
                rule.capture_group > 0 && rule.capture_group < rule.pattern.captures_len(),
                "rule {:?} extracts from capture group {} but pattern has {} groups",
                rule.description,
                rule.capture_group,
                rule.pattern.captures_len() - 1,
            );
        }
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_builds_and_validates() {
        let rules = rules();
        assert_eq!(rules.len(), 11);
        for rule in rules {
            if rule.extracts_flag {
                assert!(rule.capture_group < rule.pattern.captures_len());
            }
        }
    }

    #[test]
    fn test_registry_order_is_stable() {
        let categories: Vec<_> = rules().iter().map(|r| r.category).collect();
        assert_eq!(categories[0], RuleCategory::ImportReference);
        assert_eq!(categories[1], RuleCategory::DependencyInjection);
        assert_eq!(
            *categories.last().unwrap(),
            RuleCategory::TemplateConditional
        );
    }

    #[test]
    fn test_stream_alias_map_is_complete() {
        let expected = [
            ("zuoraMaintenance", "zuora_maintenance"),
            ("fullstory", "allow_fullstory_tracking"),
            ("newInvoicing", "new_invoicing_flow"),
            ("selfServeCheckout", "self_serve_checkout"),
            ("usageBilling", "usage_billing_v2"),
            ("paymentRetries", "smart_payment_retries"),
        ];
        assert_eq!(STREAM_FLAGS.len(), expected.len());
        for (token, flag) in expected {
            assert_eq!(STREAM_FLAGS.get(token), Some(&flag));
        }
    }

    #[test]
    fn test_resolve_falls_back_to_raw_token() {
        let rule = rules()
            .iter()
            .find(|r| r.category == RuleCategory::PredefinedStream)
            .unwrap();
        assert_eq!(rule.resolve("zuoraMaintenance"), "zuora_maintenance");
        assert_eq!(rule.resolve("notInTheMap"), "notInTheMap");
    }

    #[test]
    fn test_marker_rules_extract_nothing() {
        for rule in rules() {
            match rule.category {
                RuleCategory::ImportReference
                | RuleCategory::DependencyInjection
                | RuleCategory::ConfigurationCall => assert!(!rule.extracts_flag),
                _ => assert!(rule.extracts_flag),
            }
        }
    }
}
