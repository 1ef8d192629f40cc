//! Runs the rule registry against a block of text.

use std::sync::Arc;

use xxhash_rust::xxh3::xxh3_64;

use super::{rules, AnalysisResult, Detection, ResultCache};

/// Characters of surrounding text captured on each side of a match start.
const CONTEXT_RADIUS: usize = 50;

/// Compute the cache fingerprint for a block of text.
///
/// Hashes the entire text, not a prefix: a wrong cache hit would silently
/// return stale results.
pub fn fingerprint(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

/// Evaluates every registered rule against input text, with results cached
/// by content fingerprint.
///
/// The cache is owned per matcher instance (or shared explicitly), never a
/// process-wide global, so isolated instances can be constructed in tests.
pub struct ContentMatcher {
    cache: Arc<ResultCache>,
}

impl Default for ContentMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentMatcher {
    pub fn new() -> Self {
        Self::with_cache(Arc::new(ResultCache::new()))
    }

    /// Create a matcher sharing an existing cache.
    pub fn with_cache(cache: Arc<ResultCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Find all flipper usages in `text`.
    ///
    /// Never fails: malformed input is just text with no matches. Matches
    /// are appended in rule-then-occurrence order, not sorted by position;
    /// that ordering is part of the output contract.
    pub fn analyze(&self, text: &str) -> Arc<AnalysisResult> {
        let key = fingerprint(text);
        if let Some(cached) = self.cache.get(key) {
            return cached;
        }

        let mut detections = Vec::new();
        for rule in rules() {
            for caps in rule.pattern.captures_iter(text) {
                let Some(m) = caps.get(0) else { continue };

                let flag = if rule.extracts_flag {
                    caps.get(rule.capture_group)
                        .map(|g| g.as_str())
                        .filter(|raw| !raw.is_empty())
                        .map(|raw| rule.resolve(raw).to_string())
                } else {
                    None
                };

                let (line, column) = position_of(text, m.start());
                detections.push(Detection {
                    category: rule.category,
                    rule: rule.description.to_string(),
                    line,
                    column,
                    matched: m.as_str().to_string(),
                    flag,
                    context: context_window(text, m.start(), CONTEXT_RADIUS),
                });
            }
        }

        let summary = summarize(&detections);
        let result = Arc::new(AnalysisResult {
            detections,
            summary,
        });
        self.cache.insert(key, Arc::clone(&result));
        result
    }
}

/// 1-based line and 0-based column (in characters) of a byte offset.
fn position_of(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = text[line_start..offset].chars().count();
    (line, column)
}

/// A window of up to `radius` characters on each side of `offset`, clipped
/// to the text bounds. Offsets are kept on char boundaries.
fn context_window(text: &str, offset: usize, radius: usize) -> String {
    let start = text[..offset]
        .char_indices()
        .rev()
        .nth(radius.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = text[offset..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| offset + i)
        .unwrap_or(text.len());
    text[start..end].to_string()
}

fn summarize(detections: &[Detection]) -> String {
    if detections.is_empty() {
        return "no flipper usage found".to_string();
    }
    let flags: std::collections::HashSet<_> =
        detections.iter().filter_map(|d| d.flag.as_deref()).collect();
    format!(
        "{} flipper usage(s) touching {} flag(s)",
        detections.len(),
        flags.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::RuleCategory;

    fn analyze(text: &str) -> Arc<AnalysisResult> {
        ContentMatcher::new().analyze(text)
    }

    #[test]
    fn test_direct_call_extracts_flag() {
        let result = analyze("const on = this.flipperService.flipperEnabled('my_flag');");
        let direct: Vec<_> = result
            .detections
            .iter()
            .filter(|d| d.category == RuleCategory::DirectCall)
            .collect();
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].flag.as_deref(), Some("my_flag"));
        assert!(direct[0].matched.contains("flipperEnabled"));
    }

    #[test]
    fn test_extracted_flag_has_no_quote_delimiters() {
        for text in [
            "x.flipperEnabled('some_flag')",
            "x.flipperEnabled(\"some_flag\")",
            "x.flipperEnabled(`some_flag`)",
        ] {
            let result = analyze(text);
            let flag = result.detections[0].flag.as_deref().unwrap();
            assert_eq!(flag, "some_flag");
        }
    }

    #[test]
    fn test_conditional_and_direct_both_fire() {
        let text = "if (this.flipperService.flipperEnabled('zuora_maintenance')) { retry(); }";
        let result = analyze(text);

        let direct: Vec<_> = result
            .detections
            .iter()
            .filter(|d| d.category == RuleCategory::DirectCall)
            .collect();
        let conditional: Vec<_> = result
            .detections
            .iter()
            .filter(|d| d.category == RuleCategory::ConditionalCheck)
            .collect();

        assert_eq!(direct.len(), 1);
        assert_eq!(conditional.len(), 1);
        assert_eq!(direct[0].flag.as_deref(), Some("zuora_maintenance"));
        assert_eq!(conditional[0].flag.as_deref(), Some("zuora_maintenance"));
        assert_eq!(result.flag_names(), vec!["zuora_maintenance"]);
    }

    #[test]
    fn test_predefined_stream_alias_mapping() {
        let cases = [
            ("zuoraMaintenance$", "zuora_maintenance"),
            ("fullstory$", "allow_fullstory_tracking"),
            ("newInvoicing$", "new_invoicing_flow"),
            ("selfServeCheckout$", "self_serve_checkout"),
            ("usageBilling$", "usage_billing_v2"),
            ("paymentRetries$", "smart_payment_retries"),
        ];
        for (token, expected) in cases {
            let result = analyze(&format!("const banner = {};", token));
            let stream: Vec<_> = result
                .detections
                .iter()
                .filter(|d| d.category == RuleCategory::PredefinedStream)
                .collect();
            assert_eq!(stream.len(), 1, "token {:?} should match once", token);
            assert_eq!(stream[0].flag.as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_stream_declaration_uses_binding_name() {
        let text = "maintenanceMode$ = this.flipperService.flipperStream('zuora_maintenance');";
        let result = analyze(text);
        let decl: Vec<_> = result
            .detections
            .iter()
            .filter(|d| d.category == RuleCategory::StreamDeclaration)
            .collect();
        assert_eq!(decl.len(), 1);
        assert_eq!(decl[0].flag.as_deref(), Some("maintenanceMode"));
    }

    #[test]
    fn test_stream_check_inside_transform() {
        let text = "flags$.pipe(map(flags => flags.flipperEnabled('usage_billing_v2')))";
        let result = analyze(text);
        let checks: Vec<_> = result
            .detections
            .iter()
            .filter(|d| d.category == RuleCategory::StreamCheck)
            .collect();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].flag.as_deref(), Some("usage_billing_v2"));
    }

    #[test]
    fn test_template_conditional() {
        let text = r#"<div *ngIf="flipperEnabled('new_invoicing_flow')">new flow</div>"#;
        let result = analyze(text);
        let tmpl: Vec<_> = result
            .detections
            .iter()
            .filter(|d| d.category == RuleCategory::TemplateConditional)
            .collect();
        assert_eq!(tmpl.len(), 1);
        assert_eq!(tmpl[0].flag.as_deref(), Some("new_invoicing_flow"));
    }

    #[test]
    fn test_marker_rules_yield_no_flag() {
        let text = "import { FlipperService } from '@core/flipper';\n\
                    constructor(private flipperService: FlipperService) {}\n\
                    this.flipperService.loadFlippers();";
        let result = analyze(text);
        for cat in [
            RuleCategory::ImportReference,
            RuleCategory::DependencyInjection,
            RuleCategory::ConfigurationCall,
        ] {
            let hits: Vec<_> = result
                .detections
                .iter()
                .filter(|d| d.category == cat)
                .collect();
            assert_eq!(hits.len(), 1, "expected one {} detection", cat);
            assert!(hits[0].flag.is_none());
        }
    }

    #[test]
    fn test_line_and_column_attribution() {
        let text = "line one\nlet x = 1;\n  y.flipperEnabled('my_flag')\n";
        let result = analyze(text);
        let direct = result
            .detections
            .iter()
            .find(|d| d.category == RuleCategory::DirectCall)
            .unwrap();
        assert_eq!(direct.line, 3);
        // The match starts at ".flipperEnabled", after "  y".
        assert_eq!(direct.column, 3);
    }

    #[test]
    fn test_position_of_first_line() {
        let (line, column) = position_of("abc", 1);
        assert_eq!(line, 1);
        assert_eq!(column, 1);
    }

    #[test]
    fn test_context_window_clipped_to_bounds() {
        let short = "x.flipperEnabled('f')";
        let result = analyze(short);
        assert_eq!(result.detections[0].context, short);
    }

    #[test]
    fn test_context_window_multibyte_safe() {
        // Multibyte chars right around the window edges must not split.
        let text = format!("{}x.flipperEnabled('f')", "\u{e9}".repeat(60));
        let result = analyze(&text);
        let context = &result.detections[0].context;
        assert!(context.ends_with("('f')"));
        // 50 chars before the match start plus the 20-char match tail.
        assert_eq!(context.chars().count(), 70);
    }

    #[test]
    fn test_idempotent_across_cache_clear() {
        let matcher = ContentMatcher::new();
        let text = "if (svc.flipperEnabled('my_flag')) {}";

        let first = matcher.analyze(text);
        let cached = matcher.analyze(text);
        assert!(Arc::ptr_eq(&first, &cached));

        matcher.cache().clear();
        let recomputed = matcher.analyze(text);
        assert!(!Arc::ptr_eq(&first, &recomputed));
        assert_eq!(*first, *recomputed);
    }

    #[test]
    fn test_empty_and_unmatched_input() {
        assert!(analyze("").is_empty());
        let result = analyze("nothing to see here\nfn main() {}\n");
        assert!(result.is_empty());
        assert_eq!(result.summary, "no flipper usage found");
    }

    #[test]
    fn test_fingerprint_covers_whole_text() {
        let a = format!("{}a", "x".repeat(4096));
        let b = format!("{}b", "x".repeat(4096));
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
