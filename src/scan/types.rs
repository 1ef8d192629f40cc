//! Core types for flag detection results.

use serde::{Deserialize, Serialize};

/// Categories of flipper-usage idioms the rule registry recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleCategory {
    #[serde(rename = "import-reference")]
    ImportReference,
    #[serde(rename = "dependency-injection")]
    DependencyInjection,
    #[serde(rename = "direct-call")]
    DirectCall,
    #[serde(rename = "reactive-stream-declaration")]
    StreamDeclaration,
    #[serde(rename = "reactive-stream-check")]
    StreamCheck,
    #[serde(rename = "predefined-stream-usage")]
    PredefinedStream,
    #[serde(rename = "configuration-call")]
    ConfigurationCall,
    #[serde(rename = "string-literal")]
    StringLiteral,
    #[serde(rename = "conditional-check")]
    ConditionalCheck,
    #[serde(rename = "template-conditional")]
    TemplateConditional,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::ImportReference => "import-reference",
            RuleCategory::DependencyInjection => "dependency-injection",
            RuleCategory::DirectCall => "direct-call",
            RuleCategory::StreamDeclaration => "reactive-stream-declaration",
            RuleCategory::StreamCheck => "reactive-stream-check",
            RuleCategory::PredefinedStream => "predefined-stream-usage",
            RuleCategory::ConfigurationCall => "configuration-call",
            RuleCategory::StringLiteral => "string-literal",
            RuleCategory::ConditionalCheck => "conditional-check",
            RuleCategory::TemplateConditional => "template-conditional",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "import-reference" => Some(RuleCategory::ImportReference),
            "dependency-injection" => Some(RuleCategory::DependencyInjection),
            "direct-call" => Some(RuleCategory::DirectCall),
            "reactive-stream-declaration" => Some(RuleCategory::StreamDeclaration),
            "reactive-stream-check" => Some(RuleCategory::StreamCheck),
            "predefined-stream-usage" => Some(RuleCategory::PredefinedStream),
            "configuration-call" => Some(RuleCategory::ConfigurationCall),
            "string-literal" => Some(RuleCategory::StringLiteral),
            "conditional-check" => Some(RuleCategory::ConditionalCheck),
            "template-conditional" => Some(RuleCategory::TemplateConditional),
            _ => None,
        }
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One located occurrence of a flipper-usage idiom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub category: RuleCategory,
    /// Human-readable description of the rule that fired.
    pub rule: String,
    /// 1-based line number of the match start.
    pub line: usize,
    /// 0-based character offset from the start of that line.
    pub column: usize,
    /// The exact matched substring.
    pub matched: String,
    /// Resolved flag name, if the rule extracts one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    /// Bounded text window around the match, for human review.
    pub context: String,
}

/// Result of analyzing one block of text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub detections: Vec<Detection>,
    pub summary: String,
}

impl AnalysisResult {
    /// Unique resolved flag names, in order of first appearance.
    pub fn flag_names(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut flags = Vec::new();
        for d in &self.detections {
            if let Some(flag) = &d.flag {
                if seen.insert(flag.clone()) {
                    flags.push(flag.clone());
                }
            }
        }
        flags
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}
