//! Template-based symptom analysis used when the model is unavailable

use serde::{Deserialize, Serialize};

/// A keyword group and the explanation it contributes
struct SymptomGroup {
    keywords: &'static [&'static str],
    explanation: &'static str,
}

const SYMPTOM_GROUPS: &[SymptomGroup] = &[
    SymptomGroup {
        keywords: &["头痛", "头疼", "headache"],
        explanation: "可能的原因包括：紧张性头痛、偏头痛、感冒等",
    },
    SymptomGroup {
        keywords: &["咳嗽", "cough"],
        explanation: "可能的原因包括：感冒、支气管炎、过敏等",
    },
    SymptomGroup {
        keywords: &["发烧", "fever", "发热"],
        explanation: "可能的原因包括：感染、炎症等",
    },
];

pub const NO_MATCH_EXPLANATION: &str = "建议详细描述症状，或咨询专业医生";

pub const RECOMMENDATION: &str =
    "建议：如果症状持续或加重，请及时就医。本分析仅供参考，不能替代专业医疗诊断。";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomAnalysis {
    /// The text that was analyzed
    pub symptoms: String,
    pub possible_conditions: Vec<String>,
    pub recommendation: String,
}

/// Keyword lookup over a few common symptoms. Groups are independent, so
/// one message can fire several of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymptomAnalyzer;

impl SymptomAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, text: &str) -> SymptomAnalysis {
        let lowered = text.to_lowercase();

        let mut possible_conditions: Vec<String> = SYMPTOM_GROUPS
            .iter()
            .filter(|group| group.keywords.iter().any(|k| lowered.contains(k)))
            .map(|group| group.explanation.to_string())
            .collect();

        if possible_conditions.is_empty() {
            possible_conditions.push(NO_MATCH_EXPLANATION.to_string());
        }

        SymptomAnalysis {
            symptoms: text.to_string(),
            possible_conditions,
            recommendation: RECOMMENDATION.to_string(),
        }
    }
}
