//! Keyword-based emergency detection

use serde::{Deserialize, Serialize};

/// Built-in emergency keywords, in reporting order.
///
/// Matching is a case-insensitive substring test with no word boundaries,
/// so a keyword also fires inside longer phrases.
pub const DEFAULT_EMERGENCY_KEYWORDS: &[&str] = &[
    // cardiovascular
    "胸痛", "胸闷", "chest pain", "心脏病", "heart attack", "心肌梗死", "心梗",
    "心悸", "心跳停止", "心律失常", "心律不齐",
    // respiratory
    "呼吸困难", "difficulty breathing", "窒息", "choking", "无法呼吸", "呼吸停止",
    "哮喘发作", "严重哮喘",
    // neurological
    "失去意识", "unconscious", "昏迷", "coma", "晕厥", "晕倒", "意识不清",
    "癫痫", "抽搐", "惊厥", "seizure",
    // hemorrhage
    "严重出血", "severe bleeding", "大出血", "大量出血", "动脉出血",
    "呕血", "便血", "咳血",
    // allergy
    "严重过敏", "severe allergy", "过敏性休克", "anaphylaxis", "过敏性反应",
    // poisoning and overdose
    "中毒", "poisoning", "药物过量", "overdose", "误服", "误食",
    // trauma
    "严重外伤", "严重创伤", "骨折", "严重骨折", "头部外伤", "脑外伤",
    // high fever
    "高热不退", "高烧不退", "持续高热", "39度以上", "40度",
    // acute abdominal, cerebrovascular and organ failure
    "剧烈腹痛", "急性腹痛", "急性阑尾炎", "急性胰腺炎",
    "剧烈头痛", "突发头痛", "脑出血", "脑梗死", "中风",
    "急性肾衰竭", "急性肝衰竭",
];

/// How many matched keywords are quoted back in the emergency message
const QUOTED_KEYWORDS: usize = 3;

/// Action tag attached to every emergency result
pub const EMERGENCY_CONTACT_ACTION: &str = "emergency_contact";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Low,
}

/// Outcome of scanning one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyResult {
    pub is_emergency: bool,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_keywords: Vec<String>,
}

impl EmergencyResult {
    fn clear() -> Self {
        Self {
            is_emergency: false,
            severity: Severity::Low,
            message: None,
            action: None,
            matched_keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Keyword {
    original: String,
    lowered: String,
}

/// Scans user messages for emergency keywords
#[derive(Debug, Clone)]
pub struct EmergencyDetector {
    keywords: Vec<Keyword>,
}

impl EmergencyDetector {
    /// Build a detector from an ordered keyword list. Blank and duplicate
    /// entries are dropped; the first occurrence keeps its position.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut detector = Self {
            keywords: Vec::new(),
        };
        detector.extend(keywords);
        detector
    }

    /// The built-in list followed by `extra` keywords
    pub fn with_keywords<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut detector = Self::default();
        detector.extend(extra);
        detector
    }

    fn extend<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for keyword in keywords {
            let original: String = keyword.into().trim().to_string();
            if original.is_empty() {
                continue;
            }
            let lowered = original.to_lowercase();
            if self.keywords.iter().any(|k| k.lowered == lowered) {
                continue;
            }
            self.keywords.push(Keyword { original, lowered });
        }
    }

    /// Keywords in matching order
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|k| k.original.as_str())
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Scan `text` and report every keyword it contains
    pub fn detect(&self, text: &str) -> EmergencyResult {
        let lowered = text.to_lowercase();
        let matched: Vec<String> = self
            .keywords
            .iter()
            .filter(|k| lowered.contains(&k.lowered))
            .map(|k| k.original.clone())
            .collect();

        if matched.is_empty() {
            return EmergencyResult::clear();
        }

        EmergencyResult {
            is_emergency: true,
            severity: Severity::High,
            message: Some(emergency_message(&matched)),
            action: Some(EMERGENCY_CONTACT_ACTION.to_string()),
            matched_keywords: matched,
        }
    }
}

impl Default for EmergencyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_EMERGENCY_KEYWORDS.iter().copied())
    }
}

fn emergency_message(matched: &[String]) -> String {
    let quoted = matched
        .iter()
        .take(QUOTED_KEYWORDS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "根据你的描述，检测到可能涉及紧急医疗情况的关键词：{quoted}

请立即采取以下行动：
1. 立即拨打急救电话 120
2. 或立即前往最近的医院急诊科
3. 不要延误，时间就是生命

重要提示：
本 AI 助手无法处理紧急医疗情况，请立即寻求专业医疗帮助。在等待救援期间，尽量保持患者平静，避免移动（如怀疑骨折或外伤）。

急救电话：120
如遇火灾等紧急情况，请拨打：119

请立即行动，不要等待！"
    )
}
