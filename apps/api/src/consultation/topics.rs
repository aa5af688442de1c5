use regex::Regex;

use crate::safety::patterns::PatternError;

/// Tag used when no topic rule matches.
pub const UNCATEGORIZED: &str = "未分類";

/// Fixed ordered topic rules: pattern → tag.
pub const TOPIC_RULES: &[(&str, &str)] = &[
    ("いじめ|暴力|脅|自傷|自殺|安全|被害", "安全/人間関係"),
    ("保護者|家庭|連絡|面談", "保護者対応"),
    ("提出|宿題|課題|忘れ|未提出", "課題・提出"),
    ("遅刻|欠席|不登校|登校しぶり", "出欠"),
    ("集中|立ち歩き|私語|規律|荒れ", "授業規律"),
    ("評価|テスト|成績|アセスメント", "評価"),
    ("友だち|仲間|グループ|孤立", "関係性"),
];

/// Tags a narrative with every matching topic, for dashboard counts.
#[derive(Debug, Clone)]
pub struct TopicClassifier {
    rules: Vec<(Regex, &'static str)>,
}

impl TopicClassifier {
    pub fn new() -> Result<Self, PatternError> {
        let rules = TOPIC_RULES
            .iter()
            .map(|(pattern, tag)| {
                Regex::new(pattern)
                    .map(|re| (re, *tag))
                    .map_err(|source| PatternError::Invalid {
                        list: "topic",
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Matching tags in rule order, or `[UNCATEGORIZED]` when none match.
    pub fn classify(&self, narrative: &str) -> Vec<String> {
        let topics: Vec<String> = self
            .rules
            .iter()
            .filter(|(re, _)| re.is_match(narrative))
            .map(|(_, tag)| tag.to_string())
            .collect();

        if topics.is_empty() {
            vec![UNCATEGORIZED.to_string()]
        } else {
            topics
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> TopicClassifier {
        TopicClassifier::new().unwrap()
    }

    #[test]
    fn test_empty_narrative_is_uncategorized() {
        assert_eq!(classifier().classify(""), vec![UNCATEGORIZED]);
    }

    #[test]
    fn test_unmatched_narrative_is_uncategorized() {
        assert_eq!(classifier().classify("給食の時間が長い"), vec![UNCATEGORIZED]);
    }

    #[test]
    fn test_multiple_tags_in_rule_order() {
        let tags = classifier().classify("グループでのいじめについて保護者から連絡があった");
        assert_eq!(tags, vec!["安全/人間関係", "保護者対応", "関係性"]);
    }

    #[test]
    fn test_single_tag() {
        assert_eq!(classifier().classify("宿題を忘れる子が多い"), vec!["課題・提出"]);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let c = classifier();
        let narrative = "授業中の私語と遅刻が続き、テスト前に集中できない";
        let first = c.classify(narrative);
        let second = c.classify(narrative);
        assert_eq!(first, second);
        assert_eq!(first, vec!["出欠", "授業規律", "評価"]);
    }
}
