//! Organization policy — tone by audience, mandatory inclusions, avoid phrases,
//! fixed opener phrases and the value → theory-tag mapping.
//!
//! Read at prompt-assembly time. Only administrative edits change it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::intake::CoreValue;

/// Tone guidance for each audience the answer addresses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToneGuide {
    pub teacher: String,
    pub parent: String,
    pub student_low: String,
    pub student_high: String,
}

/// Fixed opener phrases the answer should reuse verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Phrasebook {
    pub teacher_open: String,
    pub parent_open: String,
    pub ask_help: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    pub tone: ToneGuide,
    pub must_include: Vec<String>,
    pub avoid_phrases: Vec<String>,
    pub phrasebook: Phrasebook,
    pub value_mapping: BTreeMap<CoreValue, Vec<String>>,
}

impl Policy {
    /// Theory tags mapped from the selected values, deduplicated and sorted.
    pub fn theory_tags(&self, values: &[CoreValue]) -> Vec<String> {
        let mut tags: Vec<String> = values
            .iter()
            .filter_map(|v| self.value_mapping.get(v))
            .flatten()
            .cloned()
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// True if `text` contains any avoid phrase verbatim.
    pub fn contains_avoid_phrase(&self, text: &str) -> bool {
        self.avoid_phrases
            .iter()
            .any(|p| !p.is_empty() && text.contains(p.as_str()))
    }
}

fn tags(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Policy {
    /// The policy seeded for an organization on first use.
    fn default() -> Self {
        let mut value_mapping = BTreeMap::new();
        value_mapping.insert(
            CoreValue::FosterAutonomy,
            tags(&["自律", "選択肢提示", "自己決定理論"]),
        );
        value_mapping.insert(
            CoreValue::BuildConfidence,
            tags(&["有能感", "成功体験", "形成的FB"]),
        );
        value_mapping.insert(
            CoreValue::LetThemChoose,
            tags(&["選択肢", "関与", "自己決定理論"]),
        );
        value_mapping.insert(
            CoreValue::StretchTasks,
            tags(&["最近接発達域", "スモールステップ"]),
        );
        value_mapping.insert(
            CoreValue::EmbraceFailure,
            tags(&["安心", "学びのやり直し", "成長志向"]),
        );
        value_mapping.insert(
            CoreValue::PraiseProcess,
            tags(&["形成的FB", "努力の言語化"]),
        );
        value_mapping.insert(CoreValue::SafeAtmosphere, tags(&["心理的安全", "関係性"]));
        value_mapping.insert(CoreValue::AcceptAsTheyAre, tags(&["受容", "傾聴"]));
        value_mapping.insert(
            CoreValue::ListenClosely,
            tags(&["アクティブリスニング", "共感"]),
        );

        Policy {
            tone: ToneGuide {
                teacher: "最初にねぎらい→要点→次の一歩。断定/否定を避け選択肢で提案。".to_string(),
                parent: "不安を下げる語彙。1行要約→丁寧文。家庭でできる観察/声かけを具体に。"
                    .to_string(),
                student_low: "やさしい言葉、短い文、選べる言い方。".to_string(),
                student_high: "尊重の語彙。理由→やり方→選択肢。命令形は避ける。".to_string(),
            },
            must_include: tags(&["生徒の安全最優先", "個の尊重", "記録と共有の手順に従う"]),
            avoid_phrases: tags(&["その場で謝らせる", "両者を即対面", "恥をかかせる", "我慢させる"]),
            phrasebook: Phrasebook {
                teacher_open:
                    "いつも本当におつかれさまです。状況を丁寧に見てこられたことが伝わってきました。"
                        .to_string(),
                parent_open:
                    "いつもご協力ありがとうございます。学校として丁寧に様子を見てまいります。"
                        .to_string(),
                ask_help: "無理のない範囲で、次の点だけ一緒に見守っていただけますか。".to_string(),
            },
            value_mapping,
        }
    }
}
