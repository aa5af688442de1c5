//! Intake — the structured description of a classroom situation submitted for advice.
//!
//! Categorical fields travel over the wire as snake_case identifiers and are rendered
//! into the prompt with their Japanese display labels.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of core values a teacher may select for one consultation.
pub const MAX_SELECTED_VALUES: usize = 4;
/// Maximum length (in characters) of the "attempts so far" note.
pub const MAX_ATTEMPTS_CHARS: usize = 100;

// ────────────────────────────────────────────────────────────────────────────
// Categorical fields
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GradeBand {
    Preschool,
    Elementary12,
    Elementary34,
    Elementary56,
    JuniorHigh,
    HighSchool,
    UniversityAdult,
    Other,
}

impl GradeBand {
    pub const ALL: [GradeBand; 8] = [
        GradeBand::Preschool,
        GradeBand::Elementary12,
        GradeBand::Elementary34,
        GradeBand::Elementary56,
        GradeBand::JuniorHigh,
        GradeBand::HighSchool,
        GradeBand::UniversityAdult,
        GradeBand::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GradeBand::Preschool => "幼児",
            GradeBand::Elementary12 => "小1-2",
            GradeBand::Elementary34 => "小3-4",
            GradeBand::Elementary56 => "小5-6",
            GradeBand::JuniorHigh => "中1-3",
            GradeBand::HighSchool => "高1-3",
            GradeBand::UniversityAdult => "大学・成人",
            GradeBand::Other => "その他",
        }
    }
}

/// Number of children involved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupSize {
    Individual,
    Few,
    SmallGroup,
    WholeClass,
}

impl GroupSize {
    pub const ALL: [GroupSize; 4] = [
        GroupSize::Individual,
        GroupSize::Few,
        GroupSize::SmallGroup,
        GroupSize::WholeClass,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GroupSize::Individual => "個別",
            GroupSize::Few => "数人（2-5）",
            GroupSize::SmallGroup => "小グループ（6-10）",
            GroupSize::WholeClass => "学級全体",
        }
    }
}

/// Where the situation happens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    InClass,
    PrepAndCleanup,
    Recess,
    Homeroom,
    SchoolEvent,
    ParentContact,
    ClubActivity,
    OnlineLearning,
}

impl Setting {
    pub const ALL: [Setting; 8] = [
        Setting::InClass,
        Setting::PrepAndCleanup,
        Setting::Recess,
        Setting::Homeroom,
        Setting::SchoolEvent,
        Setting::ParentContact,
        Setting::ClubActivity,
        Setting::OnlineLearning,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Setting::InClass => "授業中",
            Setting::PrepAndCleanup => "授業準備・片付け",
            Setting::Recess => "休み時間",
            Setting::Homeroom => "HR・学活",
            Setting::SchoolEvent => "行事",
            Setting::ParentContact => "保護者対応",
            Setting::ClubActivity => "部活動",
            Setting::OnlineLearning => "オンライン学習",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    FirstTime,
    Occasional,
    Ongoing,
    Chronic,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::FirstTime,
        Frequency::Occasional,
        Frequency::Ongoing,
        Frequency::Chronic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Frequency::FirstTime => "初回",
            Frequency::Occasional => "時々",
            Frequency::Ongoing => "継続的（週1-2）",
            Frequency::Chronic => "慢性的（ほぼ毎回）",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub const ALL: [Urgency; 3] = [Urgency::Low, Urgency::Medium, Urgency::High];

    pub fn label(self) -> &'static str {
        match self {
            Urgency::Low => "低",
            Urgency::Medium => "中",
            Urgency::High => "高",
        }
    }
}

/// How the reporting teacher feels right now.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Confused,
    Impatient,
    Angry,
    Worried,
    Helpless,
    Hopeful,
    Calm,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Confused,
        Emotion::Impatient,
        Emotion::Angry,
        Emotion::Worried,
        Emotion::Helpless,
        Emotion::Hopeful,
        Emotion::Calm,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Emotion::Confused => "困惑",
            Emotion::Impatient => "焦り",
            Emotion::Angry => "怒り",
            Emotion::Worried => "心配",
            Emotion::Helpless => "無力感",
            Emotion::Hopeful => "期待",
            Emotion::Calm => "落ち着いている",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Japanese,
    Math,
    Science,
    SocialStudies,
    English,
    PhysicalEducation,
    Music,
    Art,
    TechnologyHomeEconomics,
    IntegratedStudies,
}

impl Subject {
    pub const ALL: [Subject; 10] = [
        Subject::Japanese,
        Subject::Math,
        Subject::Science,
        Subject::SocialStudies,
        Subject::English,
        Subject::PhysicalEducation,
        Subject::Music,
        Subject::Art,
        Subject::TechnologyHomeEconomics,
        Subject::IntegratedStudies,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Subject::Japanese => "国語",
            Subject::Math => "算数/数学",
            Subject::Science => "理科",
            Subject::SocialStudies => "社会",
            Subject::English => "英語",
            Subject::PhysicalEducation => "体育",
            Subject::Music => "音楽",
            Subject::Art => "美術/図工",
            Subject::TechnologyHomeEconomics => "技家",
            Subject::IntegratedStudies => "総合",
        }
    }
}

/// Realistic time the teacher can spend on an intervention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeBudget {
    Minutes5,
    Minutes10,
    Minutes15,
    Minutes30,
}

impl TimeBudget {
    pub const ALL: [TimeBudget; 4] = [
        TimeBudget::Minutes5,
        TimeBudget::Minutes10,
        TimeBudget::Minutes15,
        TimeBudget::Minutes30,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TimeBudget::Minutes5 => "~5分",
            TimeBudget::Minutes10 => "~10分",
            TimeBudget::Minutes15 => "~15分",
            TimeBudget::Minutes30 => "~30分",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
    #[default]
    Standard,
    High,
}

impl Specificity {
    pub const ALL: [Specificity; 2] = [Specificity::Standard, Specificity::High];

    pub fn label(self) -> &'static str {
        match self {
            Specificity::Standard => "標準",
            Specificity::High => "高め（超具体）",
        }
    }
}

/// Display label used for optional fields the teacher left unspecified.
pub const UNSPECIFIED_LABEL: &str = "未指定";

// ────────────────────────────────────────────────────────────────────────────
// Value taxonomy
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValueGroup {
    TrustChildren,
    SupportGrowth,
    WarmRelationships,
}

impl ValueGroup {
    pub const ALL: [ValueGroup; 3] = [
        ValueGroup::TrustChildren,
        ValueGroup::SupportGrowth,
        ValueGroup::WarmRelationships,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ValueGroup::TrustChildren => "子どもの力を信じる",
            ValueGroup::SupportGrowth => "成長を支える関わり方",
            ValueGroup::WarmRelationships => "温かい人間関係",
        }
    }
}

/// A value the teacher cares about, selected from the fixed grouped taxonomy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CoreValue {
    FosterAutonomy,
    BuildConfidence,
    LetThemChoose,
    StretchTasks,
    EmbraceFailure,
    PraiseProcess,
    SafeAtmosphere,
    AcceptAsTheyAre,
    ListenClosely,
}

impl CoreValue {
    pub const ALL: [CoreValue; 9] = [
        CoreValue::FosterAutonomy,
        CoreValue::BuildConfidence,
        CoreValue::LetThemChoose,
        CoreValue::StretchTasks,
        CoreValue::EmbraceFailure,
        CoreValue::PraiseProcess,
        CoreValue::SafeAtmosphere,
        CoreValue::AcceptAsTheyAre,
        CoreValue::ListenClosely,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CoreValue::FosterAutonomy => "子どもの主体性を育てたい",
            CoreValue::BuildConfidence => "自信を育てたい",
            CoreValue::LetThemChoose => "自分で選ばせたい",
            CoreValue::StretchTasks => "少し頑張れる課題を出したい",
            CoreValue::EmbraceFailure => "失敗を受け止めたい",
            CoreValue::PraiseProcess => "プロセスを褒めたい",
            CoreValue::SafeAtmosphere => "安心できる雰囲気をつくりたい",
            CoreValue::AcceptAsTheyAre => "ありのままを受け入れたい",
            CoreValue::ListenClosely => "相手の話に耳を傾けたい",
        }
    }

    pub fn group(self) -> ValueGroup {
        match self {
            CoreValue::FosterAutonomy | CoreValue::BuildConfidence | CoreValue::LetThemChoose => {
                ValueGroup::TrustChildren
            }
            CoreValue::StretchTasks | CoreValue::EmbraceFailure | CoreValue::PraiseProcess => {
                ValueGroup::SupportGrowth
            }
            CoreValue::SafeAtmosphere | CoreValue::AcceptAsTheyAre | CoreValue::ListenClosely => {
                ValueGroup::WarmRelationships
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire form and validated intake
// ────────────────────────────────────────────────────────────────────────────

/// Intake as submitted by the form. Required fields are optional here so that
/// a missing selection surfaces as a validation error rather than a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntakeForm {
    pub grade: Option<GradeBand>,
    pub scale: Option<GroupSize>,
    pub scene: Option<Setting>,
    pub frequency: Option<Frequency>,
    pub urgency: Option<Urgency>,
    pub emotion: Option<Emotion>,
    pub subject: Option<Subject>,
    pub time_budget: Option<TimeBudget>,
    #[serde(default)]
    pub specificity: Specificity,
    #[serde(default)]
    pub narrative: String,
    #[serde(default)]
    pub attempts: String,
    #[serde(default)]
    pub values: Vec<CoreValue>,
}

/// Validated intake. Every required categorical field is present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intake {
    pub grade: GradeBand,
    pub scale: GroupSize,
    pub scene: Setting,
    pub frequency: Frequency,
    pub urgency: Urgency,
    pub emotion: Emotion,
    pub subject: Option<Subject>,
    pub time_budget: Option<TimeBudget>,
    pub specificity: Specificity,
    pub narrative: String,
    pub attempts: String,
    pub values: Vec<CoreValue>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum IntakeError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("too many values selected: {selected} (max {max})")]
    TooManyValues { selected: usize, max: usize },

    #[error("attempts note is {len} characters (max {max})")]
    AttemptsTooLong { len: usize, max: usize },
}

impl IntakeForm {
    /// Checks the submission invariants and produces a validated [`Intake`].
    ///
    /// Duplicate value selections collapse to one before the count is checked.
    pub fn validate(self) -> Result<Intake, IntakeError> {
        let mut missing = Vec::new();
        if self.grade.is_none() {
            missing.push("grade");
        }
        if self.scale.is_none() {
            missing.push("scale");
        }
        if self.scene.is_none() {
            missing.push("scene");
        }
        if self.frequency.is_none() {
            missing.push("frequency");
        }
        if self.urgency.is_none() {
            missing.push("urgency");
        }
        if self.emotion.is_none() {
            missing.push("emotion");
        }

        let (
            Some(grade),
            Some(scale),
            Some(scene),
            Some(frequency),
            Some(urgency),
            Some(emotion),
        ) = (
            self.grade,
            self.scale,
            self.scene,
            self.frequency,
            self.urgency,
            self.emotion,
        )
        else {
            return Err(IntakeError::MissingFields(missing));
        };

        let mut values: Vec<CoreValue> = Vec::with_capacity(self.values.len());
        for value in self.values {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        if values.len() > MAX_SELECTED_VALUES {
            return Err(IntakeError::TooManyValues {
                selected: values.len(),
                max: MAX_SELECTED_VALUES,
            });
        }

        let attempts = self.attempts.trim().to_string();
        let attempts_len = attempts.chars().count();
        if attempts_len > MAX_ATTEMPTS_CHARS {
            return Err(IntakeError::AttemptsTooLong {
                len: attempts_len,
                max: MAX_ATTEMPTS_CHARS,
            });
        }

        Ok(Intake {
            grade,
            scale,
            scene,
            frequency,
            urgency,
            emotion,
            subject: self.subject,
            time_budget: self.time_budget,
            specificity: self.specificity,
            narrative: self.narrative.trim().to_string(),
            attempts,
            values,
        })
    }
}

impl Intake {
    pub fn subject_label(&self) -> &'static str {
        self.subject.map(Subject::label).unwrap_or(UNSPECIFIED_LABEL)
    }

    pub fn time_budget_label(&self) -> &'static str {
        self.time_budget
            .map(TimeBudget::label)
            .unwrap_or(UNSPECIFIED_LABEL)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn complete_form() -> IntakeForm {
        IntakeForm {
            grade: Some(GradeBand::Elementary34),
            scale: Some(GroupSize::Few),
            scene: Some(Setting::Recess),
            frequency: Some(Frequency::Ongoing),
            urgency: Some(Urgency::Medium),
            emotion: Some(Emotion::Worried),
            subject: None,
            time_budget: Some(TimeBudget::Minutes10),
            specificity: Specificity::Standard,
            narrative: "休み時間に一人で過ごすことが増えている。".to_string(),
            attempts: "個別に声をかけた".to_string(),
            values: vec![CoreValue::SafeAtmosphere, CoreValue::ListenClosely],
        }
    }

    #[test]
    fn test_complete_form_validates() {
        let intake = complete_form().validate().unwrap();
        assert_eq!(intake.grade, GradeBand::Elementary34);
        assert_eq!(intake.values.len(), 2);
        assert_eq!(intake.subject_label(), UNSPECIFIED_LABEL);
        assert_eq!(intake.time_budget_label(), "~10分");
    }

    #[test]
    fn test_missing_required_fields_are_listed() {
        let form = IntakeForm {
            grade: None,
            emotion: None,
            ..complete_form()
        };
        let err = form.validate().unwrap_err();
        assert_eq!(err, IntakeError::MissingFields(vec!["grade", "emotion"]));
        assert!(err.to_string().contains("grade, emotion"));
    }

    #[test]
    fn test_empty_form_lists_all_six_fields() {
        let err = IntakeForm::default().validate().unwrap_err();
        match err {
            IntakeError::MissingFields(fields) => assert_eq!(fields.len(), 6),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_five_values_rejected() {
        let form = IntakeForm {
            values: vec![
                CoreValue::FosterAutonomy,
                CoreValue::BuildConfidence,
                CoreValue::LetThemChoose,
                CoreValue::StretchTasks,
                CoreValue::EmbraceFailure,
            ],
            ..complete_form()
        };
        assert_eq!(
            form.validate().unwrap_err(),
            IntakeError::TooManyValues {
                selected: 5,
                max: MAX_SELECTED_VALUES
            }
        );
    }

    #[test]
    fn test_four_values_accepted() {
        let form = IntakeForm {
            values: CoreValue::ALL[..4].to_vec(),
            ..complete_form()
        };
        assert_eq!(form.validate().unwrap().values.len(), 4);
    }

    #[test]
    fn test_duplicate_values_collapse_before_count() {
        let form = IntakeForm {
            values: vec![
                CoreValue::PraiseProcess,
                CoreValue::PraiseProcess,
                CoreValue::PraiseProcess,
                CoreValue::PraiseProcess,
                CoreValue::AcceptAsTheyAre,
            ],
            ..complete_form()
        };
        let intake = form.validate().unwrap();
        assert_eq!(
            intake.values,
            vec![CoreValue::PraiseProcess, CoreValue::AcceptAsTheyAre]
        );
    }

    #[test]
    fn test_attempts_limit_counts_characters_not_bytes() {
        let ok = IntakeForm {
            attempts: "あ".repeat(MAX_ATTEMPTS_CHARS),
            ..complete_form()
        };
        assert!(ok.validate().is_ok());

        let too_long = IntakeForm {
            attempts: "あ".repeat(MAX_ATTEMPTS_CHARS + 1),
            ..complete_form()
        };
        assert!(matches!(
            too_long.validate(),
            Err(IntakeError::AttemptsTooLong { len: 101, .. })
        ));
    }

    #[test]
    fn test_form_deserializes_snake_case_identifiers() {
        let json = serde_json::json!({
            "grade": "junior_high",
            "scale": "whole_class",
            "scene": "in_class",
            "frequency": "chronic",
            "urgency": "high",
            "emotion": "helpless",
            "time_budget": "minutes5",
            "specificity": "high",
            "narrative": "授業中の私語が止まらない",
            "values": ["praise_process"]
        });
        let form: IntakeForm = serde_json::from_value(json).unwrap();
        let intake = form.validate().unwrap();
        assert_eq!(intake.specificity, Specificity::High);
        assert_eq!(intake.time_budget, Some(TimeBudget::Minutes5));
        assert!(intake.subject.is_none());
    }

    #[test]
    fn test_every_value_belongs_to_a_group() {
        for group in ValueGroup::ALL {
            let members = CoreValue::ALL
                .iter()
                .filter(|v| v.group() == group)
                .count();
            assert_eq!(members, 3, "group {:?} should hold three values", group);
        }
    }
}
