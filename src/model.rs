//! The practice / group / instruction graph read by the consolidation engine.
//!
//! Everything here is immutable once built. Groups and instructions are shared
//! through `Arc` because the same group is usually linked to several practices,
//! and the same instruction to several groups.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

// ------------- Identities -------------
pub type PracticeId = i64;
pub type GroupId = i64;
pub type InstructionId = i64;

// ------------- UrineType -------------
/// Urine collection protocol required by a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum UrineType {
    #[serde(rename = "PRIMERA_ORINA")]
    FirstMorning,
    #[serde(rename = "ORINA_2H")]
    TwoHour,
    #[serde(rename = "ORINA_12H")]
    TwelveHour,
    #[serde(rename = "ORINA_24H")]
    TwentyFourHour,
}

impl UrineType {
    /// Hours value stored for first-morning urine, which is not a duration.
    pub const FIRST_MORNING_HOURS: i64 = -1;

    pub const ALL: [UrineType; 4] = [
        UrineType::FirstMorning,
        UrineType::TwoHour,
        UrineType::TwelveHour,
        UrineType::TwentyFourHour,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            UrineType::FirstMorning => "PRIMERA_ORINA",
            UrineType::TwoHour => "ORINA_2H",
            UrineType::TwelveHour => "ORINA_12H",
            UrineType::TwentyFourHour => "ORINA_24H",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label.trim())
    }

    /// Collection hours paired with the type.
    pub fn hours(&self) -> i64 {
        match self {
            UrineType::FirstMorning => Self::FIRST_MORNING_HOURS,
            UrineType::TwoHour => 2,
            UrineType::TwelveHour => 12,
            UrineType::TwentyFourHour => 24,
        }
    }

    /// The type a stored hours value stands for, if any.
    pub fn from_hours(hours: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.hours() == hours)
    }
}

impl fmt::Display for UrineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ------------- Category -------------
/// Category tag of an instruction. Drives the presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    #[serde(rename = "AYUNO")]
    Fasting,
    #[serde(rename = "HORARIO")]
    Schedule,
    /// Date of the last menstrual period.
    #[serde(rename = "FUM")]
    MenstrualDate,
    #[serde(rename = "MEDICACION")]
    Medication,
    #[serde(rename = "ORINA")]
    Urine,
    #[serde(rename = "MATERIA_FECAL")]
    Stool,
    #[serde(rename = "GENERAL")]
    General,
    #[serde(rename = "RESTRICCION")]
    Restriction,
    #[serde(rename = "SIN_CATEGORIA")]
    Uncategorized,
}

impl Category {
    /// Rank used for presentation, lower comes first.
    pub const OTHER_RANK: u8 = 99;

    pub const ALL: [Category; 9] = [
        Category::Fasting,
        Category::Schedule,
        Category::MenstrualDate,
        Category::Medication,
        Category::Urine,
        Category::Stool,
        Category::General,
        Category::Restriction,
        Category::Uncategorized,
    ];

    pub fn rank(&self) -> u8 {
        match self {
            Category::Fasting => 1,
            Category::Schedule => 2,
            Category::MenstrualDate => 3,
            Category::Medication => 4,
            Category::Urine => 5,
            Category::Stool => 6,
            Category::General => 7,
            Category::Restriction | Category::Uncategorized => Self::OTHER_RANK,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Fasting => "AYUNO",
            Category::Schedule => "HORARIO",
            Category::MenstrualDate => "FUM",
            Category::Medication => "MEDICACION",
            Category::Urine => "ORINA",
            Category::Stool => "MATERIA_FECAL",
            Category::General => "GENERAL",
            Category::Restriction => "RESTRICCION",
            Category::Uncategorized => "SIN_CATEGORIA",
        }
    }

    /// Maps a stored label to its category. A missing or blank label is the
    /// uncategorized default; an unknown label yields `None`.
    pub fn from_label(label: Option<&str>) -> Option<Self> {
        match label.map(str::trim) {
            None | Some("") => Some(Category::Uncategorized),
            Some(l) => Self::ALL.into_iter().find(|c| c.label() == l),
        }
    }

    /// The value written to storage, `None` for the uncategorized default.
    pub fn stored_label(&self) -> Option<&'static str> {
        match self {
            Category::Uncategorized => None,
            other => Some(other.label()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ------------- Instruction -------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    id: InstructionId,
    #[serde(rename = "texto")]
    text: String,
    #[serde(rename = "tipo")]
    category: Category,
    #[serde(rename = "orden")]
    order: i64,
}

impl Instruction {
    pub fn new(id: InstructionId, text: impl Into<String>, category: Category, order: i64) -> Self {
        Self {
            id,
            text: text.into(),
            category,
            order,
        }
    }
    pub fn id(&self) -> InstructionId {
        self.id
    }
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn category(&self) -> Category {
        self.category
    }
    /// Default ordering hint of the instruction itself.
    pub fn order(&self) -> i64 {
        self.order
    }
    /// Key under which two instructions count as the same directive.
    pub fn dedup_key(&self) -> String {
        self.text.trim().to_lowercase()
    }
}

// ------------- Group -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    id: GroupId,
    name: String,
    description: Option<String>,
    fasting_hours: Option<u32>,
    urine_type: Option<UrineType>,
    // already in display order
    instructions: Vec<Arc<Instruction>>,
}

impl Group {
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            fasting_hours: None,
            urine_type: None,
            instructions: Vec::new(),
        }
    }
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
    pub fn with_fasting_hours(mut self, hours: Option<u32>) -> Self {
        self.fasting_hours = hours;
        self
    }
    pub fn with_urine_type(mut self, urine_type: Option<UrineType>) -> Self {
        self.urine_type = urine_type;
        self
    }
    pub fn with_instructions(mut self, instructions: Vec<Arc<Instruction>>) -> Self {
        self.instructions = instructions;
        self
    }
    pub fn id(&self) -> GroupId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Staff-facing note, never rendered to the patient.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    pub fn fasting_hours(&self) -> Option<u32> {
        self.fasting_hours
    }
    pub fn urine_type(&self) -> Option<UrineType> {
        self.urine_type
    }
    pub fn urine_hours(&self) -> Option<i64> {
        self.urine_type.map(|t| t.hours())
    }
    pub fn instructions(&self) -> &[Arc<Instruction>] {
        &self.instructions
    }
}

// ------------- Practice -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Practice {
    id: PracticeId,
    name: String,
    code: Option<String>,
    area: Option<String>,
    groups: Vec<Arc<Group>>,
}

impl Practice {
    pub fn new(id: PracticeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            code: None,
            area: None,
            groups: Vec::new(),
        }
    }
    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }
    pub fn with_area(mut self, area: Option<String>) -> Self {
        self.area = area;
        self
    }
    pub fn with_groups(mut self, groups: Vec<Arc<Group>>) -> Self {
        self.groups = groups;
        self
    }
    pub fn id(&self) -> PracticeId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
    /// Laboratory section the practice belongs to.
    pub fn area(&self) -> Option<&str> {
        self.area.as_deref()
    }
    /// Active group links only; inactive ones never reach the graph.
    pub fn groups(&self) -> &[Arc<Group>] {
        &self.groups
    }
    pub fn summary(&self) -> PracticeSummary {
        PracticeSummary {
            id: self.id,
            name: self.name.clone(),
            code: self.code.clone(),
            area: self.area.clone(),
        }
    }
}

/// Identity of a practice as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PracticeSummary {
    pub id: PracticeId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "codigo", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}
