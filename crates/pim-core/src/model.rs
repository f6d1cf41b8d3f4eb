//! Record types shared by the stores, the service layer, and clients.
//!
//! All types serialize to the flat JSON shapes the API boundary exchanges.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::validate::FieldErrors;

/// Store-assigned project identity.
pub type ProjectId = i64;
/// Store-assigned block identity.
pub type BlockId = i64;
/// Store-assigned template identity.
pub type TemplateId = i64;

// ============================================================================
// Projects
// ============================================================================

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ProjectStatus {
    Pending,
    Active,
    Archived,
}

impl ProjectStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(format!(
                "unknown status '{other}' (expected pending, active or archived)"
            )),
        }
    }
}

/// A project record.
///
/// `id` is `None` only for a client-side draft that has never been saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: Option<ProjectId>,
    pub meeting_name: String,
    pub client_name: String,
    pub job_number: String,
    pub description: String,
    pub resources: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<ProjectStatus>,
    pub meeting_type: String,
    pub attendees_expected: Option<u32>,
    pub attendees_actual: Option<u32>,
    pub est_budget: String,
    pub cost_per_attendee: String,
    pub precon_date: Option<String>,
    pub kickoff_date: Option<String>,
    pub custom: BTreeMap<String, String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Project {
    /// An empty, identity-less placeholder row.
    #[must_use]
    pub fn draft() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_draft(&self) -> bool {
        self.id.is_none()
    }
}

/// A partial set of project attributes, used for both create and update.
///
/// `None` leaves the attribute untouched. For optional dates and `status`,
/// an empty string clears the stored value; attendee counts are cleared by
/// an explicit `null` (`Some(None)`). `custom` entries are merged key by key
/// onto the existing map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFields {
    pub meeting_name: Option<String>,
    pub client_name: Option<String>,
    pub job_number: Option<String>,
    pub description: Option<String>,
    pub resources: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
    pub meeting_type: Option<String>,
    #[serde(with = "clearable", skip_serializing_if = "Option::is_none")]
    pub attendees_expected: Option<Option<u32>>,
    #[serde(with = "clearable", skip_serializing_if = "Option::is_none")]
    pub attendees_actual: Option<Option<u32>>,
    pub est_budget: Option<String>,
    pub cost_per_attendee: Option<String>,
    pub precon_date: Option<String>,
    pub kickoff_date: Option<String>,
    pub custom: Option<BTreeMap<String, String>>,
}

impl ProjectFields {
    /// Fields that only set a meeting name.
    #[must_use]
    pub fn named(meeting_name: impl Into<String>) -> Self {
        Self {
            meeting_name: Some(meeting_name.into()),
            ..Self::default()
        }
    }

    /// Merge these fields onto `base`.
    ///
    /// An unknown `status` leaves the stored status in place and is reported
    /// in the returned errors; all other rules are checked afterwards by
    /// [`crate::validate::ProjectValidator`] on the merged record.
    #[must_use]
    pub fn merge_into(&self, mut base: Project) -> (Project, FieldErrors) {
        fn set(target: &mut String, value: Option<&String>) {
            if let Some(v) = value {
                target.clone_from(v);
            }
        }
        fn set_optional(target: &mut Option<String>, value: Option<&String>) {
            if let Some(v) = value {
                let trimmed = v.trim();
                *target = (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
        }

        set(&mut base.meeting_name, self.meeting_name.as_ref());
        set(&mut base.client_name, self.client_name.as_ref());
        set(&mut base.job_number, self.job_number.as_ref());
        set(&mut base.description, self.description.as_ref());
        set(&mut base.resources, self.resources.as_ref());
        set(&mut base.meeting_type, self.meeting_type.as_ref());
        set(&mut base.est_budget, self.est_budget.as_ref());
        set(&mut base.cost_per_attendee, self.cost_per_attendee.as_ref());
        set_optional(&mut base.start_date, self.start_date.as_ref());
        set_optional(&mut base.end_date, self.end_date.as_ref());
        set_optional(&mut base.precon_date, self.precon_date.as_ref());
        set_optional(&mut base.kickoff_date, self.kickoff_date.as_ref());

        if let Some(count) = self.attendees_expected {
            base.attendees_expected = count;
        }
        if let Some(count) = self.attendees_actual {
            base.attendees_actual = count;
        }
        if let Some(custom) = &self.custom {
            for (key, value) in custom {
                base.custom.insert(key.clone(), value.clone());
            }
        }

        let mut errors = FieldErrors::new();
        if let Some(status) = &self.status {
            let status = status.trim();
            if status.is_empty() {
                base.status = None;
            } else {
                match status.parse() {
                    Ok(parsed) => base.status = Some(parsed),
                    Err(message) => errors.insert("status", message),
                }
            }
        }

        (base, errors)
    }
}

/// Serde adapter for a clearable optional value: a missing key is `None`
/// (untouched), `null` is `Some(None)` (clear).
mod clearable {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

impl From<&Project> for ProjectFields {
    /// Every attribute of `project`, as sent by a client saving a whole row.
    fn from(project: &Project) -> Self {
        Self {
            meeting_name: Some(project.meeting_name.clone()),
            client_name: Some(project.client_name.clone()),
            job_number: Some(project.job_number.clone()),
            description: Some(project.description.clone()),
            resources: Some(project.resources.clone()),
            start_date: Some(project.start_date.clone().unwrap_or_default()),
            end_date: Some(project.end_date.clone().unwrap_or_default()),
            status: Some(project.status.map(|s| s.to_string()).unwrap_or_default()),
            meeting_type: Some(project.meeting_type.clone()),
            attendees_expected: Some(project.attendees_expected),
            attendees_actual: Some(project.attendees_actual),
            est_budget: Some(project.est_budget.clone()),
            cost_per_attendee: Some(project.cost_per_attendee.clone()),
            precon_date: Some(project.precon_date.clone().unwrap_or_default()),
            kickoff_date: Some(project.kickoff_date.clone().unwrap_or_default()),
            custom: Some(project.custom.clone()),
        }
    }
}

// ============================================================================
// Elements and templates
// ============================================================================

/// Value type of a block or template element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ValueType {
    #[default]
    Text,
    Number,
    Date,
    Url,
}

impl ValueType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Url => "url",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "date" => Ok(Self::Date),
            "url" => Ok(Self::Url),
            other => Err(format!("unknown element type '{other}'")),
        }
    }
}

/// One key/value/type entry of a block.
///
/// In a template the same shape describes a field definition, with
/// `value` holding the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
}

impl Element {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            value_type,
        }
    }
}

/// A named, reusable block schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub title: String,
    pub elements: Vec<Element>,
}

/// A template definition as written in configuration, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSeed {
    pub title: String,
    #[serde(default)]
    pub elements: Vec<Element>,
}

// ============================================================================
// Blocks
// ============================================================================

/// What a block was built from: free-form, or stamped from a template.
///
/// Serializes as the string `"custom"` or as the template's integer id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlockType {
    #[default]
    Custom,
    Template(TemplateId),
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom => f.write_str("custom"),
            Self::Template(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "custom" {
            return Ok(Self::Custom);
        }
        s.parse::<TemplateId>()
            .map(Self::Template)
            .map_err(|_| format!("block type must be \"custom\" or a template id, got '{s}'"))
    }
}

impl Serialize for BlockType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Custom => serializer.serialize_str("custom"),
            Self::Template(id) => serializer.serialize_i64(*id),
        }
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BlockTypeVisitor;

        impl Visitor<'_> for BlockTypeVisitor {
            type Value = BlockType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("\"custom\" or a template id")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<BlockType, E> {
                Ok(BlockType::Template(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<BlockType, E> {
                TemplateId::try_from(v)
                    .map(BlockType::Template)
                    .map_err(|_| E::custom("template id out of range"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<BlockType, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(BlockTypeVisitor)
    }
}

/// An ordered collection of elements attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub elements: Vec<Element>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Input for creating a block from scratch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBlock {
    pub title: String,
    #[serde(rename = "type", default)]
    pub block_type: BlockType,
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// Input for stamping a block from a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromTemplate {
    pub template_id: TemplateId,
    #[serde(default)]
    pub title: Option<String>,
}
