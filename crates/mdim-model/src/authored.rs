//! Hand-authored collection configuration, as parsed from YAML.
//!
//! Authored dimensions are partial: a YAML file usually only renames a few
//! choices or adds descriptions, and leaves the choice set to whatever the
//! data table provides.

use crate::collection::CollectionKind;
use crate::config::ConfigMap;
use crate::dimension::{Choice, Dimension, Presentation};
use crate::error::{ModelError, Result};
use crate::view::{DimensionAssignment, View};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceConfig {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ChoiceConfig {
    /// Fill missing labels from a derived choice with the same slug.
    pub fn resolve(&self, derived: Option<&Choice>) -> Choice {
        Choice {
            slug: self.slug.clone(),
            name: self
                .name
                .clone()
                .or_else(|| derived.map(|c| c.name.clone()))
                .unwrap_or_else(|| self.slug.clone()),
            description: self
                .description
                .clone()
                .or_else(|| derived.and_then(|c| c.description.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionConfig {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<ChoiceConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<Presentation>,
}

impl DimensionConfig {
    /// Turn an authored dimension with no derived counterpart into a full one.
    pub fn to_dimension(&self) -> Result<Dimension> {
        let name = self
            .name
            .clone()
            .ok_or_else(|| ModelError::MissingDimensionName(self.slug.clone()))?;
        Ok(Dimension {
            slug: self.slug.clone(),
            name,
            description: self.description.clone(),
            choices: self
                .choices
                .iter()
                .flatten()
                .map(|c| c.resolve(None))
                .collect(),
            presentation: self.presentation.clone().unwrap_or_default(),
        })
    }
}

/// One "common view" rule: a partial dimension assignment and the config
/// fragment to apply to every view that matches it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonOverrideRule {
    #[serde(default)]
    pub dimensions: DimensionAssignment,
    #[serde(default)]
    pub config: ConfigMap,
}

impl CommonOverrideRule {
    pub fn new(dimensions: DimensionAssignment, config: ConfigMap) -> Self {
        Self { dimensions, config }
    }

    pub fn specificity(&self) -> usize {
        self.dimensions.len()
    }

    pub fn matches(&self, active: &DimensionAssignment) -> bool {
        self.dimensions
            .iter()
            .all(|(dim, choice)| active.get(dim) == Some(choice))
    }
}

/// A collection file as written by an author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<ConfigMap>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_selection: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topic_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigMap>,
    #[serde(default)]
    pub dimensions: Vec<DimensionConfig>,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_views: Vec<CommonOverrideRule>,
}

impl CollectionConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
    }

    /// A file with a `title` block describes an indicator page; anything else
    /// is an explorer.
    pub fn kind(&self) -> CollectionKind {
        match &self.title {
            Some(title) => CollectionKind::Mdim {
                title: title.clone(),
                default_selection: self.default_selection.clone(),
                topic_tags: self.topic_tags.clone(),
            },
            None => CollectionKind::Explorer {
                config: self.config.clone().unwrap_or_default(),
            },
        }
    }
}
