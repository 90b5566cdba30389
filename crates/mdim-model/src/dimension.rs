//! Dimensions and their choices.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One selectable value of a dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Choice {
    pub slug: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Choice {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The attributes that define a choice's meaning besides its slug.
    pub fn flavour(&self) -> (&str, Option<&str>) {
        (self.name.as_str(), self.description.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiType {
    #[default]
    Dropdown,
    Radio,
    Checkbox,
}

impl UiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UiType::Dropdown => "dropdown",
            UiType::Radio => "radio",
            UiType::Checkbox => "checkbox",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(default)]
    pub ui_type: UiType,
    /// Only meaningful for checkboxes: the choice that stands for "checked".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkbox_true_choice_slug: Option<String>,
}

impl Presentation {
    pub fn checkbox(true_choice_slug: impl Into<String>) -> Self {
        Self {
            ui_type: UiType::Checkbox,
            checkbox_true_choice_slug: Some(true_choice_slug.into()),
        }
    }
}

/// A named axis of variation with an ordered set of choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub slug: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub presentation: Presentation,
}

impl Dimension {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            description: None,
            choices,
            presentation: Presentation::default(),
        }
    }

    pub fn is_checkbox(&self) -> bool {
        self.presentation.ui_type == UiType::Checkbox
    }

    pub fn choice_slugs(&self) -> Vec<&str> {
        self.choices.iter().map(|c| c.slug.as_str()).collect()
    }

    pub fn choice(&self, slug: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.slug == slug)
    }

    pub fn has_choice(&self, slug: &str) -> bool {
        self.choice(slug).is_some()
    }

    /// Whether two dimensions agree on everything except their choice lists.
    pub fn same_shape(&self, other: &Dimension) -> bool {
        self.slug == other.slug
            && self.name == other.name
            && self.description == other.description
            && self.presentation == other.presentation
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut dups: Vec<String> = Vec::new();
        for choice in &self.choices {
            if !seen.insert(choice.slug.as_str()) && !dups.contains(&choice.slug) {
                dups.push(choice.slug.clone());
            }
        }
        if !dups.is_empty() {
            return Err(ModelError::DuplicateChoice {
                dimension: self.slug.clone(),
                slugs: dups,
            });
        }

        if self.is_checkbox() {
            let Some(true_slug) = &self.presentation.checkbox_true_choice_slug else {
                return Err(ModelError::InvalidCheckbox {
                    dimension: self.slug.clone(),
                    reason: "checkbox_true_choice_slug is not set".to_string(),
                });
            };
            match self.choices.as_slice() {
                [] => {}
                [only] if &only.slug == true_slug => {}
                [only] => {
                    return Err(ModelError::InvalidCheckbox {
                        dimension: self.slug.clone(),
                        reason: format!(
                            "listed choice `{}` is not the true choice `{true_slug}`",
                            only.slug
                        ),
                    })
                }
                many => {
                    return Err(ModelError::InvalidCheckbox {
                        dimension: self.slug.clone(),
                        reason: format!("expected one choice, found {}", many.len()),
                    })
                }
            }
        } else if self.presentation.checkbox_true_choice_slug.is_some() {
            return Err(ModelError::InvalidCheckbox {
                dimension: self.slug.clone(),
                reason: format!(
                    "checkbox_true_choice_slug set on a {} dimension",
                    self.presentation.ui_type.as_str()
                ),
            });
        }
        Ok(())
    }
}
