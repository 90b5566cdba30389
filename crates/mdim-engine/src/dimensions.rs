//! Merge derived dimensions with hand-authored ones.
//!
//! Authored YAML supplies labels (names, descriptions, presentation) and a
//! preferred choice order; the data table supplies which choices exist.

use crate::error::Result;
use mdim_model::{Choice, Dimension, DimensionConfig, ModelError};
use std::collections::HashSet;

/// Combine derived dimensions with authored ones.
///
/// - Authored dimensions come first, in authored order, followed by derived
///   dimensions the YAML does not mention.
/// - For a dimension present on both sides, authored fields win and the
///   choice list is the union of both: authored choices first (in authored
///   order, missing labels filled from the derived choice), then derived-only
///   choices in derived order.
/// - An authored dimension with no derived counterpart is kept as written.
pub fn combine_dimensions(derived: &[Dimension], authored: &[DimensionConfig]) -> Result<Vec<Dimension>> {
    let mut seen = HashSet::new();
    let dups: Vec<String> = authored
        .iter()
        .filter(|d| !seen.insert(d.slug.as_str()))
        .map(|d| d.slug.clone())
        .collect();
    if !dups.is_empty() {
        return Err(ModelError::DuplicateDimension { slugs: dups }.into());
    }

    let mut combined = Vec::with_capacity(derived.len().max(authored.len()));
    for dim_config in authored {
        let merged = match derived.iter().find(|d| d.slug == dim_config.slug) {
            Some(auto) => merge_one(auto, dim_config),
            None => dim_config.to_dimension()?,
        };
        combined.push(merged);
    }
    for auto in derived {
        if !seen.contains(auto.slug.as_str()) {
            combined.push(auto.clone());
        }
    }
    Ok(combined)
}

fn merge_one(auto: &Dimension, authored: &DimensionConfig) -> Dimension {
    let choices = match &authored.choices {
        None => auto.choices.clone(),
        Some(authored_choices) => {
            let mut listed = HashSet::new();
            let mut choices: Vec<Choice> = authored_choices
                .iter()
                .filter(|c| listed.insert(c.slug.as_str()))
                .map(|c| c.resolve(auto.choice(&c.slug)))
                .collect();
            choices.extend(
                auto.choices
                    .iter()
                    .filter(|c| !listed.contains(c.slug.as_str()))
                    .cloned(),
            );
            choices
        }
    };

    Dimension {
        slug: auto.slug.clone(),
        name: authored.name.clone().unwrap_or_else(|| auto.name.clone()),
        description: authored
            .description
            .clone()
            .or_else(|| auto.description.clone()),
        choices,
        presentation: authored
            .presentation
            .clone()
            .unwrap_or_else(|| auto.presentation.clone()),
    }
}
