//! Combine several collections that share a dimension shape into one.
//!
//! Collections authored independently (one explorer per indicator family, say)
//! often reuse a choice slug with different labels: `all` is "All" in one and
//! "Both sexes" in another. Combining them must keep both meanings apart.
//!
//! ## Conflict resolution
//!
//! ```text
//!   (dimension, slug) group ──┬──► one flavour ──► keep slug as is
//!                             │
//!                             └──► several flavours ──► slug__0, slug__1, ...
//!                                                      (first-seen order)
//! ```
//!
//! A *flavour* is a distinct `(name, description)` pair. Flavour ids are
//! handed out in first-seen order (collection order, then choice order), so
//! re-running a combination always yields the same suffixes. Views of every
//! collection are then rewritten through that collection's own rename map.
//! Two sources that still produce the same view after renaming cannot be
//! combined.

use crate::error::{EngineError, Result};
use mdim_model::{Choice, Collection, Dimension, DimensionAssignment, View};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Knobs for [`combine_collections`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineOptions {
    /// Joins a conflicting slug and its flavour id.
    pub slug_separator: String,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            slug_separator: "__".to_string(),
        }
    }
}

/// One meaning of a conflicting slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceVariant {
    /// The disambiguated slug.
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    /// Collections whose choice had this meaning.
    pub collections: Vec<String>,
}

/// A slug that meant different things in different collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceConflict {
    pub dimension: String,
    pub slug: String,
    pub variants: Vec<ChoiceVariant>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombineReport {
    pub conflicts: Vec<ChoiceConflict>,
}

impl CombineReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CombinedCollection {
    pub collection: Collection,
    pub report: CombineReport,
}

/// A choice as it appears in one collection.
struct ChoiceRecord<'a> {
    collection: usize,
    dimension: usize,
    choice: &'a Choice,
    flavour: usize,
    group: usize,
}

/// All records sharing `(dimension, slug)`.
struct SlugGroup<'a> {
    dimension: usize,
    slug: &'a str,
    /// Distinct `(name, description)` pairs, first-seen order.
    flavours: Vec<(&'a str, Option<&'a str>)>,
}

impl SlugGroup<'_> {
    fn in_conflict(&self) -> bool {
        self.flavours.len() > 1
    }
}

pub fn combine_collections(
    collections: &[Collection],
    new_name: &str,
    options: &CombineOptions,
) -> Result<CombinedCollection> {
    if collections.len() < 2 {
        return Err(EngineError::TooFewCollections(collections.len()));
    }
    check_preconditions(collections)?;

    // Flatten to records and group them by (dimension, slug)
    let mut groups: Vec<SlugGroup<'_>> = Vec::new();
    let mut group_index: HashMap<(usize, &str), usize> = HashMap::new();
    let mut records: Vec<ChoiceRecord<'_>> = Vec::new();
    for (c, collection) in collections.iter().enumerate() {
        for (d, dim) in collection.dimensions.iter().enumerate() {
            for choice in &dim.choices {
                let g = *group_index
                    .entry((d, choice.slug.as_str()))
                    .or_insert_with(|| {
                        groups.push(SlugGroup {
                            dimension: d,
                            slug: choice.slug.as_str(),
                            flavours: Vec::new(),
                        });
                        groups.len() - 1
                    });
                let group = &mut groups[g];
                let flavour = match group.flavours.iter().position(|f| *f == choice.flavour()) {
                    Some(f) => f,
                    None => {
                        group.flavours.push(choice.flavour());
                        group.flavours.len() - 1
                    }
                };
                records.push(ChoiceRecord {
                    collection: c,
                    dimension: d,
                    choice,
                    flavour,
                    group: g,
                });
            }
        }
    }

    let final_slug = |record: &ChoiceRecord<'_>| -> String {
        if groups[record.group].in_conflict() {
            format!(
                "{}{}{}",
                record.choice.slug, options.slug_separator, record.flavour
            )
        } else {
            record.choice.slug.clone()
        }
    };

    // Per (collection, dimension): old slug -> new slug, renamed choices only
    let mut renames: HashMap<(usize, usize), HashMap<&str, String>> = HashMap::new();
    for record in &records {
        if groups[record.group].in_conflict() {
            renames
                .entry((record.collection, record.dimension))
                .or_default()
                .insert(record.choice.slug.as_str(), final_slug(record));
        }
    }

    // Rebuild each dimension as the union of its (renamed) choices
    let reference = &collections[0];
    let mut dimensions: Vec<Dimension> = Vec::with_capacity(reference.dimensions.len());
    for (d, template) in reference.dimensions.iter().enumerate() {
        let mut choices: Vec<Choice> = Vec::new();
        for record in records.iter().filter(|r| r.dimension == d) {
            let slug = final_slug(record);
            match choices.iter().find(|c| c.slug == slug) {
                Some(existing) if existing.flavour() == record.choice.flavour() => {}
                Some(_) => {
                    return Err(EngineError::ChoiceSlugCollision {
                        dimension: template.slug.clone(),
                        slug,
                    })
                }
                None => choices.push(Choice {
                    slug,
                    name: record.choice.name.clone(),
                    description: record.choice.description.clone(),
                }),
            }
        }
        dimensions.push(Dimension {
            choices,
            ..template.clone()
        });
    }

    // Rewrite views of collections that had renames, then concatenate
    let mut views: Vec<View> = Vec::new();
    let mut origin: HashMap<DimensionAssignment, usize> = HashMap::new();
    for (c, collection) in collections.iter().enumerate() {
        let touched = (0..collection.dimensions.len()).any(|d| renames.contains_key(&(c, d)));
        for view in &collection.views {
            let mut view = view.clone();
            if touched {
                for (d, dim) in collection.dimensions.iter().enumerate() {
                    let Some(map) = renames.get(&(c, d)) else {
                        continue;
                    };
                    if let Some(choice) = view.dimensions.get_mut(&dim.slug) {
                        if let Some(new_slug) = map.get(choice.as_str()) {
                            *choice = new_slug.clone();
                        }
                    }
                }
            }
            if let Some(&first) = origin.get(&view.dimensions) {
                return Err(EngineError::DuplicateCombinedView {
                    dimensions: view.dimensions_label(),
                    first: collections[first].short_name.clone(),
                    second: collection.short_name.clone(),
                });
            }
            origin.insert(view.dimensions.clone(), c);
            views.push(view);
        }
    }

    let report = build_report(collections, &groups, &records, &final_slug);
    for conflict in &report.conflicts {
        let variants: Vec<String> = conflict
            .variants
            .iter()
            .map(|v| format!("{} = {:?} from {:?}", v.slug, v.name, v.collections))
            .collect();
        tracing::warn!(
            dimension = %conflict.dimension,
            slug = %conflict.slug,
            variants = ?variants,
            "choice slug has different meanings across collections; renamed"
        );
    }
    tracing::info!(
        collection = new_name,
        sources = collections.len(),
        views = views.len(),
        conflicts = report.conflicts.len(),
        "combined collections"
    );

    let collection = Collection {
        short_name: new_name.to_string(),
        kind: reference.kind.clone(),
        dimensions,
        views,
    };
    Ok(CombinedCollection { collection, report })
}

fn check_preconditions(collections: &[Collection]) -> Result<()> {
    let mut ids = HashSet::new();
    for collection in collections {
        if !ids.insert(collection.short_name.as_str()) {
            return Err(EngineError::DuplicateCollectionId(collection.short_name.clone()));
        }
        if let Some(dim) = collection.dimensions.iter().find(|d| d.is_checkbox()) {
            return Err(EngineError::CheckboxUnsupported {
                collection: collection.short_name.clone(),
                dimension: dim.slug.clone(),
            });
        }
    }

    let reference = &collections[0];
    for other in &collections[1..] {
        let mismatch = |detail: String| EngineError::DimensionShapeMismatch {
            collection: other.short_name.clone(),
            reference: reference.short_name.clone(),
            detail,
        };
        if other.dimensions.len() != reference.dimensions.len() {
            return Err(mismatch(format!(
                "{} dimensions {:?} vs {} dimensions {:?}",
                other.dimensions.len(),
                other.dimension_slugs(),
                reference.dimensions.len(),
                reference.dimension_slugs(),
            )));
        }
        for (pos, (a, b)) in reference.dimensions.iter().zip(&other.dimensions).enumerate() {
            if a.same_shape(b) {
                continue;
            }
            let field = if a.slug != b.slug {
                "slug"
            } else if a.name != b.name {
                "name"
            } else if a.description != b.description {
                "description"
            } else {
                "presentation"
            };
            return Err(mismatch(format!(
                "dimension #{pos} (`{}` vs `{}`) differs in {field}",
                b.slug, a.slug
            )));
        }
    }
    Ok(())
}

fn build_report(
    collections: &[Collection],
    groups: &[SlugGroup<'_>],
    records: &[ChoiceRecord<'_>],
    final_slug: &dyn Fn(&ChoiceRecord<'_>) -> String,
) -> CombineReport {
    let mut conflicts = Vec::new();
    for (g, group) in groups.iter().enumerate() {
        if !group.in_conflict() {
            continue;
        }
        let mut variants: Vec<ChoiceVariant> = Vec::with_capacity(group.flavours.len());
        for (f, (name, description)) in group.flavours.iter().enumerate() {
            let members: Vec<&ChoiceRecord<'_>> = records
                .iter()
                .filter(|r| r.group == g && r.flavour == f)
                .collect();
            let Some(first) = members.first() else {
                continue;
            };
            let mut sources: Vec<String> = Vec::new();
            for r in &members {
                let id = &collections[r.collection].short_name;
                if !sources.contains(id) {
                    sources.push(id.clone());
                }
            }
            variants.push(ChoiceVariant {
                slug: final_slug(first),
                name: name.to_string(),
                description: description.map(str::to_string),
                collections: sources,
            });
        }
        conflicts.push(ChoiceConflict {
            dimension: collections[0].dimensions[group.dimension].slug.clone(),
            slug: group.slug.to_string(),
            variants,
        });
    }
    CombineReport { conflicts }
}
