//! Build a finished collection from an authored config and, optionally, the
//! dimensions/views expanded from a table.

use crate::common::CommonViewConfig;
use crate::dimensions::combine_dimensions;
use crate::error::Result;
use crate::expand::ExpandedConfig;
use mdim_model::{Collection, CollectionConfig, TableLookup};

/// Run the full pipeline: combine dimensions, concatenate views (authored
/// first), expand indicator paths, apply common view rules, validate.
pub fn assemble(
    short_name: &str,
    config: &CollectionConfig,
    expanded: Option<ExpandedConfig>,
    lookup: &TableLookup,
) -> Result<Collection> {
    let common = CommonViewConfig::new(config.common_views.clone())?;

    let (derived_dims, derived_views) = match expanded {
        Some(e) => (e.dimensions, e.views),
        None => (Vec::new(), Vec::new()),
    };
    let dimensions = combine_dimensions(&derived_dims, &config.dimensions)?;

    let mut views = config.views.clone();
    views.extend(derived_views);

    let mut collection = Collection::new(short_name, dimensions, views).with_kind(config.kind());
    collection.expand_paths(lookup)?;

    for view in &mut collection.views {
        let merged = common.merge(&view.dimensions, view.config.as_ref())?;
        view.config = if merged.is_empty() { None } else { Some(merged) };
    }

    collection.validate()?;
    tracing::debug!(
        collection = short_name,
        dimensions = collection.dimensions.len(),
        views = collection.views.len(),
        common_rules = common.rules().len(),
        "assembled collection"
    );
    Ok(collection)
}
