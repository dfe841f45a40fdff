use indexmap::IndexMap;

use crate::error::AppError;
use crate::genai::GenAiService;
use crate::models::ModelSummary;

pub const COMPARTMENT_REQUIRED: &str = "Please enter a Compartment ID first";

pub fn model_label(model: &ModelSummary) -> String {
  format!("{} ({})", model.display_name, model.vendor)
}

/// Label to model id, in listing order. A repeated label keeps its first
/// position and the last id.
pub fn model_catalog(items: &[ModelSummary]) -> IndexMap<String, String> {
  let mut catalog = IndexMap::with_capacity(items.len());
  for item in items {
    catalog.insert(model_label(item), item.id.clone());
  }
  catalog
}

pub async fn discover_models(
  service: &dyn GenAiService,
  profile: &str,
  compartment_id: &str,
) -> Result<IndexMap<String, String>, AppError> {
  let compartment_id = compartment_id.trim();
  if compartment_id.is_empty() {
    return Err(AppError::InputMissing(COMPARTMENT_REQUIRED.to_string()));
  }

  let items = service.list_models(profile, compartment_id).await?;
  let catalog = model_catalog(&items);
  tracing::info!(profile, compartment_id, count = catalog.len(), "listed models");
  Ok(catalog)
}
