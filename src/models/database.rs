//! Model database: the bundled dataset merged with an optional user overlay

use crate::error::{IoResultExt, PoleError, Result};
use crate::models::LlmModel;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Dataset compiled into the binary
const BUNDLED_MODELS: &str = include_str!("../../data/hf_models.json");

const BUNDLED_ORIGIN: &str = "bundled dataset";

/// All model records available for fit analysis
#[derive(Debug, Clone)]
pub struct ModelDatabase {
    models: Vec<LlmModel>,
}

impl ModelDatabase {
    /// Load the bundled dataset and merge `overlay` on top when given.
    ///
    /// A missing overlay is ignored silently and an unreadable or corrupt one
    /// is logged and ignored. Only a corrupt bundled dataset is an error.
    pub fn load(overlay: Option<&Path>) -> Result<Self> {
        let bundled = parse_models(BUNDLED_MODELS, BUNDLED_ORIGIN)?;
        let models = match overlay.and_then(load_overlay) {
            Some(extra) => merge_models(bundled, extra),
            None => bundled,
        };
        Ok(Self::from_models(models))
    }

    /// Bundled dataset only
    pub fn bundled() -> Result<Self> {
        Self::load(None)
    }

    /// Build a database from records already in memory
    pub fn from_models(models: Vec<LlmModel>) -> Self {
        let models = models.into_iter().map(backfill_active_parameters).collect();
        Self { models }
    }

    /// Every record, in dataset order
    pub fn all_models(&self) -> &[LlmModel] {
        &self.models
    }

    /// Records whose name, provider, or parameter count contains `query`
    /// (case-insensitive)
    pub fn find_model(&self, query: &str) -> Vec<&LlmModel> {
        let q = query.to_lowercase();
        self.models
            .iter()
            .filter(|m| {
                m.name.to_lowercase().contains(&q)
                    || m.provider.to_lowercase().contains(&q)
                    || m.parameter_count.to_lowercase().contains(&q)
            })
            .collect()
    }

    /// Exactly one record matching `query`. An exact name match wins over
    /// substring matches.
    pub fn find_unique(&self, query: &str) -> Result<&LlmModel> {
        let matches = self.find_model(query);
        if let Some(exact) = matches.iter().find(|m| m.name.eq_ignore_ascii_case(query)) {
            return Ok(*exact);
        }
        match matches.as_slice() {
            [] => Err(PoleError::ModelNotFound(query.to_string())),
            [only] => Ok(*only),
            many => Err(PoleError::AmbiguousModel {
                query: query.to_string(),
                matches: many.iter().map(|m| m.name.clone()).collect(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Per-user overlay location: `<config dir>/llmpole/models.json`
pub fn default_overlay_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("llmpole").join("models.json"))
}

/// Parse a JSON array of model records
pub fn parse_models(json: &str, origin: &str) -> Result<Vec<LlmModel>> {
    serde_json::from_str(json).map_err(|e| PoleError::dataset(origin, e.to_string()))
}

fn read_overlay(path: &Path) -> Result<Vec<LlmModel>> {
    let content = std::fs::read_to_string(path).with_path(path)?;
    parse_models(&content, &path.display().to_string())
}

fn load_overlay(path: &Path) -> Option<Vec<LlmModel>> {
    match read_overlay(path) {
        Ok(models) => {
            tracing::debug!("Loaded {} models from overlay {}", models.len(), path.display());
            Some(models)
        }
        Err(e) if e.is_not_found() => {
            tracing::debug!("No model overlay at {}", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Ignoring model overlay: {}", e);
            None
        }
    }
}

/// Merge overlay records into the base list by name: replacements keep the
/// base position, new names are appended in overlay order.
pub fn merge_models(base: Vec<LlmModel>, overlay: Vec<LlmModel>) -> Vec<LlmModel> {
    let mut merged = base;
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, m)| (m.name.clone(), i))
        .collect();
    for model in overlay {
        match index.get(&model.name) {
            Some(&i) => merged[i] = model,
            None => {
                index.insert(model.name.clone(), merged.len());
                merged.push(model);
            }
        }
    }
    merged
}

fn backfill_active_parameters(mut model: LlmModel) -> LlmModel {
    if model.is_moe && model.active_parameters.is_none() {
        model.active_parameters = model.estimated_active_parameters();
        if let Some(active) = model.active_parameters {
            tracing::debug!("Estimated {} active parameters for {}", active, model.name);
        }
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_model;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_bundled_dataset_parses() {
        let db = ModelDatabase::bundled().unwrap();
        assert!(db.len() >= 30);
        assert!(db.all_models().iter().any(|m| m.is_moe));
        assert!(db.all_models().iter().all(|m| !m.name.is_empty()));
    }

    #[test]
    fn test_bundled_moe_backfill() {
        let db = ModelDatabase::bundled().unwrap();
        let m = db.find_unique("Mixtral-8x22B").unwrap();
        let active = m.active_parameters.unwrap() as f64;
        let rough = 140.6e9 * 0.2875;
        assert!((active - rough).abs() / rough < 0.01);
        assert!(m.moe_active_vram_gb().is_some());
    }

    #[test]
    fn test_merge_replaces_in_place_and_appends() {
        let base = vec![test_model("a", "7B"), test_model("b", "7B"), test_model("c", "7B")];
        let mut b2 = test_model("b", "13B");
        b2.provider = "Overlay".to_string();
        let overlay = vec![test_model("d", "1B"), b2, test_model("e", "1B")];
        let merged = merge_models(base, overlay);
        let names: Vec<&str> = merged.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c", "d", "e"]);
        assert_eq!(merged[1].provider, "Overlay");
        assert_eq!(merged[1].parameter_count, "13B");
    }

    #[test]
    fn test_load_with_overlay_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name":"local/my-model","parameter_count":"3B","min_ram_gb":3,"recommended_ram_gb":4,"quantization":"Q4_K_M","context_length":4096,"extra_field":true}},
               {{"name":"Qwen/Qwen2.5-7B-Instruct","provider":"Mine","parameter_count":"7B","min_ram_gb":1,"recommended_ram_gb":2}}]"#
        )
        .unwrap();
        let bundled = ModelDatabase::bundled().unwrap();
        let db = ModelDatabase::load(Some(file.path())).unwrap();
        assert_eq!(db.len(), bundled.len() + 1);
        assert_eq!(db.all_models().last().unwrap().name, "local/my-model");
        let replaced = db.find_unique("Qwen/Qwen2.5-7B-Instruct").unwrap();
        assert_eq!(replaced.provider, "Mine");
        assert!(replaced.min_vram_gb.is_none());
    }

    #[test]
    fn test_missing_overlay_is_silent() {
        let dir = tempdir().unwrap();
        let db = ModelDatabase::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(db.len(), ModelDatabase::bundled().unwrap().len());
    }

    #[test]
    fn test_corrupt_overlay_falls_back() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let db = ModelDatabase::load(Some(file.path())).unwrap();
        assert_eq!(db.len(), ModelDatabase::bundled().unwrap().len());
    }

    #[test]
    fn test_parse_models_error_names_origin() {
        let err = parse_models("[1,2]", "custom.json").unwrap_err();
        assert!(err.to_string().contains("custom.json"));
    }

    #[test]
    fn test_find_model() {
        let db = ModelDatabase::from_models(vec![
            test_model("Qwen/Qwen2.5-7B", "7B"),
            test_model("Qwen/Qwen2.5-14B", "14B"),
            test_model("meta/Llama", "70B"),
        ]);
        assert_eq!(db.find_model("qwen").len(), 2);
        assert_eq!(db.find_model("70b").len(), 1);
        assert_eq!(db.find_model("test").len(), 3);
        assert!(db.find_model("nothing").is_empty());
    }

    #[test]
    fn test_find_unique() {
        let db = ModelDatabase::from_models(vec![
            test_model("org/model", "7B"),
            test_model("org/model-large", "14B"),
        ]);
        assert_eq!(db.find_unique("org/model").unwrap().name, "org/model");
        assert_eq!(db.find_unique("large").unwrap().name, "org/model-large");
        assert!(matches!(db.find_unique("zzz"), Err(PoleError::ModelNotFound(_))));
        match db.find_unique("org") {
            Err(PoleError::AmbiguousModel { matches, .. }) => assert_eq!(matches.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other.map(|m| &m.name)),
        }
    }
}
