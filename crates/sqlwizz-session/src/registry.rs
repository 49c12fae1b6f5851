//! Model registry.

use sqlwizz_core::{Error, Model, ModelNotFoundError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Receives models as they are declared.
///
/// Bootstrap code usually calls [`ModelRegistry::register`] directly; an
/// observer lets models declared later (plugins, lazily loaded modules)
/// reach the same registry.
pub trait ModelObserver {
    fn on_model_loaded(&mut self, model: Model);
}

/// Registered models, keyed by model name.
///
/// Grows monotonically; there is no removal.
#[derive(Debug, Default, Clone)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under its name.
    ///
    /// Returns `false` when nothing was registered: the model is abstract
    /// (no table), or the name is already taken. The first registration wins.
    pub fn register(&mut self, model: Model) -> bool {
        if model.is_abstract() {
            tracing::warn!(model = %model.name, "Skipping model without a table");
            return false;
        }
        if self.models.contains_key(&model.name) {
            tracing::warn!(model = %model.name, "Model already registered; keeping the first");
            return false;
        }
        tracing::debug!(model = %model.name, table = ?model.table_name, "Registered model");
        self.models.insert(model.name.clone(), Arc::new(model));
        true
    }

    pub fn get(&self, name: &str) -> Result<Arc<Model>> {
        self.models.get(name).cloned().ok_or_else(|| {
            Error::ModelNotFound(ModelNotFoundError {
                name: name.to_string(),
                registered: self.names(),
            })
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.keys().cloned().collect();
        names.sort();
        names
    }

    /// Registered models, sorted by name.
    pub fn models(&self) -> Vec<Arc<Model>> {
        let mut models: Vec<Arc<Model>> = self.models.values().cloned().collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));
        models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl ModelObserver for ModelRegistry {
    fn on_model_loaded(&mut self, model: Model) {
        self.register(model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlwizz_core::Field;

    fn film(title_field: &str) -> Model {
        Model::new("Film")
            .table("film")
            .field(Field::integer("film_id").primary_key())
            .field(Field::string(title_field))
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = ModelRegistry::new();
        assert!(registry.register(film("title")));
        assert!(!registry.register(film("name")));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("Film").unwrap().get_field("title").is_some());
    }

    #[test]
    fn test_abstract_models_are_skipped() {
        let mut registry = ModelRegistry::new();
        registry.on_model_loaded(Model::new("Base").field(Field::integer("id").primary_key()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_model_lists_registered_names() {
        let mut registry = ModelRegistry::new();
        registry.register(film("title"));
        match registry.get("Actor") {
            Err(Error::ModelNotFound(err)) => {
                assert_eq!(err.name, "Actor");
                assert_eq!(err.registered, vec!["Film".to_string()]);
            }
            other => panic!("expected ModelNotFound, got {:?}", other),
        }
    }
}
