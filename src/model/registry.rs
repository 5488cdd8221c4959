use super::{ModelAdapter, SybilModel};
use crate::{Error, Result, config::ModelArgs};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub type ModelConstructor = Box<dyn Fn(&ModelArgs) -> Result<Arc<dyn ModelAdapter>> + Send + Sync>;

/// Maps model names to constructors.
pub struct ModelRegistry {
    constructors: BTreeMap<String, ModelConstructor>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry holding every model shipped with the server.
    pub fn with_builtin_models() -> Self {
        let mut registry = Self::new();
        registry.register(SybilModel::NAME, |args| {
            Ok(Arc::new(SybilModel::new(args)?) as Arc<dyn ModelAdapter>)
        });
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&ModelArgs) -> Result<Arc<dyn ModelAdapter>> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn build(&self, name: &str, args: &ModelArgs) -> Result<Arc<dyn ModelAdapter>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| Error::UnknownModel {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            })?;

        let model = constructor(args)?;
        info!("Model '{}' built (version: {})", name, model.version());
        Ok(model)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtin_models()
    }
}
