//! In-memory entity instances.

use crate::error::{Error, RelationNotFoundError, Result};
use crate::field::Field;
use crate::model::Model;
use crate::relationship::Relation;
use crate::value::Value;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Entity-owned copy of a field template plus its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub field: Field,
    pub value: Value,
}

/// What has been loaded for one relation of an entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RelationData {
    /// Nothing loaded (opted out, or never requested)
    #[default]
    Unloaded,
    /// Many-to-one target; `None` when the foreign key is NULL or dangling
    One(Option<Box<Entity>>),
    /// One-to-many or many-to-many collection
    Many(Vec<Entity>),
    /// Eager aggregate over a collection
    Aggregate(Value),
}

/// Entity-owned copy of a relation template plus its loaded data.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationValue {
    pub relation: Relation,
    pub data: RelationData,
}

/// One row of a model, with its relations.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    model: Arc<Model>,
    fields: Vec<FieldValue>,
    relations: Vec<RelationValue>,
}

impl Entity {
    /// Create an entity with every field NULL and every relation unloaded.
    pub fn new(model: Arc<Model>) -> Self {
        let fields = model
            .fields
            .iter()
            .map(|field| FieldValue {
                field: field.clone(),
                value: Value::Null,
            })
            .collect();
        let relations = model
            .relations
            .iter()
            .map(|relation| RelationValue {
                relation: relation.clone(),
                data: RelationData::Unloaded,
            })
            .collect();
        Self {
            model,
            fields,
            relations,
        }
    }

    /// Set a field while building an entity.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Shared handle to the model this entity was built from.
    pub fn model_arc(&self) -> Arc<Model> {
        Arc::clone(&self.model)
    }

    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    pub fn relations(&self) -> &[RelationValue] {
        &self.relations
    }

    /// Current value of a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|slot| slot.field.name == name)
            .map(|slot| &slot.value)
    }

    /// Overwrite a field value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let slot = self
            .fields
            .iter_mut()
            .find(|slot| slot.field.name == name)
            .ok_or_else(|| {
                Error::config(format!("model '{}' has no field '{}'", self.model.name, name))
            })?;
        slot.value = value.into();
        Ok(())
    }

    /// Primary key value.
    pub fn id(&self) -> Result<&Value> {
        let name = self.model.id_field_name()?;
        self.get(name)
            .ok_or_else(|| Error::config(format!("model '{}' has no field '{}'", self.model.name, name)))
    }

    /// Loaded data of a relation.
    pub fn relation(&self, name: &str) -> Option<&RelationData> {
        self.relations
            .iter()
            .find(|slot| slot.relation.name == name)
            .map(|slot| &slot.data)
    }

    /// Replace the loaded data of a relation.
    pub fn set_relation(&mut self, name: &str, data: RelationData) -> Result<()> {
        let model = &self.model.name;
        let slot = self
            .relations
            .iter_mut()
            .find(|slot| slot.relation.name == name)
            .ok_or_else(|| {
                Error::RelationNotFound(RelationNotFoundError {
                    model: model.clone(),
                    relation: name.to_string(),
                })
            })?;
        slot.data = data;
        Ok(())
    }

    /// Loaded many-to-one target.
    pub fn related(&self, name: &str) -> Option<&Entity> {
        match self.relation(name)? {
            RelationData::One(Some(entity)) => Some(entity),
            _ => None,
        }
    }

    /// Loaded collection.
    pub fn related_many(&self, name: &str) -> Option<&[Entity]> {
        match self.relation(name)? {
            RelationData::Many(entities) => Some(entities),
            _ => None,
        }
    }

    /// Loaded aggregate value.
    pub fn aggregate(&self, name: &str) -> Option<&Value> {
        match self.relation(name)? {
            RelationData::Aggregate(value) => Some(value),
            _ => None,
        }
    }

    /// Serialize fields and loaded relations to JSON. Unloaded relations are omitted.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for slot in &self.fields {
            map.insert(slot.field.name.clone(), slot.value.to_json());
        }
        for slot in &self.relations {
            let json = match &slot.data {
                RelationData::Unloaded => continue,
                RelationData::One(None) => serde_json::Value::Null,
                RelationData::One(Some(entity)) => entity.to_json(),
                RelationData::Many(entities) => {
                    serde_json::Value::Array(entities.iter().map(Entity::to_json).collect())
                }
                RelationData::Aggregate(value) => value.to_json(),
            };
            map.insert(slot.relation.name.clone(), json);
        }
        serde_json::Value::Object(map)
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.model.name)?;
        for (i, slot) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", slot.field.name, slot.value)?;
        }
        write!(f, ")")
    }
}
