//! Decodes JSON:API documents and flattens their resources into plain JSON
//! objects that typed records can be deserialized from.
//!
//! A flattened resource carries `type`, `id`, every attribute at the top
//! level, and each relationship replaced by the matching resource from the
//! document (usually from `included`). Relationships whose target isn't in the
//! document become bare `{type, id}` stubs. A relationship identifier's `meta`
//! object (image alt text, for instance) is exposed on the target as
//! `resourceIdObjMeta`.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;

/// The key under which a relationship identifier's `meta` is exposed.
pub const IDENTIFIER_META_KEY: &str = "resourceIdObjMeta";

/// A top-level JSON:API document.
#[derive(Deserialize, Debug)]
pub struct Document {
    #[serde(default)]
    pub data: Option<PrimaryData>,

    #[serde(default)]
    pub included: Vec<Resource>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<Resource>),
    One(Box<Resource>),
}

#[derive(Deserialize, Clone, Debug)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,

    pub id: String,

    #[serde(default)]
    pub attributes: Map<String, Value>,

    #[serde(default)]
    pub relationships: Map<String, Value>,
}

#[derive(Deserialize, Debug)]
struct Relationship {
    #[serde(default)]
    data: Option<Linkage>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Linkage {
    Many(Vec<Identifier>),
    One(Identifier),
}

#[derive(Deserialize, Debug)]
struct Identifier {
    #[serde(rename = "type")]
    kind: String,
    id: String,
    #[serde(default)]
    meta: Option<Value>,
}

impl Document {
    pub fn from_str(input: &str) -> serde_json::Result<Document> {
        serde_json::from_str(input)
    }

    /// Flattens a collection document. A single-resource document yields one
    /// record and a `null` primary data yields none.
    pub fn into_records(self) -> Result<Vec<Value>> {
        let resolver = Resolver::new(&self);
        Ok(match &self.data {
            None => Vec::new(),
            Some(PrimaryData::One(resource)) => vec![resolver.flatten(resource)?],
            Some(PrimaryData::Many(resources)) => resources
                .iter()
                .map(|resource| resolver.flatten(resource))
                .collect::<Result<Vec<Value>>>()?,
        })
    }

    /// Flattens a single-resource document.
    pub fn into_record(self) -> Result<Value> {
        let resolver = Resolver::new(&self);
        match &self.data {
            Some(PrimaryData::One(resource)) => resolver.flatten(resource),
            Some(PrimaryData::Many(_)) => Err(DocumentError(
                "expected a single resource, found a collection".to_owned(),
            )),
            None => Err(DocumentError("document has no primary data".to_owned())),
        }
    }
}

/// Looks up the resources of one document by `(type, id)`.
struct Resolver<'a> {
    resources: HashMap<Key, &'a Resource>,

    // Flattened relationship targets, so a resource shared by many others
    // is expanded once. Expansions that hit a cycle aren't kept: where the
    // cycle is cut depends on the path.
    flattened: RefCell<HashMap<Key, Value>>,
    cuts: Cell<usize>,
}

type Key = (String, String);

fn key(kind: &str, id: &str) -> Key {
    (kind.to_owned(), id.to_owned())
}

impl<'a> Resolver<'a> {
    fn new(document: &'a Document) -> Resolver<'a> {
        let mut resources = HashMap::new();
        let primary: Vec<&Resource> = match &document.data {
            None => Vec::new(),
            Some(PrimaryData::One(resource)) => vec![resource.as_ref()],
            Some(PrimaryData::Many(many)) => many.iter().collect(),
        };
        for resource in primary.into_iter().chain(document.included.iter()) {
            resources
                .entry(key(&resource.kind, &resource.id))
                .or_insert(resource);
        }
        Resolver {
            resources,
            flattened: RefCell::new(HashMap::new()),
            cuts: Cell::new(0),
        }
    }

    fn flatten(&self, resource: &'a Resource) -> Result<Value> {
        let mut path = Vec::new();
        self.flatten_on_path(resource, &mut path)
    }

    // `path` holds the resources currently being expanded. Meeting one of them
    // again means the relationships form a cycle, which is cut with a stub.
    fn flatten_on_path(
        &self,
        resource: &'a Resource,
        path: &mut Vec<Key>,
    ) -> Result<Value> {
        path.push(key(&resource.kind, &resource.id));

        let mut object = resource.attributes.clone();
        object.insert("type".to_owned(), Value::String(resource.kind.clone()));
        object.insert("id".to_owned(), Value::String(resource.id.clone()));

        for (name, raw) in &resource.relationships {
            let relationship: Relationship =
                serde_json::from_value(raw.clone()).map_err(|e| {
                    DocumentError(format!(
                        "relationship `{}` of {} `{}`: {}",
                        name, resource.kind, resource.id, e
                    ))
                })?;
            let value = match relationship.data {
                None => Value::Null,
                Some(Linkage::One(identifier)) => self.resolve(&identifier, path)?,
                Some(Linkage::Many(identifiers)) => Value::Array(
                    identifiers
                        .iter()
                        .map(|identifier| self.resolve(identifier, path))
                        .collect::<Result<Vec<Value>>>()?,
                ),
            };
            object.insert(name.clone(), value);
        }

        path.pop();
        Ok(Value::Object(object))
    }

    fn resolve(
        &self,
        identifier: &Identifier,
        path: &mut Vec<Key>,
    ) -> Result<Value> {
        let target_key = key(&identifier.kind, &identifier.id);
        let mut value = match self.resources.get(&target_key) {
            Some(_) if path.contains(&target_key) => {
                self.cuts.set(self.cuts.get() + 1);
                stub(&identifier.kind, &identifier.id)
            }
            Some(&target) => {
                let cached = self.flattened.borrow().get(&target_key).cloned();
                match cached {
                    Some(value) => value,
                    None => {
                        let cuts = self.cuts.get();
                        let value = self.flatten_on_path(target, path)?;
                        if self.cuts.get() == cuts {
                            self.flattened.borrow_mut().insert(target_key, value.clone());
                        }
                        value
                    }
                }
            }
            None => stub(&identifier.kind, &identifier.id),
        };
        if let (Some(meta), Value::Object(object)) = (&identifier.meta, &mut value) {
            object.insert(IDENTIFIER_META_KEY.to_owned(), meta.clone());
        }
        Ok(value)
    }
}

fn stub(kind: &str, id: &str) -> Value {
    let mut object = Map::new();
    object.insert("type".to_owned(), Value::String(kind.to_owned()));
    object.insert("id".to_owned(), Value::String(id.to_owned()));
    Value::Object(object)
}

pub type Result<T> = std::result::Result<T, DocumentError>;

/// Returned when a document is well-formed JSON but not the JSON:API shape we
/// expected.
#[derive(Debug)]
pub struct DocumentError(pub String);

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed JSON:API document: {}", &self.0)
    }
}

impl std::error::Error for DocumentError {}
