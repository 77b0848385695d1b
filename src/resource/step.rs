//! Enumeration Step
//!
//! Lists every remote object of one resource kind and normalizes each into
//! a [`Resource`]. A step either returns its whole output or the first
//! error; partial output never leaves this module.

use super::composite::composite_id;
use super::cursor::{Cursor, Page, PageSource};
use super::descriptor::Resource;
use super::registry::{GeneratorDef, ListingDef, ParentDef, ParentSource, StepDef};
use crate::client::ServiceClient;
use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;

/// Accepted raw objects of completed steps, keyed by kind
pub type RawObjects = HashMap<String, Vec<Value>>;

/// What a successful step produced
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub resources: Vec<Resource>,
    /// Raw objects behind `resources`, same order; later steps may fan out over them
    pub raw: Vec<Value>,
}

/// [`PageSource`] backed by one remote list operation
pub struct ListingSource<'a> {
    client: &'a dyn ServiceClient,
    listing: &'a ListingDef,
    params: Map<String, Value>,
}

impl<'a> ListingSource<'a> {
    /// `bound` params are layered over the listing's static params
    pub fn new(
        client: &'a dyn ServiceClient,
        listing: &'a ListingDef,
        bound: Map<String, Value>,
    ) -> Self {
        let mut params = match &listing.params {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        params.extend(bound);

        Self {
            client,
            listing,
            params,
        }
    }
}

#[async_trait]
impl<'a> PageSource for ListingSource<'a> {
    async fn fetch_page(&self, token: Option<String>) -> Result<Page> {
        let mut params = self.params.clone();
        if let (Some(token), Some(pagination)) = (token, &self.listing.pagination) {
            params.insert(pagination.request_param.clone(), Value::String(token));
        }

        let operation = &self.listing.operation;
        let response = self
            .client
            .invoke(operation, &Value::Object(params))
            .await?;

        let items = extract_items(&response, &self.listing.response_path, operation)?;
        let next_token = self
            .listing
            .pagination
            .as_ref()
            .and_then(|p| field_str(&response, &p.response_field));

        Ok(Page { items, next_token })
    }

    fn operation(&self) -> &str {
        &self.listing.operation
    }
}

/// Run one step against `client`.
///
/// `earlier` holds the raw objects of the steps that already completed in
/// the same generator run.
pub async fn enumerate(
    def: &GeneratorDef,
    step: &StepDef,
    client: &dyn ServiceClient,
    earlier: &RawObjects,
) -> Result<StepOutput> {
    let mut output = StepOutput::default();

    let Some(parent) = &step.parent else {
        collect_listing(def, step, client, Map::new(), &mut output).await?;
        return Ok(output);
    };

    let parents: Cow<'_, [Value]> = match &parent.source {
        ParentSource::Step(kind) => {
            let Some(items) = earlier.get(kind) else {
                return Err(DiscoveryError::Definition {
                    kind: step.kind.clone(),
                    reason: format!("parent step {} has not run", kind),
                });
            };
            Cow::Borrowed(items.as_slice())
        }
        ParentSource::Listing(listing) => {
            let source = ListingSource::new(client, listing, Map::new());
            Cow::Owned(Cursor::new(source).collect_all().await?)
        }
    };

    tracing::debug!("{}: fanning out over {} parents", step.kind, parents.len());

    for parent_item in parents.iter() {
        let bound = bind_parent(parent, parent_item, step)?;
        collect_listing(def, step, client, bound, &mut output).await?;
    }

    Ok(output)
}

/// Drive one cursor over `step.list` and append the normalized items
async fn collect_listing(
    def: &GeneratorDef,
    step: &StepDef,
    client: &dyn ServiceClient,
    bound: Map<String, Value>,
    output: &mut StepOutput,
) -> Result<()> {
    let mut cursor = Cursor::new(ListingSource::new(client, &step.list, bound));
    let mut skipped = 0usize;

    while cursor.advance().await {
        for item in cursor.current_page() {
            if step.skip.as_ref().is_some_and(|skip| skip.matches(item)) {
                skipped += 1;
                continue;
            }
            output.resources.push(normalize(def, step, item)?);
            output.raw.push(item.clone());
        }
    }

    if let Some(err) = cursor.take_failure() {
        return Err(err);
    }

    if skipped > 0 {
        tracing::debug!("{}: skipped {} items in a terminal state", step.kind, skipped);
    }

    Ok(())
}

/// Build the descriptor for one raw item
pub fn normalize(def: &GeneratorDef, step: &StepDef, item: &Value) -> Result<Resource> {
    let id = match step.id_fields.as_slice() {
        [field] => field_str(item, field)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                DiscoveryError::malformed(
                    &step.list.operation,
                    format!("{} item has no {}", step.kind, field),
                )
            })?,
        fields => composite_id(
            fields
                .iter()
                .map(|field| field_str(item, field).unwrap_or_default()),
        ),
    };

    let name = step
        .name_field
        .as_deref()
        .and_then(|field| field_str(item, field))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| id.clone());

    Ok(Resource::new(
        id,
        name,
        &step.kind,
        &def.provider,
        def.allow_empty_for(step),
    ))
}

/// Child request params for one parent object
fn bind_parent(parent: &ParentDef, item: &Value, step: &StepDef) -> Result<Map<String, Value>> {
    let mut bound = Map::new();
    for (param, field) in &parent.params {
        let Some(value) = field_str(item, field) else {
            return Err(DiscoveryError::malformed(
                &step.list.operation,
                format!("parent of {} has no {}", step.kind, field),
            ));
        };
        bound.insert(param.clone(), Value::String(value));
    }
    Ok(bound)
}

/// Extract items from a response using a dot-notation path.
///
/// A missing container is an empty listing; a container that is not an
/// array is a malformed response.
fn extract_items(response: &Value, path: &str, operation: &str) -> Result<Vec<Value>> {
    let mut current = response;

    if !path.is_empty() {
        for part in path.split('.') {
            current = match current.get(part) {
                Some(v) => v,
                None => return Ok(Vec::new()),
            };
        }
    }

    match current {
        Value::Array(items) => Ok(items.clone()),
        Value::Null => Ok(Vec::new()),
        other => Err(DiscoveryError::malformed(
            operation,
            format!(
                "expected an array at {:?}, found {}",
                if path.is_empty() { "<root>" } else { path },
                json_type(other)
            ),
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read a scalar field using a dot-notation path, rendered as a string.
///
/// Numeric segments index into arrays. `null`, arrays and objects count
/// as absent.
pub fn field_str(item: &Value, path: &str) -> Option<String> {
    let mut current = item;

    for part in path.split('.') {
        current = match part.parse::<usize>() {
            Ok(idx) if current.is_array() => current.get(idx)?,
            _ => current.get(part)?,
        };
    }

    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
