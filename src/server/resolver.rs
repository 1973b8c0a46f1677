//! Per-relation resolvers and the startup bind pass.
//!
//! Every servable relation found in the snapshot gets a resolver that
//! walks `Unbound -> Synthesizing -> Bound | Failed` exactly once, at
//! startup. A failed bind quarantines that one relation; requests to it
//! get a clear error while every other relation serves normally. After
//! the pass the registry is frozen and shared immutably, so request
//! handling takes no locks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::catalog::{CatalogSnapshot, Oid, RelationKind};
use crate::schema::{apply_limit_cap, synthesize, SynthesisError, SynthesizedSchema};
use crate::sql::{build_select, render};

use super::errors::ResolveError;
use super::pool::ConnectionProvider;
use super::rows::row_to_json;

/// Lifecycle of one relation's serving schema.
#[derive(Debug, Clone)]
pub enum BindState {
    Unbound,
    Synthesizing,
    Bound(Arc<SynthesizedSchema>),
    Failed(SynthesisError),
}

pub struct RelationResolver {
    pub oid: Oid,
    pub namespace: String,
    pub name: String,
    pub kind: RelationKind,
    state: BindState,
}

impl RelationResolver {
    fn new(oid: Oid, namespace: String, name: String, kind: RelationKind) -> Self {
        RelationResolver { oid, namespace, name, kind, state: BindState::Unbound }
    }

    /// Run synthesis once. Binding twice is a no-op; the first outcome
    /// stands.
    pub fn bind(&mut self, snapshot: &CatalogSnapshot) {
        if !matches!(self.state, BindState::Unbound) {
            log::debug!("{}.{} already bound, skipping", self.namespace, self.name);
            return;
        }
        self.state = BindState::Synthesizing;
        self.state = match synthesize(snapshot, self.oid) {
            Ok(schema) => {
                log::debug!(
                    "bound {}.{} as {} ({} fields, {} filter params)",
                    self.namespace,
                    self.name,
                    schema.display_name(),
                    schema.response.fields.len(),
                    schema.condition.params.len(),
                );
                BindState::Bound(Arc::new(schema))
            }
            Err(err) => {
                log::warn!("failed to bind {}.{}: {err}", self.namespace, self.name);
                BindState::Failed(err)
            }
        };
    }

    /// Force this resolver into the failed state. Used when a constraint
    /// outside the relation itself (a display-name collision) disqualifies
    /// an otherwise clean bind.
    fn fail(&mut self, err: SynthesisError) {
        self.state = BindState::Failed(err);
    }

    pub fn state(&self) -> &BindState {
        &self.state
    }

    pub fn schema(&self) -> Option<&Arc<SynthesizedSchema>> {
        match &self.state {
            BindState::Bound(schema) => Some(schema),
            _ => None,
        }
    }

    /// Answer one row query: validate the body, build and render the
    /// statement, execute it on a pooled connection and decode the rows.
    pub async fn resolve(
        &self,
        body: &Map<String, Value>,
        provider: &dyn ConnectionProvider,
        max_limit: Option<u64>,
    ) -> Result<Vec<Map<String, Value>>, ResolveError> {
        let schema = match &self.state {
            BindState::Bound(schema) => schema,
            BindState::Failed(err) => return Err(ResolveError::Unavailable(err.clone())),
            BindState::Unbound | BindState::Synthesizing => return Err(ResolveError::NotBound),
        };

        let request = Uuid::new_v4();
        let started = Instant::now();

        let mut resolved = schema.condition.validate_body(body)?;
        apply_limit_cap(&mut resolved, max_limit);

        let statement = build_select(schema, &resolved);
        let query = render(&statement);
        log::debug!("[{request}] {} [{} params]", query.sql, query.params.len());

        let conn = provider.acquire().await?;
        let prepared = conn
            .prepare_typed(&query.sql, &query.param_types)
            .await
            .map_err(|source| ResolveError::Execution { source })?;
        let rows = conn
            .query(&prepared, &query.param_refs())
            .await
            .map_err(|source| ResolveError::Execution { source })?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(row_to_json(row)?);
        }

        log::info!(
            "[{request}] {}.{}: {} rows in {:.1}ms",
            self.namespace,
            self.name,
            out.len(),
            started.elapsed().as_secs_f64() * 1000.0,
        );
        Ok(out)
    }
}

/// The frozen set of resolvers, routable by `(schema, relation)`.
pub struct RelationRegistry {
    relations: Vec<Arc<RelationResolver>>,
    by_route: HashMap<(String, String), usize>,
}

impl RelationRegistry {
    /// Bind every relation of the exposed namespaces, in ascending-oid
    /// order. Relations that fail stay in the registry as failed, so the
    /// API can explain them instead of pretending they do not exist.
    pub fn bind_all(snapshot: &CatalogSnapshot, namespaces: &[String]) -> Self {
        let started = Instant::now();
        let mut relations: Vec<RelationResolver> = Vec::new();

        for relation in snapshot.relations() {
            let ns = match snapshot.namespace(relation.namespace) {
                Ok(ns) => ns,
                Err(err) => {
                    log::warn!("skipping relation {} (oid {}): {err}", relation.name, relation.oid);
                    continue;
                }
            };
            if !namespaces.iter().any(|n| n == &ns.name) {
                continue;
            }
            let mut resolver = RelationResolver::new(
                relation.oid,
                ns.name.clone(),
                relation.name.clone(),
                relation.kind,
            );
            resolver.bind(snapshot);
            relations.push(resolver);
        }

        // Two relations in one namespace may recase to the same display
        // name. The lower oid keeps it; later ones are disqualified.
        let mut first_by_display: HashMap<(String, String), usize> = HashMap::new();
        for i in 0..relations.len() {
            let Some(schema) = relations[i].schema() else { continue };
            let key = (relations[i].namespace.clone(), schema.display_name().to_string());
            if let Some(&first) = first_by_display.get(&key) {
                let err = SynthesisError::DisplayNameCollision {
                    namespace: key.0,
                    display_name: key.1,
                    first: relations[first].name.clone(),
                    second: relations[i].name.clone(),
                };
                log::warn!("{err}");
                relations[i].fail(err);
            } else {
                first_by_display.insert(key, i);
            }
        }

        let by_route = relations
            .iter()
            .enumerate()
            .map(|(i, r)| ((r.namespace.clone(), r.name.clone()), i))
            .collect();

        let registry = RelationRegistry {
            relations: relations.into_iter().map(Arc::new).collect(),
            by_route,
        };
        log::info!(
            "relation registry ready in {:.1}ms: {} servable, {} unavailable",
            started.elapsed().as_secs_f64() * 1000.0,
            registry.bound_count(),
            registry.failed_count(),
        );
        registry
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<&Arc<RelationResolver>> {
        let idx = *self
            .by_route
            .get(&(namespace.to_string(), name.to_string()))?;
        Some(&self.relations[idx])
    }

    /// All resolvers in ascending-oid order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RelationResolver>> {
        self.relations.iter()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn bound_count(&self) -> usize {
        self.relations
            .iter()
            .filter(|r| matches!(r.state(), BindState::Bound(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.relations
            .iter()
            .filter(|r| matches!(r.state(), BindState::Failed(_)))
            .count()
    }
}
