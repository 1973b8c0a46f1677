//! Startup catalog introspection.
//!
//! Five read-only queries against `pg_catalog` produce everything a
//! [`CatalogSnapshot`] holds. We deliberately load the whole catalog, not
//! just the configured schemas: snapshots are cheap, and filtering by
//! namespace is a serving decision that happens later.

use std::time::Instant;

use thiserror::Error;
use tokio_postgres::{Client, Row};

use super::snapshot::{CatalogSnapshot, DescriptionCatalog, RelationKind};

// pg_description.classoid values for the catalogs we collect comments from.
const CLASSOID_PG_CLASS: u32 = 1259;
const CLASSOID_PG_TYPE: u32 = 1247;

const NAMESPACE_QUERY: &str = "\
SELECT oid, nspname FROM pg_catalog.pg_namespace";

const RELATION_QUERY: &str = "\
SELECT oid, relname, relnamespace, relkind
FROM pg_catalog.pg_class
WHERE relkind IN ('r', 'v', 'm', 'f', 'p')";

const ATTRIBUTE_QUERY: &str = "\
SELECT a.attrelid, a.attnum, a.attname, a.atttypid, a.attisdropped
FROM pg_catalog.pg_attribute a
JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
WHERE a.attnum > 0 AND c.relkind IN ('r', 'v', 'm', 'f', 'p')
ORDER BY a.attrelid, a.attnum";

const TYPE_QUERY: &str = "\
SELECT oid, typname, typnamespace, typcategory, typelem
FROM pg_catalog.pg_type";

const DESCRIPTION_QUERY: &str = "\
SELECT classoid, objoid, objsubid, description
FROM pg_catalog.pg_description
WHERE classoid IN ('pg_catalog.pg_class'::regclass, 'pg_catalog.pg_type'::regclass)";

#[derive(Debug, Error)]
pub enum IntrospectionError {
    #[error("catalog query against {catalog} failed: {source}")]
    Query {
        catalog: &'static str,
        source: tokio_postgres::Error,
    },
    #[error("unexpected row shape from {catalog}: {source}")]
    Decode {
        catalog: &'static str,
        source: tokio_postgres::Error,
    },
}

async fn fetch(
    client: &Client,
    catalog: &'static str,
    sql: &str,
) -> Result<Vec<Row>, IntrospectionError> {
    client
        .query(sql, &[])
        .await
        .map_err(|source| IntrospectionError::Query { catalog, source })
}

fn decode<T>(
    catalog: &'static str,
    value: Result<T, tokio_postgres::Error>,
) -> Result<T, IntrospectionError> {
    value.map_err(|source| IntrospectionError::Decode { catalog, source })
}

/// Load a complete catalog snapshot over an established connection.
pub async fn load_snapshot(client: &Client) -> Result<CatalogSnapshot, IntrospectionError> {
    let started = Instant::now();
    let mut builder = CatalogSnapshot::builder();

    for row in fetch(client, "pg_namespace", NAMESPACE_QUERY).await? {
        let oid: u32 = decode("pg_namespace", row.try_get(0))?;
        let name: String = decode("pg_namespace", row.try_get(1))?;
        builder.add_namespace(oid, name);
    }

    let mut relations = 0usize;
    for row in fetch(client, "pg_class", RELATION_QUERY).await? {
        let oid: u32 = decode("pg_class", row.try_get(0))?;
        let name: String = decode("pg_class", row.try_get(1))?;
        let namespace: u32 = decode("pg_class", row.try_get(2))?;
        // relkind is a "char" column and arrives as a single byte.
        let code: i8 = decode("pg_class", row.try_get(3))?;
        let Some(kind) = RelationKind::from_code(code as u8) else {
            // The WHERE clause already excludes these; skip rather than fail
            // if a future relkind slips through.
            log::debug!("skipping relation {name} (oid {oid}) with relkind {code}");
            continue;
        };
        builder.add_relation(oid, name, namespace, kind);
        relations += 1;
    }

    let mut attributes = 0usize;
    for row in fetch(client, "pg_attribute", ATTRIBUTE_QUERY).await? {
        let relation: u32 = decode("pg_attribute", row.try_get(0))?;
        let ordinal: i16 = decode("pg_attribute", row.try_get(1))?;
        let name: String = decode("pg_attribute", row.try_get(2))?;
        let type_oid: u32 = decode("pg_attribute", row.try_get(3))?;
        let dropped: bool = decode("pg_attribute", row.try_get(4))?;
        builder.add_attribute(relation, ordinal, name, type_oid, dropped);
        attributes += 1;
    }

    let mut types = 0usize;
    for row in fetch(client, "pg_type", TYPE_QUERY).await? {
        let oid: u32 = decode("pg_type", row.try_get(0))?;
        let name: String = decode("pg_type", row.try_get(1))?;
        let namespace: u32 = decode("pg_type", row.try_get(2))?;
        let category: i8 = decode("pg_type", row.try_get(3))?;
        let element: u32 = decode("pg_type", row.try_get(4))?;
        builder.add_type(oid, name, namespace, category as u8, element);
        types += 1;
    }

    let mut comments = 0usize;
    for row in fetch(client, "pg_description", DESCRIPTION_QUERY).await? {
        let classoid: u32 = decode("pg_description", row.try_get(0))?;
        let objoid: u32 = decode("pg_description", row.try_get(1))?;
        let subid: i32 = decode("pg_description", row.try_get(2))?;
        let text: String = decode("pg_description", row.try_get(3))?;
        let catalog = match classoid {
            CLASSOID_PG_CLASS => DescriptionCatalog::Class,
            CLASSOID_PG_TYPE => DescriptionCatalog::Type,
            _ => continue,
        };
        builder.add_description(catalog, objoid, subid, text);
        comments += 1;
    }

    let snapshot = builder.build();
    log::info!(
        "catalog snapshot loaded in {:.1}ms: {} relations, {} attributes, {} types, {} comments",
        started.elapsed().as_secs_f64() * 1000.0,
        relations,
        attributes,
        types,
        comments,
    );
    Ok(snapshot)
}
