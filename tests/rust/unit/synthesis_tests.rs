//! Unit tests for per-relation schema synthesis
//!
//! A relation's response fields and filter parameters are derived entirely
//! from catalog rows; these tests pin that derivation down over a catalog
//! covering every type family.

#[cfg(test)]
mod synthesis_tests {
    use pglens::catalog::type_map::{
        OID_BOOL, OID_BPCHAR, OID_DATE, OID_FLOAT8, OID_INT8, OID_JSONB, OID_NAME, OID_NUMERIC,
        OID_TEXT, OID_TIMESTAMPTZ, OID_UUID, OID_VARCHAR,
    };
    use pglens::catalog::{CatalogSnapshot, DescriptionCatalog, RelationKind, SemanticType};
    use pglens::schema::{synthesize, SynthesisError, SynthesizedSchema};

    const SHIPMENTS: u32 = 16500;
    const OID_TEXT_ARRAY: u32 = 1009;
    const OID_MOOD: u32 = 17000;

    /// One relation that touches every type family the synthesizer
    /// distinguishes.
    fn wide_snapshot() -> CatalogSnapshot {
        let mut b = CatalogSnapshot::builder();
        b.add_namespace(11, "pg_catalog");
        b.add_namespace(2200, "public");

        b.add_relation(SHIPMENTS, "shipments", 2200, RelationKind::Table);
        b.add_attribute(SHIPMENTS, 1, "id", OID_INT8, false);
        b.add_attribute(SHIPMENTS, 2, "active", OID_BOOL, false);
        b.add_attribute(SHIPMENTS, 3, "weight", OID_FLOAT8, false);
        b.add_attribute(SHIPMENTS, 4, "price", OID_NUMERIC, false);
        b.add_attribute(SHIPMENTS, 5, "note", OID_TEXT, false);
        b.add_attribute(SHIPMENTS, 6, "shipped_on", OID_DATE, false);
        b.add_attribute(SHIPMENTS, 7, "created_at", OID_TIMESTAMPTZ, false);
        b.add_attribute(SHIPMENTS, 8, "token", OID_UUID, false);
        b.add_attribute(SHIPMENTS, 9, "meta", OID_JSONB, false);
        b.add_attribute(SHIPMENTS, 10, "tags", OID_TEXT_ARRAY, false);
        b.add_attribute(SHIPMENTS, 11, "mood", OID_MOOD, false);

        b.add_type(OID_INT8, "int8", 11, b'N', 0);
        b.add_type(OID_BOOL, "bool", 11, b'B', 0);
        b.add_type(OID_FLOAT8, "float8", 11, b'N', 0);
        b.add_type(OID_NUMERIC, "numeric", 11, b'N', 0);
        b.add_type(OID_TEXT, "text", 11, b'S', 0);
        b.add_type(OID_DATE, "date", 11, b'D', 0);
        b.add_type(OID_TIMESTAMPTZ, "timestamptz", 11, b'D', 0);
        b.add_type(OID_UUID, "uuid", 11, b'U', 0);
        b.add_type(OID_JSONB, "jsonb", 11, b'U', 0);
        b.add_type(OID_TEXT_ARRAY, "_text", 11, b'A', OID_TEXT);
        b.add_type(OID_MOOD, "mood", 2200, b'E', 0);
        b.add_type(OID_VARCHAR, "varchar", 11, b'S', 0);
        b.add_type(OID_BPCHAR, "bpchar", 11, b'S', 0);
        b.add_type(OID_NAME, "name", 11, b'S', 0);
        b.build()
    }

    fn shipments() -> SynthesizedSchema {
        synthesize(&wide_snapshot(), SHIPMENTS).unwrap()
    }

    fn suffixes_for(schema: &SynthesizedSchema, column: &str) -> Vec<&'static str> {
        schema
            .condition
            .params
            .iter()
            .filter(|p| p.column == column)
            .map(|p| p.op.suffix())
            .collect()
    }

    /// Every type family fans out into exactly the operators that make
    /// sense for it, nothing more.
    #[test]
    fn test_operator_sets_follow_type_families() {
        let schema = shipments();

        let ordered = vec![
            "equals",
            "notEquals",
            "less",
            "lessOrEqual",
            "greater",
            "greaterOrEqual",
            "isNull",
        ];
        assert_eq!(suffixes_for(&schema, "id"), ordered);
        assert_eq!(suffixes_for(&schema, "weight"), ordered);
        assert_eq!(suffixes_for(&schema, "price"), ordered);
        assert_eq!(suffixes_for(&schema, "shipped_on"), ordered);
        assert_eq!(suffixes_for(&schema, "created_at"), ordered);

        assert_eq!(
            suffixes_for(&schema, "note"),
            vec![
                "equals",
                "notEquals",
                "patternMatch",
                "patternMatchInsensitive",
                "isNull"
            ]
        );

        assert_eq!(
            suffixes_for(&schema, "active"),
            vec!["equals", "notEquals", "isNull"]
        );
        assert_eq!(
            suffixes_for(&schema, "token"),
            vec!["equals", "notEquals", "isNull"]
        );
        assert_eq!(
            suffixes_for(&schema, "meta"),
            vec!["equals", "notEquals", "isNull"]
        );

        assert_eq!(
            suffixes_for(&schema, "tags"),
            vec!["equals", "containsElement", "isNull"]
        );

        // No ordering, no patterns for a type we cannot classify.
        assert_eq!(suffixes_for(&schema, "mood"), vec!["equals", "isNull"]);
    }

    /// Parameter names recase the column; the column itself never changes.
    #[test]
    fn test_param_names_recase_columns_to_lower_camel() {
        let schema = shipments();
        let created: Vec<&str> = schema
            .condition
            .params
            .iter()
            .filter(|p| p.column == "created_at")
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(
            created,
            vec![
                "createdAt_equals",
                "createdAt_notEquals",
                "createdAt_less",
                "createdAt_lessOrEqual",
                "createdAt_greater",
                "createdAt_greaterOrEqual",
                "createdAt_isNull"
            ]
        );
    }

    /// Response fields keep raw catalog names in attnum order; dropped
    /// columns never surface.
    #[test]
    fn test_response_fields_keep_raw_names_and_order() {
        let mut b = CatalogSnapshot::builder();
        b.add_namespace(2200, "public");
        b.add_relation(16400, "order_items", 2200, RelationKind::Table);
        b.add_attribute(16400, 1, "id", OID_INT8, false);
        b.add_attribute(16400, 2, "........pg.dropped.2........", 0, true);
        b.add_attribute(16400, 3, "unit_price", OID_NUMERIC, false);
        b.add_type(OID_INT8, "int8", 11, b'N', 0);
        b.add_type(OID_NUMERIC, "numeric", 11, b'N', 0);
        let schema = synthesize(&b.build(), 16400).unwrap();

        let names: Vec<&str> = schema.response.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "unit_price"]);
        assert_eq!(schema.display_name(), "OrderItems");
        // Ordinals survive the dropped-column gap.
        assert_eq!(schema.response.fields[1].ordinal, 3);
    }

    /// varchar, bpchar and name behave exactly like text.
    #[test]
    fn test_text_like_types_classify_as_text() {
        let mut b = CatalogSnapshot::builder();
        b.add_namespace(11, "pg_catalog");
        b.add_namespace(2200, "public");
        b.add_relation(16600, "people", 2200, RelationKind::Table);
        b.add_attribute(16600, 1, "nick", OID_VARCHAR, false);
        b.add_attribute(16600, 2, "code", OID_BPCHAR, false);
        b.add_attribute(16600, 3, "login", OID_NAME, false);
        b.add_type(OID_VARCHAR, "varchar", 11, b'S', 0);
        b.add_type(OID_BPCHAR, "bpchar", 11, b'S', 0);
        b.add_type(OID_NAME, "name", 11, b'S', 0);
        let schema = synthesize(&b.build(), 16600).unwrap();

        for field in &schema.response.fields {
            assert_eq!(field.semantic, SemanticType::Text, "field {}", field.name);
        }
        assert!(schema.condition.get("nick_patternMatchInsensitive").is_some());
        assert_eq!(schema.response.fields[0].type_name, "varchar");
    }

    /// A user-defined type we cannot classify still serves, as opaque text.
    #[test]
    fn test_unknown_types_degrade_to_opaque() {
        let schema = shipments();
        let mood = schema
            .response
            .fields
            .iter()
            .find(|f| f.name == "mood")
            .unwrap();
        assert_eq!(mood.semantic, SemanticType::Opaque);
        assert_eq!(mood.type_name, "public.mood");
        assert!(schema.condition.get("mood_equals").is_some());
        assert!(schema.condition.get("mood_less").is_none());
    }

    /// Comments attach to fields by (class oid, attnum), fall back to the
    /// type's own comment, and the relation comment becomes the doc.
    #[test]
    fn test_descriptions_flow_from_catalog() {
        let mut b = CatalogSnapshot::builder();
        b.add_namespace(11, "pg_catalog");
        b.add_namespace(2200, "public");
        b.add_relation(16400, "orders", 2200, RelationKind::Table);
        b.add_attribute(16400, 1, "id", OID_INT8, false);
        b.add_attribute(16400, 2, "mood", OID_MOOD, false);
        b.add_type(OID_INT8, "int8", 11, b'N', 0);
        b.add_type(OID_MOOD, "mood", 2200, b'E', 0);
        b.add_description(DescriptionCatalog::Class, 16400, 0, "Customer orders");
        b.add_description(DescriptionCatalog::Class, 16400, 1, "Surrogate key");
        b.add_description(DescriptionCatalog::Type, OID_MOOD, 0, "How the customer felt");
        let schema = synthesize(&b.build(), 16400).unwrap();

        assert_eq!(schema.doc.as_deref(), Some("Customer orders"));
        assert_eq!(schema.response.fields[0].doc.as_deref(), Some("Surrogate key"));
        // No column comment: the type comment steps in.
        assert_eq!(
            schema.response.fields[1].doc.as_deref(),
            Some("How the customer felt")
        );
    }

    /// Views, materialized views and partitioned tables all synthesize the
    /// same way plain tables do.
    #[test]
    fn test_non_table_relkinds_synthesize() {
        let mut b = CatalogSnapshot::builder();
        b.add_namespace(11, "pg_catalog");
        b.add_namespace(2200, "public");
        b.add_relation(16410, "order_totals", 2200, RelationKind::View);
        b.add_attribute(16410, 1, "total", OID_NUMERIC, false);
        b.add_relation(16420, "daily_rollup", 2200, RelationKind::MaterializedView);
        b.add_attribute(16420, 1, "day", OID_DATE, false);
        b.add_relation(16430, "measurements", 2200, RelationKind::PartitionedTable);
        b.add_attribute(16430, 1, "at", OID_TIMESTAMPTZ, false);
        b.add_type(OID_NUMERIC, "numeric", 11, b'N', 0);
        b.add_type(OID_DATE, "date", 11, b'D', 0);
        b.add_type(OID_TIMESTAMPTZ, "timestamptz", 11, b'D', 0);
        let snap = b.build();

        for oid in [16410, 16420, 16430] {
            let schema = synthesize(&snap, oid).unwrap();
            assert_eq!(schema.response.fields.len(), 1, "oid {oid}");
        }
        assert_eq!(synthesize(&snap, 16410).unwrap().kind, RelationKind::View);
    }

    /// A relation with no live columns cannot be served, and says which
    /// relation it was.
    #[test]
    fn test_empty_relations_are_rejected() {
        let mut b = CatalogSnapshot::builder();
        b.add_namespace(2200, "public");
        b.add_relation(16440, "husk", 2200, RelationKind::Table);
        b.add_attribute(16440, 1, "........pg.dropped.1........", 0, true);
        match synthesize(&b.build(), 16440) {
            Err(SynthesisError::EmptyRelation { relation }) => {
                assert_eq!(relation, "public.husk");
            }
            other => panic!("expected EmptyRelation, got {other:?}"),
        }
    }

    /// Two columns that recase onto one parameter prefix poison only this
    /// relation, with both names in the error.
    #[test]
    fn test_colliding_parameter_names_fail_the_relation() {
        let mut b = CatalogSnapshot::builder();
        b.add_namespace(11, "pg_catalog");
        b.add_namespace(2200, "public");
        b.add_relation(16450, "events", 2200, RelationKind::Table);
        b.add_attribute(16450, 1, "created_at", OID_TIMESTAMPTZ, false);
        b.add_attribute(16450, 2, "createdAt", OID_TIMESTAMPTZ, false);
        b.add_type(OID_TIMESTAMPTZ, "timestamptz", 11, b'D', 0);
        match synthesize(&b.build(), 16450) {
            Err(SynthesisError::DuplicateParameter { relation, name }) => {
                assert_eq!(relation, "events");
                assert_eq!(name, "createdAt_equals");
            }
            other => panic!("expected DuplicateParameter, got {other:?}"),
        }
    }
}
