//! Unit tests for filter body validation
//!
//! Every rejection path a request body can hit, checked against the
//! public validation surface. Nothing here should ever reach SQL.

#[cfg(test)]
mod validation_tests {
    use pglens::catalog::type_map::{
        OID_BOOL, OID_DATE, OID_FLOAT8, OID_INT2, OID_INT4, OID_INT8, OID_JSONB, OID_NUMERIC,
        OID_TEXT, OID_TIME, OID_TIMESTAMP, OID_TIMESTAMPTZ, OID_UUID,
    };
    use pglens::catalog::{CatalogSnapshot, RelationKind};
    use pglens::schema::{synthesize, InputError, ResolvedConditions, SynthesizedSchema};
    use serde_json::{json, Value};

    const SAMPLES: u32 = 16700;

    fn samples() -> SynthesizedSchema {
        let mut b = CatalogSnapshot::builder();
        b.add_namespace(11, "pg_catalog");
        b.add_namespace(2200, "public");
        b.add_relation(SAMPLES, "samples", 2200, RelationKind::Table);
        b.add_attribute(SAMPLES, 1, "qty", OID_INT2, false);
        b.add_attribute(SAMPLES, 2, "count", OID_INT4, false);
        b.add_attribute(SAMPLES, 3, "id", OID_INT8, false);
        b.add_attribute(SAMPLES, 4, "ratio", OID_FLOAT8, false);
        b.add_attribute(SAMPLES, 5, "total", OID_NUMERIC, false);
        b.add_attribute(SAMPLES, 6, "status", OID_TEXT, false);
        b.add_attribute(SAMPLES, 7, "day", OID_DATE, false);
        b.add_attribute(SAMPLES, 8, "at", OID_TIME, false);
        b.add_attribute(SAMPLES, 9, "ts", OID_TIMESTAMP, false);
        b.add_attribute(SAMPLES, 10, "tstz", OID_TIMESTAMPTZ, false);
        b.add_attribute(SAMPLES, 11, "token", OID_UUID, false);
        b.add_attribute(SAMPLES, 12, "meta", OID_JSONB, false);
        b.add_attribute(SAMPLES, 13, "tags", 1009, false);
        b.add_attribute(SAMPLES, 14, "active", OID_BOOL, false);
        b.add_type(OID_INT2, "int2", 11, b'N', 0);
        b.add_type(OID_INT4, "int4", 11, b'N', 0);
        b.add_type(OID_INT8, "int8", 11, b'N', 0);
        b.add_type(OID_FLOAT8, "float8", 11, b'N', 0);
        b.add_type(OID_NUMERIC, "numeric", 11, b'N', 0);
        b.add_type(OID_TEXT, "text", 11, b'S', 0);
        b.add_type(OID_DATE, "date", 11, b'D', 0);
        b.add_type(OID_TIME, "time", 11, b'D', 0);
        b.add_type(OID_TIMESTAMP, "timestamp", 11, b'D', 0);
        b.add_type(OID_TIMESTAMPTZ, "timestamptz", 11, b'D', 0);
        b.add_type(OID_UUID, "uuid", 11, b'U', 0);
        b.add_type(OID_JSONB, "jsonb", 11, b'U', 0);
        b.add_type(1009, "_text", 11, b'A', OID_TEXT);
        b.add_type(OID_BOOL, "bool", 11, b'B', 0);
        synthesize(&b.build(), SAMPLES).unwrap()
    }

    fn check(schema: &SynthesizedSchema, body: Value) -> Result<ResolvedConditions, InputError> {
        schema.condition.validate_body(body.as_object().unwrap())
    }

    #[test]
    fn test_unknown_parameters_name_the_offender() {
        let schema = samples();
        match check(&schema, json!({ "status_like": "x" })) {
            Err(InputError::UnknownParameter(name)) => assert_eq!(name, "status_like"),
            other => panic!("expected UnknownParameter, got {other:?}"),
        }
        // Parameter names are exact; no case folding.
        assert!(matches!(
            check(&schema, json!({ "Status_equals": "x" })),
            Err(InputError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_wrong_value_kinds_say_what_was_expected() {
        let schema = samples();
        let cases = [
            (json!({ "id_equals": "7" }), "an integral number"),
            (json!({ "status_equals": 7 }), "a string"),
            (json!({ "active_equals": "true" }), "a boolean"),
            (json!({ "ratio_equals": "fast" }), "a number"),
            (json!({ "day_equals": 20240501 }), "a date string (YYYY-MM-DD)"),
            (json!({ "tags_equals": "rush" }), "an array"),
        ];
        for (body, expected) in cases {
            match check(&schema, body.clone()) {
                Err(InputError::WrongValueKind { expected: e, .. }) => {
                    assert_eq!(e, expected, "body {body}")
                }
                other => panic!("expected WrongValueKind for {body}, got {other:?}"),
            }
        }
    }

    /// Width checks happen at validation, not inside the driver.
    #[test]
    fn test_integer_width_overflow_is_rejected() {
        let schema = samples();
        assert!(check(&schema, json!({ "qty_equals": 32767 })).is_ok());
        assert!(matches!(
            check(&schema, json!({ "qty_equals": 32768 })),
            Err(InputError::OutOfRange { name }) if name == "qty_equals"
        ));
        assert!(matches!(
            check(&schema, json!({ "count_equals": 3_000_000_000_i64 })),
            Err(InputError::OutOfRange { .. })
        ));
        // int8 takes the full i64 range.
        assert!(check(&schema, json!({ "id_equals": 3_000_000_000_i64 })).is_ok());
    }

    #[test]
    fn test_numeric_strings_must_look_numeric() {
        let schema = samples();
        for ok in ["19.99", "-0.5", ".5", "+3", "0"] {
            assert!(
                check(&schema, json!({ "total_equals": ok })).is_ok(),
                "expected {ok} to validate"
            );
        }
        for bad in ["1e5", "19.99; DROP TABLE samples", "", "NaN", "1.2.3"] {
            assert!(
                check(&schema, json!({ "total_equals": bad })).is_err(),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_temporal_strings_must_parse() {
        let schema = samples();
        assert!(check(&schema, json!({ "day_equals": "2024-05-01" })).is_ok());
        assert!(check(&schema, json!({ "day_equals": "2024-13-40" })).is_err());

        assert!(check(&schema, json!({ "at_less": "10:30" })).is_ok());
        assert!(check(&schema, json!({ "at_less": "10:30:15.5" })).is_ok());
        assert!(check(&schema, json!({ "at_less": "25:00" })).is_err());

        assert!(check(&schema, json!({ "ts_greater": "2024-05-01T10:30:00" })).is_ok());
        assert!(check(&schema, json!({ "ts_greater": "2024-05-01 10:30:00" })).is_ok());
        assert!(check(&schema, json!({ "ts_greater": "yesterday" })).is_err());

        assert!(check(&schema, json!({ "tstz_less": "2024-05-01T10:30:00Z" })).is_ok());
        assert!(check(&schema, json!({ "tstz_less": "2024-05-01T10:30:00+02:00" })).is_ok());
        // Zone-aware comparison needs an explicit offset.
        assert!(check(&schema, json!({ "tstz_less": "2024-05-01T10:30:00" })).is_err());
    }

    #[test]
    fn test_uuid_strings_must_parse() {
        let schema = samples();
        assert!(check(
            &schema,
            json!({ "token_equals": "6d1a1b60-8f0a-4bd8-9brt-000000000000" })
        )
        .is_err());
        assert!(check(
            &schema,
            json!({ "token_equals": "6d1a1b60-8f0a-4bd8-9b1a-0e8f5f1c2a3b" })
        )
        .is_ok());
    }

    #[test]
    fn test_json_filters_accept_any_json_value() {
        let schema = samples();
        for value in [
            json!({ "a": 1 }),
            json!([1, 2]),
            json!(42),
            json!("text"),
            json!(true),
        ] {
            let mut body = serde_json::Map::new();
            body.insert("meta_equals".to_string(), value);
            assert!(schema.condition.validate_body(&body).is_ok());
        }
    }

    #[test]
    fn test_floats_accept_integers_too() {
        let schema = samples();
        assert!(check(&schema, json!({ "ratio_less": 3 })).is_ok());
        assert!(check(&schema, json!({ "ratio_less": 3.25 })).is_ok());
    }

    /// JSON null is the same as leaving the parameter out.
    #[test]
    fn test_null_values_unconstrain() {
        let schema = samples();
        let resolved = check(
            &schema,
            json!({ "status_equals": null, "id_equals": 7, "limit": null }),
        )
        .unwrap();
        assert_eq!(resolved.filled.len(), 1);
        assert_eq!(resolved.limit, None);
    }

    #[test]
    fn test_is_null_takes_only_booleans() {
        let schema = samples();
        assert!(check(&schema, json!({ "status_isNull": true })).is_ok());
        assert!(check(&schema, json!({ "status_isNull": false })).is_ok());
        for bad in [json!({ "status_isNull": "true" }), json!({ "status_isNull": 1 })] {
            assert!(matches!(
                check(&schema, bad),
                Err(InputError::WrongValueKind { .. })
            ));
        }
    }

    #[test]
    fn test_pagination_rejects_non_integers() {
        let schema = samples();
        assert!(check(&schema, json!({ "limit": 0 })).is_ok());
        for bad in [
            json!({ "limit": -1 }),
            json!({ "limit": 2.5 }),
            json!({ "limit": "5" }),
            json!({ "offset": true }),
        ] {
            assert!(matches!(
                check(&schema, bad),
                Err(InputError::InvalidPagination(_))
            ));
        }
    }

    /// Array values validate element by element against the element type.
    #[test]
    fn test_array_elements_validate_individually() {
        let schema = samples();
        assert!(check(&schema, json!({ "tags_equals": ["a", "b"] })).is_ok());
        assert!(check(&schema, json!({ "tags_equals": [] })).is_ok());
        assert!(matches!(
            check(&schema, json!({ "tags_equals": ["a", 5] })),
            Err(InputError::WrongValueKind { .. })
        ));
        assert!(matches!(
            check(&schema, json!({ "tags_containsElement": 5 })),
            Err(InputError::WrongValueKind { .. })
        ));
    }
}
