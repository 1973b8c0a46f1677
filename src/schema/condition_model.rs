//! Filter condition synthesis and request-body validation.
//!
//! Each relation gets a flat set of optional filter parameters, one per
//! (column, operator) pair, plus `limit` and `offset`. The set is derived
//! entirely from column types: ordering operators only where ordering is
//! meaningful, pattern operators only on text, `containsElement` only on
//! arrays. Parameter order is fixed by (column ordinal, operator rank), so
//! generated WHERE clauses come out in the same order no matter how the
//! request body spells its keys.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use tokio_postgres::types::Type;
use uuid::Uuid;

use crate::catalog::type_map::OID_JSON;
use crate::catalog::{CatalogSnapshot, Oid, SemanticType};
use crate::sql::values::{self, encode_array_literal, BoundValue, ParamBinding};

use super::errors::{InputError, SynthesisError};
use super::naming::to_lower_camel;
use super::response_model::ResponseSchema;

lazy_static! {
    // Plain decimal numbers only; scientific notation and NaN are not
    // accepted as numeric filter strings.
    static ref NUMERIC_LITERAL: Regex = Regex::new(r"^[+-]?(\d+(\.\d+)?|\.\d+)$").unwrap();
}

/// Everything a filter can ask of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equals,
    NotEquals,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    PatternMatch,
    PatternMatchInsensitive,
    IsNull,
    ContainsElement,
}

impl ComparisonOp {
    /// Parameter-name suffix: `createdAt` + `_` + `less` = `createdAt_less`.
    pub fn suffix(&self) -> &'static str {
        match self {
            ComparisonOp::Equals => "equals",
            ComparisonOp::NotEquals => "notEquals",
            ComparisonOp::Less => "less",
            ComparisonOp::LessOrEqual => "lessOrEqual",
            ComparisonOp::Greater => "greater",
            ComparisonOp::GreaterOrEqual => "greaterOrEqual",
            ComparisonOp::PatternMatch => "patternMatch",
            ComparisonOp::PatternMatchInsensitive => "patternMatchInsensitive",
            ComparisonOp::IsNull => "isNull",
            ComparisonOp::ContainsElement => "containsElement",
        }
    }
}

/// The operators a column of this semantic type supports, in the order
/// their parameters appear in the condition schema.
pub fn operator_set(semantic: &SemanticType) -> &'static [ComparisonOp] {
    use ComparisonOp::*;
    match semantic {
        SemanticType::Boolean => &[Equals, NotEquals, IsNull],
        SemanticType::Integer
        | SemanticType::Float
        | SemanticType::Numeric
        | SemanticType::Date
        | SemanticType::Time
        | SemanticType::Timestamp
        | SemanticType::TimestampTz => {
            &[Equals, NotEquals, Less, LessOrEqual, Greater, GreaterOrEqual, IsNull]
        }
        SemanticType::Text => {
            &[Equals, NotEquals, PatternMatch, PatternMatchInsensitive, IsNull]
        }
        SemanticType::Uuid | SemanticType::Json => &[Equals, NotEquals, IsNull],
        SemanticType::Array(_) => &[Equals, ContainsElement, IsNull],
        SemanticType::Opaque => &[Equals, IsNull],
    }
}

/// One optional filter parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionParam {
    /// Wire name, e.g. `createdAt_lessOrEqual`.
    pub name: String,
    /// Raw column name the predicate applies to.
    pub column: String,
    pub op: ComparisonOp,
    /// Semantic type of the *value* this parameter accepts; the element
    /// type for `containsElement`, boolean for `isNull`, text for the
    /// pattern operators.
    pub value_type: SemanticType,
    /// How the value binds; `None` for `isNull`, which binds nothing.
    pub binding: Option<ParamBinding>,
    /// Cast applied to the column side of the comparison.
    pub column_cast: Option<&'static str>,
}

/// The full filter surface of one relation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSchema {
    pub params: Vec<ConditionParam>,
    index: HashMap<String, usize>,
}

/// A value accepted for one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// Binds as a statement parameter.
    Bound(BoundValue),
    /// `isNull`: true wants NULL rows, false wants non-NULL rows.
    NullCheck(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilledCondition {
    /// Index into [`ConditionSchema::params`].
    pub param: usize,
    pub value: ConditionValue,
}

/// A validated request body: the supplied conditions in schema order plus
/// pagination.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedConditions {
    pub filled: Vec<FilledCondition>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ConditionSchema {
    pub fn get(&self, name: &str) -> Option<(usize, &ConditionParam)> {
        let idx = *self.index.get(name)?;
        Some((idx, &self.params[idx]))
    }

    /// Check a parsed JSON body against this schema.
    ///
    /// Unknown keys are rejected rather than ignored; a typo in a filter
    /// name silently matching everything would be worse than a 400. A
    /// JSON `null` value means the parameter is unconstrained, same as
    /// leaving it out.
    pub fn validate_body(
        &self,
        body: &Map<String, Value>,
    ) -> Result<ResolvedConditions, InputError> {
        let mut by_param: Vec<Option<ConditionValue>> = vec![None; self.params.len()];
        let mut limit = None;
        let mut offset = None;

        for (key, value) in body {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "limit" => limit = Some(parse_pagination("limit", value)?),
                "offset" => offset = Some(parse_pagination("offset", value)?),
                _ => {
                    let (idx, param) = self
                        .get(key)
                        .ok_or_else(|| InputError::UnknownParameter(key.clone()))?;
                    by_param[idx] = Some(coerce(param, value)?);
                }
            }
        }

        let filled = by_param
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|value| FilledCondition { param: i, value }))
            .collect();
        Ok(ResolvedConditions { filled, limit, offset })
    }
}

/// Clamp the resolved limit to a server-side cap. With a cap configured
/// and no client limit, the cap itself becomes the limit.
pub fn apply_limit_cap(resolved: &mut ResolvedConditions, cap: Option<u64>) {
    if let Some(cap) = cap {
        resolved.limit = Some(resolved.limit.map_or(cap, |l| l.min(cap)));
    }
}

/// Derive the condition schema from an already-synthesized response model.
pub fn synthesize_condition_model(
    snapshot: &CatalogSnapshot,
    oid: Oid,
    response: &ResponseSchema,
) -> Result<ConditionSchema, SynthesisError> {
    let relation = snapshot.relation(oid)?;
    let mut params = Vec::new();
    let mut index = HashMap::new();

    for field in &response.fields {
        let prefix = to_lower_camel(&field.name);
        let json_cast = (field.type_oid == OID_JSON).then_some("jsonb");
        for op in operator_set(&field.semantic) {
            let name = format!("{prefix}_{}", op.suffix());
            let (value_type, binding) = match op {
                ComparisonOp::IsNull => (SemanticType::Boolean, None),
                ComparisonOp::PatternMatch | ComparisonOp::PatternMatchInsensitive => {
                    (SemanticType::Text, Some(ParamBinding::text()))
                }
                ComparisonOp::ContainsElement => match &field.semantic {
                    SemanticType::Array(elem) => (
                        (**elem).clone(),
                        Some(values::element_binding(snapshot, elem, field.type_oid)),
                    ),
                    _ => continue,
                },
                _ => (
                    field.semantic.clone(),
                    Some(values::scalar_binding(snapshot, &field.semantic, field.type_oid)),
                ),
            };
            if index.insert(name.clone(), params.len()).is_some() {
                // Two columns recased onto the same prefix, e.g.
                // `created_at` and `createdAt` in one relation.
                return Err(SynthesisError::DuplicateParameter {
                    relation: relation.name.clone(),
                    name,
                });
            }
            params.push(ConditionParam {
                name,
                column: field.name.clone(),
                op: *op,
                value_type,
                binding,
                column_cast: match op {
                    ComparisonOp::IsNull => None,
                    _ => json_cast,
                },
            });
        }
    }

    Ok(ConditionSchema { params, index })
}

fn parse_pagination(name: &'static str, value: &Value) -> Result<u64, InputError> {
    value.as_u64().ok_or(InputError::InvalidPagination(name))
}

fn wrong(param_name: &str, expected: &str) -> InputError {
    InputError::WrongValueKind {
        name: param_name.to_string(),
        expected: expected.to_string(),
    }
}

fn coerce(param: &ConditionParam, value: &Value) -> Result<ConditionValue, InputError> {
    if param.op == ComparisonOp::IsNull {
        return value
            .as_bool()
            .map(ConditionValue::NullCheck)
            .ok_or_else(|| wrong(&param.name, "a boolean"));
    }
    coerce_semantic(&param.name, &param.value_type, param.binding.as_ref(), value)
        .map(ConditionValue::Bound)
}

fn coerce_semantic(
    name: &str,
    semantic: &SemanticType,
    binding: Option<&ParamBinding>,
    value: &Value,
) -> Result<BoundValue, InputError> {
    let expected = semantic.expected_input();
    match semantic {
        SemanticType::Boolean => value
            .as_bool()
            .map(BoundValue::Bool)
            .ok_or_else(|| wrong(name, expected)),
        SemanticType::Integer => {
            let n = value.as_i64().ok_or_else(|| wrong(name, expected))?;
            if let Some(b) = binding {
                let fits = if b.ty == Type::INT2 {
                    i16::try_from(n).is_ok()
                } else if b.ty == Type::INT4 {
                    i32::try_from(n).is_ok()
                } else {
                    true
                };
                if !fits {
                    return Err(InputError::OutOfRange { name: name.to_string() });
                }
            }
            Ok(BoundValue::Int(n))
        }
        SemanticType::Float => value
            .as_f64()
            .map(BoundValue::Float)
            .ok_or_else(|| wrong(name, expected)),
        SemanticType::Numeric => match value {
            Value::Number(n) => Ok(BoundValue::Text(n.to_string())),
            Value::String(s) if NUMERIC_LITERAL.is_match(s) => {
                Ok(BoundValue::Text(s.clone()))
            }
            _ => Err(wrong(name, expected)),
        },
        SemanticType::Text | SemanticType::Opaque => value
            .as_str()
            .map(|s| BoundValue::Text(s.to_string()))
            .ok_or_else(|| wrong(name, expected)),
        SemanticType::Date => {
            let s = value.as_str().ok_or_else(|| wrong(name, expected))?;
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(BoundValue::Date)
                .map_err(|_| wrong(name, expected))
        }
        SemanticType::Time => {
            let s = value.as_str().ok_or_else(|| wrong(name, expected))?;
            NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .map(BoundValue::Time)
                .map_err(|_| wrong(name, expected))
        }
        SemanticType::Timestamp => {
            let s = value.as_str().ok_or_else(|| wrong(name, expected))?;
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .map(BoundValue::Timestamp)
                .map_err(|_| wrong(name, expected))
        }
        SemanticType::TimestampTz => {
            let s = value.as_str().ok_or_else(|| wrong(name, expected))?;
            DateTime::parse_from_rfc3339(s)
                .map(|dt| BoundValue::TimestampTz(dt.with_timezone(&Utc)))
                .map_err(|_| wrong(name, expected))
        }
        SemanticType::Uuid => {
            let s = value.as_str().ok_or_else(|| wrong(name, expected))?;
            Uuid::parse_str(s)
                .map(BoundValue::Uuid)
                .map_err(|_| wrong(name, expected))
        }
        SemanticType::Json => Ok(BoundValue::Json(value.clone())),
        SemanticType::Array(elem) => {
            let items = value.as_array().ok_or_else(|| wrong(name, expected))?;
            let elems = items
                .iter()
                .map(|item| coerce_semantic(name, elem, None, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(BoundValue::Text(encode_array_literal(&elems)))
        }
    }
}
