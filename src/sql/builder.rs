//! From a synthesized schema plus validated conditions to a statement
//! tree. Pure and total: validation has already rejected anything this
//! step cannot express.

use crate::catalog::type_map::OID_TIMETZ;
use crate::catalog::{Oid, SemanticType};
use crate::schema::{ComparisonOp, ConditionValue, ResolvedConditions, SynthesizedSchema};

use super::values::{BoundValue, ParamBinding};
use super::{CompareOp, Predicate, PredicateKind, RelationRef, SelectStatement, Target};

/// Types the driver decodes natively come back in binary form; everything
/// else is cast to text in the SELECT list and decoded as a string.
fn needs_text_cast(semantic: &SemanticType, type_oid: Oid) -> bool {
    match semantic {
        SemanticType::Numeric | SemanticType::Opaque => true,
        SemanticType::Time => type_oid == OID_TIMETZ,
        SemanticType::Array(elem) => !array_element_decodes(elem),
        _ => false,
    }
}

fn array_element_decodes(elem: &SemanticType) -> bool {
    matches!(
        elem,
        SemanticType::Boolean
            | SemanticType::Integer
            | SemanticType::Float
            | SemanticType::Text
            | SemanticType::Uuid
    )
}

/// Assemble the SELECT for one request.
///
/// Targets are the full response field list in ordinal order; predicates
/// follow the order of `resolved.filled`, which validation fixed to
/// condition-schema order.
pub fn build_select(
    schema: &SynthesizedSchema,
    resolved: &ResolvedConditions,
) -> SelectStatement {
    let targets = schema
        .response
        .fields
        .iter()
        .map(|f| Target {
            column: f.name.clone(),
            cast_to_text: needs_text_cast(&f.semantic, f.type_oid),
        })
        .collect();

    let mut predicates = Vec::with_capacity(resolved.filled.len());
    for filled in &resolved.filled {
        let param = &schema.condition.params[filled.param];
        let kind = match &filled.value {
            ConditionValue::NullCheck(want_null) => PredicateKind::Null { negated: !want_null },
            ConditionValue::Bound(value) => {
                let binding = param.binding.clone().unwrap_or_else(ParamBinding::text);
                match param.op {
                    ComparisonOp::Equals => PredicateKind::Compare {
                        op: CompareOp::Eq,
                        value: value.clone(),
                        binding,
                    },
                    ComparisonOp::NotEquals => PredicateKind::Compare {
                        op: CompareOp::NotEq,
                        value: value.clone(),
                        binding,
                    },
                    ComparisonOp::Less => PredicateKind::Compare {
                        op: CompareOp::Lt,
                        value: value.clone(),
                        binding,
                    },
                    ComparisonOp::LessOrEqual => PredicateKind::Compare {
                        op: CompareOp::Le,
                        value: value.clone(),
                        binding,
                    },
                    ComparisonOp::Greater => PredicateKind::Compare {
                        op: CompareOp::Gt,
                        value: value.clone(),
                        binding,
                    },
                    ComparisonOp::GreaterOrEqual => PredicateKind::Compare {
                        op: CompareOp::Ge,
                        value: value.clone(),
                        binding,
                    },
                    ComparisonOp::PatternMatch | ComparisonOp::PatternMatchInsensitive => {
                        let pattern = match value {
                            BoundValue::Text(s) => s.clone(),
                            _ => continue,
                        };
                        PredicateKind::Pattern {
                            case_insensitive: param.op
                                == ComparisonOp::PatternMatchInsensitive,
                            value: pattern,
                        }
                    }
                    // isNull always arrives as NullCheck.
                    ComparisonOp::IsNull => PredicateKind::Null { negated: false },
                    ComparisonOp::ContainsElement => PredicateKind::ContainsElement {
                        value: value.clone(),
                        binding,
                    },
                }
            }
        };
        predicates.push(Predicate {
            column: param.column.clone(),
            column_cast: param.column_cast,
            kind,
        });
    }

    SelectStatement {
        targets,
        from: RelationRef {
            namespace: schema.namespace.clone(),
            name: schema.name.clone(),
            include_descendants: true,
        },
        predicates,
        limit: resolved.limit,
        offset: resolved.offset,
    }
}
