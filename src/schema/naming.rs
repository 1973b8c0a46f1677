//! Casing rules for synthesized names.
//!
//! Relation display names are PascalCase; filter parameter prefixes are
//! lowerCamelCase. Both are pure functions of the catalog name, so the
//! same catalog always yields the same names. Response field names are
//! never recased; they stay exactly as `pg_attribute` spells them.

/// `order_items` -> `OrderItems`, `orders` -> `Orders`.
///
/// Splits on underscores, capitalizes the first character of each segment
/// and leaves the rest of the segment untouched, so pre-cased names like
/// `orderHTML_log` survive as `OrderHTMLLog` rather than being mangled.
pub fn to_pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for segment in name.split('_').filter(|s| !s.is_empty()) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// `created_at` -> `createdAt`, `ID` -> `iD`, `status` -> `status`.
pub fn to_lower_camel(name: &str) -> String {
    let pascal = to_pascal_case(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::with_capacity(pascal.len());
            out.extend(first.to_lowercase());
            out.push_str(chars.as_str());
            out
        }
        None => pascal,
    }
}
