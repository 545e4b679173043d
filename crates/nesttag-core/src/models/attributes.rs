/// Helpers for moving between DynamoDB attribute maps and plain Rust values
use crate::error::BoxError;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

pub type Item = HashMap<String, AttributeValue>;

pub fn string(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

/// `None` is written as an explicit NULL so that updates clear the attribute
pub fn optional_string(value: Option<&str>) -> AttributeValue {
    match value {
        Some(v) => AttributeValue::S(v.to_string()),
        None => AttributeValue::Null(true),
    }
}

pub fn string_list(values: &[String]) -> AttributeValue {
    AttributeValue::L(values.iter().cloned().map(AttributeValue::S).collect())
}

pub fn get_string(item: &Item, name: &str) -> Option<String> {
    match item.get(name) {
        Some(AttributeValue::S(s)) => Some(s.clone()),
        Some(AttributeValue::N(n)) => Some(n.clone()),
        _ => None,
    }
}

pub fn require_string(item: &Item, name: &str) -> Result<String, BoxError> {
    get_string(item, name)
        .ok_or_else(|| BoxError::Database(format!("Item is missing string attribute '{}'", name)))
}

pub fn get_bool(item: &Item, name: &str) -> Option<bool> {
    match item.get(name) {
        Some(AttributeValue::Bool(b)) => Some(*b),
        _ => None,
    }
}

/// Reads either a list of strings or a string set
pub fn get_string_list(item: &Item, name: &str) -> Vec<String> {
    match item.get(name) {
        Some(AttributeValue::L(values)) => values
            .iter()
            .filter_map(|v| v.as_s().ok().cloned())
            .collect(),
        Some(AttributeValue::Ss(values)) => values.clone(),
        _ => Vec::new(),
    }
}

/// Builds a `SET a = :a, ...` update expression with placeholder names for
/// every attribute, so reserved words such as `name` or `password` are safe
pub fn set_clause(
    fields: Vec<(&str, AttributeValue)>,
) -> (String, HashMap<String, String>, Item) {
    let mut assignments = Vec::with_capacity(fields.len());
    let mut names = HashMap::new();
    let mut values = Item::new();

    for (attribute, value) in fields {
        assignments.push(format!("#{0} = :{0}", attribute));
        names.insert(format!("#{}", attribute), attribute.to_string());
        values.insert(format!(":{}", attribute), value);
    }

    (format!("SET {}", assignments.join(", ")), names, values)
}
