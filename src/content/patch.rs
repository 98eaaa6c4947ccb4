//! Element patches on the profile's JSON-array collections.

use serde_json::Value;

pub const IMAGE_FIELD: &str = "imgUrl";
/// Key of partner and carousel entries
pub const ENTRY_URL_FIELD: &str = "imgURL";

fn matches(item: &Value, field: &str, value: &str) -> bool {
    item.get(field).and_then(Value::as_str) == Some(value)
}

/// Replace the images of the first element whose `field` equals `value`.
///
/// The element's `imgUrl` becomes a single-entry array holding `image_url`
/// (spaces encoded as `+`). Other elements and their order are untouched.
/// Returns `None` when no element matches.
pub fn attach_image(
    mut items: Vec<Value>,
    field: &str,
    value: &str,
    image_url: &str,
) -> Option<Vec<Value>> {
    let target = items.iter_mut().find(|item| matches(item, field, value))?;
    let object = target.as_object_mut()?;
    object.insert(
        IMAGE_FIELD.to_string(),
        Value::Array(vec![Value::String(image_url.replace(' ', "+"))]),
    );
    Some(items)
}

/// `imgUrl` of the first element whose `field` equals `value`
pub fn images_for(items: &[Value], field: &str, value: &str) -> Option<Value> {
    items
        .iter()
        .find(|item| matches(item, field, value))
        .map(|item| item.get(IMAGE_FIELD).cloned().unwrap_or(Value::Array(Vec::new())))
}

pub fn contains(items: &[Value], field: &str, value: &str) -> bool {
    items.iter().any(|item| matches(item, field, value))
}

/// Append `entry` unless an element with the same `imgURL` is already there.
///
/// A storage retry can re-run a patch whose first commit did land, so
/// appending has to be idempotent.
pub fn append_unique(mut items: Vec<Value>, entry: &Value) -> Vec<Value> {
    let present = entry
        .get(ENTRY_URL_FIELD)
        .and_then(Value::as_str)
        .is_some_and(|url| contains(&items, ENTRY_URL_FIELD, url));
    if !present {
        items.push(entry.clone());
    }
    items
}
