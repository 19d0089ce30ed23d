use serde_json::Value;

/// Compares an `id`/`itemId` field against the wanted id. Platforms flip
/// between string and numeric ids across payload revisions.
fn id_matches(value: &Value, item_id: &str) -> bool {
    match value {
        Value::String(s) => s == item_id,
        Value::Number(n) => n.to_string() == item_id,
        _ => false,
    }
}

fn own_id_matches(obj: &serde_json::Map<String, Value>, item_id: &str) -> bool {
    obj.get("id")
        .or_else(|| obj.get("itemId"))
        .is_some_and(|v| id_matches(v, item_id))
}

fn has_media_field(obj: &serde_json::Map<String, Value>) -> bool {
    obj.contains_key("imagePost") || obj.contains_key("music") || obj.contains_key("video")
}

/// Finds the subtree describing one specific post. Search order, first hit
/// wins:
/// 1. `ItemModule` mapping with the item id as a direct key.
/// 2. An `itemStruct` object whose own id equals the item id.
/// 3. Any object whose id equals the item id and that carries a media field.
/// Each level recurses depth-first over the whole tree.
pub fn find_item<'a>(tree: &'a Value, item_id: &str) -> Option<&'a Value> {
    match tree {
        Value::Object(obj) => {
            if let Some(Value::Object(module)) = obj.get("ItemModule") {
                if let Some(item) = module.get(item_id) {
                    return Some(item);
                }
            }
            if let Some(Value::Object(item)) = obj.get("itemStruct") {
                if own_id_matches(item, item_id) {
                    return obj.get("itemStruct");
                }
            }
            if own_id_matches(obj, item_id) && has_media_field(obj) {
                return Some(tree);
            }
            obj.values().find_map(|v| find_item(v, item_id))
        }
        Value::Array(items) => items.iter().find_map(|v| find_item(v, item_id)),
        _ => None,
    }
}

/// Depth-first scan for the first object exhibiting photo-post shape.
/// A lower-confidence fallback for when no item id is available or the
/// id-based lookup came up empty, not a replacement for it.
pub fn find_first_image_post(tree: &Value) -> Option<&Value> {
    match tree {
        Value::Object(obj) => {
            if obj.contains_key("imagePost") || obj.contains_key("imagePostInfo") {
                return Some(tree);
            }
            obj.values().find_map(find_first_image_post)
        }
        Value::Array(items) => items.iter().find_map(find_first_image_post),
        _ => None,
    }
}
