pub(crate) fn serialize_field(value: Option<String>) -> String {
    value.map(|v| v.replace(" ", "_")).unwrap_or("X".to_string())
}

pub(crate) fn deserialize_field(value: &str) -> Option<String> {
    if value == "X" {
        return None;
    }

    Some(value.replace("_", " "))
}
