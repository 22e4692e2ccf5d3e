//! Diesel schema definitions.

diesel::table! {
    set_entries (namespace, set_key, value) {
        namespace -> Text,
        set_key -> Text,
        value -> Text,
    }
}
