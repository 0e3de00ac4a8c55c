fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use hupload_protocol::{ApiResult, ApiStatus, Item, decode_error_message};
    use hupload_transfer::{EntryState, QueueEntryView};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn read_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_str(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Normalizes JSON values so that integer-valued floats compare equal.
    ///
    /// Go serializes `float64(65)` as `65`, Rust serializes `f64` as `65.0`.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => serde_json::json!(f),
                None => v.clone(),
            },
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent, float-normalized comparison).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  Go:   {fixture}\n  Rust: {reserialized}"
        );
        parsed
    }

    // --- Server responses ---

    #[test]
    fn fixture_api_result_error() {
        let result = roundtrip_test::<ApiResult>("api_result_error.json");
        assert_eq!(result.status, ApiStatus::Error);
        assert_eq!(
            decode_error_message(read_fixture("api_result_error.json").as_bytes()).as_deref(),
            Some("max item size reached")
        );
    }

    #[test]
    fn fixture_api_result_success() {
        let result = roundtrip_test::<ApiResult>("api_result_success.json");
        assert!(!result.is_error());
        assert_eq!(result.message, "share deleted");
    }

    #[test]
    fn fixture_item() {
        let item = roundtrip_test::<Item>("item.json");
        assert_eq!(item.name(), "IMG_0042.jpg");
        assert_eq!(item.size(), 3 * 1024 * 1024);
    }

    #[test]
    fn fixture_item_list() {
        let items = roundtrip_test::<Vec<Item>>("item_list.json");
        let names: Vec<_> = items.iter().map(Item::name).collect();
        assert_eq!(names, vec!["IMG_0043.jpg", "notes.txt"]);
    }

    #[test]
    fn go_local_time_offsets_decode() {
        // Go encodes time.Time with the server's local offset and nanoseconds.
        let json = r#"{"Path":"s/a","ItemInfo":{"Size":1,"DateModified":"2024-07-14T10:15:30.123456789+02:00"}}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        let reference: Item = serde_json::from_value(load_fixture("item.json")).unwrap();
        assert_eq!(
            item.info.date_modified.timestamp(),
            reference.info.date_modified.timestamp()
        );
    }

    // --- Queue snapshots as handed to a UI ---

    #[test]
    fn fixture_queue_snapshot() {
        let entries = roundtrip_test::<Vec<QueueEntryView>>("queue_snapshot.json");
        let states: Vec<_> = entries.iter().map(|e| e.state).collect();
        assert_eq!(
            states,
            vec![EntryState::Succeeded, EntryState::InProgress, EntryState::Failed]
        );
        assert_eq!(entries[1].percentage(), 50.0);
        assert_eq!(entries[2].error_message, "max share size reached");
    }
}
