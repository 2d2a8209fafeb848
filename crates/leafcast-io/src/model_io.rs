use leafcast_core::{ModelError, ModelResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Write any serializable model state to a JSON file.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> ModelResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ModelError::Serialization(e.to_string()))?;
    fs::write(path, json)?;
    Ok(())
}

/// Read model state back from a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> ModelResult<T> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| ModelError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Dummy {
        name: String,
        values: Vec<f64>,
    }

    #[test]
    fn test_json_round_trip() {
        let path = std::env::temp_dir().join(format!("leafcast-io-{}.json", std::process::id()));
        let original = Dummy {
            name: "weights".to_string(),
            values: vec![1.5, -2.0, 0.25],
        };
        save_json(&original, &path).unwrap();
        let restored: Dummy = load_json(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("leafcast-io-does-not-exist.json");
        let err = load_json::<Dummy>(&path).unwrap_err();
        assert!(matches!(err, ModelError::Io(_)));
    }
}
