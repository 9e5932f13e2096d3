use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use xshell::Shell;

/// Deserialize a JSON file config. Durable writes do not go through a
/// mirror trait: everything written on the task path uses
/// `files::write_atomic` instead.
pub trait ReadConfig: Sized {
    fn read(shell: &Shell, path: impl AsRef<Path>) -> anyhow::Result<Self>;
}

impl<T: DeserializeOwned> ReadConfig for T {
    fn read(shell: &Shell, path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = shell
            .read_file(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn reads_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        std::fs::write(&path, r#"{"name": "proxy", "count": 2}"#).unwrap();

        let shell = Shell::new().unwrap();
        let sample = Sample::read(&shell, &path).unwrap();
        assert_eq!(
            sample,
            Sample {
                name: "proxy".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn missing_and_malformed_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Shell::new().unwrap();

        assert!(Sample::read(&shell, dir.path().join("absent.json")).is_err());

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Sample::read(&shell, &path).is_err());
    }
}
