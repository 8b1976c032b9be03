use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to write {path}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Unable to serialize the document: {0}")]
    Serialization(String),
}

/// Writes `document` as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, document: &T, label: &str) -> Result<(), Error> {
    let file_contents = match serde_json::to_string_pretty(document) {
        Ok(contents) => contents + "\n",
        Err(error) => return Err(Error::Serialization(error.to_string())),
    };
    return write_text(path, &file_contents, label);
}

/// Writes `document` as YAML in its JSON-compatible flow style. Every
/// string stays quoted, so YAML 1.1 readers keep values such as
/// `2010-09-09` or `yes` as strings.
pub fn write_yaml<T: Serialize>(path: &Path, document: &T, label: &str) -> Result<(), Error> {
    return write_json(path, document, label);
}

/// Writes `contents` to `path`, creating missing parent directories, and
/// prints a confirmation line naming the file.
pub fn write_text(path: &Path, contents: &str, label: &str) -> Result<(), Error> {
    let io_error = |source: std::io::Error| Error::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, contents).map_err(io_error)?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote file");

    println!("{} successfully written to {}", label, path.display());
    return Ok(());
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{write_json, write_text, write_yaml, Error};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("terraform").join("nested").join("main.tf");

        write_text(&file_path, "# empty\n", "Terraform module").unwrap();
        assert_eq!("# empty\n", fs::read_to_string(&file_path).unwrap());
    }

    #[test]
    fn json_output_parses_back() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("task-definition.json");
        let document = json!({"family": "prod_svc", "cpu": "256", "volumes": [{"name": "shared-volume", "host": {}}]});

        write_json(&file_path, &document, "Task definition").unwrap();
        let contents = fs::read_to_string(&file_path).unwrap();
        assert_eq!(true, contents.starts_with("{\n  \""));
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(document, parsed);
    }

    #[test]
    fn yaml_output_parses_back() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("template.yaml");
        let document = json!({"Parameters": {"SubnetIds": {"Default": ","}}});

        write_yaml(&file_path, &document, "SAM template").unwrap();
        let parsed: serde_json::Value =
            serde_yaml::from_str(&fs::read_to_string(&file_path).unwrap()).unwrap();
        assert_eq!(document, parsed);
    }

    #[test]
    fn yaml_output_keeps_date_like_strings_quoted() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("template.yaml");
        let document = json!({"AWSTemplateFormatVersion": "2010-09-09", "Enabled": "yes"});

        write_yaml(&file_path, &document, "SAM template").unwrap();
        let contents = fs::read_to_string(&file_path).unwrap();
        assert_eq!(true, contents.contains("\"AWSTemplateFormatVersion\": \"2010-09-09\""));
        assert_eq!(true, contents.contains("\"Enabled\": \"yes\""));

        let parsed: serde_yaml::Value = serde_yaml::from_str(&contents).unwrap();
        assert_eq!(parsed["AWSTemplateFormatVersion"], "2010-09-09");
    }

    #[test]
    fn unwritable_path_reports_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let target = blocker.join("main.tf");
        let result = write_text(&target, "", "Terraform module");
        match result.err().unwrap() {
            Error::Io { path, source } => {
                let error = Error::Io { path, source };
                assert_eq!(format!("Unable to write {}", target.display()), error.to_string());
            }
            _ => panic!("Expected `Io` error"),
        }
    }
}
