// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, RigError};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This expands `[properties]` and deserializes; it does **not** perform
/// semantic validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    load_from_str(&contents)
}

/// Same as [`load_from_path`] for an in-memory document.
pub fn load_from_str(contents: &str) -> Result<RawConfigFile> {
    let expanded = expand_properties(contents)?;
    let config: RawConfigFile = toml::from_str(&expanded)?;
    Ok(config)
}

/// Load a configuration file from path and run basic validation.
///
/// Relative paths inside the file are later resolved against the file's
/// directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config.with_base_dir(config_root_dir(path)))
}

/// Directory containing the config file, or `.` for a bare filename.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Characters that would end or reinterpret the TOML string a property is
/// substituted into.
const UNSPLICEABLE: [char; 4] = ['"', '\\', '\n', '\r'];

/// Replace every `${key}` with the value of `[properties].key`.
///
/// Property values are first expanded into each other once, so a property
/// may refer to another one.
fn expand_properties(contents: &str) -> Result<String> {
    let table: toml::Table = toml::from_str(contents)?;

    let props = match table.get("properties") {
        None => return Ok(contents.to_string()),
        Some(toml::Value::Table(t)) => t,
        Some(_) => return Err(RigError::config("[properties] must be a table")),
    };

    let mut values = Vec::with_capacity(props.len());
    for (key, value) in props.iter() {
        if key == "id" {
            return Err(RigError::config(
                "property name 'id' is reserved for per-instance substitution",
            ));
        }
        match value {
            toml::Value::String(s) => {
                if let Some(c) = s.chars().find(|c| UNSPLICEABLE.contains(c)) {
                    return Err(RigError::config(format!(
                        "property '{key}' contains {c:?}, which cannot be substituted into the config"
                    )));
                }
                values.push((key.clone(), s.clone()));
            }
            other => {
                return Err(RigError::config(format!(
                    "property '{key}' must be a string (got {})",
                    other.type_str()
                )));
            }
        }
    }

    let snapshot = values.clone();
    for (_, value) in values.iter_mut() {
        *value = substitute(value, &snapshot);
    }

    debug!(count = values.len(), "expanding config properties");
    Ok(substitute(contents, &values))
}

fn substitute(text: &str, props: &[(String, String)]) -> String {
    props.iter().fold(text.to_string(), |acc, (key, value)| {
        acc.replace(&format!("${{{key}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::TaskDescriptor;

    #[test]
    fn properties_expand_into_tasks_and_each_other() {
        let raw = load_from_str(
            r#"
[execution]
name = "kv"

[properties]
root = "/opt/kv"
lib = "${root}/lib"

[[task]]
kind = "image"
name = "img"
volumes = ["${lib}"]
"#,
        )
        .unwrap();

        assert_eq!(raw.properties["lib"], "/opt/kv/lib");
        match &raw.task[0] {
            TaskDescriptor::Image(img) => assert_eq!(img.volumes, vec!["/opt/kv/lib"]),
            other => panic!("unexpected descriptor {other:?}"),
        }
    }

    #[test]
    fn id_placeholder_survives_expansion() {
        let raw = load_from_str(
            r#"
[execution]
name = "kv"

[properties]
domain = "kv"

[[task]]
kind = "image"
name = "img"

[[task]]
kind = "containers"
name = "servers"
image = "img"
ids = "0:2"
name_pattern = "server${id}.${domain}"
"#,
        )
        .unwrap();

        match &raw.task[1] {
            TaskDescriptor::Containers(c) => {
                assert_eq!(c.name_pattern.as_deref(), Some("server${id}.kv"))
            }
            other => panic!("unexpected descriptor {other:?}"),
        }
    }

    #[test]
    fn quotes_and_backslashes_in_properties_are_rejected() {
        for value in [r#"a\" , extra = \"b"#, r#"C:\\tmp"#] {
            let doc = format!(
                "[execution]\nname = \"${{name}}\"\n\n[properties]\nname = \"{value}\"\n"
            );
            let err = load_from_str(&doc).unwrap_err();
            assert!(
                matches!(&err, RigError::ConfigError(msg) if msg.contains("'name'")),
                "{value}: {err:?}"
            );
        }
    }

    #[test]
    fn reserved_property_is_rejected() {
        let err = load_from_str(
            r#"
[execution]
name = "kv"

[properties]
id = "7"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, RigError::ConfigError(_)));
    }
}
