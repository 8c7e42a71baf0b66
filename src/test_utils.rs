use std::path::{Path, PathBuf};

use anyhow::bail;
use itertools::Itertools;
use serde::{de::{Error, Visitor}, Deserialize};


const FAILURE_CLASSES: [&str; 3] = ["LexFailure", "ParseFailure", "RuntimeFailure"];

/// What a run should print, and the failure class it should end with, if any.
#[derive(Debug)]
pub struct ExpectedRun {
    pub output: String,
    pub failure: Option<String>,
}

pub struct TestCase {
    pub source: String,
    pub stdin: String,
    pub expected: ExpectedRun,
}

struct ExpectedRunVisitor {}

impl<'de> Deserialize<'de> for ExpectedRun {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de> {

        deserializer.deserialize_map(ExpectedRunVisitor {})
    }
}

impl<'de> Visitor<'de> for ExpectedRunVisitor {
    type Value = ExpectedRun;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "A structure starting with the boolean key 'ok'. If it's not okay, followed by the key 'type', then the key 'output'")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>, {

        if map.next_key::<String>()?.as_deref() != Some("ok") {
            return Err(A::Error::custom("First key should be 'ok'"));
        }
        let ok: bool = map.next_value()?;

        let mut key = map.next_key::<String>()?;
        let failure = if ok {
            None
        } else {
            if key.as_deref() != Some("type") {
                return Err(A::Error::custom("A failing run needs the key 'type' after 'ok'"));
            }

            let class: String = map.next_value()?;
            if !FAILURE_CLASSES.contains(&class.as_str()) {
                return Err(A::Error::custom(format!("Unrecognized failure class: {}", class)));
            }
            key = map.next_key::<String>()?;
            Some(class)
        };

        let output = match key.as_deref() {
            Some("output") => map.next_value()?,
            Some(other) => return Err(A::Error::custom(format!("Unexpected key '{}'", other))),
            None if ok => return Err(A::Error::custom("A passing run needs the key 'output'")),
            None => String::new(),
        };

        if map.next_key::<String>()?.is_some() {
            return Err(A::Error::custom("No keys may follow 'output'"));
        }

        Ok(ExpectedRun { output, failure })
    }
}

fn base_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn load_expected<P: AsRef<Path>>(path: P) -> anyhow::Result<ExpectedRun> {
    let source = std::fs::read(path)?;
    Ok(serde_json::from_slice(&source)?)
}

pub fn load_testcase(name: &str) -> anyhow::Result<TestCase> {
    let inputs = base_path().join("test_inputs");
    let source = std::fs::read_to_string(inputs.join(format!("{}.ql", name)))?;

    let stdin_path = inputs.join(format!("{}.in", name));
    let stdin = if stdin_path.exists() { std::fs::read_to_string(stdin_path)? } else { String::new() };

    let expected_path = base_path().join("test_outputs").join(format!("{}.json", name));
    if !expected_path.exists() { bail!("Testcase {} has no expected output", name); }
    let expected = load_expected(expected_path)?;

    Ok(TestCase { source, stdin, expected })
}

pub fn all_testcases() -> anyhow::Result<Vec<String>> {
    let entries = std::fs::read_dir(base_path().join("test_inputs"))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries.into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|extension| extension == "ql"))
        .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .sorted()
        .collect_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_runs_deserialize() {
        let passing: ExpectedRun = serde_json::from_str(r#"{"ok": true, "output": "321"}"#).unwrap();
        assert_eq!(passing.output, "321");
        assert_eq!(passing.failure, None);

        let failing: ExpectedRun = serde_json::from_str(r#"{"ok": false, "type": "RuntimeFailure", "output": "4"}"#).unwrap();
        assert_eq!(failing.output, "4");
        assert_eq!(failing.failure.as_deref(), Some("RuntimeFailure"));

        let silent: ExpectedRun = serde_json::from_str(r#"{"ok": false, "type": "ParseFailure"}"#).unwrap();
        assert_eq!(silent.output, "");

        assert!(serde_json::from_str::<ExpectedRun>(r#"{"ok": false, "type": "Oops"}"#).is_err());
        assert!(serde_json::from_str::<ExpectedRun>(r#"{"output": "1", "ok": true}"#).is_err());
    }
}
