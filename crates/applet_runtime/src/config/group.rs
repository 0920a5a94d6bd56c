use std::{path::Path, time::Duration};

use dock_shared_util::FileAccess;
use dockbus::{DelaySpec, FromValue, Value};

use super::{ConfError, KeyFile};
use crate::shortkey::Shortkey;

/// Typed access to the keys of one group. Conversion failures are collected instead of returned,
/// the caller keeps the default value for that key.
pub struct ConfGroup<'a> {
    file: &'a KeyFile,
    name: String,
    errors: &'a mut Vec<ConfError>,
}

impl<'a> ConfGroup<'a> {
    pub fn new(file: &'a KeyFile, name: impl Into<String>, errors: &'a mut Vec<ConfError>) -> Self {
        ConfGroup { file, name: name.into(), errors }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn raw(&self, key: &str) -> Option<Value> {
        self.file.get(&self.name, key).map(Value::from)
    }

    fn conversion_error(&mut self, key: &str, source: dockbus::ConversionError) {
        self.errors.push(ConfError::Conversion { group: self.name.clone(), key: key.to_string(), source });
    }

    pub fn primitive_optional<T: FromValue>(&mut self, key: &str) -> Option<T> {
        let value = self.raw(key)?;
        match value.read_as::<T>() {
            Ok(x) => Some(x),
            Err(err) => {
                self.conversion_error(key, err);
                None
            }
        }
    }

    pub fn primitive_required<T: FromValue>(&mut self, key: &str) -> Result<T, ConfError> {
        let value = self.raw(key).ok_or_else(|| ConfError::MissingKey { group: self.name.clone(), key: key.to_string() })?;
        value.read_as::<T>().map_err(|source| ConfError::Conversion { group: self.name.clone(), key: key.to_string(), source })
    }

    /// Overwrite `target` with the value of `key`, if there is a valid one.
    pub fn fill<T: FromValue>(&mut self, key: &str, target: &mut T) {
        if let Some(value) = self.primitive_optional(key) {
            *target = value;
        }
    }

    /// A delay where a bare number counts in `spec.unit`.
    pub fn delay(&mut self, key: &str, spec: DelaySpec) -> Option<Duration> {
        let value = self.raw(key)?;
        match value.as_delay(spec) {
            Ok(delay) => Some(delay),
            Err(err) => {
                self.conversion_error(key, err);
                None
            }
        }
    }

    /// The shortkey bound in `key`, unbound when the key is missing.
    pub fn shortkey(&mut self, key: &str, desc: &str, action: Option<usize>) -> Shortkey {
        let combination = self.primitive_optional::<String>(key).unwrap_or_default();
        let shortkey = Shortkey::new(&self.name, key, desc, combination);
        match action {
            Some(action) => shortkey.with_action(action),
            None => shortkey,
        }
    }
}

/// A config struct filled from a key file. Missing keys keep the `Default` value.
pub trait FromKeyFile: Default {
    fn from_key_file(file: &KeyFile, errors: &mut Vec<ConfError>) -> Self;
}

/// Load and bind the config file, logging every value that could not be read.
pub fn load_config<T: FromKeyFile>(path: &Path, files: &FileAccess) -> Result<T, ConfError> {
    let file = KeyFile::load(path, files)?;
    let mut errors = Vec::new();
    let conf = T::from_key_file(&file, &mut errors);
    for err in errors {
        log::warn!("Could not read config value of {}: {}", path.display(), err);
    }
    Ok(conf)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use smart_default::SmartDefault;

    #[derive(Debug, PartialEq, SmartDefault)]
    struct Conf {
        #[default(20)]
        history_size: i32,
        #[default(Duration::from_secs(300))]
        interval: Duration,
        debug: bool,
        blacklist: Vec<String>,
        shortkey: String,
    }

    impl FromKeyFile for Conf {
        fn from_key_file(file: &KeyFile, errors: &mut Vec<ConfError>) -> Self {
            let mut conf = Conf::default();
            let mut group = ConfGroup::new(file, "Configuration", errors);
            group.fill("HistorySize", &mut conf.history_size);
            if let Some(interval) = group.delay("UpdateDelay", DelaySpec::MINUTES.with_min(Duration::from_secs(60))) {
                conf.interval = interval;
            }
            group.fill("Debug", &mut conf.debug);
            group.fill("Blacklist", &mut conf.blacklist);
            conf.shortkey = group.shortkey("ShortkeyOne", "Show", Some(1)).key;
            conf
        }
    }

    #[test]
    fn test_binding_keeps_defaults_on_errors() {
        let file = KeyFile::parse("[Configuration]\nHistorySize = many\nUpdateDelay = 0\nDebug = true\nBlacklist = a;b;\nShortkeyOne = <Control>F8\n").unwrap();
        let mut errors = Vec::new();
        let conf = Conf::from_key_file(&file, &mut errors);
        assert_eq!(
            conf,
            Conf {
                history_size: 20,
                interval: Duration::from_secs(60),
                debug: true,
                blacklist: vec!["a".to_string(), "b".to_string()],
                shortkey: "<Control>F8".to_string(),
            }
        );
        assert_eq!(errors.len(), 1);
        insta::assert_snapshot!(errors[0], @"[Configuration] HistorySize: Failed to turn `many` into a value of type i64");
    }

    #[test]
    fn test_required_key() {
        let file = KeyFile::parse("[Icon]\nname = Demo\n").unwrap();
        let mut errors = Vec::new();
        let mut group = ConfGroup::new(&file, "Icon", &mut errors);
        assert_eq!(group.primitive_required::<String>("name").unwrap(), "Demo");
        assert!(matches!(group.primitive_required::<String>("icon"), Err(ConfError::MissingKey { .. })));
    }
}
