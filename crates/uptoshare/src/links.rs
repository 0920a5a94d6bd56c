//! The result of one upload, and how it is stored in the history file.

use std::collections::BTreeMap;

use applet_runtime::{
    config::KeyFile,
    history::{HistoryError, HistoryFormat},
};

/// Role name to URL, plus bookkeeping fields (`file`, `type`, `date`).
///
/// A successful set has a `link` holding an absolute URL. A failed one only has an `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LinkSet(BTreeMap<String, String>);

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set with `link` as its main link. A link that isn't an absolute URL makes an error set.
    pub fn found(link: impl AsRef<str>) -> Self {
        let link = link.as_ref().trim();
        if link.is_empty() {
            return LinkSet::error("no link found in the answer");
        }
        match url::Url::parse(link) {
            Ok(_) => LinkSet(BTreeMap::from([("link".to_string(), link.to_string())])),
            Err(err) => LinkSet::error(format!("invalid link `{}`: {}", link, err)),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        LinkSet(BTreeMap::from([("error".to_string(), message.into())]))
    }

    /// An error set for a failure of the named site.
    pub fn failed(site: &str, err: impl std::fmt::Display) -> Self {
        LinkSet::error(format!("{}: {}", site, err))
    }

    /// Add an extra link. Empty links are skipped, and error sets stay as they are.
    pub fn add(mut self, key: &str, link: impl Into<String>) -> Self {
        let link = link.into();
        if !link.is_empty() && !self.is_error() {
            self.0.insert(key.to_string(), link);
        }
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn link(&self) -> Option<&str> {
        self.get("link")
    }

    pub fn error_message(&self) -> Option<&str> {
        self.get("error")
    }

    pub fn is_error(&self) -> bool {
        self.0.contains_key("error")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for LinkSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        LinkSet(iter.into_iter().collect())
    }
}

/// Key file with one group per upload, named after its link.
pub struct LinkHistory;

impl HistoryFormat for LinkHistory {
    type Item = LinkSet;

    fn encode(items: &[LinkSet]) -> Result<String, HistoryError> {
        let mut file = KeyFile::new();
        for links in items {
            let Some(group) = links.link() else { continue };
            for (key, value) in links.iter() {
                file.set(group, key, value);
            }
        }
        Ok(file.to_string())
    }

    fn decode(content: &str) -> Result<Vec<LinkSet>, HistoryError> {
        let file = KeyFile::parse(content)?;
        Ok(file
            .groups()
            .into_iter()
            .map(|group| file.entries(group).into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_found_validates_the_link() {
        assert_eq!(LinkSet::found(" http://example.org/abc.png\n").link(), Some("http://example.org/abc.png"));
        assert!(LinkSet::found("").is_error());

        let relative = LinkSet::found("abc.png").add("thumb", "http://example.org/t.png");
        assert!(relative.link().is_none());
        assert_eq!(relative.get("thumb"), None);
    }

    #[test]
    fn test_add_skips_empty_links() {
        let links = LinkSet::found("http://codepad.org/x").add("dl", "http://codepad.org/x/raw.txt").add("fork", "");
        assert_eq!(links.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["dl", "link"]);
    }

    #[test]
    fn test_history_format() {
        let links = vec![
            LinkSet::found("http://example.org/abc.png").add("thumb", "http://example.org/t.png"),
            LinkSet::error("not stored"),
        ];
        let encoded = LinkHistory::encode(&links).unwrap();
        insta::assert_snapshot!(encoded, @r###"
        [http://example.org/abc.png]
        link = http://example.org/abc.png
        thumb = http://example.org/t.png
        "###);
        assert_eq!(LinkHistory::decode(&encoded).unwrap(), links[..1].to_vec());
    }
}
