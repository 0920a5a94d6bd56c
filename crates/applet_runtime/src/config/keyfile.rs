use std::{fmt, path::Path};

use dock_shared_util::FileAccess;

use super::ConfError;

#[derive(Debug, Clone, PartialEq)]
enum Line {
    /// Blank or comment line, written back untouched.
    Raw(String),
    Group { name: String, raw: String },
    /// `raw` holds the original text until the value gets replaced.
    Entry { key: String, value: String, raw: Option<String> },
}

/// A `[group]` / `key = value` file that remembers its layout, so that rewriting it
/// only changes the lines whose value changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyFile {
    lines: Vec<Line>,
}

const TRAILING_COMMENTS: [&str; 4] = [" ;", "\t;", " #", "\t#"];

fn strip_trailing_comment(value: &str) -> &str {
    let cut = TRAILING_COMMENTS.iter().filter_map(|marker| value.find(marker)).min();
    match cut {
        Some(index) => &value[..index],
        None => value,
    }
}

fn read_value(raw: &str) -> String {
    let value = strip_trailing_comment(raw).trim();
    unescape::unescape(value).unwrap_or_else(|| value.to_string())
}

fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n").replace('\t', "\\t")
}

/// Split `key = value` or `key : value` at whichever separator comes first.
fn split_entry(line: &str) -> Option<(&str, &str)> {
    let index = line.find(['=', ':'])?;
    let key = line[..index].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, &line[index + 1..]))
}

impl KeyFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(content: &str) -> Result<Self, ConfError> {
        let mut lines: Vec<Line> = Vec::new();
        for (index, text) in content.lines().enumerate() {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                lines.push(Line::Raw(text.to_string()));
            } else if trimmed.starts_with('[') && trimmed.ends_with(']') {
                let name = trimmed[1..trimmed.len() - 1].trim().to_string();
                lines.push(Line::Group { name, raw: text.to_string() });
            } else if let Some((key, value)) = split_entry(trimmed) {
                lines.push(Line::Entry { key: key.to_string(), value: read_value(value), raw: Some(text.to_string()) });
            } else if let Some(Line::Entry { value, raw, .. }) = lines.last_mut() {
                value.push('\n');
                value.push_str(&read_value(trimmed));
                if let Some(raw) = raw {
                    raw.push('\n');
                    raw.push_str(text);
                }
            } else {
                return Err(ConfError::ParseLine { line: index + 1, content: text.to_string() });
            }
        }
        Ok(KeyFile { lines })
    }

    pub fn load(path: &Path, files: &FileAccess) -> Result<Self, ConfError> {
        if !path.exists() {
            return Err(ConfError::MissingFile(path.to_path_buf()));
        }
        let content = files.read_to_string(path).map_err(|source| ConfError::Io { path: path.to_path_buf(), source })?;
        Self::parse(&content)
    }

    pub fn save(&self, path: &Path, files: &FileAccess) -> Result<(), ConfError> {
        files.write(path, self.to_string()).map_err(|source| ConfError::Io { path: path.to_path_buf(), source })
    }

    /// The lines of the group, as a range of indices. Entries before the first header form the group `""`.
    fn group_range(&self, group: &str) -> Option<std::ops::Range<usize>> {
        let start = if group.is_empty() {
            0
        } else {
            self.lines.iter().position(|line| matches!(line, Line::Group { name, .. } if name == group))? + 1
        };
        let end = self.lines[start..].iter().position(|line| matches!(line, Line::Group { .. })).map_or(self.lines.len(), |i| start + i);
        Some(start..end)
    }

    /// Group names, in file order.
    pub fn groups(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Group { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups().contains(&group)
    }

    /// Key and value of every entry of the group, in file order.
    pub fn entries(&self, group: &str) -> Vec<(&str, &str)> {
        let Some(range) = self.group_range(group) else { return Vec::new() };
        self.lines[range]
            .iter()
            .filter_map(|line| match line {
                Line::Entry { key, value, .. } => Some((key.as_str(), value.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&str> {
        self.entries(group).into_iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Set a value. An existing line is rewritten in place, a new key goes after the
    /// last entry of its group, and a new group is added at the end of the file.
    pub fn set(&mut self, group: &str, key: &str, value: impl Into<String>) {
        let value = value.into();
        let Some(range) = self.group_range(group) else {
            if self.lines.last().map_or(false, |line| !matches!(line, Line::Raw(raw) if raw.trim().is_empty())) {
                self.lines.push(Line::Raw(String::new()));
            }
            self.lines.push(Line::Group { name: group.to_string(), raw: format!("[{}]", group) });
            self.lines.push(Line::Entry { key: key.to_string(), value, raw: None });
            return;
        };

        let mut insert_at = range.start;
        for index in range {
            if let Line::Entry { key: existing, value: old, raw } = &mut self.lines[index] {
                if existing == key {
                    if *old != value {
                        *old = value;
                        *raw = None;
                    }
                    return;
                }
                insert_at = index + 1;
            }
        }
        self.lines.insert(insert_at, Line::Entry { key: key.to_string(), value, raw: None });
    }
}

impl fmt::Display for KeyFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            match line {
                Line::Raw(raw) | Line::Group { raw, .. } | Line::Entry { raw: Some(raw), .. } => writeln!(f, "{}", raw)?,
                Line::Entry { key, value, raw: None } => writeln!(f, "{} = {}", key, escape_value(value))?,
            }
        }
        Ok(())
    }
}
