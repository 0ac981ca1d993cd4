use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::info;

const SECTION_MARKER: &str = "-- name:";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read query templates from `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Named SQL templates loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: HashMap<String, String>,
}

impl TemplateStore {
    /// Read and parse a template file. A missing or unreadable file is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let store = Self::parse(&content);
        info!(
            target = "roster::query::store",
            path = %path.display(),
            templates = store.len(),
            "Loaded query templates"
        );
        Ok(store)
    }

    /// Split `content` on `-- name:` markers.
    ///
    /// The first line of each section is the template name, the rest is the body with
    /// one trailing `;` removed. Text ahead of the first marker, blank sections and
    /// sections without a body are ignored. A repeated name replaces the earlier body.
    pub fn parse(content: &str) -> Self {
        let mut templates = HashMap::new();

        for section in content.split(SECTION_MARKER).skip(1) {
            let Some((name, body)) = section.split_once('\n') else {
                continue;
            };

            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            let body = body.trim();
            let body = body.strip_suffix(';').unwrap_or(body).trim_end();
            if body.is_empty() {
                continue;
            }
            templates.insert(name.to_string(), body.to_string());
        }

        Self { templates }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    /// Template names in lexical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
