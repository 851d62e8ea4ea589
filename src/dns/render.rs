//! Turns assembled zones into BIND zone-file text via tera templates, either
//! into an in-memory preview or onto disk.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::dns::assemble::AssembledZone;

/// File name of the rendered zone index.
pub const INDEX_FILE_NAME: &str = "named.conf.zones";

const ZONE_TEMPLATE: &str = "zone.conf.tera";
const INDEX_TEMPLATE: &str = "named.conf.zones.tera";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("missing template '{0}'")]
    MissingTemplate(&'static str),

    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("replacing {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// A fully rendered zone set held in memory, keyed by output file name.
#[derive(Debug, Clone)]
pub struct RenderedSet {
    pub index: String,
    pub files: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct IndexEntry {
    name: String,
    file: String,
}

pub struct ZoneFileRenderer {
    tera: tera::Tera,
    output_dir: PathBuf,
}

impl ZoneFileRenderer {
    /// Load the templates from `template_glob`. A malformed template fails
    /// here, before any render is attempted.
    pub fn new(template_glob: &str, output_dir: impl Into<PathBuf>) -> Result<Self, RenderError> {
        let mut tera = tera::Tera::new(template_glob)?;
        tera.autoescape_on(vec![]);

        for name in [ZONE_TEMPLATE, INDEX_TEMPLATE] {
            if !tera.get_template_names().any(|t| t == name) {
                return Err(RenderError::MissingTemplate(name));
            }
        }

        Ok(ZoneFileRenderer {
            tera,
            output_dir: output_dir.into(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render every zone plus the index to in-memory text. Never touches
    /// disk, so a caller can diff the output against the deployed files.
    pub fn render(&self, zones: &[AssembledZone]) -> Result<RenderedSet, RenderError> {
        let mut files = BTreeMap::new();
        for zone in zones {
            let mut ctx = tera::Context::new();
            ctx.insert("zone", zone);
            let text = self.tera.render(ZONE_TEMPLATE, &ctx)?;
            files.insert(zone.file_name(), text);
        }

        let entries: Vec<IndexEntry> = zones
            .iter()
            .map(|zone| IndexEntry {
                name: zone.name.clone(),
                file: self.output_dir.join(zone.file_name()).display().to_string(),
            })
            .collect();
        let mut ctx = tera::Context::new();
        ctx.insert("zones", &entries);
        let index = self.tera.render(INDEX_TEMPLATE, &ctx)?;

        Ok(RenderedSet { index, files })
    }

    /// Render and write the whole zone set. Everything is rendered before the
    /// first write, so a template failure leaves the output directory exactly
    /// as it was. Files land via temp-file-and-rename so a concurrent reader
    /// never observes a half-written zone.
    pub fn render_and_write(&self, zones: &[AssembledZone]) -> Result<RenderedSet, RenderError> {
        let rendered = self.render(zones)?;

        std::fs::create_dir_all(&self.output_dir).map_err(|source| RenderError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        for zone in zones {
            self.remove_stale(&zone.name, &rendered.files)?;
        }
        for (name, text) in &rendered.files {
            self.write_atomic(name, text)?;
        }
        self.write_atomic(INDEX_FILE_NAME, &rendered.index)?;

        debug!(
            zones = rendered.files.len(),
            dir = %self.output_dir.display(),
            "zone files written"
        );
        Ok(rendered)
    }

    /// Drop files left behind by an earlier render of this zone under another
    /// file name, e.g. after a zone rename.
    fn remove_stale(
        &self,
        zone_name: &str,
        keep: &BTreeMap<String, String>,
    ) -> Result<(), RenderError> {
        let entries = match std::fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(RenderError::Io {
                    path: self.output_dir.clone(),
                    source,
                });
            }
        };

        for entry in entries.flatten() {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with(zone_name) && !keep.contains_key(&file_name) {
                std::fs::remove_file(entry.path()).map_err(|source| RenderError::Io {
                    path: entry.path(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    fn write_atomic(&self, name: &str, text: &str) -> Result<(), RenderError> {
        let path = self.output_dir.join(name);
        let io_err = |source| RenderError::Io {
            path: path.clone(),
            source,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&self.output_dir).map_err(io_err)?;
        tmp.write_all(text.as_bytes()).map_err(io_err)?;
        tmp.persist(&path).map_err(|source| RenderError::Persist {
            path: path.clone(),
            source,
        })?;
        Ok(())
    }
}
