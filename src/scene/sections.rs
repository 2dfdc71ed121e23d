//! The section list that drives the presentation.
//!
//! Sections are read once from a JSON file of the form
//! `{"pages": [{"title": "..."}, ...]}`. A section's index is its position in
//! the list.

use super::showcase::{ShowcaseKind, Showcase};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct SectionFile {
    pages: Vec<SectionEntry>,
}

#[derive(Deserialize)]
struct SectionEntry {
    title: String,
    #[serde(default)]
    scene: Option<ShowcaseKind>,
    #[serde(default)]
    map: Option<PathBuf>,
}

/// One section of the presentation.
#[derive(Clone, Debug, PartialEq)]
pub struct SectionDescriptor {
    pub index: usize,
    pub title: String,
    pub scene: ShowcaseKind,
    /// Color map, relative to the asset root. `None` uses a generated texture.
    pub map: Option<PathBuf>,
}

impl SectionDescriptor {
    /// The content this section shows.
    pub fn content(&self) -> Showcase {
        Showcase::new(self.scene, self.map.clone(), self.index as u32)
    }
}

/// Parse a section list.
///
/// # Errors
///
/// [`Error::SectionData`] for malformed JSON, [`Error::TooFewSections`] when
/// fewer than two sections are listed.
pub fn parse_sections(json: &str) -> Result<Vec<SectionDescriptor>> {
    let file: SectionFile = serde_json::from_str(json)?;
    if file.pages.len() < 2 {
        return Err(Error::TooFewSections(file.pages.len()));
    }
    Ok(file
        .pages
        .into_iter()
        .enumerate()
        .map(|(index, entry)| SectionDescriptor {
            index,
            title: entry.title,
            scene: entry.scene.unwrap_or_else(|| ShowcaseKind::cycled(index)),
            map: entry.map,
        })
        .collect())
}

/// Read and parse a section list from disk.
pub fn load_sections(path: impl AsRef<Path>) -> Result<Vec<SectionDescriptor>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let sections = parse_sections(&json)?;
    log::info!("loaded {} sections from {}", sections.len(), path.display());
    Ok(sections)
}
