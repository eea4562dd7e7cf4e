//! # Quire
//!
//! A data-driven document template engine.
//!
//! A designer describes a document as a tree of typed items: pages, frames,
//! text, images, conditions, lists, loops and plugin blocks. Nothing in that
//! tree knows how many pages the result will have. At render time the tree is
//! bound to a data source, expanded (loops repeat, conditions choose, lists
//! and pages overflow), positioned, and only then drawn.
//!
//! ## Architecture
//!
//! ```text
//! Template (JSON)     Data (JSON)     Plugins
//!       ↓                  ↓             ↓
//!   [model]  ──────→  [layout]  ←───  [plugin]
//!                         ↓
//!                    render tree
//!                         ↓
//!                     [render]  ──→  [canvas]  ──→  PDF
//! ```
//!
//! Layout runs to completion before anything is drawn, so a failed render
//! never produces a partial document.

pub mod canvas;
pub mod data;
pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod plugin;
pub mod render;
pub mod style;
pub mod text;

use std::path::Path;

use serde::{Deserialize, Serialize};

use canvas::pdf::Metadata;
use canvas::{Canvas, PdfCanvas};
use data::DataSource;
use error::QuireError;
use font::FontContext;
use layout::LayoutEngine;
use model::Template;
use plugin::PluginManager;
use render::RenderEngine;

/// Document-wide settings for a render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    pub title: Option<String>,
    pub author: Option<String>,
    /// Family used for text whose own family is not available.
    pub default_font_family: Option<String>,
}

impl RenderOptions {
    pub fn from_json_str(json: &str) -> Result<Self, QuireError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, QuireError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            title: self.title.clone(),
            author: self.author.clone(),
        }
    }
}

/// Runs the whole pipeline: layout, then drawing.
#[derive(Debug, Default)]
pub struct Renderer {
    fonts: FontContext,
    plugins: PluginManager,
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        let mut fonts = FontContext::new();
        fonts
            .registry_mut()
            .set_fallback_family(options.default_font_family.clone());
        Self {
            fonts,
            plugins: PluginManager::new(),
            options,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn fonts_mut(&mut self) -> &mut FontContext {
        &mut self.fonts
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn plugins_mut(&mut self) -> &mut PluginManager {
        &mut self.plugins
    }

    /// Lay `template` out against `data` and draw it onto `canvas`.
    ///
    /// Returns the number of pages drawn. Nothing is drawn unless layout
    /// succeeds for the whole template.
    pub fn render(
        &self,
        template: &Template,
        data: &dyn DataSource,
        canvas: &mut dyn Canvas,
    ) -> Result<usize, QuireError> {
        let engine = LayoutEngine::new(&self.plugins, &self.fonts);
        let tree = engine.layout_template(template, data);
        if !tree.status.is_success() {
            return Err(QuireError::Layout {
                status: tree.status,
                message: tree.message,
            });
        }

        let pages = RenderEngine::render(&tree, canvas)?;
        log::info!("rendered {} page(s)", pages);
        Ok(pages)
    }

    /// Render to PDF bytes.
    pub fn render_pdf(&self, template: &Template, data: &dyn DataSource) -> Result<Vec<u8>, QuireError> {
        let mut canvas = PdfCanvas::new(&self.fonts).with_metadata(self.options.metadata());
        self.render(template, data, &mut canvas)?;
        canvas.finish()
    }

    /// Render to a PDF file. The file is only written after a successful render.
    pub fn render_to_pdf_file(
        &self,
        template: &Template,
        data: &dyn DataSource,
        path: impl AsRef<Path>,
    ) -> Result<usize, QuireError> {
        let mut canvas = PdfCanvas::new(&self.fonts).with_metadata(self.options.metadata());
        let pages = self.render(template, data, &mut canvas)?;
        canvas.write_to(path)?;
        Ok(pages)
    }
}

/// Render a template with default options to PDF bytes.
pub fn render_pdf(template: &Template, data: &dyn DataSource) -> Result<Vec<u8>, QuireError> {
    Renderer::default().render_pdf(template, data)
}
