//! Document renderers.
//!
//! A [`Renderer`] turns an assembled [`Document`] into a single output file.
//! Two implementations ship with blogbook:
//! - [`HtmlRenderer`]: a self-contained, print-ready HTML file
//! - [`PdfRenderer`]: the same HTML handed to an external HTML → PDF command
//!
//! Both write their output atomically, so a failed render never leaves a
//! partial file at the target path.

mod html;
mod output;
mod pdf;

use std::path::Path;

use blogbook_shared::{Document, Result, RunConfig};

pub use html::{HtmlRenderer, render_html};
pub use output::{RenderOutput, write_atomic};
pub use pdf::PdfRenderer;

/// Produces the final document file.
pub trait Renderer: Send + Sync {
    /// Short name for logs (`html`, `pdf`).
    fn name(&self) -> &str;

    /// Render `doc` to `output`, replacing any existing file.
    fn render(&self, doc: &Document, output: &Path) -> Result<RenderOutput>;
}

/// Pick a renderer from the output file extension: `.html`/`.htm` produce
/// HTML, anything else goes through the PDF command.
pub fn renderer_for(output: &Path, config: &RunConfig) -> Box<dyn Renderer> {
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html" | "htm") => Box::new(HtmlRenderer),
        _ => Box::new(PdfRenderer::new(config.pdf_command.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_chosen_by_extension() {
        let config = RunConfig::default();
        assert_eq!(renderer_for(Path::new("out.html"), &config).name(), "html");
        assert_eq!(renderer_for(Path::new("out.HTM"), &config).name(), "html");
        assert_eq!(renderer_for(Path::new("out.pdf"), &config).name(), "pdf");
        assert_eq!(renderer_for(Path::new("out"), &config).name(), "pdf");
    }
}
