//! PDF rendering through an external HTML → PDF command.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info, instrument};

use blogbook_shared::{BlogbookError, Document, Result};

use crate::Renderer;
use crate::html::render_html;
use crate::output::{RenderOutput, temp_sibling};

/// Longest stderr excerpt carried in a render error.
const STDERR_TAIL: usize = 2000;

/// Renders the HTML document, then runs `command` to convert it.
///
/// `{input}` and `{output}` in the command arguments are replaced with the
/// HTML and PDF paths; both are temp files next to the final output.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    command: Vec<String>,
}

impl PdfRenderer {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Renderer for PdfRenderer {
    fn name(&self) -> &str {
        "pdf"
    }

    #[instrument(skip_all, fields(output = %output.display(), sections = doc.sections.len()))]
    fn render(&self, doc: &Document, output: &Path) -> Result<RenderOutput> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| BlogbookError::config("render.pdf_command is empty"))?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BlogbookError::io(parent, e))?;
        }

        let html_path = temp_sibling(output, "html");
        let pdf_path = temp_sibling(output, "pdf");
        let _cleanup = TempFiles([html_path.clone(), pdf_path.clone()]);

        std::fs::write(&html_path, render_html(doc))
            .map_err(|e| BlogbookError::io(&html_path, e))?;

        let args: Vec<String> = args
            .iter()
            .map(|a| {
                a.replace("{input}", &html_path.to_string_lossy())
                    .replace("{output}", &pdf_path.to_string_lossy())
            })
            .collect();
        debug!(%program, ?args, "running PDF command");

        let result = Command::new(program).args(&args).output().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                BlogbookError::render(format!("PDF command '{program}' not found; install it or write to a .html output"))
            } else {
                BlogbookError::render(format!("failed to run '{program}': {e}"))
            }
        })?;

        if !result.status.success() {
            return Err(BlogbookError::render(format!(
                "'{program}' exited with {}: {}",
                result.status,
                stderr_tail(&result.stderr)
            )));
        }

        let bytes = std::fs::read(&pdf_path).map_err(|e| {
            BlogbookError::render(format!("'{program}' produced no output at {}: {e}", pdf_path.display()))
        })?;
        std::fs::rename(&pdf_path, output).map_err(|e| BlogbookError::io(output, e))?;

        let written = RenderOutput::describe(output, &bytes);
        info!(bytes = written.bytes, "PDF document written");
        Ok(written)
    }
}

/// Removes the intermediate files however rendering ends.
struct TempFiles([std::path::PathBuf; 2]);

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in &self.0 {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let start = text
        .char_indices()
        .rev()
        .nth(STDERR_TAIL)
        .map_or(0, |(i, _)| i);
    text[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogbook_shared::Cover;

    fn document() -> Document {
        Document {
            cover: Cover {
                title: "Blog".into(),
                subtitle: "0 articles".into(),
                source_url: "https://example.com/".into(),
            },
            toc: vec![],
            sections: vec![],
        }
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[cfg(unix)]
    #[test]
    fn runs_command_with_substituted_paths() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("book.pdf");
        let renderer = PdfRenderer::new(vec!["cp".into(), "{input}".into(), "{output}".into()]);

        let out = renderer.render(&document(), &output).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
        assert_eq!(out.bytes, written.len() as u64);
        assert_eq!(entries(dir.path()), vec!["book.pdf"]);
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_a_render_error_and_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("book.pdf");
        let renderer = PdfRenderer::new(vec!["false".into()]);

        let err = renderer.render(&document(), &output).unwrap_err();
        assert!(matches!(err, BlogbookError::Render(_)));
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn missing_command_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("book.pdf");
        let renderer = PdfRenderer::new(vec!["blogbook-no-such-command-xyz".into()]);

        let err = renderer.render(&document(), &output).unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(!output.exists());
    }

    #[test]
    fn stderr_is_truncated_from_the_front() {
        let long = "x".repeat(STDERR_TAIL + 50) + "END";
        let tail = stderr_tail(long.as_bytes());
        assert!(tail.ends_with("END"));
        assert!(tail.chars().count() <= STDERR_TAIL + 1);
    }
}
