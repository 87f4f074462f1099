//! Markup for reports and receipts, and the export artifacts built from it.

pub mod csv;
pub mod html;

use mime::Mime;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::reportes::ReportView;

pub use html::{HtmlRenderer, Recibo};

pub trait Render<M: ?Sized> {
    fn render(&self, model: &M) -> String;
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn sanitize_filename(input: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        let ok = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' || ch == ' ';
        out.push(if ok { ch } else { '_' });
    }
    let trimmed = out.trim().to_string();
    if trimmed.is_empty() { fallback.to_string() } else { trimmed }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Html,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn mime(&self) -> Mime {
        match self {
            ExportFormat::Html => mime::TEXT_HTML_UTF_8,
            ExportFormat::Csv => mime::TEXT_CSV_UTF_8,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(ExportFormat::Html),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unsupported export format `{other}` (expected html or csv)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime: Mime,
    pub body: String,
}

impl ExportArtifact {
    /// Writes the artifact under `dir`, creating it when missing.
    pub async fn guardar(&self, dir: &Path) -> Result<PathBuf, String> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| format!("cannot create {}: {e}", dir.display()))?;
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, self.body.as_bytes())
            .await
            .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
        tracing::info!(path = %path.display(), mime = %self.mime, "export written");
        Ok(path)
    }
}

/// Renders an already formatted report; the view is reused verbatim.
pub fn exportar_reporte(view: &ReportView, formato: ExportFormat) -> ExportArtifact {
    let body = match formato {
        ExportFormat::Html => HtmlRenderer.render(view),
        ExportFormat::Csv => csv::CsvRenderer.render(view),
    };
    let stem = sanitize_filename(&format!("{}_{}", view.kind.slug(), view.generado), "reporte");
    ExportArtifact {
        file_name: format!("{stem}.{}", formato.extension()),
        mime: formato.mime(),
        body,
    }
}

pub fn exportar_recibo(recibo: &Recibo) -> ExportArtifact {
    let stem = sanitize_filename(&format!("recibo_{}", recibo.numero), "recibo");
    ExportArtifact {
        file_name: format!("{stem}.html"),
        mime: ExportFormat::Html.mime(),
        body: HtmlRenderer.render(recibo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<b>"Ana" & 'Beto'</b>"#),
            "&lt;b&gt;&quot;Ana&quot; &amp; &#39;Beto&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn filenames_keep_safe_characters_only() {
        assert_eq!(sanitize_filename("resumen-pagos_19/10/2026", "x"), "resumen-pagos_19_10_2026");
        assert_eq!(sanitize_filename("   ", "reporte"), "reporte");
        assert_eq!(sanitize_filename("ñandú.csv", "x"), "_and_.csv");
    }

    #[test]
    fn export_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Html.mime().essence_str(), "text/html");
    }

    #[tokio::test]
    async fn artifact_is_written_under_export_dir() {
        let dir = std::env::temp_dir().join(format!("pegasus-export-{}", uuid::Uuid::new_v4()));
        let artifact = ExportArtifact {
            file_name: "a.csv".into(),
            mime: ExportFormat::Csv.mime(),
            body: "x,y\n".into(),
        };
        let path = artifact.guardar(&dir.join("nested")).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x,y\n");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
