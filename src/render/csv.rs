use super::Render;
use crate::reportes::ReportView;

pub fn csv_escape_field(input: &str) -> String {
    let needs_quotes = input.contains(',') || input.contains('"') || input.contains('\n') || input.contains('\r');
    if !needs_quotes {
        return input.to_string();
    }
    let escaped = input.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

pub fn csv_join_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut out = String::new();
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&csv_escape_field(f.as_ref()));
    }
    out
}

/// One CSV document per report: header lines, the KPIs, then each table
/// separated by a blank line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRenderer;

impl Render<ReportView> for CsvRenderer {
    fn render(&self, view: &ReportView) -> String {
        let mut lines = vec![
            csv_join_row(&[view.titulo.as_str()]),
            csv_join_row(&["Periodo", view.periodo.as_str()]),
        ];
        if let Some(c) = view.comparado_con.as_deref() {
            lines.push(csv_join_row(&["Comparado con", c]));
        }
        lines.push(csv_join_row(&["Generado", view.generado.as_str()]));

        if !view.kpis.is_empty() {
            lines.push(String::new());
            lines.push(csv_join_row(&["Indicador", "Valor", "Variación"]));
            for k in &view.kpis {
                let variacion = k.comparacion.as_ref().map(|c| c.texto.as_str()).unwrap_or("");
                lines.push(csv_join_row(&[k.label.as_str(), k.valor.as_str(), variacion]));
            }
        }

        for t in &view.tablas {
            lines.push(String::new());
            lines.push(csv_join_row(&[t.titulo.as_str()]));
            lines.push(csv_join_row(t.columnas.as_slice()));
            for fila in &t.filas {
                lines.push(csv_join_row(fila.as_slice()));
            }
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reportes::{Kpi, ReportKind, Tabla};

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(csv_escape_field("plain"), "plain");
        assert_eq!(csv_escape_field("S/ 1,250.00"), "\"S/ 1,250.00\"");
        assert_eq!(csv_escape_field("di \"hola\""), "\"di \"\"hola\"\"\"");
        assert_eq!(csv_join_row(&["a", "b,c"]), "a,\"b,c\"");
    }

    #[test]
    fn report_sections_are_separated() {
        let mut tabla = Tabla::new("Pagos por método", &["Método", "Monto"]);
        tabla.filas.push(vec!["Yape".into(), "S/ 1,000.00".into()]);
        let view = ReportView {
            kind: ReportKind::ResumenPagos,
            titulo: "Resumen de pagos".into(),
            periodo: "01/10/2026 - 31/10/2026".into(),
            comparado_con: None,
            generado: "19/10/2026".into(),
            kpis: vec![Kpi::comparado("Total cobrado", "S/ 150.00".into(), 150.0, Some(100.0))],
            tablas: vec![tabla],
            series: Vec::new(),
        };
        let csv = CsvRenderer.render(&view);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Resumen de pagos");
        assert_eq!(lines[3], "");
        assert_eq!(lines[5], "Total cobrado,S/ 150.00,+50.00%");
        assert_eq!(lines[7], "Pagos por método");
        assert_eq!(lines[9], "Yape,\"S/ 1,000.00\"");
        assert!(csv.ends_with('\n'));
    }
}
