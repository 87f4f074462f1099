use serde::Serialize;

use super::{escape_html, Render};
use crate::format::{format_currency, format_fecha, Badge, BadgeTone};
use crate::models::{Cobro, EstadoCobro, Settings};
use crate::reportes::{ReportView, Tabla, Tendencia};

/// Receipt for a paid charge, fully formatted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recibo {
    pub numero: String,
    pub empresa: String,
    pub empresa_ruc: String,
    pub empresa_direccion: String,
    pub empresa_telefono: String,
    pub cliente: String,
    pub concepto: String,
    pub monto: String,
    pub fecha_emision: String,
    pub fecha_pago: String,
    pub metodo_pago: String,
    pub numero_referencia: String,
    pub estado: Badge,
}

fn o_guion(v: Option<&str>) -> String {
    v.map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("-")
        .to_string()
}

impl Recibo {
    pub fn from_cobro(cobro: &Cobro, settings: &Settings, moneda_default: &str) -> Result<Self, String> {
        if cobro.estado_cobro != EstadoCobro::Pagado {
            return Err("Solo se pueden generar recibos de cobros pagados.".to_string());
        }
        let moneda = settings.moneda.as_deref().unwrap_or(moneda_default);
        Ok(Self {
            numero: cobro.id.to_string(),
            empresa: o_guion(Some(settings.nombre_empresa.as_str())),
            empresa_ruc: settings.ruc.trim().to_string(),
            empresa_direccion: settings.direccion.trim().to_string(),
            empresa_telefono: settings.telefono.trim().to_string(),
            cliente: o_guion(cobro.nombre_cliente()),
            concepto: o_guion(cobro.concepto()),
            monto: format_currency(cobro.monto_value().unwrap_or(0.0), cobro.moneda_or(moneda)),
            fecha_emision: cobro
                .fecha_emision
                .as_deref()
                .map(crate::format::format_fecha_str)
                .unwrap_or_else(|| "-".to_string()),
            fecha_pago: cobro.pagado_el().map(format_fecha).unwrap_or_else(|| "-".to_string()),
            metodo_pago: o_guion(cobro.metodo_pago.as_deref()),
            numero_referencia: o_guion(cobro.numero_referencia.as_deref()),
            estado: cobro.estado_cobro.badge(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

const TD_LABEL: &str = "padding:6px 8px;font-size:13px;color:#4b5563;";
const TD_VALUE: &str = "padding:6px 8px;font-size:13px;color:#111827;font-weight:600;";
const TH: &str = "padding:8px;font-size:12px;color:#374151;text-align:left;border-bottom:1px solid #e6e8ec;background-color:#f9fafb;";
const TD: &str = "padding:8px;font-size:13px;color:#111827;border-bottom:1px solid #f1f2f4;";

fn tone_color(tone: &BadgeTone) -> &'static str {
    match tone {
        BadgeTone::Success => "#15803d",
        BadgeTone::Warning => "#b45309",
        BadgeTone::Danger => "#b91c1c",
        BadgeTone::Secondary => "#6b7280",
        BadgeTone::Info => "#1d4ed8",
    }
}

fn open_document(html: &mut String, title: &str) {
    html.push_str("<!doctype html><html><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>{}</title></head>", escape_html(title)));
    html.push_str("<body style=\"margin:0;padding:24px;background-color:#f6f7f9;font-family:Arial,Helvetica,sans-serif;\">");
    html.push_str("<div style=\"max-width:900px;margin:0 auto;background-color:#ffffff;border:1px solid #e6e8ec;border-radius:10px;padding:24px;\">");
}

fn close_document(html: &mut String) {
    html.push_str("</div></body></html>");
}

fn push_detail_row(html: &mut String, label: &str, value: &str) {
    let v = value.trim();
    if v.is_empty() {
        return;
    }
    html.push_str(&format!(
        "<tr><td style=\"{TD_LABEL}\">{}</td><td align=\"right\" style=\"{TD_VALUE}\">{}</td></tr>",
        escape_html(label),
        escape_html(v)
    ));
}

fn push_table(html: &mut String, t: &Tabla) {
    html.push_str(&format!(
        "<h2 style=\"font-size:15px;color:#111827;margin:24px 0 8px 0;\">{}</h2>",
        escape_html(&t.titulo)
    ));
    if t.filas.is_empty() {
        html.push_str("<p style=\"font-size:13px;color:#6b7280;\">Sin datos para el periodo.</p>");
        return;
    }
    html.push_str("<table width=\"100%\" cellspacing=\"0\" cellpadding=\"0\" style=\"border:1px solid #e6e8ec;border-collapse:collapse;\"><thead><tr>");
    for c in &t.columnas {
        html.push_str(&format!("<th style=\"{TH}\">{}</th>", escape_html(c)));
    }
    html.push_str("</tr></thead><tbody>");
    for fila in &t.filas {
        html.push_str("<tr>");
        for celda in fila {
            html.push_str(&format!("<td style=\"{TD}\">{}</td>", escape_html(celda)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
}

impl Render<ReportView> for HtmlRenderer {
    fn render(&self, view: &ReportView) -> String {
        let mut html = String::new();
        open_document(&mut html, &view.titulo);

        html.push_str(&format!(
            "<h1 style=\"font-size:20px;color:#111827;margin:0 0 4px 0;\">{}</h1>",
            escape_html(&view.titulo)
        ));
        html.push_str("<table role=\"presentation\" cellspacing=\"0\" cellpadding=\"0\">");
        push_detail_row(&mut html, "Periodo", &view.periodo);
        if let Some(c) = view.comparado_con.as_deref() {
            push_detail_row(&mut html, "Comparado con", c);
        }
        push_detail_row(&mut html, "Generado", &view.generado);
        html.push_str("</table>");

        if !view.kpis.is_empty() {
            html.push_str("<table width=\"100%\" cellspacing=\"8\" cellpadding=\"0\" style=\"margin-top:16px;\"><tr>");
            for k in &view.kpis {
                html.push_str("<td style=\"border:1px solid #e6e8ec;border-radius:8px;padding:12px;vertical-align:top;\">");
                html.push_str(&format!(
                    "<div style=\"font-size:12px;color:#6b7280;\">{}</div><div style=\"font-size:18px;font-weight:700;color:#111827;\">{}</div>",
                    escape_html(&k.label),
                    escape_html(&k.valor)
                ));
                if let Some(c) = k.comparacion.as_ref() {
                    let color = match c.tendencia {
                        Tendencia::Sube => "#15803d",
                        Tendencia::Baja => "#b91c1c",
                        Tendencia::Igual => "#6b7280",
                    };
                    html.push_str(&format!(
                        "<div style=\"font-size:12px;color:{color};\">{}</div>",
                        escape_html(&c.texto)
                    ));
                }
                html.push_str("</td>");
            }
            html.push_str("</tr></table>");
        }

        for t in &view.tablas {
            push_table(&mut html, t);
        }

        close_document(&mut html);
        html
    }
}

impl Render<Recibo> for HtmlRenderer {
    fn render(&self, r: &Recibo) -> String {
        let mut html = String::new();
        open_document(&mut html, &format!("Recibo {}", r.numero));

        html.push_str(&format!(
            "<div style=\"font-size:18px;font-weight:700;color:#111827;\">{}</div>",
            escape_html(&r.empresa)
        ));
        for linea in [&r.empresa_ruc, &r.empresa_direccion, &r.empresa_telefono] {
            if !linea.is_empty() {
                html.push_str(&format!(
                    "<div style=\"font-size:12px;color:#6b7280;\">{}</div>",
                    escape_html(linea)
                ));
            }
        }

        html.push_str(&format!(
            "<h1 style=\"font-size:16px;color:#111827;margin:20px 0 8px 0;\">Recibo de pago N° {} <span style=\"font-size:12px;color:{};\">{}</span></h1>",
            escape_html(&r.numero),
            tone_color(&r.estado.tone),
            escape_html(&r.estado.label)
        ));

        html.push_str("<table role=\"presentation\" width=\"100%\" cellspacing=\"0\" cellpadding=\"0\" style=\"border:1px solid #e6e8ec;border-radius:10px;\">");
        push_detail_row(&mut html, "Cliente", &r.cliente);
        push_detail_row(&mut html, "Concepto", &r.concepto);
        push_detail_row(&mut html, "Fecha de emisión", &r.fecha_emision);
        push_detail_row(&mut html, "Fecha de pago", &r.fecha_pago);
        push_detail_row(&mut html, "Método de pago", &r.metodo_pago);
        push_detail_row(&mut html, "N° de referencia", &r.numero_referencia);
        html.push_str(&format!(
            "<tr><td style=\"{TD_LABEL}\">Total pagado</td><td align=\"right\" style=\"padding:6px 8px;font-size:16px;color:#111827;font-weight:800;\">{}</td></tr>",
            escape_html(&r.monto)
        ));
        html.push_str("</table>");
        html.push_str("<p style=\"font-size:12px;color:#6b7280;margin-top:16px;\">Gracias por su pago.</p>");

        close_document(&mut html);
        html
    }
}
