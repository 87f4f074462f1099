//! WhatsApp message templates.
//!
//! Interpolation never fails: a missing value is rendered as a bracketed
//! placeholder (`[Monto]`) so the operator notices it before sending.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use time::Date;

use crate::format::{dias_entre, format_currency, format_fecha};
use crate::models::{Cobro, EstadoCobro};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    RecordatorioPago,
    RecordatorioAtraso,
    ReciboPago,
    Personalizado,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 4] = [
        TemplateKind::RecordatorioPago,
        TemplateKind::RecordatorioAtraso,
        TemplateKind::ReciboPago,
        TemplateKind::Personalizado,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            TemplateKind::RecordatorioPago => "recordatorio-pago",
            TemplateKind::RecordatorioAtraso => "recordatorio-atraso",
            TemplateKind::ReciboPago => "recibo-pago",
            TemplateKind::Personalizado => "personalizado",
        }
    }

    /// Overdue reminder when the charge is flagged late or its due date has passed.
    pub fn para_cobro(cobro: &Cobro, hoy: Date) -> Self {
        let vencido = cobro.vencimiento().is_some_and(|v| dias_entre(v, hoy) > 0);
        if cobro.estado_cobro == EstadoCobro::Atrasado || vencido {
            TemplateKind::RecordatorioAtraso
        } else {
            TemplateKind::RecordatorioPago
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        TemplateKind::ALL
            .into_iter()
            .find(|k| k.slug() == wanted)
            .ok_or_else(|| format!("unknown template `{s}`"))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatosPlantilla {
    pub nombre_cliente: Option<String>,
    pub monto: Option<f64>,
    pub moneda: Option<String>,
    pub servicio: Option<String>,
    pub fecha_vencimiento: Option<Date>,
    pub fecha_pago: Option<Date>,
    pub numero_referencia: Option<String>,
    pub empresa: Option<String>,
    /// Operator text for [`TemplateKind::Personalizado`].
    pub texto: Option<String>,
}

fn limpio(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

impl DatosPlantilla {
    pub fn from_cobro(cobro: &Cobro, moneda_default: &str) -> Self {
        Self {
            nombre_cliente: limpio(cobro.nombre_cliente()),
            monto: cobro.monto_value(),
            moneda: Some(cobro.moneda_or(moneda_default).to_string()),
            servicio: limpio(cobro.concepto()),
            fecha_vencimiento: cobro.vencimiento(),
            fecha_pago: cobro.pagado_el(),
            numero_referencia: limpio(cobro.numero_referencia.as_deref()),
            ..Self::default()
        }
    }

    pub fn with_empresa(mut self, empresa: Option<&str>) -> Self {
        self.empresa = limpio(empresa);
        self
    }

    pub fn with_nombre_cliente(mut self, nombre: Option<&str>) -> Self {
        if self.nombre_cliente.is_none() {
            self.nombre_cliente = limpio(nombre);
        }
        self
    }
}

/// Values after placeholder substitution.
struct Campos {
    nombre: String,
    monto: String,
    servicio: String,
    vencimiento: String,
    pago: String,
    referencia: String,
    empresa: String,
    dias_atraso: String,
    dias_restantes: Option<i64>,
}

fn o_marcador(v: Option<&String>, marcador: &str) -> String {
    v.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("[{marcador}]"))
}

impl Campos {
    fn new(d: &DatosPlantilla, hoy: Date) -> Self {
        let monto = match d.monto.filter(|m| m.is_finite()) {
            Some(m) => format_currency(m, d.moneda.as_deref().unwrap_or("")),
            None => "[Monto]".to_string(),
        };
        let dias = d.fecha_vencimiento.map(|v| dias_entre(v, hoy));
        Self {
            nombre: o_marcador(d.nombre_cliente.as_ref(), "Nombre Cliente"),
            monto,
            servicio: o_marcador(d.servicio.as_ref(), "Servicio"),
            vencimiento: d
                .fecha_vencimiento
                .map(format_fecha)
                .unwrap_or_else(|| "[Fecha Vencimiento]".to_string()),
            pago: d
                .fecha_pago
                .map(format_fecha)
                .unwrap_or_else(|| "[Fecha Pago]".to_string()),
            referencia: o_marcador(d.numero_referencia.as_ref(), "Número Referencia"),
            empresa: o_marcador(d.empresa.as_ref(), "Empresa"),
            dias_atraso: match dias {
                Some(n) => n.max(0).to_string(),
                None => "[Días Atraso]".to_string(),
            },
            dias_restantes: dias.map(|n| -n),
        }
    }

    fn token(&self, nombre: &str) -> Option<&str> {
        Some(match nombre {
            "nombre_cliente" | "cliente" => self.nombre.as_str(),
            "monto" => self.monto.as_str(),
            "servicio" => self.servicio.as_str(),
            "fecha_vencimiento" => self.vencimiento.as_str(),
            "fecha_pago" => self.pago.as_str(),
            "numero_referencia" | "referencia" => self.referencia.as_str(),
            "empresa" => self.empresa.as_str(),
            "dias_atraso" => self.dias_atraso.as_str(),
            _ => return None,
        })
    }
}

fn plazo(dias_restantes: Option<i64>) -> String {
    match dias_restantes {
        Some(n) if n > 1 => format!("Faltan {n} días para el vencimiento."),
        Some(1) => "Vence mañana.".to_string(),
        Some(0) => "Vence hoy.".to_string(),
        _ => String::new(),
    }
}

/// Replaces `{token}` occurrences; unknown tokens are kept verbatim.
fn reemplazar_tokens(texto: &str, campos: &Campos) -> String {
    let mut out = String::with_capacity(texto.len());
    let mut rest = texto;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let nombre = after[..end].trim().to_ascii_lowercase();
                match campos.token(&nombre) {
                    Some(v) => out.push_str(v),
                    None => out.push_str(&rest[start..start + end + 2]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn interpolar(kind: TemplateKind, datos: &DatosPlantilla, hoy: Date) -> String {
    let c = Campos::new(datos, hoy);
    match kind {
        TemplateKind::RecordatorioPago => {
            let plazo = plazo(c.dias_restantes);
            let mut msg = format!(
                "Hola {}, le recordamos que su pago de {} por {} vence el {}.",
                c.nombre, c.monto, c.servicio, c.vencimiento
            );
            if !plazo.is_empty() {
                msg.push(' ');
                msg.push_str(&plazo);
            }
            msg.push_str(&format!("\n\nGracias por su preferencia.\n{}", c.empresa));
            msg
        }
        TemplateKind::RecordatorioAtraso => format!(
            "Estimado(a) {}, su pago de {} por {} venció el {} y presenta {} días de atraso. \
             Le solicitamos regularizarlo a la brevedad.\n\nSi ya realizó el pago, por favor ignore este mensaje.\n{}",
            c.nombre, c.monto, c.servicio, c.vencimiento, c.dias_atraso, c.empresa
        ),
        TemplateKind::ReciboPago => format!(
            "Hola {}, confirmamos la recepción de su pago de {} por {} el {}. \
             Número de referencia: {}.\n\n¡Gracias por su pago!\n{}",
            c.nombre, c.monto, c.servicio, c.pago, c.referencia, c.empresa
        ),
        TemplateKind::Personalizado => match datos.texto.as_deref() {
            Some(t) if !t.trim().is_empty() => reemplazar_tokens(t, &c),
            _ => String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const HOY: Date = date!(2026 - 10 - 19);

    fn datos() -> DatosPlantilla {
        DatosPlantilla {
            nombre_cliente: Some("María Pérez".into()),
            monto: Some(1250.0),
            moneda: Some("PEN".into()),
            servicio: Some("Hosting anual".into()),
            fecha_vencimiento: Some(date!(2026 - 10 - 22)),
            empresa: Some("PEGASUS SAC".into()),
            ..DatosPlantilla::default()
        }
    }

    #[test]
    fn payment_reminder_mentions_remaining_days() {
        let msg = interpolar(TemplateKind::RecordatorioPago, &datos(), HOY);
        assert!(msg.starts_with("Hola María Pérez, le recordamos que su pago de S/ 1,250.00 por Hosting anual vence el 22/10/2026."));
        assert!(msg.contains("Faltan 3 días"));
        assert!(msg.ends_with("PEGASUS SAC"));
    }

    #[test]
    fn missing_amount_shows_placeholder() {
        let d = DatosPlantilla {
            monto: None,
            ..datos()
        };
        for kind in [TemplateKind::RecordatorioPago, TemplateKind::RecordatorioAtraso, TemplateKind::ReciboPago] {
            let msg = interpolar(kind, &d, HOY);
            assert!(msg.contains("[Monto]"), "{kind}: {msg}");
            assert!(!msg.contains("NaN"));
        }
        let nan = DatosPlantilla {
            monto: Some(f64::NAN),
            ..datos()
        };
        assert!(interpolar(TemplateKind::RecordatorioPago, &nan, HOY).contains("[Monto]"));
    }

    #[test]
    fn overdue_days_use_calendar_difference() {
        let d = DatosPlantilla {
            fecha_vencimiento: Some(date!(2026 - 10 - 04)),
            ..datos()
        };
        let msg = interpolar(TemplateKind::RecordatorioAtraso, &d, HOY);
        assert!(msg.contains("venció el 04/10/2026 y presenta 15 días de atraso"));

        let msg = interpolar(TemplateKind::RecordatorioAtraso, &DatosPlantilla::default(), HOY);
        assert!(msg.contains("[Nombre Cliente]"));
        assert!(msg.contains("[Fecha Vencimiento]"));
        assert!(msg.contains("[Días Atraso]"));
    }

    #[test]
    fn receipt_placeholders() {
        let msg = interpolar(TemplateKind::ReciboPago, &datos(), HOY);
        assert!(msg.contains("[Fecha Pago]"));
        assert!(msg.contains("[Número Referencia]"));
    }

    #[test]
    fn custom_text_interpolates_tokens() {
        assert_eq!(interpolar(TemplateKind::Personalizado, &datos(), HOY), "");
        let d = DatosPlantilla {
            texto: Some("Hola {nombre_cliente}: {MONTO} al {fecha_vencimiento} {otro} {sin cerrar".into()),
            ..datos()
        };
        assert_eq!(
            interpolar(TemplateKind::Personalizado, &d, HOY),
            "Hola María Pérez: S/ 1,250.00 al 22/10/2026 {otro} {sin cerrar"
        );
    }

    #[test]
    fn kind_for_charge() {
        let cobro: Cobro = serde_json::from_value(serde_json::json!({
            "id": 1, "fecha_vencimiento": "2026-10-18", "estado_cobro": "Pendiente"
        }))
        .unwrap();
        assert_eq!(TemplateKind::para_cobro(&cobro, HOY), TemplateKind::RecordatorioAtraso);
        assert_eq!(
            TemplateKind::para_cobro(&cobro, date!(2026 - 10 - 18)),
            TemplateKind::RecordatorioPago
        );
        assert_eq!("recibo_pago".parse::<TemplateKind>(), Ok(TemplateKind::ReciboPago));
    }
}
