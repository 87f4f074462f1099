use serde::Serialize;
use time::Date;

use crate::format::{add_days, format_fixed2, iso_date};
use crate::models::{Cobro, EstadoCobro};

/// Days ahead of today covered by the upcoming-dues card, today included.
pub const VENTANA_DIAS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketVencimiento {
    /// ISO date (`YYYY-MM-DD`).
    pub date: String,
    pub count: usize,
    pub amount: f64,
    pub members: Vec<Cobro>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vencimientos {
    pub total_count: usize,
    /// Two-decimal fixed string.
    pub total_amount: String,
    pub buckets: Vec<BucketVencimiento>,
}

impl Default for Vencimientos {
    fn default() -> Self {
        Self {
            total_count: 0,
            total_amount: format_fixed2(0.0),
            buckets: Vec::new(),
        }
    }
}

/// Groups pending charges due in `[hoy, hoy + 7]` by due date.
///
/// Records that are not `Pendiente` are dropped even if the server already
/// filtered them. Charges without a parseable due date are excluded and
/// malformed amounts count as zero.
pub fn agrupar_vencimientos(cobros: &[Cobro], hoy: Date) -> Vencimientos {
    let limite = add_days(hoy, VENTANA_DIAS);

    let mut en_ventana: Vec<(Date, &Cobro)> = cobros
        .iter()
        .filter(|c| c.estado_cobro == EstadoCobro::Pendiente)
        .filter_map(|c| c.vencimiento().map(|d| (d, c)))
        .filter(|(d, _)| hoy <= *d && *d <= limite)
        .collect();
    en_ventana.sort_by_key(|(d, _)| *d);

    let mut buckets: Vec<BucketVencimiento> = Vec::new();
    let mut total = 0.0;
    for (fecha, c) in en_ventana {
        let monto = match c.monto_value() {
            Some(v) => v,
            None => {
                tracing::warn!(cobro = %c.id, monto = ?c.monto, "invalid amount, counted as 0");
                0.0
            }
        };
        total += monto;

        let key = iso_date(fecha);
        match buckets.last_mut() {
            Some(b) if b.date == key => {
                b.count += 1;
                b.amount += monto;
                b.members.push(c.clone());
            }
            _ => buckets.push(BucketVencimiento {
                date: key,
                count: 1,
                amount: monto,
                members: vec![c.clone()],
            }),
        }
    }

    Vencimientos {
        total_count: buckets.iter().map(|b| b.count).sum(),
        total_amount: format_fixed2(total),
        buckets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    const HOY: Date = date!(2026 - 10 - 19);

    fn cobros(v: serde_json::Value) -> Vec<Cobro> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn empty_input_gives_zero_totals() {
        let v = agrupar_vencimientos(&[], HOY);
        assert_eq!(v.total_count, 0);
        assert_eq!(v.total_amount, "0.00");
        assert!(v.buckets.is_empty());
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let list = cobros(json!([
            {"id": 1, "monto": 10, "fecha_vencimiento": "2026-10-18"},
            {"id": 2, "monto": 20, "fecha_vencimiento": "2026-10-19T12:00:00.000Z"},
            {"id": 3, "monto": 30, "fecha_vencimiento": "2026-10-26"},
            {"id": 4, "monto": 40, "fecha_vencimiento": "2026-10-27"}
        ]));
        let v = agrupar_vencimientos(&list, HOY);
        let dates: Vec<&str> = v.buckets.iter().map(|b| b.date.as_str()).collect();
        assert_eq!(dates, vec!["2026-10-19", "2026-10-26"]);
        assert_eq!(v.total_amount, "50.00");
    }

    #[test]
    fn buckets_sum_to_totals_and_ignore_other_states() {
        let list = cobros(json!([
            {"id": 1, "monto": "100.50", "fecha_vencimiento": "2026-10-21"},
            {"id": 2, "monto": 99.5, "fecha_vencimiento": "2026-10-20"},
            {"id": 3, "monto": 1, "fecha_vencimiento": "2026-10-21"},
            {"id": 4, "monto": 500, "fecha_vencimiento": "2026-10-21", "estado_cobro": "Pagado"},
            {"id": 5, "monto": 500, "fecha_vencimiento": "2026-10-22", "estado": "Atrasado"},
            {"id": 6, "monto": "n/a", "fecha_vencimiento": "2026-10-22"},
            {"id": 7, "monto": 5, "fecha_vencimiento": "pronto"},
            {"id": 8, "monto": 5}
        ]));
        let v = agrupar_vencimientos(&list, HOY);
        assert_eq!(v.total_count, 4);
        assert_eq!(v.total_amount, "201.00");
        assert_eq!(v.buckets.len(), 3);
        assert_eq!(v.buckets[0].date, "2026-10-20");
        assert_eq!(v.buckets[1].count, 2);
        assert_eq!(v.buckets[1].amount, 101.5);
        assert_eq!(v.buckets[2].amount, 0.0);
        let count: usize = v.buckets.iter().map(|b| b.count).sum();
        let amount: f64 = v.buckets.iter().map(|b| b.amount).sum();
        assert_eq!(count, v.total_count);
        assert_eq!(format_fixed2(amount), v.total_amount);
    }

    #[test]
    fn due_today_lands_in_first_bucket() {
        let list = cobros(json!([
            {"id": 1, "monto": 80, "fecha_vencimiento": "2026-10-23"},
            {"id": 2, "monto": 20, "fecha_vencimiento": "2026-10-19"}
        ]));
        let v = agrupar_vencimientos(&list, HOY);
        assert_eq!(v.buckets[0].date, "2026-10-19");
        assert_eq!(v.buckets[0].members[0].id, crate::models::RecordId::Num(2));
    }
}
