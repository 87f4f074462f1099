use serde::Serialize;
use std::sync::OnceLock;
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, Time, UtcOffset};

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DISPLAY_DATE: &[BorrowedFormatItem<'static>] = format_description!("[day]/[month]/[year]");

pub fn format_money(v: f64) -> String {
    let v = if v.is_finite() { v } else { 0.0 };
    let s = format!("{:.2}", v.abs());
    let (int_part, dec_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let mut out = String::new();
    let chars: Vec<char> = int_part.chars().collect();
    let mut cnt = 0;
    for i in (0..chars.len()).rev() {
        if cnt == 3 {
            out.push(',');
            cnt = 0;
        }
        out.push(chars[i]);
        cnt += 1;
    }
    let int_with_sep: String = out.chars().rev().collect();
    // "-0.00" is never shown
    let sign = if v < 0.0 && s != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, int_with_sep, dec_part)
}

/// Plain two-decimal representation used in totals and CSV cells.
pub fn format_fixed2(v: f64) -> String {
    let v = if v.is_finite() { v } else { 0.0 };
    let s = format!("{:.2}", v);
    if s == "-0.00" { "0.00".to_string() } else { s }
}

pub fn currency_symbol_for(code: &str) -> Option<&'static str> {
    match code.trim().to_ascii_uppercase().as_str() {
        "PEN" => Some("S/"),
        "USD" => Some("$"),
        "EUR" => Some("€"),
        _ => None,
    }
}

/// `S/ 1,250.00`; unknown currency codes are shown verbatim in front of the amount.
pub fn format_currency(amount: f64, moneda: &str) -> String {
    let code = moneda.trim();
    match currency_symbol_for(code) {
        Some(symbol) => format!("{} {}", symbol, format_money(amount)),
        None if code.is_empty() => format_money(amount),
        None => format!("{} {}", code.to_ascii_uppercase(), format_money(amount)),
    }
}

pub fn format_porcentaje(v: f64) -> String {
    format!("{}%", format_fixed2(v))
}

/// Signed percentage for period-over-period comparisons (`+12.50%`, `-3.00%`).
pub fn format_variacion(v: f64) -> String {
    let fixed = format_fixed2(v);
    if fixed.starts_with('-') || fixed == "0.00" {
        format!("{}%", fixed)
    } else {
        format!("+{}%", fixed)
    }
}

/// Parses a backend amount. Returns `None` for empty, non-numeric or non-finite input.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Accepts `YYYY-MM-DD` as well as full ISO timestamps, read in local time.
pub fn parse_fecha(raw: &str) -> Option<Date> {
    parse_fecha_en(raw, local_offset())
}

/// Timestamps carrying an offset are moved to `offset` before the date is
/// taken. UTC midnight is how date-only columns are serialized, so it keeps
/// its calendar day. Naive timestamps keep their written date.
pub fn parse_fecha_en(raw: &str, offset: UtcOffset) -> Option<Date> {
    let s = raw.trim();
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        if dt.offset().is_utc() && dt.time() == Time::MIDNIGHT {
            return Some(dt.date());
        }
        return dt.checked_to_offset(offset).map(|local| local.date());
    }
    let head = s.get(..10)?;
    if s.len() > 10 {
        let sep = s.as_bytes()[10];
        if sep != b'T' && sep != b' ' {
            return None;
        }
    }
    Date::parse(head, ISO_DATE).ok()
}

pub fn iso_date(d: Date) -> String {
    d.format(ISO_DATE)
        .unwrap_or_else(|_| format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day()))
}

pub fn format_fecha(d: Date) -> String {
    d.format(DISPLAY_DATE)
        .unwrap_or_else(|_| iso_date(d))
}

/// Display form of a raw backend date; unparseable input is returned trimmed.
pub fn format_fecha_str(raw: &str) -> String {
    match parse_fecha(raw) {
        Some(d) => format_fecha(d),
        None => raw.trim().to_string(),
    }
}

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// The machine's UTC offset, read once. The OS can only be asked safely
/// while the process is single-threaded; afterwards this falls back to UTC.
pub fn local_offset() -> UtcOffset {
    *LOCAL_OFFSET.get_or_init(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

/// Today's calendar date at [`local_offset`].
pub fn today_local() -> Date {
    let now = OffsetDateTime::now_utc();
    now.checked_to_offset(local_offset()).unwrap_or(now).date()
}

pub fn add_days(d: Date, days: i64) -> Date {
    d.checked_add(Duration::days(days)).unwrap_or(d)
}

/// Whole calendar days from `desde` to `hasta`. Both sides are dates, so the
/// result is exact; negative when `hasta` precedes `desde`.
pub fn dias_entre(desde: Date, hasta: Date) -> i64 {
    (hasta - desde).whole_days()
}

/// Days a charge is late at `referencia`; zero when not yet due.
pub fn dias_atraso(vencimiento: Date, referencia: Date) -> i64 {
    dias_entre(vencimiento, referencia).max(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BadgeTone {
    Success,
    Warning,
    Danger,
    Secondary,
    Info,
}

impl BadgeTone {
    pub fn css_class(&self) -> &'static str {
        match self {
            BadgeTone::Success => "badge-success",
            BadgeTone::Warning => "badge-warning",
            BadgeTone::Danger => "badge-danger",
            BadgeTone::Secondary => "badge-secondary",
            BadgeTone::Info => "badge-info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub label: String,
    pub tone: BadgeTone,
}

pub fn badge_estado(estado: &str) -> Badge {
    let label = estado.trim();
    let tone = match label.to_ascii_lowercase().as_str() {
        "pagado" | "activo" | "connected" | "conectado" => BadgeTone::Success,
        "pendiente" | "connecting" => BadgeTone::Warning,
        "atrasado" | "vencido" => BadgeTone::Danger,
        "anulado" | "inactivo" | "disconnected" | "desconectado" => BadgeTone::Secondary,
        _ => BadgeTone::Info,
    };
    Badge {
        label: if label.is_empty() { "-".to_string() } else { label.to_string() },
        tone,
    }
}
