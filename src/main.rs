use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use time::Date;
use tracing_subscriber::EnvFilter;

use pegasus_lib::api::ApiClient;
use pegasus_lib::config::Config;
use pegasus_lib::dashboard::Dashboard;
use pegasus_lib::filtros::{CobrosView, FiltroLocal};
use pegasus_lib::format::{
    badge_estado, format_currency, format_fecha, format_fecha_str, iso_date, local_offset, parse_fecha,
    today_local,
};
use pegasus_lib::models::{Cobro, EstadoCobro, RecordId, RegistroPago, Rol};
use pegasus_lib::notify::{MemoryNotifier, NoticeLevel, Notifier};
use pegasus_lib::plantillas::{interpolar, DatosPlantilla, TemplateKind};
use pegasus_lib::recordatorios::Dispatcher;
use pegasus_lib::render::{exportar_recibo, ExportFormat, Recibo};
use pegasus_lib::reportes::{Periodo, ReportKind, ReportService};
use pegasus_lib::session::{Seccion, Session, SessionStore, UsuarioSesion};

#[derive(Parser, Debug)]
#[command(name = "pegasus", about = "PEGASUS billing and collections back office")]
struct Cli {
    /// Overrides PEGASUS_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Overrides PEGASUS_EXPORT_DIR.
    #[arg(long, global = true)]
    export_dir: Option<PathBuf>,

    /// Log in with these credentials instead of PEGASUS_TOKEN.
    #[arg(long, global = true)]
    usuario: Option<String>,

    #[arg(long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints a token to reuse through PEGASUS_TOKEN.
    Login,

    Dashboard,

    Cobros {
        #[arg(long)]
        estado: Option<String>,

        #[arg(long)]
        cliente: Option<String>,

        /// Matches client, concept, reference or id.
        #[arg(long)]
        buscar: Option<String>,

        #[arg(long)]
        desde: Option<String>,

        #[arg(long)]
        hasta: Option<String>,
    },

    Reporte {
        tipo: ReportKind,

        /// mes_actual, mes_anterior, trimestre or anio.
        #[arg(long, default_value = "mes_actual")]
        periodo: String,

        #[arg(long, requires = "hasta")]
        desde: Option<String>,

        #[arg(long, requires = "desde")]
        hasta: Option<String>,

        #[arg(long)]
        comparar: bool,

        #[arg(long)]
        exportar: Option<ExportFormat>,
    },

    /// Sends WhatsApp reminders for one or more charges.
    Recordar {
        #[arg(required = true)]
        ids: Vec<String>,

        #[arg(long)]
        plantilla: Option<TemplateKind>,
    },

    /// Shows the message a charge would receive, without sending it.
    Plantilla {
        id: String,

        #[arg(long)]
        tipo: Option<TemplateKind>,

        #[arg(long)]
        texto: Option<String>,
    },

    /// Registers a payment and writes its receipt.
    Pagar {
        id: String,

        #[arg(long)]
        metodo: String,

        #[arg(long)]
        referencia: Option<String>,

        #[arg(long)]
        fecha: Option<String>,
    },

    Recibo {
        id: String,
    },

    Whatsapp {
        #[arg(value_enum, default_value_t = WhatsappAccion::Status)]
        accion: WhatsappAccion,
    },

    Usuarios,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WhatsappAccion {
    Status,
    Connect,
    Disconnect,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = Config::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    if let Some(url) = cli.api_url.as_deref() {
        cfg.api_url = url.to_string();
    }
    if let Some(ms) = cli.timeout_ms {
        cfg.timeout_ms = ms;
    }
    if let Some(dir) = cli.export_dir.as_ref() {
        cfg.export_dir = dir.clone();
    }
    cfg.validate().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(cfg)
}

/// Logs in when credentials were given, otherwise adopts PEGASUS_TOKEN.
async fn open_session(cli: &Cli, cfg: &Config, api: &ApiClient) -> anyhow::Result<()> {
    if let (Some(u), Some(p)) = (cli.usuario.as_deref(), cli.password.as_deref()) {
        api.login(u, p).await?;
        return Ok(());
    }
    match cfg.token.as_deref() {
        Some(token) => {
            let usuario = UsuarioSesion {
                username: "token".to_string(),
                rol: Rol::Usuario,
            };
            api.sessions().begin(Session::new(token.to_string(), usuario));
            Ok(())
        }
        None => anyhow::bail!("no session: pass --usuario/--password or set PEGASUS_TOKEN"),
    }
}

fn require_section(api: &ApiClient, seccion: Seccion) -> anyhow::Result<()> {
    let session = api
        .sessions()
        .current()
        .ok_or_else(|| anyhow::anyhow!("no active session"))?;
    if !session.puede_ver(seccion) {
        anyhow::bail!("{} requires an administrator session", seccion.label());
    }
    Ok(())
}

fn parse_date_arg(name: &str, raw: &str) -> anyhow::Result<Date> {
    parse_fecha(raw).ok_or_else(|| anyhow::anyhow!("--{name} must be YYYY-MM-DD, got `{raw}`"))
}

fn print_notices(notifier: &MemoryNotifier) {
    for n in notifier.take() {
        let tag = match n.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "aviso",
            NoticeLevel::Error => "error",
        };
        println!("[{tag}] {}", n.message);
    }
}

fn main() -> anyhow::Result<()> {
    // The UTC offset has to be read before the runtime starts its workers.
    local_offset();
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(app())
}

async fn app() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = load_config(&cli)?;
    let api = ApiClient::new(&cfg, SessionStore::new())?;
    let notifier = MemoryNotifier::new();
    let hoy = today_local();

    if let Command::Login = cli.command {
        let (Some(u), Some(p)) = (cli.usuario.as_deref(), cli.password.as_deref()) else {
            anyhow::bail!("login requires --usuario and --password");
        };
        let session = api.login(u, p).await?;
        println!("{} ({})", session.username(), session.rol().as_str());
        println!("PEGASUS_TOKEN={}", session.token());
        return Ok(());
    }

    open_session(&cli, &cfg, &api).await?;

    let result = run(&cli.command, &cfg, &api, &notifier, hoy).await;
    print_notices(&notifier);
    result
}

async fn run(
    command: &Command,
    cfg: &Config,
    api: &ApiClient,
    notifier: &MemoryNotifier,
    hoy: Date,
) -> anyhow::Result<()> {
    match command {
        Command::Login => {}

        Command::Dashboard => {
            let resumen = Dashboard::new(api.clone(), notifier.clone()).load(hoy).await;
            if let Some(t) = resumen.totales.as_ref() {
                println!("Clientes activos:   {} / {}", t.clientes_activos(), t.total_clientes());
                println!(
                    "Pendiente:          {} ({} cobros)",
                    format_currency(t.monto_pendiente(), &cfg.default_currency),
                    t.cobros_pendientes()
                );
                println!(
                    "Atrasado:           {} ({} cobros)",
                    format_currency(t.monto_atrasado(), &cfg.default_currency),
                    t.cobros_atrasados()
                );
                println!("Cobrado este mes:   {}", format_currency(t.cobrado_mes(), &cfg.default_currency));
            }
            let v = &resumen.vencimientos;
            println!();
            println!("Próximos vencimientos: {} cobros, total {}", v.total_count, v.total_amount);
            for b in &v.buckets {
                println!(
                    "  {}  {:>3}  {}",
                    format_fecha_str(&b.date),
                    b.count,
                    format_currency(b.amount, &cfg.default_currency)
                );
            }
        }

        Command::Cobros {
            estado,
            cliente,
            buscar,
            desde,
            hasta,
        } => {
            let local = FiltroLocal {
                estado: estado.as_deref().map(|e| EstadoCobro::from(e.to_string())),
                cliente_id: cliente.as_deref().map(RecordId::from),
                texto: buscar.clone(),
                desde: desde.as_deref().map(|d| parse_date_arg("desde", d)).transpose()?,
                hasta: hasta.as_deref().map(|d| parse_date_arg("hasta", d)).transpose()?,
            };
            let view = CobrosView::new(api.clone(), Duration::ZERO);
            let listado = view
                .recargar(&local)
                .await?
                .ok_or_else(|| anyhow::anyhow!("charge list was superseded"))?;
            for c in &listado.visibles {
                println!(
                    "{:>6}  {:<10}  {:<28}  {:>14}  {}",
                    c.id.to_string(),
                    c.estado_cobro.badge().label,
                    c.nombre_cliente().unwrap_or("-"),
                    format_currency(c.monto_value().unwrap_or(0.0), c.moneda_or(&cfg.default_currency)),
                    c.vencimiento().map(format_fecha).unwrap_or_else(|| "-".to_string())
                );
            }
            println!("{} de {} cobros", listado.visibles.len(), listado.total);
        }

        Command::Reporte {
            tipo,
            periodo,
            desde,
            hasta,
            comparar,
            exportar,
        } => {
            let periodo = match (desde.as_deref(), hasta.as_deref()) {
                (Some(d), Some(h)) => Periodo::new(parse_date_arg("desde", d)?, parse_date_arg("hasta", h)?)
                    .map_err(anyhow::Error::msg)?,
                _ => Periodo::por_nombre(periodo, hoy)
                    .ok_or_else(|| anyhow::anyhow!("unknown period `{periodo}`"))?,
            };
            let service = ReportService::new(api.clone(), notifier.clone(), &cfg.default_currency);
            let view = service.generar(*tipo, periodo, *comparar, hoy).await?;

            println!("{}  ({})", view.titulo, view.periodo);
            if let Some(c) = view.comparado_con.as_deref() {
                println!("Comparado con {c}");
            }
            for k in &view.kpis {
                let var = k.comparacion.as_ref().map(|c| c.texto.as_str()).unwrap_or("");
                println!("  {:<28} {:>18} {}", k.label, k.valor, var);
            }
            for t in &view.tablas {
                println!();
                println!("{}", t.titulo);
                println!("  {}", t.columnas.join(" | "));
                for fila in &t.filas {
                    println!("  {}", fila.join(" | "));
                }
            }

            if let Some(formato) = exportar {
                let artifact = service.exportar(*formato).map_err(anyhow::Error::msg)?;
                let path = artifact.guardar(&cfg.export_dir).await.map_err(anyhow::Error::msg)?;
                println!();
                println!("Exportado: {}", path.display());
            }
        }

        Command::Recordar { ids, plantilla } => {
            let empresa = api.get_settings().await.ok().map(|s| s.nombre_empresa);
            let dispatcher = Dispatcher::new(api.clone(), notifier.clone(), &cfg.default_currency)
                .with_empresa(empresa)
                .with_concurrency(cfg.bulk_concurrency);
            let ids: Vec<RecordId> = ids.iter().map(|s| RecordId::from(s.as_str())).collect();
            match ids.as_slice() {
                [uno] => dispatcher.enviar_uno(uno, *plantilla, hoy).await?,
                varios => {
                    let resumen = dispatcher.enviar_lote(varios, *plantilla, hoy).await;
                    if resumen.attempted > 0 && resumen.succeeded == 0 {
                        anyhow::bail!("no reminder could be sent");
                    }
                }
            }
        }

        Command::Plantilla { id, tipo, texto } => {
            let cobro = api.get_cobro(&RecordId::from(id.as_str())).await?;
            let kind = tipo.unwrap_or_else(|| TemplateKind::para_cobro(&cobro, hoy));
            let empresa = api.get_settings().await.ok().map(|s| s.nombre_empresa);
            let mut datos =
                DatosPlantilla::from_cobro(&cobro, &cfg.default_currency).with_empresa(empresa.as_deref());
            datos.texto = texto.clone();
            println!("[{kind}]");
            println!("{}", interpolar(kind, &datos, hoy));
        }

        Command::Pagar {
            id,
            metodo,
            referencia,
            fecha,
        } => {
            let fecha = match fecha.as_deref() {
                Some(f) => iso_date(parse_date_arg("fecha", f)?),
                None => iso_date(hoy),
            };
            let pago = RegistroPago::new(fecha, metodo.clone(), referencia.clone());
            let cobro = api.registrar_pago(&RecordId::from(id.as_str()), &pago).await?;
            notifier.success("Pago registrado correctamente.");
            write_receipt(api, cfg, &cobro).await?;
        }

        Command::Recibo { id } => {
            let cobro = api.get_cobro(&RecordId::from(id.as_str())).await?;
            write_receipt(api, cfg, &cobro).await?;
        }

        Command::Whatsapp { accion } => {
            let status = match accion {
                WhatsappAccion::Status => api.whatsapp_status().await?,
                WhatsappAccion::Connect => api.whatsapp_connect().await?,
                WhatsappAccion::Disconnect => api.whatsapp_disconnect().await?,
            };
            println!("Estado: {}", badge_estado(status.status.as_str()).label);
            if let Some(phone) = status.phone.as_deref() {
                println!("Teléfono: {phone}");
            }
            if status.qr.is_some() && !status.is_connected() {
                println!("Escanee el código QR desde la aplicación para completar la conexión.");
            }
        }

        Command::Usuarios => {
            require_section(api, Seccion::Usuarios)?;
            for u in api.list_usuarios().await? {
                println!(
                    "{:>5}  {:<20}  {:<14}  {}",
                    u.id.to_string(),
                    u.nombre_usuario,
                    u.rol.as_str(),
                    if u.activo { "Activo" } else { "Inactivo" }
                );
            }
        }
    }
    Ok(())
}

async fn write_receipt(api: &ApiClient, cfg: &Config, cobro: &Cobro) -> anyhow::Result<()> {
    let settings = match api.get_settings().await {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "company settings unavailable, receipt header left blank");
            Default::default()
        }
    };
    let recibo = Recibo::from_cobro(cobro, &settings, &cfg.default_currency).map_err(anyhow::Error::msg)?;
    let path = exportar_recibo(&recibo)
        .guardar(&cfg.export_dir)
        .await
        .map_err(anyhow::Error::msg)?;
    println!("Recibo {} ({}): {}", recibo.numero, recibo.monto, path.display());
    Ok(())
}
