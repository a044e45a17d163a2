use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use ivf_core::{TrackerConfig, TrackerData};
use ivf_meds::{DoseTarget, StatusAction};
use ivf_store::{FileStore, LastViewedDay, Session, StoreConfig, StoreError};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ivf-cli",
    about = "Theo dõi thuốc IVF theo ngày từ dòng lệnh."
)]
struct Args {
    /// Thư mục chứa các blob JSON.
    #[arg(long, env = "IVF_DATA_DIR", default_value = ".ivf-tracker")]
    data_dir: PathBuf,

    /// File JSON ghi đè TrackerConfig (bucketPolicy, middayMinutes, eveningMinutes).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bật log debug.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quản lý tài khoản trên máy này.
    #[command(subcommand)]
    Account(AccountCommand),
    /// Thay toàn bộ dữ liệu của người dùng hiện tại bằng một file JSON.
    Import { input: PathBuf },
    /// In danh sách thuốc của một ngày.
    Day(DayArgs),
    /// Đánh dấu đã dùng.
    Take {
        #[command(flatten)]
        dose: DoseArgs,
        /// Thời điểm dùng thuốc (RFC 3339), mặc định là bây giờ.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Đánh dấu bỏ qua.
    Skip(DoseArgs),
    /// Đưa về trạng thái chưa dùng.
    Reset(DoseArgs),
    /// Tổng hợp toàn bộ hành trình dưới dạng JSON.
    Summary,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Switch {
        user_id: String,
    },
    Logout,
    List,
}

#[derive(clap::Args, Debug)]
struct DayArgs {
    #[arg(long)]
    cycle: Option<String>,
    #[arg(long)]
    day: Option<u32>,
    /// Ngày dương lịch (YYYY-MM-DD), mặc định tính từ ngày bắt đầu chu kỳ.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(clap::Args, Debug)]
struct DoseArgs {
    #[arg(long)]
    cycle: String,
    #[arg(long)]
    day: u32,
    #[arg(long)]
    medication: String,
    #[arg(long)]
    date: Option<NaiveDate>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let tracker_config = load_tracker_config(args.config.as_ref())?;
    let backend = FileStore::new(&args.data_dir);
    let mut session = Session::open(backend, StoreConfig::default())
        .with_context(|| format!("Không mở được dữ liệu trong {:?}", args.data_dir))?;

    match args.command {
        Command::Account(command) => run_account(&mut session, command)?,
        Command::Import { input } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("Không đọc được file {input:?}"))?;
            let imported = TrackerData::from_json_str(&raw)?;
            let cycles = imported.cycles.len();
            session.tracker_mut()?.update(|data| {
                *data = imported;
                Ok::<_, StoreError>(())
            })?;
            println!("Imported {cycles} cycles");
        }
        Command::Day(day_args) => show_day(&mut session, day_args, &tracker_config)?,
        Command::Take { dose, at } => {
            apply(&mut session, dose, StatusAction::MarkTaken { at })?;
        }
        Command::Skip(dose) => apply(&mut session, dose, StatusAction::MarkSkipped)?,
        Command::Reset(dose) => apply(&mut session, dose, StatusAction::Reset)?,
        Command::Summary => {
            let summary = session.tracker().summary();
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_tracker_config(path: Option<&PathBuf>) -> anyhow::Result<TrackerConfig> {
    let Some(path) = path else {
        return Ok(TrackerConfig::default());
    };
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("Không đọc được file {path:?}"))?;
    serde_json::from_str(&raw).with_context(|| format!("Config không hợp lệ trong {path:?}"))
}

fn run_account(session: &mut Session<FileStore>, command: AccountCommand) -> anyhow::Result<()> {
    match command {
        AccountCommand::Create {
            username,
            display_name,
            email,
            password,
        } => {
            let user = session.create_account(&username, &display_name, &email, &password)?;
            println!("Created {} ({})", user.username, user.id);
        }
        AccountCommand::Login { username, password } => {
            let user = session.login_user(&username, &password)?;
            println!("Signed in as {}", user.display_name);
        }
        AccountCommand::Switch { user_id } => {
            session.switch_user(&user_id)?;
            println!("Switched to {user_id}");
        }
        AccountCommand::Logout => {
            session.logout()?;
            println!("Signed out");
        }
        AccountCommand::List => {
            let current = session.current_user().map(|user| user.id.clone());
            for user in session.users() {
                let marker = if current.as_deref() == Some(user.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {} {} <{}>", user.id, user.username, user.email);
            }
        }
    }
    Ok(())
}

fn show_day(
    session: &mut Session<FileStore>,
    args: DayArgs,
    config: &TrackerConfig,
) -> anyhow::Result<()> {
    let remembered = session.tracker().remembered_day();
    let (cycle_id, day_number) = match (args.cycle, args.day, remembered) {
        (Some(cycle), Some(day), _) => (cycle, day),
        (None, None, Some(last)) => (last.cycle_id, last.day_number),
        _ => bail!("Cần --cycle và --day (chưa có ngày xem gần nhất)"),
    };
    let date = resolve_date(session.data(), &cycle_id, day_number, args.date)?;

    let day = session
        .tracker()
        .reconcile_day(&cycle_id, day_number, date, config);
    println!(
        "Cycle {cycle_id} day {day_number} ({date}): {}/{} done",
        day.completed, day.total
    );
    for group in day.grouped(config) {
        println!("[{:?}]", group.bucket);
        for medication in group.medications {
            println!(
                "  {:<8} {:<24} {:<12} {:?} {}",
                medication.time.as_deref().unwrap_or("-"),
                medication.name,
                medication.dosage,
                medication.status(),
                medication.id
            );
        }
    }

    session.tracker_mut()?.remember_day(LastViewedDay {
        cycle_id,
        day_number,
    })?;
    Ok(())
}

fn apply(
    session: &mut Session<FileStore>,
    dose: DoseArgs,
    action: StatusAction,
) -> anyhow::Result<()> {
    let date = resolve_date(session.data(), &dose.cycle, dose.day, dose.date)?;
    let target = DoseTarget {
        cycle_id: dose.cycle,
        day_number: dose.day,
        date,
        medication_id: dose.medication,
    };
    let provenance = session
        .tracker_mut()?
        .apply_status_action(&target, &action)
        .with_context(|| format!("Không cập nhật được thuốc {}", target.medication_id))?;
    println!("Updated {} ({provenance:?})", target.medication_id);
    Ok(())
}

fn resolve_date(
    data: &TrackerData,
    cycle_id: &str,
    day_number: u32,
    explicit: Option<NaiveDate>,
) -> anyhow::Result<NaiveDate> {
    if let Some(date) = explicit {
        return Ok(date);
    }
    data.cycle(cycle_id)
        .and_then(|cycle| cycle.expected_date(day_number))
        .with_context(|| format!("Không tính được ngày cho chu kỳ {cycle_id} ngày {day_number}"))
}
