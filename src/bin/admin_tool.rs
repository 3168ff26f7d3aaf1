use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use dragonball_admin::core::{apply_assignments, parse_assignment};
use dragonball_admin::{
    Console, ConsoleConfig, DomainController, Entry, HttpGateway, LoadOutcome, Record,
    RecordFilter, RemoteSource, Session, logging,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "admin-tool")]
#[command(about = "Scriptable access to the Dragon Ball admin console")]
struct Cli {
    /// Overrides DRAGONBALL_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Overrides DRAGONBALL_ADMIN_DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Overrides DRAGONBALL_ADMIN_PAGE_SIZE
    #[arg(long, global = true)]
    page_size: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Login {
        username: String,
        password: String,
    },
    Logout,
    Whoami,
    Characters {
        #[command(subcommand)]
        action: RecordAction,
    },
    Planets {
        #[command(subcommand)]
        action: RecordAction,
    },
}

#[derive(Subcommand)]
enum RecordAction {
    List {
        #[arg(long, default_value_t = 1)]
        page: u64,
        /// field=value, repeatable
        #[arg(long = "filter")]
        filters: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    Show {
        id: u64,
    },
    Create {
        /// field=value, repeatable
        #[arg(long = "set", required = true)]
        fields: Vec<String>,
    },
    Update {
        id: u64,
        #[arg(long = "set", required = true)]
        fields: Vec<String>,
        /// Listing page holding a remote record
        #[arg(long, default_value_t = 1)]
        page: u64,
    },
    Delete {
        id: u64,
        #[arg(long, default_value_t = 1)]
        page: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_stderr()?;

    let mut config = ConsoleConfig::from_env().context("Failed to read configuration")?;
    if let Some(url) = &cli.api_url {
        config = config.api_base_url(url);
    }
    if let Some(dir) = &cli.data_dir {
        config = config.data_dir(dir);
    }
    if let Some(size) = cli.page_size {
        config = config.page_size(size);
    }

    let gateway = HttpGateway::new(&config)?;
    let mut console = Console::open(config).context("Failed to open console storage")?;

    match cli.command {
        Command::Login { username, password } => {
            let user = console.session.login(&username, &password)?;
            println!("Signed in as {} ({})", user.username, user.role);
            Ok(())
        }
        Command::Logout => {
            console.session.logout()?;
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => {
            match console.session.user() {
                Some(user) => println!("{} ({})", user.username, user.role),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Command::Characters { action } => {
            run_action(&mut console.characters, &console.session, &gateway, action).await
        }
        Command::Planets { action } => {
            run_action(&mut console.planets, &console.session, &gateway, action).await
        }
    }
}

async fn run_action<T: Record>(
    listing: &mut DomainController<T>,
    session: &Session,
    gateway: &HttpGateway,
    action: RecordAction,
) -> Result<()>
where
    HttpGateway: RemoteSource<T>,
{
    if !session.is_authenticated() {
        return Err(anyhow!("Not signed in. Run: admin-tool login <username> <password>"));
    }

    match action {
        RecordAction::List {
            page,
            filters,
            json,
        } => {
            for raw in &filters {
                let (field, value) = parse_assignment(raw)?;
                listing.set_filter(field, value)?;
            }
            load_page(listing, gateway, page).await?;

            let entries = listing.entries();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            if listing.pagination_visible() {
                println!("Page {} of {}", listing.page(), listing.total_pages());
            } else {
                let active: Vec<String> = listing
                    .filters()
                    .describe()
                    .into_iter()
                    .map(|(field, value)| format!("{}={}", field, value))
                    .collect();
                println!("Filtered: {}", active.join(", "));
            }
            if entries.is_empty() {
                println!("No {}s found", T::LABEL);
            } else {
                print_table(&entries);
            }
            Ok(())
        }
        RecordAction::Show { id } => {
            let entry = listing.lookup(gateway, id).await?;
            println!("{} {} ({})", T::LABEL, entry.id(), entry.origin());
            println!("{}", serde_json::to_string_pretty(entry.record())?);
            Ok(())
        }
        RecordAction::Create { fields } => {
            listing.begin_create(session)?;
            let mut record = T::default();
            apply_assignments(&mut record, fields.as_slice())?;
            let entry = listing.save(session, record)?;
            println!("Created {} {} '{}'", T::LABEL, entry.id(), entry.record().name());
            Ok(())
        }
        RecordAction::Update { id, fields, page } => {
            if !listing.overlay().contains(id) {
                load_page(listing, gateway, page).await?;
            }
            let mut record = listing.begin_edit(session, id)?.into_record();
            apply_assignments(&mut record, fields.as_slice())?;
            let entry = listing.save(session, record)?;
            report_change(&entry, "Updated");
            Ok(())
        }
        RecordAction::Delete { id, page } => {
            if !listing.overlay().contains(id) {
                load_page(listing, gateway, page).await?;
            }
            let entry = listing.delete(session, id)?;
            report_change(&entry, "Deleted");
            Ok(())
        }
    }
}

async fn load_page<T: Record>(
    listing: &mut DomainController<T>,
    gateway: &HttpGateway,
    page: u64,
) -> Result<()>
where
    HttpGateway: RemoteSource<T>,
{
    listing.seek(page);
    if listing.reload(gateway).await == LoadOutcome::Failed {
        let message = listing.error().unwrap_or("Load failed").to_string();
        return Err(anyhow!(message));
    }
    Ok(())
}

fn report_change<T: Record>(entry: &Entry<T>, verb: &str) {
    println!("{} {} {} '{}'", verb, T::LABEL, entry.id(), entry.record().name());
    if !entry.is_local() {
        println!("Note: remote records are read-only; the change only applied to this listing");
    }
}

fn print_table<T: Record>(entries: &[Entry<T>]) {
    let mut header: Vec<String> = T::columns().iter().map(|column| column.to_string()).collect();
    header.push("Origin".to_string());

    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|entry| {
            let mut cells = entry.record().cells();
            cells.push(entry.origin().to_string());
            cells
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    print_row(&header, &widths);
    println!(
        "{}",
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-")
    );
    for row in &rows {
        print_row(row, &widths);
    }
}

fn print_row(cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    println!("{}", padded.join(" | "));
}
