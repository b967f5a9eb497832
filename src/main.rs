//! BEO CLI - inventory and loan tracking for a medical-equipment lending bank.

use beo::{
    Beo, BeoAlertExt, BeoAuditExt, BeoConfig, BeoError, BeoReconcileExt, Item, ItemFilter,
    ItemState, LoanRequest, NewBeneficiary, NewItem, ReturnRequest,
};
use chrono::NaiveDate;
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::{Cli, Command};

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("beo")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("beo.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn get_store_dir(cli: &Cli) -> PathBuf {
    cli.dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_config(cli: &Cli) -> Result<BeoConfig> {
    match &cli.config {
        Some(path) => BeoConfig::load(path),
        None => Ok(BeoConfig::default()),
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn format_state(state: &ItemState) -> ColoredString {
    match state {
        ItemState::Available => "available".green(),
        ItemState::Loaned => "loaned".yellow(),
        ItemState::Maintenance => "maintenance".red(),
        ItemState::Decommissioned => "decommissioned".dimmed(),
    }
}

fn find_item(beo: &Beo, code: &str) -> Result<Item> {
    beo.find_item_by_code(code)?
        .ok_or_else(|| eyre::eyre!(BeoError::ItemNotFound(code.to_string())))
}

fn run(cli: Cli) -> Result<()> {
    let store_dir = get_store_dir(&cli);
    let config = load_config(&cli)?;

    match cli.command {
        Command::Init => {
            Beo::init(&store_dir, config).context("Failed to initialize store")?;
            println!("{} Initialized BEO store in {}", "✓".green(), store_dir.display());
        }

        Command::Register {
            code,
            name,
            category,
            deposit,
            brand,
            model,
            serial,
            description,
            by,
        } => {
            let mut beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let category = beo
                .find_category_by_name(&category)?
                .ok_or_else(|| eyre::eyre!("unknown category: {}", category))?;
            let deposit = beo
                .find_deposit_by_name(&deposit)?
                .ok_or_else(|| eyre::eyre!("unknown deposit: {}", deposit))?;

            let mut spec = NewItem::new(&code, &name, category.id, deposit.id);
            spec.brand = brand;
            spec.model = model;
            spec.serial_number = serial;
            spec.description = description;

            let item = beo.register_item(spec, &by).context("Failed to register item")?;
            println!("{} Registered: {} {} {}", "✓".green(), item.id.cyan(), item.code, item.name);
        }

        Command::Items { state, code, json } => {
            let beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let mut filter = ItemFilter::new();
            if let Some(ref s) = state {
                match ItemState::parse(s) {
                    Some(state) => filter.state = Some(state),
                    None => eyre::bail!("unknown state: {}", s),
                }
            }
            filter.code_contains = code;

            let items = beo.list_items(&filter).context("Failed to list items")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("{}", "No items found".dimmed());
            } else {
                for item in items {
                    println!(
                        "{} {} {} {}{}",
                        format_state(&item.state),
                        item.code.cyan(),
                        item.id.dimmed(),
                        item.name,
                        item.brand
                            .map(|b| format!(" ({})", b))
                            .unwrap_or_default()
                            .dimmed()
                    );
                }
            }
        }

        Command::Item { code } => {
            let beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let item = find_item(&beo, &code)?;

            println!("{}: {}", "Code".bold(), item.code.cyan());
            println!("{}: {}", "ID".bold(), item.id);
            println!("{}: {}", "Name".bold(), item.name);
            println!("{}: {}", "State".bold(), format_state(&item.state));
            if let Some(brand) = &item.brand {
                println!("{}: {}", "Brand".bold(), brand);
            }
            if let Some(model) = &item.model {
                println!("{}: {}", "Model".bold(), model);
            }
            if let Some(serial) = &item.serial_number {
                println!("{}: {}", "Serial".bold(), serial);
            }
            if let Some(desc) = &item.description {
                println!("{}: {}", "Description".bold(), desc);
            }
            println!("{}: {}", "Entered".bold(), item.entered_on);

            if let Some(loan) = beo.loans_for_item(&item.id)?.into_iter().next()
                && loan.status == beo::LoanStatus::Active
            {
                println!(
                    "{}: {} due {}",
                    "Active loan".bold(),
                    loan.id.cyan(),
                    loan.due_date
                );
            }
        }

        Command::Beneficiary {
            name,
            relative,
            kinship,
            responsible,
            phone,
            address,
        } => {
            let mut beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let mut spec = if relative {
                NewBeneficiary::relative(
                    &name,
                    kinship.unwrap_or_default(),
                    responsible.unwrap_or_default(),
                )
            } else {
                NewBeneficiary::member(&name)
            };
            spec.phone = phone;
            spec.address = address;

            let b = beo
                .register_beneficiary(spec)
                .context("Failed to register beneficiary")?;
            println!("{} Registered: {} {}", "✓".green(), b.id.cyan(), b.name);
        }

        Command::Beneficiaries => {
            let beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let beneficiaries = beo.list_beneficiaries()?;

            if beneficiaries.is_empty() {
                println!("{}", "No beneficiaries registered".dimmed());
            } else {
                for b in beneficiaries {
                    let detail = match b.kind {
                        beo::BeneficiaryKind::Member => String::new(),
                        beo::BeneficiaryKind::Relative => format!(
                            " ({} of {})",
                            b.kinship.as_deref().unwrap_or("relative"),
                            b.responsible_member.as_deref().unwrap_or("?")
                        ),
                    };
                    println!("{} {}{}", b.id.cyan(), b.name, detail.dimmed());
                }
            }
        }

        Command::Open {
            code,
            beneficiary,
            requested_by,
            date,
            days,
            authorized_by,
            delivered_by,
            notes,
        } => {
            let mut beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let item = find_item(&beo, &code)?;

            let mut req = LoanRequest::new(&item.id, &beneficiary, &requested_by, date.unwrap_or_else(today));
            req.duration_days = days;
            req.authorized_by = authorized_by;
            req.delivered_by = delivered_by;
            req.notes = notes;

            let loan = beo.open_loan(req).context("Failed to open loan")?;
            println!(
                "{} Opened: {} for {} due {}",
                "✓".green(),
                loan.id.cyan(),
                item.code,
                loan.due_date.to_string().yellow()
            );
        }

        Command::Close {
            loan,
            condition,
            date,
            received_by,
            notes,
            deposit,
            by,
        } => {
            let mut beo = Beo::open(&store_dir, config).context("Failed to open store")?;

            let mut req = ReturnRequest::new(&loan, date.unwrap_or_else(today), &condition, &by);
            req.received_by = received_by;
            req.notes = notes;
            if let Some(name) = deposit {
                let deposit = beo
                    .find_deposit_by_name(&name)?
                    .ok_or_else(|| eyre::eyre!("unknown deposit: {}", name))?;
                req.return_deposit_id = Some(deposit.id);
            }

            let final_state = beo.close_loan(req).context("Failed to close loan")?;
            println!(
                "{} Closed: {} item now {}",
                "✓".green(),
                loan.cyan(),
                format_state(&final_state)
            );
        }

        Command::Lost { loan, notes, by } => {
            let mut beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            beo.report_lost(&loan, &by, notes.as_deref())
                .context("Failed to record loss")?;
            println!("{} Loan {} recorded as lost; item decommissioned", "✗".red(), loan.cyan());
        }

        Command::Loans { item, json } => {
            let beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let loans = match item {
                Some(code) => {
                    let item = find_item(&beo, &code)?;
                    beo.loans_for_item(&item.id)?
                }
                None => beo.list_active_loans()?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&loans)?);
            } else if loans.is_empty() {
                println!("{}", "No loans".dimmed());
            } else {
                for loan in loans {
                    println!(
                        "{} {} item {} due {} ({})",
                        loan.status.to_string().yellow(),
                        loan.id.cyan(),
                        loan.item_id,
                        loan.due_date,
                        loan.requested_by.dimmed()
                    );
                }
            }
        }

        Command::Alerts { json } => {
            let beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let report = beo.due_report(today()).context("Failed to build due report")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.is_empty() {
                println!("{}", "No active loans".dimmed());
            } else {
                for entry in report {
                    let tier = match entry.tier {
                        beo::AlertTier::Current => "current".green(),
                        beo::AlertTier::DueSoon => "due soon".yellow(),
                        beo::AlertTier::Overdue => "overdue".red().bold(),
                    };
                    println!(
                        "{} {} item {} due {}",
                        tier,
                        entry.loan.id.cyan(),
                        entry.loan.item_id,
                        entry.loan.due_date
                    );
                }
            }
        }

        Command::Audit { json } => {
            let beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let report = beo.audit().context("Failed to run audit")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.is_clean() {
                println!("{} Inventory and ledger agree", "✓".green());
            } else {
                for item in &report.orphaned_items {
                    println!(
                        "{} item {} marked loaned with no active loan",
                        "✗".red(),
                        item.code.cyan()
                    );
                }
                for loan in &report.dangling_loans {
                    println!(
                        "{} loan {} active but item {} not marked loaned",
                        "✗".red(),
                        loan.id.cyan(),
                        loan.item_id
                    );
                }
                if report.count_mismatch {
                    println!("{} loaned-item count != active-loan count", "✗".red());
                }
                println!(
                    "{} Run '{}' to repair from the ledger",
                    "→".blue(),
                    "beo reconcile".bold()
                );
            }
        }

        Command::Reconcile => {
            let mut beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let summary = beo.reconcile().context("Failed to reconcile")?;

            if summary.total() == 0 {
                println!("{} Nothing to fix", "✓".green());
            } else {
                println!(
                    "{} Fixed {} orphaned item(s), {} dangling loan(s)",
                    "✓".green(),
                    summary.orphans_fixed,
                    summary.dangling_fixed
                );
            }
        }

        Command::History { code } => {
            let beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let item = find_item(&beo, &code)?;
            let changes = beo.history_for_item(&item.id)?;

            if changes.is_empty() {
                println!("{}", "No history".dimmed());
            } else {
                for change in changes {
                    let prior = change
                        .prior_state
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{} {} → {} {} ({})",
                        change.changed_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                        prior,
                        format_state(&change.new_state),
                        change.reason,
                        change.changed_by.dimmed()
                    );
                }
            }
        }

        Command::SetState { code, state, reason, by } => {
            let mut beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let item = find_item(&beo, &code)?;
            let target = ItemState::parse(&state)
                .ok_or_else(|| eyre::eyre!("unknown state: {}", state))?;

            let updated = beo
                .set_item_state(&item.id, target, &reason, &by)
                .context("Failed to change state")?;
            println!(
                "{} {} is now {}",
                "✓".green(),
                updated.code.cyan(),
                format_state(&updated.state)
            );
        }

        Command::Deposit {
            name,
            address,
            manager,
            phone,
        } => {
            let mut beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let deposit = beo
                .add_deposit(&name, address.as_deref(), manager.as_deref(), phone.as_deref())
                .context("Failed to register deposit")?;
            println!("{} Registered: {} {}", "✓".green(), deposit.id.cyan(), deposit.name);
        }

        Command::Status => {
            let beo = Beo::open(&store_dir, config).context("Failed to open store")?;
            let stats = beo.stats()?;
            let audit = beo.audit()?;

            println!("{}: {}", "Items".bold(), stats.total_items);
            println!("  {}: {}", "available".green(), stats.available);
            println!("  {}: {}", "loaned".yellow(), stats.loaned);
            println!("  {}: {}", "maintenance".red(), stats.maintenance);
            println!("  {}: {}", "decommissioned".dimmed(), stats.decommissioned);
            println!("{}: {}", "Active loans".bold(), stats.active_loans);

            if audit.is_clean() {
                println!("{} Inventory and ledger agree", "✓".green());
            } else {
                println!(
                    "{} {} inconsistency(ies) found — run '{}'",
                    "✗".red(),
                    audit.finding_count(),
                    "beo audit".bold()
                );
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
