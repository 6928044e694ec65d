use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use subtrack_core::config::DataConfig;
use subtrack_core::engine::next_occurrence_on_or_after;
use subtrack_core::summary::monthly_run_rate;
use subtrack_core::*;

#[derive(Parser)]
#[command(name = "subtrack")]
#[command(about = "Subscription renewal tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new subscription
    Add {
        #[arg(long)]
        name: String,

        /// First billing date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// oneTime, monthly, quarterly, semiAnnually, yearly, everyTwoYears, everyThreeYears
        #[arg(long)]
        cycle: BillingCycle,

        /// Day of month renewals fall on (defaults to the start date's day)
        #[arg(long)]
        anchor_day: Option<u32>,

        /// Month yearly renewals fall on (defaults to the start date's month)
        #[arg(long)]
        anchor_month: Option<u32>,

        #[arg(long)]
        price: Option<f64>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        reminder_days: Option<u32>,

        #[arg(long)]
        rating: Option<i32>,
    },

    /// List subscriptions with their next renewal
    List {
        /// Reference date (defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Show one subscription
    Show { id: i64 },

    /// Delete a subscription
    Remove { id: i64 },

    /// Renewals on a single day
    Day { date: NaiveDate },

    /// Renewals between two dates, inclusive
    Range {
        start: NaiveDate,
        end: NaiveDate,

        /// Also write the renewals to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Renewals coming up in the next few days
    Upcoming {
        /// Days to look ahead (defaults to the configured value)
        #[arg(long)]
        days: Option<u32>,

        /// Reference date (defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Cost of renewals between two dates
    Summary { start: NaiveDate, end: NaiveDate },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    subtrack_core::logging::init_for_verbosity(cli.verbose);

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let store = JsonFileStore::new(DataConfig::store_path(&data_dir));
    tracing::debug!("Using subscription store at {:?}", store.path());
    let mut service = OccurrenceQueryService::new(store);
    let currency = config.display.currency.as_str();

    match cli.command {
        Commands::Add {
            name,
            start,
            cycle,
            anchor_day,
            anchor_month,
            price,
            category,
            reminder_days,
            rating,
        } => {
            // Form defaults: pin renewals to the start date unless told otherwise
            let mut builder = Subscription::builder(name, start, cycle)
                .price(price)
                .category(category)
                .reminder_days(reminder_days)
                .rating(rating);
            if cycle.is_recurring() {
                builder = builder.anchor_day(anchor_day.unwrap_or_else(|| start.day()));
            }
            if matches!(cycle.step(), CycleStep::Years(_)) {
                builder = builder.anchor_month(anchor_month.unwrap_or_else(|| start.month()));
            }
            let subscription = builder.build()?;

            let id = service
                .store_mut()
                .save(SubscriptionRecord::from(&subscription))?;
            println!("✓ Added subscription {}: {}", id, subscription.name());

            if let Some(next) = next_occurrence_on_or_after(&subscription, today()) {
                println!("  Next renewal: {}", next);
            }
            Ok(())
        }
        Commands::List { today: at } => cmd_list(&service, at.unwrap_or_else(today), currency),
        Commands::Show { id } => cmd_show(&service, id, currency),
        Commands::Remove { id } => {
            if !service.store_mut().delete_by_id(id)? {
                return Err(Error::NotFound(id));
            }
            println!("✓ Removed subscription {}", id);
            Ok(())
        }
        Commands::Day { date } => {
            let found = service.on_day(date)?;
            print_occurrences(&found, currency, &format!("No renewals on {}.", date));
            Ok(())
        }
        Commands::Range { start, end, csv } => {
            let found = service.in_range(start, end)?;
            print_occurrences(
                &found,
                currency,
                &format!("No renewals between {} and {}.", start, end),
            );
            if let Some(path) = csv {
                let count = write_occurrences_csv(&path, &found)?;
                println!("✓ Exported {} renewals to {}", count, path.display());
            }
            Ok(())
        }
        Commands::Upcoming { days, today: at } => {
            let days = days.unwrap_or(config.display.upcoming_days);
            let found = service.upcoming(at.unwrap_or_else(today), days)?;
            print_occurrences(
                &found,
                currency,
                &format!("No renewals in the next {} days.", days),
            );
            Ok(())
        }
        Commands::Summary { start, end } => cmd_summary(&service, start, end, currency),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn format_price(price: Option<f64>, currency: &str) -> String {
    price
        .map(|p| format!("{}{:.2}", currency, p))
        .unwrap_or_else(|| "-".into())
}

fn print_occurrences(found: &[Occurrence], currency: &str, empty_message: &str) {
    if found.is_empty() {
        println!("{}", empty_message);
        return;
    }

    for occurrence in found {
        let sub = &occurrence.subscription;
        println!(
            "{}  {:<28} {:<16} {:>10}",
            occurrence.date,
            sub.name(),
            sub.billing_cycle(),
            format_price(sub.price(), currency)
        );
    }
}

fn cmd_list(
    service: &OccurrenceQueryService<JsonFileStore>,
    today: NaiveDate,
    currency: &str,
) -> Result<()> {
    let subscriptions = service.subscriptions()?;
    if subscriptions.is_empty() {
        println!("No subscriptions recorded.");
        return Ok(());
    }

    for sub in &subscriptions {
        let next = next_occurrence_on_or_after(sub, today)
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:>4}  {:<28} {:<16} {:>10}  next: {}",
            sub.id().unwrap_or_default(),
            sub.name(),
            sub.billing_cycle(),
            format_price(sub.price(), currency),
            next
        );
    }

    println!();
    println!(
        "Monthly run rate: {}",
        format_price(Some(monthly_run_rate(&subscriptions)), currency)
    );
    Ok(())
}

fn cmd_show(
    service: &OccurrenceQueryService<JsonFileStore>,
    id: i64,
    currency: &str,
) -> Result<()> {
    let record = service.store().get_by_id(id)?.ok_or(Error::NotFound(id))?;
    let sub = Subscription::try_from(record)?;

    println!("{} (#{})", sub.name(), id);
    println!("  Key:        {}", sub.unique_key());
    println!("  Cycle:      {}", sub.billing_cycle());
    println!("  Start:      {}", sub.start_date());
    if let Some(day) = sub.anchor_day() {
        println!("  Anchor day: {}", day);
    }
    if let Some(month) = sub.anchor_month() {
        println!("  Anchor mon: {}", month);
    }
    println!("  Price:      {}", format_price(sub.price(), currency));
    if let Some(category) = sub.category() {
        println!("  Category:   {}", category);
    }
    if let Some(days) = sub.reminder_days() {
        println!("  Reminder:   {} days before", days);
    }
    if let Some(rating) = sub.rating() {
        println!("  Rating:     {}", rating);
    }
    for (key, value) in sub.custom_fields() {
        println!("  {}: {}", key, value);
    }
    Ok(())
}

fn cmd_summary(
    service: &OccurrenceQueryService<JsonFileStore>,
    start: NaiveDate,
    end: NaiveDate,
    currency: &str,
) -> Result<()> {
    let found = service.in_range(start, end)?;
    let summary = CostSummary::from_occurrences(&found);

    println!("Renewals {} to {}: {}", start, end, summary.occurrences);
    println!("Total: {}", format_price(Some(summary.total), currency));
    for (category, total) in &summary.by_category {
        println!("  {:<20} {:>10}", category, format_price(Some(*total), currency));
    }
    if summary.unpriced > 0 {
        println!("({} renewals without a price)", summary.unpriced);
    }
    Ok(())
}
