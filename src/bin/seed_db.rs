use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use lume_finance::{
    AccountForm, AccountKind, AssetCategory, AssetForm, BudgetForm, CategoryKind, Frequency,
    FuelType, NewTransaction, RecurringForm, SavingsGoalForm, TransactionKind, create_account,
    create_asset, create_budget, create_recurring_transaction, create_savings_goal,
    cost_breakdown::{TripUsage, UsageEvent},
    create_transaction, get_category_by_name, initialize_db,
};

/// A utility for creating a demo database for the lume_finance server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    let today = OffsetDateTime::now_utc().date();

    println!("Creating accounts...");
    let main_account = create_account(
        &AccountForm {
            balance: 2_500.0,
            ..AccountForm::new("Current account", AccountKind::Checking)
        },
        &conn,
    )?;
    let savings_account = create_account(
        &AccountForm::new("Savings", AccountKind::Savings),
        &conn,
    )?;

    println!("Creating assets...");
    let car = create_asset(
        &AssetForm {
            purchase_date: Some(today - Duration::days(3 * 365)),
            purchase_price: Some(14_000.0),
            fuel_type: Some(FuelType::Petrol),
            consumption_per_100km: Some(5.5),
            maintenance_cost_per_km: Some(0.08),
            ..AssetForm::new("Fiat Panda", AssetCategory::Vehicle)
        },
        &conn,
    )?;
    create_asset(
        &AssetForm {
            purchase_date: Some(today - Duration::days(365)),
            purchase_price: Some(730.0),
            power_watts: Some(150.0),
            daily_usage_hours: Some(24.0),
            lifetime_years: Some(10),
            ..AssetForm::new("Fridge", AssetCategory::Appliance)
        },
        &conn,
    )?;

    println!("Creating transactions...");
    let groceries = get_category_by_name("Groceries", CategoryKind::Expense, &conn)?;
    let salary = get_category_by_name("Salary", CategoryKind::Income, &conn)?;

    create_transaction(
        &NewTransaction::new(today, 1_800.0, TransactionKind::Income, main_account.id)
            .description("Salary")
            .category(salary.id),
        &conn,
    )?;
    for days_ago in [2, 9, 16] {
        create_transaction(
            &NewTransaction::new(
                today - Duration::days(days_ago),
                64.3,
                TransactionKind::Expense,
                main_account.id,
            )
            .description("Weekly shop")
            .category(groceries.id),
            &conn,
        )?;
    }
    create_transaction(
        &NewTransaction {
            asset_id: Some(car.id),
            usage: Some(UsageEvent::Trip(TripUsage {
                distance_km: 120.0,
                fuel_price_per_litre: 1.85,
                date: None,
            })),
            ..NewTransaction::new(today, 24.0, TransactionKind::Expense, main_account.id)
                .description("Trip to the coast")
        },
        &conn,
    )?;
    create_transaction(
        &NewTransaction::new(today, 300.0, TransactionKind::Transfer, main_account.id)
            .destination(savings_account.id)
            .description("Monthly saving"),
        &conn,
    )?;

    println!("Creating budgets, goals and recurring transactions...");
    create_budget(&BudgetForm::new(groceries.id, 350.0), today, &conn)?;
    create_savings_goal(
        &SavingsGoalForm {
            account_id: Some(savings_account.id),
            ..SavingsGoalForm::new("Summer holiday", 1_500.0)
        },
        &conn,
    )?;
    create_recurring_transaction(
        &RecurringForm::new(
            "Rent",
            750.0,
            TransactionKind::Expense,
            Frequency::Monthly,
            main_account.id,
        )
        .day_of_month(1),
        today,
        &conn,
    )?;

    println!("Success!");

    Ok(())
}
