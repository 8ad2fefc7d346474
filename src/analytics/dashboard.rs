//! Queries for the figures shown on the dashboard.

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::get_total_account_balance,
    budget::{BudgetSpending, get_budget_spending},
    category::CategoryId,
    cost_breakdown::round_to,
    month::MonthRange,
    pagination::Page,
    savings_goal::{SavingsGoal, get_savings_goals},
    transaction::{Transaction, TransactionQuery, get_transactions},
};

/// The label for expenses without a category.
pub(super) const UNCATEGORISED_LABEL: &str = "Uncategorised";

const TOP_CATEGORY_COUNT: usize = 10;
const LATEST_TRANSACTION_COUNT: u64 = 5;
const OPEN_GOAL_COUNT: usize = 5;

/// The headline figures of a month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    /// The sum of the balances of all active accounts.
    pub net_worth: f64,
    pub income: f64,
    pub expenses: f64,
    /// Income minus expenses.
    pub net: f64,
}

/// How much was spent in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// `None` for expenses without a category.
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub icon: Option<String>,
    pub total: f64,
    /// The share of the month's expenses, 0-100.
    pub percentage: f64,
}

/// Everything the dashboard shows for a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub period: MonthRange,
    pub kpis: Kpis,
    /// The categories with the largest expenses, largest first.
    pub top_expense_categories: Vec<CategoryTotal>,
    /// The most recent transactions regardless of the month.
    pub latest_transactions: Vec<Transaction>,
    /// The open savings goals, most important first.
    pub savings_goals: Vec<SavingsGoal>,
    /// The active budgets and what has been spent against them in the month.
    pub budgets: Vec<BudgetSpending>,
}

/// Gather the dashboard figures for `month`.
pub fn get_dashboard(month: &MonthRange, connection: &Connection) -> Result<Dashboard, Error> {
    let kpis = get_kpis(month, connection)?;
    let top_expense_categories = get_top_expense_categories(month, kpis.expenses, connection)?;

    let latest_transactions = get_transactions(
        &TransactionQuery::default(),
        Page {
            number: 1,
            size: LATEST_TRANSACTION_COUNT,
        },
        connection,
    )?
    .items;

    let mut savings_goals = get_savings_goals(false, connection)?;
    savings_goals.truncate(OPEN_GOAL_COUNT);

    let budgets = get_budget_spending(month, Some(true), connection)?;

    Ok(Dashboard {
        period: *month,
        kpis,
        top_expense_categories,
        latest_transactions,
        savings_goals,
        budgets,
    })
}

fn get_kpis(month: &MonthRange, connection: &Connection) -> Result<Kpis, Error> {
    let net_worth = get_total_account_balance(connection)?;

    let (income, expenses): (f64, f64) = connection.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN kind = 'income' THEN amount END), 0),
            COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount END), 0)
        FROM \"transaction\"
        WHERE date BETWEEN ?1 AND ?2",
        params![month.first_day, month.last_day],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(Kpis {
        net_worth: round_to(net_worth, 2),
        income: round_to(income, 2),
        expenses: round_to(expenses, 2),
        net: round_to(income - expenses, 2),
    })
}

fn get_top_expense_categories(
    month: &MonthRange,
    month_expenses: f64,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    let mut statement = connection.prepare(&format!(
        "SELECT
            t.category_id,
            COALESCE(c.name, '{UNCATEGORISED_LABEL}'),
            c.icon,
            SUM(t.amount) AS total
        FROM \"transaction\" t
        LEFT JOIN category c ON c.id = t.category_id
        WHERE t.kind = 'expense' AND t.date BETWEEN ?1 AND ?2
        GROUP BY t.category_id
        ORDER BY total DESC
        LIMIT {TOP_CATEGORY_COUNT}"
    ))?;

    statement
        .query_map(params![month.first_day, month.last_day], |row| {
            let total: f64 = row.get(3)?;
            let percentage = if month_expenses > 0.0 {
                round_to(total / month_expenses * 100.0, 1)
            } else {
                0.0
            };

            Ok(CategoryTotal {
                category_id: row.get(0)?,
                name: row.get(1)?,
                icon: row.get(2)?,
                total: round_to(total, 2),
                percentage,
            })
        })?
        .collect::<Result<Vec<_>, rusqlite::Error>>()
        .map_err(Error::from)
}
