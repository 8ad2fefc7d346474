//! How much of each budget has been spent in a month.

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    budget::core::{BUDGET_COLUMNS, Budget, map_row_to_budget},
    cost_breakdown::round_to,
    month::MonthRange,
    text_enum::text_enum,
};

/// The share of a budget that may be spent before it is flagged.
const WARNING_PERCENT: f64 = 80.0;
const EXCEEDED_PERCENT: f64 = 100.0;

text_enum! {
    /// How close spending is to a budget's amount.
    pub enum BudgetStatus {
        /// Less than 80% spent.
        Ok => "ok",
        /// At least 80% but less than 100% spent.
        Warning => "warning",
        /// The whole budget or more has been spent.
        Exceeded => "exceeded",
    }
}

impl BudgetStatus {
    /// The status for a budget with `percent_used` spent.
    pub fn from_percent_used(percent_used: f64) -> Self {
        if percent_used >= EXCEEDED_PERCENT {
            Self::Exceeded
        } else if percent_used >= WARNING_PERCENT {
            Self::Warning
        } else {
            Self::Ok
        }
    }
}

/// A budget with its spending in a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSpending {
    #[serde(flatten)]
    pub budget: Budget,
    pub category_name: String,
    /// The sum of expenses in the budget's category during the month.
    pub spent: f64,
    /// `spent` as a percentage of the budget's amount, to one decimal place.
    pub percent_used: f64,
    pub remaining: f64,
    pub status: BudgetStatus,
}

/// The budgets and the month their spending was computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetList {
    pub budgets: Vec<BudgetSpending>,
    pub period: MonthRange,
}

/// The totals across all active budgets in a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub total_budgeted: f64,
    pub total_spent: f64,
    pub remaining: f64,
    pub percent_used: f64,
    /// The number of budgets with the status [BudgetStatus::Exceeded].
    pub exceeded_count: usize,
    pub period: MonthRange,
}

/// The query for listing budgets.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct BudgetListQuery {
    pub year: Option<i32>,
    pub month: Option<u8>,
    /// Only list active (`true`) or inactive (`false`) budgets.
    pub active: Option<bool>,
}

/// Get the spending of each budget during `month`, most used first.
pub fn get_budget_spending(
    month: &MonthRange,
    active: Option<bool>,
    connection: &Connection,
) -> Result<Vec<BudgetSpending>, Error> {
    let columns: Vec<String> = BUDGET_COLUMNS
        .split(", ")
        .map(|column| format!("b.{column}"))
        .collect();

    let mut statement = connection.prepare(&format!(
        "SELECT {}, c.name, \
            COALESCE((SELECT SUM(t.amount) FROM \"transaction\" t \
                WHERE t.category_id = b.category_id AND t.kind = 'expense' \
                AND t.date BETWEEN ?1 AND ?2), 0) \
        FROM budget b \
        JOIN category c ON c.id = b.category_id \
        WHERE ?3 IS NULL OR b.active = ?3",
        columns.join(", ")
    ))?;

    let mut budgets = statement
        .query_map(
            params![month.first_day, month.last_day, active],
            |row| {
                let budget = map_row_to_budget(row)?;
                let category_name: String = row.get(8)?;
                let spent: f64 = row.get(9)?;

                Ok(with_spending(budget, category_name, spent))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    budgets.sort_by(|a, b| b.percent_used.total_cmp(&a.percent_used));

    Ok(budgets)
}

fn with_spending(budget: Budget, category_name: String, spent: f64) -> BudgetSpending {
    let spent = round_to(spent, 2);
    let percent_used = if budget.amount > 0.0 {
        round_to(spent / budget.amount * 100.0, 1)
    } else {
        0.0
    };

    BudgetSpending {
        remaining: round_to(budget.amount - spent, 2),
        status: BudgetStatus::from_percent_used(percent_used),
        budget,
        category_name,
        spent,
        percent_used,
    }
}

/// Sum the active budgets and their spending during `month`.
pub fn get_budget_summary(month: &MonthRange, connection: &Connection) -> Result<BudgetSummary, Error> {
    let budgets = get_budget_spending(month, Some(true), connection)?;

    let total_budgeted: f64 = budgets.iter().map(|spending| spending.budget.amount).sum();
    let total_spent: f64 = budgets.iter().map(|spending| spending.spent).sum();
    let percent_used = if total_budgeted > 0.0 {
        round_to(total_spent / total_budgeted * 100.0, 1)
    } else {
        0.0
    };

    Ok(BudgetSummary {
        total_budgeted: round_to(total_budgeted, 2),
        total_spent: round_to(total_spent, 2),
        remaining: round_to(total_budgeted - total_spent, 2),
        percent_used,
        exceeded_count: budgets
            .iter()
            .filter(|spending| spending.status == BudgetStatus::Exceeded)
            .count(),
        period: *month,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        account::{AccountForm, AccountKind, create_account},
        budget::{
            core::{BudgetForm, create_budget},
            status::{BudgetStatus, get_budget_spending, get_budget_summary},
        },
        category::{CategoryKind, get_category_by_name},
        db::initialize,
        month::MonthRange,
        transaction::{NewTransaction, TransactionKind, create_transaction},
    };

    #[test]
    fn status_thresholds() {
        assert_eq!(BudgetStatus::from_percent_used(0.0), BudgetStatus::Ok);
        assert_eq!(BudgetStatus::from_percent_used(79.9), BudgetStatus::Ok);
        assert_eq!(BudgetStatus::from_percent_used(80.0), BudgetStatus::Warning);
        assert_eq!(BudgetStatus::from_percent_used(99.9), BudgetStatus::Warning);
        assert_eq!(BudgetStatus::from_percent_used(100.0), BudgetStatus::Exceeded);
    }

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let account = create_account(&AccountForm::new("Main", AccountKind::Checking), &connection)
            .unwrap()
            .id;
        let category = |name| {
            get_category_by_name(name, CategoryKind::Expense, &connection)
                .unwrap()
                .id
        };
        let groceries = category("Groceries");
        let fuel = category("Fuel");
        let leisure = category("Leisure");
        let today = date!(2025 - 03 - 01);

        for (category_id, amount) in [(groceries, 400.0), (fuel, 100.0), (leisure, 50.0)] {
            create_budget(&BudgetForm::new(category_id, amount), today, &connection).unwrap();
        }

        for (day, category_id, amount) in [
            (date!(2025 - 03 - 02), groceries, 120.0),
            (date!(2025 - 03 - 20), groceries, 80.0),
            (date!(2025 - 03 - 05), fuel, 85.0),
            (date!(2025 - 03 - 31), leisure, 60.0),
            // Outside the month.
            (date!(2025 - 04 - 01), groceries, 500.0),
        ] {
            create_transaction(
                &NewTransaction::new(day, amount, TransactionKind::Expense, account)
                    .category(category_id),
                &connection,
            )
            .unwrap();
        }

        connection
    }

    #[test]
    fn computes_spending_per_budget() {
        let connection = get_test_connection();
        let march = MonthRange::new(2025, 3).unwrap();

        let got = get_budget_spending(&march, None, &connection).unwrap();

        let summary: Vec<(&str, f64, f64, BudgetStatus)> = got
            .iter()
            .map(|spending| {
                (
                    spending.category_name.as_str(),
                    spending.spent,
                    spending.percent_used,
                    spending.status,
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Leisure", 60.0, 120.0, BudgetStatus::Exceeded),
                ("Fuel", 85.0, 85.0, BudgetStatus::Warning),
                ("Groceries", 200.0, 50.0, BudgetStatus::Ok),
            ]
        );
        assert_eq!(got[0].remaining, -10.0);
    }

    #[test]
    fn summarises_active_budgets() {
        let connection = get_test_connection();
        let march = MonthRange::new(2025, 3).unwrap();

        let summary = get_budget_summary(&march, &connection).unwrap();

        assert_eq!(summary.total_budgeted, 550.0);
        assert_eq!(summary.total_spent, 345.0);
        assert_eq!(summary.remaining, 205.0);
        assert_eq!(summary.percent_used, 62.7);
        assert_eq!(summary.exceeded_count, 1);
    }
}
