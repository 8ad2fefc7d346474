//! Turning recurring transaction templates into transactions.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    recurring::core::{
        RECURRING_COLUMNS, RecurringId, RecurringTransaction, get_recurring_transaction,
        map_row_to_recurring, set_next_date,
    },
    transaction::{Transaction, insert_transaction},
};

/// The transaction created by running a recurring transaction by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub transaction: Transaction,
    /// The new next date of the template.
    pub next_date: Date,
}

/// What a catch-up did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchUpReport {
    /// The number of templates that were brought up to date.
    pub executed: u64,
    /// The number of transactions created across all templates.
    pub transactions_created: u64,
    /// The number of templates that could not be brought up to date.
    pub failed: u64,
}

/// Create the transaction of a recurring transaction dated `today`.
///
/// This consumes the pending occurrence and any others up to `today`, so the
/// next date of the template moves past `today`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no recurring transaction with `id`.
pub fn run_recurring_transaction(
    id: RecurringId,
    today: Date,
    connection: &Connection,
) -> Result<RunResult, Error> {
    let sql_transaction = connection.unchecked_transaction()?;
    let template = get_recurring_transaction(id, &sql_transaction)?;

    let transaction = insert_transaction(&template.occurrence(today), None, &sql_transaction)?;

    let schedule = template.schedule();
    let mut next_date = schedule.next_after(template.next_date)?;
    while next_date <= today {
        next_date = schedule.next_after(next_date)?;
    }
    set_next_date(id, next_date, &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(RunResult {
        transaction,
        next_date,
    })
}

/// Create the transactions of every active recurring transaction that fell
/// due on or before `today`.
///
/// Each missed occurrence gets its own transaction dated on the occurrence,
/// up to the template's end date. Templates are caught up one at a time in
/// their own SQL transaction: a template that fails is counted in
/// [CatchUpReport::failed] and left untouched. Calling this again on the same
/// day does nothing.
///
/// # Errors
/// Returns an error if the due templates cannot be read.
pub fn catch_up_recurring_transactions(
    today: Date,
    connection: &Connection,
) -> Result<CatchUpReport, Error> {
    let due = get_due_recurring_transactions(today, connection)?;
    let mut report = CatchUpReport::default();

    for template in &due {
        match catch_up_template(template, today, connection) {
            Ok(created) => {
                report.executed += 1;
                report.transactions_created += created;
            }
            Err(error) => {
                tracing::error!(
                    "Could not catch up recurring transaction {} \"{}\": {error}",
                    template.id,
                    template.description
                );
                report.failed += 1;
            }
        }
    }

    if !due.is_empty() {
        tracing::info!(
            "Caught up {} recurring transactions, created {} transactions, {} failed",
            report.executed,
            report.transactions_created,
            report.failed
        );
    }

    Ok(report)
}

fn get_due_recurring_transactions(
    today: Date,
    connection: &Connection,
) -> Result<Vec<RecurringTransaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {RECURRING_COLUMNS} FROM recurring_transaction \
            WHERE active = 1 AND next_date <= ?1 \
            AND (end_date IS NULL OR end_date >= next_date) \
            ORDER BY next_date, id"
        ))?
        .query_map([today], map_row_to_recurring)?
        .map(|maybe_template| maybe_template.map_err(Error::from))
        .collect()
}

fn catch_up_template(
    template: &RecurringTransaction,
    today: Date,
    connection: &Connection,
) -> Result<u64, Error> {
    let sql_transaction = connection.unchecked_transaction()?;
    let schedule = template.schedule();

    let mut occurrence = template.next_date;
    let mut created = 0;
    while occurrence <= today && template.end_date.is_none_or(|end_date| occurrence <= end_date) {
        insert_transaction(&template.occurrence(occurrence), None, &sql_transaction)?;
        created += 1;
        occurrence = schedule.next_after(occurrence)?;
    }

    set_next_date(template.id, occurrence, &sql_transaction)?;
    sql_transaction.commit()?;

    tracing::debug!(
        "Created {created} transactions for recurring transaction {}, next due {occurrence}",
        template.id
    );

    Ok(created)
}
