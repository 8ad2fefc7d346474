//! Filtering, paging and exporting transactions.

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    account::AccountId,
    asset::AssetId,
    category::CategoryId,
    pagination::{Page, Paged},
    transaction::core::{
        TRANSACTION_COLUMNS, Transaction, TransactionKind, map_row_to_transaction,
    },
};

/// The filters for listing and exporting transactions.
///
/// Every filter is optional. `page` and `per_page` are ignored by the export.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TransactionQuery {
    /// Transactions from or to this account.
    pub account_id: Option<AccountId>,
    pub kind: Option<TransactionKind>,
    pub category_id: Option<CategoryId>,
    pub asset_id: Option<AssetId>,
    /// The first day to include.
    pub date_from: Option<Date>,
    /// The last day to include.
    pub date_to: Option<Date>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl TransactionQuery {
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(account_id) = self.account_id {
            values.push(account_id.into());
            conditions.push(format!(
                "(account_id = ?{0} OR destination_account_id = ?{0})",
                values.len()
            ));
        }
        if let Some(kind) = self.kind {
            values.push(kind.as_str().to_owned().into());
            conditions.push(format!("kind = ?{}", values.len()));
        }
        if let Some(category_id) = self.category_id {
            values.push(category_id.into());
            conditions.push(format!("category_id = ?{}", values.len()));
        }
        if let Some(asset_id) = self.asset_id {
            values.push(asset_id.into());
            conditions.push(format!("asset_id = ?{}", values.len()));
        }
        if let Some(date_from) = self.date_from {
            values.push(date_from.to_string().into());
            conditions.push(format!("date >= ?{}", values.len()));
        }
        if let Some(date_to) = self.date_to {
            values.push(date_to.to_string().into());
            conditions.push(format!("date <= ?{}", values.len()));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (clause, values)
    }
}

fn query_transactions(
    query: &TransactionQuery,
    page: Option<Page>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let (where_clause, values) = query.where_clause();
    let limit = match page {
        Some(page) => format!("LIMIT {} OFFSET {}", page.limit(), page.offset()),
        None => String::new(),
    };

    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" {where_clause} \
            ORDER BY date DESC, id DESC {limit}"
        ))?
        .query_map(params_from_iter(values), map_row_to_transaction)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Get one page of the transactions matching `query`, newest first.
pub fn get_transactions(
    query: &TransactionQuery,
    page: Page,
    connection: &Connection,
) -> Result<Paged<Transaction>, Error> {
    let (where_clause, values) = query.where_clause();
    let total: i64 = connection.query_row(
        &format!("SELECT COUNT(*) FROM \"transaction\" {where_clause}"),
        params_from_iter(values),
        |row| row.get(0),
    )?;

    let items = query_transactions(query, Some(page), connection)?;

    Ok(Paged::new(items, total.max(0) as u64, page))
}

/// One line of the CSV export.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: i64,
    date: String,
    kind: &'a str,
    amount: f64,
    account_id: AccountId,
    destination_account_id: Option<AccountId>,
    category_id: Option<CategoryId>,
    asset_id: Option<AssetId>,
    description: &'a str,
    note: Option<&'a str>,
    recurring: bool,
}

/// Write every transaction matching `query` as CSV, newest first.
pub fn export_transactions_csv(
    query: &TransactionQuery,
    connection: &Connection,
) -> Result<String, Error> {
    let transactions = query_transactions(query, None, connection)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    for transaction in &transactions {
        writer
            .serialize(ExportRow {
                id: transaction.id,
                date: transaction.date.to_string(),
                kind: transaction.kind.as_str(),
                amount: transaction.amount,
                account_id: transaction.account_id,
                destination_account_id: transaction.destination_account_id,
                category_id: transaction.category_id,
                asset_id: transaction.asset_id,
                description: &transaction.description,
                note: transaction.note.as_deref(),
                recurring: transaction.recurring,
            })
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}
