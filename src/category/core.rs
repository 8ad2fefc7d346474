use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    db::{PartialUpdate, is_unique_violation},
    text_enum::text_enum,
    validation::Validator,
};

pub type CategoryId = i64;

text_enum! {
    /// Whether a category groups income or expenses.
    pub enum CategoryKind {
        Income => "income",
        Expense => "expense",
    }
}

/// The categories every database starts with. These cannot be changed or deleted.
const SYSTEM_CATEGORIES: &[(&str, CategoryKind, &str)] = &[
    ("Groceries", CategoryKind::Expense, "🛒"),
    ("Transport", CategoryKind::Expense, "🚌"),
    ("Fuel", CategoryKind::Expense, "⛽"),
    ("Electricity", CategoryKind::Expense, "💡"),
    ("Housing", CategoryKind::Expense, "🏠"),
    ("Utilities", CategoryKind::Expense, "🚿"),
    ("Health", CategoryKind::Expense, "🩺"),
    ("Leisure", CategoryKind::Expense, "🎭"),
    ("Other expenses", CategoryKind::Expense, "📦"),
    ("Salary", CategoryKind::Income, "💼"),
    ("Other income", CategoryKind::Income, "💶"),
];

/// A category for income or expenses, e.g. 'Groceries' or 'Salary'.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The id of the category.
    pub id: CategoryId,
    /// The name, unique among categories of the same kind.
    pub name: String,
    /// Whether the category is for income or expenses.
    pub kind: CategoryKind,
    /// The category this one is nested under.
    pub parent_id: Option<CategoryId>,
    pub icon: Option<String>,
    pub colour: Option<String>,
    pub description: Option<String>,
    /// System categories are seeded by a migration and are read-only.
    pub is_system: bool,
}

/// The data for creating a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    pub kind: CategoryKind,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub colour: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryForm {
    /// A form with only a name and kind.
    pub fn new(name: &str, kind: CategoryKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            parent_id: None,
            icon: None,
            colour: None,
            description: None,
        }
    }
}

/// The fields of a category that can be changed.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub icon: Option<String>,
    pub colour: Option<String>,
    pub description: Option<String>,
}

/// How many records refer to a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUsage {
    pub transaction_count: i64,
    pub budget_count: i64,
    pub recurring_count: i64,
    /// False for system categories and categories that are referenced.
    pub can_delete: bool,
}

/// The query for listing categories.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryQuery {
    pub kind: Option<CategoryKind>,
    #[serde(default = "include_system_by_default")]
    pub include_system: bool,
    #[serde(default)]
    pub include_usage: bool,
}

fn include_system_by_default() -> bool {
    true
}

impl Default for CategoryQuery {
    fn default() -> Self {
        Self {
            kind: None,
            include_system: true,
            include_usage: false,
        }
    }
}

/// A category in a list, with its usage if it was asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryListing {
    #[serde(flatten)]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<CategoryUsage>,
}

pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            parent_id INTEGER REFERENCES category(id) ON DELETE SET NULL,
            icon TEXT,
            colour TEXT,
            description TEXT,
            is_system INTEGER NOT NULL DEFAULT 0,
            UNIQUE(name, kind)
        )",
        (),
    )?;

    Ok(())
}

/// Insert the system categories, skipping any that already exist.
pub fn seed_system_categories(connection: &Connection) -> Result<(), rusqlite::Error> {
    let mut statement = connection.prepare(
        "INSERT OR IGNORE INTO category (name, kind, icon, is_system) VALUES (?1, ?2, ?3, 1)",
    )?;

    for (name, kind, icon) in SYSTEM_CATEGORIES {
        statement.execute(params![name, kind, icon])?;
    }

    Ok(())
}

const CATEGORY_COLUMNS: &str = "id, name, kind, parent_id, icon, colour, description, is_system";

fn map_row_to_category(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        parent_id: row.get(3)?,
        icon: row.get(4)?,
        colour: row.get(5)?,
        description: row.get(6)?,
        is_system: row.get(7)?,
    })
}

/// Create a category.
///
/// # Errors
/// Returns [Error::DuplicateCategory] if a category with the same name and
/// kind exists and [Error::InvalidForeignKey] if the parent does not exist.
pub fn create_category(form: &CategoryForm, connection: &Connection) -> Result<Category, Error> {
    let mut validator = Validator::default();
    validator.not_blank("name", &form.name);
    validator.finish()?;

    let name = form.name.trim();

    connection
        .query_row(
            &format!(
                "INSERT INTO category (name, kind, parent_id, icon, colour, description) \
                VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                RETURNING {CATEGORY_COLUMNS}"
            ),
            params![
                name,
                form.kind,
                form.parent_id,
                form.icon,
                form.colour,
                form.description
            ],
            map_row_to_category,
        )
        .map_err(|error| {
            if is_unique_violation(&error) {
                Error::DuplicateCategory(name.to_owned())
            } else {
                error.into()
            }
        })
}

pub fn get_category(id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .query_row(
            &format!("SELECT {CATEGORY_COLUMNS} FROM category WHERE id = ?1"),
            [id],
            map_row_to_category,
        )
        .map_err(Error::from)
}

/// Find a category by its exact name and kind.
pub fn get_category_by_name(
    name: &str,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .query_row(
            &format!("SELECT {CATEGORY_COLUMNS} FROM category WHERE name = ?1 AND kind = ?2"),
            params![name, kind],
            map_row_to_category,
        )
        .map_err(Error::from)
}

/// List categories ordered by kind and name.
pub fn get_categories(
    query: &CategoryQuery,
    connection: &Connection,
) -> Result<Vec<CategoryListing>, Error> {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(kind) = query.kind {
        values.push(kind.as_str().to_owned());
        conditions.push(format!("kind = ?{}", values.len()));
    }
    if !query.include_system {
        conditions.push("is_system = 0".to_owned());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let categories = connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category {where_clause} ORDER BY kind, name"
        ))?
        .query_map(rusqlite::params_from_iter(values), map_row_to_category)?
        .collect::<Result<Vec<_>, _>>()?;

    categories
        .into_iter()
        .map(|category| {
            let usage = if query.include_usage {
                Some(count_usage(&category, connection)?)
            } else {
                None
            };

            Ok(CategoryListing { category, usage })
        })
        .collect()
}

fn count_usage(category: &Category, connection: &Connection) -> Result<CategoryUsage, Error> {
    let count = |table: &str| -> Result<i64, rusqlite::Error> {
        connection.query_row(
            &format!("SELECT COUNT(*) FROM \"{table}\" WHERE category_id = ?1"),
            [category.id],
            |row| row.get(0),
        )
    };

    let transaction_count = count("transaction")?;
    let budget_count = count("budget")?;
    let recurring_count = count("recurring_transaction")?;

    Ok(CategoryUsage {
        transaction_count,
        budget_count,
        recurring_count,
        can_delete: !category.is_system
            && transaction_count == 0
            && budget_count == 0
            && recurring_count == 0,
    })
}

/// Count the transactions, budgets and recurring transactions using a category.
pub fn get_category_usage(id: CategoryId, connection: &Connection) -> Result<CategoryUsage, Error> {
    let category = get_category(id, connection)?;

    count_usage(&category, connection)
}

/// Change the given fields of a user-defined category.
///
/// # Errors
/// Returns [Error::SystemCategory] for system categories and
/// [Error::DuplicateCategory] if the new name is taken.
pub fn update_category(
    id: CategoryId,
    update: &CategoryUpdate,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = get_category(id, connection)?;
    if category.is_system {
        return Err(Error::SystemCategory);
    }

    let mut validator = Validator::default();
    if let Some(name) = &update.name {
        validator.not_blank("name", name);
    }
    if update.parent_id == Some(id) {
        validator.fail("a category cannot be its own parent");
    }
    validator.finish()?;

    let name = update.name.as_deref().map(str::trim);
    let mut statement = PartialUpdate::new("category");
    statement
        .set("name", name.map(str::to_owned))
        .set("parent_id", update.parent_id)
        .set("icon", update.icon.clone())
        .set("colour", update.colour.clone())
        .set("description", update.description.clone())
        .on_unique_violation(Error::DuplicateCategory(
            name.unwrap_or(&category.name).to_owned(),
        ));

    statement.execute(id, CATEGORY_COLUMNS, connection, map_row_to_category)
}

/// Delete a user-defined category that nothing refers to.
///
/// # Errors
/// Returns [Error::SystemCategory] for system categories and
/// [Error::CategoryInUse] if transactions, budgets or recurring transactions
/// use the category.
pub fn delete_category(id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let category = get_category(id, connection)?;
    if category.is_system {
        return Err(Error::SystemCategory);
    }

    let usage = count_usage(&category, connection)?;
    if !usage.can_delete {
        let users: Vec<String> = [
            (usage.transaction_count, "transactions"),
            (usage.budget_count, "budgets"),
            (usage.recurring_count, "recurring transactions"),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{count} {label}"))
        .collect();

        return Err(Error::CategoryInUse(users.join(", ")));
    }

    connection.execute("DELETE FROM category WHERE id = ?1", [id])?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        category::core::{
            CategoryForm, CategoryKind, CategoryQuery, CategoryUpdate, SYSTEM_CATEGORIES,
            create_category, delete_category, get_categories, get_category_by_name,
            get_category_usage, update_category,
        },
        db::initialize,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn system_categories_are_seeded() {
        let connection = get_test_connection();

        let groceries =
            get_category_by_name("Groceries", CategoryKind::Expense, &connection).unwrap();
        let all = get_categories(&CategoryQuery::default(), &connection).unwrap();

        assert!(groceries.is_system);
        assert_eq!(all.len(), SYSTEM_CATEGORIES.len());
    }

    #[test]
    fn same_name_allowed_for_different_kinds() {
        let connection = get_test_connection();

        create_category(&CategoryForm::new("Gifts", CategoryKind::Expense), &connection).unwrap();
        let income = create_category(&CategoryForm::new("Gifts", CategoryKind::Income), &connection);
        let duplicate =
            create_category(&CategoryForm::new("Gifts", CategoryKind::Expense), &connection);

        assert!(income.is_ok());
        assert_eq!(duplicate, Err(Error::DuplicateCategory("Gifts".to_owned())));
    }

    #[test]
    fn lists_user_categories_by_kind() {
        let connection = get_test_connection();
        create_category(&CategoryForm::new("Pets", CategoryKind::Expense), &connection).unwrap();
        create_category(&CategoryForm::new("Bonus", CategoryKind::Income), &connection).unwrap();

        let got = get_categories(
            &CategoryQuery {
                kind: Some(CategoryKind::Expense),
                include_system: false,
                include_usage: true,
            },
            &connection,
        )
        .unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].category.name, "Pets");
        assert_eq!(got[0].usage.map(|usage| usage.can_delete), Some(true));
    }

    #[test]
    fn system_categories_are_read_only() {
        let connection = get_test_connection();
        let salary = get_category_by_name("Salary", CategoryKind::Income, &connection).unwrap();

        let update = update_category(
            salary.id,
            &CategoryUpdate {
                icon: Some("💰".to_owned()),
                ..Default::default()
            },
            &connection,
        );

        assert_eq!(update, Err(Error::SystemCategory));
        assert_eq!(
            delete_category(salary.id, &connection),
            Err(Error::SystemCategory)
        );
        assert!(!get_category_usage(salary.id, &connection).unwrap().can_delete);
    }

    #[test]
    fn category_in_use_cannot_be_deleted() {
        let connection = get_test_connection();
        let pets =
            create_category(&CategoryForm::new("Pets", CategoryKind::Expense), &connection).unwrap();
        connection
            .execute(
                "INSERT INTO budget (category_id, amount, start_date) VALUES (?1, 50, '2025-01-01')",
                [pets.id],
            )
            .unwrap();

        let got = delete_category(pets.id, &connection);

        assert_eq!(got, Err(Error::CategoryInUse("1 budgets".to_owned())));
    }

    #[test]
    fn deletes_unused_category() {
        let connection = get_test_connection();
        let pets =
            create_category(&CategoryForm::new("Pets", CategoryKind::Expense), &connection).unwrap();

        delete_category(pets.id, &connection).unwrap();

        assert_eq!(get_category_usage(pets.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn renames_user_category() {
        let connection = get_test_connection();
        let pets =
            create_category(&CategoryForm::new("Pets", CategoryKind::Expense), &connection).unwrap();

        let renamed = update_category(
            pets.id,
            &CategoryUpdate {
                name: Some(" Pet care ".to_owned()),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(renamed.name, "Pet care");
        assert_eq!(renamed.kind, CategoryKind::Expense);
    }
}
