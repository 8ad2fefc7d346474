//! Asset records and the SQL that stores them.

use rusqlite::{Connection, Row, params, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, text_enum::text_enum, validation::Validator};

/// Alias for the integer type used for asset IDs.
pub type AssetId = i64;

/// The longest lifetime an asset may be given.
pub const MAX_LIFETIME_YEARS: u32 = 100;

text_enum! {
    /// The kind of physical object an asset is.
    pub enum AssetCategory {
        /// Cars, motorbikes, vans.
        Vehicle => "vehicle",
        /// Electrical appliances.
        Appliance => "appliance",
        /// Houses, flats, land.
        RealEstate => "real_estate",
        /// Tools and other equipment.
        Equipment => "equipment",
        /// Anything else.
        Other => "other",
    }
}

text_enum! {
    /// What a vehicle runs on.
    pub enum FuelType {
        /// Petrol.
        Petrol => "petrol",
        /// Diesel.
        Diesel => "diesel",
        /// Battery electric, consumption is in kWh/100km.
        Electric => "electric",
        /// Petrol-electric hybrid.
        Hybrid => "hybrid",
        /// Liquefied petroleum gas.
        Lpg => "lpg",
    }
}

/// A physical object whose running costs can be broken down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// The ID of the asset.
    pub id: AssetId,
    /// A name such as "Fiat Panda" or "Kitchen fridge".
    pub name: String,
    /// The kind of asset.
    pub category: AssetCategory,
    /// When the asset was bought.
    pub purchase_date: Option<Date>,
    /// What the asset cost new, in euros.
    pub purchase_price: Option<f64>,
    /// Vehicles only.
    pub fuel_type: Option<FuelType>,
    /// Vehicles only: litres (or kWh) per 100 km.
    pub consumption_per_100km: Option<f64>,
    /// Vehicles only: euros per km for maintenance, tyres etc.
    pub maintenance_cost_per_km: Option<f64>,
    /// Appliances only: rated power in watts.
    pub power_watts: Option<f64>,
    /// Appliances only: average hours of use per day.
    pub daily_usage_hours: Option<f64>,
    /// The expected useful life in years.
    pub lifetime_years: Option<u32>,
    /// The annual depreciation rate in percent.
    pub depreciation_rate: Option<f64>,
    /// Free text.
    pub note: Option<String>,
    /// Inactive assets are hidden from lists by default.
    pub active: bool,
}

impl Asset {
    /// Create an active asset with only a name and category set.
    pub fn new(id: AssetId, name: &str, category: AssetCategory) -> Self {
        Self {
            id,
            name: name.to_owned(),
            category,
            purchase_date: None,
            purchase_price: None,
            fuel_type: None,
            consumption_per_100km: None,
            maintenance_cost_per_km: None,
            power_watts: None,
            daily_usage_hours: None,
            lifetime_years: None,
            depreciation_rate: None,
            note: None,
            active: true,
        }
    }
}

/// The data for creating or replacing an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetForm {
    /// A name such as "Fiat Panda".
    pub name: String,
    /// The kind of asset.
    pub category: AssetCategory,
    #[serde(default)]
    pub purchase_date: Option<Date>,
    #[serde(default)]
    pub purchase_price: Option<f64>,
    #[serde(default)]
    pub fuel_type: Option<FuelType>,
    #[serde(default)]
    pub consumption_per_100km: Option<f64>,
    #[serde(default)]
    pub maintenance_cost_per_km: Option<f64>,
    #[serde(default)]
    pub power_watts: Option<f64>,
    #[serde(default)]
    pub daily_usage_hours: Option<f64>,
    #[serde(default)]
    pub lifetime_years: Option<u32>,
    #[serde(default)]
    pub depreciation_rate: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

impl AssetForm {
    /// A form with only a name and category.
    pub fn new(name: &str, category: AssetCategory) -> Self {
        Self {
            name: name.to_owned(),
            category,
            purchase_date: None,
            purchase_price: None,
            fuel_type: None,
            consumption_per_100km: None,
            maintenance_cost_per_km: None,
            power_watts: None,
            daily_usage_hours: None,
            lifetime_years: None,
            depreciation_rate: None,
            note: None,
        }
    }

    /// Check names and numeric attributes.
    ///
    /// # Errors
    /// Returns [Error::InvalidInput] describing every problem found.
    pub fn validate(&self) -> Result<(), Error> {
        let mut validator = Validator::default();

        validator.not_blank("name", &self.name);
        validator.non_negative("purchase_price", self.purchase_price);
        validator.non_negative("consumption_per_100km", self.consumption_per_100km);
        validator.non_negative("maintenance_cost_per_km", self.maintenance_cost_per_km);
        validator.non_negative("power_watts", self.power_watts);
        validator.in_range("daily_usage_hours", self.daily_usage_hours, 0.0, 24.0);
        validator.in_range("depreciation_rate", self.depreciation_rate, 0.0, 100.0);
        if let Some(lifetime_years) = self.lifetime_years
            && !(1..=MAX_LIFETIME_YEARS).contains(&lifetime_years)
        {
            validator.fail(format!(
                "lifetime_years must be between 1 and {MAX_LIFETIME_YEARS}"
            ));
        }

        validator.finish()
    }
}

/// The filters for listing assets.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AssetQuery {
    /// Only list assets of this category.
    pub category: Option<AssetCategory>,
    /// Include soft-deleted assets.
    #[serde(default)]
    pub include_inactive: bool,
}

pub fn create_asset_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS asset (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            purchase_date TEXT,
            purchase_price REAL,
            fuel_type TEXT,
            consumption_per_100km REAL,
            maintenance_cost_per_km REAL,
            power_watts REAL,
            daily_usage_hours REAL,
            lifetime_years INTEGER,
            depreciation_rate REAL,
            note TEXT,
            active INTEGER NOT NULL DEFAULT 1
        )",
        (),
    )?;

    Ok(())
}

const ASSET_COLUMNS: &str = "id, name, category, purchase_date, purchase_price, fuel_type, \
    consumption_per_100km, maintenance_cost_per_km, power_watts, daily_usage_hours, \
    lifetime_years, depreciation_rate, note, active";

pub fn map_row_to_asset(row: &Row) -> Result<Asset, rusqlite::Error> {
    Ok(Asset {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        purchase_date: row.get(3)?,
        purchase_price: row.get(4)?,
        fuel_type: row.get(5)?,
        consumption_per_100km: row.get(6)?,
        maintenance_cost_per_km: row.get(7)?,
        power_watts: row.get(8)?,
        daily_usage_hours: row.get(9)?,
        lifetime_years: row.get(10)?,
        depreciation_rate: row.get(11)?,
        note: row.get(12)?,
        active: row.get(13)?,
    })
}

/// Insert a new asset.
///
/// # Errors
/// Returns [Error::InvalidInput] if the form is invalid or [Error::SqlError]
/// if the insert fails.
pub fn create_asset(form: &AssetForm, connection: &Connection) -> Result<Asset, Error> {
    form.validate()?;

    let asset = connection.query_row(
        &format!(
            "INSERT INTO asset (name, category, purchase_date, purchase_price, fuel_type, \
                consumption_per_100km, maintenance_cost_per_km, power_watts, daily_usage_hours, \
                lifetime_years, depreciation_rate, note) \
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
            RETURNING {ASSET_COLUMNS}"
        ),
        params![
            form.name.trim(),
            form.category,
            form.purchase_date,
            form.purchase_price,
            form.fuel_type,
            form.consumption_per_100km,
            form.maintenance_cost_per_km,
            form.power_watts,
            form.daily_usage_hours,
            form.lifetime_years,
            form.depreciation_rate,
            form.note,
        ],
        map_row_to_asset,
    )?;

    Ok(asset)
}

/// Get an asset by its ID, including inactive assets.
///
/// # Errors
/// Returns [Error::NotFound] if there is no asset with the ID.
pub fn get_asset(id: AssetId, connection: &Connection) -> Result<Asset, Error> {
    connection
        .query_row(
            &format!("SELECT {ASSET_COLUMNS} FROM asset WHERE id = ?1"),
            [id],
            map_row_to_asset,
        )
        .map_err(Error::from)
}

/// List assets, newest first.
pub fn get_assets(query: &AssetQuery, connection: &Connection) -> Result<Vec<Asset>, Error> {
    let mut conditions = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if !query.include_inactive {
        conditions.push("active = 1".to_owned());
    }

    if let Some(category) = query.category {
        values.push(Value::Text(category.as_str().to_owned()));
        conditions.push(format!("category = ?{}", values.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    connection
        .prepare(&format!(
            "SELECT {ASSET_COLUMNS} FROM asset {where_clause} ORDER BY id DESC"
        ))?
        .query_map(params_from_iter(values), map_row_to_asset)?
        .map(|maybe_asset| maybe_asset.map_err(Error::from))
        .collect()
}

/// Replace every attribute of an asset.
///
/// # Errors
/// Returns [Error::NotFound] if there is no asset with the ID.
pub fn update_asset(id: AssetId, form: &AssetForm, connection: &Connection) -> Result<Asset, Error> {
    form.validate()?;

    connection
        .query_row(
            &format!(
                "UPDATE asset SET name = ?1, category = ?2, purchase_date = ?3, \
                    purchase_price = ?4, fuel_type = ?5, consumption_per_100km = ?6, \
                    maintenance_cost_per_km = ?7, power_watts = ?8, daily_usage_hours = ?9, \
                    lifetime_years = ?10, depreciation_rate = ?11, note = ?12 \
                WHERE id = ?13 \
                RETURNING {ASSET_COLUMNS}"
            ),
            params![
                form.name.trim(),
                form.category,
                form.purchase_date,
                form.purchase_price,
                form.fuel_type,
                form.consumption_per_100km,
                form.maintenance_cost_per_km,
                form.power_watts,
                form.daily_usage_hours,
                form.lifetime_years,
                form.depreciation_rate,
                form.note,
                id,
            ],
            map_row_to_asset,
        )
        .map_err(Error::from)
}

/// Soft delete an asset so that past breakdowns keep their reference.
///
/// # Errors
/// Returns [Error::NotFound] if there is no asset with the ID.
pub fn deactivate_asset(id: AssetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("UPDATE asset SET active = 0 WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
