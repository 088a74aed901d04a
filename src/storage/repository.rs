use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::debug;

use crate::domain::{
    Car, CarId, Customer, CustomerId, NewCar, NewCustomer, NewRental, Rental, RentalId,
};

use super::MIGRATION_001_INITIAL;

/// How rental dates are written: midnight with microseconds, the layout
/// already present in existing database files.
const STORED_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const CAR_COLUMNS: &str = "id, make, model, year";
const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, CAST(phone_no AS TEXT) AS phone_no";
const RENTAL_COLUMNS: &str = "id, start_date, end_date, customer_id, car_id";

/// Repository for persisting and querying cars, customers and rentals.
///
/// Reads go through the pool. Writes take a connection so callers can run
/// them inside a transaction obtained from [`Repository::begin`].
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    ///
    /// The pool holds exactly one connection: the ledger is used by one caller
    /// at a time, and an in-memory database only lives as long as its connection.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        debug!(url = %database_url, "Connected to database");
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they are missing.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Start a transaction. Dropping it without committing rolls it back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool.begin().await.context("Failed to begin transaction")
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Car operations
    // ========================

    pub async fn insert_car(conn: &mut SqliteConnection, car: &NewCar) -> Result<Car> {
        debug!(make = %car.make, model = %car.model, year = car.year, "Inserting car");

        let row = sqlx::query("INSERT INTO cars (make, model, year) VALUES (?, ?, ?) RETURNING id")
            .bind(&car.make)
            .bind(&car.model)
            .bind(car.year)
            .fetch_one(&mut *conn)
            .await
            .context("Failed to save car")?;

        Ok(Car {
            id: row.get("id"),
            make: car.make.clone(),
            model: car.model.clone(),
            year: car.year,
        })
    }

    pub async fn update_car(conn: &mut SqliteConnection, car: &Car) -> Result<()> {
        debug!(id = car.id, "Updating car");

        sqlx::query("UPDATE cars SET make = ?, model = ?, year = ? WHERE id = ?")
            .bind(&car.make)
            .bind(&car.model)
            .bind(car.year)
            .bind(car.id)
            .execute(&mut *conn)
            .await
            .context("Failed to update car")?;
        Ok(())
    }

    /// Delete a car and return how many rows went away.
    pub async fn delete_car(conn: &mut SqliteConnection, id: CarId) -> Result<u64> {
        debug!(id, "Deleting car");

        let result = sqlx::query("DELETE FROM cars WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await
            .context("Failed to delete car")?;
        Ok(result.rows_affected())
    }

    /// Get a car by ID.
    pub async fn get_car(&self, id: CarId) -> Result<Option<Car>> {
        let row = sqlx::query(&format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch car")?;

        row.as_ref().map(Self::row_to_car).transpose()
    }

    /// First car (lowest id) with the given make and model.
    pub async fn get_car_by_make_and_model(&self, make: &str, model: &str) -> Result<Option<Car>> {
        let row = sqlx::query(&format!(
            "SELECT {CAR_COLUMNS} FROM cars WHERE make = ? AND model = ? ORDER BY id LIMIT 1"
        ))
        .bind(make)
        .bind(model)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch car by make and model")?;

        row.as_ref().map(Self::row_to_car).transpose()
    }

    /// Look for a car matching all three identifying fields.
    pub async fn find_matching_car(&self, make: &str, model: &str, year: i32) -> Result<Option<Car>> {
        let row = sqlx::query(&format!(
            "SELECT {CAR_COLUMNS} FROM cars WHERE make = ? AND model = ? AND year = ? ORDER BY id LIMIT 1"
        ))
        .bind(make)
        .bind(model)
        .bind(year)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to check for duplicate car")?;

        row.as_ref().map(Self::row_to_car).transpose()
    }

    /// List all cars in insertion order.
    pub async fn list_cars(&self) -> Result<Vec<Car>> {
        let rows = sqlx::query(&format!("SELECT {CAR_COLUMNS} FROM cars ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list cars")?;

        rows.iter().map(Self::row_to_car).collect()
    }

    fn row_to_car(row: &SqliteRow) -> Result<Car> {
        Ok(Car {
            id: row.try_get("id").context("Invalid car ID")?,
            make: row.try_get("make").context("Invalid car make")?,
            model: row.try_get("model").context("Invalid car model")?,
            year: row.try_get("year").context("Invalid car year")?,
        })
    }

    // ========================
    // Customer operations
    // ========================

    pub async fn insert_customer(
        conn: &mut SqliteConnection,
        customer: &NewCustomer,
    ) -> Result<Customer> {
        debug!(
            first_name = %customer.first_name,
            last_name = %customer.last_name,
            "Inserting customer"
        );

        let row = sqlx::query(
            "INSERT INTO customers (first_name, last_name, phone_no) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone_no)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to save customer")?;

        Ok(Customer {
            id: row.get("id"),
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            phone_no: customer.phone_no.clone(),
        })
    }

    pub async fn update_customer(conn: &mut SqliteConnection, customer: &Customer) -> Result<()> {
        debug!(id = customer.id, "Updating customer");

        sqlx::query(
            "UPDATE customers SET first_name = ?, last_name = ?, phone_no = ? WHERE id = ?",
        )
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone_no)
        .bind(customer.id)
        .execute(&mut *conn)
        .await
        .context("Failed to update customer")?;
        Ok(())
    }

    pub async fn delete_customer(conn: &mut SqliteConnection, id: CustomerId) -> Result<u64> {
        debug!(id, "Deleting customer");

        let result = sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await
            .context("Failed to delete customer")?;
        Ok(result.rows_affected())
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    /// First customer (lowest id) with the given first and last name.
    pub async fn get_customer_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE first_name = ? AND last_name = ? ORDER BY id LIMIT 1"
        ))
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer by name")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    /// Get the customer registered with a phone number.
    pub async fn get_customer_by_phone(&self, phone_no: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone_no = ? LIMIT 1"
        ))
        .bind(phone_no)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer by phone number")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    /// List all customers in insertion order.
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    fn row_to_customer(row: &SqliteRow) -> Result<Customer> {
        Ok(Customer {
            id: row.try_get("id").context("Invalid customer ID")?,
            first_name: row.try_get("first_name").context("Invalid first name")?,
            last_name: row.try_get("last_name").context("Invalid last name")?,
            phone_no: row.try_get("phone_no").context("Invalid phone number")?,
        })
    }

    // ========================
    // Rental operations
    // ========================

    pub async fn insert_rental(conn: &mut SqliteConnection, rental: &NewRental) -> Result<Rental> {
        debug!(
            customer_id = rental.customer_id,
            car_id = rental.car_id,
            "Inserting rental"
        );

        let row = sqlx::query(
            "INSERT INTO rentals (start_date, end_date, customer_id, car_id) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(rental.start_date.map(date_to_stored))
        .bind(rental.end_date.map(date_to_stored))
        .bind(rental.customer_id)
        .bind(rental.car_id)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to save rental")?;

        let id: RentalId = row.get("id");
        Ok(Rental {
            id,
            start_date: rental.start_date,
            end_date: rental.end_date,
            customer_id: rental.customer_id,
            car_id: rental.car_id,
        })
    }

    pub async fn delete_rentals_for_car(conn: &mut SqliteConnection, car_id: CarId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM rentals WHERE car_id = ?")
            .bind(car_id)
            .execute(&mut *conn)
            .await
            .context("Failed to delete rentals for car")?;
        Ok(result.rows_affected())
    }

    pub async fn delete_rentals_for_customer(
        conn: &mut SqliteConnection,
        customer_id: CustomerId,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM rentals WHERE customer_id = ?")
            .bind(customer_id)
            .execute(&mut *conn)
            .await
            .context("Failed to delete rentals for customer")?;
        Ok(result.rows_affected())
    }

    /// The first rental row held by a customer, whichever car it is for.
    pub async fn get_rental_for_customer(&self, customer_id: CustomerId) -> Result<Option<Rental>> {
        let row = sqlx::query(&format!(
            "SELECT {RENTAL_COLUMNS} FROM rentals WHERE customer_id = ? ORDER BY id LIMIT 1"
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch rental for customer")?;

        row.as_ref().map(Self::row_to_rental).transpose()
    }

    /// List all rentals in insertion order.
    pub async fn list_rentals(&self) -> Result<Vec<Rental>> {
        let rows = sqlx::query(&format!("SELECT {RENTAL_COLUMNS} FROM rentals ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list rentals")?;

        rows.iter().map(Self::row_to_rental).collect()
    }

    /// Customers holding a rental on the given car, in rental order.
    pub async fn list_customers_for_car(&self, car_id: CarId) -> Result<Vec<Customer>> {
        let rows = sqlx::query(
            "SELECT c.id, c.first_name, c.last_name, CAST(c.phone_no AS TEXT) AS phone_no \
             FROM customers c JOIN rentals r ON r.customer_id = c.id \
             WHERE r.car_id = ? ORDER BY r.id",
        )
        .bind(car_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list customers for car")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    fn row_to_rental(row: &SqliteRow) -> Result<Rental> {
        let start_date: Option<String> = row.try_get("start_date").context("Invalid start_date")?;
        let end_date: Option<String> = row.try_get("end_date").context("Invalid end_date")?;

        Ok(Rental {
            id: row.try_get("id").context("Invalid rental ID")?,
            start_date: start_date
                .as_deref()
                .map(date_from_stored)
                .transpose()
                .context("Invalid start_date")?,
            end_date: end_date
                .as_deref()
                .map(date_from_stored)
                .transpose()
                .context("Invalid end_date")?,
            customer_id: row.try_get("customer_id").context("Invalid rental customer_id")?,
            car_id: row.try_get("car_id").context("Invalid rental car_id")?,
        })
    }
}

fn date_to_stored(date: NaiveDate) -> String {
    date.and_time(chrono::NaiveTime::MIN)
        .format(STORED_DATETIME_FORMAT)
        .to_string()
}

fn date_from_stored(value: &str) -> Result<NaiveDate> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .with_context(|| format!("Unrecognized stored date: {}", value))
}
