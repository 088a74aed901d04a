use anyhow::Context;
use sqlx::{Sqlite, Transaction};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::domain::{
    parse_rental_date, Car, CarChanges, CarId, Customer, CustomerChanges, CustomerId, NewCar,
    NewCustomer, NewRental, Rental,
};
use crate::storage::{is_unique_violation, Repository};

use super::{AppError, LedgerConfig};

/// The rental ledger: sole gateway to cars, customers and rentals.
/// Every mutation runs in its own transaction and either commits fully or not at all.
pub struct RentalLedger {
    repo: Repository,
}

/// Result of deleting a car or a customer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedRecord {
    pub id: i64,
    /// "make model" for cars, "first last" for customers.
    pub label: String,
    /// Rentals removed together with the record.
    pub rentals_removed: u64,
}

/// Result of registering a customer to a car
#[derive(Debug, Clone)]
pub struct Assignment {
    pub rental: Rental,
    pub customer: Customer,
    pub car: Car,
}

impl Assignment {
    /// Confirmation naming both parties.
    pub fn summary(&self) -> String {
        format!(
            "Customer '{}' (ID: {}) successfully added to car '{}' (ID: {})",
            self.customer.full_name(),
            self.customer.id,
            self.car.label(),
            self.car.id
        )
    }
}

impl RentalLedger {
    /// Create a new ledger with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Open (creating if needed) the database file at `database_path`.
    pub async fn open(database_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        Self::open_with(LedgerConfig::new(database_path)).await
    }

    /// Open the database described by `config` and make sure the schema exists.
    pub async fn open_with(config: LedgerConfig) -> Result<Self, AppError> {
        let repo = Repository::init(&config.database_url()).await?;
        info!(
            path = %config.database_path.display(),
            in_memory = config.in_memory,
            "Rental ledger opened"
        );
        Ok(Self::new(repo))
    }

    /// Release the database connection.
    pub async fn close(self) {
        self.repo.close().await;
        info!("Rental ledger closed");
    }

    async fn rollback(tx: Transaction<'static, Sqlite>) {
        if let Err(err) = tx.rollback().await {
            warn!(error = %err, "Rollback failed");
        }
    }

    async fn commit(tx: Transaction<'static, Sqlite>) -> Result<(), AppError> {
        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }

    // ========================
    // Car operations
    // ========================

    /// Add a new car.
    ///
    /// Rejected when a field is blank, when a car with the same make, model and
    /// year is already stored, or when the model name is taken.
    pub async fn add_car(&self, make: &str, model: &str, year: i32) -> Result<Car, AppError> {
        let make = required("Make", make)?;
        let model = required("Model", model)?;
        if year <= 0 {
            return Err(AppError::MissingField("Year"));
        }

        if self.repo.find_matching_car(&make, &model, year).await?.is_some() {
            warn!(%make, %model, year, "Rejected duplicate car");
            return Err(AppError::DuplicateCar { make, model, year });
        }

        let new_car = NewCar { make, model, year };
        let mut tx = self.repo.begin().await?;
        let car = match Repository::insert_car(&mut *tx, &new_car).await {
            Ok(car) => car,
            Err(err) => {
                Self::rollback(tx).await;
                if is_unique_violation(&err) {
                    warn!(model = %new_car.model, "Car model already taken");
                    return Err(AppError::DuplicateModel(new_car.model));
                }
                return Err(err.into());
            }
        };
        Self::commit(tx).await?;

        info!(id = car.id, label = %car.label(), "Car added");
        Ok(car)
    }

    /// List all cars in insertion order.
    pub async fn get_all_cars(&self) -> Result<Vec<Car>, AppError> {
        Ok(self.repo.list_cars().await?)
    }

    /// Get a car by ID.
    pub async fn find_car_by_id(&self, id: CarId) -> Result<Car, AppError> {
        self.repo
            .get_car(id)
            .await?
            .ok_or(AppError::CarNotFound(id))
    }

    /// Get the first car with the given make and model.
    pub async fn find_car_by_make_and_model(&self, make: &str, model: &str) -> Result<Car, AppError> {
        self.repo
            .get_car_by_make_and_model(make.trim(), model.trim())
            .await?
            .ok_or_else(|| AppError::CarNotFoundByName {
                make: make.trim().to_string(),
                model: model.trim().to_string(),
            })
    }

    /// Overwrite the supplied fields of a car and return the stored result.
    pub async fn update_car(&self, id: CarId, changes: CarChanges) -> Result<Car, AppError> {
        let changes = CarChanges {
            make: changes.make.map(|m| required("Make", &m)).transpose()?,
            model: changes.model.map(|m| required("Model", &m)).transpose()?,
            year: match changes.year {
                Some(year) if year <= 0 => return Err(AppError::MissingField("Year")),
                year => year,
            },
        };

        let mut car = self.find_car_by_id(id).await?;
        if changes.is_empty() {
            return Ok(car);
        }
        changes.apply_to(&mut car);

        let mut tx = self.repo.begin().await?;
        if let Err(err) = Repository::update_car(&mut *tx, &car).await {
            Self::rollback(tx).await;
            if is_unique_violation(&err) {
                warn!(id, model = %car.model, "Car model already taken");
                return Err(AppError::DuplicateModel(car.model));
            }
            return Err(err.into());
        }
        Self::commit(tx).await?;

        info!(id, "Car updated");
        Ok(car)
    }

    /// Delete a car together with any rental that references it.
    pub async fn delete_car(&self, id: CarId) -> Result<DeletedRecord, AppError> {
        let car = self.find_car_by_id(id).await?;

        let mut tx = self.repo.begin().await?;
        let removed = async {
            let rentals = Repository::delete_rentals_for_car(&mut *tx, id).await?;
            Repository::delete_car(&mut *tx, id).await?;
            anyhow::Ok(rentals)
        }
        .await;
        let rentals_removed = match removed {
            Ok(rentals) => rentals,
            Err(err) => {
                Self::rollback(tx).await;
                return Err(err.into());
            }
        };
        Self::commit(tx).await?;

        info!(id, rentals_removed, "Car deleted");
        Ok(DeletedRecord {
            id,
            label: car.label(),
            rentals_removed,
        })
    }

    // ========================
    // Customer operations
    // ========================

    /// Add a new customer. Every field is required and the phone number must be unused.
    pub async fn add_customer(
        &self,
        first_name: &str,
        last_name: &str,
        phone_no: &str,
    ) -> Result<Customer, AppError> {
        let first_name = required("First name", first_name)?;
        let last_name = required("Last name", last_name)?;
        let phone_no = required("Phone number", phone_no)?;

        if self.repo.get_customer_by_phone(&phone_no).await?.is_some() {
            warn!(%phone_no, "Rejected duplicate phone number");
            return Err(AppError::DuplicatePhone(phone_no));
        }

        let new_customer = NewCustomer {
            first_name,
            last_name,
            phone_no,
        };
        let mut tx = self.repo.begin().await?;
        let customer = match Repository::insert_customer(&mut *tx, &new_customer).await {
            Ok(customer) => customer,
            Err(err) => {
                Self::rollback(tx).await;
                if is_unique_violation(&err) {
                    return Err(AppError::DuplicatePhone(new_customer.phone_no));
                }
                return Err(err.into());
            }
        };
        Self::commit(tx).await?;

        info!(id = customer.id, name = %customer.full_name(), "Customer added");
        Ok(customer)
    }

    /// List all customers in insertion order.
    pub async fn get_all_customers(&self) -> Result<Vec<Customer>, AppError> {
        Ok(self.repo.list_customers().await?)
    }

    /// Get a customer by ID.
    pub async fn find_customer_by_id(&self, id: CustomerId) -> Result<Customer, AppError> {
        self.repo
            .get_customer(id)
            .await?
            .ok_or(AppError::CustomerNotFound(id))
    }

    /// Get the first customer with the given first and last name.
    pub async fn find_customer_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Customer, AppError> {
        self.repo
            .get_customer_by_name(first_name.trim(), last_name.trim())
            .await?
            .ok_or_else(|| AppError::CustomerNotFoundByName {
                first_name: first_name.trim().to_string(),
                last_name: last_name.trim().to_string(),
            })
    }

    /// Overwrite the supplied fields of a customer and return the stored result.
    pub async fn update_customer(
        &self,
        id: CustomerId,
        changes: CustomerChanges,
    ) -> Result<Customer, AppError> {
        let changes = CustomerChanges {
            first_name: changes
                .first_name
                .map(|v| required("First name", &v))
                .transpose()?,
            last_name: changes
                .last_name
                .map(|v| required("Last name", &v))
                .transpose()?,
            phone_no: changes
                .phone_no
                .map(|v| required("Phone number", &v))
                .transpose()?,
        };

        let mut customer = self.find_customer_by_id(id).await?;
        if changes.is_empty() {
            return Ok(customer);
        }
        changes.apply_to(&mut customer);

        let mut tx = self.repo.begin().await?;
        if let Err(err) = Repository::update_customer(&mut *tx, &customer).await {
            Self::rollback(tx).await;
            if is_unique_violation(&err) {
                warn!(id, phone_no = %customer.phone_no, "Phone number already taken");
                return Err(AppError::DuplicatePhone(customer.phone_no));
            }
            return Err(err.into());
        }
        Self::commit(tx).await?;

        info!(id, "Customer updated");
        Ok(customer)
    }

    /// Delete a customer together with their rental, if any.
    pub async fn delete_customer(&self, id: CustomerId) -> Result<DeletedRecord, AppError> {
        let customer = self.find_customer_by_id(id).await?;

        let mut tx = self.repo.begin().await?;
        let removed = async {
            let rentals = Repository::delete_rentals_for_customer(&mut *tx, id).await?;
            Repository::delete_customer(&mut *tx, id).await?;
            anyhow::Ok(rentals)
        }
        .await;
        let rentals_removed = match removed {
            Ok(rentals) => rentals,
            Err(err) => {
                Self::rollback(tx).await;
                return Err(err.into());
            }
        };
        Self::commit(tx).await?;

        info!(id, rentals_removed, "Customer deleted");
        Ok(DeletedRecord {
            id,
            label: customer.full_name(),
            rentals_removed,
        })
    }

    // ========================
    // Rentals
    // ========================

    /// Register a customer to a car.
    ///
    /// Dates are DD/MM/YYYY strings; blank means no date. A customer who
    /// already holds any rental is turned away, whichever car it is for.
    pub async fn register_customer_to_car(
        &self,
        customer_id: CustomerId,
        car_id: CarId,
        start_date: &str,
        end_date: &str,
    ) -> Result<Assignment, AppError> {
        let start_date = parse_rental_date(start_date)?;
        let end_date = parse_rental_date(end_date)?;

        if self.repo.get_rental_for_customer(customer_id).await?.is_some() {
            warn!(customer_id, "Customer already holds a rental");
            return Err(AppError::AlreadyRegistered(customer_id));
        }

        let customer = self.find_customer_by_id(customer_id).await?;
        let car = self.find_car_by_id(car_id).await?;

        let new_rental = NewRental::new(customer_id, car_id).with_dates(start_date, end_date);
        let mut tx = self.repo.begin().await?;
        let rental = match Repository::insert_rental(&mut *tx, &new_rental).await {
            Ok(rental) => rental,
            Err(err) => {
                Self::rollback(tx).await;
                return Err(rental_insert_error(err, customer_id, car_id));
            }
        };
        Self::commit(tx).await?;

        info!(rental_id = rental.id, customer_id, car_id, "Customer registered to car");
        Ok(Assignment {
            rental,
            customer,
            car,
        })
    }

    /// List all rentals in insertion order.
    pub async fn get_all_rentals(&self) -> Result<Vec<Rental>, AppError> {
        Ok(self.repo.list_rentals().await?)
    }

    /// The rental a customer holds, if any.
    pub async fn find_rental_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Rental>, AppError> {
        Ok(self.repo.get_rental_for_customer(customer_id).await?)
    }

    /// Customers currently renting a car.
    pub async fn get_customers_for_car(&self, car_id: CarId) -> Result<Vec<Customer>, AppError> {
        self.find_car_by_id(car_id).await?;
        Ok(self.repo.list_customers_for_car(car_id).await?)
    }
}

/// A UNIQUE failure on the rental pair is reported on its own; anything else
/// stays a database error.
fn rental_insert_error(err: anyhow::Error, customer_id: CustomerId, car_id: CarId) -> AppError {
    if is_unique_violation(&err) {
        warn!(customer_id, car_id, "Rental constraint violation");
        AppError::RentalConstraintViolation {
            customer_id,
            car_id,
        }
    } else {
        AppError::Database(err)
    }
}

fn required(field: &'static str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        Err(AppError::MissingField(field))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn duplicate_insert_error() -> anyhow::Result<anyhow::Error> {
        let repo = Repository::init("sqlite::memory:").await?;
        let mut tx = repo.begin().await?;
        let car = Repository::insert_car(
            &mut *tx,
            &NewCar {
                make: "Toyota".to_string(),
                model: "Corolla".to_string(),
                year: 2020,
            },
        )
        .await?;
        let customer = Repository::insert_customer(
            &mut *tx,
            &NewCustomer {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                phone_no: "0712345678".to_string(),
            },
        )
        .await?;
        let rental = NewRental::new(customer.id, car.id);
        Repository::insert_rental(&mut *tx, &rental).await?;
        let err = Repository::insert_rental(&mut *tx, &rental)
            .await
            .expect_err("second insert for the same pair must fail");
        tx.rollback().await?;
        Ok(err)
    }

    #[tokio::test]
    async fn test_unique_failure_maps_to_constraint_violation() -> anyhow::Result<()> {
        let err = duplicate_insert_error().await?;

        let mapped = rental_insert_error(err, 1, 1);
        assert!(matches!(
            mapped,
            AppError::RentalConstraintViolation {
                customer_id: 1,
                car_id: 1
            }
        ));
        Ok(())
    }

    #[test]
    fn test_other_failures_stay_database_errors() {
        let mapped = rental_insert_error(anyhow::anyhow!("disk I/O error"), 1, 1);
        assert!(matches!(mapped, AppError::Database(_)));
    }
}
