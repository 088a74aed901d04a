use thiserror::Error;

use crate::domain::{CarId, CustomerId, ParseInputError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Car with ID '{0}' not found")]
    CarNotFound(CarId),

    #[error("Car with make '{make}' and model '{model}' not found")]
    CarNotFoundByName { make: String, model: String },

    #[error("Customer with ID '{0}' not found")]
    CustomerNotFound(CustomerId),

    #[error("Customer with first name '{first_name}' and last name '{last_name}' not found")]
    CustomerNotFoundByName {
        first_name: String,
        last_name: String,
    },

    #[error("A car with make '{make}', model '{model}', and year '{year}' already exists")]
    DuplicateCar {
        make: String,
        model: String,
        year: i32,
    },

    #[error("A car with model '{0}' already exists")]
    DuplicateModel(String),

    #[error("Customer with phone number {0} already exists")]
    DuplicatePhone(String),

    #[error("Customer with ID '{0}' is already registered to a car")]
    AlreadyRegistered(CustomerId),

    #[error("Integrity constraint violation: customer '{customer_id}' is already registered to car '{car_id}'")]
    RentalConstraintViolation {
        customer_id: CustomerId,
        car_id: CarId,
    },

    #[error("Invalid date format '{0}'. Please use the format DD/MM/YYYY.")]
    InvalidDate(String),

    #[error(transparent)]
    InvalidInput(ParseInputError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<ParseInputError> for AppError {
    fn from(err: ParseInputError) -> Self {
        match err {
            ParseInputError::InvalidDate(input) => AppError::InvalidDate(input),
            other => AppError::InvalidInput(other),
        }
    }
}

impl AppError {
    /// True for the errors that mean "no such record".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::CarNotFound(_)
                | AppError::CarNotFoundByName { .. }
                | AppError::CustomerNotFound(_)
                | AppError::CustomerNotFoundByName { .. }
        )
    }
}
