use chrono::NaiveDate;

use super::{CarId, CustomerId};

pub type RentalId = i64;

/// Day/month/year, the format rental dates are typed in.
pub const RENTAL_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rental {
    pub id: RentalId,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub customer_id: CustomerId,
    pub car_id: CarId,
}

/// A rental about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRental {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub customer_id: CustomerId,
    pub car_id: CarId,
}

impl NewRental {
    pub fn new(customer_id: CustomerId, car_id: CarId) -> Self {
        Self {
            start_date: None,
            end_date: None,
            customer_id,
            car_id,
        }
    }

    pub fn with_dates(mut self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }
}

/// Format an optional rental date for display, e.g. "01/01/2024" or "-".
pub fn format_rental_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(RENTAL_DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}
