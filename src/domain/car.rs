use std::fmt;

pub type CarId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Car {
    pub id: CarId,
    pub make: String,
    pub model: String,
    pub year: i32,
}

impl Car {
    /// Short human label, e.g. "Toyota Corolla".
    pub fn label(&self) -> String {
        format!("{} {}", self.make, self.model)
    }
}

impl fmt::Display for Car {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Make: {}, Model: {}, Year: {}",
            self.make, self.model, self.year
        )
    }
}

/// Fields of a car that does not exist in storage yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCar {
    pub make: String,
    pub model: String,
    pub year: i32,
}

/// Partial update for a car. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarChanges {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
}

impl CarChanges {
    pub fn with_make(mut self, make: impl Into<String>) -> Self {
        self.make = Some(make.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.make.is_none() && self.model.is_none() && self.year.is_none()
    }

    /// Apply the supplied fields on top of an existing car.
    pub fn apply_to(&self, car: &mut Car) {
        if let Some(make) = &self.make {
            car.make = make.clone();
        }
        if let Some(model) = &self.model {
            car.model = model.clone();
        }
        if let Some(year) = self.year {
            car.year = year;
        }
    }
}
