use std::fmt;

pub type CustomerId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub phone_no: String,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "First Name: {}, Last Name: {}, Phone No: {}",
            self.first_name, self.last_name, self.phone_no
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub phone_no: String,
}

/// Partial update for a customer. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_no: Option<String>,
}

impl CustomerChanges {
    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn with_phone_no(mut self, phone_no: impl Into<String>) -> Self {
        self.phone_no = Some(phone_no.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone_no.is_none()
    }

    pub fn apply_to(&self, customer: &mut Customer) {
        if let Some(first_name) = &self.first_name {
            customer.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            customer.last_name = last_name.clone();
        }
        if let Some(phone_no) = &self.phone_no {
            customer.phone_no = phone_no.clone();
        }
    }
}
