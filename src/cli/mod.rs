use anyhow::Result;
use clap::Parser;
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

use crate::application::{AppError, LedgerConfig, RentalLedger, DEFAULT_DATABASE_PATH};
use crate::domain::{
    format_rental_date, non_blank, parse_id, parse_year, CarChanges, Customer, CustomerChanges,
};

/// Car Rental - cars, customers and who is driving what
#[derive(Parser)]
#[command(name = "car-rental")]
#[command(about = "Manage cars, customers and rentals from an interactive menu")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = DEFAULT_DATABASE_PATH)]
    pub database: String,

    /// Enable verbose logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn config(&self) -> LedgerConfig {
        LedgerConfig::new(&self.database)
    }

    /// Log filter: RUST_LOG wins, otherwise [`default_log_directives`].
    pub fn log_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_directives(self.verbose)))
    }

    pub async fn run(self) -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(self.log_filter())
            .with_writer(io::stderr)
            .init();

        let ledger = RentalLedger::open_with(self.config()).await?;

        let stdin = io::stdin();
        let stdout = io::stdout();
        let outcome = Menu::new(&ledger, stdin.lock(), stdout.lock()).run().await;

        ledger.close().await;
        outcome
    }
}

/// Debug output when verbose, errors only otherwise.
pub fn default_log_directives(verbose: bool) -> &'static str {
    if verbose { "debug,sqlx=warn" } else { "error" }
}

const MENU: &str = "\
Please select an option:
0. Exit the program
1. Add a new car
2. Get all cars
3. Find car by id
4. Find car by make and model
5. Update a car
6. Delete a car
7. Add a customer
8. Get all customers
9. Find customer by id
10. Find customer by name
11. Update a customer
12. Delete a customer
13. Register customer to a car
14. Get all rentals
15. Get customers renting a car";

const FAREWELL: &str = "Nice having you 🤗";

/// The numbered menu. Reads answers from `input`, writes everything to `output`.
///
/// Ledger errors are printed and the loop carries on; only I/O failures end it early.
pub struct Menu<'a, R, W> {
    ledger: &'a RentalLedger,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(ledger: &'a RentalLedger, input: R, output: W) -> Self {
        Self {
            ledger,
            input,
            output,
        }
    }

    /// Show the menu until the user picks 0 or input runs out.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            writeln!(self.output, "{MENU}")?;
            let Some(choice) = self.read_answer("> ")? else {
                break;
            };

            let outcome = match choice.trim() {
                "0" => break,
                "1" => self.add_car().await?,
                "2" => self.get_all_cars().await,
                "3" => self.find_car_by_id().await?,
                "4" => self.find_car_by_make_and_model().await?,
                "5" => self.update_car().await?,
                "6" => self.delete_car().await?,
                "7" => self.add_customer().await?,
                "8" => self.get_all_customers().await,
                "9" => self.find_customer_by_id().await?,
                "10" => self.find_customer_by_name().await?,
                "11" => self.update_customer().await?,
                "12" => self.delete_customer().await?,
                "13" => self.register_customer_to_car().await?,
                "14" => self.get_all_rentals().await,
                "15" => self.get_customers_for_car().await?,
                _ => Ok("Invalid choice!".to_string()),
            };

            match outcome {
                Ok(message) => writeln!(self.output, "{message}")?,
                Err(err) => writeln!(self.output, "Error: {err}")?,
            }
        }

        writeln!(self.output, "{FAREWELL}")?;
        self.output.flush()?;
        Ok(())
    }

    /// Prompt and read one line. `None` once input is exhausted.
    fn read_answer(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Like `read_answer`, but a missing line counts as a blank answer.
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        Ok(self.read_answer(prompt)?.unwrap_or_default())
    }

    // ========================
    // Cars
    // ========================

    async fn add_car(&mut self) -> io::Result<Result<String, AppError>> {
        let make = self.ask("Enter the car's make: ")?;
        let model = self.ask("Enter the car's model: ")?;
        let year = self.ask("Enter the car's year: ")?;

        let ledger = self.ledger;
        Ok(async {
            let year = match non_blank(&year) {
                Some(year) => parse_year(&year)?,
                None => return Err(AppError::MissingField("Year")),
            };
            let car = ledger.add_car(&make, &model, year).await?;
            Ok::<_, AppError>(format!(
                "Car '{}' added successfully with ID {}.",
                car.label(),
                car.id
            ))
        }
        .await)
    }

    async fn get_all_cars(&self) -> Result<String, AppError> {
        let cars = self.ledger.get_all_cars().await?;
        if cars.is_empty() {
            return Ok("No cars found.".to_string());
        }

        let mut listing = String::new();
        for car in &cars {
            let _ = writeln!(listing, "ID: {}, {}", car.id, car);
        }
        Ok(listing.trim_end().to_string())
    }

    async fn find_car_by_id(&mut self) -> io::Result<Result<String, AppError>> {
        let id = self.ask("Enter the car's ID: ")?;

        let ledger = self.ledger;
        Ok(async {
            let car = ledger.find_car_by_id(parse_id(&id)?).await?;
            Ok::<_, AppError>(format!("ID: {}, {}", car.id, car))
        }
        .await)
    }

    async fn find_car_by_make_and_model(&mut self) -> io::Result<Result<String, AppError>> {
        let make = self.ask("Enter the car's make: ")?;
        let model = self.ask("Enter the car's model: ")?;

        let ledger = self.ledger;
        Ok(async {
            let car = ledger.find_car_by_make_and_model(&make, &model).await?;
            Ok::<_, AppError>(format!("ID: {}, {}", car.id, car))
        }
        .await)
    }

    async fn update_car(&mut self) -> io::Result<Result<String, AppError>> {
        let id = self.ask("Enter the car's ID: ")?;
        let make = self.ask("Enter the new make (blank to keep): ")?;
        let model = self.ask("Enter the new model (blank to keep): ")?;
        let year = self.ask("Enter the new year (blank to keep): ")?;

        let ledger = self.ledger;
        Ok(async {
            let id = parse_id(&id)?;
            let changes = CarChanges {
                make: non_blank(&make),
                model: non_blank(&model),
                year: non_blank(&year).map(|y| parse_year(&y)).transpose()?,
            };
            let car = ledger.update_car(id, changes).await?;
            Ok::<_, AppError>(format!("Car with ID '{}' updated successfully.", car.id))
        }
        .await)
    }

    async fn delete_car(&mut self) -> io::Result<Result<String, AppError>> {
        let id = self.ask("Enter the car's ID: ")?;

        let ledger = self.ledger;
        Ok(async {
            let deleted = ledger.delete_car(parse_id(&id)?).await?;
            let mut message = format!(
                "Car '{}' with ID '{}' deleted successfully.",
                deleted.label, deleted.id
            );
            if deleted.rentals_removed > 0 {
                let _ = write!(message, " Removed {} rental(s).", deleted.rentals_removed);
            }
            Ok::<_, AppError>(message)
        }
        .await)
    }

    // ========================
    // Customers
    // ========================

    async fn add_customer(&mut self) -> io::Result<Result<String, AppError>> {
        let first_name = self.ask("Enter the customer's first name: ")?;
        let last_name = self.ask("Enter the customer's last name: ")?;
        let phone_no = self.ask("Enter the customer's phone number: ")?;

        let ledger = self.ledger;
        Ok(async {
            let customer = ledger
                .add_customer(&first_name, &last_name, &phone_no)
                .await?;
            Ok::<_, AppError>(format!(
                "Customer '{}' added successfully with ID {}.",
                customer.full_name(),
                customer.id
            ))
        }
        .await)
    }

    async fn get_all_customers(&self) -> Result<String, AppError> {
        let customers = self.ledger.get_all_customers().await?;
        if customers.is_empty() {
            return Ok("No customers found.".to_string());
        }

        let mut listing = String::new();
        for customer in &customers {
            let _ = writeln!(listing, "ID: {}, {}", customer.id, customer);
        }
        Ok(listing.trim_end().to_string())
    }

    async fn find_customer_by_id(&mut self) -> io::Result<Result<String, AppError>> {
        let id = self.ask("Enter the customer's ID: ")?;

        let ledger = self.ledger;
        Ok(async {
            let customer = ledger.find_customer_by_id(parse_id(&id)?).await?;
            Ok::<_, AppError>(customer_details(&customer))
        }
        .await)
    }

    async fn find_customer_by_name(&mut self) -> io::Result<Result<String, AppError>> {
        let first_name = self.ask("Enter the customer's first name: ")?;
        let last_name = self.ask("Enter the customer's last name: ")?;

        let ledger = self.ledger;
        Ok(async {
            let customer = ledger.find_customer_by_name(&first_name, &last_name).await?;
            Ok::<_, AppError>(customer_details(&customer))
        }
        .await)
    }

    async fn update_customer(&mut self) -> io::Result<Result<String, AppError>> {
        let id = self.ask("Enter the customer's ID: ")?;
        let first_name = self.ask("Enter the new first name (blank to keep): ")?;
        let last_name = self.ask("Enter the new last name (blank to keep): ")?;
        let phone_no = self.ask("Enter the new phone number (blank to keep): ")?;

        let ledger = self.ledger;
        Ok(async {
            let id = parse_id(&id)?;
            let changes = CustomerChanges {
                first_name: non_blank(&first_name),
                last_name: non_blank(&last_name),
                phone_no: non_blank(&phone_no),
            };
            let customer = ledger.update_customer(id, changes).await?;
            Ok::<_, AppError>(format!("Customer with ID '{}' updated successfully.", customer.id))
        }
        .await)
    }

    async fn delete_customer(&mut self) -> io::Result<Result<String, AppError>> {
        let id = self.ask("Enter the customer's ID: ")?;

        let ledger = self.ledger;
        Ok(async {
            let deleted = ledger.delete_customer(parse_id(&id)?).await?;
            let mut message = format!(
                "Customer '{}' with ID '{}' deleted successfully.",
                deleted.label, deleted.id
            );
            if deleted.rentals_removed > 0 {
                let _ = write!(message, " Removed {} rental(s).", deleted.rentals_removed);
            }
            Ok::<_, AppError>(message)
        }
        .await)
    }

    // ========================
    // Rentals
    // ========================

    async fn register_customer_to_car(&mut self) -> io::Result<Result<String, AppError>> {
        let customer_id = self.ask("Enter the customer's ID: ")?;
        let car_id = self.ask("Enter the car's ID: ")?;
        let start_date = self.ask("Enter the start date DD/MM/YYYY (optional): ")?;
        let end_date = self.ask("Enter the end date DD/MM/YYYY (optional): ")?;

        let ledger = self.ledger;
        Ok(async {
            let customer_id = parse_id(&customer_id)?;
            let car_id = parse_id(&car_id)?;
            let assignment = ledger
                .register_customer_to_car(customer_id, car_id, &start_date, &end_date)
                .await?;
            Ok::<_, AppError>(assignment.summary())
        }
        .await)
    }

    async fn get_all_rentals(&self) -> Result<String, AppError> {
        let rentals = self.ledger.get_all_rentals().await?;
        if rentals.is_empty() {
            return Ok("No rentals found.".to_string());
        }

        let mut listing = String::new();
        for rental in &rentals {
            let _ = writeln!(
                listing,
                "ID: {}, Customer ID: {}, Car ID: {}, Start: {}, End: {}",
                rental.id,
                rental.customer_id,
                rental.car_id,
                format_rental_date(rental.start_date),
                format_rental_date(rental.end_date)
            );
        }
        Ok(listing.trim_end().to_string())
    }

    async fn get_customers_for_car(&mut self) -> io::Result<Result<String, AppError>> {
        let car_id = self.ask("Enter the car's ID: ")?;

        let ledger = self.ledger;
        Ok(async {
            let customers = ledger.get_customers_for_car(parse_id(&car_id)?).await?;
            if customers.is_empty() {
                return Ok("No customers are renting this car.".to_string());
            }

            let mut listing = String::new();
            for customer in &customers {
                let _ = writeln!(listing, "ID: {}, {}", customer.id, customer);
            }
            Ok::<_, AppError>(listing.trim_end().to_string())
        }
        .await)
    }
}

fn customer_details(customer: &Customer) -> String {
    format!(
        "Customer ID: {}\nFirst Name: {}\nLast Name: {}\nPhone Number: {}",
        customer.id, customer.first_name, customer.last_name, customer.phone_no
    )
}
