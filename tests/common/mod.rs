// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use car_rental::application::{LedgerConfig, RentalLedger};
use car_rental::domain::{Car, Customer};
use tempfile::TempDir;

/// Helper to create a test ledger with a temporary database
pub async fn test_ledger() -> Result<(RentalLedger, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let ledger = RentalLedger::open(db_path).await?;
    Ok((ledger, temp_dir))
}

/// Helper to create a ledger on a private in-memory database
pub async fn memory_ledger() -> Result<RentalLedger> {
    Ok(RentalLedger::open_with(LedgerConfig::in_memory()).await?)
}

/// Test fixture: a small fleet and a couple of customers
pub struct Showroom {
    pub corolla: Car,
    pub civic: Car,
    pub ada: Customer,
    pub alan: Customer,
}

impl Showroom {
    pub async fn create(ledger: &RentalLedger) -> Result<Self> {
        let corolla = ledger.add_car("Toyota", "Corolla", 2020).await?;
        let civic = ledger.add_car("Honda", "Civic", 2019).await?;
        let ada = ledger.add_customer("Ada", "Lovelace", "0712345678").await?;
        let alan = ledger.add_customer("Alan", "Turing", "0798765432").await?;
        Ok(Self {
            corolla,
            civic,
            ada,
            alan,
        })
    }
}
