mod common;

use anyhow::Result;
use car_rental::application::AppError;
use car_rental::RentalLedger;
use chrono::NaiveDate;
use common::{test_ledger, Showroom};

#[tokio::test]
async fn test_register_customer_to_car() -> Result<()> {
    let (ledger, _temp) = test_ledger().await?;
    let showroom = Showroom::create(&ledger).await?;

    let assignment = ledger
        .register_customer_to_car(showroom.ada.id, showroom.corolla.id, "", "")
        .await?;

    assert_eq!(assignment.customer, showroom.ada);
    assert_eq!(assignment.car, showroom.corolla);
    assert_eq!(assignment.rental.start_date, None);
    assert_eq!(assignment.rental.end_date, None);
    assert_eq!(
        assignment.summary(),
        format!(
            "Customer 'Ada Lovelace' (ID: {}) successfully added to car 'Toyota Corolla' (ID: {})",
            showroom.ada.id, showroom.corolla.id
        )
    );

    let rentals = ledger.get_all_rentals().await?;
    assert_eq!(rentals, vec![assignment.rental]);

    Ok(())
}

#[tokio::test]
async fn test_customer_holds_at_most_one_rental() -> Result<()> {
    let (ledger, _temp) = test_ledger().await?;
    let showroom = Showroom::create(&ledger).await?;

    ledger
        .register_customer_to_car(showroom.ada.id, showroom.corolla.id, "", "")
        .await?;

    // Same car again
    let err = ledger
        .register_customer_to_car(showroom.ada.id, showroom.corolla.id, "", "")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyRegistered(id) if id == showroom.ada.id));

    // A different car is refused too
    let err = ledger
        .register_customer_to_car(showroom.ada.id, showroom.civic.id, "", "")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyRegistered(_)));

    let rentals = ledger.get_all_rentals().await?;
    assert_eq!(rentals.len(), 1);
    assert_eq!(rentals[0].customer_id, showroom.ada.id);

    Ok(())
}

#[tokio::test]
async fn test_two_customers_may_rent_the_same_car() -> Result<()> {
    let (ledger, _temp) = test_ledger().await?;
    let showroom = Showroom::create(&ledger).await?;

    ledger
        .register_customer_to_car(showroom.ada.id, showroom.corolla.id, "", "")
        .await?;
    ledger
        .register_customer_to_car(showroom.alan.id, showroom.corolla.id, "", "")
        .await?;

    assert_eq!(ledger.get_all_rentals().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_rental_dates_are_parsed_day_first() -> Result<()> {
    let (ledger, temp) = test_ledger().await?;
    let showroom = Showroom::create(&ledger).await?;

    ledger
        .register_customer_to_car(
            showroom.ada.id,
            showroom.corolla.id,
            "01/01/2024",
            "31/12/2024",
        )
        .await?;
    ledger.close().await;

    // Read back from disk rather than from the returned value
    let reopened = RentalLedger::open(temp.path().join("test.db")).await?;
    let rental = reopened
        .find_rental_for_customer(showroom.ada.id)
        .await?
        .expect("rental should be stored");

    assert_eq!(rental.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    assert_eq!(rental.end_date, NaiveDate::from_ymd_opt(2024, 12, 31));

    Ok(())
}

#[tokio::test]
async fn test_malformed_date_writes_nothing() -> Result<()> {
    let (ledger, _temp) = test_ledger().await?;
    let showroom = Showroom::create(&ledger).await?;

    let err = ledger
        .register_customer_to_car(showroom.ada.id, showroom.corolla.id, "not-a-date", "")
        .await
        .unwrap_err();
    match err {
        AppError::InvalidDate(input) => assert_eq!(input, "not-a-date"),
        other => panic!("expected InvalidDate, got {other:?}"),
    }

    let err = ledger
        .register_customer_to_car(showroom.ada.id, showroom.corolla.id, "01/01/2024", "2024-12-31")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidDate(_)));

    assert!(ledger.get_all_rentals().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_customer_or_car_writes_nothing() -> Result<()> {
    let (ledger, _temp) = test_ledger().await?;
    let showroom = Showroom::create(&ledger).await?;

    let err = ledger
        .register_customer_to_car(999, showroom.corolla.id, "", "")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CustomerNotFound(999)));

    let err = ledger
        .register_customer_to_car(showroom.ada.id, 999, "", "")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CarNotFound(999)));

    assert!(ledger.get_all_rentals().await?.is_empty());
    assert_eq!(ledger.find_rental_for_customer(showroom.ada.id).await?, None);
    Ok(())
}

#[tokio::test]
async fn test_deleting_car_removes_its_rentals() -> Result<()> {
    let (ledger, _temp) = test_ledger().await?;
    let showroom = Showroom::create(&ledger).await?;

    ledger
        .register_customer_to_car(showroom.ada.id, showroom.corolla.id, "", "")
        .await?;
    ledger
        .register_customer_to_car(showroom.alan.id, showroom.corolla.id, "", "")
        .await?;

    let deleted = ledger.delete_car(showroom.corolla.id).await?;
    assert_eq!(deleted.rentals_removed, 2);
    assert!(ledger.get_all_rentals().await?.is_empty());

    // Ada is free to rent again
    ledger
        .register_customer_to_car(showroom.ada.id, showroom.civic.id, "", "")
        .await?;
    assert_eq!(ledger.get_all_rentals().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_deleting_customer_removes_their_rental() -> Result<()> {
    let (ledger, _temp) = test_ledger().await?;
    let showroom = Showroom::create(&ledger).await?;

    ledger
        .register_customer_to_car(showroom.ada.id, showroom.corolla.id, "", "")
        .await?;
    ledger
        .register_customer_to_car(showroom.alan.id, showroom.civic.id, "", "")
        .await?;

    let deleted = ledger.delete_customer(showroom.ada.id).await?;
    assert_eq!(deleted.rentals_removed, 1);

    let rentals = ledger.get_all_rentals().await?;
    assert_eq!(rentals.len(), 1);
    assert_eq!(rentals[0].customer_id, showroom.alan.id);

    // The car itself is untouched
    assert_eq!(ledger.find_car_by_id(showroom.corolla.id).await?, showroom.corolla);
    Ok(())
}

#[tokio::test]
async fn test_customers_renting_a_car() -> Result<()> {
    let (ledger, _temp) = test_ledger().await?;
    let showroom = Showroom::create(&ledger).await?;

    ledger
        .register_customer_to_car(showroom.alan.id, showroom.corolla.id, "", "")
        .await?;
    ledger
        .register_customer_to_car(showroom.ada.id, showroom.corolla.id, "", "")
        .await?;

    let renters = ledger.get_customers_for_car(showroom.corolla.id).await?;
    assert_eq!(renters, vec![showroom.alan.clone(), showroom.ada.clone()]);

    assert!(ledger.get_customers_for_car(showroom.civic.id).await?.is_empty());

    let result = ledger.get_customers_for_car(999).await;
    assert!(matches!(result, Err(AppError::CarNotFound(999))));
    Ok(())
}
