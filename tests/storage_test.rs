use anyhow::Result;
use car_rental::domain::{NewCar, NewCustomer, NewRental};
use car_rental::storage::{is_unique_violation, Repository};

async fn seeded_repo() -> Result<(Repository, i64, i64)> {
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
    tx.commit().await?;
    Ok((repo, customer.id, car.id))
}

#[tokio::test]
async fn test_second_rental_for_same_pair_is_unique_violation() -> Result<()> {
    let (repo, customer_id, car_id) = seeded_repo().await?;
    let rental = NewRental::new(customer_id, car_id);

    let mut tx = repo.begin().await?;
    Repository::insert_rental(&mut *tx, &rental).await?;
    let err = Repository::insert_rental(&mut *tx, &rental)
        .await
        .unwrap_err();
    assert!(is_unique_violation(&err));
    tx.rollback().await?;

    assert!(repo.list_rentals().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_car_is_not_a_unique_violation() -> Result<()> {
    let (repo, customer_id, _) = seeded_repo().await?;

    let mut tx = repo.begin().await?;
    let err = Repository::insert_rental(&mut *tx, &NewRental::new(customer_id, 999))
        .await
        .unwrap_err();
    assert!(!is_unique_violation(&err));
    tx.rollback().await?;

    Ok(())
}

#[tokio::test]
async fn test_customers_for_car_follow_rental_order() -> Result<()> {
    let (repo, ada_id, car_id) = seeded_repo().await?;

    let mut tx = repo.begin().await?;
    let alan = Repository::insert_customer(
        &mut *tx,
        &NewCustomer {
            first_name: "Alan".to_string(),
            last_name: "Turing".to_string(),
            phone_no: "0798765432".to_string(),
        },
    )
    .await?;
    Repository::insert_rental(&mut *tx, &NewRental::new(alan.id, car_id)).await?;
    Repository::insert_rental(&mut *tx, &NewRental::new(ada_id, car_id)).await?;
    tx.commit().await?;

    let renters = repo.list_customers_for_car(car_id).await?;
    let ids: Vec<i64> = renters.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![alan.id, ada_id]);
    Ok(())
}
