mod common;

use common::{customer, fixture, passenger, request};
use skyway_core::BookingError;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_within_capacity_all_succeed() {
    let fx = Arc::new(fixture(20, 0, false).await);

    let mut handles = Vec::new();
    for i in 0..15 {
        let fx = fx.clone();
        handles.push(tokio::spawn(async move {
            fx.engine
                .create_booking(
                    &customer(&format!("user-{}", i)),
                    request(&fx.flight, vec![passenger("ECONOMY", None, None)]),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let flight = fx.current_flight().await;
    assert_eq!(flight.available_seats, 5);
    assert_eq!(flight.available_economy_seats, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn oversubscribed_flight_never_oversells() {
    let fx = Arc::new(fixture(10, 0, false).await);

    let mut handles = Vec::new();
    for i in 0..25 {
        let fx = fx.clone();
        handles.push(tokio::spawn(async move {
            fx.engine
                .create_booking(
                    &customer(&format!("user-{}", i)),
                    request(&fx.flight, vec![passenger("ECONOMY", None, None)]),
                )
                .await
        }));
    }

    let mut confirmed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => confirmed += 1,
            Err(BookingError::CapacityExceeded { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(confirmed, 10);
    assert_eq!(rejected, 15);
    let flight = fx.current_flight().await;
    assert_eq!(flight.available_seats, 0);
    assert_eq!(flight.available_economy_seats, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn last_seat_goes_to_exactly_one_request() {
    let fx = Arc::new(fixture(1, 0, false).await);

    let a = {
        let fx = fx.clone();
        tokio::spawn(async move {
            fx.engine
                .create_booking(&customer("a"), request(&fx.flight, vec![passenger("ECONOMY", None, None)]))
                .await
        })
    };
    let b = {
        let fx = fx.clone();
        tokio::spawn(async move {
            fx.engine
                .create_booking(&customer("b"), request(&fx.flight, vec![passenger("ECONOMY", None, None)]))
                .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(BookingError::CapacityExceeded { .. }))));
    assert_eq!(fx.current_flight().await.available_seats, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancels_release_seats_once() {
    let fx = Arc::new(fixture(10, 0, false).await);
    let grant = customer("user-1");
    let view = fx
        .engine
        .create_booking(
            &grant,
            request(
                &fx.flight,
                vec![passenger("ECONOMY", None, None), passenger("ECONOMY", None, None)],
            ),
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let fx = fx.clone();
        let grant = grant.clone();
        let id = view.id;
        handles.push(tokio::spawn(async move { fx.engine.cancel_booking(id, &grant).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(BookingError::InvalidState(_)) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(fx.current_flight().await.available_seats, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn booking_and_cancelling_round_trip_restores_counts() {
    let fx = Arc::new(fixture(8, 4, false).await);

    let mut handles = Vec::new();
    for i in 0..6 {
        let fx = fx.clone();
        handles.push(tokio::spawn(async move {
            let grant = customer(&format!("user-{}", i));
            let class = if i % 2 == 0 { "ECONOMY" } else { "BUSINESS" };
            let view = fx
                .engine
                .create_booking(&grant, request(&fx.flight, vec![passenger(class, None, None)]))
                .await?;
            fx.engine.cancel_booking(view.id, &grant).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let flight = fx.current_flight().await;
    assert_eq!(flight.available_seats, 12);
    assert_eq!(flight.available_economy_seats, 8);
    assert_eq!(flight.available_business_seats, 4);
}
