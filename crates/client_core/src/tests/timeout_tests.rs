use super::*;

#[tokio::test(start_paused = true)]
async fn fast_operation_wins() {
    let race = with_timeout(
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            7
        },
        Duration::from_secs(1),
    )
    .await
    .expect("race");

    match race {
        Race::Settled(value) => assert_eq!(value, 7),
        Race::TimedOut(_) => panic!("operation should have settled first"),
    }
}

#[tokio::test(start_paused = true)]
async fn deadline_wins_and_operation_keeps_running() {
    let started = tokio::time::Instant::now();
    let race = with_timeout(
        async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        },
        Duration::from_secs(1),
    )
    .await
    .expect("race");

    let late = match race {
        Race::TimedOut(late) => late,
        Race::Settled(_) => panic!("deadline should have fired first"),
    };
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(late.deadline(), Duration::from_secs(1));
    assert!(!late.is_settled());

    assert_eq!(late.settled().await.expect("late value"), "late");
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn pending_forever_times_out() {
    let race = with_timeout(std::future::pending::<()>(), Duration::from_millis(10_000))
        .await
        .expect("race");
    assert!(matches!(race, Race::TimedOut(_)));
}

#[tokio::test]
async fn panicking_operation_is_reported_as_aborted() {
    let result = with_timeout(
        async {
            panic!("host exploded");
        },
        Duration::from_secs(1),
    )
    .await;

    let err = match result {
        Err(err) => err,
        Ok(_) => panic!("panicking task must not settle"),
    };
    assert!(matches!(err, RaceError::Aborted(_)));
}
