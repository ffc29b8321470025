use super::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_worker_pool_never_exceeds_configured_size() {
    let (downloader, engine, _temp_dir) = create_test_downloader_with_workers(2).await;
    engine.set_delay(Duration::from_millis(80));

    let session = downloader
        .submit_batch("a\nb\nc\nd\ne\nf", BatchOptions::default())
        .await
        .unwrap();
    let final_session = wait_for_batch(&downloader, session.id).await;

    assert_eq!(final_session.stats.completed, 6);
    assert!(
        engine.max_concurrency() <= 2,
        "pool of 2 ran {} fetches at once",
        engine.max_concurrency()
    );
    assert!(
        engine.max_concurrency() >= 2,
        "six delayed items should saturate the pool"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_worker_serializes_fetches() {
    let (downloader, engine, _temp_dir) = create_test_downloader_with_workers(1).await;
    engine.set_delay(Duration::from_millis(30));

    let session = downloader
        .submit_batch("first\nsecond\nthird", BatchOptions::default())
        .await
        .unwrap();
    wait_for_batch(&downloader, session.id).await;

    assert_eq!(engine.max_concurrency(), 1);
    // With one worker the fetch order is the submission order
    assert_eq!(
        engine.fetched_inputs(),
        vec![
            "first".to_string(),
            "second".to_string(),
            "third".to_string()
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_pool_is_shared_across_concurrent_batches() {
    let (downloader, engine, _temp_dir) = create_test_downloader_with_workers(2).await;
    engine.set_delay(Duration::from_millis(60));

    let first = downloader
        .submit_batch("a1\na2\na3", BatchOptions::default())
        .await
        .unwrap();
    let second = downloader
        .submit_batch("b1\nb2\nb3", BatchOptions::default())
        .await
        .unwrap();

    let first_final = wait_for_batch(&downloader, first.id).await;
    let second_final = wait_for_batch(&downloader, second.id).await;

    assert_eq!(first_final.stats.completed, 3);
    assert_eq!(second_final.stats.completed, 3);
    assert!(
        engine.max_concurrency() <= 2,
        "the bound applies across batches, saw {}",
        engine.max_concurrency()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_items_are_dispatched_in_submission_order() {
    // Even with a wider pool, dispatch (permit acquisition and engine
    // hand-off) happens strictly in position order
    let (downloader, engine, _temp_dir) = create_test_downloader_with_workers(4).await;
    let mut events = downloader.subscribe();

    let session = downloader
        .submit_batch("one\ntwo\nthree\nfour\nfive", BatchOptions::default())
        .await
        .unwrap();
    let seen = collect_batch_events(&mut events, session.id).await;

    let dispatch_positions: Vec<usize> = seen
        .iter()
        .filter_map(|event| match event {
            Event::ItemDispatched { position, .. } => Some(*position),
            _ => None,
        })
        .collect();

    assert_eq!(
        dispatch_positions,
        vec![0, 1, 2, 3, 4],
        "dispatch order must follow positions"
    );
    assert_eq!(engine.fetched_inputs().len(), 5);
}
