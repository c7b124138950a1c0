//! Streamed listing integration tests.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use objectstack_client::{BucketApi, ClientConfig, ClientError, ObjectStream};
    use objectstack_model::{BucketAcl, ErrorCode, Operation};

    use crate::{create_test_bucket, populate_bucket, test_client};

    const KEYS: [&str; 7] = [
        "documents/readme.txt",
        "documents/report.pdf",
        "photos/2024/feb/img3.jpg",
        "photos/2024/jan/img1.jpg",
        "photos/2024/jan/img2.jpg",
        "photos/2025/mar/img4.jpg",
        "root.txt",
    ];

    async fn keys_until_end(mut stream: ObjectStream) -> (Vec<String>, Option<ClientError>) {
        let mut keys = Vec::new();
        while let Some(item) = stream.recv().await {
            match item {
                Ok(meta) => keys.push(meta.key),
                Err(err) => {
                    assert!(stream.recv().await.is_none(), "error must be the last item");
                    return (keys, Some(err));
                }
            }
        }
        (keys, None)
    }

    #[tokio::test]
    async fn test_should_list_flat_page_of_three() {
        let (client, transport) = test_client(ClientConfig::default());
        let bucket = create_test_bucket(&transport, "flat3").await;
        populate_bucket(&transport, &bucket, &["a", "b", "c"]).await;

        let (keys, err) = keys_until_end(client.list_objects(&bucket, "", false)).await;

        assert!(err.is_none());
        assert_eq!(keys, vec!["a", "b", "c"]);
        let lists = transport.calls_of(Operation::ListObjects);
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].marker.as_deref(), Some(""));
        assert_eq!(lists[0].delimiter.as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn test_should_list_one_level_when_not_recursive() {
        let (client, transport) = test_client(ClientConfig::default());
        let bucket = create_test_bucket(&transport, "level").await;
        populate_bucket(&transport, &bucket, &KEYS).await;

        let (keys, _) = keys_until_end(client.list_objects(&bucket, "", false)).await;
        assert_eq!(keys, vec!["root.txt"]);

        let (keys, _) = keys_until_end(client.list_objects(&bucket, "documents/", false)).await;
        assert_eq!(keys, vec!["documents/readme.txt", "documents/report.pdf"]);
    }

    #[tokio::test]
    async fn test_should_fetch_once_in_flat_mode_even_if_truncated() {
        let config = ClientConfig::builder().list_max_keys(2).build();
        let (client, transport) = test_client(config);
        let bucket = create_test_bucket(&transport, "flat-trunc").await;
        populate_bucket(&transport, &bucket, &["a", "b", "c", "d"]).await;

        let (keys, _) = keys_until_end(client.list_objects(&bucket, "", false)).await;

        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(transport.count(Operation::ListObjects), 1);
    }

    #[tokio::test]
    async fn test_should_walk_every_page_when_recursive() {
        let config = ClientConfig::builder().list_max_keys(3).build();
        let (client, transport) = test_client(config);
        let bucket = create_test_bucket(&transport, "recursive").await;
        populate_bucket(&transport, &bucket, &KEYS).await;

        let (keys, err) = keys_until_end(client.list_objects(&bucket, "", true)).await;

        assert!(err.is_none());
        assert_eq!(keys, KEYS.to_vec());

        let markers: Vec<Option<String>> = transport
            .calls_of(Operation::ListObjects)
            .into_iter()
            .map(|c| c.marker)
            .collect();
        assert_eq!(
            markers,
            vec![
                Some(String::new()),
                Some("photos/2024/feb/img3.jpg".to_owned()),
                Some("photos/2025/mar/img4.jpg".to_owned()),
            ]
        );
        assert!(
            transport
                .calls_of(Operation::ListObjects)
                .iter()
                .all(|c| c.delimiter.as_deref() == Some(""))
        );
    }

    #[tokio::test]
    async fn test_should_restrict_recursive_listing_to_prefix() {
        let config = ClientConfig::builder().list_max_keys(1).build();
        let (client, transport) = test_client(config);
        let bucket = create_test_bucket(&transport, "prefix").await;
        populate_bucket(&transport, &bucket, &KEYS).await;

        let (keys, _) = keys_until_end(client.list_objects(&bucket, "photos/2024/", true)).await;

        assert_eq!(
            keys,
            vec![
                "photos/2024/feb/img3.jpg",
                "photos/2024/jan/img1.jpg",
                "photos/2024/jan/img2.jpg",
            ]
        );
        assert_eq!(transport.count(Operation::ListObjects), 3);
    }

    #[tokio::test]
    async fn test_should_deliver_earlier_pages_before_fetch_error() {
        let config = ClientConfig::builder().list_max_keys(2).build();
        let (client, transport) = test_client(config);
        let bucket = create_test_bucket(&transport, "fail-k").await;
        populate_bucket(&transport, &bucket, &KEYS).await;
        transport.fail_call(Operation::ListObjects, 3);

        let (keys, err) = keys_until_end(client.list_objects(&bucket, "", true)).await;

        assert_eq!(keys, KEYS[..4].to_vec());
        let err = err.expect("listing error");
        assert_eq!(
            err.transport_error().map(|e| e.code),
            Some(ErrorCode::ServiceUnavailable)
        );
        assert_eq!(transport.count(Operation::ListObjects), 3);
    }

    #[tokio::test]
    async fn test_should_report_missing_bucket_as_single_error() {
        let (client, _transport) = test_client(ClientConfig::default());

        let items: Vec<_> = client.list_objects("absent", "", true).collect().await;

        assert_eq!(items.len(), 1);
        let err = items.into_iter().next().and_then(Result::err);
        assert_eq!(
            err.and_then(|e| e.transport_error().map(|t| t.code)),
            Some(ErrorCode::NoSuchBucket)
        );
    }

    #[tokio::test]
    async fn test_should_not_hang_when_consumer_stops_early() {
        let config = ClientConfig::builder().list_max_keys(1).build();
        let (client, transport) = test_client(config);
        let bucket = create_test_bucket(&transport, "early-drop").await;
        populate_bucket(&transport, &bucket, &KEYS).await;

        let mut stream = client.list_objects(&bucket, "", true);
        let first = stream.recv().await.unwrap().unwrap();
        assert_eq!(first.key, KEYS[0]);
        drop(stream);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(transport.count(Operation::ListObjects) < KEYS.len());

        transport.clear_calls();
        let listed = tokio::time::timeout(
            Duration::from_secs(5),
            client.list_objects(&bucket, "", true).collect::<Vec<_>>(),
        )
        .await
        .expect("second listing finished");
        assert_eq!(listed.len(), KEYS.len());
    }

    #[tokio::test]
    async fn test_should_list_buckets_in_one_request() {
        let (client, transport) = test_client(ClientConfig::default());
        for name in ["bravo", "alpha", "charlie"] {
            client.create_bucket(name, BucketAcl::Private).await.unwrap();
        }

        let names: Vec<String> = client
            .list_buckets()
            .map(|b| b.expect("bucket").name)
            .collect()
            .await;

        assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
        assert_eq!(transport.count(Operation::ListBuckets), 1);
    }

    #[tokio::test]
    async fn test_should_surface_bucket_listing_error() {
        let (client, transport) = test_client(ClientConfig::default());
        transport.fail_always(Operation::ListBuckets);

        let mut stream = client.list_buckets();
        assert!(matches!(
            stream.recv().await,
            Some(Err(ClientError::Transport(_)))
        ));
        assert!(stream.recv().await.is_none());
    }
}
