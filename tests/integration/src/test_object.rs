//! Object integration tests.

#[cfg(test)]
mod tests {
    use objectstack_client::{ClientConfig, ObjectApi};
    use objectstack_model::ErrorCode;

    use crate::{MIB, create_test_bucket, patterned, test_client};

    #[tokio::test]
    async fn test_should_put_and_get_object() {
        let (client, transport) = test_client(ClientConfig::default());
        let bucket = create_test_bucket(&transport, "put-get").await;

        let etag = client
            .create_object(&bucket, "hello.txt", 11, &mut &b"hello world"[..])
            .await
            .expect("create_object");

        let (data, meta) = client
            .get_object(&bucket, "hello.txt", 0, 0)
            .await
            .expect("get_object");
        assert_eq!(&data[..], b"hello world");
        assert_eq!(meta.etag, etag);
        assert_eq!(meta.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_should_get_object_range() {
        let (client, transport) = test_client(ClientConfig::default());
        let bucket = create_test_bucket(&transport, "range").await;
        let body = patterned(100);
        client
            .create_object(&bucket, "r.bin", 100, &mut &body[..])
            .await
            .unwrap();

        let (data, _) = client.get_object(&bucket, "r.bin", 10, 20).await.unwrap();
        assert_eq!(&data[..], &body[10..30]);

        let (tail, _) = client.get_object(&bucket, "r.bin", 90, 0).await.unwrap();
        assert_eq!(&tail[..], &body[90..]);

        let err = client
            .get_object(&bucket, "r.bin", 95, 10)
            .await
            .unwrap_err();
        assert_eq!(
            err.transport_error().map(|e| e.code),
            Some(ErrorCode::InvalidRange)
        );
    }

    #[tokio::test]
    async fn test_should_stat_object() {
        let (client, transport) = test_client(ClientConfig::default());
        let bucket = create_test_bucket(&transport, "stat").await;
        client
            .create_object(&bucket, "doc.txt", 4, &mut &b"data"[..])
            .await
            .unwrap();

        let meta = client.stat_object(&bucket, "doc.txt").await.unwrap();
        assert_eq!(meta.key, "doc.txt");
        assert_eq!(meta.size, 4);
    }

    #[tokio::test]
    async fn test_should_delete_object() {
        let (client, transport) = test_client(ClientConfig::default());
        let bucket = create_test_bucket(&transport, "delete").await;
        client
            .create_object(&bucket, "gone.txt", 1, &mut &b"x"[..])
            .await
            .unwrap();

        client.delete_object(&bucket, "gone.txt").await.unwrap();

        let err = client.stat_object(&bucket, "gone.txt").await.unwrap_err();
        assert_eq!(
            err.transport_error().map(|e| e.code),
            Some(ErrorCode::NoSuchKey)
        );
        assert_eq!(transport.backend().object_count(&bucket), 0);
    }

    #[tokio::test]
    async fn test_should_overwrite_object() {
        let (client, transport) = test_client(ClientConfig::default());
        let bucket = create_test_bucket(&transport, "overwrite").await;

        client
            .create_object(&bucket, "k", 3, &mut &b"one"[..])
            .await
            .unwrap();
        let etag = client
            .create_object(&bucket, "k", 3, &mut &b"two"[..])
            .await
            .unwrap();

        let (data, meta) = client.get_object(&bucket, "k", 0, 0).await.unwrap();
        assert_eq!(&data[..], b"two");
        assert_eq!(meta.etag, etag);
        assert_eq!(transport.backend().object_count(&bucket), 1);
    }

    #[tokio::test]
    async fn test_should_fail_get_of_missing_key() {
        let (client, transport) = test_client(ClientConfig::default());
        let bucket = create_test_bucket(&transport, "missing").await;

        let err = client.get_object(&bucket, "nope", 0, 0).await.unwrap_err();
        assert_eq!(
            err.transport_error().map(|e| e.code),
            Some(ErrorCode::NoSuchKey)
        );
    }

    #[tokio::test]
    async fn test_should_fail_upload_into_missing_bucket() {
        let (client, _transport) = test_client(ClientConfig::default());

        let err = client
            .create_object("no-bucket", "k", 1, &mut &b"x"[..])
            .await
            .unwrap_err();
        assert_eq!(
            err.transport_error().map(|e| e.code),
            Some(ErrorCode::NoSuchBucket)
        );
    }

    #[tokio::test]
    async fn test_should_stat_configured_content_type() {
        let config = ClientConfig::builder()
            .part_size(MIB)
            .content_type("image/png".to_owned())
            .build();
        let (client, transport) = test_client(config);
        let bucket = create_test_bucket(&transport, "content-type").await;
        let big = patterned(2 * MIB + 1);

        client
            .create_object(&bucket, "icon.png", 4, &mut &b"\x89PNG"[..])
            .await
            .unwrap();
        client
            .create_object(&bucket, "poster.png", 2 * MIB + 1, &mut &big[..])
            .await
            .unwrap();

        for key in ["icon.png", "poster.png"] {
            let meta = client.stat_object(&bucket, key).await.unwrap();
            assert_eq!(meta.content_type, "image/png");
        }
    }
}
