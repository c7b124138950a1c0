//! Upload orchestration integration tests.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use objectstack_client::{BucketApi, ClientConfig, ClientError, ObjectApi};
    use objectstack_model::{ErrorCode, Operation};

    use crate::{FailingReader, MIB, create_test_bucket, injected_error, patterned, test_client};

    fn five_mib_parts() -> ClientConfig {
        ClientConfig::builder().part_size(5 * MIB).build()
    }

    #[tokio::test]
    async fn test_should_split_twelve_mib_into_three_parts() {
        let (client, transport) = test_client(five_mib_parts());
        let bucket = create_test_bucket(&transport, "mpu").await;
        let data = patterned(12 * MIB);

        let etag = client
            .create_object(&bucket, "big.bin", 12 * MIB, &mut &data[..])
            .await
            .expect("create_object");

        let parts = transport.calls_of(Operation::UploadPart);
        let numbers: Vec<Option<u32>> = parts.iter().map(|c| c.part_number).collect();
        let lengths: Vec<Option<u64>> = parts.iter().map(|c| c.length).collect();
        assert_eq!(numbers, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(lengths, vec![Some(5 * MIB), Some(5 * MIB), Some(2 * MIB)]);

        let completes = transport.calls_of(Operation::CompleteMultipartUpload);
        assert_eq!(completes.len(), 1);
        assert_eq!(completes[0].parts, vec![1, 2, 3]);
        assert_eq!(transport.count(Operation::PutObject), 0);
        assert!(etag.ends_with("-3\""));

        let (stored, meta) = client.get_object(&bucket, "big.bin", 0, 0).await.unwrap();
        assert_eq!(meta.size, 12 * MIB);
        assert!(stored == data);
    }

    #[tokio::test]
    async fn test_should_abort_once_when_second_part_fails() {
        let (client, transport) = test_client(five_mib_parts());
        let bucket = create_test_bucket(&transport, "mpu-fail").await;
        transport.fail_part(2);
        let data = patterned(12 * MIB);

        let err = client
            .create_object(&bucket, "big.bin", 12 * MIB, &mut &data[..])
            .await
            .unwrap_err();

        match &err {
            ClientError::IncompleteUpload {
                bucket: b,
                object,
                source,
                ..
            } => {
                assert_eq!(b, &bucket);
                assert_eq!(object, "big.bin");
                assert_eq!(source.message, injected_error(Operation::UploadPart).message);
            }
            other => panic!("unexpected error: {other}"),
        }
        let session: Vec<Operation> = transport
            .session_calls()
            .into_iter()
            .map(|c| c.operation)
            .collect();
        assert_eq!(
            session,
            vec![
                Operation::InitiateMultipartUpload,
                Operation::UploadPart,
                Operation::UploadPart,
                Operation::AbortMultipartUpload,
            ]
        );
        assert_eq!(transport.backend().pending_uploads(), 0);
        assert_eq!(transport.backend().object_count(&bucket), 0);
    }

    #[tokio::test]
    async fn test_should_put_below_threshold_without_session() {
        let (client, transport) = test_client(five_mib_parts());
        let bucket = create_test_bucket(&transport, "single").await;
        let data = patterned(MIB);

        client
            .create_object(&bucket, "small.bin", MIB, &mut &data[..])
            .await
            .expect("create_object");

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, Operation::PutObject);
        assert_eq!(calls[0].length, Some(MIB));
        assert!(transport.session_calls().is_empty());
    }

    #[tokio::test]
    async fn test_should_store_empty_object() {
        let (client, transport) = test_client(ClientConfig::default());
        let bucket = create_test_bucket(&transport, "empty").await;

        let etag = client
            .create_object(&bucket, "empty", 0, &mut &b""[..])
            .await
            .expect("create_object");

        assert_eq!(etag, "\"d41d8cd98f00b204e9800998ecf8427e\"");
        let meta = client.stat_object(&bucket, "empty").await.unwrap();
        assert_eq!(meta.size, 0);
    }

    #[tokio::test]
    async fn test_should_abort_when_source_breaks_after_session_opens() {
        let config = ClientConfig::builder().part_size(1024).build();
        let (client, transport) = test_client(config);
        let bucket = create_test_bucket(&transport, "broken").await;

        let err = client
            .create_object(&bucket, "partial", 4096, &mut FailingReader::after(1500))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::ChunkRead(_)));
        assert_eq!(transport.count(Operation::UploadPart), 1);
        assert_eq!(transport.count(Operation::AbortMultipartUpload), 1);
        assert_eq!(transport.backend().pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_should_abort_when_completion_fails() {
        let config = ClientConfig::builder().part_size(1024).build();
        let (client, transport) = test_client(config);
        let bucket = create_test_bucket(&transport, "complete-fail").await;
        transport.fail_always(Operation::CompleteMultipartUpload);
        let data = patterned(3000);

        let err = client
            .create_object(&bucket, "obj", 3000, &mut &data[..])
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::IncompleteUpload { .. }));
        assert_eq!(
            err.transport_error().map(|e| e.code),
            Some(ErrorCode::ServiceUnavailable)
        );
        assert_eq!(transport.count(Operation::AbortMultipartUpload), 1);
        assert_eq!(transport.backend().pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_should_report_part_error_even_if_abort_fails() {
        let config = ClientConfig::builder().part_size(1024).build();
        let (client, transport) = test_client(config);
        let bucket = create_test_bucket(&transport, "abort-fail").await;
        transport.fail_part(1);
        transport.fail_always(Operation::AbortMultipartUpload);
        let data = patterned(2048);

        let err = client
            .create_object(&bucket, "obj", 2048, &mut &data[..])
            .await
            .unwrap_err();

        assert_eq!(
            err.transport_error().map(|e| e.message.clone()),
            Some(injected_error(Operation::UploadPart).message)
        );
        assert_eq!(transport.count(Operation::AbortMultipartUpload), 1);
    }

    #[tokio::test]
    async fn test_should_not_abort_when_initiate_fails() {
        let (client, transport) = test_client(five_mib_parts());
        let bucket = create_test_bucket(&transport, "init-fail").await;
        transport.fail_always(Operation::InitiateMultipartUpload);
        let data = patterned(6 * MIB);

        let err = client
            .create_object(&bucket, "obj", 6 * MIB, &mut &data[..])
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(transport.count(Operation::UploadPart), 0);
        assert_eq!(transport.count(Operation::AbortMultipartUpload), 0);
    }

    #[tokio::test]
    async fn test_should_sort_parts_uploaded_in_parallel() {
        let config = ClientConfig::builder()
            .part_size(1024)
            .upload_concurrency(3)
            .build();
        let (client, transport) = test_client(config);
        let bucket = create_test_bucket(&transport, "parallel").await;
        transport.delay_part(1, Duration::from_millis(40));
        transport.delay_part(2, Duration::from_millis(20));
        let data = patterned(5000);

        client
            .create_object(&bucket, "wide.bin", 5000, &mut &data[..])
            .await
            .expect("create_object");

        let arrival: Vec<Option<u32>> = transport
            .calls_of(Operation::UploadPart)
            .iter()
            .map(|c| c.part_number)
            .collect();
        assert_ne!(arrival.first(), Some(&Some(1)));

        let completes = transport.calls_of(Operation::CompleteMultipartUpload);
        assert_eq!(completes[0].parts, vec![1, 2, 3, 4, 5]);

        let (stored, _) = client.get_object(&bucket, "wide.bin", 0, 0).await.unwrap();
        assert!(stored == data);
    }

    #[tokio::test]
    async fn test_should_be_listable_after_upload() {
        let config = ClientConfig::builder().part_size(1024).build();
        let (client, transport) = test_client(config);
        let bucket = create_test_bucket(&transport, "visible").await;
        let data = patterned(2500);

        client
            .create_object(&bucket, "assembled", 2500, &mut &data[..])
            .await
            .unwrap();

        let mut stream = client.list_objects(&bucket, "", true);
        let item = stream.recv().await.unwrap().unwrap();
        assert_eq!(item.key, "assembled");
        assert_eq!(item.size, 2500);
        assert!(stream.recv().await.is_none());
    }
}
