use tracing::info;

/// Key prefix under which datasets are published for the dashboard.
pub const DATASET_PREFIX: &str = "datasets";

/// Builds the object key for a dataset file name.
pub fn dataset_key(file_name: &str, gzip: bool) -> String {
    if gzip {
        format!("{DATASET_PREFIX}/{file_name}.gz")
    } else {
        format!("{DATASET_PREFIX}/{file_name}")
    }
}

/// Uploads an already-serialized JSON body with `application/json` content type.
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    body: Vec<u8>,
    gzip: bool,
) -> anyhow::Result<()> {
    let size = body.len();
    let mut request = client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(body.into())
        .content_type("application/json");
    if gzip {
        request = request.content_encoding("gzip");
    }
    request.send().await?;

    info!(bucket, key, bytes = size, "Dataset published to S3");
    Ok(())
}
