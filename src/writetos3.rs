use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::dataset::Dataset;
use crate::output::to_csv;

/// Key the export of `dataset` is stored under: `{dataset}/{file_name}`.
pub fn export_key(dataset: &str, file_name: &str) -> String {
    format!("{dataset}/{file_name}")
}

/// Serializes the filtered table as CSV and uploads it uncompressed with
/// `text/csv` content type.
#[tracing::instrument(skip(client, table), fields(rows = table.len()))]
pub async fn write_csv_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    table: &Dataset,
) -> anyhow::Result<()> {
    let body = Bytes::from(to_csv(table)?);
    let size = body.len();

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body))
        .content_type("text/csv")
        .send()
        .await?;

    info!(bucket, key, bytes = size, "Export uploaded to S3");
    Ok(())
}
