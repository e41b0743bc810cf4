//! On-disk snapshot storage: a (schema, documents) pair per hibernated
//! collection, stored under `<dir>/<collection>/`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use frostgate_core::{CoreError, CoreResult};
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const SCHEMA_FILE: &str = "schema.json";
const DOCUMENTS_FILE: &str = "documents.jsonl";

/// A fully materialized snapshot. Only exists when both artifacts were
/// readable; a partial snapshot is surfaced as [`CoreError::SnapshotIncomplete`].
#[derive(Debug)]
pub struct Snapshot {
    pub schema: Vec<u8>,
    pub documents: Vec<u8>,
}

/// Filesystem snapshot writer/reader.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the artifacts of one collection.
    pub fn collection_dir(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub async fn save_schema(&self, name: &str, schema: &[u8]) -> CoreResult<()> {
        let dir = self.collection_dir(name);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(SCHEMA_FILE), schema).await?;
        Ok(())
    }

    pub async fn save_documents(
        &self,
        name: &str,
        mut documents: BoxStream<'_, CoreResult<Bytes>>,
    ) -> CoreResult<()> {
        let dir = self.collection_dir(name);
        fs::create_dir_all(&dir).await?;
        let mut file = fs::File::create(dir.join(DOCUMENTS_FILE)).await?;
        while let Some(chunk) = documents.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }

    /// Loads both artifacts; a missing file means "reload not possible".
    pub async fn load(&self, name: &str) -> CoreResult<Snapshot> {
        let dir = self.collection_dir(name);
        let schema = read_artifact(&dir.join(SCHEMA_FILE), name, SCHEMA_FILE).await?;
        let documents = read_artifact(&dir.join(DOCUMENTS_FILE), name, DOCUMENTS_FILE).await?;
        Ok(Snapshot { schema, documents })
    }
}

async fn read_artifact(
    path: &Path,
    collection: &str,
    artifact: &'static str,
) -> CoreResult<Vec<u8>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(CoreError::SnapshotIncomplete {
            collection: collection.to_string(),
            artifact,
        }),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn doc_stream(chunks: Vec<&'static [u8]>) -> BoxStream<'static, CoreResult<Bytes>> {
        stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(Bytes::from_static(c)))
                .collect::<Vec<_>>(),
        )
        .boxed()
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store
            .save_schema("movies", br#"{"name":"movies"}"#)
            .await
            .unwrap();
        store
            .save_documents("movies", doc_stream(vec![b"{\"id\":\"1\"}\n", b"{\"id\":\"2\"}\n"]))
            .await
            .unwrap();

        let snapshot = store.load("movies").await.unwrap();
        assert_eq!(snapshot.schema, br#"{"name":"movies"}"#);
        assert_eq!(snapshot.documents, b"{\"id\":\"1\"}\n{\"id\":\"2\"}\n");
    }

    #[tokio::test]
    async fn test_partial_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store
            .save_schema("movies", br#"{"name":"movies"}"#)
            .await
            .unwrap();

        let err = store.load("movies").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::SnapshotIncomplete {
                artifact: "documents.jsonl",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load("ghost").await.is_err());
    }
}
