//! Pipeline orchestration.
//!
//! [`Pipeline`] is the only component that touches the blob store and the
//! activity log. It composes the stages for each operation:
//!
//! ```text
//! upload:   validate name → check format → put raw → log
//! clean:    get raw → decode → normalize → canonical CSV → put cleaned → log → preview(10)
//! view:     get cleaned → decode canonical CSV → preview(20)
//! ```
//!
//! Nothing is cached between operations: `view` always re-reads the
//! persisted bytes. A failing `clean` never reaches the write, so the
//! previous cleaned artifact stays in place.
//!
//! One `Pipeline` is built per process and handed to the CLI or the HTTP
//! server; it holds no mutable state of its own.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

use crate::activity::ActivityLog;
use crate::config::{Config, PreviewConfig};
use crate::decode::{self, Decoder, TableFormat};
use crate::error::{PipelineError, Result};
use crate::models::{
    Cell, CleanReport, Listing, Namespace, Preview, Table, UploadReceipt,
};
use crate::normalize::normalize;
use crate::project::project;
use crate::store::{BlobStore, FsBlobStore};

pub struct Pipeline {
    store: Arc<dyn BlobStore>,
    log: ActivityLog,
    decoder: Decoder,
    limits: PreviewConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn BlobStore>,
        log: ActivityLog,
        decoder: Decoder,
        limits: PreviewConfig,
    ) -> Self {
        Self {
            store,
            log,
            decoder,
            limits,
        }
    }

    /// Filesystem-backed pipeline laid out as `config.storage` describes.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(FsBlobStore::from_config(config)),
            ActivityLog::new(config.storage.log_file()),
            Decoder::from_config(&config.decode),
            config.preview.clone(),
        )
    }

    /// Stores an uploaded file under the raw namespace.
    ///
    /// The name and extension are checked before anything is written.
    pub fn upload(&self, filename: &str, bytes: &[u8]) -> Result<UploadReceipt> {
        validate_filename(filename)?;
        if TableFormat::from_filename(filename).is_none() {
            return Err(decode::unsupported(filename));
        }

        let location = self.store.put(Namespace::Raw, filename, bytes)?;
        info!(filename, bytes = bytes.len(), "uploaded");
        self.record(&format!("Uploaded file: {}", filename));

        Ok(UploadReceipt {
            filename: filename.to_string(),
            location,
        })
    }

    /// Decodes, normalizes and persists a raw artifact as canonical CSV.
    pub fn clean(&self, filename: &str) -> Result<CleanReport> {
        validate_filename(filename)?;
        let bytes = self
            .store
            .get(Namespace::Raw, filename)?
            .ok_or_else(|| PipelineError::not_found(Namespace::Raw, filename))?;

        let table = self.decoder.decode(&bytes, filename)?;
        let cleaned = normalize(table);
        let encoded = write_canonical(&cleaned)?;

        let location = self.store.put(Namespace::Cleaned, filename, &encoded)?;
        info!(
            filename,
            rows = cleaned.row_count(),
            columns = cleaned.columns().len(),
            "cleaned"
        );
        self.record(&format!("Cleaned file: {}", filename));

        Ok(CleanReport {
            filename: filename.to_string(),
            cleaned_location: location,
            rows: cleaned.row_count(),
            sha256: hex::encode(Sha256::digest(&encoded)),
            preview: project(&cleaned, self.limits.clean_rows),
        })
    }

    /// Previews a cleaned artifact, re-decoded from its stored bytes.
    pub fn view(&self, filename: &str) -> Result<Preview> {
        let bytes = self.download(filename)?;
        let table = self.decoder.decode_canonical(&bytes, filename)?;
        Ok(project(&table, self.limits.view_rows))
    }

    /// Bytes of a cleaned artifact.
    pub fn download(&self, filename: &str) -> Result<Vec<u8>> {
        validate_filename(filename)?;
        self.store
            .get(Namespace::Cleaned, filename)?
            .ok_or_else(|| PipelineError::not_found(Namespace::Cleaned, filename))
    }

    pub fn list(&self) -> Result<Listing> {
        Ok(Listing {
            raw: self.store.list(Namespace::Raw)?,
            cleaned: self.store.list(Namespace::Cleaned)?,
        })
    }

    /// Most recent activity lines, oldest first. Defaults to
    /// `preview.log_lines`.
    pub fn logs(&self, limit: Option<usize>) -> Result<Vec<String>> {
        Ok(self.log.tail(limit.unwrap_or(self.limits.log_lines))?)
    }

    /// Activity log writes are best-effort; a failure is reported through
    /// tracing and never fails the operation.
    fn record(&self, message: &str) {
        if let Err(e) = self.log.append(message) {
            warn!(
                path = %self.log.path().display(),
                error = %e,
                "failed to append activity log"
            );
        }
    }
}

/// Rejects names that are not a single flat path component.
pub fn validate_filename(filename: &str) -> Result<()> {
    let invalid = filename.is_empty()
        || filename.starts_with('.')
        || filename.contains(['/', '\\', '\0']);
    if invalid {
        return Err(PipelineError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

/// Serializes a table as canonical CSV: comma-delimited, `\n`-terminated,
/// quoted only where needed, header first.
pub fn write_canonical(table: &Table) -> std::result::Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(Cell::render))?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tests::minimal_xlsx;
    use crate::store::MemoryBlobStore;
    use tempfile::TempDir;

    const SALES_CSV: &[u8] = b"Region, Total Sales\nEast,100\n,\n West ,50\n";

    fn pipeline(tmp: &TempDir) -> (Pipeline, Arc<MemoryBlobStore>) {
        let store = Arc::new(MemoryBlobStore::new());
        let pipeline = Pipeline::new(
            store.clone(),
            ActivityLog::new(tmp.path().join("activity.log")),
            Decoder::default(),
            PreviewConfig::default(),
        );
        (pipeline, store)
    }

    fn cleaned_text(store: &MemoryBlobStore, name: &str) -> String {
        let bytes = store.get(Namespace::Cleaned, name).unwrap().unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn sales_scenario() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, store) = pipeline(&tmp);

        pipeline.upload("sales.csv", SALES_CSV).unwrap();
        let report = pipeline.clean("sales.csv").unwrap();

        assert_eq!(
            cleaned_text(&store, "sales.csv"),
            "region,total_sales\nEast,100\nWest,50\n"
        );
        assert_eq!(report.rows, 2);
        assert_eq!(report.cleaned_location, "memory://cleaned/sales.csv");
        assert_eq!(report.preview.columns, vec!["region", "total_sales"]);
        assert_eq!(report.preview.rows[1].get("region"), Some("West"));
        assert_eq!(report.preview.rows[1].get("total_sales"), Some("50"));
    }

    #[test]
    fn clean_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, store) = pipeline(&tmp);
        pipeline.upload("sales.csv", SALES_CSV).unwrap();

        let first = pipeline.clean("sales.csv").unwrap();
        let first_bytes = store.get(Namespace::Cleaned, "sales.csv").unwrap();
        let second = pipeline.clean("sales.csv").unwrap();
        let second_bytes = store.get(Namespace::Cleaned, "sales.csv").unwrap();

        assert_eq!(first.sha256, second.sha256);
        assert_eq!(first_bytes, second_bytes);
        assert_eq!(store.list(Namespace::Cleaned).unwrap().len(), 1);
    }

    #[test]
    fn view_total_matches_cleaned_rows_beyond_the_cap() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&tmp);

        let mut csv = String::from("id,Name\n");
        for i in 0..35 {
            csv.push_str(&format!("{},n{}\n", i, i));
        }
        csv.push_str(",\n");
        pipeline.upload("ids.csv", csv.as_bytes()).unwrap();

        let report = pipeline.clean("ids.csv").unwrap();
        assert_eq!(report.rows, 35);
        assert_eq!(report.preview.rows.len(), 10);
        assert_eq!(report.preview.total_rows, 35);

        let view = pipeline.view("ids.csv").unwrap();
        assert_eq!(view.rows.len(), 20);
        assert_eq!(view.total_rows, 35);
        assert_eq!(view.columns, vec!["id", "name"]);
    }

    #[test]
    fn missing_values_render_null_everywhere() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, store) = pipeline(&tmp);
        pipeline
            .upload("gaps.csv", b"a,b,c\n1,,inf\n,x,NaN\n2,-Infinity,y\n")
            .unwrap();

        let report = pipeline.clean("gaps.csv").unwrap();
        let cleaned = cleaned_text(&store, "gaps.csv");
        assert_eq!(cleaned, "a,b,c\n1,NULL,NULL\nNULL,x,NULL\n2,NULL,y\n");
        assert!(!cleaned.to_lowercase().contains("inf"));
        let clean_values: Vec<&str> = report.preview.rows[0].values().collect();
        assert_eq!(clean_values, vec!["1", "NULL", "NULL"]);

        let view = pipeline.view("gaps.csv").unwrap();
        for row in &view.rows {
            assert!(row.values().all(|v| v != "inf" && v != "NaN" && !v.is_empty()));
        }
        assert_eq!(view.rows[1].get("b"), Some("x"));
    }

    #[test]
    fn view_matches_clean_preview() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, store) = pipeline(&tmp);
        pipeline
            .upload("blanks.csv", b"a,b\n   ,x\n NA ,y\n None ,\n")
            .unwrap();

        let report = pipeline.clean("blanks.csv").unwrap();
        assert_eq!(
            cleaned_text(&store, "blanks.csv"),
            "a,b\n,x\nNA,y\nNone,NULL\n"
        );

        let view = pipeline.view("blanks.csv").unwrap();
        assert_eq!(view.total_rows, report.rows);
        assert_eq!(view.columns, report.preview.columns);
        assert_eq!(view.rows, report.preview.rows);
        assert_eq!(view.rows[0].get("a"), Some(""));
    }

    #[test]
    fn view_before_clean_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&tmp);
        pipeline.upload("missing.csv", SALES_CSV).unwrap();

        let err = pipeline.view("missing.csv").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NotFound {
                namespace: Namespace::Cleaned,
                ..
            }
        ));
    }

    #[test]
    fn clean_without_upload_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&tmp);
        let err = pipeline.clean("ghost.csv").unwrap_err();
        assert_eq!(err.code(), "not_found");
        assert!(err.to_string().contains("raw"));
    }

    #[test]
    fn txt_upload_is_rejected_before_storage() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, store) = pipeline(&tmp);

        let err = pipeline.upload("notes.txt", b"a,b\n").unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
        assert!(store.list(Namespace::Raw).unwrap().is_empty());
        assert!(pipeline.logs(None).unwrap().is_empty());
    }

    #[test]
    fn path_like_names_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&tmp);
        for name in ["", "../up.csv", "a/b.csv", "a\\b.csv", ".hidden.csv"] {
            let err = pipeline.upload(name, b"a\n1\n").unwrap_err();
            assert!(
                matches!(err, PipelineError::InvalidFilename(_)),
                "{:?} accepted",
                name
            );
        }
        assert!(matches!(
            pipeline.view("../secret.csv").unwrap_err(),
            PipelineError::InvalidFilename(_)
        ));
    }

    #[test]
    fn failed_clean_keeps_previous_artifact() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, store) = pipeline(&tmp);
        pipeline.upload("sales.csv", SALES_CSV).unwrap();
        pipeline.clean("sales.csv").unwrap();
        let before = cleaned_text(&store, "sales.csv");

        pipeline.upload("sales.csv", b"a,b\n1,2,3\n").unwrap();
        let err = pipeline.clean("sales.csv").unwrap_err();
        assert_eq!(err.code(), "decode_error");
        assert_eq!(cleaned_text(&store, "sales.csv"), before);
    }

    #[test]
    fn spreadsheet_cleans_to_canonical_csv() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, store) = pipeline(&tmp);
        let xlsx = minimal_xlsx(&[
            &[Some("Region"), Some("Total Sales")],
            &[Some("East"), Some("100")],
            &[None, None],
            &[Some("West"), None],
        ]);

        pipeline.upload("sales.xlsx", &xlsx).unwrap();
        let report = pipeline.clean("sales.xlsx").unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(
            cleaned_text(&store, "sales.xlsx"),
            "region,total_sales\nEast,100\nWest,NULL\n"
        );

        let view = pipeline.view("sales.xlsx").unwrap();
        assert_eq!(view.total_rows, 2);
        assert_eq!(view.rows[1].get("total_sales"), Some("NULL"));
    }

    #[test]
    fn activity_is_logged() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&tmp);
        pipeline.upload("sales.csv", SALES_CSV).unwrap();
        pipeline.clean("sales.csv").unwrap();

        let logs = pipeline.logs(None).unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs[0].ends_with(" - Uploaded file: sales.csv"));
        assert!(logs[1].ends_with(" - Cleaned file: sales.csv"));
        assert_eq!(pipeline.logs(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn list_reports_both_namespaces() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&tmp);
        assert_eq!(pipeline.list().unwrap(), Listing::default());

        pipeline.upload("b.csv", SALES_CSV).unwrap();
        pipeline.upload("a.csv", SALES_CSV).unwrap();
        pipeline.clean("b.csv").unwrap();

        let listing = pipeline.list().unwrap();
        assert_eq!(listing.raw, vec!["a.csv", "b.csv"]);
        assert_eq!(listing.cleaned, vec!["b.csv"]);
    }

    #[test]
    fn canonical_csv_quotes_only_when_needed() {
        let table = Table::from_rows(
            vec!["name".into(), "note".into()],
            vec![vec![Cell::from("Smith, J"), Cell::from("say \"hi\"")]],
        )
        .unwrap();
        let bytes = write_canonical(&table).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "name,note\n\"Smith, J\",\"say \"\"hi\"\"\"\n"
        );
    }
}
