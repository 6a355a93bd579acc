use std::io::Write;
use std::ops::RangeInclusive;
use std::path::Path;

use lopdf::Document;
use tempfile::NamedTempFile;

use crate::PdfEngineError;

/// Writes the zero-based inclusive `pages` of `source` to `output`.
///
/// The copy is serialized in memory, written to a fresh temporary file in
/// the destination directory and persisted over `output`. The temporary file
/// is deleted on every failure path.
pub(crate) fn export_pages(
    source: &Document,
    page_count: u32,
    pages: RangeInclusive<u32>,
    output: &Path,
) -> Result<(), PdfEngineError> {
    let (first, last) = (*pages.start(), *pages.end());
    if first > last || last >= page_count {
        return Err(PdfEngineError::InvalidRange { first, last, page_count });
    }

    let mut doc = source.clone();
    // lopdf numbers pages from 1.
    let dropped: Vec<u32> =
        (1..=page_count).filter(|number| !pages.contains(&(number - 1))).collect();
    if !dropped.is_empty() {
        doc.delete_pages(&dropped);
        doc.prune_objects();
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;

    let dir = output.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&bytes)?;
    temp.flush()?;
    temp.persist(output).map_err(|err| err.error)?;

    log::info!(
        "exported pages {}-{} ({} of {page_count}) to {}",
        first + 1,
        last + 1,
        last - first + 1,
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{build_pdf, PageSpec};

    fn five_pages() -> Document {
        let pages: Vec<PageSpec> = (1..=5)
            .map(|n| PageSpec::with_lines(300.0 + n as f32, 400.0, &[&format!("page {n}")]))
            .collect();
        Document::load_mem(&build_pdf(&pages, &[])).expect("fixture should parse")
    }

    #[test]
    fn exports_inclusive_range_in_order() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let output = temp.path().join("out.pdf");

        export_pages(&five_pages(), 5, 1..=3, &output).expect("export should succeed");

        let exported = Document::load(&output).expect("export should parse");
        let widths: Vec<f32> = exported
            .get_pages()
            .into_values()
            .map(|id| {
                let page = exported.get_dictionary(id).expect("page dictionary");
                let media =
                    page.get(b"MediaBox").and_then(|obj| obj.as_array()).expect("media box");
                crate::text::number(&media[2]).expect("numeric width")
            })
            .collect();
        assert_eq!(widths, vec![302.0, 303.0, 304.0]);
        assert!(!output.with_extension("pdf.tmp").exists());
    }

    #[test]
    fn neighbouring_files_survive_export() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let output = temp.path().join("out.pdf");
        let neighbour = temp.path().join("out.pdf.tmp");
        std::fs::write(&neighbour, "user data").expect("neighbour should be written");

        export_pages(&five_pages(), 5, 0..=0, &output).expect("export should succeed");

        assert_eq!(std::fs::read_to_string(&neighbour).expect("neighbour kept"), "user data");
        let mut names: Vec<String> = std::fs::read_dir(temp.path())
            .expect("dir should list")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["out.pdf", "out.pdf.tmp"]);
    }

    #[test]
    fn reversed_or_out_of_bounds_range_writes_nothing() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let output = temp.path().join("out.pdf");
        let doc = five_pages();

        #[allow(clippy::reversed_empty_ranges)]
        let reversed = export_pages(&doc, 5, 3..=1, &output);
        assert!(matches!(reversed, Err(PdfEngineError::InvalidRange { first: 3, last: 1, .. })));

        let beyond = export_pages(&doc, 5, 0..=5, &output);
        assert!(matches!(beyond, Err(PdfEngineError::InvalidRange { page_count: 5, .. })));

        assert!(!output.exists());
    }

    #[test]
    fn unwritable_destination_reports_io_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let output = temp.path().join("missing").join("out.pdf");

        let err = export_pages(&five_pages(), 5, 0..=0, &output).expect_err("should fail");
        assert!(matches!(err, PdfEngineError::Io(_)));
    }
}
