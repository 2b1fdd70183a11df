//! Filesystem PDF cache keyed by DOI
//!
//! Documents are stored flat in a single directory, one file per key, with
//! `/` in the key mapped to `@` in the file name. Writes go through a
//! normalizing rewrite and a temp-file-then-rename step. The directory is the
//! only index: file access times drive LRU purging, so external tools see the
//! same state the cache does.

mod cache;
mod codec;
mod error;
mod locks;
mod normalize;
mod purge;
mod scan;
mod types;

pub use cache::PdfCache;
pub use codec::{sanitize, unsanitize};
pub use error::{CacheError, Result};
pub use normalize::normalize_pdf;
pub use types::{CacheConfig, CacheScan, CacheStats, RecencySource, ScannedEntry};

#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support {
    use crate::{CacheConfig, PdfCache};
    use lopdf::{dictionary, Document, Object, Stream};
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    /// One-page PDF whose cross-reference offsets and `startxref` are wrong.
    pub const DAMAGED_XREF_PDF_1: &[u8] = b"%PDF-1.4
1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj
2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj
3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 200 200] >> endobj
xref
0 4
0000000000 65535 f
0000000009 00000 n
0000000060 00000 n
0000000124 00000 n
trailer << /Size 4 /Root 1 0 R >>
startxref
197
%%EOF";

    /// Same damage as [`DAMAGED_XREF_PDF_1`], different page.
    pub const DAMAGED_XREF_PDF_2: &[u8] = b"%PDF-1.4
1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj
2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj
3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 300 300] /Resources <<>> >> endobj
xref
0 4
0000000000 65535 f
0000000009 00000 n
0000000060 00000 n
0000000124 00000 n
trailer << /Size 4 /Root 1 0 R >>
startxref
218
%%EOF";

    /// Build a one-page PDF whose content stream carries `text`.
    pub fn sample_pdf(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    pub async fn open_cache(dir: &Path) -> PdfCache {
        PdfCache::open(CacheConfig::new(dir.join("cache")))
            .await
            .unwrap()
    }

    pub fn accessed(path: &Path) -> SystemTime {
        std::fs::metadata(path).unwrap().accessed().unwrap()
    }

    /// Move a file's access time `age` into the past.
    pub fn set_access_age(path: &Path, age: Duration) {
        let when = SystemTime::now() - age;
        filetime::set_file_atime(path, filetime::FileTime::from_system_time(when)).unwrap();
    }
}
