//! Opening text inputs that may be bzip2-compressed.

use std::io::{self, BufRead, BufReader};

use bzip2::read::MultiBzDecoder;
use camino::Utf8Path;

/// Whether `path` names a bzip2 archive.
pub(crate) fn is_bzip2(path: &Utf8Path) -> bool {
    path.extension() == Some("bz2")
}

/// Open `path` for buffered reading, decompressing `.bz2` files on the fly.
pub(crate) fn open_text(path: &Utf8Path) -> io::Result<Box<dyn BufRead + Send>> {
    let file = catfix_fs::open_utf8_file(path)?;
    if is_bzip2(path) {
        Ok(Box::new(BufReader::new(MultiBzDecoder::new(BufReader::new(
            file,
        )))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
