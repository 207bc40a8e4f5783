//! Atomic persistence of stage outputs.

use crate::Result;
use dodiff_raster::{write_geotiff, RasterGrid};
use std::path::Path;

/// Write a grid to its final path through a temporary sibling.
///
/// A failed write must not leave a partially-encoded file under the final
/// stage name, so the encode happens into `<name>.partial` and the file is
/// renamed only once fully written.
pub fn persist_grid(grid: &RasterGrid, path: &Path) -> Result<()> {
    let tmp = match path.file_name() {
        Some(name) => {
            let mut tmp_name = name.to_os_string();
            tmp_name.push(".partial");
            path.with_file_name(tmp_name)
        }
        None => path.with_extension("partial"),
    };

    if let Err(e) = write_geotiff(grid, &tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}
