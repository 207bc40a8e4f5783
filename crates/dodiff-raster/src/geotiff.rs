//! GeoTIFF reading and writing.
//!
//! Georeferencing is carried in the standard GeoTIFF tags: ModelPixelScale +
//! ModelTiepoint for north-up rasters, ModelTransformation as a fallback, the
//! GeoKey directory for the EPSG code, and GDAL_NODATA for the mask sentinel.
//! Outputs are written with the same tags so every pipeline stage can reopen
//! the previous stage's file.

use crate::{GeoTransform, RasterError, RasterGrid, Result, SpatialRef};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::debug;

const GEOKEY_MODEL_TYPE: u16 = 1024;
const GEOKEY_GEOGRAPHIC_TYPE: u16 = 2048;
const GEOKEY_PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;

/// Read a single-band GeoTIFF into memory.
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<RasterGrid> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut decoder = Decoder::new(file)?;

    // Allow full-size survey DEMs; the defaults reject anything large.
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024;
    limits.intermediate_buffer_size = 1024 * 1024 * 1024;
    limits.ifd_value_size = 1024 * 1024 * 1024;
    decoder = decoder.with_limits(limits);

    let (width, height) = decoder.dimensions()?;
    let transform = read_geotransform(&mut decoder, path)?;
    let srs = read_spatial_ref(&mut decoder);
    let nodata = read_nodata(&mut decoder);
    let data = decode_samples(&mut decoder)?;
    debug!(
        path = %path.display(),
        width,
        height,
        %srs,
        nodata,
        "decoded GeoTIFF"
    );

    RasterGrid::new(
        width as usize,
        height as usize,
        transform,
        srs,
        nodata,
        data,
    )
}

/// Write a grid as a single-band float32 GeoTIFF.
///
/// Fails without touching the destination when the grid carries a rotated
/// geotransform, which the tiepoint/scale tag pair cannot represent.
pub fn write_geotiff<P: AsRef<Path>>(grid: &RasterGrid, path: P) -> Result<()> {
    let path = path.as_ref();
    let transform = grid.transform();
    if !transform.is_north_up() {
        return Err(RasterError::RotatedTransform {
            path: path.to_path_buf(),
            rot_x: transform.rot_x,
            rot_y: transform.rot_y,
        });
    }

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut image =
        encoder.new_image::<colortype::Gray32Float>(grid.width() as u32, grid.height() as u32)?;

    let scale = [
        transform.pixel_width,
        transform.pixel_height.abs(),
        0.0f64,
    ];
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;

    if let Some(keys) = geokey_directory(grid.srs()) {
        image
            .encoder()
            .write_tag(Tag::GeoKeyDirectoryTag, &keys[..])?;
    }

    if let Some(nodata) = grid.nodata() {
        let text = format!("{nodata}");
        image.encoder().write_tag(Tag::GdalNodata, text.as_str())?;
    }

    image.write_data(grid.data())?;
    Ok(())
}

/// Read the geotransform from the tiepoint/scale pair or the model matrix.
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
) -> Result<GeoTransform> {
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag);
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag);

    if let (Ok(tiepoint), Ok(scale)) = (tiepoint, scale) {
        if tiepoint.len() >= 6 && scale.len() >= 2 {
            // Tiepoint maps pixel (i, j) to ground (x, y); in practice the
            // anchor is always the top-left corner.
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            return Ok(GeoTransform::north_up(
                origin_x, origin_y, scale[0], scale[1],
            ));
        }
    }

    if let Ok(matrix) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if matrix.len() >= 8 {
            let gt = GeoTransform::from_gdal([
                matrix[3], matrix[0], matrix[1], matrix[7], matrix[4], matrix[5],
            ]);
            if !gt.is_north_up() {
                return Err(RasterError::RotatedTransform {
                    path: path.to_path_buf(),
                    rot_x: gt.rot_x,
                    rot_y: gt.rot_y,
                });
            }
            return Ok(gt);
        }
    }

    Err(RasterError::MissingGeoreference(path.to_path_buf()))
}

/// Pull the model type and EPSG code out of the GeoKey directory, if present.
fn read_spatial_ref<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> SpatialRef {
    let Ok(keys) = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag) else {
        return SpatialRef::Unspecified;
    };
    if keys.len() < 4 {
        return SpatialRef::Unspecified;
    }

    let mut model_type = None;
    let mut projected = None;
    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        // Only inline SHORT values matter here
        if location != 0 {
            continue;
        }
        match key_id {
            GEOKEY_MODEL_TYPE => model_type = Some(value),
            GEOKEY_PROJECTED_CS_TYPE => projected = Some(value),
            GEOKEY_GEOGRAPHIC_TYPE => geographic = Some(value),
            _ => {}
        }
    }

    let usable = |code: Option<u16>| code.filter(|c| *c != 0 && *c != u16::MAX);
    match model_type {
        Some(MODEL_TYPE_GEOGRAPHIC) => match usable(geographic) {
            Some(code) => SpatialRef::Geographic(code),
            None => SpatialRef::Unspecified,
        },
        // Projected, or an absent/unhandled model type with a projected code
        _ => match (usable(projected), usable(geographic)) {
            (Some(code), _) => SpatialRef::Projected(code),
            (None, Some(code)) => SpatialRef::Geographic(code),
            (None, None) => SpatialRef::Unspecified,
        },
    }
}

/// Parse the GDAL nodata tag, stored as an ASCII string.
fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse().ok())
}

/// Decode the sample buffer, widening whatever the file stores to f32.
fn decode_samples<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>> {
    let result = decoder.read_image()?;
    let data = match result {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
    };
    Ok(data)
}

/// Minimal GeoKey directory declaring the grid's reference, if it has one.
///
/// The model type comes from the [`SpatialRef`] variant, which in turn came
/// from the input file's own GeoKey directory, so the declared kind survives
/// the round trip instead of being guessed from the code.
fn geokey_directory(srs: SpatialRef) -> Option<[u16; 12]> {
    let (model_type, cs_key, code) = match srs {
        SpatialRef::Projected(code) => (MODEL_TYPE_PROJECTED, GEOKEY_PROJECTED_CS_TYPE, code),
        SpatialRef::Geographic(code) => (MODEL_TYPE_GEOGRAPHIC, GEOKEY_GEOGRAPHIC_TYPE, code),
        SpatialRef::Unspecified => return None,
    };
    Some([
        1, 1, 0, 2, // version, revision, minor, key count
        GEOKEY_MODEL_TYPE, 0, 1, model_type,
        cs_key, 0, 1, code,
    ])
}
