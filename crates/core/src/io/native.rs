//! Native GeoTIFF reading/writing through the `tiff` crate.
//!
//! Supports the subset of GeoTIFF the landslide workflow needs: float grids,
//! pixel-scale/tiepoint georeferencing, the GDAL no-data tag, and multi-page
//! files where each page is one soil layer.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

// The decoder resolves known codes to named variants, so lookups through
// `Tag::Unknown(code)` never match.
const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Written to the GDAL_NODATA tag when set. Float rasters default to NaN
    /// when the raster itself carries no no-data value.
    pub nodata: Option<f64>,
}

/// Read one page of a GeoTIFF file into a Raster.
///
/// `band` is the zero-based page index; `None` reads the first page.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufReader::new(File::open(path.as_ref())?);
    let mut decoder = open_decoder(file)?;
    let band = band.unwrap_or(0);

    for skipped in 0..band {
        if !decoder.more_images() {
            return Err(Error::InvalidParameter {
                name: "band",
                value: band.to_string(),
                reason: format!("file has only {} page(s)", skipped + 1),
            });
        }
        decoder
            .next_image()
            .map_err(|e| Error::Other(format!("Cannot advance to page {}: {}", skipped + 1, e)))?;
    }

    decode_page(&mut decoder)
}

/// Read every page of a GeoTIFF file, one raster per page, in file order.
pub fn read_geotiff_layers<T, P>(path: P) -> Result<Vec<Raster<T>>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufReader::new(File::open(path.as_ref())?);
    let mut decoder = open_decoder(file)?;

    let mut layers = vec![decode_page(&mut decoder)?];
    while decoder.more_images() {
        decoder
            .next_image()
            .map_err(|e| Error::Other(format!("Cannot advance to page {}: {}", layers.len(), e)))?;
        layers.push(decode_page(&mut decoder)?);
    }

    Ok(layers)
}

fn open_decoder<R: Read + Seek>(reader: R) -> Result<Decoder<R>> {
    Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))
}

fn decode_page<T, R>(decoder: &mut Decoder<R>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
    let rows = height as usize;
    let cols = width as usize;

    let image = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match image {
        DecodingResult::F32(buf) => cast_all(&buf),
        DecodingResult::F64(buf) => cast_all(&buf),
        DecodingResult::U8(buf) => cast_all(&buf),
        DecodingResult::U16(buf) => cast_all(&buf),
        DecodingResult::U32(buf) => cast_all(&buf),
        DecodingResult::I8(buf) => cast_all(&buf),
        DecodingResult::I16(buf) => cast_all(&buf),
        DecodingResult::I32(buf) => cast_all(&buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    // Multi-sample pages decode to rows * cols * samples values
    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(decoder) {
        raster.set_transform(transform);
    }
    raster.set_nodata(read_nodata(decoder));

    Ok(raster)
}

fn cast_all<S, T>(buf: &[S]) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

/// GeoTransform from ModelPixelScaleTag + ModelTiepointTag, if both are present
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_nodata<T, R>(decoder: &mut Decoder<R>) -> Option<T>
where
    T: RasterElement,
    R: Read + Seek,
{
    let text = decoder.get_tag_ascii_string(GDAL_NODATA).ok()?;
    let value: f64 = text.trim_matches(char::from(0)).trim().parse().ok()?;
    num_traits::cast(value)
}

/// Write a Raster to a single-page GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    write_geotiff_layers(std::slice::from_ref(raster), path, options)
}

/// Write rasters as consecutive pages of one GeoTIFF file
pub fn write_geotiff_layers<T, P>(
    layers: &[Raster<T>],
    path: P,
    options: Option<GeoTiffOptions>,
) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    if layers.is_empty() {
        return Err(Error::InvalidParameter {
            name: "layers",
            value: "0".into(),
            reason: "at least one layer is required".into(),
        });
    }

    let options = options.unwrap_or_default();
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    {
        let mut encoder = TiffEncoder::new(&mut writer)
            .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;
        for raster in layers {
            encode_page(&mut encoder, raster, &options)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn encode_page<T, W>(
    encoder: &mut TiffEncoder<W>,
    raster: &Raster<T>,
    options: &GeoTiffOptions,
) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let (rows, cols) = raster.shape();
    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    // Version 1.1.0 with two keys: GTModelTypeGeoKey = projected,
    // GTRasterTypeGeoKey = pixel-is-area
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];

    let tag_err = |e: tiff::TiffError| Error::Other(format!("Cannot write GeoTIFF tag: {}", e));
    image.encoder().write_tag(MODEL_PIXEL_SCALE, &scale[..]).map_err(tag_err)?;
    image.encoder().write_tag(MODEL_TIEPOINT, &tiepoint[..]).map_err(tag_err)?;
    image.encoder().write_tag(GEO_KEY_DIRECTORY, &geokeys[..]).map_err(tag_err)?;

    let nodata = options
        .nodata
        .or_else(|| raster.nodata().and_then(|v| v.to_f64()))
        .or(T::default_nodata().to_f64().filter(|v| v.is_nan()));
    if let Some(nd) = nodata {
        let text = if nd.is_nan() { "nan".to_string() } else { nd.to_string() };
        image.encoder().write_tag(GDAL_NODATA, text.as_str()).map_err(tag_err)?;
    }

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(rows: usize, cols: usize, offset: f64) -> Raster<f64> {
        let data = (0..rows * cols).map(|i| i as f64 * 0.25 + offset).collect();
        let mut r = Raster::from_vec(data, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(500.0, 1000.0, 30.0, -30.0));
        r
    }

    #[test]
    fn test_roundtrip_values_and_transform() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let src = sample(4, 6, 0.0);
        write_geotiff(&src, tmp.path(), None).unwrap();

        let back: Raster<f64> = read_geotiff(tmp.path(), None).unwrap();
        assert_eq!(back.shape(), (4, 6));
        assert_relative_eq!(back.get(3, 5).unwrap(), src.get(3, 5).unwrap(), epsilon = 1e-6);
        assert_relative_eq!(back.transform().origin_x, 500.0);
        assert_relative_eq!(back.transform().origin_y, 1000.0);
        assert_relative_eq!(back.transform().pixel_height, -30.0);
    }

    #[test]
    fn test_roundtrip_nodata() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut src = sample(2, 2, 1.0);
        src.set(0, 1, -9999.0).unwrap();
        src.set_nodata(Some(-9999.0));
        write_geotiff(&src, tmp.path(), None).unwrap();

        let back: Raster<f64> = read_geotiff(tmp.path(), None).unwrap();
        assert_eq!(back.nodata(), Some(-9999.0));
        assert!(back.is_nodata(back.get(0, 1).unwrap()));
    }

    #[test]
    fn test_multi_page_layers() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let layers = vec![sample(3, 3, 0.0), sample(3, 3, 10.0), sample(3, 3, 20.0)];
        write_geotiff_layers(&layers, tmp.path(), None).unwrap();

        let back: Vec<Raster<f64>> = read_geotiff_layers(tmp.path()).unwrap();
        assert_eq!(back.len(), 3);
        assert_relative_eq!(back[2].get(0, 0).unwrap(), 20.0, epsilon = 1e-6);

        let second: Raster<f64> = read_geotiff(tmp.path(), Some(1)).unwrap();
        assert_relative_eq!(second.get(0, 0).unwrap(), 10.0, epsilon = 1e-6);

        let missing = read_geotiff::<f64, _>(tmp.path(), Some(3));
        assert!(missing.is_err());
    }

    #[test]
    fn test_georeferencing_tags_are_found_by_code() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut src = sample(2, 3, 0.0);
        src.set_nodata(Some(-9999.0));
        write_geotiff(&src, tmp.path(), None).unwrap();

        let mut decoder = Decoder::new(BufReader::new(File::open(tmp.path()).unwrap())).unwrap();
        assert_eq!(Tag::from_u16_exhaustive(33550), MODEL_PIXEL_SCALE);
        assert_eq!(Tag::from_u16_exhaustive(42113), GDAL_NODATA);
        let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).unwrap();
        assert_eq!(&scale[..2], &[30.0, 30.0]);
        assert_eq!(decoder.get_tag_ascii_string(GDAL_NODATA).unwrap().trim_matches(char::from(0)), "-9999");
    }

    #[test]
    fn test_nodata_cells_stay_missing_after_reload() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut src = sample(2, 2, 1.0);
        src.set(1, 1, -9999.0).unwrap();
        src.set_nodata(Some(-9999.0));
        write_geotiff(&src, tmp.path(), None).unwrap();

        let back: Raster<f64> = read_geotiff(tmp.path(), None).unwrap();
        let stats = back.statistics();
        assert_eq!(stats.nodata_count, 1);
        assert_eq!(*back.transform(), *src.transform());
    }

    #[test]
    fn test_write_rejects_empty_stack() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let none: Vec<Raster<f64>> = Vec::new();
        assert!(write_geotiff_layers(&none, tmp.path(), None).is_err());
    }
}
