//! Native GeoTIFF reading/writing (without GDAL dependency)
//!
//! Uses the `tiff` crate. Georeferencing is limited to the north-up
//! pixel-scale + tiepoint form and an EPSG code in the GeoKey directory,
//! which is what scene products in the archive carry.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement, RasterStack};
use ndarray::{Array2, ArrayView2};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32Float, Gray8};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::debug;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

fn geotiff_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Read one band of a GeoTIFF file into a Raster (band 0 when `band` is `None`)
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    read_geotiff_stack(path)?.band_raster(band.unwrap_or(0))
}

/// Read one band of an in-memory GeoTIFF
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    read_geotiff_stack_from_buffer(data)?.band_raster(band.unwrap_or(0))
}

/// Read every band of a GeoTIFF file.
///
/// Chunky multi-sample images are de-interleaved into one band per sample;
/// multi-page files contribute one band per page.
pub fn read_geotiff_stack<T, P>(path: P) -> Result<RasterStack<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let stack = decode_stack(file)?;
    debug!(
        path = %path.as_ref().display(),
        bands = stack.band_count(),
        rows = stack.shape().0,
        cols = stack.shape().1,
        "read GeoTIFF"
    );
    Ok(stack)
}

/// Read every band of an in-memory GeoTIFF
pub fn read_geotiff_stack_from_buffer<T>(data: &[u8]) -> Result<RasterStack<T>>
where
    T: RasterElement,
{
    decode_stack(Cursor::new(data))
}

fn cast_samples<T, S>(buf: Vec<S>) -> Vec<T>
where
    T: RasterElement,
    S: num_traits::NumCast + Copy,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or_else(T::fill_value))
        .collect()
}

fn decoded_to_elements<T: RasterElement>(result: DecodingResult) -> Result<Vec<T>> {
    let samples = match result {
        DecodingResult::U8(buf) => cast_samples(buf),
        DecodingResult::U16(buf) => cast_samples(buf),
        DecodingResult::U32(buf) => cast_samples(buf),
        DecodingResult::U64(buf) => cast_samples(buf),
        DecodingResult::I8(buf) => cast_samples(buf),
        DecodingResult::I16(buf) => cast_samples(buf),
        DecodingResult::I32(buf) => cast_samples(buf),
        DecodingResult::I64(buf) => cast_samples(buf),
        DecodingResult::F32(buf) => cast_samples(buf),
        DecodingResult::F64(buf) => cast_samples(buf),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };
    Ok(samples)
}

/// Internal: decode all pages of a GeoTIFF from any `Read + Seek` source
fn decode_stack<T, R>(reader: R) -> Result<RasterStack<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;
    let pixels = rows * cols;

    let transform = read_geotransform(&mut decoder).unwrap_or_default();
    let crs = read_epsg(&mut decoder).map(CRS::from_epsg);
    let nodata = read_nodata::<T, R>(&mut decoder);

    let mut bands = Vec::new();
    loop {
        let (w, h) = decoder.dimensions()?;
        if (w, h) != (width, height) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: h as usize,
                ac: w as usize,
            });
        }

        let samples: Vec<T> = decoded_to_elements(decoder.read_image()?)?;
        if pixels == 0 || samples.len() % pixels != 0 {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let per_pixel = samples.len() / pixels;
        for sample in 0..per_pixel {
            bands.push(Array2::from_shape_fn((rows, cols), |(r, c)| {
                samples[(r * cols + c) * per_pixel + sample]
            }));
        }

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    let mut stack = RasterStack::from_arrays(bands, transform, crs)?;
    stack.set_nodata(nodata);
    Ok(stack)
}

/// Attempt to read GeoTransform from ModelPixelScale + ModelTiepoint tags
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(geotiff_tag(MODEL_PIXEL_SCALE))?;
    let tiepoint = decoder.get_tag_f64_vec(geotiff_tag(MODEL_TIEPOINT))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// EPSG code from the GeoKey directory, projected key preferred
fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u32> {
    let keys = decoder.get_tag_u16_vec(geotiff_tag(GEO_KEY_DIRECTORY)).ok()?;
    let entries: Vec<&[u16]> = keys.get(4..)?.chunks_exact(4).collect();
    let lookup = |wanted: u16| {
        entries
            .iter()
            .find(|e| e[0] == wanted && e[1] == 0)
            .map(|e| u32::from(e[3]))
    };
    lookup(PROJECTED_CS_TYPE_KEY).or_else(|| lookup(GEOGRAPHIC_TYPE_KEY))
}

fn read_nodata<T: RasterElement, R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<T> {
    let text = decoder.get_tag_ascii_string(geotiff_tag(GDAL_NODATA)).ok()?;
    let value: f64 = text.trim_matches(char::from(0)).trim().parse().ok()?;
    T::from_f64(value)
}

fn write_geo_tags<W, K>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
    crs: Option<&CRS>,
) -> Result<()>
where
    W: Write + Seek,
    K: TiffKind,
{
    let scale = [transform.pixel_width, transform.pixel_height.abs(), 0.0];
    dir.write_tag(geotiff_tag(MODEL_PIXEL_SCALE), &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    dir.write_tag(geotiff_tag(MODEL_TIEPOINT), &tiepoint[..])?;

    // GTModelType 1 = projected, 2 = geographic; GTRasterType 1 = PixelIsArea.
    let geographic = crs.is_some_and(CRS::is_geographic);
    #[rustfmt::skip]
    let mut geokeys: Vec<u16> = vec![
        1, 1, 0, 2,
        GT_MODEL_TYPE_KEY, 0, 1, if geographic { 2 } else { 1 },
        GT_RASTER_TYPE_KEY, 0, 1, 1,
    ];
    if let Some(code) = crs.and_then(CRS::epsg).and_then(|c| u16::try_from(c).ok()) {
        let key = if geographic { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
        geokeys.extend_from_slice(&[key, 0, 1, code]);
        geokeys[3] = 3;
    }
    dir.write_tag(geotiff_tag(GEO_KEY_DIRECTORY), geokeys.as_slice())?;
    Ok(())
}

/// Write a Raster to a single-band 32-bit float GeoTIFF
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_f32(raster, file)
}

/// Write a Raster to an in-memory 32-bit float GeoTIFF
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_f32(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_f32<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;
    write_geo_tags(image.encoder(), raster.transform(), raster.crs())?;
    image.write_data(&data)?;
    Ok(())
}

/// Write a byte raster as a single-page GeoTIFF with nodata 0
pub fn write_geotiff_u8<P: AsRef<Path>>(raster: &Raster<u8>, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_u8_pages(file, &[raster.view()], raster.transform(), raster.crs())
}

/// Write a byte stack as a multi-page GeoTIFF, one page per band, nodata 0
pub fn write_geotiff_stack_u8<P: AsRef<Path>>(stack: &RasterStack<u8>, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    let pages: Vec<ArrayView2<'_, u8>> = stack.bands().collect();
    encode_u8_pages(file, &pages, stack.transform(), stack.crs())
}

/// In-memory variant of [`write_geotiff_stack_u8`]
pub fn write_geotiff_stack_u8_to_buffer(stack: &RasterStack<u8>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let pages: Vec<ArrayView2<'_, u8>> = stack.bands().collect();
    encode_u8_pages(Cursor::new(&mut buf), &pages, stack.transform(), stack.crs())?;
    Ok(buf)
}

fn encode_u8_pages<W: Write + Seek>(
    writer: W,
    pages: &[ArrayView2<'_, u8>],
    transform: &GeoTransform,
    crs: Option<&CRS>,
) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    for page in pages {
        let (rows, cols) = page.dim();
        let data: Vec<u8> = page.iter().copied().collect();

        let mut image = encoder.new_image::<Gray8>(cols as u32, rows as u32)?;
        write_geo_tags(image.encoder(), transform, crs)?;
        image.encoder().write_tag(geotiff_tag(GDAL_NODATA), "0")?;
        image.write_data(&data)?;
    }
    Ok(())
}
