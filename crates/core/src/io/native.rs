//! GeoTIFF reading/writing on top of the `tiff` crate.
//!
//! Reads any chunky (pixel-interleaved) integer or float TIFF into a
//! [`BandedRaster`], picking up the affine transform from the
//! ModelPixelScale/ModelTiepoint pair or ModelTransformation, and the EPSG code
//! from the GeoKeyDirectory. Writes 8-bit gray, RGB or RGBA images with the
//! same tags.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{BandedRaster, GeoTransform, Raster, RasterElement};
use ndarray::Array3;
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::compression::{Compression as TiffCompression, Deflate, DeflateLevel, Lzw, Uncompressed};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Compression used when writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    None,
    Lzw,
    #[default]
    Deflate,
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    pub compression: Compression,
}

/// Read one band of a GeoTIFF file into a Raster (first band by default)
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    read_geotiff_bands(path)?.band_raster(band.unwrap_or(0))
}

/// Read every band of a GeoTIFF file
pub fn read_geotiff_bands<T, P>(path: P) -> Result<BandedRaster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read every band of a GeoTIFF held in memory
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<BandedRaster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn decode_geotiff<T, R>(reader: R) -> Result<BandedRaster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder = Decoder::new(reader)?;

    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let bands = match decoder.colortype() {
        Ok(tiff::ColorType::Gray(_)) => 1,
        Ok(tiff::ColorType::GrayA(_)) => 2,
        Ok(tiff::ColorType::RGB(_) | tiff::ColorType::YCbCr(_)) => 3,
        Ok(tiff::ColorType::RGBA(_) | tiff::ColorType::CMYK(_)) => 4,
        Ok(other) => {
            return Err(Error::UnsupportedDataType(format!(
                "TIFF color type {:?}",
                other
            )))
        }
        // Sample layouts the decoder has no color type for (extra bands)
        Err(e) => {
            let samples = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1);
            return Err(Error::UnsupportedDataType(format!(
                "TIFF with {} samples per pixel: {}",
                samples, e
            )));
        }
    };

    let interleaved: Vec<T> = match decoder.read_image()? {
        DecodingResult::U8(buf) => cast_all(&buf),
        DecodingResult::U16(buf) => cast_all(&buf),
        DecodingResult::U32(buf) => cast_all(&buf),
        DecodingResult::U64(buf) => cast_all(&buf),
        DecodingResult::I8(buf) => cast_all(&buf),
        DecodingResult::I16(buf) => cast_all(&buf),
        DecodingResult::I32(buf) => cast_all(&buf),
        DecodingResult::I64(buf) => cast_all(&buf),
        DecodingResult::F32(buf) => cast_all(&buf),
        DecodingResult::F64(buf) => cast_all(&buf),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF sample format".to_string(),
            ))
        }
    };

    if interleaved.len() != rows * cols * bands {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let data = Array3::from_shape_fn((bands, rows, cols), |(b, r, c)| {
        interleaved[(r * cols + c) * bands + b]
    });

    let mut raster = BandedRaster::from_array(data);
    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_epsg(&mut decoder).map(CRS::from_epsg));

    Ok(raster)
}

fn cast_all<S, T>(buf: &[S]) -> Vec<T>
where
    S: Copy + num_traits::ToPrimitive,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| match v.to_f64() {
            Some(f) => T::from_f64_saturating(f),
            None => T::zero(),
        })
        .collect()
}

/// Attempt to read the GeoTransform from TIFF tags
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Option<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if m.len() >= 8 {
            return Some(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]));
        }
    }

    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]
        // scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    None
}

/// EPSG code from the GeoKeyDirectory: projected CS first, geographic second.
fn read_epsg<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<u32> {
    let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    parse_geokey_epsg(&keys)
}

fn parse_geokey_epsg(keys: &[u16]) -> Option<u32> {
    let header = keys.get(..4)?;
    let count = header[3] as usize;
    let entries: Vec<&[u16]> = keys[4..].chunks_exact(4).take(count).collect();

    let inline_value = |key: u16| {
        entries
            .iter()
            .find(|e| e[0] == key && e[1] == 0)
            .map(|e| e[3] as u32)
            .filter(|&code| code != 0 && code != 32767)
    };

    inline_value(PROJECTED_CS_TYPE_KEY).or_else(|| inline_value(GEOGRAPHIC_TYPE_KEY))
}

fn build_geokeys(crs: Option<&CRS>) -> Vec<u16> {
    let epsg = crs.and_then(|c| c.epsg()).and_then(|code| u16::try_from(code).ok());
    let geographic = crs.is_some_and(|c| c.is_geographic());

    let mut keys = vec![
        1, 1, 0, 2, // Version 1.1.0, 2 keys
        GT_MODEL_TYPE_KEY, 0, 1, if geographic { 2 } else { 1 },
        GT_RASTER_TYPE_KEY, 0, 1, 1, // RasterPixelIsArea
    ];
    if let Some(code) = epsg {
        let key = if geographic {
            GEOGRAPHIC_TYPE_KEY
        } else {
            PROJECTED_CS_TYPE_KEY
        };
        keys.extend_from_slice(&[key, 0, 1, code]);
        keys[3] = 3;
    }
    keys
}

/// Write an 8-bit raster (1, 3 or 4 bands) to a GeoTIFF file
pub fn write_geotiff<P>(
    raster: &BandedRaster<u8>,
    path: P,
    options: Option<GeoTiffOptions>,
) -> Result<()>
where
    P: AsRef<Path>,
{
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_geotiff(raster, file, options.unwrap_or_default())
}

/// Write an 8-bit raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer(
    raster: &BandedRaster<u8>,
    options: Option<GeoTiffOptions>,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_geotiff<W>(raster: &BandedRaster<u8>, writer: W, options: GeoTiffOptions) -> Result<()>
where
    W: std::io::Write + std::io::Seek,
{
    let (bands, rows, cols) = raster.shape();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let planar = raster.data();
    let mut data = Vec::with_capacity(bands * rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            data.extend((0..bands).map(|b| planar[(b, r, c)]));
        }
    }

    let mut encoder = TiffEncoder::new(writer)?;
    let size = (cols as u32, rows as u32);

    match (bands, options.compression) {
        (1, c) => write_with::<colortype::Gray8, _>(&mut encoder, size, raster, &data, c),
        (3, c) => write_with::<colortype::RGB8, _>(&mut encoder, size, raster, &data, c),
        (4, c) => write_with::<colortype::RGBA8, _>(&mut encoder, size, raster, &data, c),
        (n, _) => Err(Error::UnsupportedDataType(format!(
            "cannot write {} bands as 8-bit GeoTIFF (expected 1, 3 or 4)",
            n
        ))),
    }
}

fn write_with<C, W>(
    encoder: &mut TiffEncoder<W>,
    size: (u32, u32),
    raster: &BandedRaster<u8>,
    data: &[u8],
    compression: Compression,
) -> Result<()>
where
    C: ColorType<Inner = u8>,
    W: std::io::Write + std::io::Seek,
{
    match compression {
        Compression::None => write_image::<C, _, _>(encoder, size, raster, data, Uncompressed::default()),
        Compression::Lzw => write_image::<C, _, _>(encoder, size, raster, data, Lzw::default()),
        Compression::Deflate => write_image::<C, _, _>(
            encoder,
            size,
            raster,
            data,
            Deflate::with_level(DeflateLevel::Best),
        ),
    }
}

fn write_image<C, W, D>(
    encoder: &mut TiffEncoder<W>,
    (width, height): (u32, u32),
    raster: &BandedRaster<u8>,
    data: &[u8],
    compression: D,
) -> Result<()>
where
    C: ColorType<Inner = u8>,
    W: std::io::Write + std::io::Seek,
    D: TiffCompression,
{
    let mut image = encoder.new_image_with_compression::<C, D>(width, height, compression)?;

    let gt = raster.transform();
    if gt.is_north_up() {
        let scale = [gt.pixel_width, -gt.pixel_height, 0.0];
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &scale[..])?;

        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    } else {
        let matrix = [
            gt.pixel_width, gt.row_rotation, 0.0, gt.origin_x,
            gt.col_rotation, gt.pixel_height, 0.0, gt.origin_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        image
            .encoder()
            .write_tag(Tag::ModelTransformationTag, &matrix[..])?;
    }

    let geokeys = build_geokeys(raster.crs());
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;

    image.write_data(data)?;
    Ok(())
}
