//! EXIF metadata extraction
//!
//! Reads EXIF from JPEG, PNG, WebP, TIFF and HEIF containers with
//! `kamadak-exif`. A container without an EXIF block is not an error: it
//! yields empty metadata.

use std::fs::File;
use std::io::BufReader;

use tracing::debug;

use crate::types::{
    Coordinate, EmbeddedMetadata, ImageHandle, MetadataReadError, MetadataReader, MetadataTag,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExifMetadataReader;

impl MetadataReader for ExifMetadataReader {
    fn read(&self, image: &ImageHandle) -> Result<EmbeddedMetadata, MetadataReadError> {
        let file = File::open(image.path()).map_err(|e| MetadataReadError::Io(e.to_string()))?;
        let mut reader = BufReader::new(file);

        let exif = match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => {
                debug!(file = ?image.path(), "No EXIF block in container");
                return Ok(EmbeddedMetadata::default());
            }
            Err(exif::Error::Io(e)) => return Err(MetadataReadError::Io(e.to_string())),
            Err(e) => return Err(MetadataReadError::Malformed(e.to_string())),
        };

        Ok(embedded_metadata(&exif))
    }
}

/// Reduce a parsed EXIF block to the fields the analyzer inspects
fn embedded_metadata(exif: &exif::Exif) -> EmbeddedMetadata {
    let tags = exif
        .fields()
        .map(|field| MetadataTag {
            name: field.tag.to_string(),
            value: field
                .display_value()
                .with_unit(exif)
                .to_string()
                .trim_matches('"')
                .to_string(),
        })
        .collect();

    let has_geotag = exif
        .get_field(exif::Tag::GPSLatitude, exif::In::PRIMARY)
        .is_some()
        && exif
            .get_field(exif::Tag::GPSLongitude, exif::In::PRIMARY)
            .is_some();

    EmbeddedMetadata {
        tags,
        date_time_original: ascii_field(exif, exif::Tag::DateTimeOriginal),
        date_time: ascii_field(exif, exif::Tag::DateTime),
        software: ascii_field(exif, exif::Tag::Software),
        has_geotag,
        geotag: gps_coordinate(exif),
    }
}

/// Raw text of an ASCII field, or its display form for other types
fn ascii_field(exif: &exif::Exif, tag: exif::Tag) -> Option<String> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    let text = match &field.value {
        exif::Value::Ascii(values) => values
            .first()
            .map(|v| String::from_utf8_lossy(v).trim().to_string())?,
        _ => field.display_value().to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn gps_coordinate(exif: &exif::Exif) -> Option<Coordinate> {
    let latitude = signed_degrees(
        exif.get_field(exif::Tag::GPSLatitude, exif::In::PRIMARY)?,
        exif.get_field(exif::Tag::GPSLatitudeRef, exif::In::PRIMARY),
        'S',
    )?;
    let longitude = signed_degrees(
        exif.get_field(exif::Tag::GPSLongitude, exif::In::PRIMARY)?,
        exif.get_field(exif::Tag::GPSLongitudeRef, exif::In::PRIMARY),
        'W',
    )?;
    Coordinate::new(latitude, longitude).ok()
}

/// Apply the hemisphere reference to an unsigned DMS value
fn signed_degrees(
    value: &exif::Field,
    reference: Option<&exif::Field>,
    negative: char,
) -> Option<f64> {
    let degrees = parse_dms(&value.value)?;
    let is_negative = reference
        .map(|r| r.display_value().to_string().contains(negative))
        .unwrap_or(false);
    Some(if is_negative { -degrees } else { degrees })
}

/// Degrees, minutes, seconds rationals → decimal degrees
pub fn parse_dms(value: &exif::Value) -> Option<f64> {
    match value {
        exif::Value::Rational(rationals) if rationals.len() >= 3 => {
            let parts: Vec<f64> = rationals.iter().take(3).map(|r| r.to_f64()).collect();
            if parts.iter().any(|p| !p.is_finite()) {
                return None;
            }
            Some(parts[0] + parts[1] / 60.0 + parts[2] / 3600.0)
        }
        _ => None,
    }
}
