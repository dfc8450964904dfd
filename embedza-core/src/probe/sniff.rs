//! Dimension sniffing from raw bytes.

use std::io::Cursor;
use std::sync::LazyLock;

use image::ImageReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

use super::ProbeError;
use crate::types::ImageDimensions;

/// `<number><unit>`, e.g. `100`, `1.5px`, `5in`, `50%`.
static LENGTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([0-9]*\.?[0-9]+)\s*([a-zA-Z%]*)\s*$").unwrap());

/// Determine image dimensions from the leading bytes of a resource.
pub fn sniff_dimensions(data: &[u8]) -> Result<ImageDimensions, ProbeError> {
    if looks_like_svg(data) {
        return svg_dimensions(data);
    }

    if data.starts_with(b"8BPS") {
        return psd_dimensions(data);
    }

    raster_dimensions(data)
}

fn raster_dimensions(data: &[u8]) -> Result<ImageDimensions, ProbeError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ProbeError::Content(format!("Failed to read image: {}", e)))?;

    let format = reader
        .format()
        .ok_or_else(|| ProbeError::Content("Could not detect image format".to_string()))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ProbeError::Content(format!("Failed to decode {:?} header: {}", format, e)))?;

    let mut dims = ImageDimensions::px(f64::from(width), f64::from(height));
    dims.mime_type = Some(format.to_mime_type().to_string());
    Ok(dims)
}

/// PSD header: signature, version, 6 reserved bytes, channels, then
/// big-endian height and width.
fn psd_dimensions(data: &[u8]) -> Result<ImageDimensions, ProbeError> {
    let header = data
        .get(14..22)
        .ok_or_else(|| ProbeError::Content("Truncated PSD header".to_string()))?;

    let height = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let width = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);

    if width == 0 || height == 0 {
        return Err(ProbeError::Content("PSD header has zero size".to_string()));
    }

    let mut dims = ImageDimensions::px(f64::from(width), f64::from(height));
    dims.mime_type = Some("image/vnd.adobe.photoshop".to_string());
    Ok(dims)
}

fn looks_like_svg(data: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&data[..data.len().min(4096)]);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    head.starts_with('<') && head.contains("<svg")
}

#[derive(Debug, Default)]
struct SvgAttrs {
    width: Option<String>,
    height: Option<String>,
    view_box: Option<String>,
}

fn svg_dimensions(data: &[u8]) -> Result<ImageDimensions, ProbeError> {
    let attrs = read_svg_root(data)?;
    let mut dims = svg_size(&attrs)
        .ok_or_else(|| ProbeError::Content("SVG has no usable size".to_string()))?;
    dims.mime_type = Some("image/svg+xml".to_string());
    Ok(dims)
}

/// Read attributes of the first element, which must be `<svg>`.
fn read_svg_root(data: &[u8]) -> Result<SvgAttrs, ProbeError> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().check_end_names = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if !e.local_name().as_ref().eq_ignore_ascii_case(b"svg") {
                    return Err(ProbeError::Content("Root element is not <svg>".to_string()));
                }
                return svg_attrs(&e);
            }
            Ok(Event::Eof) => {
                return Err(ProbeError::Content("No <svg> element found".to_string()));
            }
            Err(e) => return Err(ProbeError::Content(format!("Invalid SVG: {}", e))),
            _ => {}
        }
        buf.clear();
    }
}

fn svg_attrs(elem: &BytesStart<'_>) -> Result<SvgAttrs, ProbeError> {
    let mut attrs = SvgAttrs::default();

    for attr in elem.attributes().with_checks(false).flatten() {
        let value = attr
            .unescape_value()
            .map_err(|e| ProbeError::Content(format!("Invalid SVG attribute: {}", e)))?
            .into_owned();

        match attr.key.as_ref().to_ascii_lowercase().as_slice() {
            b"width" => attrs.width = Some(value),
            b"height" => attrs.height = Some(value),
            b"viewbox" => attrs.view_box = Some(value),
            _ => {}
        }
    }

    Ok(attrs)
}

fn parse_length(value: &str) -> Option<(f64, String)> {
    let caps = LENGTH_RE.captures(value)?;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = match caps.get(2).map(|m| m.as_str()) {
        Some(u) if !u.is_empty() => u.to_ascii_lowercase(),
        _ => "px".to_string(),
    };
    Some((number, unit))
}

fn parse_view_box(value: &str) -> Option<(f64, f64)> {
    let parts: Vec<f64> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .map(|p| p.parse().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((*w, *h)),
        _ => None,
    }
}

fn svg_size(attrs: &SvgAttrs) -> Option<ImageDimensions> {
    let width = attrs.width.as_deref().and_then(parse_length);
    let height = attrs.height.as_deref().and_then(parse_length);

    if let (Some((w, wu)), Some((h, hu))) = (&width, &height) {
        return Some(ImageDimensions {
            width: *w,
            height: *h,
            width_units: wu.clone(),
            height_units: hu.clone(),
            mime_type: None,
        });
    }

    let (vw, vh) = attrs.view_box.as_deref().and_then(parse_view_box)?;
    let ratio = vw / vh;

    let (width, height, unit) = match (width, height) {
        (Some((w, unit)), None) => (w, w / ratio, unit),
        (None, Some((h, unit))) => (h * ratio, h, unit),
        _ => (vw, vh, "px".to_string()),
    };

    Some(ImageDimensions {
        width,
        height,
        width_units: unit.clone(),
        height_units: unit,
        mime_type: None,
    })
}
