use crate::error::TileSheetError;
use crate::grid::{Canvas, Grid};
use crate::types::{Color, Size};
use base64::Engine;
use image::{ExtendedColorType, ImageEncoder};
use std::path::Path;

/// Decodes an asset given either as a filesystem path or a `data:` URI.
pub fn decode_source(source: &str) -> Result<Canvas, TileSheetError> {
    if let Some((mime, data)) = parse_data_uri(source) {
        return decode_bytes(&data, Some(&mime))
            .map_err(|err| TileSheetError::missing(truncate_source(source), err.to_string()));
    }
    decode_file(source)
}

/// Pixel dimensions of an asset without keeping its pixels around. Files are
/// probed from their header only.
pub fn source_dimensions(source: &str) -> Result<Size, TileSheetError> {
    if parse_data_uri(source).is_some() {
        let canvas = decode_source(source)?;
        return Ok(canvas_size(&canvas));
    }
    let (width, height) = image::image_dimensions(source)
        .map_err(|err| TileSheetError::missing(source, err.to_string()))?;
    Ok(Size::new(width, height))
}

pub fn decode_file(path: impl AsRef<Path>) -> Result<Canvas, TileSheetError> {
    let path = path.as_ref();
    let decoded = image::open(path).map_err(|err| TileSheetError::missing(path, err.to_string()))?;
    Ok(from_rgba_image(decoded.to_rgba8()))
}

pub fn decode_bytes(data: &[u8], mime: Option<&str>) -> Result<Canvas, TileSheetError> {
    let guessed_format = match mime {
        Some(mime) if mime.contains("png") => Some(image::ImageFormat::Png),
        Some(mime) if mime.contains("jpeg") || mime.contains("jpg") => {
            Some(image::ImageFormat::Jpeg)
        }
        _ => image::guess_format(data).ok(),
    };
    let decoded = match guessed_format {
        Some(fmt) => image::load_from_memory_with_format(data, fmt)?,
        None => image::load_from_memory(data)?,
    };
    Ok(from_rgba_image(decoded.to_rgba8()))
}

pub fn encode_png(canvas: &Canvas, path: impl AsRef<Path>) -> Result<(), TileSheetError> {
    let (width, height) = dimensions_u32(canvas)?;
    image::save_buffer_with_format(
        path,
        &to_rgba_bytes(canvas),
        width,
        height,
        ExtendedColorType::Rgba8,
        image::ImageFormat::Png,
    )?;
    Ok(())
}

pub fn encode_png_bytes(canvas: &Canvas) -> Result<Vec<u8>, TileSheetError> {
    let (width, height) = dimensions_u32(canvas)?;
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out).write_image(
        &to_rgba_bytes(canvas),
        width,
        height,
        ExtendedColorType::Rgba8,
    )?;
    Ok(out)
}

pub fn to_rgba_bytes(canvas: &Canvas) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(canvas.as_slice().len() * 4);
    for color in canvas.as_slice() {
        bytes.extend_from_slice(&color.to_bytes());
    }
    bytes
}

pub fn canvas_size(canvas: &Canvas) -> Size {
    Size::new(canvas.width() as u32, canvas.height() as u32)
}

fn from_rgba_image(rgba: image::RgbaImage) -> Canvas {
    let (width, height) = rgba.dimensions();
    let pixels = rgba.pixels().map(|p| Color::from_bytes(p.0)).collect();
    Grid::from_vec(width as usize, height as usize, pixels).unwrap_or_else(Grid::empty)
}

fn dimensions_u32(canvas: &Canvas) -> Result<(u32, u32), TileSheetError> {
    if canvas.is_empty() {
        return Err(TileSheetError::Codec(format!(
            "cannot encode an empty {}x{} canvas",
            canvas.width(),
            canvas.height()
        )));
    }
    let width = u32::try_from(canvas.width())
        .map_err(|_| TileSheetError::Codec(format!("width {} out of range", canvas.width())))?;
    let height = u32::try_from(canvas.height())
        .map_err(|_| TileSheetError::Codec(format!("height {} out of range", canvas.height())))?;
    Ok((width, height))
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    if !uri.starts_with("data:") {
        return None;
    }
    let (header, payload) = uri.split_once(',')?;
    let mime = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some((mime, data))
}

fn truncate_source(source: &str) -> String {
    const LIMIT: usize = 48;
    match source.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &source[..idx]),
        None => source.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_canvas() -> Canvas {
        let mut canvas = Grid::filled(5, 3, Color::WHITE);
        canvas.set(0, 0, Color::rgba(255, 0, 0, 255));
        canvas.set(4, 2, Color::rgba(0, 0, 255, 128));
        canvas.set(2, 1, Color::TRANSPARENT);
        canvas
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "tilesheet_codec_{}_{}_{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    #[test]
    fn png_bytes_round_trip_is_pixel_identical() {
        let canvas = sample_canvas();
        let png = encode_png_bytes(&canvas).expect("encode");
        let decoded = decode_bytes(&png, Some("image/png")).expect("decode");
        assert_eq!(decoded, canvas);
    }

    #[test]
    fn png_file_round_trip_is_pixel_identical() {
        let dir = temp_dir("file");
        let path = dir.join("page0.png");
        let canvas = sample_canvas();
        encode_png(&canvas, &path).expect("encode");
        assert_eq!(decode_file(&path).expect("decode"), canvas);
        assert_eq!(
            source_dimensions(path.to_str().expect("utf8")).expect("dims"),
            Size::new(5, 3)
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn data_uri_sources_decode_in_memory() {
        let canvas = sample_canvas();
        let png = encode_png_bytes(&canvas).expect("encode");
        let uri = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        );
        assert_eq!(decode_source(&uri).expect("decode"), canvas);
        assert_eq!(source_dimensions(&uri).expect("dims"), Size::new(5, 3));
    }

    #[test]
    fn missing_file_is_missing_resource() {
        let err = decode_source("/no/such/asset.png").expect_err("missing");
        match err {
            TileSheetError::MissingResource { path, .. } => {
                assert!(path.ends_with("asset.png"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_canvas_is_not_encoded() {
        let err = encode_png_bytes(&Grid::empty()).expect_err("empty");
        assert!(matches!(err, TileSheetError::Codec(_)));
    }
}
