use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use rand::RngCore;
use std::io::Cursor;

pub const TOKEN_BYTES: usize = 16;

pub fn new_redemption_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng
        .try_fill_bytes(&mut bytes)
        .context("OS random source failed")?;
    Ok(general_purpose::URL_SAFE.encode(bytes))
}

pub fn png_data_url(payload: &[u8], size: u32) -> Result<String> {
    let code = QrCode::with_error_correction_level(payload, EcLevel::M)
        .context("payload does not fit in a QR symbol")?;
    let image = code.render::<Luma<u8>>().min_dimensions(size, size).build();

    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, ImageFormat::Png)
        .context("failed to encode QR image")?;

    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png.into_inner())
    ))
}

pub fn code_hint(code: &str) -> &str {
    code.get(..6).unwrap_or(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_distinct() {
        let a = new_redemption_token().unwrap();
        let b = new_redemption_token().unwrap();
        assert_eq!(a.len(), 24);
        assert_ne!(a, b);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '='));
        assert_eq!(general_purpose::URL_SAFE.decode(&a).unwrap().len(), TOKEN_BYTES);
    }

    #[test]
    fn renders_png_data_url() {
        let url = png_data_url(br#"{"paymentId":"x"}"#, 128).unwrap();
        let b64 = url.strip_prefix("data:image/png;base64,").unwrap();
        let png = general_purpose::STANDARD.decode(b64).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert!(decoded.width() >= 128);
    }

    #[test]
    fn hint_never_panics_on_short_codes() {
        assert_eq!(code_hint("abc"), "abc");
        assert_eq!(code_hint("abcdefghij"), "abcdef");
    }
}
