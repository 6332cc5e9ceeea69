use std::borrow::Cow;
use std::io::Read;

use derive_more::Display;
use eyre::{Result, WrapErr};
use flate2::read::MultiGzDecoder;

/// Compression of an incoming payload, inferred from its leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Compression {
    #[display("none")]
    None,
    #[display("gzip")]
    Gzip,
}

impl Compression {
    pub fn infer(bytes: &[u8]) -> Self {
        match infer::get(bytes).map(|kind| kind.mime_type()) {
            Some("application/gzip") => Compression::Gzip,
            // Always assume plain text if there is no clear match
            _ => Compression::None,
        }
    }
}

/// Returns the decompressed payload, borrowing it as is when no compression is detected.
pub fn decode(payload: &[u8]) -> Result<Cow<'_, [u8]>> {
    match Compression::infer(payload) {
        Compression::None => Ok(Cow::Borrowed(payload)),
        Compression::Gzip => {
            let mut decoded = Vec::with_capacity(payload.len() * 4);
            MultiGzDecoder::new(payload)
                .read_to_end(&mut decoded)
                .wrap_err("Failed to decompress the gzip payload")?;
            log::debug!(
                "Decompressed gzip payload: {} -> {} bytes",
                payload.len(),
                decoded.len()
            );
            Ok(Cow::Owned(decoded))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_plain_payload_is_borrowed() -> Result<()> {
        let payload = b">id\nACGT\n";
        assert_eq!(Compression::infer(payload), Compression::None);
        assert!(matches!(decode(payload)?, Cow::Borrowed(_)));
        assert!(matches!(decode(b"")?, Cow::Borrowed(_)));
        Ok(())
    }

    #[test]
    fn test_gzip_payload() -> Result<()> {
        let content = b">id\nACGT\n>id2\nTTTT\n";
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(content)?;
        let compressed = encoder.finish()?;

        assert_eq!(Compression::infer(&compressed), Compression::Gzip);
        assert_eq!(decode(&compressed)?.as_ref(), content);
        Ok(())
    }
}
