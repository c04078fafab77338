//! Image file input/output
//!
//! Loading maps every failure onto `FileNotFound` or `ImageDecodeFailed`;
//! saving onto `SaveFailed`. Output is written through a temporary file in the
//! destination directory and renamed into place, so a partially written PNG is
//! never observable at the output path.

use crate::error::{BgRemoverError, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// The format is first guessed from the extension and, failing that, from
    /// the file content.
    ///
    /// # Errors
    /// - `FileNotFound` when nothing exists at `path`
    /// - `ImageDecodeFailed` when the bytes are not a supported image
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgremover::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("input.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(BgRemoverError::file_not_found(path_ref));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                debug!(
                    path = %path_ref.display(),
                    error = %e,
                    "extension-based decoding failed, trying content detection"
                );

                let data = std::fs::read(path_ref)
                    .map_err(|io_err| BgRemoverError::decode(path_ref, io_err.to_string()))?;

                image::load_from_memory(&data).map_err(|content_err| {
                    let extension = path_ref
                        .extension()
                        .and_then(|s| s.to_str())
                        .unwrap_or("none");
                    BgRemoverError::decode(
                        path_ref,
                        format!(
                            "not a supported image ({} bytes, extension {extension}): {content_err}",
                            data.len()
                        ),
                    )
                })
            },
        }
    }

    /// Encode an RGBA image as PNG in memory
    ///
    /// # Errors
    /// - Any encoder failure
    pub fn encode_png(image: &RgbaImage) -> image::ImageResult<Vec<u8>> {
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
        Ok(buffer)
    }

    /// Write `image` as a PNG at `path`, replacing any existing file
    ///
    /// # Errors
    /// - `SaveFailed` on encode failure (nothing is written), a missing
    ///   destination directory, permission problems or a full disk
    pub fn save_png<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let encoded = Self::encode_png(image)
            .map_err(|e| BgRemoverError::save(path_ref, format!("PNG encoding failed: {e}")))?;
        Self::write_atomically(path_ref, &encoded)?;

        debug!(
            path = %path_ref.display(),
            bytes = encoded.len(),
            "wrote PNG"
        );
        Ok(())
    }

    fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|e| BgRemoverError::save_io("create temporary file", path, &e))?;
        temp.write_all(bytes)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| BgRemoverError::save_io("write image data", path, &e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(path)
                .map(|m| m.permissions().mode())
                .unwrap_or(0o644);
            std::fs::set_permissions(temp.path(), std::fs::Permissions::from_mode(mode))
                .map_err(|e| BgRemoverError::save_io("set file permissions", path, &e))?;
        }

        temp.persist(path)
            .map_err(|e| BgRemoverError::save_io("replace output file", path, &e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.jpg");
        let err = ImageIOService::load_image(&missing).unwrap_err();
        assert!(matches!(err, BgRemoverError::FileNotFound(ref p) if *p == missing));
    }

    #[test]
    fn test_load_undecodable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"this is plain text").unwrap();
        let err = ImageIOService::load_image(&path).unwrap_err();
        assert!(matches!(err, BgRemoverError::ImageDecodeFailed { .. }));
    }

    #[test]
    fn test_load_misnamed_file_by_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        std::fs::write(&path, ImageIOService::encode_png(&image).unwrap()).unwrap();

        let loaded = ImageIOService::load_image(&path).unwrap();
        assert_eq!(loaded.dimensions(), (3, 2));
    }

    #[test]
    fn test_load_supported_formats() {
        let dir = TempDir::new().unwrap();
        let pixels: Vec<u8> = (0..7 * 5 * 3).map(|i| (i * 7 % 256) as u8).collect();

        #[allow(unused_mut)]
        let mut formats = vec![
            ("gif", ImageFormat::Gif),
            ("bmp", ImageFormat::Bmp),
            ("tiff", ImageFormat::Tiff),
            ("jpg", ImageFormat::Jpeg),
        ];
        #[cfg(feature = "webp-support")]
        formats.push(("webp", ImageFormat::WebP));

        for (extension, format) in formats {
            let path = dir.path().join(format!("photo.{extension}"));
            image::save_buffer_with_format(
                &path,
                &pixels,
                7,
                5,
                image::ExtendedColorType::Rgb8,
                format,
            )
            .unwrap();

            let loaded = ImageIOService::load_image(&path)
                .unwrap_or_else(|e| panic!("{extension} failed to load: {e}"));
            assert_eq!(loaded.dimensions(), (7, 5), "{extension}");
        }
    }

    #[test]
    fn test_save_and_reload_preserves_alpha() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.png");
        let mut image = RgbaImage::from_pixel(5, 4, Rgba([0, 0, 0, 0]));
        image.put_pixel(2, 2, Rgba([10, 20, 30, 200]));

        ImageIOService::save_png(&image, &path).unwrap();
        let reloaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(reloaded, image);
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.png");
        std::fs::write(&path, b"old contents").unwrap();

        ImageIOService::save_png(&RgbaImage::new(2, 2), &path).unwrap();
        assert_eq!(image::open(&path).unwrap().dimensions(), (2, 2));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_into_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no/such/dir/out.png");
        let err = ImageIOService::save_png(&RgbaImage::new(1, 1), &path).unwrap_err();
        assert!(matches!(err, BgRemoverError::SaveFailed { .. }));
        assert!(!path.exists());
    }
}
