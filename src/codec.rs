//! # Lossless Codec Module
//!
//! Questo modulo definisce i codec lossless usati dalla pipeline di compressione.
//! Come nel resto del progetto, la compressione vera è delegata a tool esterni
//! specializzati: il crate `image` serve solo a riconoscere il formato reale dai
//! magic bytes, senza decodificare nulla.
//!
//! ## Codec supportati
//!
//! | Formato | Codec       | Tool       | Opzioni usate          |
//! |---------|-------------|------------|------------------------|
//! | JPEG    | `JpegCodec` | jpegtran   | `progressive`          |
//! | GIF     | `GifCodec`  | gifsicle   | `interlaced`           |
//! | PNG     | `PngCodec`  | optipng    | `optimization_level`   |
//!
//! Tutti i codec lavorano in modalità lossless: le opzioni regolano solo lo
//! sforzo di ottimizzazione, mai la fedeltà dei pixel.
//!
//! ## Contratto
//! `compress(bytes, options) -> bytes`: ogni codec riceve i byte sorgente e
//! restituisce i byte compressi. jpegtran e gifsicle lavorano via stdin/stdout,
//! optipng richiede file su disco e usa una directory temporanea.

use crate::config::CodecOptions;
use crate::tool_resolver::ToolPathResolver;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Image format detected from file content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Gif,
    Png,
}

impl ImageKind {
    /// Detect the real format from magic bytes, ignoring the file extension
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Gif => "GIF",
            Self::Png => "PNG",
        }
    }
}

/// A format-specific lossless optimizer
#[async_trait]
pub trait Codec: Send + Sync {
    /// Format this codec handles
    fn kind(&self) -> ImageKind;

    /// Name used in logs and error messages
    fn name(&self) -> &str;

    async fn compress(&self, input: &[u8], options: &CodecOptions) -> Result<Vec<u8>>;
}

/// JPEG lossless transform via jpegtran
pub struct JpegCodec {
    program: PathBuf,
}

impl JpegCodec {
    pub fn new(resolver: &ToolPathResolver) -> Self {
        Self {
            program: resolve_program(resolver, "jpegtran"),
        }
    }

    fn args(options: &CodecOptions) -> Vec<String> {
        let mut args = crate::args!["-copy", "none", "-optimize"];
        if options.progressive {
            args.push("-progressive".to_string());
        }
        args
    }
}

#[async_trait]
impl Codec for JpegCodec {
    fn kind(&self) -> ImageKind {
        ImageKind::Jpeg
    }

    fn name(&self) -> &str {
        "jpegtran"
    }

    async fn compress(&self, input: &[u8], options: &CodecOptions) -> Result<Vec<u8>> {
        run_filter(self.name(), &self.program, &Self::args(options), input).await
    }
}

/// GIF optimizer via gifsicle
pub struct GifCodec {
    program: PathBuf,
}

impl GifCodec {
    pub fn new(resolver: &ToolPathResolver) -> Self {
        Self {
            program: resolve_program(resolver, "gifsicle"),
        }
    }

    fn args(options: &CodecOptions) -> Vec<String> {
        let mut args = crate::args!["--no-warnings", "--no-app-extensions"];
        if options.interlaced {
            args.push("--interlace".to_string());
        }
        args
    }
}

#[async_trait]
impl Codec for GifCodec {
    fn kind(&self) -> ImageKind {
        ImageKind::Gif
    }

    fn name(&self) -> &str {
        "gifsicle"
    }

    async fn compress(&self, input: &[u8], options: &CodecOptions) -> Result<Vec<u8>> {
        run_filter(self.name(), &self.program, &Self::args(options), input).await
    }
}

/// PNG optimizer via optipng
pub struct PngCodec {
    program: PathBuf,
}

impl PngCodec {
    pub fn new(resolver: &ToolPathResolver) -> Self {
        Self {
            program: resolve_program(resolver, "optipng"),
        }
    }

    fn args(options: &CodecOptions, input: &Path, output: &Path) -> Vec<String> {
        let level = format!("-o{}", options.optimization_level);
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        crate::args![
            "-quiet",
            "-strip",
            "all",
            "-clobber",
            "-force",
            "-fix",
            level.as_str(),
            "-out",
            &*output,
            &*input,
        ]
    }
}

#[async_trait]
impl Codec for PngCodec {
    fn kind(&self) -> ImageKind {
        ImageKind::Png
    }

    fn name(&self) -> &str {
        "optipng"
    }

    async fn compress(&self, input: &[u8], options: &CodecOptions) -> Result<Vec<u8>> {
        // optipng non supporta stdout: lavora su file in una directory temporanea
        let scratch = tempfile::tempdir()?;
        let input_path = scratch.path().join("input.png");
        let output_path = scratch.path().join("output.png");
        tokio::fs::write(&input_path, input).await?;

        let args = Self::args(options, &input_path, &output_path);
        debug!("Running {} with {:?}", self.name(), args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(self.name(), e))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.name(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(tokio::fs::read(&output_path).await?)
    }
}

/// JPEG, GIF and PNG codecs resolved against the given tools
pub fn standard_codecs(resolver: &ToolPathResolver) -> Vec<Arc<dyn Codec>> {
    vec![
        Arc::new(JpegCodec::new(resolver)) as Arc<dyn Codec>,
        Arc::new(GifCodec::new(resolver)),
        Arc::new(PngCodec::new(resolver)),
    ]
}

fn resolve_program(resolver: &ToolPathResolver, tool_name: &str) -> PathBuf {
    resolver
        .resolve_tool(tool_name)
        .unwrap_or_else(|| PathBuf::from(tool_name))
}

fn spawn_error(tool_name: &str, e: std::io::Error) -> anyhow::Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!(
            "{} is not installed. Install with: {}",
            tool_name,
            ToolPathResolver::install_instructions(tool_name)
        )
    } else {
        anyhow!("failed to start {}: {}", tool_name, e)
    }
}

/// Pipe `input` through a stdin → stdout tool
async fn run_filter(tool_name: &str, program: &Path, args: &[String], input: &[u8]) -> Result<Vec<u8>> {
    debug!("Running {} with {:?}", tool_name, args);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(tool_name, e))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("{} stdin not available", tool_name))?;

    // scrittura e lettura concorrenti, altrimenti con file grandi le pipe si bloccano
    let write = async move {
        stdin.write_all(input).await?;
        stdin.shutdown().await
    };
    let (written, output) = tokio::join!(write, child.wait_with_output());
    let output = output?;

    if !output.status.success() {
        bail!(
            "{} exited with {}: {}",
            tool_name,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    written.map_err(|e| anyhow!("failed to feed {}: {}", tool_name, e))?;

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn sample_png() -> Vec<u8> {
        let img = image::RgbImage::from_fn(48, 48, |x, y| {
            image::Rgb([(x * 5) as u8, (y * 5) as u8, ((x + y) % 2 * 255) as u8])
        });
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageOutputFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_detect_from_magic_bytes() {
        assert_eq!(ImageKind::detect(PNG_SIGNATURE), Some(ImageKind::Png));
        assert_eq!(ImageKind::detect(b"GIF89a\x01\x00\x01\x00"), Some(ImageKind::Gif));
        assert_eq!(ImageKind::detect(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::detect(b"just some text"), None);
        assert_eq!(ImageKind::detect(&[]), None);
    }

    #[test]
    fn test_jpeg_args() {
        let mut options = CodecOptions::default();
        assert!(!JpegCodec::args(&options).contains(&"-progressive".to_string()));
        options.progressive = true;
        assert!(JpegCodec::args(&options).contains(&"-progressive".to_string()));
    }

    #[test]
    fn test_gif_args() {
        let mut options = CodecOptions::default();
        assert!(!GifCodec::args(&options).contains(&"--interlace".to_string()));
        options.interlaced = true;
        assert!(GifCodec::args(&options).contains(&"--interlace".to_string()));
    }

    #[test]
    fn test_png_args_use_optimization_level() {
        let options = CodecOptions {
            optimization_level: 5,
            ..Default::default()
        };
        let args = PngCodec::args(&options, Path::new("/tmp/in.png"), Path::new("/tmp/out.png"));
        assert!(args.contains(&"-o5".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/in.png"));
    }

    #[test]
    fn test_standard_codecs_cover_every_format() {
        let resolver = ToolPathResolver::with_search_path(None, Vec::new());
        let kinds: Vec<ImageKind> = standard_codecs(&resolver).iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec![ImageKind::Jpeg, ImageKind::Gif, ImageKind::Png]);
    }

    #[tokio::test]
    async fn test_missing_tool_is_an_error() {
        let codec = GifCodec {
            program: PathBuf::from("/nonexistent/gifsicle-missing"),
        };
        let err = codec
            .compress(b"GIF89a", &CodecOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("gifsicle"));
    }

    #[tokio::test]
    async fn test_png_codec_is_lossless() {
        let resolver = ToolPathResolver::new();
        if !resolver.is_tool_available("optipng") {
            // optipng non installato: niente da verificare
            return;
        }

        let input = sample_png();
        let codec = PngCodec::new(&resolver);
        let output = codec.compress(&input, &CodecOptions::default()).await.unwrap();

        let before = image::load_from_memory(&input).unwrap().to_rgba8();
        let after = image::load_from_memory(&output).unwrap().to_rgba8();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_png_codec_is_deterministic() {
        let resolver = ToolPathResolver::new();
        if !resolver.is_tool_available("optipng") {
            return;
        }

        let input = sample_png();
        let codec = PngCodec::new(&resolver);
        let first = codec.compress(&input, &CodecOptions::default()).await.unwrap();
        let second = codec.compress(&input, &CodecOptions::default()).await.unwrap();
        assert_eq!(first, second);
    }
}
