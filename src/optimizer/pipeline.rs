//! # Compression Pipeline Module
//!
//! Esegue un singolo file attraverso il codec lossless che corrisponde al suo
//! formato reale e scrive il risultato nella destinazione.
//!
//! ## Pipeline per file:
//! 1. Cancella l'output esistente (mai mescolare con output vecchi), mai se
//!    la destinazione è lo stesso file del sorgente
//! 2. Legge i byte sorgente
//! 3. Rileva il formato dai magic bytes, non dall'estensione
//! 4. Esegue l'unico codec registrato per quel formato, con timeout
//! 5. Tiene il risultato più piccolo tra output del codec e originale
//! 6. Scrive la destinazione con il nome file originale

use crate::{
    codec::{standard_codecs, Codec, ImageKind},
    config::CodecOptions,
    error::MinifyError,
    optimizer::path_resolver::WorkItem,
    tool_resolver::ToolPathResolver,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Output of the pipeline for one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionResult {
    pub output_path: PathBuf,
    pub output_size: u64,
    /// Size of the source bytes the codec consumed
    pub original_size: u64,
}

/// Runs files through the codec matching their detected format
pub struct CompressionPipeline {
    codecs: Vec<Arc<dyn Codec>>,
    timeout: Duration,
}

impl CompressionPipeline {
    /// Pipeline with the jpegtran / gifsicle / optipng codecs
    pub fn new(resolver: &ToolPathResolver, timeout: Duration) -> Self {
        Self::with_codecs(standard_codecs(resolver), timeout)
    }

    pub fn with_codecs(codecs: Vec<Arc<dyn Codec>>, timeout: Duration) -> Self {
        Self { codecs, timeout }
    }

    fn codec_for(&self, kind: ImageKind) -> Option<&Arc<dyn Codec>> {
        self.codecs.iter().find(|codec| codec.kind() == kind)
    }

    /// Compress `item.source` into `item.destination`; the parent directory must exist
    pub async fn compress(
        &self,
        item: &WorkItem,
        options: &CodecOptions,
    ) -> Result<CompressionResult, MinifyError> {
        let source = &item.source;
        let destination = &item.destination;

        // cancellare la destinazione significherebbe cancellare il sorgente
        if let (Ok(real_source), Ok(real_destination)) = (
            tokio::fs::canonicalize(source).await,
            tokio::fs::canonicalize(destination).await,
        ) {
            if real_source == real_destination {
                return Err(MinifyError::filesystem(
                    destination,
                    std::io::Error::other(format!("destination is the source file {}", source.display())),
                ));
            }
        }

        match tokio::fs::remove_file(destination).await {
            Ok(()) => debug!("Removed stale output: {}", destination.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(MinifyError::filesystem(destination, e)),
        }

        let input = tokio::fs::read(source)
            .await
            .map_err(|e| MinifyError::filesystem(source, e))?;

        let kind = ImageKind::detect(&input)
            .ok_or_else(|| MinifyError::codec(source, "content is not a recognised JPEG, GIF or PNG image"))?;

        let codec = self.codec_for(kind).ok_or_else(|| {
            MinifyError::codec(source, format!("no codec registered for {} images", kind.name()))
        })?;

        debug!("Minifying {} as {} with {}", source.display(), kind.name(), codec.name());

        let output = tokio::time::timeout(self.timeout, codec.compress(&input, options))
            .await
            .map_err(|_| {
                MinifyError::codec(
                    source,
                    format!("{} timed out after {:?}", codec.name(), self.timeout),
                )
            })?
            .map_err(|e| MinifyError::codec(source, format!("{:#}", e)))?;

        if output.is_empty() {
            return Err(MinifyError::codec(
                source,
                format!("{} produced no output", codec.name()),
            ));
        }

        // mai più grande dell'originale
        let bytes = if output.len() > input.len() {
            debug!(
                "{} output larger than source ({} > {} bytes), keeping original: {}",
                codec.name(),
                output.len(),
                input.len(),
                source.display()
            );
            &input
        } else {
            &output
        };

        tokio::fs::write(destination, bytes)
            .await
            .map_err(|e| MinifyError::filesystem(destination, e))?;

        Ok(CompressionResult {
            output_path: destination.clone(),
            output_size: bytes.len() as u64,
            original_size: input.len() as u64,
        })
    }
}
