//! GPU textures and the per-model deduplication cache.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use overdrive_assets::ImageDecoder;
use overdrive_common::TextureKind;
use overdrive_gpu::{GraphicsContext, PixelFormat, SamplerParams, TextureId, TextureUpload};

/// An uploaded 2D texture.
///
/// Shared read-only between meshes through `Rc`; the [`TextureCache`] that
/// created it is responsible for deleting it.
#[derive(Debug, PartialEq, Eq)]
pub struct Texture {
    id: TextureId,
    kind: TextureKind,
    path: PathBuf,
}

impl Texture {
    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Loads each texture path at most once.
///
/// Paths that failed to decode are remembered and not retried.
#[derive(Debug, Default)]
pub struct TextureCache {
    loaded: BTreeMap<PathBuf, Rc<Texture>>,
    failed: BTreeSet<PathBuf>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the texture for `path`, decoding and uploading it on first use.
    ///
    /// The cache is keyed by path alone: a path first loaded as one kind
    /// keeps that kind for later requests. With `gamma` set, diffuse
    /// textures are stored in an sRGB format.
    pub fn load(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        decoder: &dyn ImageDecoder,
        path: &Path,
        kind: TextureKind,
        gamma: bool,
    ) -> Option<Rc<Texture>> {
        if let Some(texture) = self.loaded.get(path) {
            if texture.kind != kind {
                tracing::debug!(
                    path = %path.display(),
                    cached = %texture.kind,
                    requested = %kind,
                    "texture reused under a different kind"
                );
            }
            return Some(Rc::clone(texture));
        }
        if self.failed.contains(path) {
            return None;
        }

        match upload(ctx, decoder, path, kind, gamma) {
            Ok(id) => {
                let texture = Rc::new(Texture {
                    id,
                    kind,
                    path: path.to_path_buf(),
                });
                self.loaded.insert(path.to_path_buf(), Rc::clone(&texture));
                Some(texture)
            }
            Err(message) => {
                tracing::warn!(path = %path.display(), %kind, "texture failed to load: {message}");
                self.failed.insert(path.to_path_buf());
                None
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<&Rc<Texture>> {
        self.loaded.get(path)
    }

    /// Whether `path` failed to load earlier.
    pub fn has_failed(&self, path: &Path) -> bool {
        self.failed.contains(path)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Loaded textures, ordered by path.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Texture>> {
        self.loaded.values()
    }

    /// Delete every texture from the context.
    pub fn destroy(&mut self, ctx: &mut dyn GraphicsContext) {
        for (path, texture) in std::mem::take(&mut self.loaded) {
            if Rc::strong_count(&texture) > 1 {
                tracing::warn!(path = %path.display(), "deleting a texture still held by a mesh");
            }
            ctx.delete_texture(texture.id);
        }
        self.failed.clear();
    }
}

fn upload(
    ctx: &mut dyn GraphicsContext,
    decoder: &dyn ImageDecoder,
    path: &Path,
    kind: TextureKind,
    gamma: bool,
) -> Result<TextureId, String> {
    let image = decoder.decode(path).map_err(|e| e.to_string())?;
    let format = PixelFormat::from_channels(image.channels)
        .ok_or_else(|| format!("unsupported channel count {}", image.channels))?;
    let upload = TextureUpload {
        width: image.width,
        height: image.height,
        format,
        srgb: gamma && kind.is_color(),
        pixels: &image.pixels,
    };
    upload.validate().map_err(|e| e.to_string())?;

    let id = ctx.create_texture().map_err(|e| e.to_string())?;
    ctx.upload_texture_2d(id, &upload);
    ctx.set_sampler(id, &SamplerParams::default());
    ctx.generate_mipmaps(id);
    tracing::debug!(
        path = %path.display(),
        %kind,
        width = image.width,
        height = image.height,
        ?format,
        "uploaded texture"
    );
    Ok(id)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use overdrive_assets::{AssetError, DecodedImage};
    use overdrive_gpu::{Command, HeadlessContext, TextureFilter, TextureWrap};
    use std::cell::RefCell;

    /// Decoder that serves solid images and records every path it decodes.
    /// Paths whose file name starts with `missing` fail.
    #[derive(Default)]
    pub(crate) struct StubDecoder {
        pub channels: u8,
        pub decoded: RefCell<Vec<PathBuf>>,
    }

    impl StubDecoder {
        pub fn rgba() -> Self {
            Self {
                channels: 4,
                ..Default::default()
            }
        }

        pub fn decode_count(&self) -> usize {
            self.decoded.borrow().len()
        }
    }

    impl ImageDecoder for StubDecoder {
        fn decode(&self, path: &Path) -> Result<DecodedImage, AssetError> {
            self.decoded.borrow_mut().push(path.to_path_buf());
            let missing = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("missing"));
            if missing {
                return Err(AssetError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                });
            }
            Ok(DecodedImage {
                pixels: vec![128; 2 * 2 * self.channels as usize],
                width: 2,
                height: 2,
                channels: self.channels,
            })
        }
    }

    #[test]
    fn same_path_decodes_once() {
        let mut ctx = HeadlessContext::new();
        let decoder = StubDecoder::rgba();
        let mut cache = TextureCache::new();
        let path = Path::new("tex/wall.png");

        let a = cache
            .load(&mut ctx, &decoder, path, TextureKind::Diffuse, false)
            .unwrap();
        let b = cache
            .load(&mut ctx, &decoder, path, TextureKind::Diffuse, false)
            .unwrap();

        assert_eq!(decoder.decode_count(), 1);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert_eq!(ctx.count(|c| matches!(c, Command::CreateTexture(_))), 1);
    }

    #[test]
    fn failed_path_is_not_retried() {
        let mut ctx = HeadlessContext::new();
        let decoder = StubDecoder::rgba();
        let mut cache = TextureCache::new();
        let path = Path::new("missing.png");

        assert!(cache
            .load(&mut ctx, &decoder, path, TextureKind::Specular, false)
            .is_none());
        assert!(cache
            .load(&mut ctx, &decoder, path, TextureKind::Specular, false)
            .is_none());
        assert_eq!(decoder.decode_count(), 1);
        assert!(cache.has_failed(path));
        assert_eq!(ctx.live_textures(), 0);
    }

    #[test]
    fn upload_sets_sampler_and_mipmaps() {
        let mut ctx = HeadlessContext::new();
        let decoder = StubDecoder {
            channels: 3,
            ..Default::default()
        };
        let mut cache = TextureCache::new();
        let tex = cache
            .load(&mut ctx, &decoder, Path::new("a.png"), TextureKind::Normal, true)
            .unwrap();

        let info = ctx.texture_info(tex.id()).unwrap();
        assert_eq!(info.format, PixelFormat::Rgb);
        assert!(info.mipmapped);
        let sampler = ctx.commands().iter().find_map(|c| match c {
            Command::SetSampler { params, .. } => Some(*params),
            _ => None,
        });
        let sampler = sampler.unwrap();
        assert_eq!(sampler.wrap_s, TextureWrap::Repeat);
        assert_eq!(sampler.min_filter, TextureFilter::Linear);
        assert_eq!(sampler.mag_filter, TextureFilter::Linear);
        // Normal maps are data, never sRGB.
        assert!(ctx.commands().iter().any(|c| matches!(
            c,
            Command::UploadTexture { srgb: false, .. }
        )));
    }

    #[test]
    fn gamma_makes_diffuse_srgb() {
        let mut ctx = HeadlessContext::new();
        let decoder = StubDecoder::rgba();
        let mut cache = TextureCache::new();
        cache.load(&mut ctx, &decoder, Path::new("d.png"), TextureKind::Diffuse, true);
        assert!(ctx.commands().iter().any(|c| matches!(
            c,
            Command::UploadTexture { srgb: true, format: PixelFormat::Rgba, .. }
        )));
    }

    #[test]
    fn two_channel_images_are_rejected() {
        let mut ctx = HeadlessContext::new();
        let decoder = StubDecoder {
            channels: 2,
            ..Default::default()
        };
        let mut cache = TextureCache::new();
        let loaded = cache.load(&mut ctx, &decoder, Path::new("la.png"), TextureKind::Diffuse, false);
        assert!(loaded.is_none());
        assert_eq!(ctx.live_textures(), 0);
    }

    #[test]
    fn destroy_releases_every_texture() {
        let mut ctx = HeadlessContext::new();
        let decoder = StubDecoder::rgba();
        let mut cache = TextureCache::new();
        for name in ["a.png", "b.png", "c.png"] {
            cache.load(&mut ctx, &decoder, Path::new(name), TextureKind::Diffuse, false);
        }
        assert_eq!(ctx.live_textures(), 3);
        cache.destroy(&mut ctx);
        assert_eq!(ctx.live_textures(), 0);
        assert!(cache.is_empty());
    }
}
