use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use vello::peniko::{BlendMode, Fill};
use vello::wgpu;

use crate::context::lock::ContextLock;
use crate::context::settings::{Antialiasing, ContextSettings, PowerPreference};
use crate::context::{BackendContext, BackendTexture, Origin, PlatformSurfaceHandle};
use crate::foundation::core::{Affine, IntSize, Rect, Rgba8Premul};
use crate::foundation::error::{SurfaceError, SurfaceResult};
use crate::pixels::format::{ColorType, ImageInfo};
use crate::render::composite::flip_rows;
use crate::render::ops::{DrawOp, straight_rgba};
use crate::render::target::{ContentChangeMode, RenderTarget};

/// Texture usages a vello render target needs.
const TARGET_USAGES: wgpu::TextureUsages = wgpu::TextureUsages::STORAGE_BINDING
    .union(wgpu::TextureUsages::TEXTURE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

/// Device state shared by a context and every render target it creates.
struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    renderer: Mutex<vello::Renderer>,
    antialiasing: vello::AaConfig,
}

impl Gpu {
    fn renderer(&self) -> MutexGuard<'_, vello::Renderer> {
        self.renderer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Backend context on a `wgpu` device, rendering with `vello`.
pub struct WgpuContext {
    gpu: Arc<Gpu>,
    adapter_name: String,
    gate: ContextLock,
    exported: Mutex<HashMap<PlatformSurfaceHandle, wgpu::Texture>>,
}

impl WgpuContext {
    /// Request an adapter and device. Fails when no adapter is available.
    pub fn new(settings: &ContextSettings) -> SurfaceResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: match settings.power_preference {
                PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
                PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
            },
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                SurfaceError::unsupported("no gpu adapter available")
            }
            other => SurfaceError::backend(format!("wgpu request_adapter failed: {other:?}")),
        })?;
        let adapter_name = adapter.get_info().name;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("painting_surface_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| SurfaceError::backend(format!("wgpu request_device failed: {e:?}")))?;

        let renderer = vello::Renderer::new(
            &device,
            vello::RendererOptions {
                antialiasing_support: vello::AaSupport {
                    area: settings.antialiasing == Antialiasing::Area,
                    msaa8: settings.antialiasing == Antialiasing::Msaa8,
                    msaa16: settings.antialiasing == Antialiasing::Msaa16,
                },
                ..vello::RendererOptions::default()
            },
        )
        .map_err(|e| SurfaceError::backend(format!("vello renderer init failed: {e:?}")))?;

        tracing::debug!(adapter = %adapter_name, "wgpu context ready");
        Ok(Self {
            gpu: Arc::new(Gpu {
                device,
                queue,
                renderer: Mutex::new(renderer),
                antialiasing: match settings.antialiasing {
                    Antialiasing::Area => vello::AaConfig::Area,
                    Antialiasing::Msaa8 => vello::AaConfig::Msaa8,
                    Antialiasing::Msaa16 => vello::AaConfig::Msaa16,
                },
            }),
            adapter_name,
            gate: ContextLock::default(),
            exported: Mutex::new(HashMap::new()),
        })
    }

    /// Name of the adapter backing the device.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Device the context renders on.
    pub fn device(&self) -> &wgpu::Device {
        &self.gpu.device
    }

    /// Allocate a texture usable as a render target and export it under a fresh handle.
    pub fn create_shared_texture(&self, size: IntSize) -> SurfaceResult<PlatformSurfaceHandle> {
        let texture = create_texture(&self.gpu.device, size, "painting_surface_shared")?;
        Ok(self.export_texture(texture))
    }

    /// Register an existing texture so it can be imported by handle.
    pub fn export_texture(&self, texture: wgpu::Texture) -> PlatformSurfaceHandle {
        let handle = PlatformSurfaceHandle::next();
        self.exports().insert(handle, texture);
        tracing::debug!(handle = handle.raw(), "texture exported");
        handle
    }

    /// Forget an exported texture.
    pub fn release_shared_texture(&self, handle: PlatformSurfaceHandle) -> bool {
        self.exports().remove(&handle).is_some()
    }

    fn exports(&self) -> MutexGuard<'_, HashMap<PlatformSurfaceHandle, wgpu::Texture>> {
        self.exported.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for WgpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuContext")
            .field("adapter", &self.adapter_name)
            .field("locked", &self.gate.is_locked())
            .finish_non_exhaustive()
    }
}

impl BackendContext for WgpuContext {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn lock(&self) {
        self.gate.lock();
    }

    fn unlock(&self) {
        self.gate.unlock();
    }

    fn create_render_target(&self, info: &ImageInfo) -> SurfaceResult<Box<dyn RenderTarget>> {
        let texture = create_texture(&self.gpu.device, info.size, "painting_surface_target")
            .map_err(|e| SurfaceError::allocation(e.to_string()))?;
        Ok(Box::new(GpuRenderTarget::new(
            self.gpu.clone(),
            texture,
            Origin::TopLeft,
        )?))
    }

    fn import_platform_texture(
        &self,
        handle: PlatformSurfaceHandle,
    ) -> SurfaceResult<BackendTexture> {
        let texture = self.exports().get(&handle).cloned().ok_or_else(|| {
            SurfaceError::backend(format!("unknown platform surface {}", handle.raw()))
        })?;
        let size = IntSize::new(texture.width(), texture.height());
        Ok(BackendTexture::new(size, texture))
    }

    fn wrap_backend_render_target(
        &self,
        texture: BackendTexture,
        origin: Origin,
        color_type: ColorType,
    ) -> SurfaceResult<Box<dyn RenderTarget>> {
        if color_type == ColorType::Rgb888x {
            return Err(SurfaceError::unsupported(
                "wgpu render targets carry alpha; Rgb888x cannot be wrapped",
            ));
        }
        let texture = texture.downcast::<wgpu::Texture>()?;
        if texture.format() != wgpu::TextureFormat::Rgba8Unorm
            || !texture.usage().contains(TARGET_USAGES)
        {
            return Err(SurfaceError::unsupported(format!(
                "texture {:?} with usages {:?} cannot be rendered to",
                texture.format(),
                texture.usage()
            )));
        }
        let mut target = GpuRenderTarget::new(self.gpu.clone(), texture, origin)?;
        // Imported textures arrive with content; keep it as the base of the first frame.
        target.flatten()?;
        Ok(Box::new(target))
    }
}

/// Content beneath the retained scene.
enum Base {
    Color(Rgba8Premul),
    Image(vello::peniko::ImageData),
}

/// Render target backed by a `wgpu` texture.
///
/// Draws accumulate in a retained `vello` scene over a base (a clear color or a flattened
/// image of earlier content); each batch re-renders base plus scene into the texture.
/// The texture is always `Rgba8Unorm`, the only storage format vello renders to; channel order
/// is resolved on readback.
pub struct GpuRenderTarget {
    gpu: Arc<Gpu>,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: IntSize,
    origin: Origin,
    base: Base,
    retained: vello::Scene,
}

impl GpuRenderTarget {
    fn new(gpu: Arc<Gpu>, texture: wgpu::Texture, origin: Origin) -> SurfaceResult<Self> {
        let size = IntSize::new(texture.width(), texture.height());
        if size.is_empty() {
            return Err(SurfaceError::allocation("empty texture"));
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            gpu,
            texture,
            view,
            size,
            origin,
            base: Base::Color(Rgba8Premul::transparent()),
            retained: vello::Scene::new(),
        })
    }

    /// Texture holding the pixels.
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Row order of the texture.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Maps logical (top-down) coordinates to texture rows.
    fn storage_transform(&self) -> Affine {
        match self.origin {
            Origin::TopLeft => Affine::IDENTITY,
            Origin::BottomLeft => Affine::new([1.0, 0.0, 0.0, -1.0, 0.0, f64::from(self.size.height)]),
        }
    }

    fn bounds(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            f64::from(self.size.width),
            f64::from(self.size.height),
        )
    }

    /// Replace base and scene with a single image of the current content.
    fn flatten(&mut self) -> SurfaceResult<()> {
        let rgba = self.read_rgba8_premul()?;
        self.base = Base::Image(image_data(self.size, rgba));
        self.retained.reset();
        Ok(())
    }

    fn encode(&mut self, op: &DrawOp) {
        match op {
            DrawOp::Clear { color } => {
                self.retained.reset();
                self.base = Base::Color(*color);
            }
            DrawOp::FillRect {
                rect,
                transform,
                color,
            } => {
                self.retained
                    .fill(Fill::NonZero, *transform, peniko_color(*color), None, rect);
            }
            DrawOp::FillPath {
                path,
                transform,
                color,
            } => {
                self.retained
                    .fill(Fill::NonZero, *transform, peniko_color(*color), None, path);
            }
            DrawOp::DrawImage {
                image,
                transform,
                opacity,
            } => {
                let bounds = self.bounds();
                if *opacity < 1.0 {
                    self.retained.push_layer(
                        Fill::NonZero,
                        BlendMode::default(),
                        *opacity,
                        Affine::IDENTITY,
                        &bounds,
                    );
                }
                let data = image_data(image.size(), image.data().to_vec());
                self.retained.draw_image(&data, *transform);
                if *opacity < 1.0 {
                    self.retained.pop_layer();
                }
            }
        }
    }

    fn render(&mut self) -> SurfaceResult<()> {
        let storage = self.storage_transform();
        let mut frame = vello::Scene::new();
        let base_color = match &self.base {
            Base::Color(color) => peniko_color(*color),
            Base::Image(data) => {
                frame.draw_image(data, storage);
                peniko_color(Rgba8Premul::transparent())
            }
        };
        frame.append(&self.retained, Some(storage));

        let gpu = &self.gpu;
        gpu.renderer()
            .render_to_texture(
                &gpu.device,
                &gpu.queue,
                &frame,
                &self.view,
                &vello::RenderParams {
                    base_color,
                    width: self.size.width,
                    height: self.size.height,
                    antialiasing_method: gpu.antialiasing,
                },
            )
            .map_err(|e| SurfaceError::backend(format!("vello render failed: {e:?}")))
    }
}

impl RenderTarget for GpuRenderTarget {
    fn size(&self) -> IntSize {
        self.size
    }

    fn draw(&mut self, ops: &[DrawOp]) -> SurfaceResult<()> {
        for op in ops {
            self.encode(op);
        }
        self.render()
    }

    fn read_rgba8_premul(&self) -> SurfaceResult<Vec<u8>> {
        let gpu = &self.gpu;
        let (width, height) = (self.size.width, self.size.height);
        let row_bytes = width
            .checked_mul(4)
            .ok_or_else(|| SurfaceError::backend("readback row overflow"))?;
        let padded_row_bytes = align_to(row_bytes, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let buffer_size = u64::from(padded_row_bytes) * u64::from(height);

        let readback = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("painting_surface_readback"),
            size: buffer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("painting_surface_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        gpu.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        gpu.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| SurfaceError::backend(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| SurfaceError::backend("readback channel closed"))?
            .map_err(|e| SurfaceError::backend(format!("readback map failed: {e:?}")))?;

        let mapped = slice.get_mapped_range();
        let (row_bytes, padded_row_bytes) = (row_bytes as usize, padded_row_bytes as usize);
        let mut out = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * padded_row_bytes;
            out.extend_from_slice(&mapped[start..start + row_bytes]);
        }
        drop(mapped);
        readback.unmap();

        if self.origin == Origin::BottomLeft {
            flip_rows(&mut out, width as usize);
        }
        Ok(out)
    }

    fn write_rgba8_premul(&mut self, rgba: &[u8]) -> SurfaceResult<()> {
        let expected = self.size.rgba8_len()?;
        if rgba.len() != expected {
            return Err(SurfaceError::validation(format!(
                "upload of {} needs {expected} bytes, got {}",
                self.size,
                rgba.len()
            )));
        }
        self.base = Base::Image(image_data(self.size, rgba.to_vec()));
        self.retained.reset();
        self.render()
    }

    fn notify_content_will_change(&mut self, mode: ContentChangeMode) {
        if mode == ContentChangeMode::Discard
            && let Err(err) = self.flatten()
        {
            tracing::warn!(error = %err, "failed to flatten retained scene");
        }
    }
}

fn create_texture(
    device: &wgpu::Device,
    size: IntSize,
    label: &'static str,
) -> SurfaceResult<wgpu::Texture> {
    let max = device.limits().max_texture_dimension_2d;
    if size.is_empty() || size.width > max || size.height > max {
        return Err(SurfaceError::validation(format!(
            "texture size {size} outside 1..={max}"
        )));
    }
    Ok(device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: TARGET_USAGES,
        view_formats: &[],
    }))
}

fn image_data(size: IntSize, rgba: Vec<u8>) -> vello::peniko::ImageData {
    vello::peniko::ImageData {
        data: vello::peniko::Blob::from(rgba),
        format: vello::peniko::ImageFormat::Rgba8,
        alpha_type: vello::peniko::ImageAlphaType::AlphaPremultiplied,
        width: size.width,
        height: size.height,
    }
}

fn peniko_color(color: Rgba8Premul) -> vello::peniko::Color {
    let [r, g, b, a] = straight_rgba(color);
    vello::peniko::Color::from_rgba8(r, g, b, a)
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}
