use std::sync::Arc;

use crate::context::BackendContext;
use crate::context::software::SoftwareContext;
use crate::foundation::error::{SurfaceError, SurfaceResult};

/// Environment variable overriding [`ContextSettings::backend`].
pub const BACKEND_ENV: &str = "PAINTING_SURFACE_BACKEND";

/// Which kind of backend context to create.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendChoice {
    /// No context: surfaces are plain CPU bitmaps.
    #[default]
    Cpu,
    /// [`SoftwareContext`]: lockable context with CPU-rasterized render targets.
    Software,
    /// `WgpuContext` (requires the `gpu` feature).
    Gpu,
}

impl std::str::FromStr for BackendChoice {
    type Err = SurfaceError;

    fn from_str(s: &str) -> SurfaceResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "software" => Ok(Self::Software),
            "gpu" => Ok(Self::Gpu),
            other => Err(SurfaceError::validation(format!(
                "unknown backend '{other}' (expected cpu, software or gpu)"
            ))),
        }
    }
}

/// Antialiasing method used by GPU render targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Antialiasing {
    /// Analytic area coverage.
    #[default]
    Area,
    /// 8x multisampling.
    Msaa8,
    /// 16x multisampling.
    Msaa16,
}

/// Adapter preference when creating a GPU context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerPreference {
    /// Prefer an integrated, low-power adapter.
    LowPower,
    /// Prefer a discrete, high-performance adapter.
    #[default]
    HighPerformance,
}

/// Backend context configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextSettings {
    /// Context kind.
    pub backend: BackendChoice,
    /// GPU antialiasing method.
    pub antialiasing: Antialiasing,
    /// GPU adapter preference.
    pub power_preference: PowerPreference,
}

impl ContextSettings {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> SurfaceResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| SurfaceError::validation(format!("invalid context settings: {e}")))
    }

    /// Defaults with the `PAINTING_SURFACE_BACKEND` override applied.
    pub fn from_env() -> SurfaceResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `PAINTING_SURFACE_BACKEND` if set. Unknown values are an error.
    pub fn with_env_overrides(self) -> SurfaceResult<Self> {
        self.with_backend_override(std::env::var(BACKEND_ENV).ok().as_deref())
    }

    pub(crate) fn with_backend_override(mut self, value: Option<&str>) -> SurfaceResult<Self> {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            self.backend = v.parse()?;
        }
        Ok(self)
    }
}

/// Create the context selected by `settings`; `None` for [`BackendChoice::Cpu`].
#[tracing::instrument(level = "debug")]
pub fn create_context(settings: &ContextSettings) -> SurfaceResult<Option<Arc<dyn BackendContext>>> {
    match settings.backend {
        BackendChoice::Cpu => Ok(None),
        BackendChoice::Software => Ok(Some(Arc::new(SoftwareContext::new()))),
        #[cfg(feature = "gpu")]
        BackendChoice::Gpu => Ok(Some(Arc::new(crate::render::gpu::WgpuContext::new(
            settings,
        )?))),
        #[cfg(not(feature = "gpu"))]
        BackendChoice::Gpu => Err(SurfaceError::unsupported(
            "gpu backend requires the `gpu` feature",
        )),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/context/settings.rs"]
mod tests;
