use serde::{Deserialize, Serialize};

/// Describes the surface an in-memory host presents to the guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Initial drawing-buffer width of newly created canvases.
    pub canvas_width: u32,
    /// Initial drawing-buffer height of newly created canvases.
    pub canvas_height: u32,
    /// Layout size of `document.body`.
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub device_pixel_ratio: f64,
    /// Whether `requestFullscreen` is permitted.
    pub allow_fullscreen: bool,
    /// Extensions `getExtension` will hand out.
    pub extensions: Vec<String>,
    /// Reported `MAX_TEXTURE_SIZE`.
    pub max_texture_size: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            canvas_width: 300,
            canvas_height: 150,
            viewport_width: 1280,
            viewport_height: 720,
            device_pixel_ratio: 1.0,
            allow_fullscreen: true,
            extensions: vec![
                "EXT_color_buffer_float".to_string(),
                "OES_texture_float_linear".to_string(),
                "WEBGL_lose_context".to_string(),
            ],
            max_texture_size: 4096,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_surface() {
        let cfg = SurfaceConfig::default();
        assert_eq!((cfg.canvas_width, cfg.canvas_height), (300, 150));
        assert!(cfg.allow_fullscreen);
        assert!(cfg.extensions.iter().any(|e| e == "WEBGL_lose_context"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: SurfaceConfig =
            serde_json::from_str(r#"{"device_pixel_ratio": 2.0, "allow_fullscreen": false}"#).unwrap();
        assert_eq!(cfg.device_pixel_ratio, 2.0);
        assert!(!cfg.allow_fullscreen);
        assert_eq!(cfg.canvas_width, 300);
    }
}
