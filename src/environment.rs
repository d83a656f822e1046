/// Lighting and fog presets attached to every composed scene
use crate::data::{Fog, Lighting};
use crate::error::ComposeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_PRESET: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentPreset {
    pub lighting: Lighting,
    pub fog: Fog,
}

impl EnvironmentPreset {
    /// Values used when the caller names no preset
    pub fn standard() -> Self {
        Self {
            lighting: Lighting {
                brightness: 10.0,
                temperature: 46.6,
                time_of_day: 6.82,
                sun_angle: 0.0,
            },
            fog: Fog {
                density: 0.02,
                ray_density: 0.02,
                height: 0.2,
            },
        }
    }

    pub fn nature() -> Self {
        Self {
            lighting: Lighting {
                brightness: 12.0,
                temperature: 55.0,
                time_of_day: 10.0,
                sun_angle: 0.0,
            },
            fog: Fog {
                density: 0.04,
                ray_density: 0.02,
                height: 0.2,
            },
        }
    }

    pub fn city() -> Self {
        Self {
            lighting: Lighting {
                brightness: 8.0,
                temperature: 55.0,
                time_of_day: 19.0,
                sun_angle: 0.0,
            },
            fog: Fog {
                density: 0.04,
                ray_density: 0.02,
                height: 0.2,
            },
        }
    }

    pub fn dusk() -> Self {
        Self {
            lighting: Lighting {
                brightness: 6.0,
                temperature: 40.0,
                time_of_day: 18.0,
                sun_angle: 10.0,
            },
            fog: Fog {
                density: 0.03,
                ray_density: 0.03,
                height: 0.3,
            },
        }
    }
}

/// Caller-supplied environment values. Any field left out falls back to the preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentOverrides {
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub brightness: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub sun_angle: Option<f64>,
    #[serde(default)]
    pub fog_density: Option<f64>,
    #[serde(default)]
    pub fog_height: Option<f64>,
}

impl EnvironmentOverrides {
    fn numeric_fields(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("brightness", self.brightness),
            ("temperature", self.temperature),
            ("time", self.time),
            ("sunAngle", self.sun_angle),
            ("fogDensity", self.fog_density),
            ("fogHeight", self.fog_height),
        ]
    }

    pub fn validate(&self) -> Result<(), ComposeError> {
        for (name, value) in self.numeric_fields() {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(ComposeError::InvalidInput(format!(
                        "environment.{} must be finite, got {}",
                        name, v
                    )));
                }
            }
        }
        if let Some(name) = &self.preset {
            if get_preset(name).is_none() {
                return Err(ComposeError::InvalidInput(format!(
                    "unknown environment preset '{}'",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Apply these overrides on top of the named (or default) preset
    pub fn resolve(&self) -> Result<EnvironmentPreset, ComposeError> {
        self.validate()?;

        let name = self.preset.as_deref().unwrap_or(DEFAULT_PRESET);
        let mut env = get_preset(name).ok_or_else(|| {
            ComposeError::InvalidInput(format!("unknown environment preset '{}'", name))
        })?;

        if let Some(v) = self.brightness {
            env.lighting.brightness = v;
        }
        if let Some(v) = self.temperature {
            env.lighting.temperature = v;
        }
        if let Some(v) = self.time {
            env.lighting.time_of_day = v;
        }
        if let Some(v) = self.sun_angle {
            env.lighting.sun_angle = v;
        }
        if let Some(v) = self.fog_density {
            env.fog.density = v;
        }
        if let Some(v) = self.fog_height {
            env.fog.height = v;
        }

        Ok(env)
    }
}

/// Load all environment presets keyed by name
pub fn load_presets() -> HashMap<String, EnvironmentPreset> {
    let mut presets = HashMap::new();

    presets.insert(DEFAULT_PRESET.to_string(), EnvironmentPreset::standard());
    presets.insert("nature".to_string(), EnvironmentPreset::nature());
    presets.insert("city".to_string(), EnvironmentPreset::city());
    presets.insert("dusk".to_string(), EnvironmentPreset::dusk());

    presets
}

/// Get a specific environment preset by name
///
/// Returns None if the name is not recognized.
pub fn get_preset(name: &str) -> Option<EnvironmentPreset> {
    match name.trim().to_lowercase().as_str() {
        DEFAULT_PRESET => Some(EnvironmentPreset::standard()),
        "nature" => Some(EnvironmentPreset::nature()),
        "city" => Some(EnvironmentPreset::city()),
        "dusk" => Some(EnvironmentPreset::dusk()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_all_presets() {
        let presets = load_presets();

        assert_eq!(presets.len(), 4);
        assert!(presets.contains_key("default"));
        assert!(presets.contains_key("nature"));
        assert!(presets.contains_key("city"));
        assert!(presets.contains_key("dusk"));
    }

    #[test]
    fn test_get_preset() {
        assert!(get_preset("nature").is_some());
        assert!(get_preset("Nature").is_some()); // Case insensitive
        assert!(get_preset("CITY").is_some());
        assert!(get_preset("swamp").is_none());
    }

    #[test]
    fn test_empty_overrides_give_defaults() {
        let env = EnvironmentOverrides::default().resolve().unwrap();
        assert_eq!(env, EnvironmentPreset::standard());
        assert_eq!(env.lighting.brightness, 10.0);
        assert_eq!(env.lighting.time_of_day, 6.82);
        assert_eq!(env.fog.density, 0.02);
    }

    #[test]
    fn test_overrides_win_over_preset() {
        let overrides = EnvironmentOverrides {
            preset: Some("dusk".to_string()),
            brightness: Some(3.0),
            fog_height: Some(0.9),
            ..Default::default()
        };
        let env = overrides.resolve().unwrap();

        assert_eq!(env.lighting.brightness, 3.0);
        assert_eq!(env.lighting.temperature, 40.0);
        assert_eq!(env.lighting.sun_angle, 10.0);
        assert_eq!(env.fog.height, 0.9);
        assert_eq!(env.fog.ray_density, 0.03);
    }

    #[test]
    fn test_invalid_overrides() {
        let unknown = EnvironmentOverrides {
            preset: Some("swamp".to_string()),
            ..Default::default()
        };
        assert!(matches!(unknown.resolve(), Err(ComposeError::InvalidInput(_))));

        let non_finite = EnvironmentOverrides {
            temperature: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(matches!(non_finite.resolve(), Err(ComposeError::InvalidInput(_))));
    }

    #[test]
    fn test_overrides_parse_camel_case() {
        let overrides: EnvironmentOverrides =
            serde_json::from_str(r#"{"preset":"city","sunAngle":45.0,"fogDensity":0.1}"#).unwrap();
        assert_eq!(overrides.preset.as_deref(), Some("city"));
        assert_eq!(overrides.sun_angle, Some(45.0));
        assert_eq!(overrides.fog_density, Some(0.1));
        assert_eq!(overrides.time, None);
    }
}
