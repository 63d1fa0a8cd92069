use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Mode started when none is requested.
pub const DEFAULT_MODE: &str = "effects";

/// Everything needed to launch one viewer mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSpec {
    pub id: &'static str,
    pub title: String,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    /// Whether this mode listens for remote parameter updates.
    pub remote_control: bool,
}

/// Builds a [`ModeSpec`] with shader paths resolved against a shader root.
pub type ModeFactory = fn(&Path) -> ModeSpec;

struct ModeEntry {
    description: &'static str,
    factory: ModeFactory,
}

/// Lookup from mode id to the factory that sets it up.
pub struct ModeRegistry {
    modes: BTreeMap<&'static str, ModeEntry>,
}

impl ModeRegistry {
    pub fn empty() -> Self {
        Self {
            modes: BTreeMap::new(),
        }
    }

    /// Registry holding every mode that ships with the viewer.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(
            DEFAULT_MODE,
            "raymarched primitives melted together by the blend strength",
            effects_mode,
        );
        registry
    }

    /// Adds or replaces a mode.
    pub fn register(&mut self, id: &'static str, description: &'static str, factory: ModeFactory) {
        self.modes.insert(
            id,
            ModeEntry {
                description,
                factory,
            },
        );
    }

    pub fn create(&self, id: &str, shader_root: &Path) -> Option<ModeSpec> {
        self.modes.get(id).map(|entry| (entry.factory)(shader_root))
    }

    /// `(id, description)` pairs in id order.
    pub fn describe(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.modes
            .iter()
            .map(|(id, entry)| (*id, entry.description))
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn effects_mode(shader_root: &Path) -> ModeSpec {
    ModeSpec {
        id: DEFAULT_MODE,
        title: "Shadeview - Effects".to_string(),
        vertex_shader: shader_root.join("glsl").join("vertex_shader.glsl"),
        fragment_shader: shader_root
            .join("glsl")
            .join("window_effects")
            .join("fragment_shader.glsl"),
        remote_control: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_effects_mode_resolves_against_root() {
        let registry = ModeRegistry::builtin();
        let spec = registry.create("effects", Path::new("/srv/shaders")).unwrap();
        assert_eq!(
            spec.vertex_shader,
            PathBuf::from("/srv/shaders/glsl/vertex_shader.glsl")
        );
        assert_eq!(
            spec.fragment_shader,
            PathBuf::from("/srv/shaders/glsl/window_effects/fragment_shader.glsl")
        );
        assert!(spec.remote_control);
    }

    #[test]
    fn unknown_mode_is_none() {
        assert!(ModeRegistry::builtin().create("tunnel", Path::new(".")).is_none());
    }

    #[test]
    fn registered_modes_are_listed_in_order() {
        fn plain(root: &Path) -> ModeSpec {
            ModeSpec {
                id: "plain",
                title: "Plain".into(),
                vertex_shader: root.join("v.glsl"),
                fragment_shader: root.join("f.glsl"),
                remote_control: false,
            }
        }

        let mut registry = ModeRegistry::builtin();
        registry.register("plain", "flat colour", plain);
        let ids: Vec<_> = registry.describe().map(|(id, _)| id).collect();
        assert_eq!(ids, ["effects", "plain"]);
        assert!(!registry.create("plain", Path::new("x")).unwrap().remote_control);
    }
}
