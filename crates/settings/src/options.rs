use glint_common::Color;

/// HDR environments offered in the environment tab, by file name.
pub const HDR_OPTIONS: &[&str] = &[
    "city.hdr",
    "garden.hdr",
    "park.hdr",
    "room.hdr",
    "room2.hdr",
    "sky.hdr",
    "sky2.hdr",
    "studio.hdr",
    "alley.hdr",
    "studio2.hdr",
    "warehouse.hdr",
    "dawn.hdr",
];

/// Panorama images offered when panorama mode is on.
pub const PANORAMA_OPTIONS: &[&str] = &[
    "01.jpg", "02.jpg", "03.jpg", "04.jpg", "05.jpg", "06.jpg", "07.jpg", "08.jpg", "09.jpg",
];

/// A named shadow color swatch.
#[derive(Debug, Clone, Copy)]
pub struct ShadowColorPreset {
    pub name: &'static str,
    pub hex: &'static str,
}

impl ShadowColorPreset {
    pub fn color(&self) -> Color {
        // Table entries are literals validated by the tests below.
        Color::parse(self.hex).unwrap_or(Color::BLACK)
    }
}

pub const SHADOW_COLOR_PRESETS: &[ShadowColorPreset] = &[
    ShadowColorPreset {
        name: "Black",
        hex: "#000000",
    },
    ShadowColorPreset {
        name: "Blue",
        hex: "#081c76",
    },
    ShadowColorPreset {
        name: "Forest Green",
        hex: "#012c06",
    },
    ShadowColorPreset {
        name: "Dawn",
        hex: "#7a2f0f",
    },
];

/// Display label for an HDR file: the name without its `.hdr` extension.
pub fn hdr_label(file: &str) -> &str {
    file.strip_suffix(".hdr").unwrap_or(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_parse() {
        for preset in SHADOW_COLOR_PRESETS {
            assert!(Color::parse(preset.hex).is_ok(), "{}", preset.name);
        }
        assert_eq!(SHADOW_COLOR_PRESETS[3].color().to_hex(), "#7a2f0f");
    }

    #[test]
    fn hdr_labels_strip_extension() {
        assert_eq!(hdr_label("warehouse.hdr"), "warehouse");
        assert_eq!(hdr_label("plain"), "plain");
        assert!(HDR_OPTIONS.contains(&"dawn.hdr"));
        assert_eq!(HDR_OPTIONS.len(), 12);
    }
}
