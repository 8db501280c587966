//! Named colour palettes.

use crate::gradient::{Color, GradientError, GradientLinear};

/// Eight-stop palette used by the lemniscate rings loop.
///
/// Index 0 doubles as the background and fog colour.
pub const FLORIANDELOOIJ_2: [&str; 8] = [
    "#FAE9FD", "#DF4952", "#E7AFD9", "#090422", "#B147A0", "#5124A5", "#3F1867", "#8D92C6",
];

/// A parsed palette: ordered colours plus the gradient built from them.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<Color>,
    gradient: GradientLinear,
}

impl Palette {
    pub fn from_hex<S: AsRef<str>>(range: &[S]) -> Result<Self, GradientError> {
        let colors = range
            .iter()
            .map(|s| Color::from_hex(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let gradient = GradientLinear::new(colors.clone())?;
        Ok(Self { colors, gradient })
    }

    /// Palette colour at `index`, wrapping around the range.
    pub fn get(&self, index: usize) -> Color {
        self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn gradient(&self) -> &GradientLinear {
        &self.gradient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floriandelooij_parses() {
        let palette = Palette::from_hex(&FLORIANDELOOIJ_2).unwrap();
        assert_eq!(palette.len(), 8);
        assert_eq!(palette.get(0), Color::from_hex("#FAE9FD").unwrap());
        assert_eq!(palette.get(8), palette.get(0));
        assert_eq!(palette.gradient().stops().len(), 8);
    }
}
