/// Two-valued image tag, computed once per run and shared by every probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageClass {
    /// No OS layer: application binary plus copied files, no shell.
    Scratch,
    Regular,
}

impl ImageClass {
    pub fn is_scratch(self) -> bool {
        matches!(self, ImageClass::Scratch)
    }
}

impl std::fmt::Display for ImageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageClass::Scratch => write!(f, "scratch"),
            ImageClass::Regular => write!(f, "regular"),
        }
    }
}
