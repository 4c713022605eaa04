use std::fmt;

/// Opaque token naming the end of a decodable unit within the stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentBoundary {
    token: String,
}

impl FragmentBoundary {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for FragmentBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// Read cursor of a stream: either from the oldest retained data or from
/// immediately after a named fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StreamPosition {
    #[default]
    Earliest,
    AfterFragment(FragmentBoundary),
}

impl StreamPosition {
    /// Moves the cursor past `boundary`. Interior frames carry no boundary and
    /// leave the cursor where it is, so it never returns to `Earliest`.
    pub fn advance(&mut self, boundary: Option<&FragmentBoundary>) {
        if let Some(boundary) = boundary {
            *self = StreamPosition::AfterFragment(boundary.clone());
        }
    }

    pub fn fragment(&self) -> Option<&FragmentBoundary> {
        match self {
            StreamPosition::Earliest => None,
            StreamPosition::AfterFragment(boundary) => Some(boundary),
        }
    }
}

impl fmt::Display for StreamPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamPosition::Earliest => f.write_str("EARLIEST"),
            StreamPosition::AfterFragment(boundary) => write!(f, "AFTER_FRAGMENT({})", boundary),
        }
    }
}
